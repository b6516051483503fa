// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::apigateway::HttpApiProps;
use crate::claude_sdk_stack::ClaudeSdkStackProps;
use crate::constants::{DEFAULT_STACK_NAME, FUNCTION_ASSET_PATH, LAYER_ASSET_PATH, SSM_PARAM_PATH};
use crate::environment::Environment;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct StackOptions {
    #[arg(long, global = true, default_value = DEFAULT_STACK_NAME, env("CLAUDE_SDK_STACK_NAME"))]
    pub stack_name: String,
    #[arg(long, global = true, env("CDK_DEFAULT_ACCOUNT"))]
    pub account: Option<String>,
    #[arg(long, global = true, env("CDK_DEFAULT_REGION"))]
    pub region: Option<String>,
    #[arg(long, global = true, default_value = ".", env("CLAUDE_SDK_PROJECT_ROOT"))]
    pub project_root: PathBuf,
    #[arg(long, global = true, default_value = FUNCTION_ASSET_PATH, env("CLAUDE_SDK_FUNCTION_CODE"))]
    pub function_code: PathBuf,
    #[arg(long, global = true, default_value = LAYER_ASSET_PATH, env("CLAUDE_SDK_LAYER_ARCHIVE"))]
    pub layer_archive: PathBuf,
    #[arg(long, global = true, default_value = SSM_PARAM_PATH, env("CLAUDE_SDK_SSM_PARAMETER"))]
    pub ssm_parameter: String,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Write the CloudFormation template and asset manifest
    Synth {
        /// Output directory, or `-` to print the template to stdout
        #[arg(long, default_value = "cdk.out")]
        out_dir: PathBuf,
    },
    /// Print the order in which resources must be created
    Plan,
}

impl StackOptions {
    pub fn props(&self) -> ClaudeSdkStackProps {
        ClaudeSdkStackProps {
            stack_name: self.stack_name.clone(),
            environment: Environment::new(self.account.clone(), self.region.clone()),
            function_code: self.function_code.clone(),
            layer_archive: self.layer_archive.clone(),
            ssm_parameter_name: self.ssm_parameter.clone(),
            http_api: HttpApiProps::default(),
        }
    }
}

impl Default for StackOptions {
    fn default() -> Self {
        StackOptions {
            stack_name: DEFAULT_STACK_NAME.to_string(),
            account: None,
            region: None,
            project_root: PathBuf::from("."),
            function_code: PathBuf::from(FUNCTION_ASSET_PATH),
            layer_archive: PathBuf::from(LAYER_ASSET_PATH),
            ssm_parameter: SSM_PARAM_PATH.to_string(),
            command: Command::Plan,
        }
    }
}
