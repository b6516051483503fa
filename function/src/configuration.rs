// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use clap::{ArgAction, Parser};

use crate::constants::{ANTHROPIC_API_URL, DEFAULT_SSM_PARAM_PATH, SSM_PARAM_ENV_VAR};

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct FunctionOptions {
    /// Name of the SSM parameter holding the Claude API key (never the key itself)
    #[arg(long, env(SSM_PARAM_ENV_VAR))]
    pub ssm_parameter: String,
    #[arg(long, default_value = ANTHROPIC_API_URL, env("ANTHROPIC_BASE_URL"))]
    pub anthropic_base_url: String,
    /// Serve over plain HTTP instead of the Lambda runtime API
    #[arg(long, default_value = "false", env("CLAUDE_FUNCTION_LOCAL"), action = ArgAction::SetTrue)]
    pub local: bool,
    #[arg(long, default_value = "127.0.0.1", env("CLAUDE_FUNCTION_HOST"))]
    pub host: String,
    #[arg(long, default_value = "8080", env("CLAUDE_FUNCTION_PORT"))]
    pub port: u16,
}

impl Default for FunctionOptions {
    fn default() -> Self {
        FunctionOptions {
            ssm_parameter: DEFAULT_SSM_PARAM_PATH.to_string(),
            anthropic_base_url: ANTHROPIC_API_URL.to_string(),
            local: true,
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}
