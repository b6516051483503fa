// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Compute Function and its Dependency Bundle (layer).

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::{Value, json};

use crate::assets::{AssetResolver, AssetSource};
use crate::constants::BASIC_EXECUTION_ROLE_POLICY;
use crate::errors::StackError;
use crate::iam::{Policy, PolicyStatement, Role};
use crate::intrinsics::{get_att, reference};
use crate::stack::Stack;

pub const LAYER_VERSION_TYPE: &str = "AWS::Lambda::LayerVersion";
pub const FUNCTION_TYPE: &str = "AWS::Lambda::Function";
pub const PERMISSION_TYPE: &str = "AWS::Lambda::Permission";

const LAMBDA_SERVICE_PRINCIPAL: &str = "lambda.amazonaws.com";
const MAX_TIMEOUT: Duration = Duration::from_secs(900);
const MIN_MEMORY_SIZE_MB: u32 = 128;
const MAX_MEMORY_SIZE_MB: u32 = 10240;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Runtime {
    /// Custom runtime on Amazon Linux 2023, used by compiled Rust handlers
    ProvidedAl2023,
    Python312,
}

impl Runtime {
    pub fn name(&self) -> &'static str {
        match self {
            Runtime::ProvidedAl2023 => "provided.al2023",
            Runtime::Python312 => "python3.12",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerVersionProps {
    pub code: AssetSource,
    pub compatible_runtimes: Vec<Runtime>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerVersion {
    logical_id: String,
    compatible_runtimes: Vec<Runtime>,
}

impl LayerVersion {
    pub fn new(
        stack: &mut Stack,
        logical_id: &str,
        props: &LayerVersionProps,
        resolver: &dyn AssetResolver,
    ) -> Result<Self, StackError> {
        if props.compatible_runtimes.is_empty() {
            return Err(StackError::ValidationError(format!(
                "layer {logical_id} declares no compatible runtime"
            )));
        }

        let asset = stack.add_asset(logical_id, &props.code, resolver)?;
        let properties = json!({
            "Content": asset.s3_location(),
            "CompatibleRuntimes": props
                .compatible_runtimes
                .iter()
                .map(Runtime::name)
                .collect::<Vec<_>>(),
            "Description": props.description,
        });
        stack.add_resource(logical_id, LAYER_VERSION_TYPE, properties)?;

        Ok(Self {
            logical_id: logical_id.to_string(),
            compatible_runtimes: props.compatible_runtimes.clone(),
        })
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    /// `Ref` of a layer version resolves to its versioned ARN.
    pub fn layer_version_arn(&self) -> Value {
        reference(&self.logical_id)
    }

    pub fn is_compatible_with(&self, runtime: Runtime) -> bool {
        self.compatible_runtimes.contains(&runtime)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionProps {
    pub runtime: Runtime,
    pub handler: String,
    pub code: AssetSource,
    pub layers: Vec<LayerVersion>,
    pub timeout: Duration,
    pub memory_size: u32,
    pub environment: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    logical_id: String,
    runtime: Runtime,
    role: Role,
    default_policy: Option<Policy>,
    environment: BTreeMap<String, String>,
}

impl Function {
    pub fn new(
        stack: &mut Stack,
        logical_id: &str,
        props: &FunctionProps,
        resolver: &dyn AssetResolver,
    ) -> Result<Self, StackError> {
        validate_function_props(logical_id, props)?;

        let role = Role::for_service(
            stack,
            &format!("{logical_id}ServiceRole"),
            LAMBDA_SERVICE_PRINCIPAL,
            &[BASIC_EXECUTION_ROLE_POLICY],
        )?;
        let asset = stack.add_asset(logical_id, &props.code, resolver)?;

        let mut properties = json!({
            "Code": asset.s3_location(),
            "Role": role.arn(),
            "Runtime": props.runtime.name(),
            "Handler": props.handler,
            "Timeout": props.timeout.as_secs(),
            "MemorySize": props.memory_size,
        });
        if !props.layers.is_empty() {
            properties["Layers"] = json!(
                props
                    .layers
                    .iter()
                    .map(LayerVersion::layer_version_arn)
                    .collect::<Vec<_>>()
            );
        }
        if !props.environment.is_empty() {
            properties["Environment"] = json!({ "Variables": props.environment });
        }

        stack.add_resource(logical_id, FUNCTION_TYPE, properties)?;
        // the role must be assumable before the function is created
        stack.add_dependency(logical_id, role.logical_id())?;

        Ok(Self {
            logical_id: logical_id.to_string(),
            runtime: props.runtime,
            role,
            default_policy: None,
            environment: props.environment.clone(),
        })
    }

    /// Grants the execution role `statement`, creating the role's default
    /// policy on first use. The function waits for the policy so no
    /// invocation can run without its grants.
    pub fn add_to_role_policy(
        &mut self,
        stack: &mut Stack,
        statement: PolicyStatement,
    ) -> Result<(), StackError> {
        match self.default_policy.as_mut() {
            Some(policy) => policy.add_statement(stack, statement),
            None => {
                let policy_id = format!("{}DefaultPolicy", self.role.logical_id());
                let policy = Policy::attach(stack, &policy_id, &self.role, vec![statement])?;
                stack.add_dependency(&self.logical_id, &policy_id)?;
                self.default_policy = Some(policy);
                Ok(())
            }
        }
    }

    /// Allows `principal` to invoke the function, optionally scoped to a
    /// source ARN.
    pub fn grant_invoke(
        &self,
        stack: &mut Stack,
        logical_id: &str,
        principal: &str,
        source_arn: Option<Value>,
    ) -> Result<(), StackError> {
        let mut properties = json!({
            "Action": "lambda:InvokeFunction",
            "FunctionName": self.function_arn(),
            "Principal": principal,
        });
        if let Some(source_arn) = source_arn {
            properties["SourceArn"] = source_arn;
        }
        stack.add_resource(logical_id, PERMISSION_TYPE, properties)
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    pub fn runtime(&self) -> Runtime {
        self.runtime
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn default_policy(&self) -> Option<&Policy> {
        self.default_policy.as_ref()
    }

    pub fn environment_variable(&self, name: &str) -> Option<&str> {
        self.environment.get(name).map(String::as_str)
    }

    pub fn function_name(&self) -> Value {
        reference(&self.logical_id)
    }

    pub fn function_arn(&self) -> Value {
        get_att(&self.logical_id, "Arn")
    }
}

fn validate_function_props(logical_id: &str, props: &FunctionProps) -> Result<(), StackError> {
    if props.handler.trim().is_empty() {
        return Err(StackError::ValidationError(format!(
            "function {logical_id} has no entry point"
        )));
    }
    if props.timeout.is_zero() || props.timeout > MAX_TIMEOUT {
        return Err(StackError::ValidationError(format!(
            "function {logical_id} timeout must be between 1s and {}s",
            MAX_TIMEOUT.as_secs()
        )));
    }
    if !(MIN_MEMORY_SIZE_MB..=MAX_MEMORY_SIZE_MB).contains(&props.memory_size) {
        return Err(StackError::ValidationError(format!(
            "function {logical_id} memory size must be between {MIN_MEMORY_SIZE_MB} and {MAX_MEMORY_SIZE_MB} MB"
        )));
    }
    if let Some(layer) = props
        .layers
        .iter()
        .find(|layer| !layer.is_compatible_with(props.runtime))
    {
        return Err(StackError::InvariantViolation(format!(
            "layer {} is not compatible with {}",
            layer.logical_id(),
            props.runtime.name()
        )));
    }
    Ok(())
}
