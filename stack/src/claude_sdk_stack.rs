// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! The Claude SDK stack: a Cognito-protected `POST /query` endpoint backed by
//! a Lambda function that reads its API key from SSM Parameter Store.
//!
//! Resources are declared in dependency order:
//!
//! 1. user pool
//! 2. user pool client
//! 3. dependency layer
//! 4. query function (and its execution role)
//! 5. `ssm:GetParameter` grant on the one parameter the function reads
//! 6. HTTP API with its `$default` stage
//! 7. JWT authorizer bound to the user pool client
//! 8. `POST /query` route with its Lambda proxy integration
//! 9. outputs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;

use crate::apigateway::{
    self, AddRoutesOptions, HttpApi, HttpApiProps, HttpLambdaIntegration, HttpMethod,
    HttpUserPoolAuthorizer, HttpUserPoolAuthorizerProps,
};
use crate::assets::{AssetResolver, AssetSource};
use crate::cognito::{
    self, AuthFlows, SignInAliases, StandardAttribute, UserPool, UserPoolClient,
    UserPoolClientProps, UserPoolProps,
};
use crate::constants::*;
use crate::environment::{Environment, normalize_parameter_name};
use crate::errors::StackError;
use crate::gateway::RouteTable;
use crate::iam::{self, PolicyStatement};
use crate::intrinsics::{JOIN, reference};
use crate::lambda::{self, Function, FunctionProps, LayerVersion, LayerVersionProps, Runtime};
use crate::stack::{CloudAssembly, Stack};

const FUNCTION_RUNTIME: Runtime = Runtime::ProvidedAl2023;
const SSM_READ_ACTION: &str = "ssm:GetParameter";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaudeSdkStackProps {
    pub stack_name: String,
    pub environment: Environment,
    pub function_code: PathBuf,
    pub layer_archive: PathBuf,
    pub ssm_parameter_name: String,
    pub http_api: HttpApiProps,
}

impl Default for ClaudeSdkStackProps {
    fn default() -> Self {
        Self {
            stack_name: DEFAULT_STACK_NAME.to_string(),
            environment: Environment::default(),
            function_code: PathBuf::from(FUNCTION_ASSET_PATH),
            layer_archive: PathBuf::from(LAYER_ASSET_PATH),
            ssm_parameter_name: SSM_PARAM_PATH.to_string(),
            http_api: HttpApiProps::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClaudeSdkStack {
    pub stack: Stack,
    pub user_pool: UserPool,
    pub user_pool_client: UserPoolClient,
    pub layer: LayerVersion,
    pub function: Function,
    pub http_api: HttpApi,
    pub authorizer: HttpUserPoolAuthorizer,
}

impl ClaudeSdkStack {
    #[tracing::instrument(skip(resolver))]
    pub fn build(
        props: &ClaudeSdkStackProps,
        resolver: &dyn AssetResolver,
    ) -> Result<Self, StackError> {
        let mut stack = Stack::new(&props.stack_name, props.environment.clone());

        // 1. Identity Directory
        let user_pool = UserPool::new(
            &mut stack,
            USER_POOL_ID,
            &UserPoolProps {
                user_pool_name: USER_POOL_NAME.to_string(),
                self_sign_up_enabled: false,
                sign_in_aliases: SignInAliases {
                    username: true,
                    email: true,
                },
                email: Some(StandardAttribute {
                    required: true,
                    mutable: true,
                }),
            },
        )?;

        // 2. Directory Client
        let user_pool_client = UserPoolClient::new(
            &mut stack,
            USER_POOL_CLIENT_ID,
            &user_pool,
            &UserPoolClientProps {
                auth_flows: AuthFlows {
                    admin_user_password: true,
                    user_password: true,
                    ..Default::default()
                },
                generate_secret: false,
            },
        )?;

        // 3. Dependency Bundle
        let layer = LayerVersion::new(
            &mut stack,
            LAYER_ID,
            &LayerVersionProps {
                code: AssetSource::file(&props.layer_archive),
                compatible_runtimes: vec![FUNCTION_RUNTIME],
                description: LAYER_DESCRIPTION.to_string(),
            },
            resolver,
        )?;

        // 4. Compute Function
        let parameter_name = normalize_parameter_name(&props.ssm_parameter_name);
        let mut function = Function::new(
            &mut stack,
            FUNCTION_ID,
            &FunctionProps {
                runtime: FUNCTION_RUNTIME,
                handler: FUNCTION_HANDLER.to_string(),
                code: AssetSource::directory(&props.function_code),
                layers: vec![layer.clone()],
                timeout: Duration::from_secs(u64::from(FUNCTION_TIMEOUT_SECONDS)),
                memory_size: FUNCTION_MEMORY_SIZE_MB,
                environment: BTreeMap::from([(
                    SSM_PARAM_ENV_VAR.to_string(),
                    parameter_name.clone(),
                )]),
            },
            resolver,
        )?;

        // 5. Access Policy Grant, scoped to the one parameter
        let parameter_arn = stack.environment().ssm_parameter_arn(&parameter_name);
        function.add_to_role_policy(
            &mut stack,
            PolicyStatement::allow(&[SSM_READ_ACTION], vec![parameter_arn]),
        )?;

        // 6. HTTP Gateway
        let mut http_api = HttpApi::new(&mut stack, HTTP_API_ID, props.http_api)?;

        // 7. Authorizer
        let authorizer = HttpUserPoolAuthorizer::new(
            AUTHORIZER_ID,
            &user_pool,
            HttpUserPoolAuthorizerProps {
                user_pool_clients: vec![user_pool_client.clone()],
                identity_source: vec![format!("$request.header.{AUTHORIZATION_HEADER}")],
            },
        )?;

        // 8. Route
        let integration = HttpLambdaIntegration::new(INTEGRATION_ID, &function);
        http_api.add_routes(
            &mut stack,
            AddRoutesOptions {
                path: QUERY_ROUTE_PATH,
                methods: &[HttpMethod::Post],
                integration: &integration,
                authorizer: Some(&authorizer),
            },
        )?;

        // 9. Outputs
        stack.add_output(OUTPUT_USER_POOL_ID, user_pool.user_pool_id(), None)?;
        stack.add_output(
            OUTPUT_USER_POOL_CLIENT_ID,
            user_pool_client.user_pool_client_id(),
            None,
        )?;
        let api_url = api_url_output(&http_api, &stack);
        stack.add_output(OUTPUT_API_URL, api_url, None)?;

        let built = Self {
            stack,
            user_pool,
            user_pool_client,
            layer,
            function,
            http_api,
            authorizer,
        };
        built.verify()?;

        tracing::info!(
            "[stack] built {} with {} resources",
            built.stack.name(),
            built.stack.resources().count()
        );

        Ok(built)
    }

    pub fn route_table(&self) -> RouteTable {
        RouteTable::from_api(&self.http_api)
    }

    pub fn synth(&self) -> Result<CloudAssembly, StackError> {
        self.stack.synth()
    }

    /// Checks the structural guarantees of the stack.
    pub fn verify(&self) -> Result<(), StackError> {
        self.stack.validate()?;

        for resource_type in [
            cognito::USER_POOL_TYPE,
            cognito::USER_POOL_CLIENT_TYPE,
            lambda::LAYER_VERSION_TYPE,
            lambda::FUNCTION_TYPE,
            iam::POLICY_TYPE,
            apigateway::API_TYPE,
            apigateway::AUTHORIZER_TYPE,
            apigateway::ROUTE_TYPE,
        ] {
            let count = self.stack.resources_of_type(resource_type).len();
            if count != 1 {
                return Err(violation(format!(
                    "expected exactly one {resource_type}, found {count}"
                )));
            }
        }

        let client = self
            .stack
            .resource(self.user_pool_client.logical_id())
            .ok_or_else(|| violation("user pool client is not declared".to_string()))?;
        if client.properties["UserPoolId"] != reference(self.user_pool.logical_id()) {
            return Err(violation(
                "user pool client does not reference the stack's user pool".to_string(),
            ));
        }

        if !self.layer.is_compatible_with(self.function.runtime()) {
            return Err(violation(format!(
                "layer is not compatible with {}",
                self.function.runtime().name()
            )));
        }

        self.verify_parameter_grant()?;

        let keys = self.route_table().route_keys();
        if keys != [format!("POST {QUERY_ROUTE_PATH}")] {
            return Err(violation(format!("unexpected routes: {keys:?}")));
        }
        if self.http_api.routes().iter().any(|r| r.authorizer().is_none()) {
            return Err(violation("every route must be authorized".to_string()));
        }
        for route in self.http_api.routes() {
            let permission = format!("{}Permission", route.logical_id());
            if self.stack.resource(&permission).is_none() {
                return Err(violation(format!(
                    "route {} cannot invoke its function",
                    route.route_key()
                )));
            }
        }

        for name in [OUTPUT_USER_POOL_ID, OUTPUT_USER_POOL_CLIENT_ID, OUTPUT_API_URL] {
            match self.stack.output(name) {
                Some(output) if !output.value.is_null() => {}
                _ => return Err(violation(format!("missing output {name}"))),
            }
        }

        Ok(())
    }

    /// The grant names exactly the parameter in the function's environment,
    /// with one action and no wildcard.
    fn verify_parameter_grant(&self) -> Result<(), StackError> {
        let parameter = self
            .function
            .environment_variable(SSM_PARAM_ENV_VAR)
            .ok_or_else(|| violation(format!("function has no {SSM_PARAM_ENV_VAR}")))?;

        let statements = self
            .function
            .default_policy()
            .map(|p| p.statements())
            .unwrap_or_default();
        let [statement] = statements else {
            return Err(violation(format!(
                "expected one policy statement, found {}",
                statements.len()
            )));
        };

        if statement.actions != [SSM_READ_ACTION] || statement.has_wildcard() {
            return Err(violation(format!(
                "grant must allow only {SSM_READ_ACTION} without wildcards"
            )));
        }

        let expected_suffix = format!(":parameter{parameter}");
        match statement.resources.as_slice() {
            [arn] if arn_suffix(arn).is_some_and(|s| s.ends_with(&expected_suffix)) => Ok(()),
            other => Err(violation(format!(
                "grant resources {other:?} do not match parameter {parameter}"
            ))),
        }
    }
}

/// Default stage URL of the API, or the fallback sentinel when none can be
/// produced. The output is never null.
pub fn api_url_output(http_api: &HttpApi, stack: &Stack) -> Value {
    http_api
        .url(stack)
        .unwrap_or_else(|| Value::String(API_URL_FALLBACK.to_string()))
}

/// Trailing literal of an ARN that is either a plain string or an
/// `Fn::Join` of literals and tokens.
fn arn_suffix(arn: &Value) -> Option<&str> {
    match arn {
        Value::String(s) => Some(s),
        Value::Object(map) => map
            .get(JOIN)
            .and_then(|join| join.get(1))
            .and_then(Value::as_array)
            .and_then(|parts| parts.last())
            .and_then(Value::as_str),
        _ => None,
    }
}

fn violation(message: String) -> StackError {
    StackError::InvariantViolation(message)
}
