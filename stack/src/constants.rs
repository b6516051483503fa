// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

pub const DEFAULT_STACK_NAME: &str = "ClaudeSdkStack";
pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";
pub const TEMPLATE_DESCRIPTION: &str = "Claude SDK: Cognito-protected HTTP API in front of a Lambda query function";

pub const USER_POOL_NAME: &str = "claude-sdk-users";

pub const LAYER_ASSET_PATH: &str = "assets/lambdaLayers/dependencies-layer.zip";
pub const LAYER_DESCRIPTION: &str = "Dependencies for Claude SDK Lambda";

/// Output directory of `cargo lambda build --release` for the query function
pub const FUNCTION_ASSET_PATH: &str = "target/lambda/claude-query-function";
/// The custom runtime always starts the executable named `bootstrap`
pub const FUNCTION_HANDLER: &str = "bootstrap";
pub const FUNCTION_TIMEOUT_SECONDS: u32 = 30;
pub const FUNCTION_MEMORY_SIZE_MB: u32 = 256;

/// Environment variable carrying the SSM parameter *name* (never its value)
pub const SSM_PARAM_ENV_VAR: &str = "SSM_PARAM_CLAUDE_API_KEY";
pub const SSM_PARAM_PATH: &str = "/claude-sdk/api-key";

pub const QUERY_ROUTE_PATH: &str = "/query";
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Emitted as the `ApiUrl` output when the gateway has no resolvable URL
pub const API_URL_FALLBACK: &str = "Something went wrong";

/// Default CDK bootstrap qualifier, used to address the staging bucket
pub const BOOTSTRAP_QUALIFIER: &str = "hnb659fds";

pub const BASIC_EXECUTION_ROLE_POLICY: &str = "service-role/AWSLambdaBasicExecutionRole";

// Logical ids
pub const USER_POOL_ID: &str = "ClaudeUserPool";
pub const USER_POOL_CLIENT_ID: &str = "ClaudeUserPoolClient";
pub const LAYER_ID: &str = "DependenciesLayer";
pub const FUNCTION_ID: &str = "ClaudeFunction";
pub const HTTP_API_ID: &str = "ClaudeApi";
pub const AUTHORIZER_ID: &str = "CognitoAuthorizer";
pub const INTEGRATION_ID: &str = "ClaudeIntegration";

// Output names
pub const OUTPUT_USER_POOL_ID: &str = "UserPoolId";
pub const OUTPUT_USER_POOL_CLIENT_ID: &str = "UserPoolClientId";
pub const OUTPUT_API_URL: &str = "ApiUrl";
