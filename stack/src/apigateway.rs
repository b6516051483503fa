// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! HTTP Gateway, its routes, Lambda proxy integrations and JWT authorizers.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde_json::{Value, json};

use crate::cognito::{UserPool, UserPoolClient};
use crate::errors::StackError;
use crate::intrinsics::{self, AWS_PARTITION, AWS_URL_SUFFIX, reference};
use crate::lambda::Function;
use crate::stack::Stack;

pub const API_TYPE: &str = "AWS::ApiGatewayV2::Api";
pub const STAGE_TYPE: &str = "AWS::ApiGatewayV2::Stage";
pub const INTEGRATION_TYPE: &str = "AWS::ApiGatewayV2::Integration";
pub const AUTHORIZER_TYPE: &str = "AWS::ApiGatewayV2::Authorizer";
pub const ROUTE_TYPE: &str = "AWS::ApiGatewayV2::Route";

const DEFAULT_STAGE_NAME: &str = "$default";
const PAYLOAD_FORMAT_VERSION: &str = "2.0";
const API_GATEWAY_PRINCIPAL: &str = "apigateway.amazonaws.com";
const HEADER_IDENTITY_PREFIX: &str = "$request.header.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HttpMethod {
    Any,
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Any => "ANY",
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = StackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ANY" => Ok(HttpMethod::Any),
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            other => Err(StackError::ValidationError(format!("unknown HTTP method: {other}"))),
        }
    }
}

/// Proxies requests to a Lambda function using payload format 2.0.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpLambdaIntegration {
    id: String,
    function: Function,
}

impl HttpLambdaIntegration {
    pub fn new(id: &str, function: &Function) -> Self {
        Self {
            id: id.to_string(),
            function: function.clone(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn function(&self) -> &Function {
        &self.function
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpUserPoolAuthorizerProps {
    pub user_pool_clients: Vec<UserPoolClient>,
    pub identity_source: Vec<String>,
}

/// JWT authorizer validating tokens minted by a user pool for its clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpUserPoolAuthorizer {
    id: String,
    user_pool: UserPool,
    clients: Vec<UserPoolClient>,
    identity_source: Vec<String>,
}

impl HttpUserPoolAuthorizer {
    pub fn new(
        id: &str,
        user_pool: &UserPool,
        props: HttpUserPoolAuthorizerProps,
    ) -> Result<Self, StackError> {
        if props.user_pool_clients.is_empty() {
            return Err(StackError::InvariantViolation(format!(
                "authorizer {id} must reference at least one user pool client"
            )));
        }
        if let Some(foreign) = props
            .user_pool_clients
            .iter()
            .find(|client| client.user_pool() != user_pool)
        {
            return Err(StackError::InvariantViolation(format!(
                "client {} does not belong to user pool {}",
                foreign.logical_id(),
                user_pool.logical_id()
            )));
        }
        if props.identity_source.is_empty() {
            return Err(StackError::ValidationError(format!(
                "authorizer {id} has no identity source"
            )));
        }

        Ok(Self {
            id: id.to_string(),
            user_pool: user_pool.clone(),
            clients: props.user_pool_clients,
            identity_source: props.identity_source,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn user_pool(&self) -> &UserPool {
        &self.user_pool
    }

    pub fn clients(&self) -> &[UserPoolClient] {
        &self.clients
    }

    pub fn identity_source(&self) -> &[String] {
        &self.identity_source
    }

    /// Header names the token is read from, e.g. `Authorization`.
    pub fn identity_headers(&self) -> Vec<&str> {
        self.identity_source
            .iter()
            .filter_map(|source| source.strip_prefix(HEADER_IDENTITY_PREFIX))
            .collect()
    }
}

pub struct AddRoutesOptions<'a> {
    pub path: &'a str,
    pub methods: &'a [HttpMethod],
    pub integration: &'a HttpLambdaIntegration,
    pub authorizer: Option<&'a HttpUserPoolAuthorizer>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRoute {
    logical_id: String,
    method: HttpMethod,
    path: String,
    function: String,
    authorizer: Option<HttpUserPoolAuthorizer>,
}

impl HttpRoute {
    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn route_key(&self) -> String {
        format!("{} {}", self.method, self.path)
    }

    /// Logical id of the function the integration targets.
    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn authorizer(&self) -> Option<&HttpUserPoolAuthorizer> {
        self.authorizer.as_ref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpApiProps {
    pub create_default_stage: bool,
}

impl Default for HttpApiProps {
    fn default() -> Self {
        Self {
            create_default_stage: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpApi {
    logical_id: String,
    default_stage: Option<String>,
    routes: Vec<HttpRoute>,
    integrations: BTreeSet<String>,
    authorizers: BTreeSet<String>,
}

impl HttpApi {
    pub fn new(stack: &mut Stack, logical_id: &str, props: HttpApiProps) -> Result<Self, StackError> {
        stack.add_resource(
            logical_id,
            API_TYPE,
            json!({
                "Name": logical_id,
                "ProtocolType": "HTTP",
            }),
        )?;

        let default_stage = if props.create_default_stage {
            let stage_id = format!("{logical_id}DefaultStage");
            stack.add_resource(
                &stage_id,
                STAGE_TYPE,
                json!({
                    "ApiId": reference(logical_id),
                    "StageName": DEFAULT_STAGE_NAME,
                    "AutoDeploy": true,
                }),
            )?;
            Some(stage_id)
        } else {
            None
        };

        Ok(Self {
            logical_id: logical_id.to_string(),
            default_stage,
            routes: Vec::new(),
            integrations: BTreeSet::new(),
            authorizers: BTreeSet::new(),
        })
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    pub fn api_id(&self) -> Value {
        reference(&self.logical_id)
    }

    pub fn routes(&self) -> &[HttpRoute] {
        &self.routes
    }

    /// Invoke URL of the `$default` stage; `None` when the API has no
    /// default stage.
    pub fn url(&self, stack: &Stack) -> Option<Value> {
        self.default_stage.as_ref()?;
        Some(intrinsics::concat(vec![
            json!("https://"),
            self.api_id(),
            json!(".execute-api."),
            stack.environment().region(),
            json!("."),
            reference(AWS_URL_SUFFIX),
            json!("/"),
        ]))
    }

    /// `arn:<partition>:execute-api:<region>:<account>:<api>/*/<method><path>`,
    /// any stage. `ANY` routes are granted every method.
    fn execute_api_arn(&self, stack: &Stack, method: HttpMethod, path: &str) -> Value {
        let method = match method {
            HttpMethod::Any => "*",
            other => other.as_str(),
        };
        let env = stack.environment();
        intrinsics::concat(vec![
            json!("arn:"),
            reference(AWS_PARTITION),
            json!(":execute-api:"),
            env.region(),
            json!(":"),
            env.account(),
            json!(":"),
            self.api_id(),
            json!(format!("/*/{method}{path}")),
        ])
    }

    pub fn add_routes(
        &mut self,
        stack: &mut Stack,
        options: AddRoutesOptions<'_>,
    ) -> Result<Vec<HttpRoute>, StackError> {
        let path = options.path;
        if !path.starts_with('/') {
            return Err(StackError::ValidationError(format!(
                "route path must start with '/': {path}"
            )));
        }
        if options.methods.is_empty() {
            return Err(StackError::ValidationError(format!(
                "route {path} declares no method"
            )));
        }

        if let Some(method) = options.methods.iter().find(|&&method| {
            self.routes
                .iter()
                .any(|route| route.method == method && route.path == path)
        }) {
            return Err(StackError::ValidationError(format!(
                "route {method} {path} already exists"
            )));
        }

        let integration_id = self.bind_integration(stack, options.integration)?;
        let authorizer_id = match options.authorizer {
            Some(authorizer) => Some(self.bind_authorizer(stack, authorizer)?),
            None => None,
        };

        let mut added = Vec::with_capacity(options.methods.len());
        for &method in options.methods {
            let logical_id = format!("{}{}{}", self.logical_id, method, sanitize(path));
            let mut properties = json!({
                "ApiId": self.api_id(),
                "RouteKey": format!("{method} {path}"),
                "Target": intrinsics::concat(vec![json!("integrations/"), reference(&integration_id)]),
                "AuthorizationType": "NONE",
            });
            if let Some(authorizer_id) = &authorizer_id {
                properties["AuthorizationType"] = json!("JWT");
                properties["AuthorizerId"] = reference(authorizer_id);
            }
            stack.add_resource(&logical_id, ROUTE_TYPE, properties)?;

            // each route needs its own grant, the integration may be shared
            let source_arn = self.execute_api_arn(stack, method, path);
            options.integration.function().grant_invoke(
                stack,
                &format!("{logical_id}Permission"),
                API_GATEWAY_PRINCIPAL,
                Some(source_arn),
            )?;

            let route = HttpRoute {
                logical_id,
                method,
                path: path.to_string(),
                function: options.integration.function().logical_id().to_string(),
                authorizer: options.authorizer.cloned(),
            };
            tracing::debug!("[stack] added route {}", route.route_key());
            self.routes.push(route.clone());
            added.push(route);
        }

        Ok(added)
    }

    fn bind_integration(
        &mut self,
        stack: &mut Stack,
        integration: &HttpLambdaIntegration,
    ) -> Result<String, StackError> {
        let logical_id = format!("{}{}", self.logical_id, integration.id());
        if self.integrations.contains(&logical_id) {
            return Ok(logical_id);
        }

        stack.add_resource(
            &logical_id,
            INTEGRATION_TYPE,
            json!({
                "ApiId": self.api_id(),
                "IntegrationType": "AWS_PROXY",
                "IntegrationUri": integration.function().function_arn(),
                "PayloadFormatVersion": PAYLOAD_FORMAT_VERSION,
            }),
        )?;

        self.integrations.insert(logical_id.clone());
        Ok(logical_id)
    }

    fn bind_authorizer(
        &mut self,
        stack: &mut Stack,
        authorizer: &HttpUserPoolAuthorizer,
    ) -> Result<String, StackError> {
        let logical_id = format!("{}{}", self.logical_id, authorizer.id());
        if self.authorizers.contains(&logical_id) {
            return Ok(logical_id);
        }

        let issuer = stack
            .environment()
            .cognito_issuer(authorizer.user_pool().user_pool_id());
        stack.add_resource(
            &logical_id,
            AUTHORIZER_TYPE,
            json!({
                "ApiId": self.api_id(),
                "Name": authorizer.id(),
                "AuthorizerType": "JWT",
                "IdentitySource": authorizer.identity_source(),
                "JwtConfiguration": {
                    "Audience": authorizer
                        .clients()
                        .iter()
                        .map(UserPoolClient::user_pool_client_id)
                        .collect::<Vec<_>>(),
                    "Issuer": issuer,
                },
            }),
        )?;

        self.authorizers.insert(logical_id.clone());
        Ok(logical_id)
    }
}

/// Keeps only the characters allowed in a logical id.
fn sanitize(path: &str) -> String {
    path.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}
