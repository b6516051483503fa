// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Request-time behavior of the HTTP API.
//!
//! The managed gateway matches a request against the declared routes, runs
//! the route's JWT authorizer and only then invokes the integration. This
//! module reproduces that decision so route declarations can be checked
//! locally:
//!
//! | Outcome | Status | Body |
//! |---------|--------|------|
//! | no route for method + path | 404 | `{"message":"Not Found"}` |
//! | missing or rejected token | 401 | `{"message":"Unauthorized"}` |
//! | authorized | - | forwarded to the function |

use std::collections::HashMap;

use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::apigateway::{HttpApi, HttpMethod};
use crate::errors::AuthError;

/// Claims the gateway forwards to the function once a token is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iss: String,
    pub exp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_use: Option<String>,
    /// Present on id tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    /// Present on access tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(
        default,
        rename = "cognito:username",
        skip_serializing_if = "Option::is_none"
    )]
    pub username: Option<String>,
}

pub trait TokenVerifier {
    fn verify(&self, token: &str) -> Result<Claims, AuthError>;
}

/// Validates tokens issued by one Cognito user pool for a set of clients.
pub struct CognitoJwtVerifier {
    issuer: String,
    client_ids: Vec<String>,
    keys: HashMap<String, (DecodingKey, Algorithm)>,
    leeway: u64,
}

impl CognitoJwtVerifier {
    pub fn new(region: &str, user_pool_id: &str, client_ids: Vec<String>) -> Self {
        Self {
            issuer: format!("https://cognito-idp.{region}.amazonaws.com/{user_pool_id}"),
            client_ids,
            keys: HashMap::new(),
            leeway: 0,
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn with_leeway(mut self, seconds: u64) -> Self {
        self.leeway = seconds;
        self
    }

    pub fn with_key(mut self, kid: &str, key: DecodingKey, algorithm: Algorithm) -> Self {
        self.keys.insert(kid.to_string(), (key, algorithm));
        self
    }

    /// Loads the pool's published key set (`/.well-known/jwks.json`).
    /// Cognito signs with RS256. Keys without a `kid` can never be selected
    /// by a token header and are skipped.
    pub fn with_jwks(mut self, jwks: &JwkSet) -> Result<Self, AuthError> {
        for jwk in &jwks.keys {
            let Some(kid) = jwk.common.key_id.clone() else {
                tracing::warn!("[stack] skipping JWK without kid");
                continue;
            };
            let key = DecodingKey::from_jwk(jwk)?;
            self.keys.insert(kid, (key, Algorithm::RS256));
        }
        Ok(self)
    }

    pub fn key_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.keys.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

impl TokenVerifier for CognitoJwtVerifier {
    fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let token = strip_bearer(token).ok_or(AuthError::MissingToken)?;

        let header = decode_header(token)?;
        let (key, algorithm) = header
            .kid
            .as_ref()
            .and_then(|kid| self.keys.get(kid))
            .ok_or_else(|| AuthError::UnknownKey(header.kid.clone()))?;
        if header.alg != *algorithm {
            return Err(AuthError::InvalidToken(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }

        let mut validation = Validation::new(*algorithm);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        // Cognito access tokens carry `client_id` instead of `aud`
        validation.validate_aud = false;
        validation.leeway = self.leeway;

        let claims = decode::<Claims>(token, key, &validation)?.claims;

        let audience = match claims.token_use.as_deref() {
            Some("access") => claims.client_id.as_deref(),
            _ => claims.aud.as_deref().or(claims.client_id.as_deref()),
        };
        match audience {
            Some(audience) if self.client_ids.iter().any(|c| c == audience) => Ok(claims),
            _ => Err(AuthError::AudienceMismatch),
        }
    }
}

/// The gateway accepts both `Bearer <jwt>` and a bare `<jwt>`.
fn strip_bearer(value: &str) -> Option<&str> {
    let value = value.trim_start();
    let token = match value.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("bearer ") => {
            value.get(7..).unwrap_or_default()
        }
        _ => value,
    }
    .trim();
    (!token.is_empty()).then_some(token)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    NotFound,
    Unauthorized,
    Invoke {
        /// Logical id of the target function
        function: String,
        claims: Option<Claims>,
    },
}

impl Dispatch {
    /// Status the gateway answers with itself; `None` when the function
    /// produces the response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Dispatch::NotFound => Some(404),
            Dispatch::Unauthorized => Some(401),
            Dispatch::Invoke { .. } => None,
        }
    }

    pub fn gateway_body(&self) -> Option<Value> {
        match self {
            Dispatch::NotFound => Some(json!({"message": "Not Found"})),
            Dispatch::Unauthorized => Some(json!({"message": "Unauthorized"})),
            Dispatch::Invoke { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RouteEntry {
    method: HttpMethod,
    path: String,
    function: String,
    /// `None` for routes without an authorizer
    identity_headers: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn from_api(api: &HttpApi) -> Self {
        let entries = api
            .routes()
            .iter()
            .map(|route| RouteEntry {
                method: route.method(),
                path: route.path().to_string(),
                function: route.function().to_string(),
                identity_headers: route.authorizer().map(|authorizer| {
                    authorizer
                        .identity_headers()
                        .into_iter()
                        .map(str::to_string)
                        .collect()
                }),
            })
            .collect();
        Self { entries }
    }

    pub fn route_keys(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|entry| format!("{} {}", entry.method, entry.path))
            .collect()
    }

    /// Decides what the gateway does with a request. The authorizer always
    /// runs before the integration is selected for invocation.
    pub fn dispatch(
        &self,
        method: &str,
        path: &str,
        headers: &[(&str, &str)],
        verifier: &dyn TokenVerifier,
    ) -> Dispatch {
        let path = path.split('?').next().unwrap_or(path);
        let Ok(method) = method.parse::<HttpMethod>() else {
            return Dispatch::NotFound;
        };

        let entry = self
            .entries
            .iter()
            .find(|e| e.path == path && e.method == method)
            .or_else(|| {
                self.entries
                    .iter()
                    .find(|e| e.path == path && e.method == HttpMethod::Any)
            });
        let Some(entry) = entry else {
            tracing::debug!("[stack] no route for {} {}", method, path);
            return Dispatch::NotFound;
        };

        let claims = match &entry.identity_headers {
            None => None,
            Some(names) => {
                let token = names.iter().find_map(|name| {
                    headers
                        .iter()
                        .find(|(key, _)| key.eq_ignore_ascii_case(name))
                        .map(|(_, value)| *value)
                });
                let Some(token) = token else {
                    tracing::debug!("[stack] {} {} has no identity header", method, path);
                    return Dispatch::Unauthorized;
                };
                match verifier.verify(token) {
                    Ok(claims) => Some(claims),
                    Err(e) => {
                        tracing::debug!("[stack] rejected token for {} {}: {}", method, path, e);
                        return Dispatch::Unauthorized;
                    }
                }
            }
        };

        Dispatch::Invoke {
            function: entry.function.clone(),
            claims,
        }
    }
}
