// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum StackError {
    #[error("duplicate logical id: {0}")]
    DuplicateLogicalId(String),
    #[error("{from} references undeclared resource {to}")]
    DanglingReference { from: String, to: String },
    #[error("dependency cycle between: {}", .0.join(", "))]
    DependencyCycle(Vec<String>),
    #[error("asset not found: {}", .0.display())]
    AssetNotFound(PathBuf),
    #[error("unable to read asset {}: {source}", .path.display())]
    AssetIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
    #[error("validation error: {0}")]
    ValidationError(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StackError {
    pub(crate) fn asset_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            return Self::AssetNotFound(path);
        }
        Self::AssetIo { path, source }
    }
}

/// Reasons a JWT authorizer rejects a request.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("unknown signing key: {0:?}")]
    UnknownKey(Option<String>),
    #[error("invalid token: {0}")]
    InvalidToken(String),
    #[error("token was not issued for an allowed client")]
    AudienceMismatch,
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(source: jsonwebtoken::errors::Error) -> Self {
        tracing::debug!("{:?}", source);
        AuthError::InvalidToken(source.to_string())
    }
}
