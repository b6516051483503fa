// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum AppError {
    #[error("invalid JSON in request body")]
    InvalidJson,
    #[error("invalid request format: {0}")]
    InvalidRequest(String),
    #[error("error calling Claude API: {details}")]
    UpstreamError {
        /// Status the Messages API answered with, if it answered at all
        status: Option<StatusCode>,
        details: String,
    },
    #[error("unable to read secret: {0}")]
    SecretError(String),
    #[error("internal server error: {0}")]
    InternalServerError(String),
    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body): (StatusCode, Value) = match self {
            Self::InvalidJson => (
                StatusCode::BAD_REQUEST,
                json!({"error": "Invalid JSON in request body"}),
            ),
            Self::InvalidRequest(details) => (
                StatusCode::BAD_REQUEST,
                json!({"error": "Invalid request format", "details": details}),
            ),
            Self::UpstreamError { details, .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"error": "Error calling Claude API", "details": details}),
            ),
            Self::SecretError(details)
            | Self::InternalServerError(details)
            | Self::ConfigError(details) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"error": "Internal server error", "details": details}),
            ),
        };

        (status, Json(body)).into_response()
    }
}

impl From<serde_json::Error> for AppError {
    fn from(source: serde_json::Error) -> Self {
        use serde_json::error::Category;

        tracing::debug!("{:?}", source);
        match source.classify() {
            Category::Syntax | Category::Eof => AppError::InvalidJson,
            Category::Data => AppError::InvalidRequest(source.to_string()),
            Category::Io => AppError::InternalServerError(source.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(source: validator::ValidationErrors) -> Self {
        tracing::debug!("{:?}", source);
        AppError::InvalidRequest(source.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(source: reqwest::Error) -> Self {
        tracing::error!("{:?}", source);
        AppError::UpstreamError {
            status: source.status(),
            details: source.to_string(),
        }
    }
}
