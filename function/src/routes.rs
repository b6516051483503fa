// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! HTTP route handlers for the Claude query function.
//!
//! | Method | Path | Handler | Description |
//! |--------|------|---------|-------------|
//! | POST | `/query` | [`query`] | Send one prompt to Claude |

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use validator::Validate;

use crate::application::AppState;
use crate::errors::AppError;
use crate::models::{QueryRequest, QueryResponse};

/// Forwards a prompt to the Claude Messages API.
///
/// # Request Flow
///
/// 1. Parse the body (an empty body is read as `{}`) and apply defaults
/// 2. Validate the [`QueryRequest`]
/// 3. Resolve the API key from the secret cache
/// 4. Call the Messages API with a single user message
/// 5. Return the first text block with token usage
///
/// # Errors
///
/// - [`AppError::InvalidJson`] - Body is not JSON
/// - [`AppError::InvalidRequest`] - Missing prompt or out of range parameters
/// - [`AppError::SecretError`] - The API key parameter could not be read
/// - [`AppError::UpstreamError`] - The Messages API call failed
#[tracing::instrument(skip(state, body))]
pub async fn query(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<QueryResponse>, AppError> {
    // 1. Parse, treating a missing body like an empty object
    let request: QueryRequest = if body.iter().all(u8::is_ascii_whitespace) {
        serde_json::from_slice(b"{}")?
    } else {
        serde_json::from_slice(&body)?
    };

    // 2. Validate before touching the secret
    request.validate().map_err(|e| {
        tracing::warn!("[function] validation failed: {}", e);
        AppError::from(e)
    })?;

    // 3. Fetch (or use cached) API key
    let api_key = state.secrets.get().await.map_err(|e| {
        tracing::error!("[function] failed to get API key: {:?}", e);
        e
    })?;

    // 4. Call Claude
    tracing::debug!(
        "[function] calling Claude with model {} and max_tokens {}",
        request.model,
        request.max_tokens
    );
    let response = match state
        .messages
        .create_message(&api_key, &request.to_messages_request())
        .await
    {
        Ok(response) => response,
        Err(e) => {
            if matches!(
                &e,
                AppError::UpstreamError { status: Some(status), .. } if *status == StatusCode::UNAUTHORIZED
            ) {
                // the parameter may have been rotated since it was cached
                tracing::warn!("[function] API key rejected, dropping cached key");
                state.secrets.invalidate().await;
            }
            return Err(e);
        }
    };

    // 5. Shape the reply
    let text = response.first_text().ok_or_else(|| {
        AppError::InternalServerError("Claude response contained no text content".to_string())
    })?;

    tracing::info!(
        "[function] query completed, input_tokens={} output_tokens={}",
        response.usage.input_tokens,
        response.usage.output_tokens
    );

    Ok(Json(QueryResponse {
        response: text.to_string(),
        usage: response.usage,
        model: request.model,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::anthropic::{ContentBlock, MessagesApi, MessagesRequest, MessagesResponse, Usage};
    use crate::configuration::FunctionOptions;
    use crate::secrets::{ApiKey, SecretCache, SecretSource};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    struct StaticSecret;

    #[async_trait]
    impl SecretSource for StaticSecret {
        async fn fetch(&self, _name: &str) -> Result<ApiKey, AppError> {
            Ok(ApiKey::new("sk-test"))
        }
    }

    #[derive(Default)]
    struct RecordingApi {
        seen: Mutex<Vec<MessagesRequest>>,
        content: Vec<ContentBlock>,
    }

    #[async_trait]
    impl MessagesApi for RecordingApi {
        async fn create_message(
            &self,
            api_key: &ApiKey,
            request: &MessagesRequest,
        ) -> Result<MessagesResponse, AppError> {
            assert_eq!(api_key.expose(), "sk-test");
            self.seen.lock().unwrap().push(request.clone());
            Ok(MessagesResponse {
                id: "msg_1".to_string(),
                model: "claude-upstream".to_string(),
                content: self.content.clone(),
                stop_reason: None,
                usage: Usage {
                    input_tokens: 1,
                    output_tokens: 2,
                },
            })
        }
    }

    fn state(api: Arc<RecordingApi>) -> State<Arc<AppState>> {
        let options = FunctionOptions::default();
        let secrets = Arc::new(SecretCache::new(
            options.ssm_parameter.clone(),
            Arc::new(StaticSecret),
            Duration::from_secs(60),
        ));
        State(Arc::new(AppState {
            options,
            secrets,
            messages: api,
        }))
    }

    #[tokio::test]
    async fn test_query_returns_first_text_and_requested_model() {
        let api = Arc::new(RecordingApi {
            content: vec![
                ContentBlock::Other,
                ContentBlock::Text {
                    text: "hello".into(),
                },
            ],
            ..Default::default()
        });

        let Json(response) = query(
            state(api.clone()),
            Bytes::from_static(br#"{"prompt":"hi","model":"claude-x"}"#),
        )
        .await
        .unwrap();

        assert_eq!(response.response, "hello");
        assert_eq!(response.model, "claude-x");
        assert_eq!(response.usage.output_tokens, 2);
        assert_eq!(api.seen.lock().unwrap()[0].max_tokens, 1024);
    }

    #[tokio::test]
    async fn test_whitespace_body_is_missing_prompt() {
        let api = Arc::new(RecordingApi::default());
        let result = query(state(api.clone()), Bytes::from_static(b"  \n")).await;

        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
        assert!(api.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_text_block_is_internal_error() {
        let api = Arc::new(RecordingApi {
            content: vec![ContentBlock::Other],
            ..Default::default()
        });
        let result = query(state(api), Bytes::from_static(br#"{"prompt":"hi"}"#)).await;

        assert!(matches!(result, Err(AppError::InternalServerError(_))));
    }
}
