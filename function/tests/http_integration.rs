// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! HTTP integration tests for the Claude query function.
//!
//! These tests use `axum-test` to drive the full router with its middleware
//! (body limit, timeout). The SSM and Messages API collaborators are replaced
//! with in-process fakes.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::TestServer;
use claude_query_function::anthropic::{
    ContentBlock, MessagesApi, MessagesRequest, MessagesResponse, Usage,
};
use claude_query_function::application::{AppState, create_router};
use claude_query_function::configuration::FunctionOptions;
use claude_query_function::errors::AppError;
use claude_query_function::secrets::{ApiKey, SecretCache, SecretSource};
use serde_json::json;

struct FakeSecret {
    fail: bool,
    calls: AtomicUsize,
}

#[async_trait]
impl SecretSource for FakeSecret {
    async fn fetch(&self, name: &str) -> Result<ApiKey, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AppError::SecretError(format!("access denied for {name}")));
        }
        Ok(ApiKey::new("sk-ant-test"))
    }
}

enum Upstream {
    Echo,
    Fail,
    Unauthorized,
}

#[async_trait]
impl MessagesApi for Upstream {
    async fn create_message(
        &self,
        _api_key: &ApiKey,
        request: &MessagesRequest,
    ) -> Result<MessagesResponse, AppError> {
        match self {
            Upstream::Echo => Ok(MessagesResponse {
                id: "msg_test".to_string(),
                model: request.model.clone(),
                content: vec![ContentBlock::Text {
                    text: format!("echo: {}", request.messages[0].content),
                }],
                stop_reason: Some("end_turn".to_string()),
                usage: Usage {
                    input_tokens: 10,
                    output_tokens: u64::from(request.max_tokens),
                },
            }),
            Upstream::Fail => Err(AppError::UpstreamError {
                status: StatusCode::from_u16(529).ok(),
                details: "529: overloaded_error: Overloaded".to_string(),
            }),
            Upstream::Unauthorized => Err(AppError::UpstreamError {
                status: Some(StatusCode::UNAUTHORIZED),
                details: "401 Unauthorized: authentication_error: invalid x-api-key".to_string(),
            }),
        }
    }
}

fn server_with(secret: Arc<FakeSecret>, upstream: Upstream) -> TestServer {
    let options = FunctionOptions::default();
    let secrets = Arc::new(SecretCache::new(
        options.ssm_parameter.clone(),
        secret,
        Duration::from_secs(300),
    ));
    let app = create_router(AppState {
        options,
        secrets,
        messages: Arc::new(upstream),
    });
    TestServer::new(app).unwrap()
}

fn fake_secret(fail: bool) -> Arc<FakeSecret> {
    Arc::new(FakeSecret {
        fail,
        calls: AtomicUsize::new(0),
    })
}

fn create_test_server() -> TestServer {
    server_with(fake_secret(false), Upstream::Echo)
}

#[tokio::test]
async fn test_query_returns_response_usage_and_model() {
    let server = create_test_server();
    let response = server
        .post("/query")
        .json(&json!({"prompt": "hello", "max_tokens": 20, "model": "claude-3-haiku-20240307"}))
        .await;

    response.assert_status_ok();
    response.assert_json(&json!({
        "response": "echo: hello",
        "usage": {"input_tokens": 10, "output_tokens": 20},
        "model": "claude-3-haiku-20240307"
    }));
}

#[tokio::test]
async fn test_query_applies_defaults() {
    let server = create_test_server();
    let response = server.post("/query").json(&json!({"prompt": "hi"})).await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["model"], "claude-3-sonnet-20240229");
    assert_eq!(body["usage"]["output_tokens"], 1024);
}

#[tokio::test]
async fn test_invalid_json_returns_400() {
    let server = create_test_server();
    let response = server.post("/query").text("{not json").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    response.assert_json(&json!({"error": "Invalid JSON in request body"}));
}

#[tokio::test]
async fn test_missing_prompt_returns_400() {
    let server = create_test_server();
    let response = server.post("/query").json(&json!({"max_tokens": 10})).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "Invalid request format");
    assert!(body["details"].is_string());
}

#[tokio::test]
async fn test_empty_prompt_returns_400() {
    let server = create_test_server();
    let response = server.post("/query").json(&json!({"prompt": ""})).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "Invalid request format");
}

#[tokio::test]
async fn test_out_of_range_temperature_returns_400() {
    let server = create_test_server();
    let response = server
        .post("/query")
        .json(&json!({"prompt": "hi", "temperature": 1.5}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_empty_body_returns_400() {
    let server = create_test_server();
    let response = server.post("/query").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "Invalid request format");
}

#[tokio::test]
async fn test_invalid_request_does_not_read_secret() {
    let secret = fake_secret(false);
    let server = server_with(secret.clone(), Upstream::Echo);
    server.post("/query").json(&json!({"prompt": ""})).await;

    assert_eq!(secret.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_secret_is_cached_across_requests() {
    let secret = fake_secret(false);
    let server = server_with(secret.clone(), Upstream::Echo);
    for _ in 0..3 {
        server
            .post("/query")
            .json(&json!({"prompt": "hi"}))
            .await
            .assert_status_ok();
    }

    assert_eq!(secret.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_secret_failure_returns_500() {
    let server = server_with(fake_secret(true), Upstream::Echo);
    let response = server.post("/query").json(&json!({"prompt": "hi"})).await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "Internal server error");
}

#[tokio::test]
async fn test_upstream_failure_returns_500() {
    let server = server_with(fake_secret(false), Upstream::Fail);
    let response = server.post("/query").json(&json!({"prompt": "hi"})).await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    response.assert_json(&json!({
        "error": "Error calling Claude API",
        "details": "529: overloaded_error: Overloaded"
    }));
}

#[tokio::test]
async fn test_rejected_api_key_is_fetched_again() {
    let secret = fake_secret(false);
    let server = server_with(secret.clone(), Upstream::Unauthorized);
    for _ in 0..2 {
        server
            .post("/query")
            .json(&json!({"prompt": "hi"}))
            .await
            .assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    }

    assert_eq!(secret.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_upstream_failure_keeps_cached_key() {
    let secret = fake_secret(false);
    let server = server_with(secret.clone(), Upstream::Fail);
    for _ in 0..2 {
        server.post("/query").json(&json!({"prompt": "hi"})).await;
    }

    assert_eq!(secret.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_body_over_limit_returns_413() {
    let server = create_test_server();
    let prompt = "a".repeat(1024 * 1024 + 1);
    let response = server.post("/query").json(&json!({"prompt": prompt})).await;

    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_get_query_not_allowed() {
    let server = create_test_server();
    let response = server.get("/query").await;

    response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
}
