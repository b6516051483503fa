// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::serve::Serve;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;

use crate::anthropic::MessagesApi;
use crate::configuration::FunctionOptions;
use crate::constants::{MAX_BODY_SIZE, REQUEST_TIMEOUT};
use crate::routes;
use crate::secrets::SecretCache;

#[derive(Clone)]
pub struct AppState {
    pub options: FunctionOptions,
    pub secrets: Arc<SecretCache>,
    pub messages: Arc<dyn MessagesApi>,
}

/// The router served both by the Lambda runtime and in local mode.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/query", post(routes::query))
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .with_state(Arc::new(state))
}

/// Local development server.
pub struct Application {
    port: u16,
    server: Serve<TcpListener, Router, Router>,
}

impl Application {
    pub async fn build(state: AppState) -> Result<Self, std::io::Error> {
        let address = format!("{}:{}", state.options.host, state.options.port);
        let listener = TcpListener::bind(address).await?;
        let host = state.options.host.clone();
        let server = run(listener, state)?;
        let port = server.local_addr()?.port();

        tracing::info!("[function] listening at http://{}:{}", host, port);

        Ok(Self { port, server })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

#[tracing::instrument(skip(listener, state))]
pub fn run(
    listener: TcpListener,
    state: AppState,
) -> Result<Serve<TcpListener, Router, Router>, std::io::Error> {
    Ok(axum::serve(listener, create_router(state)))
}
