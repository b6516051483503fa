// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use claude_query_function::anthropic::AnthropicClient;
use claude_query_function::application::{AppState, Application, create_router};
use claude_query_function::configuration::FunctionOptions;
use claude_query_function::constants::SECRET_CACHE_TTL;
use claude_query_function::secrets::{SecretCache, SsmSecretSource};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        // this needs to be set to remove duplicated information in the log.
        .with_current_span(false)
        // this needs to be set to false, otherwise ANSI color codes will
        // show up in a confusing manner in CloudWatch logs.
        .with_ansi(false)
        // disabling time is handy because CloudWatch will add the ingestion time.
        .without_time()
        // remove the name of the function from every log entry
        .with_target(false)
        .init();

    // get configuration options from environment variables
    let options = FunctionOptions::parse();

    tracing::info!("[function] {:?}", &options);

    let source = Arc::new(SsmSecretSource::from_env().await);
    let secrets = Arc::new(SecretCache::new(
        options.ssm_parameter.clone(),
        source,
        SECRET_CACHE_TTL,
    ));
    let messages = Arc::new(
        AnthropicClient::new(&options.anthropic_base_url).context("building HTTP client")?,
    );

    let state = AppState {
        options: options.clone(),
        secrets,
        messages,
    };

    if options.local {
        let application = Application::build(state)
            .await
            .context("binding local listener")?;
        application.run_until_stopped().await?;
        return Ok(());
    }

    lambda_http::run(create_router(state))
        .await
        .map_err(|e| anyhow::anyhow!(e))
}
