// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! # Claude Query Function
//!
//! The compute tier of the Claude SDK stack: a Lambda function behind an HTTP
//! API JWT authorizer that forwards one prompt to the Anthropic Messages API.
//!
//! ## Architecture
//!
//! ```text
//! Client -> HTTP API (JWT) -> Lambda (this crate) -> Anthropic Messages API
//!                                   |
//!                                   +-> SSM Parameter Store (API key)
//! ```
//!
//! ## Modules
//!
//! - [`anthropic`]: Messages API client
//! - [`application`]: Axum router and the local development server
//! - [`configuration`]: CLI argument parsing with clap
//! - [`constants`]: Defaults, limits and timeouts
//! - [`errors`]: Application error types with HTTP response mapping
//! - [`models`]: Request/response types with validation
//! - [`routes`]: HTTP route handlers
//! - [`secrets`]: API key caching from SSM Parameter Store
//!
//! ## Usage
//!
//! ```bash
//! SSM_PARAM_CLAUDE_API_KEY=/claude-sdk/api-key claude-query-function --local --port 8080
//! ```
//!
//! ## Security Considerations
//!
//! - Only the parameter name is configured; the key is read at runtime
//! - The cached key is zeroized on drop and redacted from `Debug` output
//! - Request bodies are limited to 1 MB and handlers time out after 30 seconds

pub mod anthropic;
pub mod application;
pub mod configuration;
pub mod constants;
pub mod errors;
pub mod models;
pub mod routes;
pub mod secrets;
