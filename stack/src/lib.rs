// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! # Claude SDK Stack
//!
//! Infrastructure definition for the Claude SDK query service.
//!
//! This crate declares the desired-state resource graph of the service and
//! synthesizes it into a CloudFormation template plus an asset manifest. It
//! does not deploy anything: a provisioning engine applies the template.
//!
//! ## Architecture
//!
//! ```text
//! Client -> HTTP API (JWT authorizer) -> Lambda (claude-query-function)
//!                  |                              |
//!                  +-> Cognito user pool client   +-> SSM Parameter Store
//! ```
//!
//! ## Modules
//!
//! - [`apigateway`]: HTTP API, routes, Lambda integrations and JWT authorizers
//! - [`assets`]: asset fingerprinting and staging locations
//! - [`claude_sdk_stack`]: the service's resource graph and its invariants
//! - [`cognito`]: user pool and user pool client
//! - [`configuration`]: CLI argument parsing with clap
//! - [`constants`]: fixed resource attributes and logical ids
//! - [`environment`]: target account and region
//! - [`errors`]: stack and authorization error types
//! - [`gateway`]: request-time route matching and token validation
//! - [`iam`]: execution roles and policy statements
//! - [`intrinsics`]: CloudFormation intrinsic functions
//! - [`lambda`]: functions, layers and invoke permissions
//! - [`stack`]: resource registry, validation, ordering and synthesis
//!
//! ## Usage
//!
//! ```bash
//! claude-sdk-stack synth --out-dir cdk.out
//! claude-sdk-stack plan --region us-east-1
//! ```

pub mod apigateway;
pub mod assets;
pub mod claude_sdk_stack;
pub mod cognito;
pub mod configuration;
pub mod constants;
pub mod environment;
pub mod errors;
pub mod gateway;
pub mod iam;
pub mod intrinsics;
pub mod lambda;
pub mod stack;
