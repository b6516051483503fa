// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::time::Duration;

/// Environment variable naming the SSM parameter that holds the API key
pub const SSM_PARAM_ENV_VAR: &str = "SSM_PARAM_CLAUDE_API_KEY";
/// Parameter the stack provisions the function against
pub const DEFAULT_SSM_PARAM_PATH: &str = "/claude-sdk/api-key";
pub const SECRET_CACHE_TTL: Duration = Duration::from_secs(300); // 5 minutes

pub const ANTHROPIC_API_URL: &str = "https://api.anthropic.com";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const MESSAGES_PATH: &str = "/v1/messages";

// Defaults for QueryRequest
pub const DEFAULT_MODEL: &str = "claude-3-sonnet-20240229";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

// Validation constants for QueryRequest
pub const MAX_PROMPT_LENGTH: u64 = 200_000;
pub const MAX_MODEL_LENGTH: u64 = 128;
pub const MAX_OUTPUT_TOKENS: u32 = 64_000;

/// Matches the function's configured timeout ceiling
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Leaves headroom under REQUEST_TIMEOUT to answer with an error body
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(28);
pub const MAX_BODY_SIZE: usize = 1024 * 1024; // 1 MB
