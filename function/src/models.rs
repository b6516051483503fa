// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::anthropic::{Message, MessagesRequest, Usage};
use crate::constants::{
    DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE, MAX_MODEL_LENGTH, MAX_OUTPUT_TOKENS,
    MAX_PROMPT_LENGTH,
};

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

/// Body of a `POST /query` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct QueryRequest {
    #[validate(length(min = 1, max = MAX_PROMPT_LENGTH))]
    pub prompt: String,
    #[serde(default = "default_max_tokens")]
    #[validate(range(min = 1, max = MAX_OUTPUT_TOKENS))]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub temperature: f64,
    #[serde(default = "default_model")]
    #[validate(length(min = 1, max = MAX_MODEL_LENGTH))]
    pub model: String,
}

impl QueryRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// A single user turn carrying the prompt.
    pub fn to_messages_request(&self) -> MessagesRequest {
        MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            messages: vec![Message::user(self.prompt.clone())],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub response: String,
    pub usage: Usage,
    /// Echoes the requested model, not the one reported upstream
    pub model: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_defaults_applied() {
        let request: QueryRequest = serde_json::from_value(json!({"prompt": "hi"})).unwrap();

        assert_eq!(request, QueryRequest::new("hi"));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_empty_prompt_rejected() {
        let request = QueryRequest::new("");
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_zero_max_tokens_rejected() {
        let mut request = QueryRequest::new("hi");
        request.max_tokens = 0;
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_messages_request_has_single_user_turn() {
        let request = QueryRequest::new("what is rust?").to_messages_request();

        assert_eq!(request.model, DEFAULT_MODEL);
        assert_eq!(request.messages, vec![Message::user("what is rust?")]);
    }

    proptest! {
        #[test]
        fn prop_temperature_bounds(temperature in -2.0f64..3.0) {
            let mut request = QueryRequest::new("hi");
            request.temperature = temperature;
            let in_range = (0.0..=1.0).contains(&temperature);
            prop_assert_eq!(request.validate().is_ok(), in_range);
        }
    }
}
