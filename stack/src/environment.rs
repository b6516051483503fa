// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Target account and region of a stack.
//!
//! Both are optional. When absent the template stays environment-agnostic and
//! resolves them at deploy time through the `AWS::AccountId` and `AWS::Region`
//! pseudo parameters.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::intrinsics::{self, AWS_ACCOUNT_ID, AWS_REGION};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl Environment {
    pub fn new(account: Option<String>, region: Option<String>) -> Self {
        Self {
            account: account.filter(|a| !a.trim().is_empty()),
            region: region.filter(|r| !r.trim().is_empty()),
        }
    }

    pub fn is_agnostic(&self) -> bool {
        self.account.is_none() && self.region.is_none()
    }

    pub fn account(&self) -> Value {
        match &self.account {
            Some(account) => Value::String(account.clone()),
            None => intrinsics::reference(AWS_ACCOUNT_ID),
        }
    }

    pub fn region(&self) -> Value {
        match &self.region {
            Some(region) => Value::String(region.clone()),
            None => intrinsics::reference(AWS_REGION),
        }
    }

    /// ARN of a single SSM parameter, e.g. `/claude-sdk/api-key` becomes
    /// `arn:aws:ssm:<region>:<account>:parameter/claude-sdk/api-key`.
    pub fn ssm_parameter_arn(&self, parameter_name: &str) -> Value {
        intrinsics::concat(vec![
            Value::String("arn:aws:ssm:".to_string()),
            self.region(),
            Value::String(":".to_string()),
            self.account(),
            Value::String(format!(":parameter{}", normalize_parameter_name(parameter_name))),
        ])
    }

    /// Issuer URL of the tokens minted by a Cognito user pool.
    pub fn cognito_issuer(&self, user_pool: Value) -> Value {
        intrinsics::concat(vec![
            Value::String("https://cognito-idp.".to_string()),
            self.region(),
            Value::String(".amazonaws.com/".to_string()),
            user_pool,
        ])
    }
}

/// Parameter names are hierarchical paths; the ARN form always carries a
/// leading slash after `parameter`.
pub fn normalize_parameter_name(parameter_name: &str) -> String {
    if parameter_name.starts_with('/') {
        parameter_name.to_string()
    } else {
        format!("/{parameter_name}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_blank_values_are_agnostic() {
        let env = Environment::new(Some(" ".into()), Some(String::new()));
        assert!(env.is_agnostic());
    }

    #[test]
    fn test_ssm_parameter_arn_literal() {
        let env = Environment::new(Some("123456789012".into()), Some("us-east-1".into()));
        assert_eq!(
            env.ssm_parameter_arn("/claude-sdk/api-key"),
            json!("arn:aws:ssm:us-east-1:123456789012:parameter/claude-sdk/api-key")
        );
    }

    #[test]
    fn test_ssm_parameter_arn_agnostic() {
        let env = Environment::default();
        assert_eq!(
            env.ssm_parameter_arn("claude-sdk/api-key"),
            json!({"Fn::Join": ["", [
                "arn:aws:ssm:",
                {"Ref": "AWS::Region"},
                ":",
                {"Ref": "AWS::AccountId"},
                ":parameter/claude-sdk/api-key"
            ]]})
        );
    }

    #[test]
    fn test_cognito_issuer_with_region() {
        let env = Environment::new(None, Some("eu-west-2".into()));
        assert_eq!(
            env.cognito_issuer(json!({"Ref": "Pool"})),
            json!({"Fn::Join": ["", ["https://cognito-idp.eu-west-2.amazonaws.com/", {"Ref": "Pool"}]]})
        );
    }
}
