// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Execution roles and the policy grants attached to them.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::errors::StackError;
use crate::intrinsics::{self, AWS_PARTITION, get_att, reference};
use crate::stack::Stack;

pub const ROLE_TYPE: &str = "AWS::IAM::Role";
pub const POLICY_TYPE: &str = "AWS::IAM::Policy";
pub const POLICY_VERSION: &str = "2012-10-17";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolicyStatement {
    pub effect: Effect,
    pub actions: Vec<String>,
    pub resources: Vec<Value>,
}

impl PolicyStatement {
    pub fn allow(actions: &[&str], resources: Vec<Value>) -> Self {
        Self {
            effect: Effect::Allow,
            actions: actions.iter().map(|a| a.to_string()).collect(),
            resources,
        }
    }

    pub fn to_json(&self) -> Value {
        let action: Value = match self.actions.as_slice() {
            [single] => json!(single),
            many => json!(many),
        };
        let resource: Value = match self.resources.as_slice() {
            [single] => single.clone(),
            many => json!(many),
        };
        json!({
            "Effect": self.effect,
            "Action": action,
            "Resource": resource,
        })
    }

    /// True when any action or literal resource fragment contains `*`.
    pub fn has_wildcard(&self) -> bool {
        self.actions.iter().any(|a| a.contains('*'))
            || self.resources.iter().any(value_has_wildcard)
    }
}

fn value_has_wildcard(value: &Value) -> bool {
    match value {
        Value::String(s) => s.contains('*'),
        Value::Array(items) => items.iter().any(value_has_wildcard),
        Value::Object(map) => map.values().any(value_has_wildcard),
        _ => false,
    }
}

pub fn managed_policy_arn(name: &str) -> Value {
    intrinsics::concat(vec![
        json!("arn:"),
        reference(AWS_PARTITION),
        json!(format!(":iam::aws:policy/{name}")),
    ])
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    logical_id: String,
}

impl Role {
    pub fn for_service(
        stack: &mut Stack,
        logical_id: &str,
        service: &str,
        managed_policies: &[&str],
    ) -> Result<Self, StackError> {
        let properties = json!({
            "AssumeRolePolicyDocument": {
                "Version": POLICY_VERSION,
                "Statement": [{
                    "Effect": Effect::Allow,
                    "Principal": {"Service": service},
                    "Action": "sts:AssumeRole",
                }],
            },
            "ManagedPolicyArns": managed_policies
                .iter()
                .map(|p| managed_policy_arn(p))
                .collect::<Vec<_>>(),
        });

        stack.add_resource(logical_id, ROLE_TYPE, properties)?;

        Ok(Self {
            logical_id: logical_id.to_string(),
        })
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    pub fn role_name(&self) -> Value {
        reference(&self.logical_id)
    }

    pub fn arn(&self) -> Value {
        get_att(&self.logical_id, "Arn")
    }
}

/// An inline policy attached to a single role.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    logical_id: String,
    statements: Vec<PolicyStatement>,
}

impl Policy {
    pub fn attach(
        stack: &mut Stack,
        logical_id: &str,
        role: &Role,
        statements: Vec<PolicyStatement>,
    ) -> Result<Self, StackError> {
        let policy = Self {
            logical_id: logical_id.to_string(),
            statements,
        };

        let properties = json!({
            "PolicyName": logical_id,
            "PolicyDocument": policy.document(),
            "Roles": [role.role_name()],
        });
        stack.add_resource(logical_id, POLICY_TYPE, properties)?;

        Ok(policy)
    }

    pub fn add_statement(
        &mut self,
        stack: &mut Stack,
        statement: PolicyStatement,
    ) -> Result<(), StackError> {
        self.statements.push(statement);
        let document = self.document();
        let resource = stack
            .resource_mut(&self.logical_id)
            .ok_or_else(|| StackError::InvariantViolation(format!("policy {} not declared", self.logical_id)))?;
        resource.properties["PolicyDocument"] = document;
        Ok(())
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    pub fn statements(&self) -> &[PolicyStatement] {
        &self.statements
    }

    fn document(&self) -> Value {
        json!({
            "Version": POLICY_VERSION,
            "Statement": self.statements.iter().map(PolicyStatement::to_json).collect::<Vec<_>>(),
        })
    }
}
