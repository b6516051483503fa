// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Identity Directory (user pool) and Directory Client (user pool client).

use serde_json::{Value, json};

use crate::errors::StackError;
use crate::intrinsics::{get_att, reference};
use crate::stack::Stack;

pub const USER_POOL_TYPE: &str = "AWS::Cognito::UserPool";
pub const USER_POOL_CLIENT_TYPE: &str = "AWS::Cognito::UserPoolClient";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignInAliases {
    pub username: bool,
    pub email: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardAttribute {
    pub required: bool,
    pub mutable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPoolProps {
    pub user_pool_name: String,
    pub self_sign_up_enabled: bool,
    pub sign_in_aliases: SignInAliases,
    pub email: Option<StandardAttribute>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPool {
    logical_id: String,
}

impl UserPool {
    pub fn new(stack: &mut Stack, logical_id: &str, props: &UserPoolProps) -> Result<Self, StackError> {
        let aliases = props.sign_in_aliases;
        if !aliases.username && !aliases.email {
            return Err(StackError::ValidationError(
                "a user pool needs at least one sign-in alias".to_string(),
            ));
        }

        let mut properties = json!({
            "UserPoolName": props.user_pool_name,
            "AdminCreateUserConfig": {
                "AllowAdminCreateUserOnly": !props.self_sign_up_enabled,
            },
        });

        // With username sign-in, email is an alias of the username; without
        // it, email replaces the username altogether.
        if aliases.email {
            let key = if aliases.username {
                "AliasAttributes"
            } else {
                "UsernameAttributes"
            };
            properties[key] = json!(["email"]);
            properties["AutoVerifiedAttributes"] = json!(["email"]);
        }

        if let Some(email) = props.email {
            properties["Schema"] = json!([{
                "Name": "email",
                "Required": email.required,
                "Mutable": email.mutable,
            }]);
        }

        stack.add_resource(logical_id, USER_POOL_TYPE, properties)?;

        Ok(Self {
            logical_id: logical_id.to_string(),
        })
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    pub fn user_pool_id(&self) -> Value {
        reference(&self.logical_id)
    }

    pub fn arn(&self) -> Value {
        get_att(&self.logical_id, "Arn")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthFlows {
    pub admin_user_password: bool,
    pub user_password: bool,
    pub user_srp: bool,
    pub custom: bool,
}

impl AuthFlows {
    fn explicit_auth_flows(&self) -> Vec<&'static str> {
        let mut flows = Vec::new();
        if self.admin_user_password {
            flows.push("ALLOW_ADMIN_USER_PASSWORD_AUTH");
        }
        if self.user_password {
            flows.push("ALLOW_USER_PASSWORD_AUTH");
        }
        if self.user_srp {
            flows.push("ALLOW_USER_SRP_AUTH");
        }
        if self.custom {
            flows.push("ALLOW_CUSTOM_AUTH");
        }
        if !flows.is_empty() {
            flows.push("ALLOW_REFRESH_TOKEN_AUTH");
        }
        flows
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserPoolClientProps {
    pub auth_flows: AuthFlows,
    pub generate_secret: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPoolClient {
    logical_id: String,
    user_pool: UserPool,
}

impl UserPoolClient {
    pub fn new(
        stack: &mut Stack,
        logical_id: &str,
        user_pool: &UserPool,
        props: &UserPoolClientProps,
    ) -> Result<Self, StackError> {
        let mut properties = json!({
            "UserPoolId": user_pool.user_pool_id(),
            "GenerateSecret": props.generate_secret,
            "SupportedIdentityProviders": ["COGNITO"],
        });

        let flows = props.auth_flows.explicit_auth_flows();
        if !flows.is_empty() {
            properties["ExplicitAuthFlows"] = json!(flows);
        }

        stack.add_resource(logical_id, USER_POOL_CLIENT_TYPE, properties)?;

        Ok(Self {
            logical_id: logical_id.to_string(),
            user_pool: user_pool.clone(),
        })
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    pub fn user_pool(&self) -> &UserPool {
        &self.user_pool
    }

    pub fn user_pool_client_id(&self) -> Value {
        reference(&self.logical_id)
    }
}
