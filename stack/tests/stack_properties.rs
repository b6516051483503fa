// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Integration tests for the synthesized Claude SDK stack.
//!
//! Assets are real files in a temporary project root so the whole
//! build -> synth path runs exactly as the CLI runs it.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

use claude_sdk_stack::assets::FsAssetResolver;
use claude_sdk_stack::claude_sdk_stack::{ClaudeSdkStack, ClaudeSdkStackProps};
use claude_sdk_stack::constants::{FUNCTION_ASSET_PATH, LAYER_ASSET_PATH};
use claude_sdk_stack::environment::Environment;
use claude_sdk_stack::errors::StackError;
use claude_sdk_stack::gateway::{Claims, CognitoJwtVerifier, Dispatch};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, encode};
use proptest::prelude::*;
use serde_json::{Value, json};
use tempfile::TempDir;

const SECRET: &[u8] = b"integration-secret";
const KID: &str = "kid-1";
const POOL_ID: &str = "us-east-1_Test";
const CLIENT_ID: &str = "client-abc";

/// Creates a project root holding the layer archive and function directory.
fn project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let layer = dir.path().join(LAYER_ASSET_PATH);
    fs::create_dir_all(layer.parent().unwrap()).unwrap();
    fs::write(&layer, b"PK\x03\x04layer").unwrap();

    let code = dir.path().join(FUNCTION_ASSET_PATH);
    fs::create_dir_all(&code).unwrap();
    fs::write(code.join("bootstrap"), b"\x7fELF").unwrap();
    dir
}

fn build(dir: &TempDir, props: &ClaudeSdkStackProps) -> ClaudeSdkStack {
    ClaudeSdkStack::build(props, &FsAssetResolver::new(dir.path())).unwrap()
}

fn template(dir: &TempDir) -> Value {
    build(dir, &ClaudeSdkStackProps::default())
        .synth()
        .unwrap()
        .template
}

fn resources_of_type<'a>(template: &'a Value, resource_type: &str) -> Vec<(&'a String, &'a Value)> {
    template["Resources"]
        .as_object()
        .unwrap()
        .iter()
        .filter(|(_, r)| r["Type"] == resource_type)
        .collect()
}

fn verifier() -> CognitoJwtVerifier {
    CognitoJwtVerifier::new("us-east-1", POOL_ID, vec![CLIENT_ID.to_string()])
        .with_key(KID, DecodingKey::from_secret(SECRET), Algorithm::HS256)
}

fn valid_token() -> String {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();
    let claims = Claims {
        sub: "user-1".into(),
        iss: format!("https://cognito-idp.us-east-1.amazonaws.com/{POOL_ID}"),
        exp: now + 3600,
        token_use: Some("access".into()),
        aud: None,
        client_id: Some(CLIENT_ID.into()),
        username: Some("alice".into()),
    };
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(KID.into());
    encode(&header, &claims, &EncodingKey::from_secret(SECRET)).unwrap()
}

// =============================================================================
// Resource graph
// =============================================================================

/// Exactly one of each resource kind.
#[test]
fn test_exactly_one_of_each_resource() {
    let dir = project();
    let template = template(&dir);
    for resource_type in [
        "AWS::Cognito::UserPool",
        "AWS::Cognito::UserPoolClient",
        "AWS::Lambda::LayerVersion",
        "AWS::Lambda::Function",
        "AWS::IAM::Policy",
        "AWS::ApiGatewayV2::Api",
        "AWS::ApiGatewayV2::Authorizer",
        "AWS::ApiGatewayV2::Route",
    ] {
        assert_eq!(
            resources_of_type(&template, resource_type).len(),
            1,
            "expected one {resource_type}"
        );
    }
}

/// Re-synthesizing the same declaration converges to the same template.
#[test]
fn test_repeated_builds_are_identical() {
    let dir = project();
    let first = build(&dir, &ClaudeSdkStackProps::default()).synth().unwrap();
    let second = build(&dir, &ClaudeSdkStackProps::default()).synth().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_client_references_pool() {
    let dir = project();
    let template = template(&dir);
    let (pool_id, _) = resources_of_type(&template, "AWS::Cognito::UserPool")[0];
    let (_, client) = resources_of_type(&template, "AWS::Cognito::UserPoolClient")[0];
    assert_eq!(client["Properties"]["UserPoolId"], json!({"Ref": pool_id}));
}

#[test]
fn test_user_pool_policy() {
    let dir = project();
    let template = template(&dir);
    let (_, pool) = resources_of_type(&template, "AWS::Cognito::UserPool")[0];
    let properties = &pool["Properties"];
    assert_eq!(properties["UserPoolName"], "claude-sdk-users");
    assert_eq!(properties["AdminCreateUserConfig"]["AllowAdminCreateUserOnly"], true);
    assert_eq!(
        properties["Schema"],
        json!([{"Name": "email", "Required": true, "Mutable": true}])
    );
}

/// The grant names exactly the parameter in the function's environment.
#[test]
fn test_grant_matches_environment_parameter() {
    let dir = project();
    let props = ClaudeSdkStackProps {
        environment: Environment::new(Some("111122223333".into()), Some("us-east-1".into())),
        ..Default::default()
    };
    let template = build(&dir, &props).synth().unwrap().template;

    let (_, function) = resources_of_type(&template, "AWS::Lambda::Function")[0];
    let parameter = function["Properties"]["Environment"]["Variables"]["SSM_PARAM_CLAUDE_API_KEY"]
        .as_str()
        .unwrap();

    let (_, policy) = resources_of_type(&template, "AWS::IAM::Policy")[0];
    let statements = policy["Properties"]["PolicyDocument"]["Statement"]
        .as_array()
        .unwrap();
    assert_eq!(statements.len(), 1);
    assert_eq!(statements[0]["Action"], "ssm:GetParameter");
    assert_eq!(
        statements[0]["Resource"],
        json!(format!("arn:aws:ssm:us-east-1:111122223333:parameter{parameter}"))
    );
    assert!(!statements[0].to_string().contains('*'));
}

/// The secret value never appears in the template.
#[test]
fn test_function_carries_parameter_name_only() {
    let dir = project();
    let template = template(&dir);
    let (_, function) = resources_of_type(&template, "AWS::Lambda::Function")[0];
    assert_eq!(
        function["Properties"]["Environment"]["Variables"],
        json!({"SSM_PARAM_CLAUDE_API_KEY": "/claude-sdk/api-key"})
    );
    assert_eq!(function["Properties"]["Runtime"], "provided.al2023");

    let (_, layer) = resources_of_type(&template, "AWS::Lambda::LayerVersion")[0];
    assert_eq!(layer["Properties"]["CompatibleRuntimes"], json!(["provided.al2023"]));
}

#[test]
fn test_outputs() {
    let dir = project();
    let template = template(&dir);
    let outputs = template["Outputs"].as_object().unwrap();
    let mut names: Vec<&String> = outputs.keys().collect();
    names.sort();
    assert_eq!(names, vec!["ApiUrl", "UserPoolClientId", "UserPoolId"]);
    assert!(outputs.values().all(|o| !o["Value"].is_null()));
}

#[test]
fn test_api_url_fallback() {
    let dir = project();
    let props = ClaudeSdkStackProps {
        http_api: claude_sdk_stack::apigateway::HttpApiProps {
            create_default_stage: false,
        },
        ..Default::default()
    };
    let template = build(&dir, &props).synth().unwrap().template;
    assert_eq!(template["Outputs"]["ApiUrl"]["Value"], "Something went wrong");
}

#[test]
fn test_assets_are_staged_by_content_hash() {
    let dir = project();
    let assembly = build(&dir, &ClaudeSdkStackProps::default()).synth().unwrap();
    assert_eq!(assembly.assets.len(), 2);

    let (_, function) = resources_of_type(&assembly.template, "AWS::Lambda::Function")[0];
    let function_asset = assembly.assets.iter().find(|a| a.id == "ClaudeFunction").unwrap();
    assert_eq!(function["Properties"]["Code"]["S3Key"], function_asset.object_key.as_str());
    assert_eq!(function_asset.object_key, format!("{}.zip", function_asset.hash));
}

#[test]
fn test_missing_asset_fails_the_build() {
    let dir = tempfile::tempdir().unwrap();
    let result = ClaudeSdkStack::build(
        &ClaudeSdkStackProps::default(),
        &FsAssetResolver::new(dir.path()),
    );
    assert!(matches!(result, Err(StackError::AssetNotFound(_))));
}

// =============================================================================
// Deployment order
// =============================================================================

#[test]
fn test_deployment_order() {
    let dir = project();
    let built = build(&dir, &ClaudeSdkStackProps::default());
    let order = built.stack.deployment_order().unwrap();
    let position = |id: &str| order.iter().position(|o| *o == id).unwrap();

    assert!(position("ClaudeUserPool") < position("ClaudeUserPoolClient"));
    assert!(position("DependenciesLayer") < position("ClaudeFunction"));
    assert!(position("ClaudeFunctionServiceRoleDefaultPolicy") < position("ClaudeFunction"));
    assert!(position("ClaudeUserPoolClient") < position("ClaudeApiCognitoAuthorizer"));
    assert!(position("ClaudeApi") < position("ClaudeApiCognitoAuthorizer"));
    assert!(position("ClaudeApiCognitoAuthorizer") < position("ClaudeApiPOSTquery"));
    assert!(position("ClaudeFunction") < position("ClaudeApiClaudeIntegration"));
    assert!(position("ClaudeApiClaudeIntegration") < position("ClaudeApiPOSTquery"));
}

// =============================================================================
// Gateway dispatch
// =============================================================================

#[test]
fn test_authorized_post_query_reaches_function() {
    let dir = project();
    let table = build(&dir, &ClaudeSdkStackProps::default()).route_table();
    let token = format!("Bearer {}", valid_token());

    let dispatch = table.dispatch("POST", "/query", &[("authorization", token.as_str())], &verifier());
    match dispatch {
        Dispatch::Invoke { function, claims } => {
            assert_eq!(function, "ClaudeFunction");
            assert_eq!(claims.unwrap().username.as_deref(), Some("alice"));
        }
        other => panic!("expected invoke, got {other:?}"),
    }
}

#[test]
fn test_missing_token_is_unauthorized() {
    let dir = project();
    let table = build(&dir, &ClaudeSdkStackProps::default()).route_table();
    let dispatch = table.dispatch("POST", "/query", &[], &verifier());
    assert_eq!(dispatch, Dispatch::Unauthorized);
    assert_eq!(dispatch.status_code(), Some(401));
}

#[test]
fn test_query_string_is_ignored_for_matching() {
    let dir = project();
    let table = build(&dir, &ClaudeSdkStackProps::default()).route_table();
    let token = valid_token();
    let dispatch = table.dispatch("POST", "/query?x=1", &[("Authorization", token.as_str())], &verifier());
    assert!(matches!(dispatch, Dispatch::Invoke { .. }));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Only `POST /query` matches; everything else is not found.
    #[test]
    fn prop_only_post_query_matches(
        method in prop::sample::select(vec!["GET", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS", "POST"]),
        path in "/[a-z]{0,8}",
    ) {
        prop_assume!(!(method == "POST" && path == "/query"));
        let dir = project();
        let table = build(&dir, &ClaudeSdkStackProps::default()).route_table();
        let token = valid_token();
        let dispatch = table.dispatch(method, &path, &[("Authorization", token.as_str())], &verifier());
        prop_assert_eq!(dispatch, Dispatch::NotFound);
    }

    /// Garbage tokens never reach the function.
    #[test]
    fn prop_invalid_tokens_never_invoke(token in "[A-Za-z0-9._-]{0,64}") {
        let dir = project();
        let table = build(&dir, &ClaudeSdkStackProps::default()).route_table();
        let header = format!("Bearer {token}");
        let dispatch = table.dispatch("POST", "/query", &[("Authorization", header.as_str())], &verifier());
        prop_assert_eq!(dispatch, Dispatch::Unauthorized);
    }
}
