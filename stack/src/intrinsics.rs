// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! CloudFormation intrinsic functions.
//!
//! Resources thread generated identifiers to each other through `Ref`,
//! `Fn::GetAtt`, `Fn::Join` and `Fn::Sub`. [`referenced_ids`] recovers those
//! edges from a property tree so the stack can validate and order the graph.

use std::collections::BTreeSet;

use serde_json::{Value, json};

pub const REF: &str = "Ref";
pub const GET_ATT: &str = "Fn::GetAtt";
pub const JOIN: &str = "Fn::Join";
pub const SUB: &str = "Fn::Sub";

pub const AWS_ACCOUNT_ID: &str = "AWS::AccountId";
pub const AWS_REGION: &str = "AWS::Region";
pub const AWS_PARTITION: &str = "AWS::Partition";
pub const AWS_URL_SUFFIX: &str = "AWS::URLSuffix";

pub fn reference(logical_id: &str) -> Value {
    json!({ REF: logical_id })
}

pub fn get_att(logical_id: &str, attribute: &str) -> Value {
    json!({ GET_ATT: [logical_id, attribute] })
}

pub fn join(delimiter: &str, parts: Vec<Value>) -> Value {
    json!({ JOIN: [delimiter, parts] })
}

pub fn sub(template: &str) -> Value {
    json!({ SUB: template })
}

/// Concatenates literals and tokens, folding adjacent literals together.
///
/// Returns a plain string when every part is a literal, so ARNs built from a
/// fully specified environment stay readable in the template.
pub fn concat(parts: Vec<Value>) -> Value {
    let mut folded: Vec<Value> = Vec::with_capacity(parts.len());
    for part in parts {
        match (folded.last_mut(), part) {
            (Some(Value::String(last)), Value::String(next)) => last.push_str(&next),
            (_, part) => folded.push(part),
        }
    }

    match folded.as_slice() {
        [] => Value::String(String::new()),
        [Value::String(only)] => Value::String(only.clone()),
        _ => join("", folded),
    }
}

pub fn is_pseudo_parameter(name: &str) -> bool {
    name.starts_with("AWS::")
}

/// Collects the logical ids referenced anywhere inside `value`.
pub fn referenced_ids(value: &Value) -> BTreeSet<String> {
    let mut ids = BTreeSet::new();
    collect(value, &mut ids);
    ids
}

fn collect(value: &Value, ids: &mut BTreeSet<String>) {
    match value {
        Value::Object(map) if map.len() == 1 => {
            if let Some(Value::String(target)) = map.get(REF) {
                if !is_pseudo_parameter(target) {
                    ids.insert(target.clone());
                }
                return;
            }
            if let Some(target) = map.get(GET_ATT) {
                match target {
                    Value::Array(parts) => {
                        if let Some(Value::String(id)) = parts.first() {
                            ids.insert(id.clone());
                        }
                    }
                    Value::String(dotted) => {
                        if let Some((id, _)) = dotted.split_once('.') {
                            ids.insert(id.to_string());
                        }
                    }
                    _ => {}
                }
                return;
            }
            if let Some(target) = map.get(SUB) {
                match target {
                    Value::String(template) => collect_sub(template, &BTreeSet::new(), ids),
                    Value::Array(parts) => {
                        let locals: BTreeSet<String> = parts
                            .get(1)
                            .and_then(Value::as_object)
                            .map(|vars| vars.keys().cloned().collect())
                            .unwrap_or_default();
                        if let Some(Value::String(template)) = parts.first() {
                            collect_sub(template, &locals, ids);
                        }
                        for part in parts.iter().skip(1) {
                            collect(part, ids);
                        }
                    }
                    _ => {}
                }
                return;
            }
            map.values().for_each(|v| collect(v, ids));
        }
        Value::Object(map) => map.values().for_each(|v| collect(v, ids)),
        Value::Array(items) => items.iter().for_each(|v| collect(v, ids)),
        _ => {}
    }
}

fn collect_sub(template: &str, locals: &BTreeSet<String>, ids: &mut BTreeSet<String>) {
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        let variable = &after[..end];
        rest = &after[end + 1..];

        // `${!Literal}` escapes the substitution
        if variable.starts_with('!') {
            continue;
        }
        let id = variable.split('.').next().unwrap_or(variable);
        if !is_pseudo_parameter(id) && !locals.contains(id) && !id.is_empty() {
            ids.insert(id.to_string());
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_concat_folds_literals() {
        let value = concat(vec![json!("arn:aws:ssm:"), json!("us-east-1"), json!(":")]);
        assert_eq!(value, json!("arn:aws:ssm:us-east-1:"));
    }

    #[test]
    fn test_concat_keeps_tokens() {
        let value = concat(vec![
            json!("arn:"),
            json!("aws"),
            reference(AWS_REGION),
            json!(":x"),
        ]);
        assert_eq!(
            value,
            json!({"Fn::Join": ["", ["arn:aws", {"Ref": "AWS::Region"}, ":x"]]})
        );
    }

    #[test]
    fn test_referenced_ids_skips_pseudo_parameters() {
        let value = json!({
            "A": reference("Pool"),
            "B": [get_att("Function", "Arn"), reference(AWS_ACCOUNT_ID)],
            "C": {"Fn::GetAtt": "Role.Arn"}
        });
        let ids: Vec<String> = referenced_ids(&value).into_iter().collect();
        assert_eq!(ids, vec!["Function", "Pool", "Role"]);
    }

    #[test]
    fn test_referenced_ids_in_sub() {
        let value = json!({
            "Fn::Sub": [
                "https://${ClaudeApi}.execute-api.${AWS::Region}.${Suffix}/${!Literal}",
                {"Suffix": reference(AWS_URL_SUFFIX)}
            ]
        });
        let ids: Vec<String> = referenced_ids(&value).into_iter().collect();
        assert_eq!(ids, vec!["ClaudeApi"]);
    }

    #[test]
    fn test_referenced_ids_in_sub_with_attribute() {
        let ids = referenced_ids(&sub("${Function.Arn}/invocations"));
        assert!(ids.contains("Function"));
        assert_eq!(ids.len(), 1);
    }
}
