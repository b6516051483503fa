// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! The stack: an ordered set of declared resources, their outputs and the
//! assets they are packaged from.
//!
//! A stack is the atomic unit of apply. [`Stack::deployment_order`] yields the
//! order in which an engine (or an imperative reimplementation calling the
//! management APIs directly) must create the resources so that every resource
//! is created after everything it references.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::assets::{AssetResolver, AssetSource, StagedAsset};
use crate::constants::{TEMPLATE_DESCRIPTION, TEMPLATE_FORMAT_VERSION};
use crate::environment::Environment;
use crate::errors::StackError;
use crate::intrinsics::referenced_ids;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CfnResource {
    #[serde(rename = "Type")]
    pub resource_type: String,
    #[serde(rename = "Properties")]
    pub properties: Value,
    #[serde(rename = "DependsOn", default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CfnOutput {
    #[serde(rename = "Value")]
    pub value: Value,
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// What `synth` hands to a provisioning engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CloudAssembly {
    pub stack_name: String,
    pub template: Value,
    pub assets: Vec<StagedAsset>,
}

#[derive(Debug, Clone)]
pub struct Stack {
    name: String,
    environment: Environment,
    resources: Vec<(String, CfnResource)>,
    outputs: Vec<(String, CfnOutput)>,
    assets: Vec<StagedAsset>,
}

impl Stack {
    pub fn new(name: impl Into<String>, environment: Environment) -> Self {
        Self {
            name: name.into(),
            environment,
            resources: Vec::new(),
            outputs: Vec::new(),
            assets: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn add_resource(
        &mut self,
        logical_id: &str,
        resource_type: &str,
        properties: Value,
    ) -> Result<(), StackError> {
        if self.resource(logical_id).is_some() {
            return Err(StackError::DuplicateLogicalId(logical_id.to_string()));
        }

        tracing::debug!("[stack] declared {} ({})", logical_id, resource_type);

        self.resources.push((
            logical_id.to_string(),
            CfnResource {
                resource_type: resource_type.to_string(),
                properties,
                depends_on: Vec::new(),
            },
        ));
        Ok(())
    }

    /// Adds an explicit ordering edge that no property reference expresses.
    pub fn add_dependency(&mut self, logical_id: &str, depends_on: &str) -> Result<(), StackError> {
        if self.resource(depends_on).is_none() {
            return Err(StackError::DanglingReference {
                from: logical_id.to_string(),
                to: depends_on.to_string(),
            });
        }
        let resource = self
            .resources
            .iter_mut()
            .find(|(id, _)| id == logical_id)
            .map(|(_, resource)| resource)
            .ok_or_else(|| {
                StackError::ValidationError(format!(
                    "cannot add a dependency to undeclared resource {logical_id}"
                ))
            })?;

        if !resource.depends_on.iter().any(|d| d == depends_on) {
            resource.depends_on.push(depends_on.to_string());
        }
        Ok(())
    }

    pub fn add_output(
        &mut self,
        name: &str,
        value: Value,
        description: Option<&str>,
    ) -> Result<(), StackError> {
        if self.outputs.iter().any(|(n, _)| n == name) {
            return Err(StackError::ValidationError(format!("duplicate output: {name}")));
        }
        if value.is_null() {
            return Err(StackError::ValidationError(format!("output {name} has no value")));
        }

        self.outputs.push((
            name.to_string(),
            CfnOutput {
                value,
                description: description.map(str::to_string),
            },
        ));
        Ok(())
    }

    /// Fingerprints `source` and records it in the asset manifest.
    pub fn add_asset(
        &mut self,
        id: &str,
        source: &AssetSource,
        resolver: &dyn AssetResolver,
    ) -> Result<StagedAsset, StackError> {
        if self.assets.iter().any(|a| a.id == id) {
            return Err(StackError::DuplicateLogicalId(id.to_string()));
        }

        let hash = resolver.fingerprint(source)?;
        let staged = StagedAsset::new(id, source, hash, &self.environment);
        self.assets.push(staged.clone());
        Ok(staged)
    }

    pub fn resource(&self, logical_id: &str) -> Option<&CfnResource> {
        self.resources
            .iter()
            .find(|(id, _)| id == logical_id)
            .map(|(_, resource)| resource)
    }

    pub(crate) fn resource_mut(&mut self, logical_id: &str) -> Option<&mut CfnResource> {
        self.resources
            .iter_mut()
            .find(|(id, _)| id == logical_id)
            .map(|(_, resource)| resource)
    }

    pub fn resources(&self) -> impl Iterator<Item = (&str, &CfnResource)> {
        self.resources.iter().map(|(id, r)| (id.as_str(), r))
    }

    pub fn resources_of_type(&self, resource_type: &str) -> Vec<&str> {
        self.resources()
            .filter(|(_, r)| r.resource_type == resource_type)
            .map(|(id, _)| id)
            .collect()
    }

    pub fn output(&self, name: &str) -> Option<&CfnOutput> {
        self.outputs.iter().find(|(n, _)| n == name).map(|(_, o)| o)
    }

    pub fn assets(&self) -> &[StagedAsset] {
        &self.assets
    }

    /// Resources `logical_id` must be created after.
    pub fn dependencies_of(&self, logical_id: &str) -> BTreeSet<String> {
        match self.resource(logical_id) {
            Some(resource) => {
                let mut deps = referenced_ids(&resource.properties);
                deps.extend(resource.depends_on.iter().cloned());
                deps.remove(logical_id);
                deps
            }
            None => BTreeSet::new(),
        }
    }

    /// Checks that every reference resolves and the graph is acyclic.
    pub fn validate(&self) -> Result<(), StackError> {
        for (id, _) in &self.resources {
            for dep in self.dependencies_of(id) {
                if self.resource(&dep).is_none() {
                    return Err(StackError::DanglingReference {
                        from: id.clone(),
                        to: dep,
                    });
                }
            }
        }

        for (name, output) in &self.outputs {
            for dep in referenced_ids(&output.value) {
                if self.resource(&dep).is_none() {
                    return Err(StackError::DanglingReference {
                        from: name.clone(),
                        to: dep,
                    });
                }
            }
        }

        self.deployment_order().map(|_| ())
    }

    /// Topological order of the resources, dependencies first.
    ///
    /// Ties are broken by declaration order so the plan is deterministic.
    pub fn deployment_order(&self) -> Result<Vec<&str>, StackError> {
        let index: BTreeMap<&str, usize> = self
            .resources
            .iter()
            .enumerate()
            .map(|(i, (id, _))| (id.as_str(), i))
            .collect();

        let mut remaining: Vec<usize> = vec![0; self.resources.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.resources.len()];
        for (i, (id, _)) in self.resources.iter().enumerate() {
            for dep in self.dependencies_of(id) {
                // dangling references are reported by validate()
                if let Some(&j) = index.get(dep.as_str()) {
                    remaining[i] += 1;
                    dependents[j].push(i);
                }
            }
        }

        let mut ready: BTreeSet<usize> = remaining
            .iter()
            .enumerate()
            .filter(|(_, count)| **count == 0)
            .map(|(i, _)| i)
            .collect();

        let mut order = Vec::with_capacity(self.resources.len());
        while let Some(next) = ready.pop_first() {
            order.push(self.resources[next].0.as_str());
            for &dependent in &dependents[next] {
                remaining[dependent] -= 1;
                if remaining[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        if order.len() != self.resources.len() {
            let cycle = self
                .resources
                .iter()
                .enumerate()
                .filter(|(i, _)| remaining[*i] > 0)
                .map(|(_, (id, _))| id.clone())
                .collect();
            return Err(StackError::DependencyCycle(cycle));
        }

        Ok(order)
    }

    pub fn to_template(&self) -> Result<Value, StackError> {
        self.validate()?;

        let mut resources = Map::new();
        for (id, resource) in &self.resources {
            resources.insert(id.clone(), serde_json::to_value(resource)?);
        }

        let mut outputs = Map::new();
        for (name, output) in &self.outputs {
            outputs.insert(name.clone(), serde_json::to_value(output)?);
        }

        Ok(json!({
            "AWSTemplateFormatVersion": TEMPLATE_FORMAT_VERSION,
            "Description": TEMPLATE_DESCRIPTION,
            "Resources": resources,
            "Outputs": outputs,
        }))
    }

    pub fn synth(&self) -> Result<CloudAssembly, StackError> {
        let template = self.to_template()?;

        tracing::info!(
            "[stack] synthesized {} with {} resources and {} assets",
            self.name,
            self.resources.len(),
            self.assets.len()
        );

        Ok(CloudAssembly {
            stack_name: self.name.clone(),
            template,
            assets: self.assets.clone(),
        })
    }
}
