// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! File and directory assets staged for deployment.
//!
//! Every asset is fingerprinted with SHA-256 at declaration time. The hash
//! becomes the S3 object key in the bootstrap staging bucket, so unchanged
//! content always resolves to the same key and re-applying a stack converges.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};

use crate::constants::BOOTSTRAP_QUALIFIER;
use crate::environment::Environment;
use crate::errors::StackError;
use crate::intrinsics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Packaging {
    /// An archive uploaded as-is
    File,
    /// A directory zipped before upload
    ZipDirectory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSource {
    pub path: PathBuf,
    pub packaging: Packaging,
}

impl AssetSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            packaging: Packaging::File,
        }
    }

    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            packaging: Packaging::ZipDirectory,
        }
    }
}

/// Entry of the asset manifest written next to the template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedAsset {
    pub id: String,
    pub source_path: PathBuf,
    pub packaging: Packaging,
    pub hash: String,
    pub bucket_name: Value,
    pub object_key: String,
}

impl StagedAsset {
    pub fn new(id: &str, source: &AssetSource, hash: String, env: &Environment) -> Self {
        Self {
            id: id.to_string(),
            source_path: source.path.clone(),
            packaging: source.packaging,
            object_key: format!("{hash}.zip"),
            hash,
            bucket_name: staging_bucket(env),
        }
    }

    /// `Code` / `Content` property of a Lambda function or layer.
    pub fn s3_location(&self) -> Value {
        json!({
            "S3Bucket": self.bucket_name,
            "S3Key": self.object_key,
        })
    }
}

pub fn staging_bucket(env: &Environment) -> Value {
    intrinsics::concat(vec![
        Value::String(format!("cdk-{BOOTSTRAP_QUALIFIER}-assets-")),
        env.account(),
        Value::String("-".to_string()),
        env.region(),
    ])
}

/// Computes the content fingerprint of an asset.
pub trait AssetResolver {
    fn fingerprint(&self, source: &AssetSource) -> Result<String, StackError>;
}

/// Resolves assets relative to a project root on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsAssetResolver {
    root: PathBuf,
}

impl FsAssetResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl AssetResolver for FsAssetResolver {
    fn fingerprint(&self, source: &AssetSource) -> Result<String, StackError> {
        let path = self.resolve(&source.path);
        let metadata = fs::metadata(&path).map_err(|e| StackError::asset_io(&path, e))?;

        let mut hasher = Sha256::new();
        match source.packaging {
            Packaging::File => {
                if !metadata.is_file() {
                    return Err(StackError::ValidationError(format!(
                        "file asset {} is not a regular file",
                        path.display()
                    )));
                }
                let contents = fs::read(&path).map_err(|e| StackError::asset_io(&path, e))?;
                hasher.update(&contents);
            }
            Packaging::ZipDirectory => {
                if !metadata.is_dir() {
                    return Err(StackError::ValidationError(format!(
                        "directory asset {} is not a directory",
                        path.display()
                    )));
                }
                let mut files = Vec::new();
                list_files(&path, &path, &mut files)?;
                files.sort();
                for relative in files {
                    let absolute = path.join(&relative);
                    let contents =
                        fs::read(&absolute).map_err(|e| StackError::asset_io(&absolute, e))?;
                    hasher.update(relative.as_bytes());
                    hasher.update([0u8]);
                    hasher.update((contents.len() as u64).to_be_bytes());
                    hasher.update(&contents);
                }
            }
        }

        let hash = hex::encode(hasher.finalize());
        tracing::debug!("[stack] fingerprinted {} as {}", path.display(), hash);
        Ok(hash)
    }
}

/// Relative paths use `/` so fingerprints match across platforms.
/// Symlinked files are hashed through their target; symlinked directories are
/// never descended into, so a link cycle cannot recurse.
fn list_files(root: &Path, dir: &Path, files: &mut Vec<String>) -> Result<(), StackError> {
    let entries = fs::read_dir(dir).map_err(|e| StackError::asset_io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| StackError::asset_io(dir, e))?;
        let path = entry.path();
        let metadata = fs::symlink_metadata(&path).map_err(|e| StackError::asset_io(&path, e))?;
        let is_file = if metadata.file_type().is_symlink() {
            match fs::metadata(&path) {
                Ok(target) if target.is_file() => true,
                _ => {
                    tracing::warn!("[stack] skipping symlink {}", path.display());
                    false
                }
            }
        } else {
            metadata.is_file()
        };

        if metadata.is_dir() {
            list_files(root, &path, files)?;
        } else if is_file {
            let relative = path
                .strip_prefix(root)
                .map_err(|e| StackError::ValidationError(e.to_string()))?;
            let relative = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            files.push(relative);
        }
    }
    Ok(())
}
