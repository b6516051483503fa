// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Claude API key resolution from SSM Parameter Store.
//!
//! The function is configured with the parameter *name* only. The key is read
//! with decryption on first use and cached for warm invocations until the TTL
//! elapses, so a rotated parameter is picked up without a redeploy.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_ssm::Client;
use aws_sdk_ssm::error::DisplayErrorContext;
use tokio::sync::RwLock;
use zeroize::ZeroizeOnDrop;

use crate::errors::AppError;

#[derive(Clone, PartialEq, Eq, ZeroizeOnDrop)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

// Custom Debug implementation to prevent accidental logging of the key
impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ApiKey").field(&"[REDACTED]").finish()
    }
}

#[async_trait]
pub trait SecretSource: Send + Sync {
    async fn fetch(&self, name: &str) -> Result<ApiKey, AppError>;
}

pub struct SsmSecretSource {
    client: Client,
}

impl SsmSecretSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Uses the default credential chain (the execution role on Lambda).
    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        Self::new(Client::new(&config))
    }
}

#[async_trait]
impl SecretSource for SsmSecretSource {
    async fn fetch(&self, name: &str) -> Result<ApiKey, AppError> {
        let output = self
            .client
            .get_parameter()
            .name(name)
            .with_decryption(true)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("[function] GetParameter {} failed: {}", name, DisplayErrorContext(&e));
                AppError::SecretError(format!("unable to read parameter {name}"))
            })?;

        output
            .parameter()
            .and_then(|parameter| parameter.value())
            .map(ApiKey::new)
            .ok_or_else(|| AppError::SecretError(format!("parameter {name} has no value")))
    }
}

struct CachedSecret {
    key: ApiKey,
    fetched_at: Instant,
}

pub struct SecretCache {
    parameter_name: String,
    source: Arc<dyn SecretSource>,
    ttl: Duration,
    cached: RwLock<Option<CachedSecret>>,
}

impl SecretCache {
    pub fn new(parameter_name: String, source: Arc<dyn SecretSource>, ttl: Duration) -> Self {
        Self {
            parameter_name,
            source,
            ttl,
            cached: RwLock::new(None),
        }
    }

    pub fn parameter_name(&self) -> &str {
        &self.parameter_name
    }

    /// Returns the cached key if still fresh, otherwise fetches it again
    pub async fn get(&self) -> Result<ApiKey, AppError> {
        // Fast path: check if the cached key is still valid
        {
            let cache = self.cached.read().await;
            if let Some(ref cached) = *cache
                && self.is_valid(cached)
            {
                return Ok(cached.key.clone());
            }
        }

        // Slow path: refresh
        self.refresh().await
    }

    /// Drops the cached key, e.g. after the upstream rejected it.
    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }

    fn is_valid(&self, cached: &CachedSecret) -> bool {
        cached.fetched_at.elapsed() < self.ttl
    }

    async fn refresh(&self) -> Result<ApiKey, AppError> {
        let mut cache = self.cached.write().await;

        // Double-check after acquiring write lock (another task may have refreshed)
        if let Some(ref cached) = *cache
            && self.is_valid(cached)
        {
            return Ok(cached.key.clone());
        }

        let key = self.source.fetch(&self.parameter_name).await?;

        tracing::debug!("[function] refreshed API key from {}", self.parameter_name);

        *cache = Some(CachedSecret {
            key: key.clone(),
            fetched_at: Instant::now(),
        });

        Ok(key)
    }
}
