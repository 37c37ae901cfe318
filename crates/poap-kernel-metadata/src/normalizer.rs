//! Fetching metadata over HTTP with bounded time, size and concurrency.

use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::error::{MetadataError, Result};
use crate::gateway::GatewayRules;
use crate::metadata::{normalize_bytes, TokenMetadata};

/// Configuration for [`MetadataNormalizer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Per-fetch timeout in seconds.
    pub timeout_secs: u64,
    /// Simultaneous fetches allowed across the normalizer.
    pub max_concurrency: usize,
    /// Bodies larger than this are rejected.
    pub max_body_bytes: usize,
    pub gateways: GatewayRules,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_concurrency: 5,
            max_body_bytes: 1024 * 1024,
            gateways: GatewayRules::default(),
        }
    }
}

/// Per-request options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Ask intermediaries not to serve a cached copy.
    pub bypass_cache: bool,
}

impl FetchOptions {
    pub fn bypass_cache() -> Self {
        Self { bypass_cache: true }
    }
}

/// Fetches and normalizes token metadata.
///
/// Cloning is cheap and clones share the concurrency limit.
#[derive(Clone)]
pub struct MetadataNormalizer {
    client: reqwest::Client,
    config: Arc<MetadataConfig>,
    limiter: Arc<Semaphore>,
}

impl MetadataNormalizer {
    pub fn new(config: MetadataConfig) -> Result<Self> {
        if config.max_concurrency == 0 {
            return Err(MetadataError::Config("max_concurrency must be at least 1".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MetadataError::Config(e.to_string()))?;
        Ok(Self {
            client,
            limiter: Arc::new(Semaphore::new(config.max_concurrency)),
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &MetadataConfig {
        &self.config
    }

    /// Rewrite a reference through the gateway table.
    pub fn resolve_uri(&self, uri: &str) -> Option<String> {
        self.config.gateways.resolve(uri)
    }

    /// Fetch and normalize. Never fails: any error yields
    /// [`TokenMetadata::placeholder`].
    pub async fn fetch(&self, uri: &str, options: FetchOptions) -> TokenMetadata {
        match self.try_fetch(uri, options).await {
            Ok(meta) => meta,
            Err(e) => {
                warn!(uri, error = %e, "metadata unavailable, using placeholder");
                TokenMetadata::placeholder()
            }
        }
    }

    /// Fetch and normalize, reporting why a fetch failed.
    pub async fn try_fetch(&self, uri: &str, options: FetchOptions) -> Result<TokenMetadata> {
        let url = self
            .resolve_uri(uri)
            .ok_or_else(|| MetadataError::Unresolvable(uri.to_string()))?;

        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|e| MetadataError::Config(e.to_string()))?;

        debug!(uri, url = %url, bypass_cache = options.bypass_cache, "fetching metadata");
        let mut request = self.client.get(&url);
        if options.bypass_cache {
            request = request
                .header(CACHE_CONTROL, "no-cache")
                .header(PRAGMA, "no-cache");
        }
        let mut response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MetadataError::Http {
                status: status.as_u16(),
            });
        }

        let limit = self.config.max_body_bytes;
        if response.content_length().is_some_and(|len| len > limit as u64) {
            return Err(MetadataError::BodyTooLarge { limit });
        }
        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > limit {
                return Err(MetadataError::BodyTooLarge { limit });
            }
            body.extend_from_slice(&chunk);
        }

        normalize_bytes(&body, &self.config.gateways)
    }

    /// Fetch many documents concurrently, bounded by `max_concurrency`.
    ///
    /// Results come back in input order, each paired with its key. A
    /// failed item yields a placeholder and does not affect the others.
    pub async fn fetch_many<K>(
        &self,
        items: Vec<(K, String)>,
        options: FetchOptions,
    ) -> Vec<(K, TokenMetadata)>
    where
        K: Send + 'static,
    {
        let mut keys = Vec::with_capacity(items.len());
        let mut tasks = JoinSet::new();
        for (slot, (key, uri)) in items.into_iter().enumerate() {
            keys.push(key);
            let normalizer = self.clone();
            tasks.spawn(async move { (slot, normalizer.fetch(&uri, options).await) });
        }

        let mut results: Vec<Option<TokenMetadata>> = vec![None; keys.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, meta)) => results[slot] = Some(meta),
                Err(e) => warn!(error = %e, "metadata task failed"),
            }
        }

        keys.into_iter()
            .zip(results)
            .map(|(key, meta)| (key, meta.unwrap_or_else(TokenMetadata::placeholder)))
            .collect()
    }
}
