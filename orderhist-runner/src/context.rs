//! Shared handles a task needs: exchange client, object store, output bucket.

use crate::config::{ConfigError, PipelineConfig};
use orderhist_core::storage::{FsStore, ObjectStore};
use orderhist_core::upstream::{BitgetClient, CircuitBreaker, Credentials, OrdersApi, ScriptedApi};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct TaskContext {
    pub api: Arc<dyn OrdersApi>,
    pub store: Arc<dyn ObjectStore>,
    /// Bucket that artifacts and reports are written to.
    pub bucket: String,
}

impl TaskContext {
    pub fn new(
        api: Arc<dyn OrdersApi>,
        store: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            api,
            store,
            bucket: bucket.into(),
        }
    }

    /// Wire a Bitget client and a filesystem store from configuration.
    pub fn from_config(config: &PipelineConfig, credentials: Credentials) -> Result<Self, ConfigError> {
        let upstream = &config.upstream;
        let breaker = Arc::new(CircuitBreaker::new(
            Duration::from_secs(upstream.breaker_cooldown_secs),
            upstream.breaker_failure_threshold,
        ));
        let client = BitgetClient::new(
            upstream.base_url.clone(),
            credentials,
            breaker,
            Duration::from_secs(upstream.timeout_secs),
        )
        .map_err(|e| ConfigError::Invalid(format!("cannot build exchange client: {e}")))?;

        Ok(Self::new(
            Arc::new(client),
            Arc::new(FsStore::new(config.storage.root.clone())),
            config.bucket.clone(),
        ))
    }

    /// Storage from configuration, with an exchange that never returns orders.
    /// Enough for aggregation and export, which only touch storage.
    pub fn storage_only(config: &PipelineConfig) -> Self {
        Self::new(
            Arc::new(ScriptedApi::new()),
            Arc::new(FsStore::new(config.storage.root.clone())),
            config.bucket.clone(),
        )
    }
}

impl std::fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskContext")
            .field("api", &self.api.name())
            .field("store", &self.store.name())
            .field("bucket", &self.bucket)
            .finish()
    }
}
