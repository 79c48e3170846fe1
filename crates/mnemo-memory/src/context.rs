// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The memory context: settings, identity, identifier cache and
//! collaborators shared by every pipeline stage.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use mnemo_config::MnemoConfig;
use mnemo_core::{AugmentationManager, CloudApi, EmbeddingAdapter, MnemoError, StorageDriver};
use tracing::info;
use uuid::Uuid;

use crate::cache::IdentityCache;
use crate::injection::ProviderFamily;
use crate::pool::AugmentationPool;

/// Who memories are recorded for, and in which session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub entity_id: Option<String>,
    pub process_id: Option<String>,
    pub session_id: String,
}

/// Settings, identity and collaborators for one logical memory session.
///
/// Built with [`MemoryContext::builder`]. Share it behind an `Arc` when
/// several tasks record turns for the same session.
pub struct MemoryContext {
    config: MnemoConfig,
    identity: RwLock<Identity>,
    cache: IdentityCache,
    storage: Option<Arc<dyn StorageDriver>>,
    cloud: Option<Arc<dyn CloudApi>>,
    embedder: Option<Arc<dyn EmbeddingAdapter>>,
    augmentation: Option<Arc<dyn AugmentationManager>>,
    pool: Option<AugmentationPool>,
}

impl MemoryContext {
    pub fn builder(config: MnemoConfig) -> MemoryContextBuilder {
        MemoryContextBuilder::new(config)
    }

    pub fn config(&self) -> &MnemoConfig {
        &self.config
    }

    pub fn is_cloud(&self) -> bool {
        self.config.memory.cloud
    }

    /// Payload family selected by the configured LLM provider tag.
    pub fn family(&self) -> ProviderFamily {
        ProviderFamily::from_provider(self.config.llm.provider.as_deref())
    }

    /// Snapshot of the current identity.
    pub fn identity(&self) -> Identity {
        self.read_identity().clone()
    }

    pub fn cache(&self) -> &IdentityCache {
        &self.cache
    }

    pub fn storage(&self) -> Option<&Arc<dyn StorageDriver>> {
        self.storage.as_ref()
    }

    pub fn cloud(&self) -> Option<&Arc<dyn CloudApi>> {
        self.cloud.as_ref()
    }

    pub fn embedder(&self) -> Option<&Arc<dyn EmbeddingAdapter>> {
        self.embedder.as_ref()
    }

    pub fn augmentation(&self) -> Option<&Arc<dyn AugmentationManager>> {
        self.augmentation.as_ref()
    }

    pub fn pool(&self) -> Option<&AugmentationPool> {
        self.pool.as_ref()
    }

    /// Sets the entity and process memories are attributed to.
    ///
    /// Clears the identifier cache, since cached ids belong to the previous
    /// attribution.
    pub async fn attribution(&self, entity_id: Option<&str>, process_id: Option<&str>) {
        {
            let mut identity = self.write_identity();
            identity.entity_id = entity_id.map(str::to_string);
            identity.process_id = process_id.map(str::to_string);
        }
        self.cache.reset().await;
    }

    /// Starts a fresh session with a new random id and an empty cache.
    /// Returns the new session id.
    pub async fn new_session(&self) -> String {
        let session_id = Uuid::new_v4().to_string();
        self.write_identity().session_id = session_id.clone();
        self.cache.reset().await;
        info!(session_id = %session_id, "started new memory session");
        session_id
    }

    /// Switches to an existing session id and clears the cache.
    pub async fn set_session(&self, session_id: impl Into<String>) {
        let session_id = session_id.into();
        info!(session_id = %session_id, "switched memory session");
        self.write_identity().session_id = session_id;
        self.cache.reset().await;
    }

    pub async fn reset_cache(&self) {
        self.cache.reset().await;
    }

    /// Waits for outstanding background augmentation, both cloud posts on
    /// the pool and work queued on the local augmentation manager.
    ///
    /// Returns `false` if `timeout` elapsed first.
    pub async fn wait_for_augmentation(&self, timeout: Duration) -> bool {
        let started = Instant::now();
        if let Some(pool) = &self.pool
            && !pool.wait(timeout).await
        {
            return false;
        }
        match &self.augmentation {
            Some(manager) => {
                let remaining = timeout.saturating_sub(started.elapsed());
                manager.wait(remaining).await
            }
            None => true,
        }
    }

    fn read_identity(&self) -> RwLockReadGuard<'_, Identity> {
        self.identity
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_identity(&self) -> RwLockWriteGuard<'_, Identity> {
        self.identity
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for MemoryContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryContext")
            .field("cloud", &self.is_cloud())
            .field("identity", &*self.read_identity())
            .field("storage", &self.storage.as_ref().map(|s| s.name().to_string()))
            .field("cloud_api", &self.cloud.as_ref().map(|c| c.name().to_string()))
            .field("pool", &self.pool)
            .finish()
    }
}

/// Builder for [`MemoryContext`].
pub struct MemoryContextBuilder {
    config: MnemoConfig,
    storage: Option<Arc<dyn StorageDriver>>,
    cloud: Option<Arc<dyn CloudApi>>,
    embedder: Option<Arc<dyn EmbeddingAdapter>>,
    augmentation: Option<Arc<dyn AugmentationManager>>,
    pool: Option<AugmentationPool>,
    pool_disabled: bool,
}

impl MemoryContextBuilder {
    fn new(config: MnemoConfig) -> Self {
        Self {
            config,
            storage: None,
            cloud: None,
            embedder: None,
            augmentation: None,
            pool: None,
            pool_disabled: false,
        }
    }

    pub fn storage(mut self, storage: Arc<dyn StorageDriver>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn cloud(mut self, cloud: Arc<dyn CloudApi>) -> Self {
        self.cloud = Some(cloud);
        self
    }

    pub fn embedder(mut self, embedder: Arc<dyn EmbeddingAdapter>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn augmentation(mut self, augmentation: Arc<dyn AugmentationManager>) -> Self {
        self.augmentation = Some(augmentation);
        self
    }

    /// Shares an existing pool, e.g. the one a local augmentation manager
    /// runs on.
    pub fn pool(mut self, pool: AugmentationPool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Runs cloud augmentation inline on the calling task.
    pub fn without_pool(mut self) -> Self {
        self.pool_disabled = true;
        self
    }

    pub fn build(self) -> Result<MemoryContext, MnemoError> {
        if self.config.memory.cloud && self.cloud.is_none() {
            return Err(MnemoError::Config(
                "cloud mode requires a cloud API client".to_string(),
            ));
        }

        let pool = if self.pool_disabled {
            None
        } else {
            Some(
                self.pool
                    .unwrap_or_else(|| AugmentationPool::new(self.config.augmentation.max_workers)),
            )
        };

        let identity = Identity {
            entity_id: self.config.memory.entity_id.clone(),
            process_id: self.config.memory.process_id.clone(),
            session_id: self
                .config
                .memory
                .session_id
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
        };

        Ok(MemoryContext {
            config: self.config,
            identity: RwLock::new(identity),
            cache: IdentityCache::new(),
            storage: self.storage,
            cloud: self.cloud,
            embedder: self.embedder,
            augmentation: self.augmentation,
            pool,
        })
    }
}
