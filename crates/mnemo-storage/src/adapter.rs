// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageDriver trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use mnemo_config::model::StorageConfig;
use mnemo_core::types::{ConversationRecord, Fact, StoredEmbedding, StoredMessage};
use mnemo_core::{AdapterType, HealthStatus, MnemoError, PluginAdapter, StorageDriver};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed storage driver.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is opened by [`SqliteStorage::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`initialize`](Self::initialize) is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Create and initialize in one step.
    pub async fn open(config: StorageConfig) -> Result<Self, MnemoError> {
        let storage = Self::new(config);
        storage.initialize().await?;
        Ok(storage)
    }

    /// Wrap an already opened database.
    pub fn from_database(config: StorageConfig, db: Database) -> Self {
        Self {
            config,
            db: OnceCell::new_with(Some(db)),
        }
    }

    /// Open the database and run migrations.
    pub async fn initialize(&self) -> Result<(), MnemoError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| MnemoError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    fn db(&self) -> Result<&Database, MnemoError> {
        self.db.get().ok_or_else(|| MnemoError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    async fn checkpoint(&self, mode: &'static str) -> Result<(), MnemoError> {
        self.db()?
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch(&format!("PRAGMA wal_checkpoint({mode});"))
            })
            .await
            .map_err(map_tr_err)
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        let Ok(db) = self.db() else {
            return Ok(HealthStatus::Unhealthy("not initialized".to_string()));
        };
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> { conn.execute_batch("SELECT 1;") })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MnemoError> {
        if self.db.get().is_some() {
            self.checkpoint("TRUNCATE").await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageDriver for SqliteStorage {
    fn dialect(&self) -> &str {
        "sqlite"
    }

    async fn create_entity(&self, external_id: &str) -> Result<Option<i64>, MnemoError> {
        queries::identities::create_entity(self.db()?, external_id).await
    }

    async fn create_process(&self, external_id: &str) -> Result<Option<i64>, MnemoError> {
        queries::identities::create_process(self.db()?, external_id).await
    }

    async fn create_session(
        &self,
        external_id: &str,
        entity_id: Option<i64>,
        process_id: Option<i64>,
    ) -> Result<Option<i64>, MnemoError> {
        queries::identities::create_session(self.db()?, external_id, entity_id, process_id).await
    }

    async fn read_session(&self, external_id: &str) -> Result<Option<i64>, MnemoError> {
        queries::identities::read_session(self.db()?, external_id).await
    }

    async fn create_conversation(
        &self,
        session_id: i64,
        timeout_minutes: u32,
    ) -> Result<Option<i64>, MnemoError> {
        queries::conversations::create_conversation(self.db()?, session_id, timeout_minutes).await
    }

    async fn read_conversation(
        &self,
        conversation_id: i64,
    ) -> Result<Option<ConversationRecord>, MnemoError> {
        queries::conversations::read_conversation(self.db()?, conversation_id).await
    }

    async fn read_conversation_id_by_session_id(
        &self,
        session_id: i64,
    ) -> Result<Option<i64>, MnemoError> {
        queries::conversations::read_conversation_id_by_session_id(self.db()?, session_id).await
    }

    async fn create_message(
        &self,
        conversation_id: i64,
        role: &str,
        kind: Option<&str>,
        text: &str,
    ) -> Result<(), MnemoError> {
        queries::conversations::create_message(self.db()?, conversation_id, role, kind, text).await
    }

    async fn read_messages(&self, conversation_id: i64) -> Result<Vec<StoredMessage>, MnemoError> {
        queries::conversations::read_messages(self.db()?, conversation_id).await
    }

    async fn create_fact(
        &self,
        entity_id: i64,
        content: &str,
        embedding: &[f32],
    ) -> Result<Option<i64>, MnemoError> {
        queries::facts::create_fact(self.db()?, entity_id, content, embedding).await
    }

    async fn read_fact_embeddings(
        &self,
        entity_id: i64,
        limit: usize,
    ) -> Result<Vec<StoredEmbedding>, MnemoError> {
        queries::facts::read_fact_embeddings(self.db()?, entity_id, limit).await
    }

    async fn read_facts_by_ids(&self, ids: &[i64]) -> Result<Vec<(i64, Fact)>, MnemoError> {
        queries::facts::read_facts_by_ids(self.db()?, ids).await
    }

    // Each statement already commits on the writer thread.
    async fn flush(&self) -> Result<(), MnemoError> {
        self.db()?;
        Ok(())
    }

    async fn commit(&self) -> Result<(), MnemoError> {
        if self.config.wal_mode {
            self.checkpoint("PASSIVE").await?;
        }
        Ok(())
    }
}
