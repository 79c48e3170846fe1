// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage driver trait for persistence backends (SQLite, etc.).

use async_trait::async_trait;

use crate::error::MnemoError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ConversationRecord, Fact, StoredEmbedding, StoredMessage};

/// CRUD access to entity, process, session, conversation, message and fact
/// records.
///
/// Create operations are idempotent on their external identifier and return
/// the storage id of the (possibly pre-existing) row. `None` from a create
/// means the backend produced no identifier, which callers treat as fatal.
#[async_trait]
pub trait StorageDriver: PluginAdapter {
    /// Short dialect tag reported in augmentation metadata (e.g. "sqlite").
    fn dialect(&self) -> &str;

    async fn create_entity(&self, external_id: &str) -> Result<Option<i64>, MnemoError>;

    async fn create_process(&self, external_id: &str) -> Result<Option<i64>, MnemoError>;

    async fn create_session(
        &self,
        external_id: &str,
        entity_id: Option<i64>,
        process_id: Option<i64>,
    ) -> Result<Option<i64>, MnemoError>;

    /// Looks up a session by its external identifier.
    async fn read_session(&self, external_id: &str) -> Result<Option<i64>, MnemoError>;

    /// Returns the open conversation for the session, creating one when the
    /// latest conversation has been idle for longer than `timeout_minutes`.
    async fn create_conversation(
        &self,
        session_id: i64,
        timeout_minutes: u32,
    ) -> Result<Option<i64>, MnemoError>;

    async fn read_conversation(
        &self,
        conversation_id: i64,
    ) -> Result<Option<ConversationRecord>, MnemoError>;

    /// Latest conversation id for a session, if any.
    async fn read_conversation_id_by_session_id(
        &self,
        session_id: i64,
    ) -> Result<Option<i64>, MnemoError>;

    async fn create_message(
        &self,
        conversation_id: i64,
        role: &str,
        kind: Option<&str>,
        text: &str,
    ) -> Result<(), MnemoError>;

    /// Messages of a conversation in insertion order.
    async fn read_messages(&self, conversation_id: i64)
    -> Result<Vec<StoredMessage>, MnemoError>;

    async fn create_fact(
        &self,
        entity_id: i64,
        content: &str,
        embedding: &[f32],
    ) -> Result<Option<i64>, MnemoError>;

    /// Up to `limit` fact embeddings of an entity, oldest first.
    async fn read_fact_embeddings(
        &self,
        entity_id: i64,
        limit: usize,
    ) -> Result<Vec<StoredEmbedding>, MnemoError>;

    /// Facts for the given ids, paired with their id. Order follows `ids`;
    /// ids with no row are left out.
    async fn read_facts_by_ids(&self, ids: &[i64]) -> Result<Vec<(i64, Fact)>, MnemoError>;

    /// Flushes pending writes.
    async fn flush(&self) -> Result<(), MnemoError>;

    /// Commits the current unit of work.
    async fn commit(&self) -> Result<(), MnemoError>;
}
