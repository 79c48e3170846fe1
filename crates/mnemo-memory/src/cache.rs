// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session-scoped cache of resolved storage identifiers.
//!
//! Each identifier is resolved at most once per session and reused
//! afterwards. Every resolution chain runs while holding the cache lock, so
//! two concurrent turns on one session cannot both create the same row.

use mnemo_core::{MnemoError, StorageDriver};
use tokio::sync::Mutex;
use tracing::debug;

/// Storage ids resolved for the current identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CachedIds {
    pub entity_id: Option<i64>,
    pub process_id: Option<i64>,
    pub session_id: Option<i64>,
    pub conversation_id: Option<i64>,
}

/// External identifiers a write resolves against.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ResolveRequest<'a> {
    pub entity_id: Option<&'a str>,
    pub process_id: Option<&'a str>,
    pub session_id: &'a str,
    pub session_timeout_minutes: u32,
}

#[derive(Debug, Default)]
pub struct IdentityCache {
    ids: Mutex<CachedIds>,
}

impl IdentityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> CachedIds {
        *self.ids.lock().await
    }

    pub async fn conversation_id(&self) -> Option<i64> {
        self.ids.lock().await.conversation_id
    }

    /// Clears all four identifiers at once.
    pub async fn reset(&self) {
        *self.ids.lock().await = CachedIds::default();
    }

    /// Resolves entity, process, session and conversation ids for a write,
    /// creating rows as needed.
    ///
    /// Entity and process are only resolved when configured. A create that
    /// yields no id is a [`MnemoError::Resolution`].
    pub(crate) async fn resolve_for_write(
        &self,
        storage: &dyn StorageDriver,
        request: ResolveRequest<'_>,
    ) -> Result<CachedIds, MnemoError> {
        let mut ids = self.ids.lock().await;

        if let Some(entity) = request.entity_id
            && ids.entity_id.is_none()
        {
            ids.entity_id = Some(required(storage.create_entity(entity).await?, "entity_id")?);
        }

        if let Some(process) = request.process_id
            && ids.process_id.is_none()
        {
            ids.process_id = Some(required(
                storage.create_process(process).await?,
                "process_id",
            )?);
        }

        if ids.session_id.is_none() {
            let created = storage
                .create_session(request.session_id, ids.entity_id, ids.process_id)
                .await?;
            ids.session_id = Some(required(created, "session_id")?);
        }

        if ids.conversation_id.is_none() {
            let session_id = required(ids.session_id, "session_id")?;
            let created = storage
                .create_conversation(session_id, request.session_timeout_minutes)
                .await?;
            ids.conversation_id = Some(required(created, "conversation_id")?);
            debug!(conversation_id = ?ids.conversation_id, "conversation resolved");
        }

        Ok(*ids)
    }

    /// Resolves the entity id alone, creating the entity if needed.
    pub(crate) async fn resolve_entity(
        &self,
        storage: &dyn StorageDriver,
        entity_id: &str,
    ) -> Result<i64, MnemoError> {
        let mut ids = self.ids.lock().await;
        if let Some(id) = ids.entity_id {
            return Ok(id);
        }
        let id = required(storage.create_entity(entity_id).await?, "entity_id")?;
        ids.entity_id = Some(id);
        Ok(id)
    }

    /// Finds the conversation of an existing session without creating
    /// anything.
    ///
    /// Only the session id is cached. The conversation found here may be
    /// past the session timeout, so a later write still goes through
    /// `create_conversation`.
    pub(crate) async fn lookup_conversation(
        &self,
        storage: &dyn StorageDriver,
        session_id: &str,
    ) -> Result<Option<i64>, MnemoError> {
        let mut ids = self.ids.lock().await;
        if ids.conversation_id.is_some() {
            return Ok(ids.conversation_id);
        }

        let session = match ids.session_id {
            Some(id) => id,
            None => match storage.read_session(session_id).await? {
                Some(id) => {
                    ids.session_id = Some(id);
                    id
                }
                None => return Ok(None),
            },
        };

        storage.read_conversation_id_by_session_id(session).await
    }
}

pub(crate) fn required(id: Option<i64>, kind: &'static str) -> Result<i64, MnemoError> {
    id.ok_or(MnemoError::Resolution { kind })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo_test_utils::MockStorage;

    fn request(entity: Option<&'static str>, process: Option<&'static str>) -> ResolveRequest<'static> {
        ResolveRequest {
            entity_id: entity,
            process_id: process,
            session_id: "sess",
            session_timeout_minutes: 30,
        }
    }

    #[tokio::test]
    async fn resolves_once_and_reuses() {
        let storage = MockStorage::new();
        let cache = IdentityCache::new();

        let first = cache
            .resolve_for_write(&storage, request(Some("user"), Some("app")))
            .await
            .unwrap();
        let second = cache
            .resolve_for_write(&storage, request(Some("user"), Some("app")))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert!(first.conversation_id.is_some());
        assert_eq!(storage.call_count("create_entity").await, 1);
        assert_eq!(storage.call_count("create_session").await, 1);
        assert_eq!(storage.call_count("create_conversation").await, 1);
    }

    #[tokio::test]
    async fn skips_unconfigured_process() {
        let storage = MockStorage::new();
        let cache = IdentityCache::new();
        let ids = cache
            .resolve_for_write(&storage, request(Some("user"), None))
            .await
            .unwrap();
        assert!(ids.process_id.is_none());
        assert_eq!(storage.call_count("create_process").await, 0);
    }

    #[tokio::test]
    async fn missing_id_is_a_resolution_error() {
        let storage = MockStorage::new();
        storage.return_none_from("conversation").await;
        let cache = IdentityCache::new();
        let err = cache
            .resolve_for_write(&storage, request(Some("user"), None))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "conversation_id is unexpectedly None");
        assert_eq!(cache.conversation_id().await, None);
    }

    #[tokio::test]
    async fn reset_clears_everything() {
        let storage = MockStorage::new();
        let cache = IdentityCache::new();
        cache
            .resolve_for_write(&storage, request(Some("user"), Some("app")))
            .await
            .unwrap();
        cache.reset().await;
        assert_eq!(cache.snapshot().await, CachedIds::default());
    }

    #[tokio::test]
    async fn lookup_reads_without_creating() {
        let storage = MockStorage::new();
        let conversation = storage.seed_history("sess", &[("user", "Q1")]).await;
        let cache = IdentityCache::new();

        assert_eq!(
            cache.lookup_conversation(&storage, "sess").await.unwrap(),
            Some(conversation)
        );
        let ids = cache.snapshot().await;
        assert!(ids.session_id.is_some());
        assert_eq!(ids.conversation_id, None);
        assert_eq!(storage.call_count("create_session").await, 0);
    }

    #[tokio::test]
    async fn write_after_lookup_still_applies_the_timeout() {
        let storage = MockStorage::new();
        storage.seed_history("sess", &[("user", "Q1")]).await;
        let cache = IdentityCache::new();

        cache.lookup_conversation(&storage, "sess").await.unwrap();
        cache
            .resolve_for_write(&storage, request(Some("user"), None))
            .await
            .unwrap();

        assert_eq!(storage.call_count("create_session").await, 0);
        assert_eq!(storage.call_count("create_conversation").await, 1);
    }

    #[tokio::test]
    async fn lookup_of_unknown_session_is_none() {
        let storage = MockStorage::new();
        let cache = IdentityCache::new();
        assert_eq!(cache.lookup_conversation(&storage, "nope").await.unwrap(), None);
        assert_eq!(cache.snapshot().await, CachedIds::default());
    }
}
