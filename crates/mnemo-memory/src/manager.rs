// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The write path: durably records a conversation turn.
//!
//! Cloud mode posts the turn with retry and, once the service accepted it,
//! mirrors it into local storage when a driver is configured. Local mode
//! writes to storage directly. System messages are never recorded.

use mnemo_core::types::ApiHost;
use mnemo_core::{MnemoError, RecordPayload, StorageDriver};
use tracing::debug;

use crate::cache::ResolveRequest;
use crate::context::MemoryContext;
use crate::logging::loggable;
use crate::retry::{Exhausted, RetryPolicy, post_with_backoff};

/// Route the turn is posted to in cloud mode.
pub const CONVERSATION_MESSAGES_ROUTE: &str = "cloud/conversation/messages";

/// The only status the cloud write accepts.
const CREATED: u16 = 201;

/// Records conversation turns for a memory context.
pub struct Manager<'a> {
    ctx: &'a MemoryContext,
}

impl<'a> Manager<'a> {
    pub fn new(ctx: &'a MemoryContext) -> Self {
        Self { ctx }
    }

    /// Records `payload` minus its system messages. The caller's payload is
    /// not modified.
    ///
    /// Errors from the cloud (after retries) and from storage propagate.
    pub async fn record(&self, payload: &RecordPayload) -> Result<(), MnemoError> {
        debug!("memory manager execution started");
        let stripped = payload.without_system_messages();

        if self.ctx.is_cloud() {
            self.record_cloud(&stripped).await?;
        } else if let Some(storage) = self.ctx.storage() {
            self.persist(storage.as_ref(), &stripped).await?;
        } else {
            debug!("no storage configured, turn not recorded");
        }

        debug!("memory manager execution completed");
        Ok(())
    }

    async fn record_cloud(&self, payload: &RecordPayload) -> Result<(), MnemoError> {
        let cloud = self
            .ctx
            .cloud()
            .ok_or_else(|| MnemoError::Config("cloud mode requires a cloud API client".into()))?;
        let body = serde_json::to_value(payload)
            .map_err(|e| MnemoError::Internal(format!("failed to encode turn: {e}")))?;
        let policy = RetryPolicy::from_config(&self.ctx.config().request);

        match post_with_backoff(
            cloud.as_ref(),
            ApiHost::Api,
            CONVERSATION_MESSAGES_ROUTE,
            &body,
            policy,
            |status| status == CREATED,
        )
        .await
        {
            Ok(_) => {}
            Err(Exhausted::Raised(e)) => return Err(e),
            Err(Exhausted::Rejected {
                last_status,
                attempts,
            }) => {
                return Err(MnemoError::Api {
                    message: format!(
                        "Expected 201 from cloud API but received {last_status} after {attempts} attempts"
                    ),
                });
            }
        }

        // Best-effort mirror: not retried, failures propagate.
        if let Some(storage) = self.ctx.storage() {
            self.persist(storage.as_ref(), payload).await?;
        }
        Ok(())
    }

    /// Resolves ids (creating rows as needed), writes each message in
    /// order, then flushes and commits.
    async fn persist(
        &self,
        storage: &dyn StorageDriver,
        payload: &RecordPayload,
    ) -> Result<(), MnemoError> {
        let identity = self.ctx.identity();
        let ids = self
            .ctx
            .cache()
            .resolve_for_write(
                storage,
                ResolveRequest {
                    entity_id: identity.entity_id.as_deref(),
                    process_id: identity.process_id.as_deref(),
                    session_id: &identity.session_id,
                    session_timeout_minutes: self.ctx.config().memory.session_timeout_minutes,
                },
            )
            .await?;
        let conversation_id = ids
            .conversation_id
            .ok_or(MnemoError::Resolution {
                kind: "conversation_id",
            })?;

        let truncate = self.ctx.config().logging.truncate_content;
        for message in &payload.messages {
            if message.role.is_empty() {
                continue;
            }
            debug!(
                conversation_id,
                role = %message.role,
                text = %loggable(&message.text, truncate),
                "writing message"
            );
            storage
                .create_message(
                    conversation_id,
                    &message.role,
                    message.kind.as_deref(),
                    &message.text,
                )
                .await?;
        }

        storage.flush().await?;
        storage.commit().await
    }
}
