// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Augmentation dispatch: hands a captured turn to fact extraction.
//!
//! Cloud mode posts the turn to the collector, on the worker pool when one
//! is configured. Local mode enqueues it on the local augmentation manager.
//! Augmentation is best effort: every failure is logged, none is returned.

use std::sync::Arc;

use mnemo_config::MnemoConfig;
use mnemo_core::types::{ApiHost, AugmentationInput};
use mnemo_core::{CloudApi, MnemoError, TurnMessage};
use serde_json::{Value, json};
use tracing::{debug, error};

use crate::context::{Identity, MemoryContext};
use crate::retry::{Exhausted, RetryPolicy, post_with_backoff};

/// Collector route for cloud augmentation.
pub const AUGMENTATION_ROUTE: &str = "cloud/augmentation";

/// Language tag reported in the `meta.sdk` block.
pub const SDK_LANG: &str = "rust";

/// Dispatches captured turns for augmentation.
pub struct AugmentationDispatcher<'a> {
    ctx: &'a MemoryContext,
}

impl<'a> AugmentationDispatcher<'a> {
    pub fn new(ctx: &'a MemoryContext) -> Self {
        Self { ctx }
    }

    /// Submits `messages` for augmentation. Does nothing when neither an
    /// entity nor a process is attributed.
    pub async fn dispatch(&self, messages: &[TurnMessage]) {
        let identity = self.ctx.identity();
        if identity.entity_id.is_none() && identity.process_id.is_none() {
            debug!("no entity or process attributed, skipping augmentation");
            return;
        }

        if self.ctx.is_cloud() {
            self.dispatch_cloud(&identity, messages).await;
        } else {
            self.dispatch_local(identity, messages).await;
        }
    }

    async fn dispatch_cloud(&self, identity: &Identity, messages: &[TurnMessage]) {
        let Some(cloud) = self.ctx.cloud() else {
            error!("cloud augmentation skipped: no cloud API client");
            return;
        };
        let config = self.ctx.config();
        let dialect = self.ctx.storage().map(|s| s.dialect().to_string());
        let payload = cloud_augmentation_payload(config, identity, dialect.as_deref(), messages);
        let policy = RetryPolicy::from_config(&config.request);
        let cloud = Arc::clone(cloud);

        match self.ctx.pool() {
            Some(pool) if config.augmentation.background => {
                let task = async move {
                    send_in_background(cloud.as_ref(), &payload, policy).await;
                };
                if let Err(e) = pool.spawn(task) {
                    error!(error = %e, "cloud augmentation could not be scheduled");
                }
            }
            _ => send_in_background(cloud.as_ref(), &payload, policy).await,
        }
    }

    async fn dispatch_local(&self, identity: Identity, messages: &[TurnMessage]) {
        let Some(manager) = self.ctx.augmentation() else {
            debug!("no augmentation manager configured, skipping augmentation");
            return;
        };
        let input = AugmentationInput {
            conversation_id: self.ctx.cache().conversation_id().await,
            entity_id: identity.entity_id,
            process_id: identity.process_id,
            conversation_messages: messages.to_vec(),
        };
        if let Err(e) = manager.enqueue(input) {
            error!(error = %e, "local augmentation enqueue failed");
        }
    }
}

/// Posts an augmentation payload with retry. Any 2xx is success.
pub async fn post_cloud_augmentation(
    cloud: &dyn CloudApi,
    payload: &Value,
    policy: RetryPolicy,
) -> Result<(), MnemoError> {
    match post_with_backoff(
        cloud,
        ApiHost::Collector,
        AUGMENTATION_ROUTE,
        payload,
        policy,
        |status| (200..300).contains(&status),
    )
    .await
    {
        Ok(_) => Ok(()),
        Err(Exhausted::Raised(e)) => Err(e),
        Err(Exhausted::Rejected {
            last_status,
            attempts,
        }) => Err(MnemoError::Api {
            message: format!(
                "cloud augmentation request failed (status={last_status}) after {attempts} attempts"
            ),
        }),
    }
}

async fn send_in_background(cloud: &dyn CloudApi, payload: &Value, policy: RetryPolicy) {
    match post_cloud_augmentation(cloud, payload, policy).await {
        Ok(()) => debug!("cloud augmentation submitted"),
        Err(e) => error!(error = %e, "cloud augmentation background task failed"),
    }
}

/// Body of `POST cloud/augmentation`.
pub fn cloud_augmentation_payload(
    config: &MnemoConfig,
    identity: &Identity,
    storage_dialect: Option<&str>,
    messages: &[TurnMessage],
) -> Value {
    let messages: Vec<Value> = messages
        .iter()
        .map(|m| json!({ "role": m.role, "content": m.text }))
        .collect();
    json!({
        "conversation": {
            "messages": messages,
            "summary": null,
        },
        "meta": build_meta(config, identity, storage_dialect),
        "session": { "id": identity.session_id },
    })
}

/// The `meta` block describing who is calling with which stack.
///
/// `storage` is null in cloud mode, where storage is remote; `framework` and
/// `platform` are null when no provider tag is configured.
pub fn build_meta(config: &MnemoConfig, identity: &Identity, storage_dialect: Option<&str>) -> Value {
    let tag = |provider: &Option<String>| match provider {
        Some(p) if !p.is_empty() => json!({ "provider": p }),
        _ => Value::Null,
    };
    let storage = if config.memory.cloud {
        Value::Null
    } else {
        json!({ "dialect": storage_dialect })
    };

    json!({
        "attribution": {
            "entity": { "id": identity.entity_id },
            "process": { "id": identity.process_id },
        },
        "framework": tag(&config.framework.provider),
        "llm": {
            "model": {
                "provider": config.llm.provider,
                "sdk": { "version": config.llm.provider_sdk_version },
            },
        },
        "platform": tag(&config.platform.provider),
        "sdk": {
            "lang": SDK_LANG,
            "version": env!("CARGO_PKG_VERSION"),
        },
        "storage": storage,
    })
}
