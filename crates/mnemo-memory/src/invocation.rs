// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One LLM call through the memory pipeline.
//!
//! [`Invocation::prepare`] enriches the outgoing request with history and
//! facts (`New -> HistoryChecked -> FactsChecked -> Ready`); after the call,
//! [`Invocation::complete`] records the turn and dispatches it for
//! augmentation. Injection never fails the call: any error leaves the
//! request as it was and is logged.

use mnemo_core::{Attribution, Fact, MnemoError, RecordPayload, SessionRef, StoredMessage};
use serde_json::Value;
use tracing::{debug, warn};

use crate::augmentation::AugmentationDispatcher;
use crate::capture::capture_turn;
use crate::context::MemoryContext;
use crate::injection::{ProviderFamily, format_facts_block, injection_marker};
use crate::manager::Manager;
use crate::recall::{Recall, RecallResult, filter_relevant};

/// How far [`Invocation::prepare`] got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationStage {
    New,
    HistoryChecked,
    FactsChecked,
    Ready,
}

/// Per-call state: which injections already ran, how many history
/// messages were prepended, and the cloud recall shared by both steps.
#[derive(Debug)]
pub struct Invocation<'a> {
    ctx: &'a MemoryContext,
    family: ProviderFamily,
    history_checked: bool,
    facts_checked: bool,
    ready: bool,
    injected_message_count: usize,
    cloud_recall: Option<RecallResult>,
}

impl<'a> Invocation<'a> {
    /// Starts an invocation using the context's provider family.
    pub fn new(ctx: &'a MemoryContext) -> Self {
        Self::with_family(ctx, ctx.family())
    }

    pub fn with_family(ctx: &'a MemoryContext, family: ProviderFamily) -> Self {
        Self {
            ctx,
            family,
            history_checked: false,
            facts_checked: false,
            ready: false,
            injected_message_count: 0,
            cloud_recall: None,
        }
    }

    pub fn family(&self) -> ProviderFamily {
        self.family
    }

    pub fn stage(&self) -> InvocationStage {
        if self.ready {
            InvocationStage::Ready
        } else if self.facts_checked {
            InvocationStage::FactsChecked
        } else if self.history_checked {
            InvocationStage::HistoryChecked
        } else {
            InvocationStage::New
        }
    }

    /// Number of leading messages that were injected history.
    pub fn injected_message_count(&self) -> usize {
        self.injected_message_count
    }

    /// Turn payload marker carrying [`Self::injected_message_count`].
    pub fn marker(&self) -> Value {
        injection_marker(self.injected_message_count)
    }

    /// Runs history then fact injection. Calling it again is a no-op.
    pub async fn prepare(&mut self, request: &mut Value) {
        let history = self.inject_history(request).await;
        let facts = self.inject_facts(request).await;
        self.ready = true;
        debug!(history, facts, "request prepared");
    }

    /// Prepends prior messages of the conversation. Returns how many were
    /// added; 0 on a repeated call.
    pub async fn inject_history(&mut self, request: &mut Value) -> usize {
        if self.history_checked {
            return 0;
        }
        self.history_checked = true;

        let history = match self.load_history(request).await {
            Ok(history) => history,
            Err(e) => {
                warn!(error = %e, "history injection skipped");
                return 0;
            }
        };
        let count = self.family.prepend_history(request, &history);
        self.injected_message_count = count;
        if count > 0 {
            debug!(injected = count, "history injected");
        }
        count
    }

    /// Appends relevant facts to the system container. Returns how many
    /// facts were injected; 0 on a repeated call or when the same block is
    /// already present.
    pub async fn inject_facts(&mut self, request: &mut Value) -> usize {
        if self.facts_checked {
            return 0;
        }
        self.facts_checked = true;

        if self.ctx.identity().entity_id.is_none() {
            return 0;
        }
        if !self.ctx.is_cloud() && self.ctx.storage().is_none() {
            return 0;
        }
        let query = self.family.extract_user_query(request);
        if query.trim().is_empty() {
            debug!("no user query found, skipping fact injection");
            return 0;
        }

        let facts = match self.load_facts(&query).await {
            Ok(facts) => filter_relevant(facts, &self.ctx.config().recall),
            Err(e) => {
                warn!(error = %e, "fact injection skipped");
                return 0;
            }
        };
        let Some(block) = format_facts_block(&facts) else {
            return 0;
        };
        if self.family.system_text(request).contains(&block) {
            debug!("facts already present in system prompt");
            return 0;
        }
        if !self.family.append_system_text(request, &block) {
            warn!("request has no usable system container, facts not injected");
            return 0;
        }
        debug!(injected = facts.len(), "facts injected");
        facts.len()
    }

    /// Records the completed turn and hands it to augmentation.
    ///
    /// `request` is the request as sent, including anything injected by
    /// [`Self::prepare`]. Recording errors propagate; augmentation errors
    /// are only logged.
    pub async fn complete(
        &self,
        request: &Value,
        response_text: Option<&str>,
    ) -> Result<(), MnemoError> {
        let messages = capture_turn(self.family, request, response_text, &self.marker());
        if messages.is_empty() {
            debug!("nothing to record for this turn");
            return Ok(());
        }

        let identity = self.ctx.identity();
        let payload = RecordPayload {
            attribution: Attribution::new(
                identity.entity_id.as_deref(),
                identity.process_id.as_deref(),
            ),
            messages,
            session: SessionRef {
                id: identity.session_id,
            },
        };
        Manager::new(self.ctx).record(&payload).await?;
        AugmentationDispatcher::new(self.ctx)
            .dispatch(&payload.messages)
            .await;
        Ok(())
    }

    async fn load_history(&mut self, request: &Value) -> Result<Vec<StoredMessage>, MnemoError> {
        if self.ctx.is_cloud() {
            let query = self.family.extract_user_query(request);
            return Ok(self.shared_cloud_recall(&query).await?.messages);
        }
        if self.ctx.storage().is_none() {
            return Ok(Vec::new());
        }
        Recall::new(self.ctx).fetch_history("").await
    }

    async fn load_facts(&mut self, query: &str) -> Result<Vec<Fact>, MnemoError> {
        if self.ctx.is_cloud() {
            return Ok(self.shared_cloud_recall(query).await?.facts);
        }
        Recall::new(self.ctx).search_facts(query, None).await
    }

    /// The invocation's single cloud recall, fetched on first use.
    async fn shared_cloud_recall(&mut self, query: &str) -> Result<RecallResult, MnemoError> {
        if let Some(result) = &self.cloud_recall {
            return Ok(result.clone());
        }
        let limit = self.ctx.config().recall.facts_limit;
        let result = Recall::new(self.ctx).cloud_recall(query, limit).await?;
        self.cloud_recall = Some(result.clone());
        Ok(result)
    }
}
