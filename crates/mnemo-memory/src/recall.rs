// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recall of facts and conversation history.
//!
//! Local recall embeds the query, scores it against the entity's stored
//! fact embeddings by cosine similarity, keeps scores at or above
//! `recall.relevance_threshold`, and returns the best `limit` facts. Cloud
//! recall issues a single request that answers with both ranked facts and
//! history; facts are filtered by `recall.cloud_relevance_threshold` since
//! rank scores are not on the similarity scale.

use std::collections::HashMap;

use mnemo_config::model::RecallConfig;
use mnemo_core::types::{ApiHost, EmbeddingInput, StoredEmbedding};
use mnemo_core::{Attribution, Fact, MnemoError, SessionRef, StoredMessage};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::context::MemoryContext;

/// Route of the hosted recall endpoint.
pub const CLOUD_RECALL_ROUTE: &str = "cloud/recall";

/// Facts and history returned by one recall.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecallResult {
    pub facts: Vec<Fact>,
    pub messages: Vec<StoredMessage>,
}

/// Recall engine bound to a memory context.
pub struct Recall<'a> {
    ctx: &'a MemoryContext,
}

impl<'a> Recall<'a> {
    pub fn new(ctx: &'a MemoryContext) -> Self {
        Self { ctx }
    }

    /// Facts relevant to `query`, best first. `limit` defaults to
    /// `recall.facts_limit`.
    ///
    /// Returns an empty list when no entity is attributed or no backend is
    /// configured.
    pub async fn search_facts(
        &self,
        query: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Fact>, MnemoError> {
        let limit = limit.unwrap_or(self.ctx.config().recall.facts_limit);
        if self.ctx.is_cloud() {
            return Ok(self.cloud_recall(query, limit).await?.facts);
        }
        self.local_facts(query, limit).await
    }

    /// Prior messages of the current conversation, oldest first.
    ///
    /// Cloud mode asks the recall endpoint, using `query` for ranking.
    pub async fn fetch_history(&self, query: &str) -> Result<Vec<StoredMessage>, MnemoError> {
        if self.ctx.is_cloud() {
            let limit = self.ctx.config().recall.facts_limit;
            return Ok(self.cloud_recall(query, limit).await?.messages);
        }
        self.local_history().await
    }

    /// One round trip to the hosted recall endpoint.
    pub async fn cloud_recall(&self, query: &str, limit: usize) -> Result<RecallResult, MnemoError> {
        let cloud = self
            .ctx
            .cloud()
            .ok_or_else(|| MnemoError::Config("cloud recall needs a cloud API client".into()))?;
        let identity = self.ctx.identity();
        let body = json!({
            "attribution": Attribution::new(
                identity.entity_id.as_deref(),
                identity.process_id.as_deref(),
            ),
            "query": query,
            "limit": limit,
            "session": SessionRef { id: identity.session_id },
        });

        let response = cloud.post_json(ApiHost::Api, CLOUD_RECALL_ROUTE, &body).await?;
        let mut result = parse_recall_response(&response);
        result.facts = filter_relevant(result.facts, &self.ctx.config().recall);
        result.facts.truncate(limit);
        debug!(
            facts = result.facts.len(),
            messages = result.messages.len(),
            "cloud recall finished"
        );
        Ok(result)
    }

    async fn local_facts(&self, query: &str, limit: usize) -> Result<Vec<Fact>, MnemoError> {
        let Some(entity) = self.ctx.identity().entity_id else {
            return Ok(Vec::new());
        };
        let Some(storage) = self.ctx.storage() else {
            return Ok(Vec::new());
        };
        let Some(embedder) = self.ctx.embedder() else {
            debug!("no embedding adapter configured, skipping local fact search");
            return Ok(Vec::new());
        };

        let entity_id = self.ctx.cache().resolve_entity(storage.as_ref(), &entity).await?;

        let output = embedder
            .embed(EmbeddingInput {
                texts: vec![query.to_string()],
            })
            .await?;
        let query_embedding = output
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| MnemoError::Embedding("embedding returned no results".to_string()))?;

        let recall = &self.ctx.config().recall;
        let candidates = storage
            .read_fact_embeddings(entity_id, recall.embeddings_limit)
            .await?;
        let ranked = rank_by_similarity(
            &query_embedding,
            &candidates,
            recall.relevance_threshold as f32,
            limit,
        );
        if ranked.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = ranked.iter().map(|(id, _)| *id).collect();
        let mut found: HashMap<i64, Fact> =
            storage.read_facts_by_ids(&ids).await?.into_iter().collect();
        if found.len() != ranked.len() {
            warn!(
                expected = ranked.len(),
                found = found.len(),
                "storage returned a different number of facts than requested"
            );
        }

        Ok(ranked
            .into_iter()
            .filter_map(|(id, similarity)| {
                found
                    .remove(&id)
                    .map(|fact| fact.with_similarity(similarity))
            })
            .collect())
    }

    /// History of the cached conversation, resolving it from the session
    /// when the cache is cold. Never creates rows.
    async fn local_history(&self) -> Result<Vec<StoredMessage>, MnemoError> {
        let Some(storage) = self.ctx.storage() else {
            return Ok(Vec::new());
        };
        let session_id = self.ctx.identity().session_id;
        let Some(conversation_id) = self
            .ctx
            .cache()
            .lookup_conversation(storage.as_ref(), &session_id)
            .await?
        else {
            return Ok(Vec::new());
        };
        storage.read_messages(conversation_id).await
    }
}

/// Cosine similarity of two vectors.
///
/// Mismatched lengths and zero vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Scores candidates against the query, keeps those at or above
/// `threshold`, and returns the best `limit` as `(fact_id, similarity)`.
///
/// Ties keep candidate order.
pub fn rank_by_similarity(
    query: &[f32],
    candidates: &[StoredEmbedding],
    threshold: f32,
    limit: usize,
) -> Vec<(i64, f32)> {
    let mut ranked: Vec<(i64, f32)> = candidates
        .iter()
        .map(|c| (c.fact_id, cosine_similarity(query, &c.embedding)))
        .filter(|(_, similarity)| *similarity >= threshold)
        .collect();

    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(limit);
    ranked
}

/// Drops facts scoring below their threshold.
///
/// A similarity is checked against `relevance_threshold`, a rank score
/// against `cloud_relevance_threshold`. Unscored facts pass.
pub fn filter_relevant(facts: Vec<Fact>, config: &RecallConfig) -> Vec<Fact> {
    facts
        .into_iter()
        .filter(|fact| match (fact.similarity, fact.rank_score) {
            (Some(similarity), _) => f64::from(similarity) >= config.relevance_threshold,
            (None, Some(rank)) => f64::from(rank) >= config.cloud_relevance_threshold,
            (None, None) => true,
        })
        .collect()
}

/// Splits a recall response into facts and messages. Entries that do not
/// parse are skipped.
pub fn parse_recall_response(response: &Value) -> RecallResult {
    let facts = response
        .get("facts")
        .and_then(Value::as_array)
        .map(|facts| {
            facts
                .iter()
                .filter_map(|entry| match entry {
                    Value::String(content) => Some(Fact::new(content.clone())),
                    other => serde_json::from_value::<Fact>(other.clone()).ok(),
                })
                .collect()
        })
        .unwrap_or_default();

    let messages = response
        .get("messages")
        .and_then(Value::as_array)
        .map(|messages| {
            messages
                .iter()
                .filter_map(|m| serde_json::from_value::<StoredMessage>(m.clone()).ok())
                .collect()
        })
        .unwrap_or_default();

    RecallResult { facts, messages }
}
