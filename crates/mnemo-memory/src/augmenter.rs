// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local fact extraction from conversation turns.
//!
//! Asks a completion model for the facts stated in a turn, embeds each one,
//! drops near-duplicates of facts the entity already has, and stores the
//! rest. Runs on the augmentation pool so callers never wait on it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mnemo_config::MnemoConfig;
use mnemo_core::types::{AugmentationInput, EmbeddingInput, ProviderRequest};
use mnemo_core::{
    AugmentationManager, EmbeddingAdapter, MnemoError, ProviderAdapter, StorageDriver, TurnMessage,
};
use serde::Deserialize;
use tracing::{debug, error, warn};

use crate::cache::required;
use crate::pool::AugmentationPool;
use crate::recall::cosine_similarity;

/// Similarity above which an extracted fact counts as already known.
const DEDUP_THRESHOLD: f32 = 0.9;

const MAX_EXTRACTION_TOKENS: u32 = 2048;

const EXTRACTION_PROMPT: &str = r#"Extract durable facts about the user from this conversation. Output as JSON array.

For each fact:
- "content": The fact as a standalone statement (e.g., "The user's dog is named Max")

Only include facts that are:
1. Stated by the user (not the assistant)
2. Specific and likely to matter in future conversations

If there are no such facts, return an empty array: []

Conversation:
{conversation}

Output JSON array only, no explanation:"#;

/// One fact as returned by the extraction model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExtractedFact {
    pub content: String,
}

/// [`AugmentationManager`] that extracts and stores facts locally.
#[derive(Clone)]
pub struct LocalAugmentationManager {
    extractor: Arc<FactExtractor>,
    pool: AugmentationPool,
}

struct FactExtractor {
    storage: Arc<dyn StorageDriver>,
    embedder: Arc<dyn EmbeddingAdapter>,
    provider: Arc<dyn ProviderAdapter>,
    extraction_model: String,
    embeddings_limit: usize,
}

impl LocalAugmentationManager {
    pub fn new(
        config: &MnemoConfig,
        storage: Arc<dyn StorageDriver>,
        embedder: Arc<dyn EmbeddingAdapter>,
        provider: Arc<dyn ProviderAdapter>,
        pool: AugmentationPool,
    ) -> Self {
        Self {
            extractor: Arc::new(FactExtractor {
                storage,
                embedder,
                provider,
                extraction_model: config.augmentation.extraction_model.clone(),
                embeddings_limit: config.recall.embeddings_limit,
            }),
            pool,
        }
    }

    /// Runs extraction for `input` on the current task and returns the
    /// number of facts stored.
    pub async fn process(&self, input: &AugmentationInput) -> Result<usize, MnemoError> {
        self.extractor.process(input).await
    }
}

impl std::fmt::Debug for LocalAugmentationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalAugmentationManager")
            .field("extraction_model", &self.extractor.extraction_model)
            .field("pool", &self.pool)
            .finish()
    }
}

#[async_trait]
impl AugmentationManager for LocalAugmentationManager {
    fn enqueue(&self, input: AugmentationInput) -> Result<(), MnemoError> {
        if input.entity_id.is_none() {
            debug!("no entity attributed, facts not extracted");
            return Ok(());
        }
        let extractor = Arc::clone(&self.extractor);
        self.pool.spawn(async move {
            match extractor.process(&input).await {
                Ok(stored) => debug!(stored, "local augmentation finished"),
                Err(e) => error!(error = %e, "local augmentation failed"),
            }
        })
    }

    async fn wait(&self, timeout: Duration) -> bool {
        self.pool.wait(timeout).await
    }
}

impl FactExtractor {
    async fn process(&self, input: &AugmentationInput) -> Result<usize, MnemoError> {
        let Some(entity) = input.entity_id.as_deref() else {
            return Ok(0);
        };
        if input.conversation_messages.is_empty() {
            return Ok(0);
        }

        let response = self
            .provider
            .complete(ProviderRequest {
                model: self.extraction_model.clone(),
                system_prompt: None,
                prompt: build_extraction_prompt(&input.conversation_messages),
                max_tokens: MAX_EXTRACTION_TOKENS,
            })
            .await?;
        let facts = parse_extraction_response(&response.content);
        if facts.is_empty() {
            return Ok(0);
        }

        let entity_id = required(self.storage.create_entity(entity).await?, "entity_id")?;
        let mut known: Vec<Vec<f32>> = self
            .storage
            .read_fact_embeddings(entity_id, self.embeddings_limit)
            .await?
            .into_iter()
            .map(|stored| stored.embedding)
            .collect();

        let mut stored = 0;
        for fact in facts {
            match self.store_fact(entity_id, &fact, &known).await {
                Ok(Some(embedding)) => {
                    known.push(embedding);
                    stored += 1;
                }
                Ok(None) => debug!("Skipped duplicate fact: {}", fact.content),
                Err(e) => warn!("Failed to store extracted fact '{}': {e}", fact.content),
            }
        }

        if stored > 0 {
            self.storage.commit().await?;
        }
        Ok(stored)
    }

    /// Embeds and stores one fact. Returns `None` for a near-duplicate.
    async fn store_fact(
        &self,
        entity_id: i64,
        fact: &ExtractedFact,
        known: &[Vec<f32>],
    ) -> Result<Option<Vec<f32>>, MnemoError> {
        let output = self
            .embedder
            .embed(EmbeddingInput {
                texts: vec![fact.content.clone()],
            })
            .await?;
        let embedding = output
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| MnemoError::Embedding("embedder returned no vectors".to_string()))?;

        if let Some(similarity) = highest_similarity(&embedding, known)
            && similarity > DEDUP_THRESHOLD
        {
            return Ok(None);
        }

        required(
            self.storage
                .create_fact(entity_id, &fact.content, &embedding)
                .await?,
            "fact_id",
        )?;
        Ok(Some(embedding))
    }
}

fn build_extraction_prompt(messages: &[TurnMessage]) -> String {
    let mut conversation = String::new();
    for message in messages {
        let role = match message.role.as_str() {
            "user" => "User",
            "assistant" => "Assistant",
            other => other,
        };
        conversation.push_str(&format!("{role}: {}\n", message.text));
    }
    EXTRACTION_PROMPT.replace("{conversation}", &conversation)
}

/// Parses the extraction model's answer into facts.
///
/// Tolerates markdown code fences and prose around the JSON array. Anything
/// unparseable yields no facts.
pub fn parse_extraction_response(response: &str) -> Vec<ExtractedFact> {
    let trimmed = response.trim();
    let start = trimmed.find('[').unwrap_or(0);
    let end = trimmed.rfind(']').map_or(trimmed.len(), |i| i + 1);
    let json = trimmed.get(start..end).unwrap_or(trimmed);

    match serde_json::from_str::<Vec<ExtractedFact>>(json) {
        Ok(facts) => facts
            .into_iter()
            .filter(|f| !f.content.trim().is_empty())
            .collect(),
        Err(e) => {
            warn!("Failed to parse extraction response: {e}");
            Vec::new()
        }
    }
}

fn highest_similarity(query: &[f32], known: &[Vec<f32>]) -> Option<f32> {
    known
        .iter()
        .filter(|embedding| embedding.len() == query.len())
        .map(|embedding| cosine_similarity(query, embedding))
        .max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo_test_utils::{MockEmbedder, MockProvider, MockStorage};

    fn input(entity: Option<&str>) -> AugmentationInput {
        AugmentationInput {
            conversation_id: Some(1),
            entity_id: entity.map(str::to_string),
            process_id: None,
            conversation_messages: vec![
                TurnMessage::new("user", "My dog's name is Max and I live in Berlin."),
                TurnMessage::new("assistant", "Nice to meet Max!"),
            ],
        }
    }

    fn manager(
        storage: &MockStorage,
        embedder: MockEmbedder,
        provider: &MockProvider,
    ) -> LocalAugmentationManager {
        LocalAugmentationManager::new(
            &MnemoConfig::default(),
            Arc::new(storage.clone()),
            Arc::new(embedder),
            Arc::new(provider.clone()),
            AugmentationPool::new(2),
        )
    }

    #[test]
    fn parse_valid_json_array() {
        let facts = parse_extraction_response(
            r#"[{"content": "User's dog is named Max"}, {"content": "User lives in Berlin"}]"#,
        );
        assert_eq!(facts.len(), 2);
        assert_eq!(facts[1].content, "User lives in Berlin");
    }

    #[test]
    fn parse_markdown_code_block() {
        let response = "```json\n[{\"content\": \"User uses Rust\", \"category\": \"project\"}]\n```";
        let facts = parse_extraction_response(response);
        assert_eq!(facts, vec![ExtractedFact {
            content: "User uses Rust".into()
        }]);
    }

    #[test]
    fn parse_with_surrounding_text() {
        let response = "Here you go:\n[{\"content\": \"User likes tea\"}]\nDone.";
        assert_eq!(parse_extraction_response(response).len(), 1);
    }

    #[test]
    fn parse_malformed_returns_empty() {
        assert!(parse_extraction_response("not json at all").is_empty());
        assert!(parse_extraction_response("]oops[").is_empty());
        assert!(parse_extraction_response(r#"[{"content": "  "}]"#).is_empty());
    }

    #[test]
    fn prompt_labels_roles() {
        let prompt = build_extraction_prompt(&input(Some("u")).conversation_messages);
        assert!(prompt.contains("User: My dog's name is Max"));
        assert!(prompt.contains("Assistant: Nice to meet Max!"));
    }

    #[test]
    fn highest_similarity_ignores_mismatched_dimensions() {
        let known = vec![vec![1.0, 0.0], vec![0.0, 1.0, 0.0], vec![0.6, 0.8]];
        let best = highest_similarity(&[1.0, 0.0], &known).unwrap();
        assert!((best - 1.0).abs() < 1e-6);
        assert!(highest_similarity(&[1.0, 0.0], &[]).is_none());
    }

    #[tokio::test]
    async fn stores_new_facts_and_commits() {
        let storage = MockStorage::new();
        let provider = MockProvider::with_responses(vec![
            r#"[{"content": "User's dog is named Max"}, {"content": "User lives in Berlin"}]"#
                .into(),
        ]);
        let manager = manager(&storage, MockEmbedder::new(), &provider);

        let stored = manager.process(&input(Some("user-1"))).await.unwrap();
        assert_eq!(stored, 2);
        assert_eq!(
            storage.fact_contents().await,
            vec!["User's dog is named Max", "User lives in Berlin"]
        );
        assert_eq!(storage.call_count("commit").await, 1);

        let requests = provider.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, MnemoConfig::default().augmentation.extraction_model);
        assert!(requests[0].prompt.contains("I live in Berlin"));
    }

    #[tokio::test]
    async fn skips_facts_already_known() {
        let storage = MockStorage::new();
        let embedder = MockEmbedder::new()
            .with_vector("User likes pizza", vec![1.0, 0.0])
            .with_vector("User loves pizza", vec![0.99, 0.05])
            .with_vector("User has a cat", vec![0.0, 1.0]);
        storage
            .seed_fact("user-1", "User likes pizza", vec![1.0, 0.0], None)
            .await;
        let provider = MockProvider::with_responses(vec![
            r#"[{"content": "User loves pizza"}, {"content": "User has a cat"}]"#.into(),
        ]);
        let manager = manager(&storage, embedder, &provider);

        assert_eq!(manager.process(&input(Some("user-1"))).await.unwrap(), 1);
        assert_eq!(
            storage.fact_contents().await,
            vec!["User likes pizza", "User has a cat"]
        );
    }

    #[tokio::test]
    async fn duplicates_within_one_answer_are_stored_once() {
        let storage = MockStorage::new();
        let provider = MockProvider::with_responses(vec![
            r#"[{"content": "User lives in Berlin"}, {"content": "user lives in berlin"}]"#.into(),
        ]);
        let manager = manager(&storage, MockEmbedder::new(), &provider);
        assert_eq!(manager.process(&input(Some("user-1"))).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn empty_answer_touches_no_storage() {
        let storage = MockStorage::new();
        let manager = manager(&storage, MockEmbedder::new(), &MockProvider::new());
        assert_eq!(manager.process(&input(Some("user-1"))).await.unwrap(), 0);
        assert!(storage.calls().await.is_empty());
    }

    #[tokio::test]
    async fn embedding_failures_skip_the_fact() {
        let storage = MockStorage::new();
        let provider =
            MockProvider::with_responses(vec![r#"[{"content": "User likes tea"}]"#.into()]);
        let manager = manager(&storage, MockEmbedder::failing(), &provider);
        assert_eq!(manager.process(&input(Some("user-1"))).await.unwrap(), 0);
        assert!(storage.fact_contents().await.is_empty());
        assert_eq!(storage.call_count("commit").await, 0);
    }

    #[tokio::test]
    async fn enqueue_runs_on_the_pool() {
        let storage = MockStorage::new();
        let provider =
            MockProvider::with_responses(vec![r#"[{"content": "User likes tea"}]"#.into()]);
        let manager = manager(&storage, MockEmbedder::new(), &provider);

        manager.enqueue(input(Some("user-1"))).unwrap();
        assert!(manager.wait(Duration::from_secs(5)).await);
        assert_eq!(storage.fact_contents().await, vec!["User likes tea"]);
    }

    #[tokio::test]
    async fn enqueue_without_entity_is_ignored() {
        let storage = MockStorage::new();
        let provider = MockProvider::new();
        let manager = manager(&storage, MockEmbedder::new(), &provider);

        manager.enqueue(input(None)).unwrap();
        assert!(manager.wait(Duration::from_secs(5)).await);
        assert!(provider.requests().await.is_empty());
    }
}
