// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic embedding adapter.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use mnemo_core::types::{AdapterType, EmbeddingInput, EmbeddingOutput, HealthStatus};
use mnemo_core::{EmbeddingAdapter, MnemoError, PluginAdapter};

/// Dimension of the bag-of-words vectors.
pub const MOCK_DIMENSIONS: usize = 64;

/// Embeds text as a normalized bag-of-words vector over hashed buckets.
///
/// Texts registered with [`MockEmbedder::with_vector`] return the given
/// vector verbatim, so tests can dictate exact similarities.
#[derive(Clone, Default)]
pub struct MockEmbedder {
    fixed: HashMap<String, Vec<f32>>,
    calls: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the embedding of an exact text.
    pub fn with_vector(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.fixed.insert(text.into(), vector);
        self
    }

    /// Make every call fail.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Texts embedded so far.
    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        if let Some(vector) = self.fixed.get(text) {
            return vector.clone();
        }
        let mut vector = vec![0.0_f32; MOCK_DIMENSIONS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let bucket = fnv1a(&word.to_lowercase()) as usize % MOCK_DIMENSIONS;
            vector[bucket] += 1.0;
        }
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

fn fnv1a(s: &str) -> u64 {
    s.bytes().fold(0xcbf29ce484222325, |hash, b| {
        (hash ^ u64::from(b)).wrapping_mul(0x100000001b3)
    })
}

#[async_trait]
impl PluginAdapter for MockEmbedder {
    fn name(&self) -> &str {
        "mock-embedder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl EmbeddingAdapter for MockEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, MnemoError> {
        self.calls.lock().await.extend(input.texts.iter().cloned());
        if self.fail {
            return Err(MnemoError::Embedding("mock embedder failure".to_string()));
        }
        let embeddings: Vec<Vec<f32>> = input.texts.iter().map(|t| self.embed_text(t)).collect();
        let dimensions = embeddings.first().map_or(MOCK_DIMENSIONS, Vec::len);
        Ok(EmbeddingOutput {
            embeddings,
            dimensions,
        })
    }
}
