// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the memory pipeline.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Cloud,
    Embedding,
    Provider,
    Augmentation,
}

/// Which hosted service host a cloud call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiHost {
    /// Main API: conversation writes and recall.
    Api,
    /// Collector: augmentation submissions.
    Collector,
}

// --- Conversation payloads ---

/// One captured conversation message, as persisted and sent to the cloud.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnMessage {
    pub role: String,
    /// Optional provider specific tag (e.g. "text", "tool_result").
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    pub text: String,
}

impl TurnMessage {
    pub fn new(role: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            kind: None,
            text: text.into(),
        }
    }

    pub fn is_system(&self) -> bool {
        self.role == "system"
    }
}

/// `{ "id": ... }` reference used throughout the cloud contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdRef {
    pub id: Option<String>,
}

/// Who a memory belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribution {
    pub entity: IdRef,
    pub process: IdRef,
}

impl Attribution {
    pub fn new(entity_id: Option<&str>, process_id: Option<&str>) -> Self {
        Self {
            entity: IdRef {
                id: entity_id.map(str::to_string),
            },
            process: IdRef {
                id: process_id.map(str::to_string),
            },
        }
    }

    /// True when neither an entity nor a process is attributed.
    pub fn is_empty(&self) -> bool {
        self.entity.id.is_none() && self.process.id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRef {
    pub id: String,
}

/// A conversation turn handed to the write path.
///
/// Serializes to the body of `POST cloud/conversation/messages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPayload {
    pub attribution: Attribution,
    pub messages: Vec<TurnMessage>,
    pub session: SessionRef,
}

impl RecordPayload {
    /// Copy of this payload with every system-role message removed.
    ///
    /// The original payload is left untouched.
    pub fn without_system_messages(&self) -> Self {
        Self {
            attribution: self.attribution.clone(),
            messages: self
                .messages
                .iter()
                .filter(|m| !m.is_system())
                .cloned()
                .collect(),
            session: self.session.clone(),
        }
    }
}

// --- Storage records ---

/// A history message as read back from storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub role: String,
    #[serde(alias = "text")]
    pub content: String,
}

impl StoredMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// A conversation row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: i64,
    pub session_id: i64,
    pub date_created: String,
}

/// A derived fact about an entity.
///
/// Local recall fills `similarity`; cloud recall fills `rank_score`. The two
/// scales are not assumed to be comparable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub content: String,
    #[serde(default)]
    pub similarity: Option<f32>,
    #[serde(default)]
    pub rank_score: Option<f32>,
    #[serde(default)]
    pub date_created: Option<String>,
}

impl Fact {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            similarity: None,
            rank_score: None,
            date_created: None,
        }
    }

    pub fn with_similarity(mut self, similarity: f32) -> Self {
        self.similarity = Some(similarity);
        self
    }

    pub fn with_rank_score(mut self, rank_score: f32) -> Self {
        self.rank_score = Some(rank_score);
        self
    }

    pub fn with_date_created(mut self, date_created: impl Into<String>) -> Self {
        self.date_created = Some(date_created.into());
        self
    }
}

/// A stored fact embedding, as scanned by local recall.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEmbedding {
    pub fact_id: i64,
    pub embedding: Vec<f32>,
}

// --- Augmentation ---

/// Input record handed to a local augmentation manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AugmentationInput {
    /// Storage conversation id from the identity cache, if resolved yet.
    pub conversation_id: Option<i64>,
    pub entity_id: Option<String>,
    pub process_id: Option<String>,
    pub conversation_messages: Vec<TurnMessage>,
}

// --- Embedding types ---

/// Input for an embedding adapter.
#[derive(Debug, Clone)]
pub struct EmbeddingInput {
    pub texts: Vec<String>,
}

/// Output from an embedding adapter, one vector per input text.
#[derive(Debug, Clone)]
pub struct EmbeddingOutput {
    pub embeddings: Vec<Vec<f32>>,
    pub dimensions: usize,
}

// --- Completion types ---

/// A single-shot completion request used by fact extraction.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub model: String,
    pub system_prompt: Option<String>,
    pub prompt: String,
    pub max_tokens: u32,
}

/// The text of a completion.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub content: String,
}
