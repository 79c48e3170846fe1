// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Mnemo memory pipeline.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Mnemo configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MnemoConfig {
    /// Mode and identity settings.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Retry and timeout policy for cloud calls.
    #[serde(default)]
    pub request: RequestConfig,

    /// Fact and history recall settings.
    #[serde(default)]
    pub recall: RecallConfig,

    /// Augmentation dispatch settings.
    #[serde(default)]
    pub augmentation: AugmentationConfig,

    /// Hosted service settings.
    #[serde(default)]
    pub cloud: CloudConfig,

    /// Local storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// LLM provider tags reported in augmentation metadata.
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub framework: ProviderTagConfig,

    #[serde(default)]
    pub platform: ProviderTagConfig,

    /// Embedding model settings.
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,

    /// Content logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Mode and identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Use the hosted service instead of local storage.
    #[serde(default)]
    pub cloud: bool,

    /// The end user memories belong to.
    #[serde(default)]
    pub entity_id: Option<String>,

    /// The application recording memories.
    #[serde(default)]
    pub process_id: Option<String>,

    /// Session identifier. A fresh UUID is generated when unset.
    #[serde(default)]
    pub session_id: Option<String>,

    /// Idle minutes after which a new conversation is started in the session.
    #[serde(default = "default_session_timeout_minutes")]
    pub session_timeout_minutes: u32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            cloud: false,
            entity_id: None,
            process_id: None,
            session_id: None,
            session_timeout_minutes: default_session_timeout_minutes(),
        }
    }
}

fn default_session_timeout_minutes() -> u32 {
    30
}

/// Retry and timeout policy for cloud requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RequestConfig {
    /// Maximum attempts per cloud write or augmentation post.
    #[serde(default = "default_num_backoff")]
    pub num_backoff: u32,

    /// Base of the exponential backoff, in seconds. Zero falls back to
    /// one second.
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,

    /// Per-request network timeout, in seconds.
    #[serde(default = "default_secs_timeout")]
    pub secs_timeout: u64,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            num_backoff: default_num_backoff(),
            backoff_factor: default_backoff_factor(),
            secs_timeout: default_secs_timeout(),
        }
    }
}

fn default_num_backoff() -> u32 {
    5
}

fn default_backoff_factor() -> f64 {
    1.0
}

fn default_secs_timeout() -> u64 {
    5
}

/// Recall configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RecallConfig {
    /// Maximum facts injected per request.
    #[serde(default = "default_facts_limit")]
    pub facts_limit: usize,

    /// Minimum embedding similarity for locally recalled facts.
    #[serde(default = "default_relevance_threshold")]
    pub relevance_threshold: f64,

    /// Minimum rank score for facts returned by the hosted service.
    #[serde(default = "default_relevance_threshold")]
    pub cloud_relevance_threshold: f64,

    /// Maximum candidate embeddings scanned by local recall.
    #[serde(default = "default_embeddings_limit")]
    pub embeddings_limit: usize,
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            facts_limit: default_facts_limit(),
            relevance_threshold: default_relevance_threshold(),
            cloud_relevance_threshold: default_relevance_threshold(),
            embeddings_limit: default_embeddings_limit(),
        }
    }
}

fn default_facts_limit() -> usize {
    5
}

fn default_relevance_threshold() -> f64 {
    0.1
}

fn default_embeddings_limit() -> usize {
    1000
}

/// Augmentation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AugmentationConfig {
    /// Concurrent background augmentation tasks.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Run cloud augmentation on the worker pool. `false` posts inline.
    #[serde(default = "default_true")]
    pub background: bool,

    /// Model used by local fact extraction.
    #[serde(default = "default_extraction_model")]
    pub extraction_model: String,
}

impl Default for AugmentationConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            background: true,
            extraction_model: default_extraction_model(),
        }
    }
}

fn default_max_workers() -> usize {
    15
}

fn default_extraction_model() -> String {
    "claude-haiku-4-5-20250901".to_string()
}

fn default_true() -> bool {
    true
}

/// Hosted service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CloudConfig {
    /// API key. Required in cloud mode.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL of the main API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Base URL of the augmentation collector. Falls back to `base_url`.
    #[serde(default)]
    pub collector_url: Option<String>,
}

impl CloudConfig {
    /// The effective collector base URL.
    pub fn collector_url(&self) -> &str {
        self.collector_url.as_deref().unwrap_or(&self.base_url)
    }
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            collector_url: None,
        }
    }
}

fn default_base_url() -> String {
    "https://api.mnemo.dev/v1".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: true,
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("mnemo").join("mnemo.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("mnemo.db"))
        .to_string_lossy()
        .into_owned()
}

/// LLM provider tags.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    /// Provider tag, e.g. "openai", "anthropic", "google". Also selects the
    /// payload shape used for injection.
    #[serde(default)]
    pub provider: Option<String>,

    /// Version of the provider SDK in use.
    #[serde(default)]
    pub provider_sdk_version: Option<String>,

    /// Model name.
    #[serde(default)]
    pub version: Option<String>,
}

/// A single provider tag, used by `[framework]` and `[platform]`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderTagConfig {
    #[serde(default)]
    pub provider: Option<String>,
}

/// Embedding model configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmbeddingsConfig {
    #[serde(default = "default_embeddings_model")]
    pub model: String,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            model: default_embeddings_model(),
        }
    }
}

fn default_embeddings_model() -> String {
    "all-MiniLM-L6-v2".to_string()
}

/// Content logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Truncate message content in debug logs.
    #[serde(default = "default_true")]
    pub truncate_content: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            truncate_content: true,
        }
    }
}
