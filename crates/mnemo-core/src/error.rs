// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Mnemo memory pipeline.

use thiserror::Error;

/// Message used when the hosted service rejects a caller for quota reasons.
pub const DEFAULT_QUOTA_MESSAGE: &str =
    "your IP address is over quota; register for an API key to continue";

/// The primary error type used across all Mnemo adapter traits and core operations.
#[derive(Debug, Error)]
pub enum MnemoError {
    /// Configuration errors detected at runtime (missing hosts, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage driver errors (connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A network call failed before any HTTP status was observed.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Generic cloud API failure, e.g. retries exhausted on soft failures.
    #[error("{message}")]
    Api { message: String },

    /// The cloud API answered with a 4xx/5xx status.
    #[error("{message}")]
    ApiClient {
        status: u16,
        message: String,
        details: Option<serde_json::Value>,
    },

    /// The cloud API rejected the request body (422).
    #[error("{message}")]
    ApiValidation {
        status: u16,
        message: String,
        details: Option<serde_json::Value>,
    },

    /// The cloud API explicitly rejected the request (433).
    #[error("{message}")]
    ApiRequestRejected {
        status: u16,
        message: String,
        details: Option<serde_json::Value>,
    },

    /// Rate limit or account quota exceeded (429).
    #[error("{message}")]
    QuotaExceeded { message: String },

    /// Cloud mode was requested without an API key.
    #[error("a {env_var} is required to use the cloud API")]
    MissingApiKey { env_var: String },

    /// A storage create operation returned no identifier.
    #[error("{kind} is unexpectedly None")]
    Resolution { kind: &'static str },

    /// Embedding collaborator failure.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// LLM completion collaborator failure.
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MnemoError {
    /// Builds the error matching a non-success status from a JSON endpoint.
    ///
    /// `message` is the server supplied message, if any.
    pub fn from_status(
        status: u16,
        message: Option<String>,
        details: Option<serde_json::Value>,
    ) -> Self {
        let message =
            message.unwrap_or_else(|| format!("cloud API request failed with status {status}"));
        match status {
            429 => MnemoError::QuotaExceeded {
                message: DEFAULT_QUOTA_MESSAGE.to_string(),
            },
            422 => MnemoError::ApiValidation {
                status,
                message,
                details,
            },
            433 => MnemoError::ApiRequestRejected {
                status,
                message,
                details,
            },
            _ => MnemoError::ApiClient {
                status,
                message,
                details,
            },
        }
    }

    /// Returns the HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            MnemoError::ApiClient { status, .. }
            | MnemoError::ApiValidation { status, .. }
            | MnemoError::ApiRequestRejected { status, .. } => Some(*status),
            MnemoError::QuotaExceeded { .. } => Some(429),
            _ => None,
        }
    }
}
