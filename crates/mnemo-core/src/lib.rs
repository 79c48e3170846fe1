// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Mnemo memory pipeline.
//!
//! This crate provides the error type, the shared domain types and the
//! collaborator traits (storage driver, cloud API, embedding, completion,
//! augmentation manager) used throughout the workspace.

pub mod error;
pub mod traits;
pub mod types;

pub use error::MnemoError;
pub use types::{
    AdapterType, ApiHost, Attribution, AugmentationInput, Fact, HealthStatus, IdRef,
    RecordPayload, SessionRef, StoredMessage, TurnMessage,
};

pub use traits::{
    AugmentationManager, CloudApi, EmbeddingAdapter, PluginAdapter, ProviderAdapter,
    StorageDriver,
};
