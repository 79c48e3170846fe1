// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator trait definitions consumed by the memory pipeline.
//!
//! Adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod augmentation;
pub mod cloud;
pub mod embedding;
pub mod provider;
pub mod storage;

pub use adapter::PluginAdapter;
pub use augmentation::AugmentationManager;
pub use cloud::CloudApi;
pub use embedding::EmbeddingAdapter;
pub use provider::ProviderAdapter;
pub use storage::StorageDriver;
