// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory pipeline core for LLM calls.
//!
//! Records conversation turns, extracts facts from them in the background,
//! and injects history and relevant facts into later requests.
//!
//! ## Architecture
//!
//! - **MemoryContext**: settings, identity, identifier cache and collaborators
//! - **Manager**: write path, cloud with retry or local storage
//! - **AugmentationDispatcher**: best-effort hand-off of turns for fact extraction
//! - **LocalAugmentationManager**: LLM-based fact extraction with dedup
//! - **Recall**: local similarity search or cloud recall of facts and history
//! - **ProviderFamily**: request-shape aware injection helpers
//! - **Invocation**: per-call prepare/complete pipeline
//! - **AugmentationPool**: bounded, drainable worker pool

pub mod augmentation;
pub mod augmenter;
pub mod cache;
pub mod capture;
pub mod context;
pub mod injection;
pub mod invocation;
pub mod logging;
pub mod manager;
pub mod pool;
pub mod recall;
pub mod retry;

pub use augmentation::AugmentationDispatcher;
pub use augmenter::LocalAugmentationManager;
pub use cache::{CachedIds, IdentityCache};
pub use capture::capture_turn;
pub use context::{Identity, MemoryContext, MemoryContextBuilder};
pub use injection::ProviderFamily;
pub use invocation::{Invocation, InvocationStage};
pub use manager::Manager;
pub use pool::AugmentationPool;
pub use recall::{Recall, RecallResult};
pub use retry::RetryPolicy;
