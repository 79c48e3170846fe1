// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic mocks of every Mnemo collaborator trait.
//!
//! Used by unit and integration tests across the workspace to exercise the
//! memory pipeline without a database, network or model.

pub mod mock_augmentation;
pub mod mock_cloud;
pub mod mock_embedder;
pub mod mock_provider;
pub mod mock_storage;

pub use mock_augmentation::MockAugmentation;
pub use mock_cloud::{MockCloudApi, MockReply};
pub use mock_embedder::MockEmbedder;
pub use mock_provider::MockProvider;
pub use mock_storage::{MockStorage, RecordedMessage};
