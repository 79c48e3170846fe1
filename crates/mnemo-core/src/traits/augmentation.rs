// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local augmentation manager trait.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::MnemoError;
use crate::types::AugmentationInput;

/// Accepts captured turns for asynchronous fact extraction.
#[async_trait]
pub trait AugmentationManager: Send + Sync + 'static {
    /// Queues a turn for extraction. Must not block on the extraction itself.
    fn enqueue(&self, input: AugmentationInput) -> Result<(), MnemoError>;

    /// Waits for queued work to finish. Returns `false` on timeout.
    async fn wait(&self, _timeout: Duration) -> bool {
        true
    }
}
