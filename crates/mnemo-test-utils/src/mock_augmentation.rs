// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recording augmentation manager.

use std::sync::{Arc, Mutex};

use mnemo_core::types::AugmentationInput;
use mnemo_core::{AugmentationManager, MnemoError};

/// Records every enqueued input and does nothing else.
#[derive(Clone, Default)]
pub struct MockAugmentation {
    inputs: Arc<Mutex<Vec<AugmentationInput>>>,
}

impl MockAugmentation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inputs enqueued so far, in order.
    pub fn inputs(&self) -> Vec<AugmentationInput> {
        self.inputs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl AugmentationManager for MockAugmentation {
    fn enqueue(&self, input: AugmentationInput) -> Result<(), MnemoError> {
        self.inputs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(input);
        Ok(())
    }
}
