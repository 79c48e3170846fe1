// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turn capture: the messages a completed LLM call contributes to memory.

use mnemo_core::TurnMessage;
use serde_json::Value;

use crate::injection::{ProviderFamily, exclude_injected_messages};

/// Normalises the request's own turns plus the model's answer.
///
/// System turns are dropped, then the leading history injected into this
/// request (counted by `marker`) is excluded so it is not recorded twice.
/// Messages without text are skipped.
pub fn capture_turn(
    family: ProviderFamily,
    request: &Value,
    response_text: Option<&str>,
    marker: &Value,
) -> Vec<TurnMessage> {
    let own = family.conversation_messages(request);
    let mut messages: Vec<TurnMessage> = exclude_injected_messages(&own, marker)
        .into_iter()
        .filter(|m| !m.text.trim().is_empty())
        .collect();

    if let Some(text) = response_text.filter(|t| !t.trim().is_empty()) {
        messages.push(TurnMessage::new("assistant", text));
    }
    messages
}
