// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Marker for how many leading messages of a turn were injected history.

use serde_json::{Map, Value, json};

/// Key under `conversation.query` carrying the injected history count.
pub const INJECTED_COUNT_KEY: &str = "_mnemo_injected_count";

/// Same marker as written by Python SDK payloads. Read, never written.
pub const COMPAT_INJECTED_COUNT_KEY: &str = "_memori_injected_count";

/// Builds the turn payload marker `{"conversation": {"query": {KEY: count}}}`.
pub fn injection_marker(count: usize) -> Value {
    json!({ "conversation": { "query": { INJECTED_COUNT_KEY: count } } })
}

/// Writes the injected count into an existing turn payload, creating the
/// intermediate objects. Non-object values on the path are replaced.
pub fn mark_injected_count(payload: &mut Value, count: usize) {
    let mut root = into_object(Some(payload.take()));
    let mut conversation = into_object(root.remove("conversation"));
    let mut query = into_object(conversation.remove("query"));
    query.insert(INJECTED_COUNT_KEY.to_string(), json!(count));
    conversation.insert("query".to_string(), Value::Object(query));
    root.insert("conversation".to_string(), Value::Object(conversation));
    *payload = Value::Object(root);
}

fn into_object(value: Option<Value>) -> Map<String, Value> {
    match value {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

/// The injected count recorded on a turn payload, 0 when absent.
pub fn injected_count(payload: &Value) -> usize {
    let query = payload.get("conversation").and_then(|c| c.get("query"));
    query
        .and_then(|q| q.get(INJECTED_COUNT_KEY))
        .or_else(|| query.and_then(|q| q.get(COMPAT_INJECTED_COUNT_KEY)))
        .and_then(Value::as_u64)
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(0)
}

/// Drops the leading injected messages from `messages`.
///
/// Pure: the same inputs always give the same output and nothing is
/// mutated.
pub fn exclude_injected_messages<T: Clone>(messages: &[T], payload: &Value) -> Vec<T> {
    let skip = injected_count(payload).min(messages.len());
    messages[skip..].to_vec()
}
