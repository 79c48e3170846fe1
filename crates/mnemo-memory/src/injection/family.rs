// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payload adapters for the request shapes of each provider family.
//!
//! All operations work on the raw JSON request and degrade to a no-op (or
//! an empty result) when the request does not have the expected shape.

use mnemo_core::types::{StoredMessage, TurnMessage};
use serde_json::{Map, Value, json};

/// Separator placed between existing system text and an appended block.
pub const BLOCK_SEPARATOR: &str = "\n\n";

/// Request shape family, selected from the configured provider tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderFamily {
    /// `messages` list with an optional leading `system` role message
    /// (OpenAI, xAI, Bedrock converse and compatible APIs).
    #[default]
    Chat,
    /// `messages` list plus a top-level `system` string or block list.
    Anthropic,
    /// Google style `contents` plus `config.system_instruction`.
    Structured,
}

impl ProviderFamily {
    /// Maps an `llm.provider` tag to its family. Unknown tags are `Chat`.
    pub fn from_provider(provider: Option<&str>) -> Self {
        let Some(provider) = provider else {
            return Self::Chat;
        };
        let tag = provider.to_ascii_lowercase();
        if ["google", "gemini", "vertex"].iter().any(|t| tag.contains(t)) {
            Self::Structured
        } else if tag.contains("anthropic") || tag.contains("claude") {
            Self::Anthropic
        } else {
            Self::Chat
        }
    }

    /// Text of the current user query, or an empty string when none can be
    /// found.
    pub fn extract_user_query(&self, request: &Value) -> String {
        match self {
            Self::Chat | Self::Anthropic => request
                .get("messages")
                .and_then(Value::as_array)
                .and_then(|messages| {
                    messages
                        .iter()
                        .rev()
                        .find(|m| role_of(m) == Some("user"))
                })
                .map(|m| content_text(m.get("content").unwrap_or(&Value::Null)))
                .unwrap_or_default(),
            Self::Structured => request
                .get("contents")
                .map(query_from_contents)
                .unwrap_or_default(),
        }
    }

    /// All text currently in the request's system container.
    pub fn system_text(&self, request: &Value) -> String {
        match self {
            Self::Chat => request
                .get("messages")
                .and_then(Value::as_array)
                .map(|messages| {
                    messages
                        .iter()
                        .take_while(|m| role_of(m) == Some("system"))
                        .map(|m| content_text(m.get("content").unwrap_or(&Value::Null)))
                        .collect::<Vec<_>>()
                        .join("\n")
                })
                .unwrap_or_default(),
            Self::Anthropic => request.get("system").map(content_text).unwrap_or_default(),
            Self::Structured => request
                .get("config")
                .and_then(|c| c.get("system_instruction"))
                .map(instruction_text)
                .unwrap_or_default(),
        }
    }

    /// Appends `block` to the system container, creating it when absent and
    /// keeping the shape of an existing one.
    ///
    /// Returns `false` if the request shape left nowhere to put the text.
    pub fn append_system_text(&self, request: &mut Value, block: &str) -> bool {
        match self {
            Self::Chat => {
                let Some(messages) = request.get_mut("messages").and_then(Value::as_array_mut)
                else {
                    return false;
                };
                match messages.first_mut() {
                    Some(first) if role_of(first) == Some("system") => {
                        let Some(first) = first.as_object_mut() else {
                            return false;
                        };
                        append_to_slot(first, "content", block, chat_part)
                    }
                    _ => {
                        messages.insert(0, json!({ "role": "system", "content": block }));
                        true
                    }
                }
            }
            Self::Anthropic => {
                let Some(request) = request.as_object_mut() else {
                    return false;
                };
                match request.get_mut("system") {
                    Some(Value::Array(blocks)) => {
                        blocks.push(chat_part(block));
                        true
                    }
                    _ => append_to_slot(request, "system", block, chat_part),
                }
            }
            Self::Structured => {
                let Some(request) = request.as_object_mut() else {
                    return false;
                };
                let config = request
                    .entry("config")
                    .or_insert_with(|| Value::Object(Map::new()));
                if config.is_null() {
                    *config = Value::Object(Map::new());
                }
                match config.as_object_mut() {
                    Some(config) => append_to_slot(config, "system_instruction", block, text_part),
                    None => false,
                }
            }
        }
    }

    /// Inserts prior conversation turns ahead of the caller's own turns, in
    /// their original order. Returns how many were inserted.
    ///
    /// Chat requests keep their leading system messages first.
    pub fn prepend_history(&self, request: &mut Value, history: &[StoredMessage]) -> usize {
        if history.is_empty() {
            return 0;
        }
        match self {
            Self::Chat | Self::Anthropic => {
                let Some(messages) = request.get_mut("messages").and_then(Value::as_array_mut)
                else {
                    return 0;
                };
                let at = if *self == Self::Chat {
                    messages
                        .iter()
                        .take_while(|m| role_of(m) == Some("system"))
                        .count()
                } else {
                    0
                };
                for (offset, message) in history.iter().enumerate() {
                    messages.insert(
                        at + offset,
                        json!({ "role": message.role, "content": message.content }),
                    );
                }
                history.len()
            }
            Self::Structured => {
                let Some(request) = request.as_object_mut() else {
                    return 0;
                };
                let mut contents: Vec<Value> = history.iter().map(structured_turn).collect();
                match request.remove("contents") {
                    None | Some(Value::Null) => {}
                    Some(Value::String(text)) => {
                        contents.push(json!({ "role": "user", "parts": [{ "text": text }] }));
                    }
                    Some(Value::Array(existing)) => contents.extend(existing),
                    Some(other) => contents.push(other),
                }
                request.insert("contents".to_string(), Value::Array(contents));
                history.len()
            }
        }
    }

    /// The request's conversation turns, system turns excluded, normalised
    /// to `{role, type, text}`.
    pub fn conversation_messages(&self, request: &Value) -> Vec<TurnMessage> {
        match self {
            Self::Chat | Self::Anthropic => request
                .get("messages")
                .and_then(Value::as_array)
                .map(|messages| {
                    messages
                        .iter()
                        .filter_map(|m| {
                            let role = role_of(m)?;
                            if role == "system" {
                                return None;
                            }
                            Some(TurnMessage {
                                role: role.to_string(),
                                kind: m.get("type").and_then(Value::as_str).map(str::to_string),
                                text: content_text(m.get("content").unwrap_or(&Value::Null)),
                            })
                        })
                        .collect()
                })
                .unwrap_or_default(),
            Self::Structured => match request.get("contents") {
                Some(Value::String(text)) => vec![TurnMessage::new("user", text.clone())],
                Some(Value::Array(items)) => items.iter().filter_map(structured_message).collect(),
                Some(item @ Value::Object(_)) => structured_message(item).into_iter().collect(),
                _ => Vec::new(),
            },
        }
    }
}

fn role_of(message: &Value) -> Option<&str> {
    message.get("role").and_then(Value::as_str)
}

fn chat_part(text: &str) -> Value {
    json!({ "type": "text", "text": text })
}

fn text_part(text: &str) -> Value {
    json!({ "text": text })
}

/// Text of a list of parts: bare strings and `{text}` objects, joined with
/// a space.
pub(crate) fn text_from_parts(parts: &[Value]) -> String {
    parts
        .iter()
        .filter_map(|part| match part {
            Value::String(s) => Some(s.as_str()),
            Value::Object(o) => o.get("text").and_then(Value::as_str),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of a message `content`: a string, a list of parts, or a part.
fn content_text(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        Value::Array(parts) => text_from_parts(parts),
        Value::Object(o) => o
            .get("text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_default(),
        _ => String::new(),
    }
}

fn instruction_text(instruction: &Value) -> String {
    match instruction {
        Value::Object(o) => match o.get("parts").and_then(Value::as_array) {
            Some(parts) => text_from_parts(parts),
            None => content_text(instruction),
        },
        other => content_text(other),
    }
}

/// Query of a structured `contents` value: a string, or the last string or
/// user turn in a list.
fn query_from_contents(contents: &Value) -> String {
    match contents {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .rev()
            .find_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Object(_) if matches!(role_of(item), None | Some("user")) => {
                    Some(turn_text(item))
                }
                _ => None,
            })
            .unwrap_or_default(),
        Value::Object(_) => turn_text(contents),
        _ => String::new(),
    }
}

fn turn_text(turn: &Value) -> String {
    match turn.get("parts").and_then(Value::as_array) {
        Some(parts) => text_from_parts(parts),
        None => content_text(turn),
    }
}

fn structured_turn(message: &StoredMessage) -> Value {
    let role = if message.role == "assistant" {
        "model"
    } else {
        message.role.as_str()
    };
    json!({ "role": role, "parts": [{ "text": message.content }] })
}

fn structured_message(item: &Value) -> Option<TurnMessage> {
    match item {
        Value::String(s) => Some(TurnMessage::new("user", s.clone())),
        Value::Object(_) => {
            let role = match role_of(item) {
                Some("model") => "assistant",
                Some("system") => return None,
                Some(role) => role,
                None => "user",
            };
            Some(TurnMessage::new(role, turn_text(item)))
        }
        _ => None,
    }
}

/// Appends `block` to `container[key]`, preserving the value's shape:
/// absent or null becomes the bare block, a string is concatenated, a list
/// has its last text extended (or `new_part` pushed), and an object with
/// `parts` or `text` is extended in place.
fn append_to_slot(
    container: &mut Map<String, Value>,
    key: &str,
    block: &str,
    new_part: fn(&str) -> Value,
) -> bool {
    match container.get_mut(key) {
        None | Some(Value::Null) => {
            container.insert(key.to_string(), Value::String(block.to_string()));
            true
        }
        Some(Value::String(existing)) => {
            push_block(existing, block);
            true
        }
        Some(Value::Array(list)) => {
            append_to_list(list, block, new_part);
            true
        }
        Some(Value::Object(content)) => {
            if let Some(Value::Array(parts)) = content.get_mut("parts") {
                append_to_list(parts, block, new_part);
                return true;
            }
            if let Some(Value::String(text)) = content.get_mut("text") {
                push_block(text, block);
                return true;
            }
            content.insert("parts".to_string(), Value::Array(vec![new_part(block)]));
            true
        }
        Some(_) => false,
    }
}

fn append_to_list(list: &mut Vec<Value>, block: &str, new_part: fn(&str) -> Value) {
    match list.last_mut() {
        Some(Value::String(existing)) => push_block(existing, block),
        Some(Value::Object(part)) => match part.get_mut("text") {
            Some(Value::String(text)) => push_block(text, block),
            _ => list.push(new_part(block)),
        },
        _ => list.push(new_part(block)),
    }
}

fn push_block(existing: &mut String, block: &str) {
    existing.push_str(BLOCK_SEPARATOR);
    existing.push_str(block);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history() -> Vec<StoredMessage> {
        vec![
            StoredMessage::new("user", "Q1"),
            StoredMessage::new("assistant", "A1"),
        ]
    }

    #[test]
    fn provider_tags_map_to_families() {
        assert_eq!(ProviderFamily::from_provider(None), ProviderFamily::Chat);
        assert_eq!(ProviderFamily::from_provider(Some("openai")), ProviderFamily::Chat);
        assert_eq!(
            ProviderFamily::from_provider(Some("Anthropic")),
            ProviderFamily::Anthropic
        );
        assert_eq!(
            ProviderFamily::from_provider(Some("chatgooglegenai")),
            ProviderFamily::Structured
        );
        assert_eq!(
            ProviderFamily::from_provider(Some("gemini")),
            ProviderFamily::Structured
        );
    }

    // --- query extraction ---

    #[test]
    fn chat_query_is_last_user_message() {
        let request = json!({"messages": [
            {"role": "user", "content": "First question"},
            {"role": "assistant", "content": "First answer"},
            {"role": "user", "content": "Second question"},
        ]});
        assert_eq!(
            ProviderFamily::Chat.extract_user_query(&request),
            "Second question"
        );
    }

    #[test]
    fn chat_query_without_user_message_is_empty() {
        let request = json!({"messages": [
            {"role": "system", "content": "You are helpful"},
            {"role": "assistant", "content": "I can help"},
        ]});
        assert_eq!(ProviderFamily::Chat.extract_user_query(&request), "");
        assert_eq!(ProviderFamily::Chat.extract_user_query(&json!({})), "");
        assert_eq!(
            ProviderFamily::Chat.extract_user_query(&json!({"messages": []})),
            ""
        );
    }

    #[test]
    fn anthropic_query_reads_text_blocks() {
        let request = json!({"messages": [
            {"role": "user", "content": [{"type": "text", "text": "What do I like?"}]},
        ]});
        assert_eq!(
            ProviderFamily::Anthropic.extract_user_query(&request),
            "What do I like?"
        );
    }

    #[test]
    fn structured_query_joins_user_parts() {
        let request = json!({"contents": [{"role": "user", "parts": ["Hello", "World"]}]});
        assert_eq!(
            ProviderFamily::Structured.extract_user_query(&request),
            "Hello World"
        );
    }

    #[test]
    fn structured_query_last_string_wins() {
        let request = json!({"contents": ["First", "Second"]});
        assert_eq!(ProviderFamily::Structured.extract_user_query(&request), "Second");
    }

    #[test]
    fn structured_query_skips_model_turns() {
        let request = json!({"contents": [
            {"role": "user", "parts": [{"text": "First question"}]},
            {"role": "model", "parts": [{"text": "Answer"}]},
            {"role": "user", "parts": [{"text": "Second question"}]},
            {"role": "model", "parts": [{"text": "Later answer"}]},
        ]});
        assert_eq!(
            ProviderFamily::Structured.extract_user_query(&request),
            "Second question"
        );
    }

    #[test]
    fn structured_query_from_string_and_empty_values() {
        let family = ProviderFamily::Structured;
        assert_eq!(
            family.extract_user_query(&json!({"contents": "What is the weather?"})),
            "What is the weather?"
        );
        assert_eq!(family.extract_user_query(&json!({"contents": []})), "");
        assert_eq!(family.extract_user_query(&json!({"contents": ""})), "");
    }

    #[test]
    fn parts_mix_strings_and_objects() {
        assert_eq!(
            text_from_parts(&[json!("Hello"), json!({"text": "World"})]),
            "Hello World"
        );
        assert_eq!(text_from_parts(&[]), "");
    }

    // --- system container ---

    #[test]
    fn chat_extends_existing_system_message() {
        let mut request = json!({"messages": [
            {"role": "system", "content": "You are a helpful assistant."},
            {"role": "user", "content": "Hi"},
        ]});
        assert!(ProviderFamily::Chat.append_system_text(&mut request, "ctx"));
        assert_eq!(request["messages"].as_array().unwrap().len(), 2);
        assert_eq!(
            request["messages"][0]["content"],
            "You are a helpful assistant.\n\nctx"
        );
    }

    #[test]
    fn chat_inserts_system_message_when_missing() {
        let mut request = json!({"messages": [{"role": "user", "content": "Hi"}]});
        assert!(ProviderFamily::Chat.append_system_text(&mut request, "ctx"));
        assert_eq!(request["messages"][0], json!({"role": "system", "content": "ctx"}));
        assert_eq!(request["messages"][1]["role"], "user");
    }

    #[test]
    fn chat_system_parts_are_extended() {
        let mut request = json!({"messages": [
            {"role": "system", "content": [{"type": "text", "text": "Be brief."}]},
        ]});
        ProviderFamily::Chat.append_system_text(&mut request, "ctx");
        assert_eq!(request["messages"][0]["content"][0]["text"], "Be brief.\n\nctx");
    }

    #[test]
    fn chat_without_messages_is_untouched() {
        let mut request = json!({"model": "gpt"});
        assert!(!ProviderFamily::Chat.append_system_text(&mut request, "ctx"));
        assert_eq!(request, json!({"model": "gpt"}));
    }

    #[test]
    fn anthropic_system_string_and_blocks() {
        let family = ProviderFamily::Anthropic;

        let mut request = json!({"messages": []});
        family.append_system_text(&mut request, "ctx");
        assert_eq!(request["system"], "ctx");

        let mut request = json!({"system": "Be kind.", "messages": []});
        family.append_system_text(&mut request, "ctx");
        assert_eq!(request["system"], "Be kind.\n\nctx");

        let mut request = json!({"system": [{"type": "text", "text": "Be kind."}]});
        family.append_system_text(&mut request, "ctx");
        assert_eq!(
            request["system"],
            json!([{"type": "text", "text": "Be kind."}, {"type": "text", "text": "ctx"}])
        );
    }

    #[test]
    fn structured_instruction_shapes_are_preserved() {
        let family = ProviderFamily::Structured;

        let mut request = json!({"config": {}});
        family.append_system_text(&mut request, "test context");
        assert_eq!(request["config"]["system_instruction"], "test context");

        let mut request = json!({"contents": "hi"});
        family.append_system_text(&mut request, "test context");
        assert_eq!(request["config"]["system_instruction"], "test context");

        let mut request = json!({"config": {"system_instruction": "Existing."}});
        family.append_system_text(&mut request, "test context");
        assert_eq!(
            request["config"]["system_instruction"],
            "Existing.\n\ntest context"
        );

        let mut request = json!({"config": {"system_instruction": [{"text": "Existing."}]}});
        family.append_system_text(&mut request, "test context");
        assert_eq!(
            request["config"]["system_instruction"][0]["text"],
            "Existing.\n\ntest context"
        );

        let mut request = json!({"config": {"system_instruction": ["Existing."]}});
        family.append_system_text(&mut request, "test context");
        assert_eq!(
            request["config"]["system_instruction"][0],
            "Existing.\n\ntest context"
        );

        let mut request = json!({"config": {"system_instruction": []}});
        family.append_system_text(&mut request, "test");
        assert_eq!(request["config"]["system_instruction"], json!([{"text": "test"}]));
    }

    #[test]
    fn structured_instruction_content_objects() {
        let family = ProviderFamily::Structured;

        let mut request =
            json!({"config": {"system_instruction": {"parts": [{"text": "Existing"}]}}});
        family.append_system_text(&mut request, "test");
        assert_eq!(
            request["config"]["system_instruction"]["parts"][0]["text"],
            "Existing\n\ntest"
        );

        let mut request = json!({"config": {"system_instruction": {"text": "Existing"}}});
        family.append_system_text(&mut request, "test");
        assert_eq!(
            request["config"]["system_instruction"]["text"],
            "Existing\n\ntest"
        );
        assert_eq!(family.system_text(&request), "Existing\n\ntest");
    }

    // --- history ---

    #[test]
    fn chat_history_goes_after_system_messages() {
        let mut request = json!({"messages": [
            {"role": "system", "content": "sys"},
            {"role": "user", "content": "Q2"},
        ]});
        assert_eq!(
            ProviderFamily::Chat.prepend_history(&mut request, &history()),
            2
        );
        let contents: Vec<&str> = request["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["content"].as_str().unwrap())
            .collect();
        assert_eq!(contents, ["sys", "Q1", "A1", "Q2"]);
    }

    #[test]
    fn structured_history_uses_model_role_and_wraps_string_contents() {
        let mut request = json!({"contents": "Q2"});
        assert_eq!(
            ProviderFamily::Structured.prepend_history(&mut request, &history()),
            2
        );
        assert_eq!(
            request["contents"],
            json!([
                {"role": "user", "parts": [{"text": "Q1"}]},
                {"role": "model", "parts": [{"text": "A1"}]},
                {"role": "user", "parts": [{"text": "Q2"}]},
            ])
        );
    }

    #[test]
    fn empty_history_changes_nothing() {
        let mut request = json!({"messages": [{"role": "user", "content": "Q2"}]});
        let before = request.clone();
        assert_eq!(ProviderFamily::Chat.prepend_history(&mut request, &[]), 0);
        assert_eq!(request, before);
    }

    // --- capture ---

    #[test]
    fn conversation_messages_skip_system_turns() {
        let request = json!({"messages": [
            {"role": "system", "content": "sys"},
            {"role": "user", "content": [{"type": "text", "text": "Hello"}]},
        ]});
        let messages = ProviderFamily::Chat.conversation_messages(&request);
        assert_eq!(messages, vec![TurnMessage::new("user", "Hello")]);
    }

    #[test]
    fn structured_conversation_maps_model_to_assistant() {
        let request = json!({"contents": [
            "plain",
            {"role": "model", "parts": [{"text": "answer"}]},
        ]});
        let messages = ProviderFamily::Structured.conversation_messages(&request);
        assert_eq!(
            messages,
            vec![
                TurnMessage::new("user", "plain"),
                TurnMessage::new("assistant", "answer"),
            ]
        );
    }
}
