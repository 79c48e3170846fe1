// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory storage driver that records every call.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use mnemo_core::types::{
    AdapterType, ConversationRecord, Fact, HealthStatus, StoredEmbedding, StoredMessage,
};
use mnemo_core::{MnemoError, PluginAdapter, StorageDriver};

/// A message written through [`StorageDriver::create_message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedMessage {
    pub conversation_id: i64,
    pub role: String,
    pub kind: Option<String>,
    pub text: String,
}

#[derive(Default)]
struct State {
    next_id: i64,
    entities: HashMap<String, i64>,
    processes: HashMap<String, i64>,
    sessions: HashMap<String, i64>,
    conversations: Vec<ConversationRecord>,
    messages: Vec<RecordedMessage>,
    facts: Vec<(i64, i64, String, Vec<f32>, Option<String>)>,
    calls: Vec<String>,
    null_creates: HashSet<&'static str>,
    hidden_facts: HashSet<i64>,
    fail_all: bool,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn enter(&mut self, call: &str) -> Result<(), MnemoError> {
        self.calls.push(call.to_string());
        if self.fail_all {
            return Err(MnemoError::Storage {
                source: format!("mock storage failure in {call}").into(),
            });
        }
        Ok(())
    }
}

/// In-memory [`StorageDriver`].
///
/// Conversations are reused per session regardless of the timeout. Creates
/// can be told to return `None` to exercise resolution failures.
#[derive(Clone, Default)]
pub struct MockStorage {
    state: Arc<Mutex<State>>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `create_<kind>` return `None` ("entity", "process", "session",
    /// "conversation", "fact").
    pub async fn return_none_from(&self, kind: &'static str) {
        self.state.lock().await.null_creates.insert(kind);
    }

    /// Keep a fact's embedding readable but leave it out of
    /// `read_facts_by_ids`, as if it was deleted between the two reads.
    pub async fn hide_fact(&self, fact_id: i64) {
        self.state.lock().await.hidden_facts.insert(fact_id);
    }

    /// Make every operation fail with a storage error.
    pub async fn fail_all(&self) {
        self.state.lock().await.fail_all = true;
    }

    /// Seed a session with a conversation holding `messages`. Returns the
    /// conversation id.
    pub async fn seed_history(&self, session_external_id: &str, messages: &[(&str, &str)]) -> i64 {
        let mut state = self.state.lock().await;
        let session_id = match state.sessions.get(session_external_id) {
            Some(id) => *id,
            None => {
                let id = state.next_id();
                state.sessions.insert(session_external_id.to_string(), id);
                id
            }
        };
        let conversation_id = state.next_id();
        state.conversations.push(ConversationRecord {
            id: conversation_id,
            session_id,
            date_created: "2026-01-01 00:00:00".to_string(),
        });
        for (role, text) in messages {
            state.messages.push(RecordedMessage {
                conversation_id,
                role: role.to_string(),
                kind: None,
                text: text.to_string(),
            });
        }
        conversation_id
    }

    /// Seed a fact for an entity (created if needed). Returns the fact id.
    pub async fn seed_fact(
        &self,
        entity_external_id: &str,
        content: &str,
        embedding: Vec<f32>,
        date_created: Option<&str>,
    ) -> i64 {
        let mut state = self.state.lock().await;
        let entity_id = match state.entities.get(entity_external_id) {
            Some(id) => *id,
            None => {
                let id = state.next_id();
                state.entities.insert(entity_external_id.to_string(), id);
                id
            }
        };
        let fact_id = state.next_id();
        state.facts.push((
            fact_id,
            entity_id,
            content.to_string(),
            embedding,
            date_created.map(str::to_string),
        ));
        fact_id
    }

    /// Messages written through the driver or seeded, in order.
    pub async fn messages(&self) -> Vec<RecordedMessage> {
        self.state.lock().await.messages.clone()
    }

    /// Contents of all stored facts, in insertion order.
    pub async fn fact_contents(&self) -> Vec<String> {
        self.state
            .lock()
            .await
            .facts
            .iter()
            .map(|f| f.2.clone())
            .collect()
    }

    /// Names of driver methods invoked so far, in order.
    pub async fn calls(&self) -> Vec<String> {
        self.state.lock().await.calls.clone()
    }

    /// How many times `name` was invoked.
    pub async fn call_count(&self, name: &str) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|c| *c == name)
            .count()
    }

    async fn upsert(
        &self,
        call: &'static str,
        kind: &'static str,
        external_id: &str,
    ) -> Result<Option<i64>, MnemoError> {
        let mut state = self.state.lock().await;
        state.enter(call)?;
        if state.null_creates.contains(kind) {
            return Ok(None);
        }
        let existing = match kind {
            "entity" => state.entities.get(external_id).copied(),
            "process" => state.processes.get(external_id).copied(),
            _ => state.sessions.get(external_id).copied(),
        };
        if let Some(id) = existing {
            return Ok(Some(id));
        }
        let id = state.next_id();
        let map = match kind {
            "entity" => &mut state.entities,
            "process" => &mut state.processes,
            _ => &mut state.sessions,
        };
        map.insert(external_id.to_string(), id);
        Ok(Some(id))
    }
}

#[async_trait]
impl PluginAdapter for MockStorage {
    fn name(&self) -> &str {
        "mock-storage"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl StorageDriver for MockStorage {
    fn dialect(&self) -> &str {
        "mock"
    }

    async fn create_entity(&self, external_id: &str) -> Result<Option<i64>, MnemoError> {
        self.upsert("create_entity", "entity", external_id).await
    }

    async fn create_process(&self, external_id: &str) -> Result<Option<i64>, MnemoError> {
        self.upsert("create_process", "process", external_id).await
    }

    async fn create_session(
        &self,
        external_id: &str,
        _entity_id: Option<i64>,
        _process_id: Option<i64>,
    ) -> Result<Option<i64>, MnemoError> {
        self.upsert("create_session", "session", external_id).await
    }

    async fn read_session(&self, external_id: &str) -> Result<Option<i64>, MnemoError> {
        let mut state = self.state.lock().await;
        state.enter("read_session")?;
        Ok(state.sessions.get(external_id).copied())
    }

    async fn create_conversation(
        &self,
        session_id: i64,
        _timeout_minutes: u32,
    ) -> Result<Option<i64>, MnemoError> {
        let mut state = self.state.lock().await;
        state.enter("create_conversation")?;
        if state.null_creates.contains("conversation") {
            return Ok(None);
        }
        if let Some(existing) = state
            .conversations
            .iter()
            .rev()
            .find(|c| c.session_id == session_id)
        {
            return Ok(Some(existing.id));
        }
        let id = state.next_id();
        state.conversations.push(ConversationRecord {
            id,
            session_id,
            date_created: "2026-01-01 00:00:00".to_string(),
        });
        Ok(Some(id))
    }

    async fn read_conversation(
        &self,
        conversation_id: i64,
    ) -> Result<Option<ConversationRecord>, MnemoError> {
        let mut state = self.state.lock().await;
        state.enter("read_conversation")?;
        Ok(state
            .conversations
            .iter()
            .find(|c| c.id == conversation_id)
            .cloned())
    }

    async fn read_conversation_id_by_session_id(
        &self,
        session_id: i64,
    ) -> Result<Option<i64>, MnemoError> {
        let mut state = self.state.lock().await;
        state.enter("read_conversation_id_by_session_id")?;
        Ok(state
            .conversations
            .iter()
            .rev()
            .find(|c| c.session_id == session_id)
            .map(|c| c.id))
    }

    async fn create_message(
        &self,
        conversation_id: i64,
        role: &str,
        kind: Option<&str>,
        text: &str,
    ) -> Result<(), MnemoError> {
        let mut state = self.state.lock().await;
        state.enter("create_message")?;
        state.messages.push(RecordedMessage {
            conversation_id,
            role: role.to_string(),
            kind: kind.map(str::to_string),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn read_messages(&self, conversation_id: i64) -> Result<Vec<StoredMessage>, MnemoError> {
        let mut state = self.state.lock().await;
        state.enter("read_messages")?;
        Ok(state
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .map(|m| StoredMessage::new(m.role.clone(), m.text.clone()))
            .collect())
    }

    async fn create_fact(
        &self,
        entity_id: i64,
        content: &str,
        embedding: &[f32],
    ) -> Result<Option<i64>, MnemoError> {
        let mut state = self.state.lock().await;
        state.enter("create_fact")?;
        if state.null_creates.contains("fact") {
            return Ok(None);
        }
        let id = state.next_id();
        state
            .facts
            .push((id, entity_id, content.to_string(), embedding.to_vec(), None));
        Ok(Some(id))
    }

    async fn read_fact_embeddings(
        &self,
        entity_id: i64,
        limit: usize,
    ) -> Result<Vec<StoredEmbedding>, MnemoError> {
        let mut state = self.state.lock().await;
        state.enter("read_fact_embeddings")?;
        Ok(state
            .facts
            .iter()
            .filter(|f| f.1 == entity_id)
            .take(limit)
            .map(|f| StoredEmbedding {
                fact_id: f.0,
                embedding: f.3.clone(),
            })
            .collect())
    }

    async fn read_facts_by_ids(&self, ids: &[i64]) -> Result<Vec<(i64, Fact)>, MnemoError> {
        let mut state = self.state.lock().await;
        state.enter("read_facts_by_ids")?;
        Ok(ids
            .iter()
            .filter(|id| !state.hidden_facts.contains(id))
            .filter_map(|id| state.facts.iter().find(|f| f.0 == *id))
            .map(|f| {
                let fact = Fact {
                    content: f.2.clone(),
                    similarity: None,
                    rank_score: None,
                    date_created: f.4.clone(),
                };
                (f.0, fact)
            })
            .collect())
    }

    async fn flush(&self) -> Result<(), MnemoError> {
        self.state.lock().await.enter("flush")
    }

    async fn commit(&self) -> Result<(), MnemoError> {
        self.state.lock().await.enter("commit")
    }
}
