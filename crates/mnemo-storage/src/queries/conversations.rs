// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation and message operations.

use mnemo_core::MnemoError;
use mnemo_core::types::{ConversationRecord, StoredMessage};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

/// Return the session's latest conversation if it saw activity within
/// `timeout_minutes`, otherwise start a new one.
pub async fn create_conversation(
    db: &Database,
    session_id: i64,
    timeout_minutes: u32,
) -> Result<Option<i64>, MnemoError> {
    let window = format!("-{timeout_minutes} minutes");
    db.connection()
        .call(move |conn| -> Result<Option<i64>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let open: Option<i64> = tx
                .query_row(
                    "SELECT id FROM conversations
                     WHERE session_id = ?1 AND date_updated >= datetime('now', ?2)
                     ORDER BY id DESC LIMIT 1",
                    params![session_id, window],
                    |row| row.get(0),
                )
                .optional()?;

            let id = match open {
                Some(id) => Some(id),
                None => {
                    tx.execute(
                        "INSERT INTO conversations (session_id) VALUES (?1)",
                        params![session_id],
                    )?;
                    Some(tx.last_insert_rowid())
                }
            };
            tx.commit()?;
            Ok(id)
        })
        .await
        .map_err(map_tr_err)
}

/// Get a conversation by id.
pub async fn read_conversation(
    db: &Database,
    conversation_id: i64,
) -> Result<Option<ConversationRecord>, MnemoError> {
    db.connection()
        .call(move |conn| -> Result<Option<ConversationRecord>, rusqlite::Error> {
            conn.query_row(
                "SELECT id, session_id, date_created FROM conversations WHERE id = ?1",
                params![conversation_id],
                |row| {
                    Ok(ConversationRecord {
                        id: row.get(0)?,
                        session_id: row.get(1)?,
                        date_created: row.get(2)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Latest conversation id of a session.
pub async fn read_conversation_id_by_session_id(
    db: &Database,
    session_id: i64,
) -> Result<Option<i64>, MnemoError> {
    db.connection()
        .call(move |conn| -> Result<Option<i64>, rusqlite::Error> {
            conn.query_row(
                "SELECT id FROM conversations WHERE session_id = ?1 ORDER BY id DESC LIMIT 1",
                params![session_id],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Append a message and bump the conversation's activity timestamp.
pub async fn create_message(
    db: &Database,
    conversation_id: i64,
    role: &str,
    kind: Option<&str>,
    text: &str,
) -> Result<(), MnemoError> {
    let role = role.to_string();
    let kind = kind.map(str::to_string);
    let text = text.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO conversation_messages (conversation_id, role, type, content)
                 VALUES (?1, ?2, ?3, ?4)",
                params![conversation_id, role, kind, text],
            )?;
            tx.execute(
                "UPDATE conversations SET date_updated = datetime('now') WHERE id = ?1",
                params![conversation_id],
            )?;
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

/// Messages of a conversation in insertion order.
pub async fn read_messages(
    db: &Database,
    conversation_id: i64,
) -> Result<Vec<StoredMessage>, MnemoError> {
    db.connection()
        .call(move |conn| -> Result<Vec<StoredMessage>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT role, content FROM conversation_messages
                 WHERE conversation_id = ?1 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(params![conversation_id], |row| {
                Ok(StoredMessage {
                    role: row.get(0)?,
                    content: row.get(1)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
