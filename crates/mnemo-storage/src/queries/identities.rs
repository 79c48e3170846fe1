// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Entity, process and session resolution.
//!
//! Creates are `INSERT OR IGNORE` followed by a lookup on the external id, so
//! resolving the same identifier twice yields the same row.

use mnemo_core::MnemoError;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

/// Resolve or create an entity by external id.
pub async fn create_entity(db: &Database, external_id: &str) -> Result<Option<i64>, MnemoError> {
    upsert_external_id(db, "entities", external_id).await
}

/// Resolve or create a process by external id.
pub async fn create_process(db: &Database, external_id: &str) -> Result<Option<i64>, MnemoError> {
    upsert_external_id(db, "processes", external_id).await
}

async fn upsert_external_id(
    db: &Database,
    table: &'static str,
    external_id: &str,
) -> Result<Option<i64>, MnemoError> {
    let external_id = external_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<i64>, rusqlite::Error> {
            conn.execute(
                &format!("INSERT OR IGNORE INTO {table} (external_id) VALUES (?1)"),
                params![external_id],
            )?;
            conn.query_row(
                &format!("SELECT id FROM {table} WHERE external_id = ?1"),
                params![external_id],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Resolve or create a session by external id.
///
/// Entity and process links are set on first creation only.
pub async fn create_session(
    db: &Database,
    external_id: &str,
    entity_id: Option<i64>,
    process_id: Option<i64>,
) -> Result<Option<i64>, MnemoError> {
    let external_id = external_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<i64>, rusqlite::Error> {
            conn.execute(
                "INSERT OR IGNORE INTO sessions (external_id, entity_id, process_id)
                 VALUES (?1, ?2, ?3)",
                params![external_id, entity_id, process_id],
            )?;
            conn.query_row(
                "SELECT id FROM sessions WHERE external_id = ?1",
                params![external_id],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Look up a session id by external id.
pub async fn read_session(db: &Database, external_id: &str) -> Result<Option<i64>, MnemoError> {
    let external_id = external_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<i64>, rusqlite::Error> {
            conn.query_row(
                "SELECT id FROM sessions WHERE external_id = ?1",
                params![external_id],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}
