// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fact persistence with embeddings stored as little-endian f32 BLOBs.

use std::collections::HashMap;

use mnemo_core::MnemoError;
use mnemo_core::types::{Fact, StoredEmbedding};
use rusqlite::params;

use crate::database::{Database, map_tr_err};

/// Convert an f32 vector to a little-endian BLOB.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert a BLOB back to an f32 vector. Trailing partial chunks are dropped.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Insert a fact for an entity.
pub async fn create_fact(
    db: &Database,
    entity_id: i64,
    content: &str,
    embedding: &[f32],
) -> Result<Option<i64>, MnemoError> {
    let content = content.to_string();
    let blob = vec_to_blob(embedding);
    db.connection()
        .call(move |conn| -> Result<Option<i64>, rusqlite::Error> {
            conn.execute(
                "INSERT INTO facts (entity_id, content, embedding) VALUES (?1, ?2, ?3)",
                params![entity_id, content, blob],
            )?;
            Ok(Some(conn.last_insert_rowid()))
        })
        .await
        .map_err(map_tr_err)
}

/// Up to `limit` embeddings of an entity's facts, oldest first.
pub async fn read_fact_embeddings(
    db: &Database,
    entity_id: i64,
    limit: usize,
) -> Result<Vec<StoredEmbedding>, MnemoError> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| -> Result<Vec<StoredEmbedding>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, embedding FROM facts WHERE entity_id = ?1 ORDER BY id ASC LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![entity_id, limit], |row| {
                let blob: Vec<u8> = row.get(1)?;
                Ok(StoredEmbedding {
                    fact_id: row.get(0)?,
                    embedding: blob_to_vec(&blob),
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Facts for `ids`, returned in the order of `ids`. Unknown ids are skipped.
pub async fn read_facts_by_ids(
    db: &Database,
    ids: &[i64],
) -> Result<Vec<(i64, Fact)>, MnemoError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let ids = ids.to_vec();
    db.connection()
        .call(move |conn| -> Result<Vec<(i64, Fact)>, rusqlite::Error> {
            let placeholders = vec!["?"; ids.len()].join(", ");
            let mut stmt = conn.prepare(&format!(
                "SELECT id, content, date_created FROM facts WHERE id IN ({placeholders})"
            ))?;
            let mut by_id: HashMap<i64, Fact> = stmt
                .query_map(rusqlite::params_from_iter(ids.iter()), |row| {
                    let id: i64 = row.get(0)?;
                    let content: String = row.get(1)?;
                    let date_created: String = row.get(2)?;
                    Ok((id, Fact::new(content).with_date_created(date_created)))
                })?
                .collect::<Result<_, _>>()?;
            Ok(ids
                .iter()
                .filter_map(|id| by_id.remove(id).map(|fact| (*id, fact)))
                .collect())
        })
        .await
        .map_err(map_tr_err)
}
