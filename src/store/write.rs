//! Write path — fact inserts, summary inserts, and access tracking.

use rusqlite::{params, Connection};

use crate::error::StorageError;
use crate::store::types::{NewFact, NewSummary};

/// Insert a fact and its FTS index row in one transaction.
///
/// Importance is clamped into [1, 10] (missing means 5), never rejected.
/// Returns the assigned rowid.
pub fn insert_fact(conn: &mut Connection, new: &NewFact) -> Result<i64, StorageError> {
    let tx = conn.transaction()?;
    let now = chrono::Utc::now().to_rfc3339();
    let importance = new.importance.unwrap_or(5).clamp(1, 10);

    tx.execute(
        "INSERT INTO facts (user_id, topic, fact, source_session, source_channel, importance, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            new.user_id,
            new.topic,
            new.fact,
            new.source_session,
            new.source_channel,
            importance,
            now,
        ],
    )?;
    let id = tx.last_insert_rowid();

    // The index must never lag a committed fact row, so the sync happens
    // inside the same transaction.
    tx.execute(
        "INSERT INTO facts_fts (rowid, user_id, topic, fact) VALUES (?1, ?2, ?3, ?4)",
        params![id, new.user_id, new.topic, new.fact],
    )?;

    tx.commit()?;
    Ok(id)
}

/// Insert a session summary row. Returns the assigned rowid.
pub fn insert_summary(conn: &Connection, new: &NewSummary) -> Result<i64, StorageError> {
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO summaries (session_id, channel, user_id, summary, message_count, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            new.session_id,
            new.channel,
            new.user_id,
            new.summary,
            new.message_count as i64,
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Set `last_accessed` for facts returned by a search.
///
/// Callers treat failure as non-fatal: a failed touch must never abort the
/// surrounding read.
pub fn touch_access(conn: &Connection, ids: &[i64]) -> Result<(), StorageError> {
    if ids.is_empty() {
        return Ok(());
    }
    let now = chrono::Utc::now().to_rfc3339();
    let mut stmt = conn.prepare("UPDATE facts SET last_accessed = ?1 WHERE id = ?2")?;
    for id in ids {
        stmt.execute(params![now, id])?;
    }
    Ok(())
}
