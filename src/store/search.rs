//! Read path — full-text search and recency queries.

use rusqlite::{params, Connection, Row};

use crate::error::StorageError;
use crate::store::types::Fact;

const FACT_COLUMNS: &str = "f.id, f.user_id, f.topic, f.fact, f.source_session, \
     f.source_channel, f.importance, f.created_at, f.last_accessed";

/// Search facts via FTS5, ranked by the engine's relevance score.
///
/// The query is tokenized into alphanumeric terms which are OR-combined:
/// any term may match (broad recall over precision). Returns an empty list
/// when nothing matches — that is not an error.
pub fn search_facts(
    conn: &Connection,
    query: &str,
    user_id: Option<&str>,
    limit: usize,
) -> Result<Vec<Fact>, StorageError> {
    let fts_query = build_fts_query(query);
    if fts_query.is_empty() {
        return Ok(Vec::new());
    }

    let results = if let Some(user) = user_id {
        let sql = format!(
            "SELECT {FACT_COLUMNS} FROM facts_fts fts \
             JOIN facts f ON f.id = fts.rowid \
             WHERE facts_fts MATCH ?1 AND f.user_id = ?2 \
             ORDER BY rank LIMIT ?3"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![fts_query, user, limit as i64], fact_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows
    } else {
        let sql = format!(
            "SELECT {FACT_COLUMNS} FROM facts_fts fts \
             JOIN facts f ON f.id = fts.rowid \
             WHERE facts_fts MATCH ?1 \
             ORDER BY rank LIMIT ?2"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![fts_query, limit as i64], fact_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows
    };

    Ok(results)
}

/// Most recent facts first, optionally filtered by user.
pub fn recent_facts(
    conn: &Connection,
    user_id: Option<&str>,
    limit: usize,
) -> Result<Vec<Fact>, StorageError> {
    let results = if let Some(user) = user_id {
        let sql = format!(
            "SELECT {FACT_COLUMNS} FROM facts f WHERE f.user_id = ?1 \
             ORDER BY f.created_at DESC, f.id DESC LIMIT ?2"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![user, limit as i64], fact_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows
    } else {
        let sql = format!(
            "SELECT {FACT_COLUMNS} FROM facts f \
             ORDER BY f.created_at DESC, f.id DESC LIMIT ?1"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![limit as i64], fact_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows
    };

    Ok(results)
}

fn fact_from_row(row: &Row<'_>) -> rusqlite::Result<Fact> {
    Ok(Fact {
        id: row.get(0)?,
        user_id: row.get(1)?,
        topic: row.get(2)?,
        fact: row.get(3)?,
        source_session: row.get(4)?,
        source_channel: row.get(5)?,
        importance: row.get(6)?,
        created_at: row.get(7)?,
        last_accessed: row.get(8)?,
    })
}

/// Build an FTS5 MATCH expression from free-form query text.
///
/// Terms are the alphanumeric runs of the input, each double-quoted (the
/// terms cannot contain quotes, so this is injection-safe) and joined with
/// OR.
fn build_fts_query(query: &str) -> String {
    query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|term| !term.is_empty())
        .map(|term| format!("\"{term}\""))
        .collect::<Vec<_>>()
        .join(" OR ")
}
