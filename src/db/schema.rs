//! SQL DDL for all mnemo tables.
//!
//! Defines the `facts` and `summaries` tables plus the `facts_fts` FTS5
//! index. All DDL uses `IF NOT EXISTS` for idempotent initialization.

use rusqlite::Connection;

const SCHEMA_SQL: &str = r#"
-- Core fact storage
CREATE TABLE IF NOT EXISTS facts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT,
    topic TEXT NOT NULL,
    fact TEXT NOT NULL,
    source_session TEXT,
    source_channel TEXT,
    importance INTEGER NOT NULL DEFAULT 5 CHECK(importance BETWEEN 1 AND 10),
    created_at TEXT NOT NULL,
    last_accessed TEXT
);

CREATE INDEX IF NOT EXISTS idx_facts_user ON facts(user_id);
CREATE INDEX IF NOT EXISTS idx_facts_topic ON facts(topic);
CREATE INDEX IF NOT EXISTS idx_facts_importance ON facts(importance DESC);
CREATE INDEX IF NOT EXISTS idx_facts_created ON facts(created_at DESC);

-- One row per completed ingestion flush
CREATE TABLE IF NOT EXISTS summaries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL,
    channel TEXT,
    user_id TEXT,
    summary TEXT NOT NULL,
    message_count INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_summaries_session ON summaries(session_id);
CREATE INDEX IF NOT EXISTS idx_summaries_user ON summaries(user_id);

-- Full-text search over the attributable fields. The storage layer owns
-- this table; index rows are written in the same transaction as the fact
-- row they mirror.
CREATE VIRTUAL TABLE IF NOT EXISTS facts_fts USING fts5(
    user_id,
    topic,
    fact,
    content='facts',
    content_rowid='id',
    tokenize='porter unicode61'
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn schema_creates_all_tables() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"facts".to_string()));
        assert!(tables.contains(&"summaries".to_string()));
        assert!(tables.contains(&"facts_fts".to_string()));
    }

    #[test]
    fn schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap(); // second call should not error
    }

    #[test]
    fn importance_check_rejects_out_of_range() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO facts (topic, fact, importance, created_at) VALUES ('t', 'f', 99, 'now')",
            [],
        );
        assert!(result.is_err());
    }
}
