#![allow(dead_code)]

use mnemo::config::ModelConfig;
use mnemo::db::{self, Db};
use mnemo::model::ModelClient;
use mnemo::store::types::NewFact;
use mnemo::store::write::insert_fact;
use rusqlite::Connection;
use serde_json::{json, Value};
use wiremock::MockServer;

/// Open a fresh in-memory database with the schema applied.
pub fn test_conn() -> Connection {
    db::open_memory_database().unwrap()
}

/// Same, wrapped in the shared async handle the pipelines use.
pub fn test_db() -> Db {
    Db::new(test_conn())
}

/// Insert a fact directly via the store module. Returns the fact id.
pub fn insert(conn: &mut Connection, user: Option<&str>, topic: &str, text: &str) -> i64 {
    insert_fact(
        conn,
        &NewFact {
            user_id: user.map(String::from),
            topic: topic.into(),
            fact: text.into(),
            ..Default::default()
        },
    )
    .unwrap()
}

/// A model client pointed at a wiremock server standing in for the
/// inference endpoint.
pub fn mock_model(server: &MockServer) -> ModelClient {
    ModelClient::new(&ModelConfig {
        base_url: format!("{}/v1", server.uri()),
        request_timeout_secs: 5,
        ..Default::default()
    })
    .unwrap()
}

/// An OpenAI-style chat completion body with the given message content.
pub fn chat_body(content: &str) -> Value {
    json!({
        "choices": [
            {"message": {"role": "assistant", "content": content}}
        ]
    })
}

pub async fn count_facts(db: &Db) -> i64 {
    db.call(|conn| {
        Ok(conn.query_row("SELECT COUNT(*) FROM facts", [], |row| row.get(0))?)
    })
    .await
    .unwrap()
}

pub async fn count_summaries(db: &Db) -> i64 {
    db.call(|conn| {
        Ok(conn.query_row("SELECT COUNT(*) FROM summaries", [], |row| row.get(0))?)
    })
    .await
    .unwrap()
}
