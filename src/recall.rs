//! Recall pipeline: search stored facts and synthesize an answer.
//!
//! Search failures propagate to the caller; synthesis failures degrade to
//! the raw formatted facts so recall always produces something useful when
//! facts exist.

use chrono::DateTime;
use serde::Serialize;

use crate::config::RecallConfig;
use crate::db::Db;
use crate::error::StorageError;
use crate::model::ModelClient;
use crate::store::types::Fact;
use crate::store::{search, write};

/// System prompt for answer synthesis.
pub const SYNTHESIS_PROMPT: &str = "\
You are a memory recall assistant. You have been given a query and a set of stored memories about the user(s). Your job is to synthesize a clear, relevant response from these memories.

Rules:
- Only include information that is directly relevant to the query
- If memories contain contradictory information, prefer the most recent one
- If no memories are relevant, say so clearly
- Be concise and factual - this response will be used by another AI as context
- Do NOT make up information that isn't in the provided memories
- Include the user_id when referencing specific users' information

Output a clear, concise summary of what you found. No JSON needed - just natural text.";

/// The synthesized answer plus retrieval metadata.
#[derive(Debug, Serialize)]
pub struct RecallResponse {
    pub response: String,
    /// Candidates found before top-K truncation.
    pub memories_searched: usize,
    /// Facts actually sent to synthesis.
    pub memories_used: usize,
}

/// Search, select top-K, and synthesize an answer for `query`.
pub async fn recall(
    db: &Db,
    model: &ModelClient,
    config: &RecallConfig,
    query: &str,
    user_id: Option<String>,
) -> Result<RecallResponse, StorageError> {
    let query_owned = query.to_string();
    let uid = user_id.clone();
    let limit = config.max_results;
    let mut results = db
        .call(move |conn| search::search_facts(conn, &query_owned, uid.as_deref(), limit))
        .await?;

    if results.is_empty() {
        // Recency fallback: recall should always have candidates when any
        // facts exist for this user (or globally).
        let uid = user_id.clone();
        let top_k = config.top_k;
        results = db
            .call(move |conn| search::recent_facts(conn, uid.as_deref(), top_k))
            .await?;
    }

    if results.is_empty() {
        return Ok(RecallResponse {
            response: "No memories found for this query.".to_string(),
            memories_searched: 0,
            memories_used: 0,
        });
    }

    let memories_searched = results.len();
    results.truncate(config.top_k);

    let ids: Vec<i64> = results.iter().map(|f| f.id).collect();
    if let Err(e) = db.call(move |conn| write::touch_access(conn, &ids)).await {
        tracing::warn!(error = %e, "failed to update last-access timestamps");
    }

    let formatted = format_facts(&results);
    let user_prompt = format!(
        "Query: {query}\n\nStored memories:\n{formatted}\n\n\
         Based on these memories, provide a relevant response to the query."
    );

    let response = match model
        .complete(SYNTHESIS_PROMPT, &user_prompt, config.max_synthesis_tokens, 0.3)
        .await
    {
        Ok(text) => text,
        Err(e) => {
            // Degraded mode: hand back the candidates instead of failing.
            tracing::warn!(error = %e, "synthesis failed, returning raw facts");
            formatted
        }
    };

    Ok(RecallResponse {
        response,
        memories_searched,
        memories_used: results.len(),
    })
}

/// One line per fact: index, date, user, topic, importance, text.
pub fn format_facts(facts: &[Fact]) -> String {
    facts
        .iter()
        .enumerate()
        .map(|(i, fact)| {
            let date = DateTime::parse_from_rfc3339(&fact.created_at)
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|_| "unknown".to_string());
            format!(
                "{}. [{date}] (user: {}, topic: {}, importance: {}) {}",
                i + 1,
                fact.user_id.as_deref().unwrap_or("unknown"),
                fact.topic,
                fact.importance,
                fact.fact,
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fact(id: i64, user: Option<&str>, topic: &str, text: &str) -> Fact {
        Fact {
            id,
            user_id: user.map(String::from),
            topic: topic.into(),
            fact: text.into(),
            source_session: None,
            source_channel: None,
            importance: 5,
            created_at: "2026-08-23T10:00:00+00:00".into(),
            last_accessed: None,
        }
    }

    #[test]
    fn format_renders_one_line_per_fact() {
        let facts = vec![
            fact(1, Some("u1"), "preferences", "Prefers Rust"),
            fact(2, None, "personal", "Has two cats"),
        ];
        let text = format_facts(&facts);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "1. [2026-08-23] (user: u1, topic: preferences, importance: 5) Prefers Rust"
        );
        assert!(lines[1].contains("(user: unknown, topic: personal"));
    }

    #[test]
    fn format_tolerates_bad_timestamp() {
        let mut f = fact(1, None, "t", "text");
        f.created_at = "not a date".into();
        assert!(format_facts(&[f]).contains("[unknown]"));
    }
}
