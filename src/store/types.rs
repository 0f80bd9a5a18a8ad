//! Record types for the storage layer.

use serde::{Deserialize, Serialize};

/// A stored fact — one atomic, attributable piece of knowledge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fact {
    /// Monotonically increasing surrogate key, assigned at write time.
    pub id: i64,
    /// Owning user, when the model or caller could attribute one.
    pub user_id: Option<String>,
    /// Short category label, e.g. `"preferences"` or `"projects"`.
    pub topic: String,
    /// The fact itself as a self-contained sentence.
    pub fact: String,
    pub source_session: Option<String>,
    pub source_channel: Option<String>,
    /// 1–10, clamped at write time.
    pub importance: u8,
    /// RFC 3339 timestamp, set at write time.
    pub created_at: String,
    /// RFC 3339 timestamp of the last search that returned this fact.
    /// Never updated by writes.
    pub last_accessed: Option<String>,
}

/// Input for a fact insert. Id and creation timestamp are assigned by the
/// storage layer.
#[derive(Debug, Clone, Default)]
pub struct NewFact {
    pub user_id: Option<String>,
    pub topic: String,
    pub fact: String,
    pub source_session: Option<String>,
    pub source_channel: Option<String>,
    /// Clamped into [1, 10] at write time; missing means 5.
    pub importance: Option<i64>,
}

/// Input for a session summary insert.
#[derive(Debug, Clone)]
pub struct NewSummary {
    pub session_id: String,
    pub channel: Option<String>,
    pub user_id: Option<String>,
    pub summary: String,
    pub message_count: usize,
}
