//! Conversation ingestion pipeline: debounce, chunk, extract, store.
//!
//! Each grouping key (session id, or `"default"` when absent) moves through
//! an explicit window lifecycle: IDLE → PENDING (accumulating) → FLUSHING →
//! IDLE. Rapid repeated submissions for the same key merge into one window
//! whose deadline resets on every arrival; once the deadline elapses
//! untouched, the accumulated messages flush as a single extraction batch.

pub mod chunk;
pub mod extract;

use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};

use crate::config::IngestionConfig;
use crate::db::Db;
use crate::model::ModelClient;
use crate::store::types::{NewFact, NewSummary};
use crate::store::write;

/// One transcript message as submitted by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A batch of messages submitted for ingestion.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub messages: Vec<Message>,
    pub session_id: Option<String>,
    pub channel: Option<String>,
    pub user_id: Option<String>,
}

/// Outcome reported to the caller immediately; extraction itself is
/// fire-and-forget.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum IngestStatus {
    Debounced { debounce_seconds: u64 },
    Accepted,
}

/// A pending debounce window for one grouping key.
struct Window {
    messages: Vec<Message>,
    session_id: Option<String>,
    channel: Option<String>,
    user_id: Option<String>,
    /// Bumped on every merge. A timer only flushes when its epoch is still
    /// live, so a reset logically cancels the previous deadline even if
    /// the abort below loses the race.
    epoch: u64,
    timer: JoinHandle<()>,
}

/// The ingestion pipeline. Holds the in-memory debounce table and the
/// global extraction-concurrency limit.
pub struct Ingestor {
    db: Db,
    model: ModelClient,
    chunk_tokens: usize,
    overlap_tokens: usize,
    debounce: Duration,
    max_extraction_tokens: u32,
    windows: Mutex<HashMap<String, Window>>,
    permits: Arc<Semaphore>,
}

impl Ingestor {
    pub fn new(db: Db, model: ModelClient, config: &IngestionConfig) -> Self {
        Self {
            db,
            model,
            chunk_tokens: config.chunk_tokens,
            overlap_tokens: config.chunk_overlap_tokens,
            debounce: Duration::from_secs(config.debounce_seconds),
            max_extraction_tokens: config.max_extraction_tokens,
            windows: Mutex::new(HashMap::new()),
            permits: Arc::new(Semaphore::new(config.max_concurrent_extractions.max(1))),
        }
    }

    /// Debounce duration override for tests and non-default deployments.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Accept a batch for ingestion and return immediately.
    ///
    /// With debouncing off, the batch flushes in the background as-is.
    /// Otherwise it merges into the pending window for its grouping key,
    /// resetting the window's deadline.
    pub fn accept(self: &Arc<Self>, request: IngestRequest, debounce: bool) -> IngestStatus {
        if !debounce || self.debounce.is_zero() {
            let this = Arc::clone(self);
            tokio::spawn(async move {
                this.flush(
                    request.messages,
                    request.session_id,
                    request.channel,
                    request.user_id,
                )
                .await;
            });
            return IngestStatus::Accepted;
        }

        let key = request
            .session_id
            .clone()
            .unwrap_or_else(|| "default".to_string());

        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match windows.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                let window = entry.get_mut();
                window.messages.extend(request.messages);
                if window.user_id.is_none() {
                    window.user_id = request.user_id;
                }
                if window.channel.is_none() {
                    window.channel = request.channel;
                }
                window.epoch += 1;
                window.timer.abort();
                window.timer = self.spawn_timer(key, window.epoch);
            }
            Entry::Vacant(entry) => {
                let timer = self.spawn_timer(key, 0);
                entry.insert(Window {
                    messages: request.messages,
                    session_id: request.session_id,
                    channel: request.channel,
                    user_id: request.user_id,
                    epoch: 0,
                    timer,
                });
            }
        }

        IngestStatus::Debounced {
            debounce_seconds: self.debounce.as_secs(),
        }
    }

    /// Schedule the flush for a window epoch.
    fn spawn_timer(self: &Arc<Self>, key: String, epoch: u64) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(this.debounce).await;
            let Some(window) = this.take_window(&key, epoch) else {
                return;
            };
            this.flush(
                window.messages,
                window.session_id,
                window.channel,
                window.user_id,
            )
            .await;
        })
    }

    /// Remove the window only if no newer submission has reset it since
    /// this timer was scheduled.
    fn take_window(&self, key: &str, epoch: u64) -> Option<Window> {
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match windows.get(key) {
            Some(window) if window.epoch == epoch => windows.remove(key),
            _ => None,
        }
    }

    /// Process one accumulated batch: chunk, extract concurrently, store.
    ///
    /// Per-chunk failures (model unreachable, unparseable output, a fact
    /// that fails to write) never abort the batch.
    async fn flush(
        self: Arc<Self>,
        messages: Vec<Message>,
        session_id: Option<String>,
        channel: Option<String>,
        user_id: Option<String>,
    ) {
        // Only messages with content carry signal for extraction.
        let relevant: Vec<Message> = messages
            .into_iter()
            .filter(|m| !m.content.trim().is_empty())
            .collect();
        if relevant.is_empty() {
            return;
        }

        let message_count = relevant.len();
        let chunks = chunk::chunk_messages(&relevant, self.chunk_tokens, self.overlap_tokens);
        let chunk_count = chunks.len();
        tracing::info!(
            session = session_id.as_deref().unwrap_or("-"),
            messages = message_count,
            chunks = chunk_count,
            "flushing ingest batch"
        );

        let mut tasks = JoinSet::new();
        for chunk in chunks {
            let this = Arc::clone(&self);
            let session_id = session_id.clone();
            let channel = channel.clone();
            let user_id = user_id.clone();
            tasks.spawn(async move {
                this.extract_chunk(chunk, session_id, channel, user_id).await
            });
        }

        let mut stored = 0usize;
        let mut topics: Vec<String> = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((count, mut chunk_topics)) => {
                    stored += count;
                    topics.append(&mut chunk_topics);
                }
                Err(e) => tracing::warn!(error = %e, "chunk task failed"),
            }
        }

        tracing::info!(
            session = session_id.as_deref().unwrap_or("-"),
            chunks = chunk_count,
            facts = stored,
            "ingest batch complete"
        );

        // One coarse summary row per completed flush with a session.
        if let Some(session) = session_id {
            topics.sort();
            topics.dedup();
            let summary = if stored == 0 {
                format!("No facts extracted from {message_count} messages")
            } else {
                format!(
                    "{stored} fact(s) extracted from {message_count} messages (topics: {})",
                    topics.join(", ")
                )
            };
            let new = NewSummary {
                session_id: session,
                channel,
                user_id,
                summary,
                message_count,
            };
            if let Err(e) = self
                .db
                .call(move |conn| write::insert_summary(conn, &new))
                .await
            {
                tracing::warn!(error = %e, "failed to store session summary");
            }
        }
    }

    /// Extract and store facts for one chunk, bounded by the global
    /// extraction semaphore. Returns (facts stored, their topics).
    async fn extract_chunk(
        &self,
        chunk: Vec<Message>,
        session_id: Option<String>,
        channel: Option<String>,
        user_id: Option<String>,
    ) -> (usize, Vec<String>) {
        let Ok(_permit) = self.permits.acquire().await else {
            return (0, Vec::new());
        };

        let text = extract::format_chunk(&chunk);
        let raw = match self
            .model
            .complete(extract::EXTRACTION_PROMPT, &text, self.max_extraction_tokens, 0.1)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "chunk extraction failed, skipping");
                return (0, Vec::new());
            }
        };

        let mut stored = 0usize;
        let mut topics = Vec::new();
        for extracted in extract::parse_facts(&raw) {
            let Some(fact_text) = extracted.fact.filter(|f| !f.trim().is_empty()) else {
                continue;
            };
            let topic = extracted.topic.unwrap_or_else(|| "general".to_string());
            let new = NewFact {
                // An explicit user id on the request wins over whatever the
                // model inferred.
                user_id: user_id.clone().or(extracted.user_id),
                topic: topic.clone(),
                fact: fact_text,
                source_session: session_id.clone(),
                source_channel: channel.clone(),
                importance: extracted.importance,
            };
            match self.db.call(move |conn| write::insert_fact(conn, &new)).await {
                Ok(_) => {
                    stored += 1;
                    topics.push(topic);
                }
                Err(e) => tracing::warn!(error = %e, "failed to store extracted fact"),
            }
        }

        (stored, topics)
    }
}
