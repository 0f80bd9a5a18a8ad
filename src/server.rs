//! HTTP surface over the pipelines.
//!
//! A thin translation layer: handlers validate input, delegate to
//! [`ingest`], [`recall`] and [`store`], and serialize the result. All
//! retrieval and consistency decisions live in those modules.

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::config::MnemoConfig;
use crate::db::{self, Db};
use crate::error::ApiError;
use crate::ingest::{IngestRequest, IngestStatus, Ingestor, Message};
use crate::model::ModelClient;
use crate::recall::{self, RecallResponse};
use crate::store::types::Fact;
use crate::store;
use crate::store::{search, stats, write};

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub model: ModelClient,
    pub ingestor: Arc<Ingestor>,
    pub config: Arc<MnemoConfig>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ingest", post(handle_ingest))
        .route("/recall", post(handle_recall))
        .route("/search", get(handle_search))
        .route("/recent", get(handle_recent))
        .route("/store", post(handle_store))
        .route("/stats", get(handle_stats))
        .with_state(state)
}

/// Open the database, build shared state, and serve until ctrl-c.
///
/// Pending debounce windows are in-memory only and are lost on shutdown.
pub async fn serve(config: MnemoConfig) -> anyhow::Result<()> {
    let conn = db::open_database(config.resolved_db_path())?;
    let db = Db::new(conn);
    let model = ModelClient::new(&config.model)?;

    if config.ingestion.chunk_tokens + config.ingestion.max_extraction_tokens as usize
        > config.model.context_tokens
    {
        tracing::warn!(
            chunk_tokens = config.ingestion.chunk_tokens,
            max_extraction_tokens = config.ingestion.max_extraction_tokens,
            context_tokens = config.model.context_tokens,
            "chunk plus extraction budget exceeds the model context window"
        );
    }

    let ingestor = Arc::new(Ingestor::new(db.clone(), model.clone(), &config.ingestion));
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState {
        db,
        model,
        ingestor,
        config: Arc::new(config),
    };

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "memory server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
            tracing::info!("shutting down");
        })
        .await?;

    Ok(())
}

async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let stats = state.db.call(|conn| stats::stats(conn)).await?;
    Ok(Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "stats": stats,
    })))
}

fn default_debounce() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct IngestBody {
    #[serde(default)]
    messages: Vec<Message>,
    session_id: Option<String>,
    channel: Option<String>,
    user_id: Option<String>,
    #[serde(default = "default_debounce")]
    debounce: bool,
}

async fn handle_ingest(
    State(state): State<AppState>,
    Json(body): Json<IngestBody>,
) -> Result<Json<IngestStatus>, ApiError> {
    if body.messages.is_empty() {
        return Err(ApiError::Validation("no messages provided".into()));
    }

    let status = state.ingestor.accept(
        IngestRequest {
            messages: body.messages,
            session_id: body.session_id,
            channel: body.channel,
            user_id: body.user_id,
        },
        body.debounce,
    );
    Ok(Json(status))
}

#[derive(Debug, Deserialize)]
struct RecallBody {
    #[serde(default)]
    query: String,
    user_id: Option<String>,
}

async fn handle_recall(
    State(state): State<AppState>,
    Json(body): Json<RecallBody>,
) -> Result<Json<RecallResponse>, ApiError> {
    let query = body.query.trim();
    if query.is_empty() {
        return Err(ApiError::Validation("no query provided".into()));
    }

    let response = recall::recall(
        &state.db,
        &state.model,
        &state.config.recall,
        query,
        body.user_id,
    )
    .await?;
    Ok(Json(response))
}

#[derive(Debug, Serialize)]
struct FactList {
    results: Vec<Fact>,
    count: usize,
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
    user_id: Option<String>,
    limit: Option<usize>,
}

async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<FactList>, ApiError> {
    let q = params.q.trim().to_string();
    if q.is_empty() {
        return Err(ApiError::Validation("no query (q) provided".into()));
    }
    let limit = params.limit.unwrap_or(20);
    let user_id = params.user_id;

    let results = state
        .db
        .call(move |conn| search::search_facts(conn, &q, user_id.as_deref(), limit))
        .await?;

    // Returned-by-search counts as access; failure must not fail the read.
    let ids: Vec<i64> = results.iter().map(|f| f.id).collect();
    if let Err(e) = state.db.call(move |conn| write::touch_access(conn, &ids)).await {
        tracing::warn!(error = %e, "failed to update last-access timestamps");
    }

    let count = results.len();
    Ok(Json(FactList { results, count }))
}

#[derive(Debug, Deserialize)]
struct RecentParams {
    user_id: Option<String>,
    limit: Option<usize>,
}

async fn handle_recent(
    State(state): State<AppState>,
    Query(params): Query<RecentParams>,
) -> Result<Json<FactList>, ApiError> {
    let limit = params.limit.unwrap_or(10);
    let user_id = params.user_id;

    let results = state
        .db
        .call(move |conn| search::recent_facts(conn, user_id.as_deref(), limit))
        .await?;
    let count = results.len();
    Ok(Json(FactList { results, count }))
}

#[derive(Debug, Deserialize)]
struct StoreBody {
    user_id: Option<String>,
    #[serde(default)]
    topic: String,
    #[serde(default)]
    fact: String,
    importance: Option<i64>,
}

async fn handle_store(
    State(state): State<AppState>,
    Json(body): Json<StoreBody>,
) -> Result<Json<Value>, ApiError> {
    let topic = body.topic.trim().to_string();
    let fact = body.fact.trim().to_string();
    if topic.is_empty() || fact.is_empty() {
        return Err(ApiError::Validation(
            "both 'fact' and 'topic' are required".into(),
        ));
    }

    let new = store::types::NewFact {
        user_id: body.user_id,
        topic,
        fact,
        source_session: None,
        source_channel: None,
        importance: body.importance,
    };
    let id = state
        .db
        .call(move |conn| write::insert_fact(conn, &new))
        .await?;

    Ok(Json(json!({ "status": "stored", "id": id })))
}

async fn handle_stats(
    State(state): State<AppState>,
) -> Result<Json<store::stats::StoreStats>, ApiError> {
    let stats = state.db.call(|conn| stats::stats(conn)).await?;
    Ok(Json(stats))
}
