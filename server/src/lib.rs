use analytics::{AnalyticsError, ClientInfo, DwellOutcome, EventRecorder, IncomingRequest, SessionId, StatsSnapshot};
use anyhow::Result;
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use search_core::{load_with_fallback, InvertedIndex, RetrievalEngine};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { 20 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub session_id: Option<SessionId>,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: String,
    pub rank: u32,
    pub score: f32,
    pub title: String,
    pub description: String,
    pub price: Option<f64>,
    pub rating: Option<f32>,
}

#[derive(Deserialize)]
pub struct DocParams {
    pub q: Option<String>,
    pub rank: Option<u32>,
}

#[derive(Deserialize)]
pub struct DwellBody {
    pub click_id: u64,
    pub dwell_secs: f64,
}

#[derive(Deserialize)]
pub struct StatsParams {
    #[serde(default = "default_top")]
    pub top: usize,
}
fn default_top() -> usize { 10 }

#[derive(Serialize)]
pub struct StatsResponse {
    pub stats: StatsSnapshot,
    /// Titles for the documents in `stats.top_documents` that are still in the index.
    pub titles: HashMap<String, String>,
}

/// Where the catalog comes from, kept so the index can be rebuilt on demand.
#[derive(Clone, Debug)]
pub struct CatalogSource {
    pub primary: PathBuf,
    pub fallback: Option<PathBuf>,
}

impl CatalogSource {
    pub fn build_index(&self) -> Result<InvertedIndex> {
        let docs = load_with_fallback(&self.primary, self.fallback.as_deref())?;
        Ok(InvertedIndex::build(docs))
    }
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RetrievalEngine>,
    pub recorder: Arc<EventRecorder>,
    pub catalog: Option<CatalogSource>,
    pub admin_token: Option<String>,
}

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Conflict(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m),
            ApiError::Conflict(m) => (StatusCode::CONFLICT, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(serde_json::json!({ "error": msg }))).into_response()
    }
}

pub fn build_app(state: AppState) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/dwell", post(dwell_handler))
        .route("/stats", get(stats_handler))
        .route("/admin/reload", post(reload_handler))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Identify the caller by `X-Client-Token`, falling back to address and user agent.
fn client_info(headers: &HeaderMap, addr: Option<SocketAddr>) -> ClientInfo {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
    let ip = header("X-Forwarded-For")
        .and_then(|v| v.split(',').next().map(|s| s.trim().to_string()))
        .or_else(|| addr.map(|a| a.ip().to_string()))
        .unwrap_or_else(|| "unknown".into());
    let user_agent = header("User-Agent").unwrap_or_default();
    let key = header("X-Client-Token").unwrap_or_else(|| format!("{ip}|{user_agent}"));
    ClientInfo { key, ip, user_agent }
}

/// Analytics failures never fail the user-facing request. The recorder may
/// block on its session lock or on sled, so it runs off the async workers.
async fn record_request(state: &AppState, client: ClientInfo, path: String, query_string: String) -> Option<SessionId> {
    let recorder = state.recorder.clone();
    let req = IncomingRequest { path, method: "GET".into(), query_string };
    let key = client.key.clone();
    let recorded = tokio::task::spawn_blocking(move || recorder.record_request(&client, req)).await;
    match recorded {
        Ok(Ok(ev)) => Some(ev.session_id),
        Ok(Err(err)) => {
            tracing::warn!(error = %err, client = %key, "failed to record request");
            None
        }
        Err(err) => {
            tracing::warn!(error = %err, client = %key, "request recording task failed");
            None
        }
    }
}

pub async fn search_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    addr: Option<ConnectInfo<SocketAddr>>,
    Query(params): Query<SearchParams>,
) -> Json<SearchResponse> {
    let start = std::time::Instant::now();
    let client = client_info(&headers, addr.map(|c| c.0));
    let session_id = record_request(&state, client, "/search".into(), params.q.clone()).await;

    let index = state.engine.index();
    let ranked = state.engine.search_with(&index, &params.q);
    let total_hits = ranked.len();
    let k = params.k.clamp(1, 100);
    let results = ranked
        .into_iter()
        .take(k)
        .filter_map(|r| {
            let doc = index.document(&r.doc_id)?;
            Some(SearchHit {
                rank: r.rank,
                score: r.score,
                title: doc.title.clone(),
                description: doc.description.clone(),
                price: doc.price,
                rating: doc.rating,
                doc_id: r.doc_id,
            })
        })
        .collect();

    let elapsed = start.elapsed();
    Json(SearchResponse { query: params.q, took_s: elapsed.as_secs_f64(), total_hits, session_id, results })
}

pub async fn doc_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    addr: Option<ConnectInfo<SocketAddr>>,
    Path(doc_id): Path<String>,
    Query(params): Query<DocParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let doc = state
        .engine
        .document(&doc_id)
        .ok_or_else(|| ApiError::NotFound(format!("document {doc_id} not found")))?;

    let client = client_info(&headers, addr.map(|c| c.0));
    let session_id = record_request(&state, client, format!("/doc/{doc_id}"), String::new()).await;

    // Only clicks through from a result list carry a rank.
    let click_id = match (session_id, params.rank) {
        (Some(sid), Some(rank)) => {
            let query = params.q.unwrap_or_default();
            let recorder = state.recorder.clone();
            let clicked = doc_id.clone();
            match tokio::task::spawn_blocking(move || recorder.record_click(&sid, &clicked, rank, &query)).await {
                Ok(Ok(handle)) => Some(handle.0),
                Ok(Err(err)) => {
                    tracing::warn!(error = %err, doc_id = %doc_id, "failed to record click");
                    None
                }
                Err(err) => {
                    tracing::warn!(error = %err, doc_id = %doc_id, "click recording task failed");
                    None
                }
            }
        }
        _ => None,
    };

    Ok(Json(serde_json::json!({
        "doc": &*doc,
        "click_id": click_id,
    })))
}

pub async fn dwell_handler(
    State(state): State<AppState>,
    Json(body): Json<DwellBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let recorder = state.recorder.clone();
    let outcome = tokio::task::spawn_blocking(move || recorder.complete_dwell(analytics::ClickHandle(body.click_id), body.dwell_secs))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|err| match err {
            AnalyticsError::UnknownClick(h) => ApiError::NotFound(format!("click {h} not found")),
            AnalyticsError::InvalidDwell(d) => ApiError::BadRequest(format!("invalid dwell duration {d}")),
            other => {
                tracing::warn!(error = %other, "failed to complete dwell");
                ApiError::Internal("analytics store unavailable".into())
            }
        })?;
    let outcome = match outcome {
        DwellOutcome::Recorded => "recorded",
        DwellOutcome::AlreadyCompleted => "already_completed",
    };
    Ok(Json(serde_json::json!({ "outcome": outcome })))
}

pub async fn stats_handler(
    State(state): State<AppState>,
    Query(params): Query<StatsParams>,
) -> Result<Json<StatsResponse>, ApiError> {
    let recorder = state.recorder.clone();
    let top = params.top.clamp(1, 100);
    let stats = tokio::task::spawn_blocking(move || recorder.compute_stats(top))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|err| {
            tracing::warn!(error = %err, "failed to compute stats");
            ApiError::Internal("analytics store unavailable".into())
        })?;

    let index = state.engine.index();
    let titles = stats
        .top_documents
        .iter()
        .filter_map(|c| index.document(&c.key).map(|d| (c.key.clone(), d.title.clone())))
        .collect();
    Ok(Json(StatsResponse { stats, titles }))
}

async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    let source = state
        .catalog
        .clone()
        .ok_or_else(|| ApiError::Conflict("server was started from a prebuilt index".into()))?;
    let index = tokio::task::spawn_blocking(move || source.build_index())
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|err| {
            tracing::error!(error = %err, "catalog reload failed");
            ApiError::Internal("catalog reload failed".into())
        })?;
    let num_docs = index.num_docs();
    state.engine.swap_index(index);
    Ok(Json(serde_json::json!({ "num_docs": num_docs })))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err(ApiError::Unauthorized("ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err(ApiError::Unauthorized("invalid admin token".into()))
    }
}
