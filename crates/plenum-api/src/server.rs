//! Router and request handlers.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use log::{debug, error};
use serde::Deserialize;

use plenum_fts::{Answer, Searcher};

/// Shared handler state.
#[derive(Clone)]
struct AppState {
    searcher: Arc<Searcher>,
}

/// Query parameters of the search endpoint.
#[derive(Debug, Deserialize)]
struct SearchParams {
    /// The question.
    q: Option<String>,
    /// Comma-separated collection filter.
    c: Option<String>,
    /// Meeting scope; 0 or absent means unscoped.
    meeting_id: Option<i32>,
}

/// GET /system/search
async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<BTreeMap<String, Answer>>, (StatusCode, String)> {
    let question = params.q.unwrap_or_default();
    let collections: Vec<String> = params
        .c
        .as_deref()
        .map(|c| {
            c.split(',')
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let meeting_id = params.meeting_id.unwrap_or(0).max(0);

    debug!("search {question:?} (collections: {collections:?}, meeting: {meeting_id})");

    let answers = state
        .searcher
        .search(&question, &collections, meeting_id)
        .map_err(|err| {
            error!("search for {question:?} failed: {err}");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        })?;

    Ok(Json(answers))
}

/// GET /health
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"healthy": true, "service": "search"}))
}

/// Build the service router around a search handle.
pub fn create_router(searcher: Arc<Searcher>) -> Router {
    Router::new()
        .route("/system/search", get(search))
        .route("/health", get(health))
        .with_state(AppState { searcher })
}

// ============================================================================
// Tests
// ============================================================================
