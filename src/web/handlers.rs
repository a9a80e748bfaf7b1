//! HTTP request handlers.

use super::html;
use crate::core::cache::RateCacheService;
use crate::core::currency::CurrencyCode;
use crate::core::rate::CacheEntry;
use crate::view;
use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::{Html, IntoResponse};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<RateCacheService>,
    pub currencies: Arc<Vec<CurrencyCode>>,
    pub trend_window: usize,
}

/// GET / - Refresh stale rates and render the table.
pub async fn index(State(state): State<AppState>) -> Html<String> {
    let view = view::rates_view(
        &state.cache,
        &state.currencies,
        state.trend_window,
        Utc::now(),
        &|_| (),
    )
    .await;
    debug!(rows = view.rows.len(), "Rendered rates view");
    Html(html::render_index(&view))
}

/// GET /export/csv - Download the observation log.
pub async fn export_csv(State(state): State<AppState>) -> impl IntoResponse {
    let body = state.cache.log().raw_bytes().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to read observation log for export");
        Vec::new()
    });
    (
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"fx_log.csv\"",
            ),
        ],
        body,
    )
}

/// GET /export/json - Current cache contents, errors included.
pub async fn export_json(
    State(state): State<AppState>,
) -> Json<BTreeMap<CurrencyCode, CacheEntry>> {
    Json(state.cache.snapshot())
}

/// GET /log/view - The observation log as an HTML table.
pub async fn log_view(State(state): State<AppState>) -> Html<String> {
    let log = state.cache.log();
    if !log.exists() {
        return Html("No log data yet.".to_string());
    }
    let observations = log.read_all().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to read observation log");
        Vec::new()
    });
    Html(html::render_log(&observations))
}
