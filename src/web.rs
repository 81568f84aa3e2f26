use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::admission::AdmissionResult;
use crate::api_errors::AppError;
use crate::commands::{self, Response};
use crate::event_record::{EventRecord, RawEvent};
use crate::exporter::export_file_name;
use crate::lifelog_core::LifeLogCore;
use crate::query::Stats;
use crate::retention::SweepReport;

pub type SharedCore = Arc<LifeLogCore>;

#[derive(Debug, Default, Deserialize)]
pub struct RecentParams {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoggingStatus {
    pub enabled: bool,
}

/// Router exposing the consumer surface, the ingestion endpoint and health checks
pub fn build_router(core: SharedCore) -> Router {
    Router::new()
        // message envelope, same shapes as the extension's runtime messages
        .route("/api/message", post(message))
        // event source
        .route("/api/events", post(record_event))
        // typed endpoints
        .route("/api/entries", get(recent_entries).delete(clear_entries))
        .route("/api/stats", get(stats))
        .route("/api/logging", get(logging_status).post(toggle_logging))
        .route("/api/sweep", post(sweep))
        .route("/api/export.csv", get(export_csv))
        // health endpoints
        .route("/healthz", get(healthz))
        .layer(CorsLayer::permissive())
        .with_state(core)
}

async fn message(
    State(core): State<SharedCore>,
    Json(body): Json<serde_json::Value>,
) -> Json<Response> {
    Json(commands::handle_value(&core, body).await)
}

async fn record_event(
    State(core): State<SharedCore>,
    Json(raw): Json<RawEvent>,
) -> Result<Json<AdmissionResult>, AppError> {
    Ok(Json(core.admit(raw).await?))
}

async fn recent_entries(
    State(core): State<SharedCore>,
    Query(params): Query<RecentParams>,
) -> Result<Json<Vec<EventRecord>>, AppError> {
    let limit = params
        .limit
        .unwrap_or(core.config().query.default_recent_limit);
    Ok(Json(core.recent(limit).await?))
}

async fn clear_entries(State(core): State<SharedCore>) -> Result<StatusCode, AppError> {
    core.clear_all().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn stats(State(core): State<SharedCore>) -> Result<Json<Stats>, AppError> {
    Ok(Json(core.stats().await?))
}

async fn logging_status(State(core): State<SharedCore>) -> Json<LoggingStatus> {
    Json(LoggingStatus {
        enabled: core.logging_enabled(),
    })
}

async fn toggle_logging(
    State(core): State<SharedCore>,
    Json(req): Json<LoggingStatus>,
) -> Result<Json<LoggingStatus>, AppError> {
    let enabled = core.set_logging(req.enabled).await?;
    Ok(Json(LoggingStatus { enabled }))
}

async fn sweep(State(core): State<SharedCore>) -> Result<Json<SweepReport>, AppError> {
    Ok(Json(core.sweep().await?))
}

async fn export_csv(State(core): State<SharedCore>) -> Result<impl IntoResponse, AppError> {
    let body = core.export_csv().await?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        export_file_name(core.clock().now())
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

async fn healthz(State(core): State<SharedCore>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "engine": core.status() }))
}
