/**
 * CONTROLLER LAYER - Gate HTTP Handlers
 *
 * Scan endpoint for gate devices plus live stats for organizers. Every
 * scan outcome maps to a status code here; the service only decides.
 */

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::actor::Actor;
use crate::error::{AppError, Result};
use super::service::{GateValidator, ScanOutcome};

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    pub qr_code: String,
    pub event_id: Option<Uuid>,
}

/**
 * POST /validate/scan
 *
 * 200 only for an admitted scan. Rejections carry the outcome label:
 * 400 INVALID / WRONG_EVENT / ALREADY_USED / CANCELLED / RACE_CONDITION,
 * 403 NOT_ASSIGNED, 404 NOT_FOUND.
 */
pub async fn scan(
    State(validator): State<Arc<GateValidator>>,
    headers: HeaderMap,
    Json(req): Json<ScanRequest>,
) -> Result<Response> {
    let actor = Actor::from_headers(&headers)?;
    let outcome = validator.scan(&req.qr_code, &actor, req.event_id).await?;

    let response = match &outcome {
        ScanOutcome::Valid(info) => (
            StatusCode::OK,
            Json(json!({ "status": outcome.label(), "ticket": info })),
        ),
        ScanOutcome::Invalid { err } => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "status": outcome.label(), "error": err })),
        ),
        ScanOutcome::AlreadyUsed { checked_in_at } => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "status": outcome.label(), "checked_in_at": checked_in_at })),
        ),
        ScanOutcome::NotFound => (
            StatusCode::NOT_FOUND,
            Json(json!({ "status": outcome.label() })),
        ),
        ScanOutcome::NotAssigned => (
            StatusCode::FORBIDDEN,
            Json(json!({ "status": outcome.label() })),
        ),
        ScanOutcome::WrongEvent | ScanOutcome::Cancelled | ScanOutcome::RaceCondition => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "status": outcome.label() })),
        ),
    };
    Ok(response.into_response())
}

/**
 * GET /gate/:event_id/stats
 */
pub async fn stats(
    State(validator): State<Arc<GateValidator>>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    let stats = validator
        .stats(event_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".into()))?;
    Ok(Json(json!({ "status": "success", "data": stats })))
}
