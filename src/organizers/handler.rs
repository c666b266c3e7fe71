/**
 * CONTROLLER LAYER - Organizer HTTP Handlers
 */

use axum::{extract::State, http::HeaderMap, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::actor::Actor;
use crate::error::Result;
use super::service::OrganizerService;

#[derive(Debug, Deserialize)]
pub struct CreateSubaccountBody {
    pub business_name: String,
    pub bank_code: String,
    pub account_number: String,
}

/**
 * POST /organizers/subaccount
 *
 * The acting organizer onboards their settlement account.
 */
pub async fn create_subaccount(
    State(service): State<Arc<OrganizerService>>,
    headers: HeaderMap,
    Json(req): Json<CreateSubaccountBody>,
) -> Result<Json<Value>> {
    let actor = Actor::from_headers(&headers)?;
    let code = service
        .create_subaccount(actor.user_id, req.business_name, req.bank_code, req.account_number)
        .await?;
    Ok(Json(json!({
        "status": "success",
        "data": { "subaccount_code": code }
    })))
}
