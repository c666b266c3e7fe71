/**
 * CONTROLLER LAYER - Webhook HTTP Handler
 *
 * Public endpoint; the HMAC signature is the authentication. Always
 * responds 200 - the processor's ack carries success/handled flags.
 */

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use super::service::WebhookProcessor;

/**
 * POST /webhooks/paystack
 *
 * Raw body in, ack out. The body bytes must reach the processor untouched;
 * signature verification happens over exactly what was sent.
 */
pub async fn paystack(
    State(processor): State<Arc<WebhookProcessor>>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Value> {
    let signature = headers
        .get("x-paystack-signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let ack = processor.ingest(&body, signature).await;
    Json(json!(ack))
}
