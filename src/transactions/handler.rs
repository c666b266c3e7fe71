/**
 * CONTROLLER LAYER - Transaction Engine HTTP Handlers
 *
 * Purchase, verification, retry and refund endpoints. Handlers extract the
 * actor and client context, delegate to the engine, and wrap results in the
 * standard response envelope. No business rules here.
 */

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::actor::Actor;
use crate::error::Result;
use super::dto::{ClientMeta, PurchaseRequest, RefundRequestBody, VerifyRequest};
use super::service::TransactionEngine;

// Client context recorded on the transaction for forensics.
fn client_meta(headers: &HeaderMap) -> ClientMeta {
    ClientMeta {
        ip: headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(|s| s.trim().to_string()),
        user_agent: headers
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string()),
    }
}

/**
 * POST /tickets/purchase
 *
 * Initiate a purchase: creates the pending Order + Transaction pair and
 * returns the checkout URL. Safe to retry with the same Idempotency-Key
 * header - the original result comes back with is_idempotent=true.
 */
pub async fn purchase(
    State(engine): State<Arc<TransactionEngine>>,
    headers: HeaderMap,
    Json(req): Json<PurchaseRequest>,
) -> Result<Json<Value>> {
    let actor = Actor::from_headers(&headers)?;
    let idempotency_key = headers
        .get("idempotency-key")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let outcome = engine
        .initiate(actor.user_id, req, idempotency_key, client_meta(&headers))
        .await?;

    Ok(Json(json!({
        "status": "success",
        "data": outcome
    })))
}

/**
 * POST /tickets/verify
 *
 * Buyer returned from checkout: verify the charge with the gateway and
 * complete the transaction. Both this path and the webhook converge on the
 * same completion boundary, so double delivery is harmless.
 */
pub async fn verify(
    State(engine): State<Arc<TransactionEngine>>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<Value>> {
    let outcome = engine.verify_by_reference(&req.reference).await?;

    Ok(Json(json!({
        "status": "success",
        "data": {
            "order": {
                "id": outcome.order.id,
                "status": outcome.order.payment_status,
                "tickets": outcome.tickets,
            },
            "transaction": outcome.transaction,
            "already_completed": outcome.already_completed,
        }
    })))
}

/**
 * GET /tickets/me
 */
pub async fn my_tickets(
    State(engine): State<Arc<TransactionEngine>>,
    headers: HeaderMap,
) -> Result<Json<Value>> {
    let actor = Actor::from_headers(&headers)?;
    let tickets = engine.user_tickets(actor.user_id).await?;
    Ok(Json(json!({ "status": "success", "data": tickets })))
}

/**
 * GET /transactions/me
 */
pub async fn my_transactions(
    State(engine): State<Arc<TransactionEngine>>,
    headers: HeaderMap,
) -> Result<Json<Value>> {
    let actor = Actor::from_headers(&headers)?;
    let transactions = engine.user_transactions(actor.user_id).await?;
    Ok(Json(json!({ "status": "success", "data": transactions })))
}

/**
 * POST /transactions/:id/retry
 *
 * Manually reopen a failed transaction. 400 when not in a retryable state
 * or when attempts are exhausted.
 */
pub async fn retry(
    State(engine): State<Arc<TransactionEngine>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>> {
    Actor::from_headers(&headers)?;
    let outcome = engine.retry(id).await?;
    Ok(Json(json!({
        "status": "success",
        "data": {
            "transaction": outcome.transaction,
            "payment_url": outcome.payment_url,
        }
    })))
}

/**
 * POST /transactions/:id/refund
 *
 * Refund part or all of a completed transaction. Omitted amount refunds
 * the full remaining net.
 */
pub async fn refund(
    State(engine): State<Arc<TransactionEngine>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<RefundRequestBody>,
) -> Result<Json<Value>> {
    let actor = Actor::from_headers(&headers)?;
    let transaction = engine
        .refund(id, req.amount, &req.reason, actor.user_id)
        .await?;
    let refunds = engine.transaction_refunds(id).await?;
    Ok(Json(json!({
        "status": "success",
        "data": {
            "transaction": transaction,
            "refunds": refunds,
        }
    })))
}
