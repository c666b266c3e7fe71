/**
 * USE CASE LAYER - Webhook Processor
 *
 * Signature-checked ingestion of gateway events, dispatched onto the
 * transaction engine. The processor never raises to its caller: whatever
 * happens inside, the gateway gets a 2xx so it does not redeliver forever.
 * Internal faults are logged and audited as system.error instead.
 *
 * There is no dedup table. Completion is idempotent at the state boundary
 * and keyed by the gateway reference, so duplicate webhooks are naturally
 * absorbed.
 */

use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::audit::AuditEmitter;
use crate::gateway::paystack::parse_verify_data;
use crate::gateway::PaymentGateway;
use crate::transactions::service::TransactionEngine;

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub success: bool,
    pub handled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl WebhookAck {
    fn ok(handled: bool) -> Self {
        Self { success: true, handled, message: None }
    }

    fn rejected(message: &str) -> Self {
        Self { success: false, handled: false, message: Some(message.to_string()) }
    }

    fn faulted(message: &str) -> Self {
        Self { success: false, handled: true, message: Some(message.to_string()) }
    }
}

pub struct WebhookProcessor {
    engine: Arc<TransactionEngine>,
    gateway: Arc<dyn PaymentGateway>,
    audit: AuditEmitter,
}

impl WebhookProcessor {
    pub fn new(
        engine: Arc<TransactionEngine>,
        gateway: Arc<dyn PaymentGateway>,
        audit: AuditEmitter,
    ) -> Self {
        Self { engine, gateway, audit }
    }

    /**
     * Ingest one raw webhook delivery
     *
     * Signature first: a mismatch (or an unconfigured secret) is rejected
     * without parsing a byte of the body. The ack always travels back on a
     * 200 - gateways treat non-2xx as "retry me".
     */
    pub async fn ingest(&self, body: &[u8], signature: &str) -> WebhookAck {
        if !self.gateway.verify_signature(body, signature) {
            tracing::warn!("webhook rejected: invalid signature");
            return WebhookAck::rejected("Invalid signature");
        }

        let payload: Value = match serde_json::from_slice(body) {
            Ok(v) => v,
            Err(err) => {
                tracing::warn!("webhook rejected: unparseable body: {}", err);
                return WebhookAck::rejected("Invalid payload");
            }
        };

        let event = payload["event"].as_str().unwrap_or("");
        match event {
            "charge.success" => self.on_charge_success(&payload["data"]).await,
            "charge.failed" => self.on_charge_failed(&payload["data"]).await,
            // Settlement-side notifications: recorded, no core state change
            "transfer.success" | "transfer.failed" | "refund.processed" => {
                self.audit.emit(
                    &format!("gateway.{}", event),
                    None,
                    "webhook",
                    payload["data"]["reference"].as_str().unwrap_or("unknown"),
                    payload["data"].clone(),
                );
                WebhookAck::ok(true)
            }
            other => {
                tracing::info!("webhook ignored: unknown event '{}'", other);
                WebhookAck::ok(false)
            }
        }
    }

    async fn on_charge_success(&self, data: &Value) -> WebhookAck {
        let Some(reference) = data["reference"].as_str() else {
            return WebhookAck::rejected("Missing reference");
        };

        let txn = match self.engine.find_by_reference(reference).await {
            Ok(Some(txn)) => txn,
            Ok(None) => {
                tracing::warn!("webhook for unknown reference {}", reference);
                return WebhookAck::ok(false);
            }
            Err(err) => return self.fault("charge.success", reference, err),
        };

        // The signed body is the success proof; shape it like a verify result
        let verified = parse_verify_data(data);
        match self.engine.complete(txn.id, &verified).await {
            Ok(outcome) => {
                if outcome.already_completed {
                    tracing::info!("webhook {}: already completed", reference);
                }
                WebhookAck::ok(true)
            }
            Err(err) => self.fault("charge.success", reference, err),
        }
    }

    async fn on_charge_failed(&self, data: &Value) -> WebhookAck {
        let Some(reference) = data["reference"].as_str() else {
            return WebhookAck::rejected("Missing reference");
        };

        let txn = match self.engine.find_by_reference(reference).await {
            Ok(Some(txn)) => txn,
            Ok(None) => {
                tracing::warn!("webhook for unknown reference {}", reference);
                return WebhookAck::ok(false);
            }
            Err(err) => return self.fault("charge.failed", reference, err),
        };

        let detail = data["gateway_response"].as_str();
        match self
            .engine
            .fail(txn.id, "charge failed", Some("CHARGE_FAILED"), detail)
            .await
        {
            Ok(_) => WebhookAck::ok(true),
            Err(err) => self.fault("charge.failed", reference, err),
        }
    }

    // A handler fault stays inside the 2xx contract but leaves a trail.
    fn fault(&self, event: &str, reference: &str, err: crate::error::AppError) -> WebhookAck {
        tracing::error!("webhook {} for {} failed: {}", event, reference, err);
        self.audit.system_error(
            "webhook",
            json!({ "event": event, "reference": reference, "error": err.to_string() }),
        );
        WebhookAck::faulted("Internal error")
    }
}
