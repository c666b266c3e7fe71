/**
 * INFRASTRUCTURE LAYER - Audit Emitter
 *
 * Fire-and-forget structured audit events. The emitter writes to the
 * audit_log table on a spawned task and mirrors every event to tracing.
 *
 * Invariant: emit() cannot fail its caller. A broken audit pipeline must
 * never roll back a payment.
 */

use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct AuditEmitter {
    pool: PgPool,
}

impl AuditEmitter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /**
     * Emit one audit event
     *
     * Returns immediately; the insert happens on a detached task. Storage
     * failures are logged and dropped.
     */
    pub fn emit(
        &self,
        event_type: &str,
        actor_id: Option<Uuid>,
        entity_type: &str,
        entity_id: &str,
        detail: Value,
    ) {
        tracing::info!(
            event_type,
            entity_type,
            entity_id,
            "audit: {}",
            event_type
        );

        let pool = self.pool.clone();
        let event_type = event_type.to_string();
        let entity_type = entity_type.to_string();
        let entity_id = entity_id.to_string();
        tokio::spawn(async move {
            let result = sqlx::query(
                r#"INSERT INTO audit_log (event_type, actor_id, entity_type, entity_id, detail)
                VALUES ($1, $2, $3, $4, $5)"#,
            )
            .bind(&event_type)
            .bind(actor_id)
            .bind(&entity_type)
            .bind(&entity_id)
            .bind(&detail)
            .execute(&pool)
            .await;

            if let Err(err) = result {
                tracing::warn!("audit write failed for {}: {:?}", event_type, err);
            }
        });
    }

    /// Shorthand for faults that must leave a trace even when the caller
    /// swallows the error (webhook handlers, scheduler sweeps).
    pub fn system_error(&self, context: &str, detail: Value) {
        self.emit("system.error", None, "system", context, detail);
    }
}
