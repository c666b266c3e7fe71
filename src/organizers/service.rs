/**
 * USE CASE LAYER - Organizer Onboarding
 *
 * Creates the organizer's gateway subaccount and persists its code. The
 * engine's split path picks the code up on the next initiate; charges made
 * before onboarding settle entirely through the platform account.
 */

use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::audit::AuditEmitter;
use crate::error::{AppError, Result};
use crate::gateway::{CreateSubaccountRequest, PaymentGateway};

pub struct OrganizerService {
    pool: PgPool,
    gateway: Arc<dyn PaymentGateway>,
    audit: AuditEmitter,
}

impl OrganizerService {
    pub fn new(pool: PgPool, gateway: Arc<dyn PaymentGateway>, audit: AuditEmitter) -> Self {
        Self { pool, gateway, audit }
    }

    /**
     * Create and attach a gateway subaccount for an organizer
     *
     * The percentage charge registered at the gateway is the organizer's
     * configured platform fee, so gateway-side splits agree with what the
     * engine computes.
     */
    pub async fn create_subaccount(
        &self,
        organizer_id: Uuid,
        business_name: String,
        bank_code: String,
        account_number: String,
    ) -> Result<String> {
        let row: Option<(Option<String>, i64)> = sqlx::query_as(
            "SELECT subaccount_code, platform_fee_percent FROM organizers WHERE id = $1",
        )
        .bind(organizer_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some((existing, platform_fee_percent)) = row else {
            return Err(AppError::NotFound("Organizer not found".into()));
        };
        if let Some(code) = existing {
            return Err(AppError::Conflict(format!("Subaccount already exists: {}", code)));
        }

        let created = self
            .gateway
            .create_subaccount(CreateSubaccountRequest {
                business_name,
                bank_code,
                account_number,
                percentage_charge: platform_fee_percent as f64,
            })
            .await?;

        sqlx::query("UPDATE organizers SET subaccount_code = $2 WHERE id = $1")
            .bind(organizer_id)
            .bind(&created.subaccount_code)
            .execute(&self.pool)
            .await?;

        self.audit.emit(
            "organizer.subaccount_created",
            Some(organizer_id),
            "organizer",
            &organizer_id.to_string(),
            serde_json::json!({ "subaccount_code": created.subaccount_code }),
        );

        Ok(created.subaccount_code)
    }
}
