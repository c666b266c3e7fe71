/**
 * USE CASE LAYER - Gate Validator
 *
 * Decides who gets in. Verifies the signed ticket token offline, then
 * enforces single use against the store with an optimistic compare-and-set:
 * no global lock, and N concurrent scanners for one ticket produce exactly
 * one VALID.
 *
 * Every lookup is O(1) on the unique qr_code index.
 */

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::actor::{Actor, Role};
use crate::audit::AuditEmitter;
use crate::error::Result;
use crate::token::TicketTokenCodec;

/// Holder summary returned to the scanning device on admission.
#[derive(Debug, Serialize)]
pub struct ScanTicketInfo {
    pub ticket_id: Uuid,
    pub event_id: Uuid,
    pub tier_name: String,
    pub holder_name: String,
    pub checked_in_at: DateTime<Utc>,
}

#[derive(Debug)]
pub enum ScanOutcome {
    Valid(ScanTicketInfo),
    /// Token failed offline verification; err is "sig" or "malformed".
    Invalid { err: &'static str },
    NotFound,
    WrongEvent,
    NotAssigned,
    AlreadyUsed { checked_in_at: Option<DateTime<Utc>> },
    Cancelled,
    /// Another device won the compare-and-set between our read and write.
    RaceCondition,
}

impl ScanOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ScanOutcome::Valid(_) => "VALID",
            ScanOutcome::Invalid { .. } => "INVALID",
            ScanOutcome::NotFound => "NOT_FOUND",
            ScanOutcome::WrongEvent => "WRONG_EVENT",
            ScanOutcome::NotAssigned => "NOT_ASSIGNED",
            ScanOutcome::AlreadyUsed { .. } => "ALREADY_USED",
            ScanOutcome::Cancelled => "CANCELLED",
            ScanOutcome::RaceCondition => "RACE_CONDITION",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GateStats {
    pub total_sold: i32,
    pub scanned: i64,
    pub remaining: i64,
    pub scan_rate: f64,
}

pub struct GateValidator {
    pool: PgPool,
    codec: TicketTokenCodec,
    audit: AuditEmitter,
}

impl GateValidator {
    pub fn new(pool: PgPool, codec: TicketTokenCodec, audit: AuditEmitter) -> Self {
        Self { pool, codec, audit }
    }

    /**
     * Validate one scan, short-circuiting on the first failure
     *
     * Order: token signature, ticket lookup, event match, scanner
     * assignment, status checks, then the single-use CAS. Only the CAS
     * writes; every earlier step is a read.
     */
    pub async fn scan(
        &self,
        token: &str,
        scanner: &Actor,
        claimed_event_id: Option<Uuid>,
    ) -> Result<ScanOutcome> {
        if let Err(err) = self.codec.verify(token) {
            return Ok(ScanOutcome::Invalid { err: err.as_str() });
        }

        let row = sqlx::query(
            r#"SELECT t.id, t.event_id, t.status, t.checked_in_at, t.tier_name,
                      u.name AS holder_name
            FROM tickets t
            JOIN users u ON t.user_id = u.id
            WHERE t.qr_code = $1"#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(ScanOutcome::NotFound);
        };
        let ticket_id: Uuid = row.get("id");
        let event_id: Uuid = row.get("event_id");
        let status: String = row.get("status");
        let checked_in_at: Option<DateTime<Utc>> = row.get("checked_in_at");
        let tier_name: String = row.get("tier_name");
        let holder_name: String = row.get("holder_name");

        if claimed_event_id.is_some_and(|claimed| claimed != event_id) {
            return Ok(ScanOutcome::WrongEvent);
        }

        if scanner.role == Role::Validator && !self.is_assigned(event_id, scanner.user_id).await? {
            return Ok(ScanOutcome::NotAssigned);
        }

        match status.as_str() {
            "used" => return Ok(ScanOutcome::AlreadyUsed { checked_in_at }),
            "cancelled" | "transferred" => return Ok(ScanOutcome::Cancelled),
            _ => {}
        }

        // Single-use enforcement: whoever flips valid -> used wins; everyone
        // else affects zero rows
        let now = Utc::now();
        let result = sqlx::query(
            r#"UPDATE tickets SET status = 'used', checked_in_at = $2, checked_in_by = $3
            WHERE id = $1 AND status = 'valid'"#,
        )
        .bind(ticket_id)
        .bind(now)
        .bind(scanner.user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(ScanOutcome::RaceCondition);
        }

        self.audit.emit(
            "ticket.checked_in",
            Some(scanner.user_id),
            "ticket",
            &ticket_id.to_string(),
            json!({ "event_id": event_id }),
        );

        Ok(ScanOutcome::Valid(ScanTicketInfo {
            ticket_id,
            event_id,
            tier_name,
            holder_name,
            checked_in_at: now,
        }))
    }

    async fn is_assigned(&self, event_id: Uuid, user_id: Uuid) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM event_validators WHERE event_id = $1 AND user_id = $2",
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    /**
     * Scan statistics for an event: sold vs scanned vs remaining
     */
    pub async fn stats(&self, event_id: Uuid) -> Result<Option<GateStats>> {
        let row = sqlx::query(
            r#"SELECT e.total_tickets_sold,
                COUNT(*) FILTER (WHERE t.status = 'used') AS scanned,
                COUNT(*) FILTER (WHERE t.status = 'valid') AS remaining
            FROM events e
            LEFT JOIN tickets t ON t.event_id = e.id
            WHERE e.id = $1
            GROUP BY e.total_tickets_sold"#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| {
            let total_sold: i32 = r.get("total_tickets_sold");
            let scanned: i64 = r.get("scanned");
            let remaining: i64 = r.get("remaining");
            let scan_rate = if total_sold > 0 {
                scanned as f64 / total_sold as f64 * 100.0
            } else {
                0.0
            };
            GateStats { total_sold, scanned, remaining, scan_rate }
        }))
    }
}
