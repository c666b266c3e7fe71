/**
 * DOMAIN LAYER - Transaction Engine Types
 *
 * Request DTOs, internal models, and operation outcomes for the
 * payment-order-ticket engine. Money is i64 minor units throughout.
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::state::TransactionStatus;

// REQUEST DTOs

#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    pub event_id: Uuid,
    pub tier_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub reference: String,
}

#[derive(Debug, Deserialize)]
pub struct RefundRequestBody {
    pub amount: Option<i64>,    // minor units; omitted = refund the full net
    pub reason: String,
}

/// Client context captured at initiation for the transaction record.
#[derive(Debug, Clone, Default)]
pub struct ClientMeta {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

// INTERNAL MODELS

/**
 * Transaction: the ledger row
 *
 * One per order for the life of the order. Refund accounting invariants:
 * total_refunded_minor = sum of refunds, never exceeds amount_minor, and
 * alone determines refunded vs partially_refunded.
 */
#[derive(Debug, Clone, Serialize)]
pub struct Transaction {
    pub id: Uuid,
    pub idempotency_key: String,
    pub status: TransactionStatus,
    pub user_id: Uuid,
    pub order_id: Uuid,
    pub event_id: Uuid,
    pub amount_minor: i64,
    pub currency: String,
    pub gateway_provider: String,
    pub gateway_reference: String,
    pub gateway_authorization_url: Option<String>,
    pub gateway_transaction_id: Option<String>,
    pub gateway_channel: Option<String>,
    pub gateway_authorization: Option<Value>,
    pub gateway_response: Option<Value>,
    pub gateway_fees_minor: Option<i64>,
    pub platform_minor: Option<i64>,
    pub organizer_minor: Option<i64>,
    pub subaccount_code: Option<String>,
    pub retry_count: i32,
    pub max_retries: i32,
    pub last_retry_at: Option<DateTime<Utc>>,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
    pub failure_code: Option<String>,
    pub failure_details: Option<String>,
    pub total_refunded_minor: i64,
    pub initiated_at: DateTime<Utc>,
    pub processing_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub meta_ip: Option<String>,
    pub meta_user_agent: Option<String>,
    pub tier_name: String,
    pub quantity: i32,
}

impl Transaction {
    /// Amount still refundable, in minor units.
    pub fn refundable_minor(&self) -> i64 {
        self.amount_minor - self.total_refunded_minor
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Refund {
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub amount_minor: i64,
    pub reason: String,
    pub processed_by: Uuid,
    pub processed_at: DateTime<Utc>,
    pub gateway_refund_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderPaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl OrderPaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderPaymentStatus::Pending => "pending",
            OrderPaymentStatus::Completed => "completed",
            OrderPaymentStatus::Failed => "failed",
            OrderPaymentStatus::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OrderPaymentStatus::Pending),
            "completed" => Some(OrderPaymentStatus::Completed),
            "failed" => Some(OrderPaymentStatus::Failed),
            "refunded" => Some(OrderPaymentStatus::Refunded),
            _ => None,
        }
    }
}

/**
 * Order: buyer intent
 *
 * tickets is populated only once payment completes; pending orders have
 * none. The ticket rows own the back-reference via order_id.
 */
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub tier_id: Uuid,
    pub tier_name: String,
    pub quantity: i32,
    pub unit_price_minor: i64,
    pub total_minor: i64,
    pub payment_status: OrderPaymentStatus,
    pub platform_minor: Option<i64>,
    pub organizer_minor: Option<i64>,
    pub gateway_reference: Option<String>,
    pub gateway_channel: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub tickets: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Valid,
    Used,
    Cancelled,
    Transferred,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Valid => "valid",
            TicketStatus::Used => "used",
            TicketStatus::Cancelled => "cancelled",
            TicketStatus::Transferred => "transferred",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "valid" => Some(TicketStatus::Valid),
            "used" => Some(TicketStatus::Used),
            "cancelled" => Some(TicketStatus::Cancelled),
            "transferred" => Some(TicketStatus::Transferred),
            _ => None,
        }
    }
}

/// One seat of admission. Created exclusively inside Complete.
#[derive(Debug, Clone, Serialize)]
pub struct Ticket {
    pub id: Uuid,
    pub order_id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub tier_id: Uuid,
    pub tier_name: String,
    pub price_minor: i64,
    pub qr_code: String,
    pub status: TicketStatus,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub checked_in_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

// Product-side rows the engine reads and counts against.

#[derive(Debug, Clone)]
pub struct EventRow {
    pub id: Uuid,
    pub organizer_id: Uuid,
    pub status: String,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl EventRow {
    pub fn is_purchasable(&self) -> bool {
        self.status == "published" && self.deleted_at.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct TierRow {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub price_minor: i64,
    pub quantity: i32,
    pub sold_count: i32,
    pub max_per_user: i32,
    pub sale_start: Option<DateTime<Utc>>,
    pub sale_end: Option<DateTime<Utc>>,
}

impl TierRow {
    pub fn remaining(&self) -> i32 {
        self.quantity - self.sold_count
    }
}

/// Organizer subset the engine reads; owned by the upstream user module.
#[derive(Debug, Clone)]
pub struct OrganizerRow {
    pub subaccount_code: Option<String>,
    pub platform_fee_percent: i64,
}

// OPERATION OUTCOMES

#[derive(Debug, Serialize)]
pub struct InitiateOutcome {
    pub order: Order,
    pub transaction: Transaction,
    pub payment_url: String,
    pub idempotency_key: String,
    pub is_idempotent: bool,
}

#[derive(Debug, Serialize)]
pub struct CompletionOutcome {
    pub transaction: Transaction,
    pub order: Order,
    pub tickets: Vec<Ticket>,
    /// True when a previous completion already did the work and this call
    /// returned the existing result (verifier/webhook race absorption).
    pub already_completed: bool,
}

#[derive(Debug, Serialize)]
pub struct RetryOutcome {
    pub transaction: Transaction,
    pub payment_url: String,
}
