/**
 * USE CASE LAYER - Payment Gateway Port
 *
 * Narrow interface to the payment provider. The engine only ever talks to
 * this trait; the concrete Paystack client lives in paystack.rs and is
 * injected at startup. Amounts cross this boundary in integer minor units
 * and are passed to the provider untouched - Paystack already speaks kobo.
 */

pub mod paystack;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::Result;

/// Request to open a checkout session for a charge.
#[derive(Debug, Clone)]
pub struct InitializeRequest {
    pub email: String,
    pub amount_minor: i64,
    pub reference: String,
    pub subaccount_code: Option<String>,
    pub metadata: Value,
}

/// Checkout session handle; the caller redirects the buyer to the URL.
#[derive(Debug, Clone)]
pub struct InitializeResponse {
    pub authorization_url: String,
    pub reference: String,
    pub access_code: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeStatus {
    Success,
    Failed,
}

/// Gateway-side share routed to the organizer's subaccount.
/// `shared_amount_minor` is the platform's cut as the gateway computed it.
#[derive(Debug, Clone)]
pub struct SubaccountShare {
    pub code: Option<String>,
    pub shared_amount_minor: i64,
}

/// Outcome of verifying a charge by reference.
#[derive(Debug, Clone)]
pub struct VerifyResponse {
    pub status: ChargeStatus,
    pub amount_minor: i64,
    pub fees_minor: Option<i64>,
    pub channel: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub transaction_id: Option<String>,
    pub authorization: Option<Value>,
    pub subaccount: Option<SubaccountShare>,
    /// Full provider payload, persisted on the transaction for forensics.
    pub raw: Value,
}

#[derive(Debug, Clone)]
pub struct RefundRequest {
    pub transaction_reference: String,
    pub amount_minor: i64,
}

#[derive(Debug, Clone)]
pub struct RefundResponse {
    pub gateway_refund_id: String,
}

#[derive(Debug, Clone)]
pub struct CreateSubaccountRequest {
    pub business_name: String,
    pub bank_code: String,
    pub account_number: String,
    pub percentage_charge: f64,
}

#[derive(Debug, Clone)]
pub struct SubaccountResponse {
    pub subaccount_code: String,
}

/**
 * PaymentGateway: the provider port
 *
 * Every call is bounded by the configured gateway timeout. Implementations
 * map provider-level failure to AppError::GatewayFailure; the engine decides
 * what that does to the transaction.
 */
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initialize(&self, req: InitializeRequest) -> Result<InitializeResponse>;

    async fn verify(&self, reference: &str) -> Result<VerifyResponse>;

    async fn refund(&self, req: RefundRequest) -> Result<RefundResponse>;

    async fn create_subaccount(&self, req: CreateSubaccountRequest) -> Result<SubaccountResponse>;

    /// Constant-time check of a webhook body against its signature header.
    /// An unconfigured secret always fails - webhooks are disabled, not open.
    fn verify_signature(&self, body: &[u8], signature: &str) -> bool;
}
