/**
 * INFRASTRUCTURE LAYER - Paystack Client
 *
 * Concrete PaymentGateway implementation over the Paystack REST API.
 *
 * Dev mode: with no secret configured, initialize() hands back a mock
 * checkout URL so local flows keep moving; verify/refund refuse instead of
 * pretending money moved.
 */

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha512;
use std::time::Duration;

use crate::error::{AppError, Result};
use super::{
    ChargeStatus, CreateSubaccountRequest, InitializeRequest, InitializeResponse, PaymentGateway,
    RefundRequest, RefundResponse, SubaccountResponse, SubaccountShare, VerifyResponse,
};

const BASE_URL: &str = "https://api.paystack.co";

pub struct PaystackGateway {
    client: reqwest::Client,
    secret_key: String,
}

impl PaystackGateway {
    pub fn new(secret_key: String, timeout_ms: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .expect("reqwest client construction cannot fail with static config");
        Self { client, secret_key }
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.secret_key)
    }

    // POST a JSON body and return the parsed response body.
    async fn post(&self, path: &str, body: Value) -> Result<Value> {
        let resp = self
            .client
            .post(format!("{}{}", BASE_URL, path))
            .header("Authorization", self.auth_header())
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::GatewayFailure(format!("paystack request failed: {}", e)))?;

        resp.json()
            .await
            .map_err(|e| AppError::GatewayFailure(format!("paystack response parse failed: {}", e)))
    }

    async fn get(&self, path: &str) -> Result<Value> {
        let resp = self
            .client
            .get(format!("{}{}", BASE_URL, path))
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| AppError::GatewayFailure(format!("paystack request failed: {}", e)))?;

        resp.json()
            .await
            .map_err(|e| AppError::GatewayFailure(format!("paystack response parse failed: {}", e)))
    }
}

#[async_trait]
impl PaymentGateway for PaystackGateway {
    async fn initialize(&self, req: InitializeRequest) -> Result<InitializeResponse> {
        // Dev mode: no credentials, no API call
        if self.secret_key.is_empty() {
            return Ok(InitializeResponse {
                authorization_url: format!("https://checkout.paystack.com/mock/{}", req.reference),
                reference: req.reference,
                access_code: None,
            });
        }

        let mut body = json!({
            "email": req.email,
            "amount": req.amount_minor,
            "reference": req.reference.clone(),
            "metadata": req.metadata,
        });
        if let Some(code) = &req.subaccount_code {
            body["subaccount"] = json!(code);
        }

        let resp = self.post("/transaction/initialize", body).await?;
        if !resp["status"].as_bool().unwrap_or(false) {
            return Err(AppError::GatewayFailure(
                resp["message"].as_str().unwrap_or("initialize rejected").to_string(),
            ));
        }

        let authorization_url = resp["data"]["authorization_url"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| AppError::GatewayFailure("paystack did not return authorization_url".into()))?;

        Ok(InitializeResponse {
            authorization_url,
            reference: resp["data"]["reference"]
                .as_str()
                .map(|s| s.to_string())
                .unwrap_or(req.reference),
            access_code: resp["data"]["access_code"].as_str().map(|s| s.to_string()),
        })
    }

    async fn verify(&self, reference: &str) -> Result<VerifyResponse> {
        if self.secret_key.is_empty() {
            return Err(AppError::GatewayFailure("gateway credentials not configured".into()));
        }

        let resp = self.get(&format!("/transaction/verify/{}", reference)).await?;
        if !resp["status"].as_bool().unwrap_or(false) {
            return Err(AppError::GatewayFailure(
                resp["message"].as_str().unwrap_or("verify rejected").to_string(),
            ));
        }

        let data = &resp["data"];
        Ok(parse_verify_data(data))
    }

    async fn refund(&self, req: RefundRequest) -> Result<RefundResponse> {
        if self.secret_key.is_empty() {
            return Err(AppError::GatewayRefund("gateway credentials not configured".into()));
        }

        let resp = self
            .post(
                "/refund",
                json!({
                    "transaction": req.transaction_reference,
                    "amount": req.amount_minor,
                }),
            )
            .await?;

        if !resp["status"].as_bool().unwrap_or(false) {
            return Err(AppError::GatewayRefund(
                resp["message"].as_str().unwrap_or("refund rejected").to_string(),
            ));
        }

        let refund_id = resp["data"]["id"]
            .as_i64()
            .map(|id| id.to_string())
            .or_else(|| resp["data"]["id"].as_str().map(|s| s.to_string()))
            .ok_or_else(|| AppError::GatewayRefund("paystack did not return a refund id".into()))?;

        Ok(RefundResponse { gateway_refund_id: refund_id })
    }

    async fn create_subaccount(&self, req: CreateSubaccountRequest) -> Result<SubaccountResponse> {
        if self.secret_key.is_empty() {
            return Err(AppError::GatewayFailure("gateway credentials not configured".into()));
        }

        let resp = self
            .post(
                "/subaccount",
                json!({
                    "business_name": req.business_name,
                    "settlement_bank": req.bank_code,
                    "account_number": req.account_number,
                    "percentage_charge": req.percentage_charge,
                }),
            )
            .await?;

        if !resp["status"].as_bool().unwrap_or(false) {
            return Err(AppError::GatewayFailure(
                resp["message"].as_str().unwrap_or("subaccount creation rejected").to_string(),
            ));
        }

        resp["data"]["subaccount_code"]
            .as_str()
            .map(|code| SubaccountResponse { subaccount_code: code.to_string() })
            .ok_or_else(|| AppError::GatewayFailure("paystack did not return subaccount_code".into()))
    }

    /**
     * Verify the x-paystack-signature header: hex(HMAC_SHA512(secret, body))
     *
     * The hex signature is decoded and checked with Mac::verify_slice, which
     * compares in constant time. Missing secret or undecodable signature
     * fails closed.
     */
    fn verify_signature(&self, body: &[u8], signature: &str) -> bool {
        if self.secret_key.is_empty() {
            return false;
        }
        let Ok(sig_bytes) = hex::decode(signature) else {
            return false;
        };
        let mut mac = Hmac::<Sha512>::new_from_slice(self.secret_key.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(body);
        mac.verify_slice(&sig_bytes).is_ok()
    }
}

/**
 * Map a Paystack verify/webhook `data` object into the port's VerifyResponse
 *
 * Shared by the verify endpoint and the webhook processor so both completion
 * paths see identical gateway data.
 */
pub fn parse_verify_data(data: &Value) -> VerifyResponse {
    let status = match data["status"].as_str() {
        Some("success") => ChargeStatus::Success,
        _ => ChargeStatus::Failed,
    };

    VerifyResponse {
        status,
        amount_minor: data["amount"].as_i64().unwrap_or(0),
        fees_minor: data["fees"].as_i64(),
        channel: data["channel"].as_str().map(|s| s.to_string()),
        paid_at: data["paid_at"]
            .as_str()
            .and_then(|s| s.parse::<DateTime<Utc>>().ok()),
        transaction_id: data["id"].as_i64().map(|id| id.to_string()),
        authorization: data.get("authorization").filter(|v| v.is_object()).cloned(),
        subaccount: parse_subaccount(data),
        raw: data.clone(),
    }
}

// The platform's share of a split charge. Paystack reports it either inside
// fees_split (integration = platform) or as share_amount on the subaccount.
fn parse_subaccount(data: &Value) -> Option<SubaccountShare> {
    let sub = data.get("subaccount")?;
    if !sub.is_object() || sub.as_object().is_some_and(|o| o.is_empty()) {
        return None;
    }
    let shared_amount_minor = data["fees_split"]["integration"]
        .as_i64()
        .or_else(|| sub["share_amount"].as_i64())?;
    Some(SubaccountShare {
        code: sub["subaccount_code"].as_str().map(|s| s.to_string()),
        shared_amount_minor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn signed(secret: &str, body: &[u8]) -> String {
        let mut mac = Hmac::<Sha512>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn valid_signature_is_accepted() {
        let gw = PaystackGateway::new("whsec".into(), 15_000);
        let body = br#"{"event":"charge.success"}"#;
        assert!(gw.verify_signature(body, &signed("whsec", body)));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let gw = PaystackGateway::new("whsec".into(), 15_000);
        let body = br#"{"event":"charge.success"}"#;
        assert!(!gw.verify_signature(body, &signed("other", body)));
    }

    #[test]
    fn tampered_body_is_rejected() {
        let gw = PaystackGateway::new("whsec".into(), 15_000);
        let sig = signed("whsec", br#"{"event":"charge.success"}"#);
        assert!(!gw.verify_signature(br#"{"event":"charge.failed"}"#, &sig));
    }

    #[test]
    fn missing_secret_fails_closed() {
        let gw = PaystackGateway::new(String::new(), 15_000);
        let body = br#"{}"#;
        assert!(!gw.verify_signature(body, &signed("", body)));
    }

    #[test]
    fn non_hex_signature_is_rejected() {
        let gw = PaystackGateway::new("whsec".into(), 15_000);
        assert!(!gw.verify_signature(b"{}", "zz-not-hex"));
    }

    #[test]
    fn verify_data_maps_success_fields() {
        let data = json!({
            "status": "success",
            "amount": 10_000,
            "fees": 150,
            "channel": "card",
            "id": 12345,
            "paid_at": "2026-03-01T18:00:00Z",
            "authorization": {"card_type": "visa", "last4": "4081", "bank": "GTB"},
        });
        let parsed = parse_verify_data(&data);
        assert_eq!(parsed.status, ChargeStatus::Success);
        assert_eq!(parsed.amount_minor, 10_000);
        assert_eq!(parsed.fees_minor, Some(150));
        assert_eq!(parsed.channel.as_deref(), Some("card"));
        assert_eq!(parsed.transaction_id.as_deref(), Some("12345"));
        assert!(parsed.paid_at.is_some());
        assert!(parsed.subaccount.is_none());
    }

    #[test]
    fn verify_data_maps_subaccount_share() {
        let data = json!({
            "status": "success",
            "amount": 10_000,
            "subaccount": {"subaccount_code": "ACCT_x", "share_amount": 1_000},
        });
        let sub = parse_verify_data(&data).subaccount.expect("subaccount present");
        assert_eq!(sub.code.as_deref(), Some("ACCT_x"));
        assert_eq!(sub.shared_amount_minor, 1_000);
    }

    #[test]
    fn fees_split_integration_wins_over_share_amount() {
        let data = json!({
            "status": "success",
            "amount": 10_000,
            "subaccount": {"subaccount_code": "ACCT_x", "share_amount": 900},
            "fees_split": {"integration": 1_000, "subaccount": 8_850, "paystack": 150},
        });
        let sub = parse_verify_data(&data).subaccount.unwrap();
        assert_eq!(sub.shared_amount_minor, 1_000);
    }

    #[test]
    fn non_success_status_maps_to_failed() {
        for status in ["failed", "abandoned", "pending"] {
            let parsed = parse_verify_data(&json!({"status": status, "amount": 1}));
            assert_eq!(parsed.status, ChargeStatus::Failed, "status: {}", status);
        }
    }
}
