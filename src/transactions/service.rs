/**
 * USE CASE LAYER - Transaction Engine
 *
 * The payment-order-ticket state machine: idempotent initiation, atomic
 * completion, failure, refund accounting, and retry.
 *
 * Atomicity rules:
 * - Initiate writes Order + Transaction in one DB transaction, then calls
 *   the gateway. Uncommitted state never leaks to the gateway; a gateway
 *   error afterwards fails the already-committed transaction.
 * - Complete does all of its work (counters, splits, ticket minting) under
 *   one DB transaction holding the Transaction, Order and Event row locks.
 * - Refund rolls the whole DB transaction back when the gateway refuses.
 */

use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::audit::AuditEmitter;
use crate::clock::{ClockSource, IdSource};
use crate::error::{AppError, Result};
use crate::gateway::{ChargeStatus, InitializeRequest, PaymentGateway, RefundRequest, VerifyResponse};
use crate::splits;
use crate::token::TicketTokenCodec;

use super::dto::{
    ClientMeta, CompletionOutcome, InitiateOutcome, Order, OrderPaymentStatus, PurchaseRequest,
    Refund, RetryOutcome, Ticket, TicketStatus, Transaction,
};
use super::repository::TransactionRepository;
use super::retry::RetryPolicy;
use super::state::{ensure_transition, TransactionStatus};

// Re-sign attempts before a qr_code collision becomes an integrity error.
const MAX_QR_ATTEMPTS: u32 = 3;

const MIN_QUANTITY: i32 = 1;
const MAX_QUANTITY: i32 = 10;

pub struct TransactionEngine {
    repo: TransactionRepository,
    gateway: Arc<dyn PaymentGateway>,
    codec: TicketTokenCodec,
    clock: Arc<dyn ClockSource>,
    ids: Arc<dyn IdSource>,
    audit: AuditEmitter,
    retry_policy: RetryPolicy,
    default_organizer_percent: i64,
    currency: String,
    max_retries: i32,
}

impl TransactionEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repo: TransactionRepository,
        gateway: Arc<dyn PaymentGateway>,
        codec: TicketTokenCodec,
        clock: Arc<dyn ClockSource>,
        ids: Arc<dyn IdSource>,
        audit: AuditEmitter,
        retry_policy: RetryPolicy,
        default_organizer_percent: i64,
        currency: String,
        max_retries: i32,
    ) -> Self {
        Self {
            repo,
            gateway,
            codec,
            clock,
            ids,
            audit,
            retry_policy,
            default_organizer_percent,
            currency,
            max_retries,
        }
    }

    /**
     * Initiate: create the Order + Transaction pair and open a checkout
     *
     * Preconditions checked in order, each failing fast: quantity bounds,
     * event purchasable, tier capacity, per-user tier limit, then the
     * idempotency lookup (authoritative - an existing key returns the
     * original result with no gateway call and no new rows).
     *
     * Inventory is NOT reserved here; sold_count moves at Complete. A
     * concurrent duplicate initiate collapses on the idempotency_key unique
     * constraint - the loser reloads the winning row and returns it.
     */
    pub async fn initiate(
        &self,
        user_id: Uuid,
        req: PurchaseRequest,
        idempotency_key: Option<String>,
        meta: ClientMeta,
    ) -> Result<InitiateOutcome> {
        if !(MIN_QUANTITY..=MAX_QUANTITY).contains(&req.quantity) {
            return Err(AppError::Validation(format!(
                "quantity must be between {} and {}",
                MIN_QUANTITY, MAX_QUANTITY
            )));
        }

        let event = self
            .repo
            .get_event(req.event_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".into()))?;
        if !event.is_purchasable() {
            return Err(AppError::Validation("Event is not open for sale".into()));
        }

        let tier = self
            .repo
            .get_tier(req.event_id, req.tier_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Ticket tier not found".into()))?;

        let now = self.clock.now();
        if tier.sale_start.is_some_and(|start| now < start)
            || tier.sale_end.is_some_and(|end| now > end)
        {
            return Err(AppError::Validation("Tier is not currently on sale".into()));
        }
        if tier.remaining() < req.quantity {
            return Err(AppError::SoldOut);
        }

        let held = self
            .repo
            .count_user_tier_tickets(user_id, req.event_id, req.tier_id)
            .await?;
        if held + req.quantity as i64 > tier.max_per_user as i64 {
            return Err(AppError::Validation(format!(
                "per-user limit is {} tickets for this tier",
                tier.max_per_user
            )));
        }

        // Idempotency: an existing key short-circuits everything below
        if let Some(key) = &idempotency_key {
            if let Some(existing) = self.repo.find_by_idempotency_key(key).await? {
                return self.idempotent_outcome(existing).await;
            }
        }

        let email = self
            .repo
            .get_user_email(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;
        let organizer = self.repo.get_organizer(event.organizer_id).await?;
        let subaccount_code = organizer.as_ref().and_then(|o| o.subaccount_code.clone());

        let now_ns = self.clock.now_ns();
        let key = idempotency_key
            .unwrap_or_else(|| synthesized_idempotency_key(user_id, req.event_id, req.tier_id, now_ns));
        let reference = order_reference(now_ns, user_id);
        let total_minor = tier.price_minor * req.quantity as i64;

        let order = Order {
            id: self.ids.mint(),
            user_id,
            event_id: req.event_id,
            tier_id: req.tier_id,
            tier_name: tier.name.clone(),
            quantity: req.quantity,
            unit_price_minor: tier.price_minor,
            total_minor,
            payment_status: OrderPaymentStatus::Pending,
            platform_minor: None,
            organizer_minor: None,
            gateway_reference: Some(reference.clone()),
            gateway_channel: None,
            paid_at: None,
            tickets: Vec::new(),
            created_at: now,
        };
        let mut txn = Transaction {
            id: self.ids.mint(),
            idempotency_key: key.clone(),
            status: TransactionStatus::Initiated,
            user_id,
            order_id: order.id,
            event_id: req.event_id,
            amount_minor: total_minor,
            currency: self.currency.clone(),
            gateway_provider: "paystack".to_string(),
            gateway_reference: reference.clone(),
            gateway_authorization_url: None,
            gateway_transaction_id: None,
            gateway_channel: None,
            gateway_authorization: None,
            gateway_response: None,
            gateway_fees_minor: None,
            platform_minor: None,
            organizer_minor: None,
            subaccount_code: subaccount_code.clone(),
            retry_count: 0,
            max_retries: self.max_retries,
            last_retry_at: None,
            next_retry_at: None,
            failure_reason: None,
            failure_code: None,
            failure_details: None,
            total_refunded_minor: 0,
            initiated_at: now,
            processing_at: None,
            completed_at: None,
            failed_at: None,
            meta_ip: meta.ip,
            meta_user_agent: meta.user_agent,
            tier_name: tier.name.clone(),
            quantity: req.quantity,
        };

        // Commit the pair before any gateway traffic
        let mut tx = self.repo.pool().begin().await?;
        self.repo.insert_order_tx(&mut tx, &order).await?;
        match self.repo.insert_transaction_tx(&mut tx, &txn).await {
            Ok(()) => tx.commit().await?,
            Err(err) if super::repository::is_unique_violation(&err) => {
                // Lost a concurrent initiate with the same key; the winner's
                // row is the authoritative result
                drop(tx);
                let winner = self
                    .repo
                    .find_by_idempotency_key(&key)
                    .await?
                    .ok_or_else(|| AppError::Internal("idempotency winner vanished".into()))?;
                return self.idempotent_outcome(winner).await;
            }
            Err(err) => return Err(err.into()),
        }

        let init = match self
            .gateway
            .initialize(InitializeRequest {
                email,
                amount_minor: total_minor,
                reference: reference.clone(),
                subaccount_code,
                metadata: json!({
                    "order_id": order.id,
                    "event_id": req.event_id,
                    "tier": tier.name,
                    "quantity": req.quantity,
                }),
            })
            .await
        {
            Ok(init) => init,
            Err(err) => {
                self.fail(txn.id, "init failed", Some("GATEWAY_INIT"), None).await?;
                return Err(err);
            }
        };

        self.repo
            .set_authorization_url(txn.id, &init.authorization_url)
            .await?;
        txn.gateway_authorization_url = Some(init.authorization_url.clone());

        self.audit.emit(
            "transaction.initiated",
            Some(user_id),
            "transaction",
            &txn.id.to_string(),
            json!({ "reference": reference, "amount_minor": total_minor, "quantity": req.quantity }),
        );

        Ok(InitiateOutcome {
            order,
            transaction: txn,
            payment_url: init.authorization_url,
            idempotency_key: key,
            is_idempotent: false,
        })
    }

    // Rehydrate the original result for a repeated idempotency key.
    async fn idempotent_outcome(&self, txn: Transaction) -> Result<InitiateOutcome> {
        let order = self
            .repo
            .get_order(txn.order_id)
            .await?
            .ok_or_else(|| AppError::Internal("transaction without order".into()))?;
        let payment_url = txn.gateway_authorization_url.clone().unwrap_or_default();
        let idempotency_key = txn.idempotency_key.clone();
        Ok(InitiateOutcome {
            order,
            transaction: txn,
            payment_url,
            idempotency_key,
            is_idempotent: true,
        })
    }

    /**
     * Verify a charge by reference and complete on success
     *
     * The return path for buyers coming back from checkout. The gateway is
     * the source of truth; a failed charge fails the transaction.
     */
    pub async fn verify_by_reference(&self, reference: &str) -> Result<CompletionOutcome> {
        let txn = self
            .repo
            .find_by_reference(reference)
            .await?
            .ok_or_else(|| AppError::NotFound("Transaction not found".into()))?;

        let data = self.gateway.verify(reference).await?;
        match data.status {
            ChargeStatus::Success => self.complete(txn.id, &data).await,
            ChargeStatus::Failed => {
                self.fail(txn.id, "verification failed", Some("CHARGE_FAILED"), None)
                    .await?;
                Err(AppError::BadRequest("Payment verification failed".into()))
            }
        }
    }

    /**
     * Complete: the one place tickets are minted and counters move
     *
     * Idempotent at the completion boundary: verifier and webhook may both
     * land here for the same charge; whoever takes the row lock second sees
     * status=completed and gets the existing result back.
     *
     * Oversell discovered here (initiate holds no tier lock) is a recovery
     * path: the transaction fails, a full-refund intent goes to the outbox,
     * and sold_count is left untouched.
     */
    pub async fn complete(
        &self,
        transaction_id: Uuid,
        data: &VerifyResponse,
    ) -> Result<CompletionOutcome> {
        let mut tx = self.repo.pool().begin().await?;
        let mut txn = self
            .repo
            .find_by_id_for_update(&mut tx, transaction_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Transaction not found".into()))?;

        if txn.status == TransactionStatus::Completed {
            drop(tx);
            let order = self
                .repo
                .get_order(txn.order_id)
                .await?
                .ok_or_else(|| AppError::Internal("transaction without order".into()))?;
            let tickets = self.repo.tickets_for_order(order.id).await?;
            return Ok(CompletionOutcome {
                transaction: txn,
                order,
                tickets,
                already_completed: true,
            });
        }

        let now = self.clock.now();
        if txn.status == TransactionStatus::Initiated {
            ensure_transition(txn.status, TransactionStatus::Processing)?;
            txn.status = TransactionStatus::Processing;
            txn.processing_at = Some(now);
        }
        ensure_transition(txn.status, TransactionStatus::Completed)?;

        let mut order = self
            .repo
            .get_order_for_update(&mut tx, txn.order_id)
            .await?
            .ok_or_else(|| AppError::Internal("transaction without order".into()))?;
        let event = self
            .repo
            .get_event_for_update(&mut tx, txn.event_id)
            .await?
            .ok_or_else(|| AppError::Internal("transaction without event".into()))?;
        let tier = self
            .repo
            .get_tier_for_update(&mut tx, event.id, order.tier_id)
            .await?
            .ok_or_else(|| AppError::Internal("order without tier".into()))?;

        // Re-check capacity under the locks, then claim through the guarded
        // update (the second tier of oversell protection)
        let claimed = tier.remaining() >= order.quantity
            && self
                .repo
                .try_claim_inventory_tx(&mut tx, tier.event_id, tier.id, order.quantity)
                .await?;
        if !claimed {
            self.repo
                .mark_failed_tx(&mut tx, txn.id, now, "oversold at completion", Some("OVERSOLD"), None)
                .await?;
            self.repo
                .set_order_status_tx(&mut tx, order.id, OrderPaymentStatus::Failed)
                .await?;
            self.repo
                .insert_refund_outbox_tx(&mut tx, txn.id, txn.amount_minor, "oversold at completion")
                .await?;
            tx.commit().await?;

            self.audit.emit(
                "transaction.oversold",
                Some(txn.user_id),
                "transaction",
                &txn.id.to_string(),
                json!({ "tier_id": order.tier_id, "quantity": order.quantity }),
            );
            return Err(AppError::Conflict("oversold at completion".into()));
        }

        self.repo
            .bump_event_counters_tx(&mut tx, event.id, order.quantity, order.total_minor)
            .await?;

        let organizer = self.repo.get_organizer(event.organizer_id).await?;
        let organizer_percent = organizer
            .as_ref()
            .map(|o| 100 - o.platform_fee_percent)
            .unwrap_or(self.default_organizer_percent);
        let splits = splits::resolve(
            order.total_minor,
            organizer_percent,
            data.fees_minor,
            data.subaccount.as_ref().map(|s| s.shared_amount_minor),
        );

        let mut tickets = Vec::with_capacity(order.quantity as usize);
        for _ in 0..order.quantity {
            let ticket = self.mint_ticket(&mut tx, &order).await?;
            tickets.push(ticket);
        }

        order.payment_status = OrderPaymentStatus::Completed;
        order.platform_minor = Some(splits.platform_minor);
        order.organizer_minor = Some(splits.organizer_minor);
        order.gateway_channel = data.channel.clone();
        order.paid_at = Some(data.paid_at.unwrap_or(now));
        order.tickets = tickets.iter().map(|t| t.id).collect();
        self.repo.complete_order_tx(&mut tx, &order).await?;

        txn.status = TransactionStatus::Completed;
        txn.completed_at = Some(now);
        txn.gateway_transaction_id = data.transaction_id.clone();
        txn.gateway_channel = data.channel.clone();
        txn.gateway_authorization = data.authorization.clone();
        txn.gateway_response = Some(data.raw.clone());
        txn.gateway_fees_minor = data.fees_minor;
        txn.platform_minor = Some(splits.platform_minor);
        txn.organizer_minor = Some(splits.organizer_minor);
        if let Some(code) = data.subaccount.as_ref().and_then(|s| s.code.clone()) {
            txn.subaccount_code = Some(code);
        }
        self.repo.complete_transaction_tx(&mut tx, &txn).await?;

        tx.commit().await?;

        self.audit.emit(
            "transaction.completed",
            Some(txn.user_id),
            "transaction",
            &txn.id.to_string(),
            json!({
                "amount_minor": txn.amount_minor,
                "platform_minor": splits.platform_minor,
                "organizer_minor": splits.organizer_minor,
                "tickets": order.tickets.len(),
            }),
        );

        Ok(CompletionOutcome {
            transaction: txn,
            order,
            tickets,
            already_completed: false,
        })
    }

    // Mint one ticket with a signed token. ON CONFLICT keeps the enclosing
    // DB transaction healthy on a qr_code collision; a fresh iat changes the
    // signature for the next attempt.
    async fn mint_ticket(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        order: &Order,
    ) -> Result<Ticket> {
        for attempt in 0..MAX_QR_ATTEMPTS {
            let ticket_id = self.ids.mint();
            let qr_code = self.codec.sign(
                &ticket_id.to_string(),
                &order.event_id.to_string(),
                self.clock.now_ms(),
            );
            let ticket = Ticket {
                id: ticket_id,
                order_id: order.id,
                event_id: order.event_id,
                user_id: order.user_id,
                tier_id: order.tier_id,
                tier_name: order.tier_name.clone(),
                price_minor: order.unit_price_minor,
                qr_code,
                status: TicketStatus::Valid,
                checked_in_at: None,
                checked_in_by: None,
                created_at: self.clock.now(),
            };
            if self.repo.insert_ticket_tx(tx, &ticket).await? {
                return Ok(ticket);
            }
            tracing::warn!(
                "qr_code collision for order {} (attempt {})",
                order.id,
                attempt + 1
            );
        }

        self.audit.system_error(
            "ticket.mint",
            json!({ "order_id": order.id, "attempts": MAX_QR_ATTEMPTS }),
        );
        Err(AppError::Integrity(format!(
            "duplicate qr_code after {} attempts",
            MAX_QR_ATTEMPTS
        )))
    }

    /**
     * Fail: park the transaction with a reason
     *
     * No-op when already failed (webhook retries land here). No side
     * effects on event or tier counters.
     */
    pub async fn fail(
        &self,
        transaction_id: Uuid,
        reason: &str,
        code: Option<&str>,
        details: Option<&str>,
    ) -> Result<Transaction> {
        let mut tx = self.repo.pool().begin().await?;
        let mut txn = self
            .repo
            .find_by_id_for_update(&mut tx, transaction_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Transaction not found".into()))?;

        if txn.status == TransactionStatus::Failed {
            return Ok(txn);
        }
        ensure_transition(txn.status, TransactionStatus::Failed)?;

        let now = self.clock.now();
        self.repo
            .mark_failed_tx(&mut tx, txn.id, now, reason, code, details)
            .await?;
        self.repo
            .set_order_status_tx(&mut tx, txn.order_id, OrderPaymentStatus::Failed)
            .await?;
        tx.commit().await?;

        txn.status = TransactionStatus::Failed;
        txn.failed_at = Some(now);
        txn.failure_reason = Some(reason.to_string());
        txn.failure_code = code.map(|s| s.to_string());
        txn.failure_details = details.map(|s| s.to_string());

        self.audit.emit(
            "transaction.failed",
            Some(txn.user_id),
            "transaction",
            &txn.id.to_string(),
            json!({ "reason": reason, "code": code }),
        );
        Ok(txn)
    }

    /**
     * Refund: append-only accounting against the original charge
     *
     * Gateway refusal rolls back everything - no refund record without a
     * gateway refund id. Tier counts are never decremented; tickets are
     * cancelled only when the refund becomes full.
     */
    pub async fn refund(
        &self,
        transaction_id: Uuid,
        amount_minor: Option<i64>,
        reason: &str,
        processed_by: Uuid,
    ) -> Result<Transaction> {
        let mut tx = self.repo.pool().begin().await?;
        let mut txn = self
            .repo
            .find_by_id_for_update(&mut tx, transaction_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Transaction not found".into()))?;

        if !matches!(
            txn.status,
            TransactionStatus::Completed | TransactionStatus::PartiallyRefunded
        ) {
            return Err(AppError::BadRequest("Transaction is not refundable".into()));
        }

        let net = txn.refundable_minor();
        if net <= 0 {
            return Err(AppError::BadRequest("Nothing left to refund".into()));
        }
        let amount = amount_minor.unwrap_or(net);
        if amount <= 0 {
            return Err(AppError::Validation("Refund amount must be positive".into()));
        }
        if amount > net {
            return Err(AppError::Validation(format!(
                "Refund exceeds refundable amount ({} minor units left)",
                net
            )));
        }

        // Money moves first; if the gateway refuses, nothing is recorded
        let gateway_refund = self
            .gateway
            .refund(RefundRequest {
                transaction_reference: txn.gateway_reference.clone(),
                amount_minor: amount,
            })
            .await?;

        let now = self.clock.now();
        let new_total = txn.total_refunded_minor + amount;
        let full = new_total == txn.amount_minor;
        let new_status = if full {
            TransactionStatus::Refunded
        } else {
            TransactionStatus::PartiallyRefunded
        };
        // A second partial refund stays partially_refunded; only actual
        // status changes go through the transition table
        if new_status != txn.status {
            ensure_transition(txn.status, new_status)?;
        }

        let refund = Refund {
            id: self.ids.mint(),
            transaction_id: txn.id,
            amount_minor: amount,
            reason: reason.to_string(),
            processed_by,
            processed_at: now,
            gateway_refund_id: Some(gateway_refund.gateway_refund_id),
        };
        self.repo.insert_refund_tx(&mut tx, &refund).await?;
        self.repo
            .apply_refund_tx(&mut tx, txn.id, new_total, new_status)
            .await?;

        if full {
            self.repo
                .set_order_status_tx(&mut tx, txn.order_id, OrderPaymentStatus::Refunded)
                .await?;
            self.repo.cancel_order_tickets_tx(&mut tx, txn.order_id).await?;
        }
        tx.commit().await?;

        txn.total_refunded_minor = new_total;
        txn.status = new_status;

        self.audit.emit(
            "transaction.refunded",
            Some(processed_by),
            "transaction",
            &txn.id.to_string(),
            json!({ "amount_minor": amount, "full": full, "total_refunded_minor": new_total }),
        );
        Ok(txn)
    }

    /**
     * Retry: reopen a failed transaction against a fresh gateway session
     *
     * failed -> processing with a new reference; a gateway error drops it
     * back to failed and schedules the next attempt for the RetryScheduler.
     */
    pub async fn retry(&self, transaction_id: Uuid) -> Result<RetryOutcome> {
        let mut tx = self.repo.pool().begin().await?;
        let mut txn = self
            .repo
            .find_by_id_for_update(&mut tx, transaction_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Transaction not found".into()))?;

        if txn.status != TransactionStatus::Failed {
            return Err(AppError::BadRequest("Transaction is not retryable".into()));
        }
        if txn.retry_count >= txn.max_retries {
            return Err(AppError::RetryExhausted);
        }
        ensure_transition(txn.status, TransactionStatus::Processing)?;

        let now = self.clock.now();
        let new_count = txn.retry_count + 1;
        let reference = retry_reference(new_count, self.clock.now_ns(), txn.user_id);
        self.repo
            .mark_retrying_tx(&mut tx, txn.id, new_count, now, &reference)
            .await?;
        tx.commit().await?;

        txn.status = TransactionStatus::Processing;
        txn.retry_count = new_count;
        txn.last_retry_at = Some(now);
        txn.processing_at = Some(now);
        txn.next_retry_at = None;
        txn.gateway_reference = reference.clone();

        let email = self
            .repo
            .get_user_email(txn.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;

        match self
            .gateway
            .initialize(InitializeRequest {
                email,
                amount_minor: txn.amount_minor,
                reference: reference.clone(),
                subaccount_code: txn.subaccount_code.clone(),
                metadata: json!({ "order_id": txn.order_id, "retry": new_count }),
            })
            .await
        {
            Ok(init) => {
                self.repo
                    .set_authorization_url(txn.id, &init.authorization_url)
                    .await?;
                txn.gateway_authorization_url = Some(init.authorization_url.clone());

                self.audit.emit(
                    "transaction.retried",
                    Some(txn.user_id),
                    "transaction",
                    &txn.id.to_string(),
                    json!({ "retry_count": new_count, "reference": reference }),
                );
                Ok(RetryOutcome {
                    transaction: txn,
                    payment_url: init.authorization_url,
                })
            }
            Err(err) => {
                let failed = self
                    .fail(txn.id, "retry init failed", Some("GATEWAY_INIT"), None)
                    .await?;
                let delay_ms = self.retry_policy.delay_ms(new_count);
                self.repo
                    .set_next_retry(failed.id, now + chrono::Duration::milliseconds(delay_ms))
                    .await?;
                Err(err)
            }
        }
    }

    // ---- reads used by handlers and the scheduler ----

    pub async fn find_by_reference(&self, reference: &str) -> Result<Option<Transaction>> {
        Ok(self.repo.find_by_reference(reference).await?)
    }

    pub async fn user_transactions(&self, user_id: Uuid) -> Result<Vec<Transaction>> {
        Ok(self.repo.user_transactions(user_id).await?)
    }

    pub async fn user_tickets(&self, user_id: Uuid) -> Result<Vec<Ticket>> {
        Ok(self.repo.user_tickets(user_id).await?)
    }

    pub async fn transaction_refunds(&self, id: Uuid) -> Result<Vec<Refund>> {
        Ok(self.repo.refunds_for_transaction(id).await?)
    }

    /// Failed transactions due for another attempt.
    pub async fn due_retries(&self, limit: i64) -> Result<Vec<Transaction>> {
        Ok(self.repo.due_retries(self.clock.now(), limit).await?)
    }
}

// Gateway reference and idempotency key formats. References must be unique
// per gateway session; the nanosecond component guarantees that within a
// single process and makes collisions across processes implausible.

fn order_reference(now_ns: i64, user_id: Uuid) -> String {
    format!("order_{}_{}", now_ns, user_id)
}

fn retry_reference(retry_count: i32, now_ns: i64, user_id: Uuid) -> String {
    format!("retry_{}_{}_{}", retry_count, now_ns, user_id)
}

fn synthesized_idempotency_key(user_id: Uuid, event_id: Uuid, tier_id: Uuid, now_ns: i64) -> String {
    format!("txn_{}_{}_{}_{}", user_id, event_id, tier_id, now_ns)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uuid(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    #[test]
    fn order_reference_format() {
        let reference = order_reference(1_700_000_000_000_000_000, uuid(7));
        assert_eq!(
            reference,
            "order_1700000000000000000_00000000-0000-0000-0000-000000000007"
        );
    }

    #[test]
    fn retry_reference_carries_attempt_number() {
        let reference = retry_reference(2, 42, uuid(7));
        assert!(reference.starts_with("retry_2_42_"));
    }

    #[test]
    fn synthesized_key_is_scoped_to_user_event_tier() {
        let a = synthesized_idempotency_key(uuid(1), uuid(2), uuid(3), 99);
        let b = synthesized_idempotency_key(uuid(1), uuid(2), uuid(4), 99);
        assert_ne!(a, b);
        assert!(a.starts_with("txn_"));
    }

    #[test]
    fn distinct_instants_produce_distinct_references() {
        assert_ne!(order_reference(1, uuid(7)), order_reference(2, uuid(7)));
    }
}
