/**
 * REPOSITORY LAYER - Transaction Engine Data Access
 *
 * SQL for transactions, orders, tickets and the product rows the engine
 * locks and counts against. No business logic; services decide, this layer
 * fetches and persists.
 *
 * Methods with a _tx suffix run inside a caller-owned database transaction;
 * that is how multi-statement engine operations stay atomic and how
 * SELECT ... FOR UPDATE row locks are scoped.
 */

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction as PgTx};
use uuid::Uuid;

use super::dto::{
    EventRow, Order, OrderPaymentStatus, OrganizerRow, Refund, Ticket, TicketStatus, TierRow,
    Transaction,
};
use super::state::TransactionStatus;

const TXN_COLUMNS: &str = r#"id, idempotency_key, status, user_id, order_id, event_id,
    amount_minor, currency, gateway_provider, gateway_reference, gateway_authorization_url,
    gateway_transaction_id,
    gateway_channel, gateway_authorization, gateway_response, gateway_fees_minor,
    platform_minor, organizer_minor, subaccount_code, retry_count, max_retries,
    last_retry_at, next_retry_at, failure_reason, failure_code, failure_details,
    total_refunded_minor, initiated_at, processing_at, completed_at, failed_at,
    meta_ip, meta_user_agent, tier_name, quantity"#;

const ORDER_COLUMNS: &str = r#"id, user_id, event_id, tier_id, tier_name, quantity,
    unit_price_minor, total_minor, payment_status, platform_minor, organizer_minor,
    gateway_reference, gateway_channel, paid_at, created_at"#;

const TICKET_COLUMNS: &str = r#"id, order_id, event_id, user_id, tier_id, tier_name,
    price_minor, qr_code, status, checked_in_at, checked_in_by, created_at"#;

#[derive(Clone)]
pub struct TransactionRepository {
    pool: PgPool,
}

impl TransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ---- transaction rows ----

    pub async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Transaction>, sqlx::Error> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM transactions WHERE idempotency_key = $1",
            TXN_COLUMNS
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_transaction).transpose()
    }

    pub async fn find_by_reference(&self, reference: &str) -> Result<Option<Transaction>, sqlx::Error> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM transactions WHERE gateway_reference = $1",
            TXN_COLUMNS
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_transaction).transpose()
    }

    /// Row-locked read; serializes verifier and webhook completion for the
    /// same transaction.
    pub async fn find_by_id_for_update(
        &self,
        tx: &mut PgTx<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<Transaction>, sqlx::Error> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM transactions WHERE id = $1 FOR UPDATE",
            TXN_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
        row.as_ref().map(row_to_transaction).transpose()
    }

    pub async fn user_transactions(&self, user_id: Uuid) -> Result<Vec<Transaction>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM transactions WHERE user_id = $1 ORDER BY initiated_at DESC",
            TXN_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_transaction).collect()
    }

    /// Failed transactions whose backoff has elapsed and that still have
    /// retries left, oldest due first.
    pub async fn due_retries(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Transaction>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            r#"SELECT {} FROM transactions
            WHERE status = 'failed' AND next_retry_at IS NOT NULL
              AND next_retry_at <= $1 AND retry_count < max_retries
            ORDER BY next_retry_at ASC LIMIT $2"#,
            TXN_COLUMNS
        ))
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_transaction).collect()
    }

    pub async fn insert_transaction_tx(
        &self,
        tx: &mut PgTx<'_, Postgres>,
        t: &Transaction,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO transactions
                (id, idempotency_key, status, user_id, order_id, event_id, amount_minor,
                 currency, gateway_provider, gateway_reference, retry_count, max_retries,
                 total_refunded_minor, initiated_at, meta_ip, meta_user_agent, tier_name, quantity)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)"#,
        )
        .bind(t.id)
        .bind(&t.idempotency_key)
        .bind(t.status.as_str())
        .bind(t.user_id)
        .bind(t.order_id)
        .bind(t.event_id)
        .bind(t.amount_minor)
        .bind(&t.currency)
        .bind(&t.gateway_provider)
        .bind(&t.gateway_reference)
        .bind(t.retry_count)
        .bind(t.max_retries)
        .bind(t.total_refunded_minor)
        .bind(t.initiated_at)
        .bind(&t.meta_ip)
        .bind(&t.meta_user_agent)
        .bind(&t.tier_name)
        .bind(t.quantity)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Persist the completed transition: status, stamps, gateway echo, splits.
    pub async fn complete_transaction_tx(
        &self,
        tx: &mut PgTx<'_, Postgres>,
        t: &Transaction,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"UPDATE transactions SET
                status = $2, processing_at = $3, completed_at = $4,
                gateway_transaction_id = $5, gateway_channel = $6,
                gateway_authorization = $7, gateway_response = $8, gateway_fees_minor = $9,
                platform_minor = $10, organizer_minor = $11, subaccount_code = $12
            WHERE id = $1"#,
        )
        .bind(t.id)
        .bind(t.status.as_str())
        .bind(t.processing_at)
        .bind(t.completed_at)
        .bind(&t.gateway_transaction_id)
        .bind(&t.gateway_channel)
        .bind(&t.gateway_authorization)
        .bind(&t.gateway_response)
        .bind(t.gateway_fees_minor)
        .bind(t.platform_minor)
        .bind(t.organizer_minor)
        .bind(&t.subaccount_code)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn mark_failed_tx(
        &self,
        tx: &mut PgTx<'_, Postgres>,
        id: Uuid,
        failed_at: DateTime<Utc>,
        reason: &str,
        code: Option<&str>,
        details: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"UPDATE transactions SET status = 'failed', failed_at = $2,
                failure_reason = $3, failure_code = $4, failure_details = $5
            WHERE id = $1"#,
        )
        .bind(id)
        .bind(failed_at)
        .bind(reason)
        .bind(code)
        .bind(details)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Move failed -> processing for a retry attempt with a fresh reference.
    pub async fn mark_retrying_tx(
        &self,
        tx: &mut PgTx<'_, Postgres>,
        id: Uuid,
        retry_count: i32,
        retried_at: DateTime<Utc>,
        reference: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"UPDATE transactions SET status = 'processing', retry_count = $2,
                last_retry_at = $3, processing_at = $3, next_retry_at = NULL,
                gateway_reference = $4
            WHERE id = $1"#,
        )
        .bind(id)
        .bind(retry_count)
        .bind(retried_at)
        .bind(reference)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Checkout URL persisted after a successful gateway initialize so an
    /// idempotent replay can hand the buyer the same redirect.
    pub async fn set_authorization_url(&self, id: Uuid, url: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE transactions SET gateway_authorization_url = $2 WHERE id = $1")
            .bind(id)
            .bind(url)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_next_retry(
        &self,
        id: Uuid,
        next_retry_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE transactions SET next_retry_at = $2 WHERE id = $1")
            .bind(id)
            .bind(next_retry_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn apply_refund_tx(
        &self,
        tx: &mut PgTx<'_, Postgres>,
        id: Uuid,
        new_total_refunded: i64,
        new_status: TransactionStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE transactions SET total_refunded_minor = $2, status = $3 WHERE id = $1")
            .bind(id)
            .bind(new_total_refunded)
            .bind(new_status.as_str())
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    // ---- refunds ----

    pub async fn insert_refund_tx(
        &self,
        tx: &mut PgTx<'_, Postgres>,
        r: &Refund,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO refunds
                (id, transaction_id, amount_minor, reason, processed_by, processed_at, gateway_refund_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
        )
        .bind(r.id)
        .bind(r.transaction_id)
        .bind(r.amount_minor)
        .bind(&r.reason)
        .bind(r.processed_by)
        .bind(r.processed_at)
        .bind(&r.gateway_refund_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn refunds_for_transaction(&self, id: Uuid) -> Result<Vec<Refund>, sqlx::Error> {
        let rows = sqlx::query(
            r#"SELECT id, transaction_id, amount_minor, reason, processed_by, processed_at,
                      gateway_refund_id
            FROM refunds WHERE transaction_id = $1 ORDER BY processed_at ASC"#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|row| Refund {
                id: row.get("id"),
                transaction_id: row.get("transaction_id"),
                amount_minor: row.get("amount_minor"),
                reason: row.get("reason"),
                processed_by: row.get("processed_by"),
                processed_at: row.get("processed_at"),
                gateway_refund_id: row.get("gateway_refund_id"),
            })
            .collect())
    }

    /// Oversell recovery: park a full-refund intent for the payout process.
    pub async fn insert_refund_outbox_tx(
        &self,
        tx: &mut PgTx<'_, Postgres>,
        transaction_id: Uuid,
        amount_minor: i64,
        reason: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO refund_outbox (transaction_id, amount_minor, reason) VALUES ($1, $2, $3)",
        )
        .bind(transaction_id)
        .bind(amount_minor)
        .bind(reason)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    // ---- orders ----

    pub async fn insert_order_tx(
        &self,
        tx: &mut PgTx<'_, Postgres>,
        o: &Order,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO orders
                (id, user_id, event_id, tier_id, tier_name, quantity, unit_price_minor,
                 total_minor, payment_status, gateway_reference, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"#,
        )
        .bind(o.id)
        .bind(o.user_id)
        .bind(o.event_id)
        .bind(o.tier_id)
        .bind(&o.tier_name)
        .bind(o.quantity)
        .bind(o.unit_price_minor)
        .bind(o.total_minor)
        .bind(o.payment_status.as_str())
        .bind(&o.gateway_reference)
        .bind(o.created_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Order with its ticket id list materialized (ids in creation order).
    pub async fn get_order(&self, id: Uuid) -> Result<Option<Order>, sqlx::Error> {
        let row = sqlx::query(&format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else { return Ok(None) };
        let mut order = row_to_order(&row)?;
        order.tickets = self.ticket_ids_for_order(id).await?;
        Ok(Some(order))
    }

    pub async fn get_order_for_update(
        &self,
        tx: &mut PgTx<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<Order>, sqlx::Error> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM orders WHERE id = $1 FOR UPDATE",
            ORDER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
        row.as_ref().map(row_to_order).transpose()
    }

    pub async fn complete_order_tx(
        &self,
        tx: &mut PgTx<'_, Postgres>,
        o: &Order,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"UPDATE orders SET payment_status = $2, platform_minor = $3, organizer_minor = $4,
                gateway_reference = $5, gateway_channel = $6, paid_at = $7
            WHERE id = $1"#,
        )
        .bind(o.id)
        .bind(o.payment_status.as_str())
        .bind(o.platform_minor)
        .bind(o.organizer_minor)
        .bind(&o.gateway_reference)
        .bind(&o.gateway_channel)
        .bind(o.paid_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn set_order_status_tx(
        &self,
        tx: &mut PgTx<'_, Postgres>,
        id: Uuid,
        status: OrderPaymentStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE orders SET payment_status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    // ---- tickets ----

    /// Returns false on a qr_code collision instead of erroring, so the
    /// caller can re-sign without aborting the enclosing DB transaction.
    pub async fn insert_ticket_tx(
        &self,
        tx: &mut PgTx<'_, Postgres>,
        t: &Ticket,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"INSERT INTO tickets
                (id, order_id, event_id, user_id, tier_id, tier_name, price_minor,
                 qr_code, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (qr_code) DO NOTHING"#,
        )
        .bind(t.id)
        .bind(t.order_id)
        .bind(t.event_id)
        .bind(t.user_id)
        .bind(t.tier_id)
        .bind(t.tier_name.as_str())
        .bind(t.price_minor)
        .bind(&t.qr_code)
        .bind(t.status.as_str())
        .bind(t.created_at)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn tickets_for_order(&self, order_id: Uuid) -> Result<Vec<Ticket>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM tickets WHERE order_id = $1 ORDER BY created_at ASC, id ASC",
            TICKET_COLUMNS
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_ticket).collect()
    }

    async fn ticket_ids_for_order(&self, order_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT id FROM tickets WHERE order_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(|r| r.get("id")).collect())
    }

    pub async fn user_tickets(&self, user_id: Uuid) -> Result<Vec<Ticket>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM tickets WHERE user_id = $1 ORDER BY created_at DESC",
            TICKET_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_ticket).collect()
    }

    /// Tickets counting against a user's per-tier limit.
    pub async fn count_user_tier_tickets(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        tier_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM tickets
            WHERE user_id = $1 AND event_id = $2 AND tier_id = $3 AND status != 'cancelled'"#,
        )
        .bind(user_id)
        .bind(event_id)
        .bind(tier_id)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn cancel_order_tickets_tx(
        &self,
        tx: &mut PgTx<'_, Postgres>,
        order_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tickets SET status = 'cancelled' WHERE order_id = $1 AND status != 'used'",
        )
        .bind(order_id)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }

    // ---- events / tiers / organizers / users ----

    pub async fn get_event(&self, id: Uuid) -> Result<Option<EventRow>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT id, organizer_id, status, deleted_at FROM events WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(row_to_event))
    }

    /// Locks the parent event row; every sold_count mutation for any of the
    /// event's tiers serializes on this lock.
    pub async fn get_event_for_update(
        &self,
        tx: &mut PgTx<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<EventRow>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT id, organizer_id, status, deleted_at FROM events WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(row.as_ref().map(row_to_event))
    }

    pub async fn get_tier(&self, event_id: Uuid, tier_id: Uuid) -> Result<Option<TierRow>, sqlx::Error> {
        let row = sqlx::query(
            r#"SELECT id, event_id, name, price_minor, quantity, sold_count, max_per_user,
                      sale_start, sale_end
            FROM ticket_tiers WHERE event_id = $1 AND id = $2"#,
        )
        .bind(event_id)
        .bind(tier_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(row_to_tier))
    }

    pub async fn get_tier_for_update(
        &self,
        tx: &mut PgTx<'_, Postgres>,
        event_id: Uuid,
        tier_id: Uuid,
    ) -> Result<Option<TierRow>, sqlx::Error> {
        let row = sqlx::query(
            r#"SELECT id, event_id, name, price_minor, quantity, sold_count, max_per_user,
                      sale_start, sale_end
            FROM ticket_tiers WHERE event_id = $1 AND id = $2 FOR UPDATE"#,
        )
        .bind(event_id)
        .bind(tier_id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(row.as_ref().map(row_to_tier))
    }

    /**
     * Claim inventory for a completing order
     *
     * Guarded increment: the WHERE clause re-checks capacity so the update
     * doubles as a compare-and-swap. Zero rows affected means the tier can
     * no longer cover the order - the oversell recovery path takes over.
     * The CHECK constraint on sold_count is the final backstop.
     */
    pub async fn try_claim_inventory_tx(
        &self,
        tx: &mut PgTx<'_, Postgres>,
        event_id: Uuid,
        tier_id: Uuid,
        quantity: i32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"UPDATE ticket_tiers SET sold_count = sold_count + $3
            WHERE event_id = $1 AND id = $2 AND sold_count + $3 <= quantity"#,
        )
        .bind(event_id)
        .bind(tier_id)
        .bind(quantity)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn bump_event_counters_tx(
        &self,
        tx: &mut PgTx<'_, Postgres>,
        event_id: Uuid,
        quantity: i32,
        revenue_minor: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"UPDATE events SET total_tickets_sold = total_tickets_sold + $2,
                total_revenue_minor = total_revenue_minor + $3
            WHERE id = $1"#,
        )
        .bind(event_id)
        .bind(quantity)
        .bind(revenue_minor)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn get_organizer(&self, id: Uuid) -> Result<Option<OrganizerRow>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT subaccount_code, platform_fee_percent FROM organizers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| OrganizerRow {
            subaccount_code: r.get("subaccount_code"),
            platform_fee_percent: r.get("platform_fee_percent"),
        }))
    }

    pub async fn get_user_email(&self, id: Uuid) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT email FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }
}

/// True for a PostgreSQL unique-constraint violation (SQLSTATE 23505).
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

// ---- row mappers ----

fn row_to_transaction(row: &sqlx::postgres::PgRow) -> Result<Transaction, sqlx::Error> {
    let status_str: String = row.get("status");
    let status = TransactionStatus::parse(&status_str)
        .ok_or_else(|| sqlx::Error::Decode(format!("unknown transaction status: {}", status_str).into()))?;
    Ok(Transaction {
        id: row.get("id"),
        idempotency_key: row.get("idempotency_key"),
        status,
        user_id: row.get("user_id"),
        order_id: row.get("order_id"),
        event_id: row.get("event_id"),
        amount_minor: row.get("amount_minor"),
        currency: row.get("currency"),
        gateway_provider: row.get("gateway_provider"),
        gateway_reference: row.get("gateway_reference"),
        gateway_authorization_url: row.get("gateway_authorization_url"),
        gateway_transaction_id: row.get("gateway_transaction_id"),
        gateway_channel: row.get("gateway_channel"),
        gateway_authorization: row.get("gateway_authorization"),
        gateway_response: row.get("gateway_response"),
        gateway_fees_minor: row.get("gateway_fees_minor"),
        platform_minor: row.get("platform_minor"),
        organizer_minor: row.get("organizer_minor"),
        subaccount_code: row.get("subaccount_code"),
        retry_count: row.get("retry_count"),
        max_retries: row.get("max_retries"),
        last_retry_at: row.get("last_retry_at"),
        next_retry_at: row.get("next_retry_at"),
        failure_reason: row.get("failure_reason"),
        failure_code: row.get("failure_code"),
        failure_details: row.get("failure_details"),
        total_refunded_minor: row.get("total_refunded_minor"),
        initiated_at: row.get("initiated_at"),
        processing_at: row.get("processing_at"),
        completed_at: row.get("completed_at"),
        failed_at: row.get("failed_at"),
        meta_ip: row.get("meta_ip"),
        meta_user_agent: row.get("meta_user_agent"),
        tier_name: row.get("tier_name"),
        quantity: row.get("quantity"),
    })
}

fn row_to_order(row: &sqlx::postgres::PgRow) -> Result<Order, sqlx::Error> {
    let status_str: String = row.get("payment_status");
    let payment_status = OrderPaymentStatus::parse(&status_str)
        .ok_or_else(|| sqlx::Error::Decode(format!("unknown order status: {}", status_str).into()))?;
    Ok(Order {
        id: row.get("id"),
        user_id: row.get("user_id"),
        event_id: row.get("event_id"),
        tier_id: row.get("tier_id"),
        tier_name: row.get("tier_name"),
        quantity: row.get("quantity"),
        unit_price_minor: row.get("unit_price_minor"),
        total_minor: row.get("total_minor"),
        payment_status,
        platform_minor: row.get("platform_minor"),
        organizer_minor: row.get("organizer_minor"),
        gateway_reference: row.get("gateway_reference"),
        gateway_channel: row.get("gateway_channel"),
        paid_at: row.get("paid_at"),
        tickets: Vec::new(),
        created_at: row.get("created_at"),
    })
}

fn row_to_ticket(row: &sqlx::postgres::PgRow) -> Result<Ticket, sqlx::Error> {
    let status_str: String = row.get("status");
    let status = TicketStatus::parse(&status_str)
        .ok_or_else(|| sqlx::Error::Decode(format!("unknown ticket status: {}", status_str).into()))?;
    Ok(Ticket {
        id: row.get("id"),
        order_id: row.get("order_id"),
        event_id: row.get("event_id"),
        user_id: row.get("user_id"),
        tier_id: row.get("tier_id"),
        tier_name: row.get("tier_name"),
        price_minor: row.get("price_minor"),
        qr_code: row.get("qr_code"),
        status,
        checked_in_at: row.get("checked_in_at"),
        checked_in_by: row.get("checked_in_by"),
        created_at: row.get("created_at"),
    })
}

fn row_to_event(row: &sqlx::postgres::PgRow) -> EventRow {
    EventRow {
        id: row.get("id"),
        organizer_id: row.get("organizer_id"),
        status: row.get("status"),
        deleted_at: row.get("deleted_at"),
    }
}

fn row_to_tier(row: &sqlx::postgres::PgRow) -> TierRow {
    TierRow {
        id: row.get("id"),
        event_id: row.get("event_id"),
        name: row.get("name"),
        price_minor: row.get("price_minor"),
        quantity: row.get("quantity"),
        sold_count: row.get("sold_count"),
        max_per_user: row.get("max_per_user"),
        sale_start: row.get("sale_start"),
        sale_end: row.get("sale_end"),
    }
}
