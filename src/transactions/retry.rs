/**
 * USE CASE LAYER - Retry Policy & Scheduler
 *
 * Exponential backoff for failed transactions and the background worker
 * that reopens them when their next_retry_at comes due.
 */

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

use super::service::TransactionEngine;

/**
 * Backoff: min(base * 2^n, max) with ±10% jitter
 *
 * Jitter keeps a burst of failures from retrying in lockstep.
 */
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub base_ms: i64,
    pub max_ms: i64,
}

impl RetryPolicy {
    pub fn delay_ms(&self, retry_count: i32) -> i64 {
        let shift = retry_count.clamp(0, 20) as u32;
        let exp = self.base_ms.saturating_mul(1i64 << shift);
        let capped = exp.min(self.max_ms);
        let span = capped / 10;
        if span == 0 {
            return capped;
        }
        capped + rand::thread_rng().gen_range(-span..=span)
    }
}

/**
 * RetryScheduler: single-instance sweep over due failed transactions
 *
 * Every interval: pull a batch of rows with status=failed, an elapsed
 * next_retry_at and retries left, then run TransactionEngine::retry over
 * them with bounded concurrency. A retry that fails again gets a fresh
 * next_retry_at from the engine, so the row simply reappears in a later
 * sweep; nothing is dequeued permanently except by exhausting max_retries.
 */
pub struct RetryScheduler {
    engine: Arc<TransactionEngine>,
    interval: Duration,
    batch: i64,
    concurrency: usize,
}

impl RetryScheduler {
    pub fn new(engine: Arc<TransactionEngine>, interval: Duration, batch: i64, concurrency: usize) -> Self {
        Self {
            engine,
            interval,
            batch,
            concurrency: concurrency.max(1),
        }
    }

    /// Run forever on a background task.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                self.sweep().await;
            }
        })
    }

    async fn sweep(&self) {
        let due = match self.engine.due_retries(self.batch).await {
            Ok(due) => due,
            Err(err) => {
                tracing::error!("retry sweep query failed: {}", err);
                return;
            }
        };
        if due.is_empty() {
            return;
        }
        tracing::info!("retry sweep: {} transaction(s) due", due.len());

        let mut tasks: JoinSet<()> = JoinSet::new();
        for txn in due {
            while tasks.len() >= self.concurrency {
                tasks.join_next().await;
            }
            let engine = Arc::clone(&self.engine);
            tasks.spawn(async move {
                if let Err(err) = engine.retry(txn.id).await {
                    // The engine already rescheduled or exhausted the row
                    tracing::warn!("scheduled retry of {} failed: {}", txn.id, err);
                }
            });
        }
        while tasks.join_next().await.is_some() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY: RetryPolicy = RetryPolicy { base_ms: 1_000, max_ms: 30_000 };

    #[test]
    fn delay_grows_exponentially_within_jitter() {
        for (count, nominal) in [(0, 1_000i64), (1, 2_000), (2, 4_000), (3, 8_000)] {
            for _ in 0..50 {
                let d = POLICY.delay_ms(count);
                assert!(d >= nominal - nominal / 10, "count {}: {} too low", count, d);
                assert!(d <= nominal + nominal / 10, "count {}: {} too high", count, d);
            }
        }
    }

    #[test]
    fn delay_caps_at_max() {
        for count in [5, 10, 20, 100] {
            for _ in 0..50 {
                let d = POLICY.delay_ms(count);
                assert!(d <= 30_000 + 3_000, "count {}: {} above cap+jitter", count, d);
                assert!(d >= 30_000 - 3_000, "count {}: {} below cap-jitter", count, d);
            }
        }
    }

    #[test]
    fn zero_base_stays_zero() {
        let policy = RetryPolicy { base_ms: 0, max_ms: 30_000 };
        assert_eq!(policy.delay_ms(3), 0);
    }

    #[test]
    fn huge_retry_count_does_not_overflow() {
        let d = POLICY.delay_ms(i32::MAX);
        assert!(d <= 33_000);
    }
}
