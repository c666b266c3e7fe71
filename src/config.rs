/**
 * INFRASTRUCTURE LAYER - Configuration
 *
 * Config: where environment variables become useful data
 *
 * Loaded once at startup, cloned into services. Scattered env::var() calls
 * are a maintenance nightmare - change a key once here, affect everywhere.
 */

use std::env;

#[derive(Clone)]
pub struct Config {
    pub port: u16,                      // HTTP listen port (default: 8081)
    pub database_url: String,           // PostgreSQL connection string
    pub payment_secret_key: String,     // Gateway API key + webhook HMAC secret
    pub qr_secret_key: String,          // HMAC key for ticket tokens
    pub currency: String,               // Single operating currency (minor units everywhere)
    pub organizer_percent: i64,         // Default organizer revenue share (percent)
    pub gateway_timeout_ms: u64,        // Outbound gateway call timeout
    pub retry_base_ms: i64,             // Retry backoff base delay
    pub retry_max_ms: i64,              // Retry backoff cap
    pub retry_max_attempts: i32,        // Default max retries per transaction
    pub retry_scan_interval_ms: u64,    // RetryScheduler poll interval
    pub retry_scan_batch: i64,          // Due transactions claimed per sweep
    pub retry_scan_concurrency: usize,  // Parallel retries per sweep
}

impl Config {
    /**
     * Load configuration from environment variables
     *
     * Reads from .env (via dotenvy) or the process environment. Secrets
     * default to empty strings so the app still boots in dev; the features
     * that need them degrade explicitly (webhooks reject, tokens unsigned
     * with an empty key are still deterministic).
     */
    pub fn from_env() -> Self {
        Self {
            port: env_parse("PORT", 8081),
            database_url: env::var("DATABASE_URL").unwrap_or_default(),
            payment_secret_key: env::var("PAYMENT_SECRET_KEY").unwrap_or_default(),
            qr_secret_key: env::var("QR_SECRET_KEY").unwrap_or_default(),
            currency: env::var("CURRENCY").unwrap_or_else(|_| "NGN".to_string()),
            organizer_percent: env_parse("ORGANIZER_PERCENT", 90),
            gateway_timeout_ms: env_parse("GATEWAY_TIMEOUT_MS", 15_000),
            retry_base_ms: env_parse("RETRY_BASE_MS", 1_000),
            retry_max_ms: env_parse("RETRY_MAX_MS", 30_000),
            retry_max_attempts: env_parse("RETRY_MAX_ATTEMPTS", 3),
            retry_scan_interval_ms: env_parse("RETRY_SCAN_INTERVAL_MS", 30_000),
            retry_scan_batch: env_parse("RETRY_SCAN_BATCH", 20),
            retry_scan_concurrency: env_parse("RETRY_SCAN_CONCURRENCY", 4),
        }
    }
}

// Parse an env var, falling back to the default on absence or garbage.
fn env_parse<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
