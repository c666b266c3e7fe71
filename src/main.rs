/**
 * INFRASTRUCTURE LAYER - Application Entry Point
 *
 * StagePass Core: the payment-order-ticket transaction engine of the
 * ticketing backend.
 *
 * Startup flow:
 * 1. Initialize tracing
 * 2. Load configuration from environment
 * 3. Create database pool (health-only mode without one)
 * 4. Wire ports: clock, ids, token codec, payment gateway, audit
 * 5. Build the transaction engine and its services
 * 6. Spawn the retry scheduler
 * 7. Serve
 *
 * Dependency injection: pool -> repositories -> services (Arc-wrapped) ->
 * handlers -> router. No process-global mutable state; every port the
 * engine uses arrives through its constructor.
 */

mod actor;
mod audit;
mod clock;
mod config;
mod db;
mod error;
mod gate;
mod gateway;
mod organizers;
mod splits;
mod token;
mod transactions;
mod webhooks;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use audit::AuditEmitter;
use clock::{SystemClock, UuidSource};
use gate::service::GateValidator;
use gateway::paystack::PaystackGateway;
use gateway::PaymentGateway;
use organizers::service::OrganizerService;
use token::TicketTokenCodec;
use transactions::repository::TransactionRepository;
use transactions::retry::{RetryPolicy, RetryScheduler};
use transactions::service::TransactionEngine;
use webhooks::service::WebhookProcessor;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stagepass_core=info,tower_http=info".into()),
        )
        .init();

    dotenvy::dotenv().ok();
    let cfg = config::Config::from_env();

    let addr = format!("0.0.0.0:{}", cfg.port);
    tracing::info!("StagePass Core starting on {}", addr);

    // Health-only mode when the database is not configured
    let app = if cfg.database_url.is_empty() {
        tracing::warn!("DATABASE_URL not set - serving /health only");
        Router::new()
            .route("/health", get(health))
            .layer(CorsLayer::permissive())
    } else {
        let pool = db::create_pool(&cfg.database_url).await;
        sqlx::migrate!()
            .run(&pool)
            .await
            .expect("Failed to run database migrations");
        build_router(pool, cfg)
    };

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

/**
 * Build Application Router
 *
 * Wires ports into services and composes the route groups. Also spawns
 * the retry scheduler as a background worker owning its own engine handle.
 */
fn build_router(pool: sqlx::PgPool, cfg: config::Config) -> Router {
    // PORTS: injected capabilities, immutable after construction
    let clock = Arc::new(SystemClock);
    let ids = Arc::new(UuidSource);
    let codec = TicketTokenCodec::new(&cfg.qr_secret_key);
    let paystack: Arc<dyn PaymentGateway> = Arc::new(PaystackGateway::new(
        cfg.payment_secret_key.clone(),
        cfg.gateway_timeout_ms,
    ));
    let audit = AuditEmitter::new(pool.clone());

    // USE CASE LAYER
    let engine = Arc::new(TransactionEngine::new(
        TransactionRepository::new(pool.clone()),
        Arc::clone(&paystack),
        codec.clone(),
        clock,
        ids,
        audit.clone(),
        RetryPolicy { base_ms: cfg.retry_base_ms, max_ms: cfg.retry_max_ms },
        cfg.organizer_percent,
        cfg.currency.clone(),
        cfg.retry_max_attempts,
    ));
    let processor = Arc::new(WebhookProcessor::new(
        Arc::clone(&engine),
        Arc::clone(&paystack),
        audit.clone(),
    ));
    let gate_validator = Arc::new(GateValidator::new(pool.clone(), codec, audit.clone()));
    let organizer_service = Arc::new(OrganizerService::new(pool, paystack, audit));

    // BACKGROUND WORKER: reopen failed transactions when due
    RetryScheduler::new(
        Arc::clone(&engine),
        Duration::from_millis(cfg.retry_scan_interval_ms),
        cfg.retry_scan_batch,
        cfg.retry_scan_concurrency,
    )
    .spawn();

    // CONTROLLER LAYER: route groups
    let ticket_routes = Router::new()
        .route("/purchase", post(transactions::handler::purchase))
        .route("/verify", post(transactions::handler::verify))
        .route("/me", get(transactions::handler::my_tickets))
        .with_state(Arc::clone(&engine));

    let transaction_routes = Router::new()
        .route("/me", get(transactions::handler::my_transactions))
        .route("/{id}/retry", post(transactions::handler::retry))
        .route("/{id}/refund", post(transactions::handler::refund))
        .with_state(engine);

    let webhook_routes = Router::new()
        .route("/paystack", post(webhooks::handler::paystack))
        .with_state(processor);

    let gate_routes = Router::new()
        .route("/scan", post(gate::handler::scan))
        .with_state(Arc::clone(&gate_validator));
    let gate_stats_routes = Router::new()
        .route("/{event_id}/stats", get(gate::handler::stats))
        .with_state(gate_validator);

    let organizer_routes = Router::new()
        .route("/subaccount", post(organizers::handler::create_subaccount))
        .with_state(organizer_service);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .nest("/tickets", ticket_routes)
        .nest("/transactions", transaction_routes)
        .nest("/webhooks", webhook_routes)
        .nest("/validate", gate_routes)
        .nest("/gate", gate_stats_routes)
        .nest("/organizers", organizer_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "service": "stagepass-core"
    }))
}
