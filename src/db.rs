/**
 * INFRASTRUCTURE LAYER - Database Connection
 *
 * Connection pool over PostgreSQL via SQLx.
 *
 * Every multi-statement engine operation (initiate, complete, refund, retry)
 * runs inside a single `pool.begin()` transaction; row locks come from
 * SELECT ... FOR UPDATE inside those transactions.
 */

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/**
 * Create the PostgreSQL connection pool
 *
 * 20 max / 5 warm connections covers moderate checkout load without
 * starving the database. Panics when the database is unreachable - the
 * engine cannot run in a half-connected state.
 */
pub async fn create_pool(database_url: &str) -> PgPool {
    PgPoolOptions::new()
        .max_connections(20)
        .min_connections(5)
        .connect(database_url)
        .await
        .expect("Failed to connect to database")
}
