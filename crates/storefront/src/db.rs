//! `PostgreSQL` connection pool.
//!
//! The database only holds sessions (`tower_sessions.session`), which carry
//! each visitor's client storage. Movies, profiles and purchases live
//! elsewhere. The table is created by:
//! ```bash
//! cargo run -p cineteca-cli -- migrate
//! ```

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Create the session-store pool.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
