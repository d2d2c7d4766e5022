//! Session database pool.
//!
//! The storefront keeps no business data of its own; the `SQLite` database
//! only backs `tower-sessions` (login tokens and the per-browser cart).

use secrecy::{ExposeSecret, SecretString};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

/// Create a connection pool for the session database.
///
/// # Errors
///
/// Returns `sqlx::Error` if the URL is invalid or the database cannot be opened.
pub async fn create_pool(database_url: &SecretString) -> Result<SqlitePool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect(database_url.expose_secret())
        .await
}
