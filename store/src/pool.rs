//! Database Connection Pool Support for Formway
//!
//! Provides a typed PostgreSQL pool wrapper the binary constructs once and
//! hands to the store.

use std::time::Duration;

/// Pool-related errors.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("failed to connect: {0}")]
    ConnectFailed(String),

    #[error("backend error: {0}")]
    Backend(String),
}

/// PostgreSQL connection pool wrapper.
#[derive(Clone)]
pub struct PostgresPool {
    inner: sqlx::PgPool,
}

impl PostgresPool {
    /// Connect with the default options.
    pub async fn connect(url: &str) -> Result<Self, PoolError> {
        Self::with_options(url, sqlx::postgres::PgPoolOptions::new()).await
    }

    /// Connect with a bounded pool size.
    pub async fn with_max_connections(url: &str, max: u32) -> Result<Self, PoolError> {
        let options = sqlx::postgres::PgPoolOptions::new()
            .max_connections(max)
            .acquire_timeout(Duration::from_secs(10));
        Self::with_options(url, options).await
    }

    /// Connect with custom options.
    pub async fn with_options(
        url: &str,
        options: sqlx::postgres::PgPoolOptions,
    ) -> Result<Self, PoolError> {
        let pool = options
            .connect(url)
            .await
            .map_err(|e| PoolError::ConnectFailed(e.to_string()))?;
        Ok(Self { inner: pool })
    }

    /// Get the underlying `sqlx::PgPool`.
    pub fn inner(&self) -> &sqlx::PgPool {
        &self.inner
    }

    /// Verify the connection with a trivial query.
    pub async fn ping(&self) -> Result<(), PoolError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.inner)
            .await
            .map_err(|e| PoolError::Backend(e.to_string()))?;
        Ok(())
    }

    /// Close the pool gracefully.
    pub async fn close(&self) {
        self.inner.close().await;
    }
}
