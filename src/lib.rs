pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod email;
pub mod error;
pub mod payments;
pub mod repository;
pub mod service;
pub mod uploads;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support {
    use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

    /// Fresh in-memory database with every migration applied. A single
    /// connection that never recycles keeps the data alive for the pool's
    /// lifetime.
    pub async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .expect("failed to open in-memory database");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("failed to run migrations");

        pool
    }
}
