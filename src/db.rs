//! Postgres handle provider and the health-check write probe.
//!
//! `Database` owns the connection pool. It is created once at startup, where a
//! failure to connect is fatal, and closed after the HTTP server has drained.
//! After startup a lost connection is never fatal: each probe that cannot reach
//! the database fails on its own and the caller reports it.
//!
//! Request handlers only see the [`HealthStore`] trait so tests can substitute
//! an in-memory store.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};

use crate::config::{DatabaseConfig, HEALTH_CHECK_INSERT};

/// Database errors
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Invalid sslmode: {0}")]
    SslMode(String),

    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Write capability the health endpoint depends on.
#[async_trait]
pub trait HealthStore: Send + Sync {
    /// Persist one health-check record stamped with the database's current time.
    async fn record_health_check(&self) -> Result<(), DatabaseError>;
}

/// Shared Postgres connection pool.
///
/// Cloning is cheap; all clones share the same pool.
#[derive(Clone, Debug)]
pub struct Database {
    pool: PgPool,
    probe_timeout: Duration,
}

impl Database {
    /// Connect to Postgres, opening one connection eagerly so that an unreachable
    /// or misconfigured database is reported before the server starts.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .connect_with(connect_options(config)?)
            .await?;

        tracing::debug!(
            host = %config.host,
            port = config.port,
            database = %config.name,
            "Database pool established"
        );

        Ok(Self::from_pool(
            pool,
            Duration::from_secs(config.probe_timeout_seconds),
        ))
    }

    /// Wrap an existing pool; each probe is bounded by `probe_timeout`.
    pub fn from_pool(pool: PgPool, probe_timeout: Duration) -> Self {
        Self {
            pool,
            probe_timeout,
        }
    }

    /// The underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close every pooled connection, waiting for checked-out ones to return.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Database pool closed");
    }
}

/// Build connection options from configuration.
fn connect_options(config: &DatabaseConfig) -> Result<PgConnectOptions, DatabaseError> {
    let ssl_mode = PgSslMode::from_str(&config.sslmode)
        .map_err(|_| DatabaseError::SslMode(config.sslmode.clone()))?;

    let mut options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .database(&config.name)
        .ssl_mode(ssl_mode);
    if let Some(password) = &config.password {
        options = options.password(password);
    }

    Ok(options)
}

#[async_trait]
impl HealthStore for Database {
    async fn record_health_check(&self) -> Result<(), DatabaseError> {
        tokio::time::timeout(
            self.probe_timeout,
            sqlx::query(HEALTH_CHECK_INSERT).execute(&self.pool),
        )
        .await
        .map_err(|_| DatabaseError::Timeout(self.probe_timeout))??;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use crate::routes::create_router;
    use crate::state::AppState;

    fn unreachable_config() -> DatabaseConfig {
        // Port 1 on loopback refuses connections immediately.
        DatabaseConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            user: "app".to_string(),
            name: "appdb".to_string(),
            sslmode: "disable".to_string(),
            connect_timeout_seconds: 1,
            ..DatabaseConfig::default()
        }
    }

    #[tokio::test]
    async fn test_connect_unreachable_fails() {
        let result = Database::connect(&unreachable_config()).await;
        assert!(matches!(result, Err(DatabaseError::Sqlx(_))));
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_sslmode() {
        let config = DatabaseConfig {
            sslmode: "bogus".to_string(),
            ..unreachable_config()
        };
        let result = Database::connect(&config).await;
        assert!(matches!(result, Err(DatabaseError::SslMode(mode)) if mode == "bogus"));
    }

    #[test]
    fn test_timeout_error_message() {
        let err = DatabaseError::Timeout(Duration::from_secs(5));
        assert_eq!(err.to_string(), "Database operation timed out after 5s");
    }

    /// Pool that never establishes a connection until first use.
    fn lazy_database(probe_timeout: Duration) -> Database {
        let options = connect_options(&unreachable_config()).unwrap();
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_secs(30))
            .connect_lazy_with(options);
        Database::from_pool(pool, probe_timeout)
    }

    #[tokio::test]
    async fn test_record_health_check_times_out_when_database_is_gone() {
        let database = lazy_database(Duration::from_millis(300));

        let result = database.record_health_check().await;
        assert!(matches!(
            result,
            Err(DatabaseError::Timeout(t)) if t == Duration::from_millis(300)
        ));
    }

    #[tokio::test]
    async fn test_unreachable_database_answers_service_unavailable() {
        let store: Arc<dyn HealthStore> = Arc::new(lazy_database(Duration::from_millis(300)));
        let app = create_router(AppState::new(Some(store)));

        let response = app
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[header::PRAGMA], "no-cache");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"Service Unavailable");
    }
}
