//! PostgreSQL client implementation
//!
//! Owns the connection pool. Every checkout applies the configured statement
//! timeout before the connection is handed out.

use crate::config::schema::PostgreSQLConfig;
use crate::domain::{Result, SkipLotError, StoreError};
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod, Runtime};
use postgres_native_tls::MakeTlsConnector;
use secrecy::ExposeSecret;
use std::time::Duration;
use tokio_postgres::config::SslMode;
use tokio_postgres::types::ToSql;
use tokio_postgres::{NoTls, Row};

/// PostgreSQL client for skiplot
pub struct PostgreSQLClient {
    pool: Pool,
    config: PostgreSQLConfig,
}

impl PostgreSQLClient {
    /// Create a new PostgreSQL client
    ///
    /// The pool is created lazily; no connection is opened here.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection string is invalid or the TLS connector
    /// cannot be built.
    pub async fn new(config: PostgreSQLConfig) -> Result<Self> {
        let mut pg_config: tokio_postgres::Config = config
            .connection_string
            .expose_secret()
            .as_ref()
            .parse()
            .map_err(|e| {
                SkipLotError::Configuration(format!("Invalid PostgreSQL connection string: {}", e))
            })?;
        pg_config.ssl_mode(ssl_mode_for(&config.ssl_mode));
        pg_config.connect_timeout(Duration::from_secs(config.connection_timeout_seconds));

        let manager_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let manager = if config.ssl_mode == "disable" {
            Manager::from_config(pg_config, NoTls, manager_config)
        } else {
            let connector = native_tls::TlsConnector::builder().build().map_err(|e| {
                SkipLotError::Configuration(format!("Failed to build TLS connector: {}", e))
            })?;
            Manager::from_config(pg_config, MakeTlsConnector::new(connector), manager_config)
        };

        let timeout = Some(Duration::from_secs(config.connection_timeout_seconds));
        let pool = Pool::builder(manager)
            .max_size(config.max_connections)
            .wait_timeout(timeout)
            .create_timeout(timeout)
            .recycle_timeout(timeout)
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| {
                StoreError::ConnectionFailed(format!("Failed to create connection pool: {}", e))
            })?;

        Ok(Self { pool, config })
    }

    /// Test the connection to PostgreSQL
    pub async fn test_connection(&self) -> Result<()> {
        let client = self.get_connection().await?;
        client
            .query_one("SELECT 1", &[])
            .await
            .map_err(|e| StoreError::backend("Connection test failed", e))?;

        tracing::info!(
            host = %self.connection_string_safe(),
            "PostgreSQL connection test successful"
        );
        Ok(())
    }

    /// Get a connection from the pool with the statement timeout applied
    pub async fn get_connection(&self) -> Result<Object> {
        let client = self.pool.get().await.map_err(|e| {
            StoreError::ConnectionFailed(format!("Failed to get connection from pool: {}", e))
        })?;

        let timeout_query = format!(
            "SET statement_timeout = {}",
            self.config.statement_timeout_seconds * 1000
        );
        client
            .batch_execute(&timeout_query)
            .await
            .map_err(|e| StoreError::backend("Failed to set statement timeout", e))?;

        Ok(client)
    }

    /// Execute a query and return rows
    pub async fn query(
        &self,
        context: &str,
        query: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>> {
        let client = self.get_connection().await?;
        Ok(client
            .query(query, params)
            .await
            .map_err(|e| StoreError::backend(context, e))?)
    }

    /// Execute a query returning at most one row
    pub async fn query_opt(
        &self,
        context: &str,
        query: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Option<Row>> {
        let client = self.get_connection().await?;
        Ok(client
            .query_opt(query, params)
            .await
            .map_err(|e| StoreError::backend(context, e))?)
    }

    /// Execute a query returning exactly one row
    pub async fn query_one(
        &self,
        context: &str,
        query: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Row> {
        let client = self.get_connection().await?;
        Ok(client
            .query_one(query, params)
            .await
            .map_err(|e| StoreError::backend(context, e))?)
    }

    /// Execute a statement and return the number of affected rows
    pub async fn execute(
        &self,
        context: &str,
        statement: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<u64> {
        let client = self.get_connection().await?;
        Ok(client
            .execute(statement, params)
            .await
            .map_err(|e| StoreError::backend(context, e))?)
    }

    /// Get the connection string (without credentials)
    pub fn connection_string_safe(&self) -> String {
        redact_connection_string(self.config.connection_string.expose_secret().as_ref())
    }
}

fn ssl_mode_for(mode: &str) -> SslMode {
    match mode {
        "disable" => SslMode::Disable,
        "require" => SslMode::Require,
        _ => SslMode::Prefer,
    }
}

fn redact_connection_string(connection_string: &str) -> String {
    connection_string
        .rsplit_once('@')
        .map(|(_, host)| format!("postgresql://***@{}", host))
        .unwrap_or_else(|| "postgresql://***".to_string())
}
