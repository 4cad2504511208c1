//! Port factory
//!
//! Builds the [`LimsPorts`] bundle for the configured store target.

use crate::adapters::lims::LimsApiClient;
use crate::adapters::memory::MemoryStore;
use crate::adapters::postgresql::{PostgreSQLAdapter, PostgreSQLClient};
use crate::adapters::store::LimsPorts;
use crate::config::schema::{SkipLotConfig, StoreTarget};
use crate::domain::{Result, SkipLotError};
use std::sync::Arc;

/// Create the store ports based on the configuration
///
/// # Errors
///
/// Returns an error if the section of the selected target is missing or its
/// client cannot be created.
pub async fn create_ports(config: &SkipLotConfig) -> Result<LimsPorts> {
    match config.store_target {
        StoreTarget::PostgreSQL => {
            let pg_config = config.postgresql.as_ref().ok_or_else(|| {
                SkipLotError::Configuration(
                    "postgresql configuration is required when store_target = 'postgresql'"
                        .to_string(),
                )
            })?;
            let lims_config = config.lims.as_ref().ok_or_else(|| {
                SkipLotError::Configuration(
                    "lims configuration is required when store_target = 'postgresql'".to_string(),
                )
            })?;

            tracing::info!("Creating PostgreSQL store and LIMS API client");
            let client = PostgreSQLClient::new(pg_config.clone()).await?;
            let store = Arc::new(PostgreSQLAdapter::new(client));
            let api = Arc::new(LimsApiClient::new(lims_config.clone())?);

            Ok(LimsPorts {
                samples: store.clone(),
                equivalencies: store.clone(),
                aggregates: store.clone(),
                workflow: api.clone(),
                analyses: api,
                messages: store.clone(),
                audit: store,
            })
        }
        StoreTarget::Memory => {
            let memory_config = config.memory.as_ref().ok_or_else(|| {
                SkipLotError::Configuration(
                    "memory configuration is required when store_target = 'memory'".to_string(),
                )
            })?;

            tracing::info!(fixture = %memory_config.fixture_path, "Creating in-memory store");
            let store = MemoryStore::from_file(&memory_config.fixture_path, memory_config.persist)?;
            Ok(Arc::new(store).into_ports())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{ApplicationConfig, LoggingConfig, MemoryStoreConfig};

    #[tokio::test]
    async fn test_memory_target_requires_existing_fixture() {
        let config = SkipLotConfig {
            application: ApplicationConfig::default(),
            store_target: StoreTarget::Memory,
            postgresql: None,
            lims: None,
            memory: Some(MemoryStoreConfig {
                fixture_path: "/nonexistent/skiplot-fixture.json".to_string(),
                persist: false,
            }),
            task: None,
            logging: LoggingConfig::default(),
        };

        assert!(create_ports(&config).await.is_err());
    }

    #[tokio::test]
    async fn test_postgresql_target_requires_lims_section() {
        let config = SkipLotConfig {
            application: ApplicationConfig::default(),
            store_target: StoreTarget::PostgreSQL,
            postgresql: None,
            lims: None,
            memory: None,
            task: None,
            logging: LoggingConfig::default(),
        };

        let err = create_ports(&config).await.err().unwrap();
        assert!(err.is_configuration());
    }
}
