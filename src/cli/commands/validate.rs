//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the skiplot configuration file.

use crate::adapters::memory::MemoryFixture;
use crate::adapters::postgresql::PostgreSQLClient;
use crate::config::schema::StoreTarget;
use crate::config::{load_config, SkipLotConfig, TaskOptions};
use crate::config::NotificationMode;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Also open the configured store (PostgreSQL connection or memory fixture)
    #[arg(long)]
    pub check_connection: bool,
}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // load_config validates as well
        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration is valid");
                c
            }
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                return Ok(2);
            }
        };

        println!();
        print_summary(&config);

        if self.check_connection {
            return Ok(check_store(&config).await);
        }

        Ok(0)
    }
}

fn print_summary(config: &SkipLotConfig) {
    println!("Configuration Summary:");
    println!("  Log Level: {}", config.application.log_level);

    match config.store_target {
        StoreTarget::PostgreSQL => {
            println!("  Store Target: PostgreSQL");
            if let Some(ref pg_config) = config.postgresql {
                use secrecy::ExposeSecret;
                println!(
                    "  PostgreSQL Connection: {}",
                    pg_config
                        .connection_string
                        .expose_secret()
                        .as_ref()
                        .split('@')
                        .next_back()
                        .unwrap_or("***")
                );
                println!("  Max Connections: {}", pg_config.max_connections);
                println!("  SSL Mode: {}", pg_config.ssl_mode);
            }
            if let Some(ref lims) = config.lims {
                println!("  LIMS API: {}", lims.base_url);
                println!("  LIMS Auth: {}", lims.auth_type);
            }
        }
        StoreTarget::Memory => {
            println!("  Store Target: Memory");
            if let Some(ref memory) = config.memory {
                println!("  Fixture: {}", memory.fixture_path);
                println!("  Persist: {}", memory.persist);
            }
        }
    }

    // Already validated by load_config
    match config.task.clone().map(TaskOptions::from_value) {
        Some(Ok(task)) => {
            println!("  Task Equivalency: {}", task.equivalency_id);
            println!("  Task Quota: {}", task.quota);
            println!("  Task Master: {}", task.work_master_id);
            println!(
                "  Task Steps: {} -> {}",
                task.work_initial_step_id, task.work_final_step_id
            );
            match task.notification {
                NotificationMode::MailingList {
                    mailing_list_id, ..
                } => println!("  Notification: mailing list {mailing_list_id}"),
                NotificationMode::Direct => println!("  Notification: sample thread"),
            }
        }
        Some(Err(_)) | None => println!("  Task: supplied per invocation"),
    }

    println!(
        "  File Logging: {}",
        if config.logging.local_enabled {
            format!("{} ({})", config.logging.local_path, config.logging.local_rotation)
        } else {
            "disabled".to_string()
        }
    );
    println!();
}

async fn check_store(config: &SkipLotConfig) -> i32 {
    match config.store_target {
        StoreTarget::PostgreSQL => {
            let Some(pg_config) = config.postgresql.clone() else {
                return 2;
            };
            let result = match PostgreSQLClient::new(pg_config).await {
                Ok(client) => client.test_connection().await,
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => {
                    println!("✅ PostgreSQL connection successful");
                    0
                }
                Err(e) => {
                    println!("❌ PostgreSQL connection failed");
                    println!("   Error: {e}");
                    5
                }
            }
        }
        StoreTarget::Memory => {
            let Some(memory) = config.memory.as_ref() else {
                return 2;
            };
            match MemoryFixture::load(&memory.fixture_path) {
                Ok(fixture) => {
                    println!(
                        "✅ Fixture loaded: {} samples, {} work units",
                        fixture.samples.len(),
                        fixture.work_units.len()
                    );
                    0
                }
                Err(e) => {
                    println!("❌ Failed to load fixture");
                    println!("   Error: {e}");
                    5
                }
            }
        }
    }
}
