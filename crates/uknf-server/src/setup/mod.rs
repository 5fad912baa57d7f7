//! Application setup and initialization

pub mod database;
pub mod services;
pub mod storage;

use crate::state::AppState;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use uknf_core::ReportingConfig;
use uknf_services::ValidationRequest;

/// Initialize telemetry, database, storage and services.
pub async fn initialize_app(
    config: &ReportingConfig,
) -> Result<(Arc<AppState>, mpsc::Receiver<ValidationRequest>)> {
    crate::telemetry::init_telemetry(config.log_format, &config.environment)
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!("Configuration loaded and validated successfully");

    let pool = database::setup_database(config).await?;
    let storage = storage::setup_storage(config).await?;

    services::initialize_services(config, pool, storage)
}
