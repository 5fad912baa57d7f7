//! Storage setup and initialization

use anyhow::Result;
use std::sync::Arc;
use uknf_core::ReportingConfig;
use uknf_storage::{create_storage, Storage};

pub async fn setup_storage(config: &ReportingConfig) -> Result<Arc<dyn Storage>> {
    tracing::info!("Initializing report storage...");
    let storage = create_storage(config).await?;
    tracing::info!(
        backend = %storage.backend_type(),
        "Report storage initialized successfully"
    );
    Ok(storage)
}
