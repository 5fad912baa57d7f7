mod setup;
mod state;
mod telemetry;

use tokio_util::sync::CancellationToken;
use uknf_core::ReportingConfig;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = ReportingConfig::from_env()?;
    let (state, engine_rx) = setup::initialize_app(&config).await?;

    let shutdown = CancellationToken::new();
    let dispatch =
        setup::services::start_engine_dispatch(state.clone(), engine_rx, shutdown.clone());
    let sweeper = match &state.sweeper {
        Some(sweeper) => Some(sweeper.clone().start(shutdown.clone())),
        None => {
            tracing::info!("Timeout sweeper disabled");
            None
        }
    };

    tracing::info!(environment = %config.environment, "UKNF report service running");
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    shutdown.cancel();
    if let Some(handle) = sweeper {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Timeout sweeper task failed");
        }
    }
    if let Err(e) = dispatch.await {
        tracing::error!(error = %e, "Validation dispatch task failed");
    }

    tracing::info!("UKNF report service stopped");
    Ok(())
}
