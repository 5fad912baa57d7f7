//! Service initialization and application state setup

use anyhow::Result;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uknf_core::ReportingConfig;
use uknf_db::{PgReportRepository, ReportRepository};
use uknf_services::{
    ChannelValidationEngine, ReportEventPublisher, ReportLifecycleService, StaticEntityDirectory,
    SubmissionOrchestrator, TracingEventPublisher, ValidationRequest, ValidationResultRecorder,
};
use uknf_storage::Storage;
use uknf_worker::{SweeperConfig, TimeoutSweeper};

use crate::state::AppState;

const ENGINE_QUEUE_CAPACITY: usize = 256;

/// Build repositories and services, returning the application state and the
/// receiving end of the validation engine queue.
pub fn initialize_services(
    config: &ReportingConfig,
    pool: PgPool,
    storage: Arc<dyn Storage>,
) -> Result<(Arc<AppState>, mpsc::Receiver<ValidationRequest>)> {
    let repository: Arc<dyn ReportRepository> = Arc::new(PgReportRepository::new(pool));
    let publisher: Arc<dyn ReportEventPublisher> = Arc::new(TracingEventPublisher);

    let directory = StaticEntityDirectory::from_config_entries(&config.entities);
    if directory.is_empty() {
        tracing::warn!("UKNF_ENTITIES is empty; every submission will be rejected");
    } else {
        tracing::info!(entities = directory.len(), "Entity directory loaded");
    }

    let (engine, engine_rx) = ChannelValidationEngine::channel(ENGINE_QUEUE_CAPACITY);

    let orchestrator = Arc::new(SubmissionOrchestrator::new(
        repository.clone(),
        storage.clone(),
        Arc::new(directory),
        publisher.clone(),
        config.file_integrity_checker(),
    ));
    let lifecycle = Arc::new(ReportLifecycleService::new(
        repository.clone(),
        storage,
        Arc::new(engine),
        publisher.clone(),
    ));
    let recorder = Arc::new(ValidationResultRecorder::new(
        repository.clone(),
        publisher.clone(),
    ));

    let sweeper = SweeperConfig::from_config(config)
        .map(|sweeper_config| Arc::new(TimeoutSweeper::new(repository, publisher, sweeper_config)));

    let state = Arc::new(AppState {
        orchestrator,
        lifecycle,
        recorder,
        sweeper,
    });
    Ok((state, engine_rx))
}

/// Drain queued validation requests until shutdown. Each request is
/// acknowledged as picked up; the outcome arrives later through the recorder.
pub fn start_engine_dispatch(
    state: Arc<AppState>,
    mut requests: mpsc::Receiver<ValidationRequest>,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let request = tokio::select! {
                _ = shutdown.cancelled() => break,
                request = requests.recv() => match request {
                    Some(request) => request,
                    None => break,
                },
            };

            tracing::info!(
                validation_id = %request.unique_validation_id,
                report_id = %request.report_id,
                storage_key = %request.storage_key,
                "Dispatching report to validation engine"
            );
            if let Err(e) = state
                .lifecycle
                .mark_ongoing(&request.unique_validation_id)
                .await
            {
                tracing::warn!(
                    error = %e,
                    validation_id = %request.unique_validation_id,
                    "Failed to mark validation as ongoing"
                );
            }
        }
        tracing::info!("Validation dispatch stopped");
    })
}
