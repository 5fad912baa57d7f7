//! Report submission pipeline
//!
//! validate → check integrity → resolve entity → check uniqueness → store file
//! → persist report → notify
//!
//! The report row is only created after the file upload has succeeded, so a
//! cancelled or failed upload leaves nothing behind in the repository.

use sha2::{Digest, Sha256};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uknf_core::validation::sanitize_filename;
use uknf_core::{
    FileIntegrityChecker, FileUpload, NewReport, Report, ReportError, ReportEvent, ReportResult,
    ReportSubmittedEvent, SubmitReportRequest,
};
use uknf_db::{RepositoryError, ReportRepository};
use uknf_storage::Storage;
use uuid::Uuid;
use validator::Validate;

use crate::directory::EntityDirectory;
use crate::events::{publish_in_background, ReportEventPublisher};

pub struct SubmissionOrchestrator {
    repository: Arc<dyn ReportRepository>,
    storage: Arc<dyn Storage>,
    directory: Arc<dyn EntityDirectory>,
    publisher: Arc<dyn ReportEventPublisher>,
    checker: FileIntegrityChecker,
}

impl SubmissionOrchestrator {
    pub fn new(
        repository: Arc<dyn ReportRepository>,
        storage: Arc<dyn Storage>,
        directory: Arc<dyn EntityDirectory>,
        publisher: Arc<dyn ReportEventPublisher>,
        checker: FileIntegrityChecker,
    ) -> Self {
        Self {
            repository,
            storage,
            directory,
            publisher,
            checker,
        }
    }

    /// Accept a new report. When `request.correction_of_report_id` is set the
    /// submission is treated as a correction of that report.
    #[tracing::instrument(
        skip(self, request, file, cancel),
        fields(
            entity_id = request.entity_id,
            report_type = %request.report_type,
            reporting_period = %request.reporting_period,
        )
    )]
    pub async fn submit(
        &self,
        request: SubmitReportRequest,
        file: FileUpload,
        cancel: &CancellationToken,
    ) -> ReportResult<Report> {
        request.validate()?;

        if let Err(e) = self.checker.check(&file.data, &file.content_type) {
            tracing::info!(
                error = %e,
                file_name = %file.file_name,
                file_size = file.len(),
                "Rejected report file"
            );
            return Err(e.into());
        }

        self.ensure_entity_exists(request.entity_id).await?;

        if let Some(original_id) = request.correction_of_report_id {
            self.ensure_correctable(original_id, request.entity_id)
                .await?;
        }

        if let Some(existing) = self
            .repository
            .find_active_by_tuple(
                request.entity_id,
                request.report_type.trim(),
                request.reporting_period.trim(),
            )
            .await?
        {
            tracing::debug!(
                existing_report_id = %existing.id(),
                "Active report already exists for tuple"
            );
            return Err(ReportError::DuplicateReport {
                entity_id: request.entity_id,
                report_type: existing.report_type().to_string(),
                reporting_period: existing.reporting_period().to_string(),
                existing_report_id: Some(existing.id()),
            });
        }

        let file_name = sanitize_filename(&file.file_name);
        let file_size = file.len() as i64;
        let checksum = hex::encode(Sha256::digest(&file.data));

        let storage_key = self
            .upload_file(request.entity_id, &file_name, file, cancel)
            .await?;

        let report = match Report::new(NewReport {
            entity_id: request.entity_id,
            submitting_user_id: request.submitting_user_id,
            file_name,
            file_storage_key: storage_key.clone(),
            file_size,
            file_checksum: Some(checksum),
            report_type: request.report_type,
            reporting_period: request.reporting_period,
            correction_of_report_id: request.correction_of_report_id,
        }) {
            Ok(report) => report,
            Err(e) => {
                self.discard_orphan(&storage_key).await;
                return Err(e);
            }
        };

        if let Err(e) = self.repository.insert(&report).await {
            self.discard_orphan(&storage_key).await;
            if matches!(e, RepositoryError::DuplicateReport { .. }) {
                tracing::info!(
                    report_id = %report.id(),
                    "Concurrent submission won the uniqueness race"
                );
            }
            return Err(e.into());
        }

        tracing::info!(
            report_id = %report.id(),
            storage_key = %storage_key,
            file_size = file_size,
            correction_of = ?report.correction_of_report_id(),
            "Report submitted"
        );

        publish_in_background(
            self.publisher.clone(),
            ReportEvent::Submitted(ReportSubmittedEvent::from(&report)),
        );

        Ok(report)
    }

    /// Submit a correction of `original_report_id`. The original must exist
    /// and belong to the same entity.
    pub async fn submit_correction(
        &self,
        original_report_id: Uuid,
        mut request: SubmitReportRequest,
        file: FileUpload,
        cancel: &CancellationToken,
    ) -> ReportResult<Report> {
        request.correction_of_report_id = Some(original_report_id);
        self.submit(request, file, cancel).await
    }

    async fn ensure_entity_exists(&self, entity_id: i64) -> ReportResult<()> {
        match self.directory.get_entity(entity_id).await? {
            Some(_) => Ok(()),
            None => {
                tracing::info!(entity_id = entity_id, "Submission for unknown entity");
                Err(ReportError::EntityNotFound(entity_id))
            }
        }
    }

    async fn ensure_correctable(&self, original_id: Uuid, entity_id: i64) -> ReportResult<()> {
        let original = self
            .repository
            .get_by_id(original_id)
            .await?
            .ok_or(ReportError::ReportNotFound(original_id))?;

        if original.entity_id() != entity_id {
            tracing::warn!(
                original_report_id = %original_id,
                original_entity_id = original.entity_id(),
                entity_id = entity_id,
                "Correction targets a report of another entity"
            );
            return Err(ReportError::InvalidCorrection(format!(
                "report {} does not belong to entity {}",
                original_id, entity_id
            )));
        }
        Ok(())
    }

    /// Upload raced against the caller's cancellation.
    async fn upload_file(
        &self,
        entity_id: i64,
        file_name: &str,
        file: FileUpload,
        cancel: &CancellationToken,
    ) -> ReportResult<String> {
        let start = std::time::Instant::now();

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!(entity_id = entity_id, "Submission cancelled during upload");
                return Err(ReportError::Cancelled);
            }
            result = self.storage.upload(entity_id, file_name, &file.content_type, file.data) => result,
        };

        match result {
            Ok(key) => {
                tracing::debug!(
                    storage_key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Report file stored"
                );
                Ok(key)
            }
            Err(e) => {
                tracing::error!(error = %e, entity_id = entity_id, "Failed to store report file");
                Err(e.into())
            }
        }
    }

    /// Best-effort removal of a stored file that no report will reference.
    async fn discard_orphan(&self, storage_key: &str) {
        if let Err(e) = self.storage.delete(storage_key).await {
            tracing::warn!(
                error = %e,
                storage_key = %storage_key,
                "Failed to delete orphaned report file"
            );
        }
    }
}
