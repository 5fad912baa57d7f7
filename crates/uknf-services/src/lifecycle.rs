//! Validation start, reviewer actions and read queries.

use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use uknf_core::models::{ReportListQuery, ReportStats};
use uknf_core::{Report, ReportError, ReportEvent, ReportResult, ValidationResult, ValidationStatus};
use uknf_db::ReportRepository;
use uknf_storage::Storage;
use uuid::Uuid;

use crate::engine::{ValidationEngine, ValidationRequest};
use crate::events::{publish_in_background, ReportEventPublisher};

/// Upper bound on back-links followed when walking a correction chain.
pub const MAX_CORRECTION_CHAIN: usize = 64;

/// A stored report file fetched for download.
#[derive(Debug, Clone)]
pub struct ReportFile {
    pub report_id: Uuid,
    pub file_name: String,
    pub data: Bytes,
}

pub struct ReportLifecycleService {
    repository: Arc<dyn ReportRepository>,
    storage: Arc<dyn Storage>,
    engine: Arc<dyn ValidationEngine>,
    publisher: Arc<dyn ReportEventPublisher>,
}

impl ReportLifecycleService {
    pub fn new(
        repository: Arc<dyn ReportRepository>,
        storage: Arc<dyn Storage>,
        engine: Arc<dyn ValidationEngine>,
        publisher: Arc<dyn ReportEventPublisher>,
    ) -> Self {
        Self {
            repository,
            storage,
            engine,
            publisher,
        }
    }

    async fn load(&self, report_id: Uuid) -> ReportResult<Report> {
        self.repository
            .get_by_id(report_id)
            .await?
            .ok_or(ReportError::ReportNotFound(report_id))
    }

    /// `Working -> Transmitted` with a fresh validation id, then hand the
    /// attempt to the engine. A failed hand-off ends the attempt in
    /// `TechnicalError` and returns `EngineUnavailable`.
    #[tracing::instrument(skip(self))]
    pub async fn start_validation(&self, report_id: Uuid) -> ReportResult<Report> {
        let mut report = self.load(report_id).await?;
        let validation_id = Uuid::new_v4().to_string();
        let now = Utc::now();

        if let Err(e) = report.start_validation_at(&validation_id, now) {
            tracing::warn!(error = %e, "Cannot start validation");
            return Err(e);
        }
        let mut result = ValidationResult::new_at(report.id(), validation_id.as_str(), now);
        self.repository
            .update_with_result(&mut report, &result)
            .await?;

        let request = ValidationRequest {
            unique_validation_id: validation_id.clone(),
            report_id: report.id(),
            entity_id: report.entity_id(),
            storage_key: report.file_storage_key().to_string(),
            report_type: report.report_type().to_string(),
            reporting_period: report.reporting_period().to_string(),
        };

        if let Err(e) = self.engine.submit(request).await {
            let message = format!("Validation engine hand-off failed: {}", e);
            tracing::error!(
                error = %e,
                validation_id = %validation_id,
                "Failed to hand report to validation engine"
            );

            let now = Utc::now();
            report.record_technical_error_at(&message, now)?;
            result.mark_as_technical_error(message.as_str(), now)?;
            self.repository
                .update_with_result(&mut report, &result)
                .await?;

            if let Some(event) = ReportEvent::validation_finished(&report) {
                publish_in_background(self.publisher.clone(), event);
            }
            return Err(ReportError::EngineUnavailable(e.to_string()));
        }

        tracing::info!(validation_id = %validation_id, "Validation started");
        Ok(report)
    }

    /// Engine pick-up callback, `Transmitted -> Ongoing`. Repeating it for an
    /// attempt that is already `Ongoing` is a no-op.
    #[tracing::instrument(skip(self))]
    pub async fn mark_ongoing(&self, unique_validation_id: &str) -> ReportResult<Report> {
        let mut report = self
            .repository
            .find_by_validation_id(unique_validation_id)
            .await?
            .ok_or_else(|| {
                tracing::warn!("Pick-up callback for unknown validation id");
                ReportError::UnknownValidation(unique_validation_id.to_string())
            })?;

        if report.validation_status() == ValidationStatus::Ongoing {
            return Ok(report);
        }

        if let Err(e) = report.mark_ongoing() {
            tracing::warn!(
                error = %e,
                report_id = %report.id(),
                "Pick-up callback for report not awaiting the engine"
            );
            return Err(e);
        }
        self.repository.update(&mut report).await?;

        tracing::debug!(report_id = %report.id(), "Validation ongoing");
        Ok(report)
    }

    /// `Successful -> ContestedByUknf`, recorded against the reviewer.
    #[tracing::instrument(skip(self, description))]
    pub async fn contest(
        &self,
        report_id: Uuid,
        reviewer_id: i64,
        description: &str,
    ) -> ReportResult<Report> {
        let mut report = self.load(report_id).await?;

        if let Err(e) = report.contest_by_uknf(reviewer_id, description) {
            tracing::warn!(error = %e, "Contest rejected");
            return Err(e);
        }
        self.repository.update(&mut report).await?;

        tracing::info!(
            reviewer_id = reviewer_id,
            entity_id = report.entity_id(),
            "Report contested"
        );
        publish_in_background(
            self.publisher.clone(),
            ReportEvent::Contested {
                report_id: report.id(),
                entity_id: report.entity_id(),
                reviewer_id,
            },
        );
        Ok(report)
    }

    /// Archive the report, freeing its tuple for resubmission. Archiving an
    /// archived report changes nothing.
    #[tracing::instrument(skip(self))]
    pub async fn archive(&self, report_id: Uuid) -> ReportResult<Report> {
        let mut report = self.load(report_id).await?;

        if !report.archive() {
            tracing::debug!("Report already archived");
            return Ok(report);
        }
        self.repository.update(&mut report).await?;

        tracing::info!(
            entity_id = report.entity_id(),
            status = %report.validation_status(),
            "Report archived"
        );
        Ok(report)
    }

    pub async fn get_by_id(&self, report_id: Uuid) -> ReportResult<Report> {
        self.load(report_id).await
    }

    pub async fn get_by_entity(
        &self,
        entity_id: i64,
        query: &ReportListQuery,
    ) -> ReportResult<Vec<Report>> {
        Ok(self.repository.list_by_entity(entity_id, query).await?)
    }

    pub async fn get_by_status(
        &self,
        status: ValidationStatus,
        limit: i64,
    ) -> ReportResult<Vec<Report>> {
        Ok(self.repository.list_by_status(status, limit).await?)
    }

    /// In-flight reports whose validation started more than `timeout` before `now`.
    pub async fn get_timed_out_candidates(
        &self,
        now: DateTime<Utc>,
        timeout: Duration,
        limit: i64,
    ) -> ReportResult<Vec<Report>> {
        Ok(self
            .repository
            .find_timed_out_candidates(now - timeout, limit)
            .await?)
    }

    /// The report followed by each report it corrects, back to the first
    /// submission.
    #[tracing::instrument(skip(self))]
    pub async fn correction_chain(&self, report_id: Uuid) -> ReportResult<Vec<Report>> {
        let mut chain = vec![self.load(report_id).await?];
        let mut seen = HashSet::from([report_id]);

        while let Some(previous_id) = chain.last().and_then(|r| r.correction_of_report_id()) {
            if chain.len() >= MAX_CORRECTION_CHAIN || !seen.insert(previous_id) {
                tracing::warn!(
                    previous_id = %previous_id,
                    length = chain.len(),
                    "Correction chain truncated"
                );
                break;
            }
            match self.repository.get_by_id(previous_id).await? {
                Some(previous) => chain.push(previous),
                None => {
                    tracing::warn!(previous_id = %previous_id, "Correction chain link missing");
                    break;
                }
            }
        }
        Ok(chain)
    }

    pub async fn validation_history(&self, report_id: Uuid) -> ReportResult<Vec<ValidationResult>> {
        self.load(report_id).await?;
        Ok(self.repository.list_validation_results(report_id).await?)
    }

    pub async fn entity_stats(&self, entity_id: i64) -> ReportResult<ReportStats> {
        Ok(self.repository.entity_stats(entity_id).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn download_report_file(&self, report_id: Uuid) -> ReportResult<ReportFile> {
        let report = self.load(report_id).await?;
        let data = self
            .storage
            .download(report.file_storage_key())
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to download report file");
                ReportError::from(e)
            })?;

        Ok(ReportFile {
            report_id,
            file_name: report.file_name().to_string(),
            data,
        })
    }
}
