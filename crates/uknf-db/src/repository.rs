use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uknf_core::models::{Report, ReportListQuery, ReportStats, ValidationResult, ValidationStatus};
use uuid::Uuid;

use crate::error::RepositoryResult;

/// Persistence contract for report aggregates and their validation attempts.
///
/// Writes are optimistic: `update` and `update_with_result` only succeed if
/// the stored version still equals `report.version()`, and bump it on
/// success. A stale write fails with `RepositoryError::Conflict`.
#[async_trait]
pub trait ReportRepository: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Option<Report>>;

    async fn find_by_validation_id(
        &self,
        unique_validation_id: &str,
    ) -> RepositoryResult<Option<Report>>;

    /// The non-archived report for the tuple, if any.
    async fn find_active_by_tuple(
        &self,
        entity_id: i64,
        report_type: &str,
        reporting_period: &str,
    ) -> RepositoryResult<Option<Report>>;

    async fn exists_active(
        &self,
        entity_id: i64,
        report_type: &str,
        reporting_period: &str,
    ) -> RepositoryResult<bool> {
        Ok(self
            .find_active_by_tuple(entity_id, report_type, reporting_period)
            .await?
            .is_some())
    }

    /// Newest first.
    async fn list_by_entity(
        &self,
        entity_id: i64,
        query: &ReportListQuery,
    ) -> RepositoryResult<Vec<Report>>;

    /// Oldest submission first.
    async fn list_by_status(
        &self,
        status: ValidationStatus,
        limit: i64,
    ) -> RepositoryResult<Vec<Report>>;

    /// In-flight reports whose validation started before `cutoff`, oldest first.
    async fn find_timed_out_candidates(
        &self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> RepositoryResult<Vec<Report>>;

    /// Fails with `DuplicateReport` if an active report holds the same tuple.
    async fn insert(&self, report: &Report) -> RepositoryResult<()>;

    async fn update(&self, report: &mut Report) -> RepositoryResult<()>;

    /// Updates the report and upserts the validation attempt atomically.
    async fn update_with_result(
        &self,
        report: &mut Report,
        result: &ValidationResult,
    ) -> RepositoryResult<()>;

    async fn find_validation_result(
        &self,
        unique_validation_id: &str,
    ) -> RepositoryResult<Option<ValidationResult>>;

    /// Oldest attempt first.
    async fn list_validation_results(
        &self,
        report_id: Uuid,
    ) -> RepositoryResult<Vec<ValidationResult>>;

    async fn entity_stats(&self, entity_id: i64) -> RepositoryResult<ReportStats>;
}
