use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uknf_core::models::{Report, ReportListQuery, ReportStats, ValidationResult, ValidationStatus};
use uuid::Uuid;

use crate::error::{RepositoryError, RepositoryResult};
use crate::repository::ReportRepository;

#[derive(Default)]
struct State {
    reports: HashMap<Uuid, Report>,
    results: HashMap<String, ValidationResult>,
}

impl State {
    fn check_unique(&self, report: &Report) -> RepositoryResult<()> {
        for other in self.reports.values() {
            if other.id() == report.id() {
                continue;
            }
            if !report.is_archived()
                && !other.is_archived()
                && other.matches_tuple(
                    report.entity_id(),
                    report.report_type(),
                    report.reporting_period(),
                )
            {
                return Err(RepositoryError::DuplicateReport {
                    entity_id: report.entity_id(),
                    report_type: report.report_type().to_string(),
                    reporting_period: report.reporting_period().to_string(),
                });
            }
            if let (Some(a), Some(b)) = (report.unique_validation_id(), other.unique_validation_id())
            {
                if a == b {
                    return Err(RepositoryError::DuplicateValidationId(a.to_string()));
                }
            }
        }
        Ok(())
    }

    fn check_version(&self, report: &Report) -> RepositoryResult<()> {
        match self.reports.get(&report.id()) {
            Some(stored) if stored.version() == report.version() => Ok(()),
            Some(_) => Err(RepositoryError::Conflict(report.id())),
            None => Err(RepositoryError::NotFound(report.id())),
        }
    }
}

/// Repository kept entirely in process memory.
///
/// Enforces the same uniqueness and optimistic-version rules as the
/// PostgreSQL implementation. Used by tests and local development.
#[derive(Clone, Default)]
pub struct InMemoryReportRepository {
    state: Arc<Mutex<State>>,
}

impl InMemoryReportRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.reports.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.reports.is_empty()
    }
}

#[async_trait]
impl ReportRepository for InMemoryReportRepository {
    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Option<Report>> {
        Ok(self.state.lock().await.reports.get(&id).cloned())
    }

    async fn find_by_validation_id(
        &self,
        unique_validation_id: &str,
    ) -> RepositoryResult<Option<Report>> {
        let state = self.state.lock().await;
        Ok(state
            .reports
            .values()
            .find(|r| r.unique_validation_id() == Some(unique_validation_id))
            .cloned())
    }

    async fn find_active_by_tuple(
        &self,
        entity_id: i64,
        report_type: &str,
        reporting_period: &str,
    ) -> RepositoryResult<Option<Report>> {
        let state = self.state.lock().await;
        Ok(state
            .reports
            .values()
            .find(|r| !r.is_archived() && r.matches_tuple(entity_id, report_type, reporting_period))
            .cloned())
    }

    async fn list_by_entity(
        &self,
        entity_id: i64,
        query: &ReportListQuery,
    ) -> RepositoryResult<Vec<Report>> {
        let query = query.normalized();
        let state = self.state.lock().await;
        let mut reports: Vec<Report> = state
            .reports
            .values()
            .filter(|r| r.entity_id() == entity_id)
            .filter(|r| query.include_archived || !r.is_archived())
            .filter(|r| query.status.map_or(true, |s| r.validation_status() == s))
            .cloned()
            .collect();
        reports.sort_by(|a, b| b.submitted_at().cmp(&a.submitted_at()));

        Ok(reports
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .collect())
    }

    async fn list_by_status(
        &self,
        status: ValidationStatus,
        limit: i64,
    ) -> RepositoryResult<Vec<Report>> {
        let state = self.state.lock().await;
        let mut reports: Vec<Report> = state
            .reports
            .values()
            .filter(|r| r.validation_status() == status)
            .cloned()
            .collect();
        reports.sort_by_key(|r| r.submitted_at());
        reports.truncate(limit.max(0) as usize);
        Ok(reports)
    }

    async fn find_timed_out_candidates(
        &self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> RepositoryResult<Vec<Report>> {
        let state = self.state.lock().await;
        let mut reports: Vec<Report> = state
            .reports
            .values()
            .filter(|r| r.validation_status().is_in_flight())
            .filter(|r| r.validation_started_at().is_some_and(|t| t < cutoff))
            .cloned()
            .collect();
        reports.sort_by_key(|r| r.validation_started_at());
        reports.truncate(limit.max(0) as usize);
        Ok(reports)
    }

    async fn insert(&self, report: &Report) -> RepositoryResult<()> {
        let mut state = self.state.lock().await;
        if state.reports.contains_key(&report.id()) {
            return Err(RepositoryError::Conflict(report.id()));
        }
        state.check_unique(report)?;
        state.reports.insert(report.id(), report.clone());
        Ok(())
    }

    async fn update(&self, report: &mut Report) -> RepositoryResult<()> {
        let mut state = self.state.lock().await;
        state.check_version(report)?;
        state.check_unique(report)?;

        report.increment_version();
        state.reports.insert(report.id(), report.clone());
        Ok(())
    }

    async fn update_with_result(
        &self,
        report: &mut Report,
        result: &ValidationResult,
    ) -> RepositoryResult<()> {
        let mut state = self.state.lock().await;
        state.check_version(report)?;
        state.check_unique(report)?;
        if let Some(existing) = state.results.get(result.unique_validation_id()) {
            if existing.report_id() != result.report_id() {
                return Err(RepositoryError::DuplicateValidationId(
                    result.unique_validation_id().to_string(),
                ));
            }
        }

        report.increment_version();
        state.reports.insert(report.id(), report.clone());
        state
            .results
            .insert(result.unique_validation_id().to_string(), result.clone());
        Ok(())
    }

    async fn find_validation_result(
        &self,
        unique_validation_id: &str,
    ) -> RepositoryResult<Option<ValidationResult>> {
        Ok(self
            .state
            .lock()
            .await
            .results
            .get(unique_validation_id)
            .cloned())
    }

    async fn list_validation_results(
        &self,
        report_id: Uuid,
    ) -> RepositoryResult<Vec<ValidationResult>> {
        let state = self.state.lock().await;
        let mut results: Vec<ValidationResult> = state
            .results
            .values()
            .filter(|r| r.report_id() == report_id)
            .cloned()
            .collect();
        results.sort_by_key(|r| r.started_at());
        Ok(results)
    }

    async fn entity_stats(&self, entity_id: i64) -> RepositoryResult<ReportStats> {
        let state = self.state.lock().await;
        let mut stats = ReportStats::new(entity_id);
        for report in state.reports.values().filter(|r| r.entity_id() == entity_id) {
            stats.record(report.validation_status(), report.is_archived(), 1);
        }
        Ok(stats)
    }
}
