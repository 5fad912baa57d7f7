use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row};
use uknf_core::models::{Report, ReportListQuery, ReportStats, ValidationResult, ValidationStatus};
use uuid::Uuid;

use crate::error::{RepositoryError, RepositoryResult};
use crate::repository::ReportRepository;

const REPORT_COLUMNS: &str = r#"
    id, entity_id, submitting_user_id, file_name, file_storage_key, file_size,
    file_checksum, report_type, reporting_period, validation_status,
    unique_validation_id, validation_result_file_key, is_archived, archived_at,
    correction_of_report_id, submitted_at, validation_started_at,
    validation_completed_at, error_description, contested_description,
    contested_by_user_id, contested_at, version
"#;

const VALIDATION_RESULT_COLUMNS: &str = r#"
    id, report_id, unique_validation_id, status, is_valid, errors, warnings,
    extracted_metadata, technical_error_message, result_file_key, started_at,
    completed_at
"#;

const ACTIVE_TUPLE_CONSTRAINT: &str = "reports_active_tuple_key";
const VALIDATION_ID_CONSTRAINTS: [&str; 2] = [
    "reports_unique_validation_id_key",
    "validation_results_unique_validation_id_key",
];

#[derive(Clone)]
pub struct PgReportRepository {
    pool: PgPool,
}

impl PgReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Translates unique violations into typed duplicates.
    fn map_write_error(err: sqlx::Error, report: &Report) -> RepositoryError {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                match db_err.constraint() {
                    Some(ACTIVE_TUPLE_CONSTRAINT) => {
                        return RepositoryError::DuplicateReport {
                            entity_id: report.entity_id(),
                            report_type: report.report_type().to_string(),
                            reporting_period: report.reporting_period().to_string(),
                        };
                    }
                    Some(name) if VALIDATION_ID_CONSTRAINTS.contains(&name) => {
                        return RepositoryError::DuplicateValidationId(
                            report.unique_validation_id().unwrap_or_default().to_string(),
                        );
                    }
                    _ => {}
                }
            }
        }
        tracing::error!(
            error = %err,
            report_id = %report.id(),
            "Failed to write report"
        );
        RepositoryError::Database(err)
    }

    /// Versioned UPDATE of every mutable column. Runs on any executor so it
    /// can share a transaction with the validation result upsert.
    async fn update_report<'e, E>(executor: E, report: &Report) -> Result<u64, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE reports
            SET validation_status = $3,
                unique_validation_id = $4,
                validation_result_file_key = $5,
                is_archived = $6,
                archived_at = $7,
                validation_started_at = $8,
                validation_completed_at = $9,
                error_description = $10,
                contested_description = $11,
                contested_by_user_id = $12,
                contested_at = $13,
                version = version + 1
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(report.id())
        .bind(report.version())
        .bind(report.validation_status())
        .bind(report.unique_validation_id())
        .bind(report.validation_result_file_key())
        .bind(report.is_archived())
        .bind(report.archived_at())
        .bind(report.validation_started_at())
        .bind(report.validation_completed_at())
        .bind(report.error_description())
        .bind(report.contested_description())
        .bind(report.contested_by_user_id())
        .bind(report.contested_at())
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Distinguishes a stale version from a missing row after an UPDATE
    /// touched nothing.
    async fn missed_update(&self, report: &Report) -> RepositoryError {
        match self.get_by_id(report.id()).await {
            Ok(Some(current)) => {
                tracing::warn!(
                    report_id = %report.id(),
                    expected_version = report.version(),
                    actual_version = current.version(),
                    "Optimistic concurrency conflict on report update"
                );
                RepositoryError::Conflict(report.id())
            }
            Ok(None) => RepositoryError::NotFound(report.id()),
            Err(e) => e,
        }
    }
}

#[async_trait]
impl ReportRepository for PgReportRepository {
    #[tracing::instrument(skip(self))]
    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Option<Report>> {
        let sql = format!("SELECT {} FROM reports WHERE id = $1", REPORT_COLUMNS);
        let report = sqlx::query_as::<Postgres, Report>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(report)
    }

    #[tracing::instrument(skip(self))]
    async fn find_by_validation_id(
        &self,
        unique_validation_id: &str,
    ) -> RepositoryResult<Option<Report>> {
        let sql = format!(
            "SELECT {} FROM reports WHERE unique_validation_id = $1",
            REPORT_COLUMNS
        );
        let report = sqlx::query_as::<Postgres, Report>(&sql)
            .bind(unique_validation_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(report)
    }

    #[tracing::instrument(skip(self))]
    async fn find_active_by_tuple(
        &self,
        entity_id: i64,
        report_type: &str,
        reporting_period: &str,
    ) -> RepositoryResult<Option<Report>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM reports
            WHERE entity_id = $1
              AND report_type = $2
              AND reporting_period = $3
              AND NOT is_archived
            "#,
            REPORT_COLUMNS
        );
        let report = sqlx::query_as::<Postgres, Report>(&sql)
            .bind(entity_id)
            .bind(report_type)
            .bind(reporting_period)
            .fetch_optional(&self.pool)
            .await?;
        Ok(report)
    }

    #[tracing::instrument(skip(self))]
    async fn list_by_entity(
        &self,
        entity_id: i64,
        query: &ReportListQuery,
    ) -> RepositoryResult<Vec<Report>> {
        let query = query.normalized();
        let sql = format!(
            r#"
            SELECT {}
            FROM reports
            WHERE entity_id = $1
              AND ($2::validation_status IS NULL OR validation_status = $2)
              AND ($3 OR NOT is_archived)
            ORDER BY submitted_at DESC
            LIMIT $4 OFFSET $5
            "#,
            REPORT_COLUMNS
        );
        let reports = sqlx::query_as::<Postgres, Report>(&sql)
            .bind(entity_id)
            .bind(query.status)
            .bind(query.include_archived)
            .bind(query.limit)
            .bind(query.offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(reports)
    }

    #[tracing::instrument(skip(self))]
    async fn list_by_status(
        &self,
        status: ValidationStatus,
        limit: i64,
    ) -> RepositoryResult<Vec<Report>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM reports
            WHERE validation_status = $1
            ORDER BY submitted_at ASC
            LIMIT $2
            "#,
            REPORT_COLUMNS
        );
        let reports = sqlx::query_as::<Postgres, Report>(&sql)
            .bind(status)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(reports)
    }

    #[tracing::instrument(skip(self))]
    async fn find_timed_out_candidates(
        &self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> RepositoryResult<Vec<Report>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM reports
            WHERE validation_status IN ('transmitted', 'ongoing')
              AND validation_started_at < $1
            ORDER BY validation_started_at ASC
            LIMIT $2
            "#,
            REPORT_COLUMNS
        );
        let reports = sqlx::query_as::<Postgres, Report>(&sql)
            .bind(cutoff)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(reports)
    }

    #[tracing::instrument(skip(self, report), fields(report_id = %report.id()))]
    async fn insert(&self, report: &Report) -> RepositoryResult<()> {
        sqlx::query(
            r#"
            INSERT INTO reports (
                id, entity_id, submitting_user_id, file_name, file_storage_key,
                file_size, file_checksum, report_type, reporting_period,
                validation_status, unique_validation_id, is_archived,
                correction_of_report_id, submitted_at, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(report.id())
        .bind(report.entity_id())
        .bind(report.submitting_user_id())
        .bind(report.file_name())
        .bind(report.file_storage_key())
        .bind(report.file_size())
        .bind(report.file_checksum())
        .bind(report.report_type())
        .bind(report.reporting_period())
        .bind(report.validation_status())
        .bind(report.unique_validation_id())
        .bind(report.is_archived())
        .bind(report.correction_of_report_id())
        .bind(report.submitted_at())
        .bind(report.version())
        .execute(&self.pool)
        .await
        .map_err(|e| Self::map_write_error(e, report))?;

        tracing::debug!(entity_id = report.entity_id(), "Report row inserted");
        Ok(())
    }

    #[tracing::instrument(skip(self, report), fields(report_id = %report.id(), version = report.version()))]
    async fn update(&self, report: &mut Report) -> RepositoryResult<()> {
        let affected = Self::update_report(&self.pool, report)
            .await
            .map_err(|e| Self::map_write_error(e, report))?;

        if affected == 0 {
            return Err(self.missed_update(report).await);
        }

        report.increment_version();
        Ok(())
    }

    #[tracing::instrument(
        skip(self, report, result),
        fields(report_id = %report.id(), validation_id = %result.unique_validation_id())
    )]
    async fn update_with_result(
        &self,
        report: &mut Report,
        result: &ValidationResult,
    ) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await?;

        let affected = Self::update_report(&mut *tx, report)
            .await
            .map_err(|e| Self::map_write_error(e, report))?;

        if affected == 0 {
            tx.rollback().await?;
            return Err(self.missed_update(report).await);
        }

        sqlx::query(
            r#"
            INSERT INTO validation_results (
                id, report_id, unique_validation_id, status, is_valid, errors,
                warnings, extracted_metadata, technical_error_message,
                result_file_key, started_at, completed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (unique_validation_id) DO UPDATE
            SET status = EXCLUDED.status,
                is_valid = EXCLUDED.is_valid,
                errors = EXCLUDED.errors,
                warnings = EXCLUDED.warnings,
                extracted_metadata = EXCLUDED.extracted_metadata,
                technical_error_message = EXCLUDED.technical_error_message,
                result_file_key = EXCLUDED.result_file_key,
                completed_at = EXCLUDED.completed_at
            WHERE validation_results.report_id = EXCLUDED.report_id
            "#,
        )
        .bind(result.id())
        .bind(result.report_id())
        .bind(result.unique_validation_id())
        .bind(result.status())
        .bind(result.is_valid())
        .bind(result.errors())
        .bind(result.warnings())
        .bind(result.extracted_metadata())
        .bind(result.technical_error_message())
        .bind(result.result_file_key())
        .bind(result.started_at())
        .bind(result.completed_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| Self::map_write_error(e, report))?;

        tx.commit().await.map_err(|e| {
            tracing::error!(
                error = %e,
                report_id = %report.id(),
                "Failed to commit report update"
            );
            RepositoryError::Database(e)
        })?;

        report.increment_version();
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn find_validation_result(
        &self,
        unique_validation_id: &str,
    ) -> RepositoryResult<Option<ValidationResult>> {
        let sql = format!(
            "SELECT {} FROM validation_results WHERE unique_validation_id = $1",
            VALIDATION_RESULT_COLUMNS
        );
        let result = sqlx::query_as::<Postgres, ValidationResult>(&sql)
            .bind(unique_validation_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(result)
    }

    #[tracing::instrument(skip(self))]
    async fn list_validation_results(
        &self,
        report_id: Uuid,
    ) -> RepositoryResult<Vec<ValidationResult>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM validation_results
            WHERE report_id = $1
            ORDER BY started_at ASC
            "#,
            VALIDATION_RESULT_COLUMNS
        );
        let results = sqlx::query_as::<Postgres, ValidationResult>(&sql)
            .bind(report_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(results)
    }

    #[tracing::instrument(skip(self))]
    async fn entity_stats(&self, entity_id: i64) -> RepositoryResult<ReportStats> {
        let rows = sqlx::query(
            r#"
            SELECT validation_status, is_archived, COUNT(*) AS count
            FROM reports
            WHERE entity_id = $1
            GROUP BY validation_status, is_archived
            "#,
        )
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;

        let mut stats = ReportStats::new(entity_id);
        for row in rows {
            let status: ValidationStatus = row.try_get("validation_status")?;
            let is_archived: bool = row.try_get("is_archived")?;
            let count: i64 = row.try_get("count")?;
            stats.record(status, is_archived, count);
        }
        Ok(stats)
    }
}
