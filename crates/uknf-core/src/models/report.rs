use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{ReportError, ReportResult};

/// Validation status of a report.
///
/// `Working` is the only initial state. `Successful`, `ValidationErrors`,
/// `TechnicalError`, `TimeoutError` and `ContestedByUknf` accept no further
/// engine-driven transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "validation_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Working,
    Transmitted,
    Ongoing,
    Successful,
    ValidationErrors,
    TechnicalError,
    TimeoutError,
    ContestedByUknf,
}

impl ValidationStatus {
    pub const ALL: [ValidationStatus; 8] = [
        ValidationStatus::Working,
        ValidationStatus::Transmitted,
        ValidationStatus::Ongoing,
        ValidationStatus::Successful,
        ValidationStatus::ValidationErrors,
        ValidationStatus::TechnicalError,
        ValidationStatus::TimeoutError,
        ValidationStatus::ContestedByUknf,
    ];

    /// Handed to the engine and not yet finished.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, ValidationStatus::Transmitted | ValidationStatus::Ongoing)
    }

    /// A validation attempt has produced its final outcome.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ValidationStatus::Successful
                | ValidationStatus::ValidationErrors
                | ValidationStatus::TechnicalError
                | ValidationStatus::TimeoutError
                | ValidationStatus::ContestedByUknf
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::Working => "working",
            ValidationStatus::Transmitted => "transmitted",
            ValidationStatus::Ongoing => "ongoing",
            ValidationStatus::Successful => "successful",
            ValidationStatus::ValidationErrors => "validation_errors",
            ValidationStatus::TechnicalError => "technical_error",
            ValidationStatus::TimeoutError => "timeout_error",
            ValidationStatus::ContestedByUknf => "contested_by_uknf",
        }
    }
}

impl Display for ValidationStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ValidationStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("Invalid validation status: {}", s))
    }
}

/// Events that move a report through the validation lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportTransition {
    StartValidation,
    MarkOngoing,
    CompleteSuccessfully,
    CompleteWithErrors,
    RecordTechnicalError,
    RecordTimeout,
    Contest,
}

impl Display for ReportTransition {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            ReportTransition::StartValidation => "start_validation",
            ReportTransition::MarkOngoing => "mark_ongoing",
            ReportTransition::CompleteSuccessfully => "complete_successfully",
            ReportTransition::CompleteWithErrors => "complete_with_errors",
            ReportTransition::RecordTechnicalError => "record_technical_error",
            ReportTransition::RecordTimeout => "record_timeout",
            ReportTransition::Contest => "contest",
        };
        f.write_str(name)
    }
}

/// A transition that has no edge from the current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot apply {transition} to a report in status {from}")]
pub struct InvalidTransition {
    pub from: ValidationStatus,
    pub transition: ReportTransition,
}

/// The transition table. Every legal edge of the lifecycle is listed here and
/// nowhere else.
pub fn next_status(
    from: ValidationStatus,
    transition: ReportTransition,
) -> Result<ValidationStatus, InvalidTransition> {
    use ReportTransition as T;
    use ValidationStatus as S;

    match (from, transition) {
        (S::Working, T::StartValidation) => Ok(S::Transmitted),
        (S::Transmitted, T::MarkOngoing) => Ok(S::Ongoing),
        (S::Ongoing, T::CompleteSuccessfully) => Ok(S::Successful),
        (S::Ongoing, T::CompleteWithErrors) => Ok(S::ValidationErrors),
        (S::Transmitted | S::Ongoing, T::RecordTechnicalError) => Ok(S::TechnicalError),
        (S::Transmitted | S::Ongoing, T::RecordTimeout) => Ok(S::TimeoutError),
        (S::Successful, T::Contest) => Ok(S::ContestedByUknf),
        _ => Err(InvalidTransition { from, transition }),
    }
}

/// Input for creating a report in `Working`.
#[derive(Debug, Clone)]
pub struct NewReport {
    pub entity_id: i64,
    pub submitting_user_id: i64,
    pub file_name: String,
    pub file_storage_key: String,
    pub file_size: i64,
    pub file_checksum: Option<String>,
    pub report_type: String,
    pub reporting_period: String,
    pub correction_of_report_id: Option<Uuid>,
}

/// Report aggregate root.
///
/// Fields are private so status can only change through the guarded
/// transition methods. Each method checks the current status before touching
/// any field, so a rejected call leaves the report exactly as it was.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    id: Uuid,
    entity_id: i64,
    submitting_user_id: i64,
    file_name: String,
    file_storage_key: String,
    file_size: i64,
    file_checksum: Option<String>,
    report_type: String,
    reporting_period: String,
    validation_status: ValidationStatus,
    unique_validation_id: Option<String>,
    validation_result_file_key: Option<String>,
    is_archived: bool,
    archived_at: Option<DateTime<Utc>>,
    correction_of_report_id: Option<Uuid>,
    submitted_at: DateTime<Utc>,
    validation_started_at: Option<DateTime<Utc>>,
    validation_completed_at: Option<DateTime<Utc>>,
    error_description: Option<String>,
    contested_description: Option<String>,
    contested_by_user_id: Option<i64>,
    contested_at: Option<DateTime<Utc>>,
    version: i64,
}

const DEFAULT_TECHNICAL_ERROR: &str = "Technical error during validation";

impl Report {
    pub fn new(input: NewReport) -> ReportResult<Self> {
        Self::new_at(input, Utc::now())
    }

    pub fn new_at(input: NewReport, now: DateTime<Utc>) -> ReportResult<Self> {
        if input.entity_id <= 0 {
            return Err(ReportError::InvalidInput(
                "entity_id must be positive".to_string(),
            ));
        }
        if input.submitting_user_id <= 0 {
            return Err(ReportError::InvalidInput(
                "submitting_user_id must be positive".to_string(),
            ));
        }
        if input.file_size <= 0 {
            return Err(ReportError::InvalidInput(
                "file_size must be greater than zero".to_string(),
            ));
        }
        require_non_empty("file_name", &input.file_name)?;
        require_non_empty("file_storage_key", &input.file_storage_key)?;
        require_non_empty("report_type", &input.report_type)?;
        require_non_empty("reporting_period", &input.reporting_period)?;

        Ok(Self {
            id: Uuid::new_v4(),
            entity_id: input.entity_id,
            submitting_user_id: input.submitting_user_id,
            file_name: input.file_name,
            file_storage_key: input.file_storage_key,
            file_size: input.file_size,
            file_checksum: input.file_checksum,
            report_type: input.report_type.trim().to_string(),
            reporting_period: input.reporting_period.trim().to_string(),
            validation_status: ValidationStatus::Working,
            unique_validation_id: None,
            validation_result_file_key: None,
            is_archived: false,
            archived_at: None,
            correction_of_report_id: input.correction_of_report_id,
            submitted_at: now,
            validation_started_at: None,
            validation_completed_at: None,
            error_description: None,
            contested_description: None,
            contested_by_user_id: None,
            contested_at: None,
            version: 0,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn entity_id(&self) -> i64 {
        self.entity_id
    }

    pub fn submitting_user_id(&self) -> i64 {
        self.submitting_user_id
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn file_storage_key(&self) -> &str {
        &self.file_storage_key
    }

    pub fn file_size(&self) -> i64 {
        self.file_size
    }

    pub fn file_checksum(&self) -> Option<&str> {
        self.file_checksum.as_deref()
    }

    pub fn report_type(&self) -> &str {
        &self.report_type
    }

    pub fn reporting_period(&self) -> &str {
        &self.reporting_period
    }

    pub fn validation_status(&self) -> ValidationStatus {
        self.validation_status
    }

    pub fn unique_validation_id(&self) -> Option<&str> {
        self.unique_validation_id.as_deref()
    }

    pub fn validation_result_file_key(&self) -> Option<&str> {
        self.validation_result_file_key.as_deref()
    }

    pub fn is_archived(&self) -> bool {
        self.is_archived
    }

    pub fn archived_at(&self) -> Option<DateTime<Utc>> {
        self.archived_at
    }

    pub fn correction_of_report_id(&self) -> Option<Uuid> {
        self.correction_of_report_id
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    pub fn validation_started_at(&self) -> Option<DateTime<Utc>> {
        self.validation_started_at
    }

    pub fn validation_completed_at(&self) -> Option<DateTime<Utc>> {
        self.validation_completed_at
    }

    pub fn error_description(&self) -> Option<&str> {
        self.error_description.as_deref()
    }

    pub fn contested_description(&self) -> Option<&str> {
        self.contested_description.as_deref()
    }

    pub fn contested_by_user_id(&self) -> Option<i64> {
        self.contested_by_user_id
    }

    pub fn contested_at(&self) -> Option<DateTime<Utc>> {
        self.contested_at
    }

    /// Optimistic concurrency token, bumped on every successful write.
    pub fn version(&self) -> i64 {
        self.version
    }

    /// Repositories call this after a successful write.
    pub fn increment_version(&mut self) {
        self.version += 1;
    }

    /// Same entity, type and period. Used by the uniqueness check.
    pub fn matches_tuple(&self, entity_id: i64, report_type: &str, reporting_period: &str) -> bool {
        self.entity_id == entity_id
            && self.report_type == report_type
            && self.reporting_period == reporting_period
    }

    /// Whether the attempt has been in flight longer than `timeout` at `now`.
    pub fn is_timed_out(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        match self.validation_started_at {
            Some(started_at) => {
                self.validation_status.is_in_flight() && started_at < now - timeout
            }
            None => false,
        }
    }

    fn guard(&self, transition: ReportTransition) -> ReportResult<ValidationStatus> {
        next_status(self.validation_status, transition).map_err(|e| {
            ReportError::InvalidStateTransition {
                report_id: self.id,
                from: e.from,
                transition: e.transition,
            }
        })
    }

    pub fn start_validation(&mut self, unique_validation_id: &str) -> ReportResult<()> {
        self.start_validation_at(unique_validation_id, Utc::now())
    }

    /// `Working -> Transmitted`. Assigns the correlation id for this attempt.
    pub fn start_validation_at(
        &mut self,
        unique_validation_id: &str,
        now: DateTime<Utc>,
    ) -> ReportResult<()> {
        let next = self.guard(ReportTransition::StartValidation)?;
        require_non_empty("unique_validation_id", unique_validation_id)?;

        self.validation_status = next;
        self.unique_validation_id = Some(unique_validation_id.to_string());
        self.validation_started_at = Some(now);
        Ok(())
    }

    /// `Transmitted -> Ongoing`.
    pub fn mark_ongoing(&mut self) -> ReportResult<()> {
        self.validation_status = self.guard(ReportTransition::MarkOngoing)?;
        Ok(())
    }

    pub fn complete_validation(&mut self, result_file_key: Option<String>) -> ReportResult<()> {
        self.complete_validation_at(result_file_key, Utc::now())
    }

    /// `Ongoing -> Successful`.
    pub fn complete_validation_at(
        &mut self,
        result_file_key: Option<String>,
        now: DateTime<Utc>,
    ) -> ReportResult<()> {
        let next = self.guard(ReportTransition::CompleteSuccessfully)?;

        self.validation_status = next;
        self.validation_result_file_key = result_file_key;
        self.validation_completed_at = Some(now);
        Ok(())
    }

    pub fn complete_with_errors(
        &mut self,
        error_description: &str,
        result_file_key: Option<String>,
    ) -> ReportResult<()> {
        self.complete_with_errors_at(error_description, result_file_key, Utc::now())
    }

    /// `Ongoing -> ValidationErrors`. The description must not be blank.
    pub fn complete_with_errors_at(
        &mut self,
        error_description: &str,
        result_file_key: Option<String>,
        now: DateTime<Utc>,
    ) -> ReportResult<()> {
        let next = self.guard(ReportTransition::CompleteWithErrors)?;
        require_non_empty("error_description", error_description)?;

        self.validation_status = next;
        self.error_description = Some(error_description.to_string());
        self.validation_result_file_key = result_file_key;
        self.validation_completed_at = Some(now);
        Ok(())
    }

    pub fn record_technical_error(&mut self, message: &str) -> ReportResult<()> {
        self.record_technical_error_at(message, Utc::now())
    }

    /// `Transmitted | Ongoing -> TechnicalError`.
    pub fn record_technical_error_at(
        &mut self,
        message: &str,
        now: DateTime<Utc>,
    ) -> ReportResult<()> {
        let next = self.guard(ReportTransition::RecordTechnicalError)?;
        let message = if message.trim().is_empty() {
            DEFAULT_TECHNICAL_ERROR
        } else {
            message
        };

        self.validation_status = next;
        self.error_description = Some(message.to_string());
        self.validation_completed_at = Some(now);
        Ok(())
    }

    pub fn record_timeout_error(&mut self, description: &str) -> ReportResult<()> {
        self.record_timeout_error_at(description, Utc::now())
    }

    /// `Transmitted | Ongoing -> TimeoutError`.
    pub fn record_timeout_error_at(
        &mut self,
        description: &str,
        now: DateTime<Utc>,
    ) -> ReportResult<()> {
        let next = self.guard(ReportTransition::RecordTimeout)?;
        require_non_empty("error_description", description)?;

        self.validation_status = next;
        self.error_description = Some(description.to_string());
        self.validation_completed_at = Some(now);
        Ok(())
    }

    pub fn contest_by_uknf(&mut self, reviewer_id: i64, description: &str) -> ReportResult<()> {
        self.contest_by_uknf_at(reviewer_id, description, Utc::now())
    }

    /// `Successful -> ContestedByUknf`. Allowed on archived reports.
    pub fn contest_by_uknf_at(
        &mut self,
        reviewer_id: i64,
        description: &str,
        now: DateTime<Utc>,
    ) -> ReportResult<()> {
        let next = self.guard(ReportTransition::Contest)?;
        if reviewer_id <= 0 {
            return Err(ReportError::InvalidInput(
                "reviewer id must be positive".to_string(),
            ));
        }
        require_non_empty("contested_description", description)?;

        self.validation_status = next;
        self.contested_by_user_id = Some(reviewer_id);
        self.contested_description = Some(description.to_string());
        self.contested_at = Some(now);
        Ok(())
    }

    pub fn archive(&mut self) -> bool {
        self.archive_at(Utc::now())
    }

    /// Sets the archive flag. Returns `false` when the report was already
    /// archived, in which case nothing changes.
    pub fn archive_at(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_archived {
            return false;
        }
        self.is_archived = true;
        self.archived_at = Some(now);
        true
    }

    /// Checks the status/field combinations that rows loaded from storage
    /// must satisfy.
    pub fn check_consistency(&self) -> Result<(), String> {
        let has_validation_id = self.unique_validation_id.is_some();
        match self.validation_status {
            ValidationStatus::Working if has_validation_id => {
                Err("working report carries a validation id".to_string())
            }
            ValidationStatus::Working => Ok(()),
            _ if !has_validation_id => Err(format!(
                "report in status {} has no validation id",
                self.validation_status
            )),
            _ if self.validation_started_at.is_none() => Err(format!(
                "report in status {} has no validation start time",
                self.validation_status
            )),
            _ => Ok(()),
        }
    }
}

fn require_non_empty(field: &str, value: &str) -> ReportResult<()> {
    if value.trim().is_empty() {
        return Err(ReportError::InvalidInput(format!(
            "{} must not be empty",
            field
        )));
    }
    Ok(())
}

#[cfg(feature = "sqlx")]
impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for Report {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        let report = Report {
            id: row.try_get("id")?,
            entity_id: row.try_get("entity_id")?,
            submitting_user_id: row.try_get("submitting_user_id")?,
            file_name: row.try_get("file_name")?,
            file_storage_key: row.try_get("file_storage_key")?,
            file_size: row.try_get("file_size")?,
            file_checksum: row.try_get("file_checksum")?,
            report_type: row.try_get("report_type")?,
            reporting_period: row.try_get("reporting_period")?,
            validation_status: row.try_get("validation_status")?,
            unique_validation_id: row.try_get("unique_validation_id")?,
            validation_result_file_key: row.try_get("validation_result_file_key")?,
            is_archived: row.try_get("is_archived")?,
            archived_at: row.try_get("archived_at")?,
            correction_of_report_id: row.try_get("correction_of_report_id")?,
            submitted_at: row.try_get("submitted_at")?,
            validation_started_at: row.try_get("validation_started_at")?,
            validation_completed_at: row.try_get("validation_completed_at")?,
            error_description: row.try_get("error_description")?,
            contested_description: row.try_get("contested_description")?,
            contested_by_user_id: row.try_get("contested_by_user_id")?,
            contested_at: row.try_get("contested_at")?,
            version: row.try_get("version")?,
        };
        report.check_consistency().map_err(|e| {
            sqlx::Error::Decode(format!("Inconsistent report {}: {}", report.id, e).into())
        })?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_report() -> Report {
        Report::new(NewReport {
            entity_id: 1001,
            submitting_user_id: 7,
            file_name: "q1.xlsx".to_string(),
            file_storage_key: "reports/1001/abc.xlsx".to_string(),
            file_size: 1024 * 1024,
            file_checksum: None,
            report_type: "Quarterly".to_string(),
            reporting_period: "Q1_2025".to_string(),
            correction_of_report_id: None,
        })
        .unwrap()
    }

    fn ongoing_report() -> Report {
        let mut report = new_report();
        report.start_validation("vid-1").unwrap();
        report.mark_ongoing().unwrap();
        report
    }

    #[test]
    fn test_new_report_starts_working_without_validation_id() {
        let report = new_report();
        assert_eq!(report.validation_status(), ValidationStatus::Working);
        assert!(report.unique_validation_id().is_none());
        assert!(!report.is_archived());
        assert_eq!(report.version(), 0);
        assert!(report.check_consistency().is_ok());
    }

    #[test]
    fn test_new_report_rejects_zero_size() {
        let result = Report::new(NewReport {
            entity_id: 1001,
            submitting_user_id: 7,
            file_name: "q1.xlsx".to_string(),
            file_storage_key: "k".to_string(),
            file_size: 0,
            file_checksum: None,
            report_type: "Quarterly".to_string(),
            reporting_period: "Q1_2025".to_string(),
            correction_of_report_id: None,
        });
        assert!(matches!(result, Err(ReportError::InvalidInput(_))));
    }

    #[test]
    fn test_happy_path_to_successful() {
        let mut report = new_report();
        report.start_validation("vid-1").unwrap();
        assert_eq!(report.validation_status(), ValidationStatus::Transmitted);
        assert_eq!(report.unique_validation_id(), Some("vid-1"));
        assert!(report.validation_started_at().is_some());

        report.mark_ongoing().unwrap();
        assert_eq!(report.validation_status(), ValidationStatus::Ongoing);

        report
            .complete_validation(Some("results/vid-1.xlsx".to_string()))
            .unwrap();
        assert_eq!(report.validation_status(), ValidationStatus::Successful);
        assert!(report.validation_completed_at().is_some());
        assert_eq!(
            report.validation_result_file_key(),
            Some("results/vid-1.xlsx")
        );
    }

    #[test]
    fn test_start_validation_requires_id() {
        let mut report = new_report();
        let before = report.clone();
        let err = report.start_validation("  ").unwrap_err();
        assert!(matches!(err, ReportError::InvalidInput(_)));
        assert_eq!(report, before);
    }

    #[test]
    fn test_cannot_skip_ongoing() {
        let mut report = new_report();
        report.start_validation("vid-1").unwrap();
        let before = report.clone();

        let err = report.complete_validation(None).unwrap_err();
        assert!(matches!(
            err,
            ReportError::InvalidStateTransition {
                from: ValidationStatus::Transmitted,
                transition: ReportTransition::CompleteSuccessfully,
                ..
            }
        ));
        assert_eq!(report, before);
    }

    #[test]
    fn test_escape_hatches_from_both_in_flight_states() {
        let mut transmitted = new_report();
        transmitted.start_validation("vid-1").unwrap();
        transmitted.record_technical_error("engine down").unwrap();
        assert_eq!(
            transmitted.validation_status(),
            ValidationStatus::TechnicalError
        );
        assert_eq!(transmitted.error_description(), Some("engine down"));

        let mut ongoing = ongoing_report();
        ongoing.record_timeout_error("too slow").unwrap();
        assert_eq!(ongoing.validation_status(), ValidationStatus::TimeoutError);
        assert!(ongoing.validation_completed_at().is_some());
    }

    #[test]
    fn test_escape_hatches_rejected_from_working() {
        let mut report = new_report();
        assert!(report.record_technical_error("x").is_err());
        assert!(report.record_timeout_error("x").is_err());
        assert_eq!(report.validation_status(), ValidationStatus::Working);
    }

    #[test]
    fn test_second_completion_fails_and_keeps_timestamp() {
        let mut report = ongoing_report();
        let first = Utc::now() - Duration::minutes(5);
        report.complete_validation_at(None, first).unwrap();

        let before = report.clone();
        assert!(report.complete_validation(None).is_err());
        assert!(report.complete_with_errors("late", None).is_err());
        assert!(report.record_technical_error("late").is_err());
        assert!(report.record_timeout_error("late").is_err());
        assert_eq!(report, before);
        assert_eq!(report.validation_completed_at(), Some(first));
    }

    #[test]
    fn test_complete_with_errors_requires_description() {
        let mut report = ongoing_report();
        assert!(matches!(
            report.complete_with_errors("", None),
            Err(ReportError::InvalidInput(_))
        ));
        assert_eq!(report.validation_status(), ValidationStatus::Ongoing);

        report
            .complete_with_errors("row 12: missing total", None)
            .unwrap();
        assert_eq!(
            report.validation_status(),
            ValidationStatus::ValidationErrors
        );
        assert_eq!(report.error_description(), Some("row 12: missing total"));
    }

    #[test]
    fn test_empty_technical_message_gets_default() {
        let mut report = ongoing_report();
        report.record_technical_error("").unwrap();
        assert_eq!(report.error_description(), Some(DEFAULT_TECHNICAL_ERROR));
    }

    #[test]
    fn test_contest_only_once_after_success() {
        let mut report = ongoing_report();
        report.complete_validation(None).unwrap();

        report.contest_by_uknf(42, "discrepancy found").unwrap();
        assert_eq!(report.validation_status(), ValidationStatus::ContestedByUknf);
        assert_eq!(report.contested_by_user_id(), Some(42));
        assert!(report.contested_at().is_some());

        let err = report.contest_by_uknf(42, "discrepancy found").unwrap_err();
        assert!(matches!(err, ReportError::InvalidStateTransition { .. }));
    }

    #[test]
    fn test_contest_requires_reviewer_and_description() {
        let mut report = ongoing_report();
        report.complete_validation(None).unwrap();

        assert!(report.contest_by_uknf(0, "x").is_err());
        assert!(report.contest_by_uknf(42, " ").is_err());
        assert_eq!(report.validation_status(), ValidationStatus::Successful);
    }

    #[test]
    fn test_contest_allowed_when_archived() {
        let mut report = ongoing_report();
        report.complete_validation(None).unwrap();
        assert!(report.archive());
        report.contest_by_uknf(42, "late finding").unwrap();
        assert!(report.is_archived());
    }

    #[test]
    fn test_archive_is_idempotent() {
        let mut report = new_report();
        let t = Utc::now();
        assert!(report.archive_at(t));
        assert!(!report.archive_at(t + Duration::hours(1)));
        assert_eq!(report.archived_at(), Some(t));
        assert_eq!(report.validation_status(), ValidationStatus::Working);
    }

    #[test]
    fn test_is_timed_out() {
        let now = Utc::now();
        let timeout = Duration::hours(24);

        let mut report = new_report();
        assert!(!report.is_timed_out(now, timeout));

        report
            .start_validation_at("vid-1", now - Duration::hours(25))
            .unwrap();
        assert!(report.is_timed_out(now, timeout));
        assert!(!report.is_timed_out(now - Duration::hours(2), timeout));

        report.mark_ongoing().unwrap();
        assert!(report.is_timed_out(now, timeout));

        report.complete_validation(None).unwrap();
        assert!(!report.is_timed_out(now, timeout));
    }

    #[test]
    fn test_transition_table_is_exhaustive() {
        let transitions = [
            ReportTransition::StartValidation,
            ReportTransition::MarkOngoing,
            ReportTransition::CompleteSuccessfully,
            ReportTransition::CompleteWithErrors,
            ReportTransition::RecordTechnicalError,
            ReportTransition::RecordTimeout,
            ReportTransition::Contest,
        ];
        let mut legal = 0;
        for from in ValidationStatus::ALL {
            for transition in transitions {
                if let Ok(to) = next_status(from, transition) {
                    legal += 1;
                    assert_ne!(to, ValidationStatus::Working);
                    assert_ne!(from, to);
                }
            }
        }
        // start, ongoing, success, errors, 2x technical, 2x timeout, contest
        assert_eq!(legal, 9);
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in ValidationStatus::ALL {
            assert_eq!(status.as_str().parse::<ValidationStatus>().unwrap(), status);
        }
        assert!("contested".parse::<ValidationStatus>().is_err());
    }
}
