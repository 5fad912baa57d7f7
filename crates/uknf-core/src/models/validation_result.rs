use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{ReportError, ReportResult};
use crate::models::report::{ReportTransition, ValidationStatus};

/// One pass of a report through the external validation engine.
///
/// Created in `Ongoing` when validation starts and completed exactly once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    id: Uuid,
    report_id: Uuid,
    unique_validation_id: String,
    status: ValidationStatus,
    is_valid: bool,
    errors: Option<serde_json::Value>,
    warnings: Option<serde_json::Value>,
    extracted_metadata: Option<serde_json::Value>,
    technical_error_message: Option<String>,
    result_file_key: Option<String>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl ValidationResult {
    pub fn new(report_id: Uuid, unique_validation_id: impl Into<String>) -> Self {
        Self::new_at(report_id, unique_validation_id, Utc::now())
    }

    pub fn new_at(
        report_id: Uuid,
        unique_validation_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            report_id,
            unique_validation_id: unique_validation_id.into(),
            status: ValidationStatus::Ongoing,
            is_valid: false,
            errors: None,
            warnings: None,
            extracted_metadata: None,
            technical_error_message: None,
            result_file_key: None,
            started_at: now,
            completed_at: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn report_id(&self) -> Uuid {
        self.report_id
    }

    pub fn unique_validation_id(&self) -> &str {
        &self.unique_validation_id
    }

    pub fn status(&self) -> ValidationStatus {
        self.status
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn errors(&self) -> Option<&serde_json::Value> {
        self.errors.as_ref()
    }

    pub fn warnings(&self) -> Option<&serde_json::Value> {
        self.warnings.as_ref()
    }

    pub fn extracted_metadata(&self) -> Option<&serde_json::Value> {
        self.extracted_metadata.as_ref()
    }

    pub fn technical_error_message(&self) -> Option<&str> {
        self.technical_error_message.as_deref()
    }

    pub fn result_file_key(&self) -> Option<&str> {
        self.result_file_key.as_deref()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    fn ensure_ongoing(&self, transition: ReportTransition) -> ReportResult<()> {
        if self.status != ValidationStatus::Ongoing {
            return Err(ReportError::InvalidStateTransition {
                report_id: self.report_id,
                from: self.status,
                transition,
            });
        }
        Ok(())
    }

    /// Records the engine's verdict. `is_valid` selects `Successful` or
    /// `ValidationErrors`.
    pub fn complete_validation(
        &mut self,
        is_valid: bool,
        errors: Option<serde_json::Value>,
        warnings: Option<serde_json::Value>,
        extracted_metadata: Option<serde_json::Value>,
        result_file_key: Option<String>,
        now: DateTime<Utc>,
    ) -> ReportResult<()> {
        let transition = if is_valid {
            ReportTransition::CompleteSuccessfully
        } else {
            ReportTransition::CompleteWithErrors
        };
        self.ensure_ongoing(transition)?;

        self.status = if is_valid {
            ValidationStatus::Successful
        } else {
            ValidationStatus::ValidationErrors
        };
        self.is_valid = is_valid;
        self.errors = errors;
        self.warnings = warnings;
        self.extracted_metadata = extracted_metadata;
        self.result_file_key = result_file_key;
        self.completed_at = Some(now);
        Ok(())
    }

    pub fn mark_as_technical_error(
        &mut self,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> ReportResult<()> {
        self.ensure_ongoing(ReportTransition::RecordTechnicalError)?;
        self.status = ValidationStatus::TechnicalError;
        self.technical_error_message = Some(message.into());
        self.completed_at = Some(now);
        Ok(())
    }

    pub fn mark_as_timeout(
        &mut self,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> ReportResult<()> {
        self.ensure_ongoing(ReportTransition::RecordTimeout)?;
        self.status = ValidationStatus::TimeoutError;
        self.technical_error_message = Some(message.into());
        self.completed_at = Some(now);
        Ok(())
    }
}

#[cfg(feature = "sqlx")]
impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for ValidationResult {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(ValidationResult {
            id: row.try_get("id")?,
            report_id: row.try_get("report_id")?,
            unique_validation_id: row.try_get("unique_validation_id")?,
            status: row.try_get("status")?,
            is_valid: row.try_get("is_valid")?,
            errors: row.try_get("errors")?,
            warnings: row.try_get("warnings")?,
            extracted_metadata: row.try_get("extracted_metadata")?,
            technical_error_message: row.try_get("technical_error_message")?,
            result_file_key: row.try_get("result_file_key")?,
            started_at: row.try_get("started_at")?,
            completed_at: row.try_get("completed_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_result_is_ongoing() {
        let result = ValidationResult::new(Uuid::new_v4(), "vid-1");
        assert_eq!(result.status(), ValidationStatus::Ongoing);
        assert!(!result.is_valid());
        assert!(result.completed_at().is_none());
    }

    #[test]
    fn test_complete_with_errors_keeps_payloads() {
        let mut result = ValidationResult::new(Uuid::new_v4(), "vid-1");
        result
            .complete_validation(
                false,
                Some(json!([{"cell": "B4", "message": "negative value"}])),
                Some(json!([])),
                None,
                None,
                Utc::now(),
            )
            .unwrap();
        assert_eq!(result.status(), ValidationStatus::ValidationErrors);
        assert!(result.errors().is_some());
    }

    #[test]
    fn test_completes_only_once() {
        let mut result = ValidationResult::new(Uuid::new_v4(), "vid-1");
        result
            .complete_validation(true, None, None, None, None, Utc::now())
            .unwrap();
        let before = result.clone();

        assert!(result
            .complete_validation(true, None, None, None, None, Utc::now())
            .is_err());
        assert!(result.mark_as_technical_error("x", Utc::now()).is_err());
        assert!(result.mark_as_timeout("x", Utc::now()).is_err());
        assert_eq!(result, before);
    }

    #[test]
    fn test_mark_as_timeout() {
        let mut result = ValidationResult::new(Uuid::new_v4(), "vid-1");
        result
            .mark_as_timeout("Validation did not complete within 24 hours", Utc::now())
            .unwrap();
        assert_eq!(result.status(), ValidationStatus::TimeoutError);
        assert!(result.technical_error_message().is_some());
    }
}
