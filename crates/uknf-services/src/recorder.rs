//! Applies validation engine outcomes to reports.
//!
//! Outcomes are correlated by `unique_validation_id`. A callback for an
//! attempt that already reached a terminal status is acknowledged without
//! touching the report, which makes redelivery and late callbacks (for
//! example after a timeout sweep) harmless.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uknf_core::{Report, ReportError, ReportEvent, ReportResult, ValidationResult, ValidationStatus};
use uknf_db::{RepositoryError, ReportRepository};

use crate::events::{publish_in_background, ReportEventPublisher};

/// Reads and reapplies an outcome this many times when it loses an
/// optimistic concurrency race.
const MAX_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ValidationOutcome {
    Success {
        result_file_key: Option<String>,
        metadata: Option<serde_json::Value>,
    },
    ValidationFailure {
        errors: serde_json::Value,
        warnings: Option<serde_json::Value>,
        result_file_key: Option<String>,
    },
    TechnicalFailure {
        message: String,
    },
}

impl ValidationOutcome {
    fn kind(&self) -> &'static str {
        match self {
            ValidationOutcome::Success { .. } => "success",
            ValidationOutcome::ValidationFailure { .. } => "validation_failure",
            ValidationOutcome::TechnicalFailure { .. } => "technical_failure",
        }
    }

    /// Whether a report already in `status` reflects this outcome.
    fn agrees_with(&self, status: ValidationStatus) -> bool {
        matches!(
            (self, status),
            (
                ValidationOutcome::Success { .. },
                ValidationStatus::Successful | ValidationStatus::ContestedByUknf
            ) | (
                ValidationOutcome::ValidationFailure { .. },
                ValidationStatus::ValidationErrors
            ) | (
                ValidationOutcome::TechnicalFailure { .. },
                ValidationStatus::TechnicalError
            )
        )
    }
}

/// What `record_outcome` did with a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The outcome moved the report into this status.
    Applied(ValidationStatus),
    /// The attempt had already finished in this status; nothing changed.
    AlreadyFinal(ValidationStatus),
}

impl RecordOutcome {
    pub fn status(&self) -> ValidationStatus {
        match self {
            RecordOutcome::Applied(s) | RecordOutcome::AlreadyFinal(s) => *s,
        }
    }
}

pub struct ValidationResultRecorder {
    repository: Arc<dyn ReportRepository>,
    publisher: Arc<dyn ReportEventPublisher>,
}

impl ValidationResultRecorder {
    pub fn new(
        repository: Arc<dyn ReportRepository>,
        publisher: Arc<dyn ReportEventPublisher>,
    ) -> Self {
        Self {
            repository,
            publisher,
        }
    }

    #[tracing::instrument(skip(self, outcome), fields(outcome = outcome.kind()))]
    pub async fn record_outcome(
        &self,
        unique_validation_id: &str,
        outcome: ValidationOutcome,
    ) -> ReportResult<RecordOutcome> {
        let mut last_conflict = None;

        for attempt in 1..=MAX_ATTEMPTS {
            let mut report = self
                .repository
                .find_by_validation_id(unique_validation_id)
                .await?
                .ok_or_else(|| {
                    tracing::warn!("Discarding outcome for unknown validation id");
                    ReportError::UnknownValidation(unique_validation_id.to_string())
                })?;

            let current = report.validation_status();
            if current.is_terminal() {
                if outcome.agrees_with(current) {
                    tracing::info!(
                        report_id = %report.id(),
                        status = %current,
                        "Duplicate validation callback ignored"
                    );
                } else {
                    tracing::warn!(
                        report_id = %report.id(),
                        status = %current,
                        "Late validation outcome disagrees with final status; ignored"
                    );
                }
                return Ok(RecordOutcome::AlreadyFinal(current));
            }

            let mut result = match self
                .repository
                .find_validation_result(unique_validation_id)
                .await?
            {
                Some(result) => result,
                None => {
                    tracing::warn!(
                        report_id = %report.id(),
                        "Validation result missing for in-flight report; recreating"
                    );
                    ValidationResult::new_at(
                        report.id(),
                        unique_validation_id,
                        report.validation_started_at().unwrap_or_else(Utc::now),
                    )
                }
            };

            // The report was read before a concurrent writer (the timeout
            // sweep) finished the attempt; reread it to see the final status.
            if result.status().is_terminal() {
                tracing::warn!(
                    report_id = %report.id(),
                    attempt = attempt,
                    result_status = %result.status(),
                    "Validation attempt finished concurrently; reloading"
                );
                last_conflict = Some(report.id());
                continue;
            }

            if let Err(e) = apply(&mut report, &mut result, &outcome) {
                tracing::warn!(error = %e, report_id = %report.id(), "Outcome rejected");
                return Err(e);
            }

            match self
                .repository
                .update_with_result(&mut report, &result)
                .await
            {
                Ok(()) => {
                    let status = report.validation_status();
                    tracing::info!(
                        report_id = %report.id(),
                        entity_id = report.entity_id(),
                        status = %status,
                        "Validation outcome recorded"
                    );
                    if let Some(event) = ReportEvent::validation_finished(&report) {
                        publish_in_background(self.publisher.clone(), event);
                    }
                    return Ok(RecordOutcome::Applied(status));
                }
                Err(RepositoryError::Conflict(report_id)) => {
                    tracing::warn!(
                        report_id = %report_id,
                        attempt = attempt,
                        "Report changed while recording outcome; reloading"
                    );
                    last_conflict = Some(report_id);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(match last_conflict {
            Some(report_id) => ReportError::ConcurrencyConflict(report_id),
            None => ReportError::Internal("outcome recording did not converge".to_string()),
        })
    }
}

/// Applies the outcome to both the report and its attempt. An outcome that
/// arrives while the report is still `Transmitted` first moves it to
/// `Ongoing`, so success and errors never skip that state.
fn apply(
    report: &mut Report,
    result: &mut ValidationResult,
    outcome: &ValidationOutcome,
) -> ReportResult<()> {
    let now = Utc::now();

    match outcome {
        ValidationOutcome::Success {
            result_file_key,
            metadata,
        } => {
            if report.validation_status() == ValidationStatus::Transmitted {
                report.mark_ongoing()?;
            }
            report.complete_validation_at(result_file_key.clone(), now)?;
            result.complete_validation(
                true,
                None,
                None,
                metadata.clone(),
                result_file_key.clone(),
                now,
            )?;
        }
        ValidationOutcome::ValidationFailure {
            errors,
            warnings,
            result_file_key,
        } => {
            if report.validation_status() == ValidationStatus::Transmitted {
                report.mark_ongoing()?;
            }
            report.complete_with_errors_at(
                &describe_errors(errors),
                result_file_key.clone(),
                now,
            )?;
            result.complete_validation(
                false,
                Some(errors.clone()),
                warnings.clone(),
                None,
                result_file_key.clone(),
                now,
            )?;
        }
        ValidationOutcome::TechnicalFailure { message } => {
            report.record_technical_error_at(message, now)?;
            result.mark_as_technical_error(message.as_str(), now)?;
        }
    }
    Ok(())
}

fn describe_errors(errors: &serde_json::Value) -> String {
    match errors {
        serde_json::Value::Array(items) if !items.is_empty() => {
            format!("Validation failed with {} error(s)", items.len())
        }
        serde_json::Value::String(message) if !message.trim().is_empty() => message.clone(),
        _ => "Validation failed".to_string(),
    }
}
