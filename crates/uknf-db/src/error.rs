use thiserror::Error;
use uknf_core::ReportError;
use uuid::Uuid;

/// Errors returned by report repositories
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(
        "Active report already exists for entity {entity_id}, type {report_type}, period {reporting_period}"
    )]
    DuplicateReport {
        entity_id: i64,
        report_type: String,
        reporting_period: String,
    },

    #[error("Validation id already in use: {0}")]
    DuplicateValidationId(String),

    #[error("Report {0} was modified concurrently")]
    Conflict(Uuid),

    #[error("Report not found: {0}")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

impl From<RepositoryError> for ReportError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::DuplicateReport {
                entity_id,
                report_type,
                reporting_period,
            } => ReportError::DuplicateReport {
                entity_id,
                report_type,
                reporting_period,
                existing_report_id: None,
            },
            RepositoryError::DuplicateValidationId(id) => {
                ReportError::Internal(format!("validation id collision: {}", id))
            }
            RepositoryError::Conflict(id) => ReportError::ConcurrencyConflict(id),
            RepositoryError::NotFound(id) => ReportError::ReportNotFound(id),
            RepositoryError::Database(e) => ReportError::Database(e.to_string()),
        }
    }
}
