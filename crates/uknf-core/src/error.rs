//! Error types module
//!
//! `ReportError` is the error taxonomy of the report lifecycle. Every operation
//! exposed by the service layer returns it. Lower layers keep their own error
//! enums (`StorageError`, `RepositoryError`) and convert into this one at the
//! crate boundary.
//!
//! `ErrorMetadata` lets a transport layer render any variant without matching
//! on it: status code, stable error code, retry hint and log level.

use uuid::Uuid;

use crate::models::{ReportTransition, ValidationStatus};
use crate::validation::FileIntegrityError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for anomalies such as races and stale callbacks
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "DUPLICATE_REPORT")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried verbatim)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

pub type ReportResult<T> = Result<T, ReportError>;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Invalid file: {0}")]
    InvalidFile(#[from] FileIntegrityError),

    #[error(
        "A {report_type} report for period {reporting_period} already exists for entity {entity_id}"
    )]
    DuplicateReport {
        entity_id: i64,
        report_type: String,
        reporting_period: String,
        existing_report_id: Option<Uuid>,
    },

    #[error("Entity not found: {0}")]
    EntityNotFound(i64),

    #[error("Report not found: {0}")]
    ReportNotFound(Uuid),

    #[error("Invalid correction: {0}")]
    InvalidCorrection(String),

    #[error("Report {report_id} cannot {transition} from status {from}")]
    InvalidStateTransition {
        report_id: Uuid,
        from: ValidationStatus,
        transition: ReportTransition,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage failure: {0}")]
    StorageFailure(String),

    #[error("Submission cancelled before the file was stored")]
    Cancelled,

    #[error("Unknown validation id: {0}")]
    UnknownValidation(String),

    #[error("Report {0} was modified concurrently")]
    ConcurrencyConflict(Uuid),

    #[error("Validation engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for ReportError {
    fn from(err: validator::ValidationErrors) -> Self {
        ReportError::InvalidInput(format!("Validation error: {}", err))
    }
}

impl From<anyhow::Error> for ReportError {
    fn from(err: anyhow::Error) -> Self {
        ReportError::Internal(format!("{:#}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn report_error_static_metadata(
    err: &ReportError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        ReportError::InvalidFile(FileIntegrityError::FileTooLarge { .. }) => (
            413,
            "FILE_TOO_LARGE",
            false,
            Some("Reduce the file size and submit again"),
            false,
            LogLevel::Debug,
        ),
        ReportError::InvalidFile(_) => (
            400,
            "INVALID_FILE",
            false,
            Some("Submit a valid XLSX report file"),
            false,
            LogLevel::Debug,
        ),
        ReportError::DuplicateReport { .. } => (
            409,
            "DUPLICATE_REPORT",
            false,
            Some("Archive the existing report or submit a correction"),
            false,
            LogLevel::Debug,
        ),
        ReportError::EntityNotFound(_) => (
            404,
            "ENTITY_NOT_FOUND",
            false,
            Some("Verify the entity ID exists"),
            false,
            LogLevel::Debug,
        ),
        ReportError::ReportNotFound(_) => (
            404,
            "REPORT_NOT_FOUND",
            false,
            Some("Verify the report ID exists"),
            false,
            LogLevel::Debug,
        ),
        ReportError::InvalidCorrection(_) => (
            400,
            "INVALID_CORRECTION",
            false,
            Some("Reference a report of the same entity"),
            false,
            LogLevel::Debug,
        ),
        ReportError::InvalidStateTransition { .. } => (
            409,
            "INVALID_STATE_TRANSITION",
            true,
            Some("Reload the report and retry if still applicable"),
            false,
            LogLevel::Warn,
        ),
        ReportError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        ReportError::StorageFailure(_) => (
            503,
            "STORAGE_FAILURE",
            true,
            Some("Retry the submission after a short delay"),
            true,
            LogLevel::Error,
        ),
        ReportError::Cancelled => (
            400,
            "SUBMISSION_CANCELLED",
            true,
            Some("Submit the report again"),
            false,
            LogLevel::Debug,
        ),
        ReportError::UnknownValidation(_) => (
            404,
            "UNKNOWN_VALIDATION",
            false,
            Some("Acknowledge and discard the callback"),
            false,
            LogLevel::Warn,
        ),
        ReportError::ConcurrencyConflict(_) => (
            409,
            "CONCURRENCY_CONFLICT",
            true,
            Some("Reload the report and retry"),
            false,
            LogLevel::Warn,
        ),
        ReportError::EngineUnavailable(_) => (
            503,
            "ENGINE_UNAVAILABLE",
            true,
            Some("Retry validation after a short delay"),
            true,
            LogLevel::Error,
        ),
        ReportError::Database(_) => (
            500,
            "DATABASE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        ReportError::Internal(_) => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl ReportError {
    /// Whether the error is a client-correctable rejection.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.http_status_code())
    }
}

impl ErrorMetadata for ReportError {
    fn http_status_code(&self) -> u16 {
        report_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        report_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        report_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        report_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        report_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        report_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            ReportError::StorageFailure(_) => "Failed to store the report file".to_string(),
            ReportError::EngineUnavailable(_) => {
                "Validation engine is currently unavailable".to_string()
            }
            ReportError::Database(_) => "Failed to access database".to_string(),
            ReportError::Internal(_) => "Internal server error".to_string(),
            ReportError::InvalidStateTransition { from, .. } => {
                format!("The report is in status {} and cannot be changed this way", from)
            }
            other => other.to_string(),
        }
    }
}
