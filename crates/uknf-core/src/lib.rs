//! UKNF Reporting Core Library
//!
//! Domain models for regulatory report submissions, the validation state machine,
//! the error taxonomy, configuration and the upload integrity checks shared by
//! every other crate in the workspace.

pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;
pub mod validation;

// Re-export commonly used types
pub use config::{LogFormat, ReportingConfig};
pub use error::{ErrorMetadata, LogLevel, ReportError, ReportResult};
pub use models::{
    FileUpload, NewReport, Report, ReportEvent, ReportSubmittedEvent, ReportTransition,
    SubmitReportRequest, ValidationResult, ValidationStatus,
};
pub use storage_types::StorageBackend;
pub use validation::{FileIntegrityChecker, FileIntegrityError};
