//! Upload checks applied before a report is accepted.

mod file_integrity;
mod filename;

pub use file_integrity::{
    FileIntegrityChecker, FileIntegrityError, DEFAULT_MAX_REPORT_SIZE_BYTES, XLSX_CONTENT_TYPE,
    ZIP_SIGNATURE,
};
pub use filename::{file_extension, sanitize_filename, MAX_FILENAME_LENGTH};
