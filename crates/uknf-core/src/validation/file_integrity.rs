/// Declared media type of an XLSX workbook.
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Local file header of a ZIP archive, which every XLSX workbook is.
pub const ZIP_SIGNATURE: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

pub const DEFAULT_MAX_REPORT_SIZE_BYTES: usize = 100 * 1024 * 1024;

/// Reasons an uploaded report file is rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FileIntegrityError {
    #[error("Empty file")]
    EmptyFile,

    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Content type not allowed: {content_type} (allowed: {allowed:?})")]
    ContentTypeNotAllowed {
        content_type: String,
        allowed: Vec<String>,
    },

    #[error("File signature does not match the declared format")]
    SignatureMismatch,
}

/// Stateless check of an uploaded report artifact.
///
/// The leading bytes are compared against the container signature so a
/// spoofed `Content-Type` header cannot smuggle in another format.
#[derive(Debug, Clone)]
pub struct FileIntegrityChecker {
    max_file_size: usize,
    allowed_content_types: Vec<String>,
    signature: Vec<u8>,
}

impl Default for FileIntegrityChecker {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_REPORT_SIZE_BYTES,
            vec![XLSX_CONTENT_TYPE.to_string()],
        )
    }
}

impl FileIntegrityChecker {
    pub fn new(max_file_size: usize, allowed_content_types: Vec<String>) -> Self {
        Self {
            max_file_size,
            allowed_content_types: allowed_content_types
                .into_iter()
                .map(|ct| normalize_content_type(&ct))
                .collect(),
            signature: ZIP_SIGNATURE.to_vec(),
        }
    }

    pub fn with_signature(mut self, signature: impl Into<Vec<u8>>) -> Self {
        self.signature = signature.into();
        self
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    /// Runs every check; the first failure rejects the file.
    pub fn check(&self, data: &[u8], content_type: &str) -> Result<(), FileIntegrityError> {
        self.check_size(data.len())?;
        self.check_content_type(content_type)?;
        self.check_signature(data)?;
        Ok(())
    }

    pub fn check_size(&self, size: usize) -> Result<(), FileIntegrityError> {
        if size == 0 {
            return Err(FileIntegrityError::EmptyFile);
        }

        if size > self.max_file_size {
            return Err(FileIntegrityError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }

    pub fn check_content_type(&self, content_type: &str) -> Result<(), FileIntegrityError> {
        let normalized = normalize_content_type(content_type);

        if !self
            .allowed_content_types
            .iter()
            .any(|ct| ct == &normalized)
        {
            return Err(FileIntegrityError::ContentTypeNotAllowed {
                content_type: content_type.to_string(),
                allowed: self.allowed_content_types.clone(),
            });
        }

        Ok(())
    }

    pub fn check_signature(&self, data: &[u8]) -> Result<(), FileIntegrityError> {
        if !data.starts_with(&self.signature) {
            return Err(FileIntegrityError::SignatureMismatch);
        }
        Ok(())
    }
}

/// Lowercases and drops parameters such as `; charset=...`.
fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}
