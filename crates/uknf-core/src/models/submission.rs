use bytes::Bytes;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Metadata accompanying a report upload.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitReportRequest {
    #[validate(range(min = 1, message = "Entity id must be positive"))]
    pub entity_id: i64,
    #[validate(range(min = 1, message = "User id must be positive"))]
    pub submitting_user_id: i64,
    #[validate(length(
        min = 1,
        max = 100,
        message = "Report type must be between 1 and 100 characters"
    ))]
    pub report_type: String,
    #[validate(length(
        min = 1,
        max = 100,
        message = "Reporting period must be between 1 and 100 characters"
    ))]
    pub reporting_period: String,
    /// Set when this submission corrects an earlier report.
    #[serde(default)]
    pub correction_of_report_id: Option<Uuid>,
}

/// An uploaded artifact as received from the transport layer.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl FileUpload {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SubmitReportRequest {
        SubmitReportRequest {
            entity_id: 1001,
            submitting_user_id: 7,
            report_type: "Quarterly".to_string(),
            reporting_period: "Q1_2025".to_string(),
            correction_of_report_id: None,
        }
    }

    #[test]
    fn test_valid_request() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn test_rejects_empty_period_and_bad_ids() {
        let mut req = request();
        req.reporting_period = String::new();
        assert!(req.validate().is_err());

        let mut req = request();
        req.entity_id = 0;
        assert!(req.validate().is_err());

        let mut req = request();
        req.report_type = "x".repeat(101);
        assert!(req.validate().is_err());
    }
}
