use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::report::{Report, ValidationStatus};

/// Published once a report has been accepted into the system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSubmittedEvent {
    pub report_id: Uuid,
    pub entity_id: i64,
    pub submitting_user_id: i64,
    pub report_type: String,
    pub reporting_period: String,
    pub file_name: String,
    pub file_size: i64,
    pub correction_of_report_id: Option<Uuid>,
    pub submitted_at: DateTime<Utc>,
}

impl From<&Report> for ReportSubmittedEvent {
    fn from(report: &Report) -> Self {
        Self {
            report_id: report.id(),
            entity_id: report.entity_id(),
            submitting_user_id: report.submitting_user_id(),
            report_type: report.report_type().to_string(),
            reporting_period: report.reporting_period().to_string(),
            file_name: report.file_name().to_string(),
            file_size: report.file_size(),
            correction_of_report_id: report.correction_of_report_id(),
            submitted_at: report.submitted_at(),
        }
    }
}

/// Domain notifications for collaborators outside the lifecycle core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReportEvent {
    Submitted(ReportSubmittedEvent),
    ValidationFinished {
        report_id: Uuid,
        entity_id: i64,
        unique_validation_id: String,
        status: ValidationStatus,
    },
    Contested {
        report_id: Uuid,
        entity_id: i64,
        reviewer_id: i64,
    },
}

impl ReportEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            ReportEvent::Submitted(_) => "report.submitted",
            ReportEvent::ValidationFinished { .. } => "report.validation_finished",
            ReportEvent::Contested { .. } => "report.contested",
        }
    }

    pub fn report_id(&self) -> Uuid {
        match self {
            ReportEvent::Submitted(e) => e.report_id,
            ReportEvent::ValidationFinished { report_id, .. } => *report_id,
            ReportEvent::Contested { report_id, .. } => *report_id,
        }
    }

    pub fn entity_id(&self) -> i64 {
        match self {
            ReportEvent::Submitted(e) => e.entity_id,
            ReportEvent::ValidationFinished { entity_id, .. } => *entity_id,
            ReportEvent::Contested { entity_id, .. } => *entity_id,
        }
    }

    /// Built from a report that has just reached a terminal status.
    pub fn validation_finished(report: &Report) -> Option<Self> {
        let unique_validation_id = report.unique_validation_id()?.to_string();
        Some(ReportEvent::ValidationFinished {
            report_id: report.id(),
            entity_id: report.entity_id(),
            unique_validation_id,
            status: report.validation_status(),
        })
    }
}
