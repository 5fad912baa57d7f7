//! Test helpers: in-memory repository and reports placed in flight at a
//! chosen time.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use uknf_core::{NewReport, Report, ReportEvent, ValidationResult};
use uknf_db::{InMemoryReportRepository, ReportRepository};
use uknf_services::ReportEventPublisher;
use uuid::Uuid;

pub const ENTITY_ID: i64 = 1001;

#[derive(Clone, Default)]
pub struct RecordingPublisher {
    events: Arc<Mutex<Vec<ReportEvent>>>,
}

impl RecordingPublisher {
    pub async fn wait_for(&self, count: usize) -> Vec<ReportEvent> {
        for _ in 0..100 {
            let events = self.events.lock().await.clone();
            if events.len() >= count {
                return events;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl ReportEventPublisher for RecordingPublisher {
    async fn publish(&self, event: ReportEvent) -> anyhow::Result<()> {
        self.events.lock().await.push(event);
        Ok(())
    }
}

pub fn new_report(period: &str) -> Report {
    Report::new(NewReport {
        entity_id: ENTITY_ID,
        submitting_user_id: 7,
        file_name: "report.xlsx".to_string(),
        file_storage_key: format!("reports/{}/{}.xlsx", ENTITY_ID, Uuid::new_v4()),
        file_size: 2048,
        file_checksum: None,
        report_type: "Quarterly".to_string(),
        reporting_period: period.to_string(),
        correction_of_report_id: None,
    })
    .unwrap()
}

/// Inserts a report whose validation started at `started_at`, optionally
/// already picked up by the engine. Returns the report and its validation id.
pub async fn in_flight_report(
    repository: &InMemoryReportRepository,
    period: &str,
    started_at: DateTime<Utc>,
    ongoing: bool,
) -> (Report, String) {
    let mut report = new_report(period);
    repository.insert(&report).await.unwrap();

    let validation_id = Uuid::new_v4().to_string();
    report
        .start_validation_at(&validation_id, started_at)
        .unwrap();
    let result = ValidationResult::new_at(report.id(), validation_id.as_str(), started_at);
    repository
        .update_with_result(&mut report, &result)
        .await
        .unwrap();

    if ongoing {
        report.mark_ongoing().unwrap();
        repository.update(&mut report).await.unwrap();
    }
    (report, validation_id)
}

pub fn hours_ago(now: DateTime<Utc>, hours: i64) -> DateTime<Utc> {
    now - chrono::Duration::hours(hours)
}
