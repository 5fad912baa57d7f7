//! Timeout sweeper
//!
//! Reclaims reports whose validation attempt has been in flight longer than
//! the configured ceiling by moving them to `TimeoutError`. Runs on its own
//! interval, concurrently with engine callbacks; a report that completes
//! between the candidate query and the update is skipped, never overwritten.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uknf_core::{Report, ReportError, ReportEvent, ReportResult, ReportingConfig, ValidationResult};
use uknf_db::{RepositoryError, ReportRepository};
use uknf_services::{publish_in_background, ReportEventPublisher};

/// Reloads and retries a report this many times when a concurrent writer
/// bumps its version first.
const MAX_ATTEMPTS: usize = 2;

#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// Delay between sweeps.
    pub interval: Duration,
    /// Maximum time a validation attempt may stay in flight.
    pub timeout: ChronoDuration,
    /// Candidates loaded per sweep.
    pub batch_size: i64,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            timeout: ChronoDuration::hours(24),
            batch_size: 500,
        }
    }
}

impl SweeperConfig {
    /// `None` when the sweep interval is configured as 0 (sweeper disabled).
    pub fn from_config(config: &ReportingConfig) -> Option<Self> {
        config.timeout_sweep_interval().map(|interval| Self {
            interval,
            timeout: config.validation_timeout(),
            batch_size: config.timeout_sweep_batch_size,
        })
    }

    /// Error description recorded on timed-out reports.
    /// Whole hours when the window is a multiple of an hour, minutes otherwise.
    pub fn timeout_description(&self) -> String {
        let minutes = self.timeout.num_minutes();
        if minutes >= 60 && minutes % 60 == 0 {
            format!("Validation did not complete within {} hours", minutes / 60)
        } else {
            format!("Validation did not complete within {} minutes", minutes)
        }
    }
}

/// Per-sweep counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub candidates: usize,
    pub timed_out: usize,
    /// Candidates that finished or changed before they could be timed out.
    pub skipped: usize,
    pub failed: usize,
}

enum Disposition {
    TimedOut,
    Skipped,
}

pub struct TimeoutSweeper {
    repository: Arc<dyn ReportRepository>,
    publisher: Arc<dyn ReportEventPublisher>,
    config: SweeperConfig,
}

impl TimeoutSweeper {
    pub fn new(
        repository: Arc<dyn ReportRepository>,
        publisher: Arc<dyn ReportEventPublisher>,
        config: SweeperConfig,
    ) -> Self {
        Self {
            repository,
            publisher,
            config,
        }
    }

    pub fn config(&self) -> &SweeperConfig {
        &self.config
    }

    /// Start the periodic sweep. The loop exits once `shutdown` is cancelled.
    pub fn start(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.config.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            tracing::info!(
                interval_secs = self.config.interval.as_secs(),
                timeout_minutes = self.config.timeout.num_minutes(),
                batch_size = self.config.batch_size,
                "Timeout sweeper started"
            );

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {
                        match self.sweep_once(Utc::now()).await {
                            Ok(summary) if summary.candidates > 0 => {
                                tracing::info!(
                                    candidates = summary.candidates,
                                    timed_out = summary.timed_out,
                                    skipped = summary.skipped,
                                    failed = summary.failed,
                                    "Timeout sweep completed"
                                );
                            }
                            Ok(_) => tracing::debug!("Timeout sweep found no candidates"),
                            Err(e) => tracing::error!(error = %e, "Timeout sweep failed"),
                        }
                    }
                }
            }

            tracing::info!("Timeout sweeper stopped");
        })
    }

    /// One pass over the reports in flight longer than the timeout at `now`.
    /// Each candidate is handled independently; one failing update does not
    /// stop the rest of the batch.
    #[tracing::instrument(skip(self), fields(sweep.operation = "timeout"))]
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> ReportResult<SweepSummary> {
        let cutoff = now - self.config.timeout;
        let candidates = self
            .repository
            .find_timed_out_candidates(cutoff, self.config.batch_size)
            .await?;

        let mut summary = SweepSummary {
            candidates: candidates.len(),
            ..Default::default()
        };

        for report in candidates {
            let report_id = report.id();
            match self.time_out(report, now).await {
                Ok(Disposition::TimedOut) => summary.timed_out += 1,
                Ok(Disposition::Skipped) => summary.skipped += 1,
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        report_id = %report_id,
                        "Failed to time out report, continuing with batch"
                    );
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    async fn time_out(&self, mut report: Report, now: DateTime<Utc>) -> ReportResult<Disposition> {
        let description = self.config.timeout_description();

        for attempt in 1..=MAX_ATTEMPTS {
            if !report.is_timed_out(now, self.config.timeout) {
                tracing::debug!(
                    report_id = %report.id(),
                    status = %report.validation_status(),
                    "Report left the timeout window before the sweep reached it"
                );
                return Ok(Disposition::Skipped);
            }

            let Some(validation_id) = report.unique_validation_id().map(str::to_string) else {
                return Err(ReportError::Internal(format!(
                    "in-flight report {} has no validation id",
                    report.id()
                )));
            };

            if let Err(e) = report.record_timeout_error_at(&description, now) {
                tracing::warn!(error = %e, report_id = %report.id(), "Timeout transition rejected");
                return Ok(Disposition::Skipped);
            }

            let mut result = self.load_result(&report, &validation_id).await?;
            if let Err(e) = result.mark_as_timeout(description.as_str(), now) {
                tracing::warn!(
                    error = %e,
                    validation_id = %validation_id,
                    "Validation result already final; timing out report only"
                );
            }

            match self
                .repository
                .update_with_result(&mut report, &result)
                .await
            {
                Ok(()) => {
                    tracing::info!(
                        report_id = %report.id(),
                        entity_id = report.entity_id(),
                        validation_id = %validation_id,
                        "Validation timed out"
                    );
                    if let Some(event) = ReportEvent::validation_finished(&report) {
                        publish_in_background(self.publisher.clone(), event);
                    }
                    return Ok(Disposition::TimedOut);
                }
                Err(RepositoryError::Conflict(report_id)) => {
                    tracing::warn!(
                        report_id = %report_id,
                        attempt = attempt,
                        "Report changed during timeout sweep; reloading"
                    );
                    report = match self.repository.get_by_id(report_id).await? {
                        Some(fresh) => fresh,
                        None => return Ok(Disposition::Skipped),
                    };
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(Disposition::Skipped)
    }

    async fn load_result(
        &self,
        report: &Report,
        validation_id: &str,
    ) -> ReportResult<ValidationResult> {
        match self.repository.find_validation_result(validation_id).await? {
            Some(result) => Ok(result),
            None => {
                tracing::warn!(
                    report_id = %report.id(),
                    "Validation result missing for in-flight report; recreating"
                );
                Ok(ValidationResult::new_at(
                    report.id(),
                    validation_id,
                    report.validation_started_at().unwrap_or_else(Utc::now),
                ))
            }
        }
    }
}
