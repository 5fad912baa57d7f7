//! Services shared by the transport layer and the background tasks.

use std::sync::Arc;
use uknf_services::{ReportLifecycleService, SubmissionOrchestrator, ValidationResultRecorder};
use uknf_worker::TimeoutSweeper;

pub struct AppState {
    /// Entry point for report uploads. Read by the transport layer mounted on
    /// this state; the binary itself only runs the background tasks.
    #[allow(dead_code)]
    pub orchestrator: Arc<SubmissionOrchestrator>,
    pub lifecycle: Arc<ReportLifecycleService>,
    /// Entry point for validation engine callbacks, read by the same
    /// transport layer.
    #[allow(dead_code)]
    pub recorder: Arc<ValidationResultRecorder>,
    /// `None` when the sweep interval is configured as 0.
    pub sweeper: Option<Arc<TimeoutSweeper>>,
}
