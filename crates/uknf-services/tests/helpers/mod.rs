//! Test helpers: wire the services against in-memory collaborators.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uknf_core::validation::{XLSX_CONTENT_TYPE, ZIP_SIGNATURE};
use uknf_core::{FileIntegrityChecker, FileUpload, ReportEvent, SubmitReportRequest};
use uknf_db::InMemoryReportRepository;
use uknf_services::{
    ReportEventPublisher, ReportLifecycleService, StaticEntityDirectory, SubmissionOrchestrator,
    ValidationEngine, ValidationRequest, ValidationResultRecorder,
};
use uknf_storage::{MemoryStorage, Storage, StorageBackend, StorageError, StorageResult};

pub const ENTITY_ID: i64 = 1001;
pub const OTHER_ENTITY_ID: i64 = 2002;
pub const USER_ID: i64 = 7;
pub const REVIEWER_ID: i64 = 42;

/// Collects published events.
#[derive(Clone, Default)]
pub struct RecordingPublisher {
    events: Arc<Mutex<Vec<ReportEvent>>>,
}

impl RecordingPublisher {
    pub async fn events(&self) -> Vec<ReportEvent> {
        self.events.lock().await.clone()
    }

    /// Waits for background publishing to deliver at least `count` events.
    pub async fn wait_for(&self, count: usize) -> Vec<ReportEvent> {
        for _ in 0..100 {
            let events = self.events().await;
            if events.len() >= count {
                return events;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        self.events().await
    }
}

#[async_trait]
impl ReportEventPublisher for RecordingPublisher {
    async fn publish(&self, event: ReportEvent) -> anyhow::Result<()> {
        self.events.lock().await.push(event);
        Ok(())
    }
}

/// Records hand-offs; can be switched to fail.
#[derive(Clone, Default)]
pub struct RecordingEngine {
    requests: Arc<Mutex<Vec<ValidationRequest>>>,
    fail: Arc<AtomicBool>,
}

impl RecordingEngine {
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub async fn requests(&self) -> Vec<ValidationRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl ValidationEngine for RecordingEngine {
    async fn submit(&self, request: ValidationRequest) -> anyhow::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("engine unreachable");
        }
        self.requests.lock().await.push(request);
        Ok(())
    }
}

/// Storage whose uploads always fail.
pub struct FailingStorage;

#[async_trait]
impl Storage for FailingStorage {
    async fn upload(&self, _: i64, _: &str, _: &str, _: Bytes) -> StorageResult<String> {
        Err(StorageError::UploadFailed("disk full".to_string()))
    }

    async fn download(&self, key: &str) -> StorageResult<Bytes> {
        Err(StorageError::NotFound(key.to_string()))
    }

    async fn delete(&self, _: &str) -> StorageResult<()> {
        Ok(())
    }

    async fn exists(&self, _: &str) -> StorageResult<bool> {
        Ok(false)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

/// Storage whose uploads never complete.
pub struct StalledStorage;

#[async_trait]
impl Storage for StalledStorage {
    async fn upload(&self, _: i64, _: &str, _: &str, _: Bytes) -> StorageResult<String> {
        std::future::pending().await
    }

    async fn download(&self, key: &str) -> StorageResult<Bytes> {
        Err(StorageError::NotFound(key.to_string()))
    }

    async fn delete(&self, _: &str) -> StorageResult<()> {
        Ok(())
    }

    async fn exists(&self, _: &str) -> StorageResult<bool> {
        Ok(false)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

pub struct TestContext {
    pub repository: Arc<InMemoryReportRepository>,
    pub storage: Arc<MemoryStorage>,
    pub publisher: RecordingPublisher,
    pub engine: RecordingEngine,
    pub orchestrator: SubmissionOrchestrator,
    pub lifecycle: ReportLifecycleService,
    pub recorder: ValidationResultRecorder,
}

impl TestContext {
    pub fn new() -> Self {
        let storage = Arc::new(MemoryStorage::new());
        Self::with_storage(storage.clone(), storage)
    }

    /// Uses `submit_storage` for the orchestrator; `storage` stays inspectable.
    pub fn with_storage(storage: Arc<MemoryStorage>, submit_storage: Arc<dyn Storage>) -> Self {
        let repository = Arc::new(InMemoryReportRepository::new());
        let publisher = RecordingPublisher::default();
        let engine = RecordingEngine::default();
        let directory = Arc::new(
            StaticEntityDirectory::default()
                .with_entity(ENTITY_ID, "Bank Spółdzielczy")
                .with_entity(OTHER_ENTITY_ID, "Dom Maklerski"),
        );

        let orchestrator = SubmissionOrchestrator::new(
            repository.clone(),
            submit_storage,
            directory,
            Arc::new(publisher.clone()),
            FileIntegrityChecker::default(),
        );
        let lifecycle = ReportLifecycleService::new(
            repository.clone(),
            storage.clone(),
            Arc::new(engine.clone()),
            Arc::new(publisher.clone()),
        );
        let recorder =
            ValidationResultRecorder::new(repository.clone(), Arc::new(publisher.clone()));

        Self {
            repository,
            storage,
            publisher,
            engine,
            orchestrator,
            lifecycle,
            recorder,
        }
    }
}

pub fn request(entity_id: i64, report_type: &str, period: &str) -> SubmitReportRequest {
    SubmitReportRequest {
        entity_id,
        submitting_user_id: USER_ID,
        report_type: report_type.to_string(),
        reporting_period: period.to_string(),
        correction_of_report_id: None,
    }
}

/// A file that passes the integrity check.
pub fn xlsx_upload(size: usize) -> FileUpload {
    let mut data = ZIP_SIGNATURE.to_vec();
    data.resize(size.max(ZIP_SIGNATURE.len()), 0x20);
    FileUpload::new("Q1 2025 raport.xlsx", XLSX_CONTENT_TYPE, data)
}

/// A PDF declared as a workbook.
pub fn pdf_upload() -> FileUpload {
    let mut data = vec![0x25, 0x50, 0x44, 0x46];
    data.resize(1024, 0x20);
    FileUpload::new("report.xlsx", XLSX_CONTENT_TYPE, data)
}
