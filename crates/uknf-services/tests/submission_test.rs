mod helpers;

use helpers::*;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uknf_core::{ErrorMetadata, ReportError, ReportEvent, ValidationStatus};
use uknf_db::ReportRepository;
use uknf_storage::MemoryStorage;
use uuid::Uuid;

#[tokio::test]
async fn test_submit_creates_working_report() {
    let ctx = TestContext::new();

    let report = ctx
        .orchestrator
        .submit(
            request(ENTITY_ID, "Quarterly", "Q1_2025"),
            xlsx_upload(1024 * 1024),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(report.validation_status(), ValidationStatus::Working);
    assert!(report.unique_validation_id().is_none());
    assert!(!report.is_archived());
    assert_eq!(report.file_size(), 1024 * 1024);
    assert_eq!(report.file_name(), "Q1 2025 raport.xlsx");
    assert_eq!(report.file_checksum().map(str::len), Some(64));
    assert!(report
        .file_storage_key()
        .starts_with(&format!("reports/{}/", ENTITY_ID)));

    let stored = ctx.repository.get_by_id(report.id()).await.unwrap().unwrap();
    assert_eq!(stored, report);
    assert_eq!(ctx.storage.len().await, 1);

    let events = ctx.publisher.wait_for(1).await;
    assert!(matches!(&events[0], ReportEvent::Submitted(e) if e.report_id == report.id()));
}

#[tokio::test]
async fn test_duplicate_submission_rejected() {
    let ctx = TestContext::new();
    let cancel = CancellationToken::new();

    let first = ctx
        .orchestrator
        .submit(request(ENTITY_ID, "Quarterly", "Q1_2025"), xlsx_upload(2048), &cancel)
        .await
        .unwrap();

    let err = ctx
        .orchestrator
        .submit(request(ENTITY_ID, "Quarterly", "Q1_2025"), xlsx_upload(2048), &cancel)
        .await
        .unwrap_err();

    match err {
        ReportError::DuplicateReport {
            existing_report_id, ..
        } => assert_eq!(existing_report_id, Some(first.id())),
        other => panic!("expected duplicate, got {:?}", other),
    }
    assert_eq!(ctx.repository.len().await, 1);
    assert_eq!(ctx.storage.len().await, 1);

    // Another period or another entity is not a duplicate.
    ctx.orchestrator
        .submit(request(ENTITY_ID, "Quarterly", "Q2_2025"), xlsx_upload(2048), &cancel)
        .await
        .unwrap();
    ctx.orchestrator
        .submit(
            request(OTHER_ENTITY_ID, "Quarterly", "Q1_2025"),
            xlsx_upload(2048),
            &cancel,
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_concurrent_duplicates_leave_one_report() {
    let ctx = TestContext::new();
    let cancel = CancellationToken::new();

    let (a, b) = tokio::join!(
        ctx.orchestrator.submit(
            request(ENTITY_ID, "Quarterly", "Q1_2025"),
            xlsx_upload(4096),
            &cancel
        ),
        ctx.orchestrator.submit(
            request(ENTITY_ID, "Quarterly", "Q1_2025"),
            xlsx_upload(4096),
            &cancel
        ),
    );

    let results = [a, b];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(ReportError::DuplicateReport { .. }))));
    assert_eq!(ctx.repository.len().await, 1);
    assert_eq!(ctx.storage.len().await, 1);
}

#[tokio::test]
async fn test_signature_mismatch_rejected() {
    let ctx = TestContext::new();

    let err = ctx
        .orchestrator
        .submit(
            request(ENTITY_ID, "Quarterly", "Q1_2025"),
            pdf_upload(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ReportError::InvalidFile(_)));
    assert_eq!(err.http_status_code(), 400);
    assert!(ctx.repository.is_empty().await);
    assert!(ctx.storage.is_empty().await);
}

#[tokio::test]
async fn test_unknown_entity_rejected() {
    let ctx = TestContext::new();

    let err = ctx
        .orchestrator
        .submit(
            request(9999, "Quarterly", "Q1_2025"),
            xlsx_upload(1024),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ReportError::EntityNotFound(9999)));
    assert!(ctx.storage.is_empty().await);
}

#[tokio::test]
async fn test_invalid_request_rejected() {
    let ctx = TestContext::new();

    let err = ctx
        .orchestrator
        .submit(
            request(ENTITY_ID, "", "Q1_2025"),
            xlsx_upload(1024),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ReportError::InvalidInput(_)));
}

#[tokio::test]
async fn test_cancelled_before_upload_leaves_nothing() {
    let ctx = TestContext::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = ctx
        .orchestrator
        .submit(request(ENTITY_ID, "Quarterly", "Q1_2025"), xlsx_upload(1024), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, ReportError::Cancelled));
    assert!(ctx.repository.is_empty().await);
    assert!(ctx.storage.is_empty().await);
}

#[tokio::test]
async fn test_cancelled_during_upload_leaves_nothing() {
    let ctx = TestContext::with_storage(Arc::new(MemoryStorage::new()), Arc::new(StalledStorage));
    let cancel = CancellationToken::new();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let err = ctx
        .orchestrator
        .submit(request(ENTITY_ID, "Quarterly", "Q1_2025"), xlsx_upload(1024), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, ReportError::Cancelled));
    assert!(ctx.repository.is_empty().await);
    assert!(ctx.publisher.events().await.is_empty());
}

#[tokio::test]
async fn test_storage_failure_surfaces() {
    let ctx = TestContext::with_storage(Arc::new(MemoryStorage::new()), Arc::new(FailingStorage));

    let err = ctx
        .orchestrator
        .submit(
            request(ENTITY_ID, "Quarterly", "Q1_2025"),
            xlsx_upload(1024),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ReportError::StorageFailure(_)));
    assert_eq!(err.http_status_code(), 503);
    assert!(ctx.repository.is_empty().await);
}

#[tokio::test]
async fn test_archive_then_resubmit() {
    let ctx = TestContext::new();
    let cancel = CancellationToken::new();

    let first = ctx
        .orchestrator
        .submit(request(ENTITY_ID, "Quarterly", "Q1_2025"), xlsx_upload(1024), &cancel)
        .await
        .unwrap();
    ctx.lifecycle.archive(first.id()).await.unwrap();

    let second = ctx
        .orchestrator
        .submit(request(ENTITY_ID, "Quarterly", "Q1_2025"), xlsx_upload(1024), &cancel)
        .await
        .unwrap();

    assert_ne!(first.id(), second.id());
    let archived = ctx.lifecycle.get_by_id(first.id()).await.unwrap();
    assert!(archived.is_archived());
    assert!(archived.archived_at().is_some());
}

#[tokio::test]
async fn test_correction_links_original() {
    let ctx = TestContext::new();
    let cancel = CancellationToken::new();

    let original = ctx
        .orchestrator
        .submit(request(ENTITY_ID, "Quarterly", "Q1_2025"), xlsx_upload(1024), &cancel)
        .await
        .unwrap();
    ctx.lifecycle.archive(original.id()).await.unwrap();

    let correction = ctx
        .orchestrator
        .submit_correction(
            original.id(),
            request(ENTITY_ID, "Quarterly", "Q1_2025"),
            xlsx_upload(1024),
            &cancel,
        )
        .await
        .unwrap();

    assert_eq!(correction.correction_of_report_id(), Some(original.id()));

    let chain = ctx.lifecycle.correction_chain(correction.id()).await.unwrap();
    let ids: Vec<Uuid> = chain.iter().map(|r| r.id()).collect();
    assert_eq!(ids, vec![correction.id(), original.id()]);
}

#[tokio::test]
async fn test_correction_of_active_original_is_duplicate() {
    let ctx = TestContext::new();
    let cancel = CancellationToken::new();

    let original = ctx
        .orchestrator
        .submit(request(ENTITY_ID, "Quarterly", "Q1_2025"), xlsx_upload(1024), &cancel)
        .await
        .unwrap();

    let err = ctx
        .orchestrator
        .submit_correction(
            original.id(),
            request(ENTITY_ID, "Quarterly", "Q1_2025"),
            xlsx_upload(1024),
            &cancel,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ReportError::DuplicateReport { .. }));
}

#[tokio::test]
async fn test_correction_across_entities_rejected() {
    let ctx = TestContext::new();
    let cancel = CancellationToken::new();

    let original = ctx
        .orchestrator
        .submit(request(ENTITY_ID, "Quarterly", "Q1_2025"), xlsx_upload(1024), &cancel)
        .await
        .unwrap();

    let err = ctx
        .orchestrator
        .submit_correction(
            original.id(),
            request(OTHER_ENTITY_ID, "Quarterly", "Q1_2025"),
            xlsx_upload(1024),
            &cancel,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ReportError::InvalidCorrection(_)));

    let missing = Uuid::new_v4();
    let err = ctx
        .orchestrator
        .submit_correction(
            missing,
            request(ENTITY_ID, "Quarterly", "Q2_2025"),
            xlsx_upload(1024),
            &cancel,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ReportError::ReportNotFound(id) if id == missing));
}
