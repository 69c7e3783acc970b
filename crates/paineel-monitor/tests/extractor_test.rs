//! Search flow stages against the scripted site.

mod common;

use common::{config, extractor, process_page, FailingRemote, FakeSite, FixedRemote};
use paineel_monitor::{ExtractStage, MonitorError};
use std::sync::atomic::Ordering;

const PROCESS: &str = "48500.000123/2024-01";

#[tokio::test(start_paused = true)]
async fn test_extracts_record_from_result_page() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let site = FakeSite::new().with_page(PROCESS, process_page(PROCESS, "Outorga", &["Recebido"]));

    let record = extractor(&config, Box::new(FixedRemote("K7P2")))
        .extract(&site, PROCESS)
        .await
        .unwrap();

    assert_eq!(record.identifier, PROCESS);
    assert_eq!(record.kind, "Outorga");
    assert_eq!(record.interested_parties, "ACME Energia");
    assert_eq!(record.documents.len(), 1);
    assert_eq!(record.progress[0].description, "Recebido");
    assert_eq!(site.script_sets.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_ignored_typing_falls_back_to_script() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let site =
        FakeSite::ignoring_typing().with_page(PROCESS, process_page(PROCESS, "Outorga", &[]));

    let record = extractor(&config, Box::new(FixedRemote("K7P2")))
        .extract(&site, PROCESS)
        .await
        .unwrap();

    assert_eq!(record.kind, "Outorga");
    assert_eq!(site.script_sets.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_no_matching_result_is_an_extraction_failure() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let site = FakeSite::new();

    let err = extractor(&config, Box::new(FixedRemote("K7P2")))
        .extract(&site, "11111")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        MonitorError::Extraction {
            stage: ExtractStage::ResultFound,
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_unsolvable_captcha_aborts_before_search() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let site = FakeSite::new().with_page(PROCESS, process_page(PROCESS, "Outorga", &[]));

    let extractor = extractor(&config, Box::new(FailingRemote));
    let err = extractor.extract(&site, PROCESS).await.unwrap_err();

    assert!(matches!(
        err,
        MonitorError::Extraction {
            stage: ExtractStage::CaptchaSolved,
            ..
        }
    ));
    assert_eq!(extractor.purge_captchas(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_number_is_rejected_without_navigation() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let site = FakeSite::new();

    let err = extractor(&config, Box::new(FixedRemote("K7P2")))
        .extract(&site, "12-3")
        .await
        .unwrap_err();

    assert!(matches!(err, MonitorError::Validation(_)));
    assert_eq!(site.navigations(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_missing_process_field_aborts_at_field_stage() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let site = FakeSite::new()
        .without_field()
        .with_page(PROCESS, process_page(PROCESS, "Outorga", &[]));

    let err = extractor(&config, Box::new(FixedRemote("K7P2")))
        .extract(&site, PROCESS)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        MonitorError::Extraction {
            stage: ExtractStage::FieldFilled,
            ..
        }
    ));
    assert_eq!(site.script_sets.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_value_rejected_twice_aborts_at_field_stage() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let site = FakeSite::ignoring_typing()
        .ignoring_script()
        .with_page(PROCESS, process_page(PROCESS, "Outorga", &[]));

    let err = extractor(&config, Box::new(FixedRemote("K7P2")))
        .extract(&site, PROCESS)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        MonitorError::Extraction {
            stage: ExtractStage::FieldFilled,
            ..
        }
    ));
    assert_eq!(site.script_sets.load(Ordering::SeqCst), 1);
    assert_eq!(site.clicked(), None);
}

#[tokio::test(start_paused = true)]
async fn test_failed_result_click_falls_back_to_script() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let site = FakeSite::new()
        .with_failing_clicks()
        .with_page(PROCESS, process_page(PROCESS, "Outorga", &["Recebido"]));

    let record = extractor(&config, Box::new(FixedRemote("K7P2")))
        .extract(&site, PROCESS)
        .await
        .unwrap();

    assert_eq!(record.kind, "Outorga");
    assert_eq!(site.script_clicks(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_result_in_new_tab_is_read_from_that_tab() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let site = FakeSite::new()
        .opening_tabs()
        .with_page(PROCESS, process_page(PROCESS, "Outorga", &["Recebido"]));

    let record = extractor(&config, Box::new(FixedRemote("K7P2")))
        .extract(&site, PROCESS)
        .await
        .unwrap();

    assert_eq!(site.active().as_deref(), Some("result"));
    assert_eq!(record.kind, "Outorga");
    assert_eq!(record.progress.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_hidden_matching_link_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let site = FakeSite::new()
        .with_hidden_links()
        .with_page(PROCESS, process_page(PROCESS, "Outorga", &[]));

    let record = extractor(&config, Box::new(FixedRemote("K7P2")))
        .extract(&site, PROCESS)
        .await
        .unwrap();

    assert_eq!(site.clicked(), Some(3));
    assert_eq!(record.kind, "Outorga");
}
