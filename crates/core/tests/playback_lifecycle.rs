//! Playback lifecycle integration tests.
//!
//! These tests verify that the playback session follows the workflow:
//! attached on success, torn down whenever the result it plays is discarded.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use musescan_core::{
    testing::{fixtures, MockConversionService, MockMediaBackend},
    Config, MediaEvent, PlaybackError, ServiceResponse, Stage, Workflow,
};

async fn setup(response: ServiceResponse) -> (Workflow, MockConversionService, MockMediaBackend) {
    let service = MockConversionService::new();
    service.set_delay(Duration::from_millis(500)).await;
    service.set_response(response).await;
    let backend = MockMediaBackend::new();
    let workflow = Workflow::new(&Config::default(), Arc::new(service.clone()))
        .with_playback(Arc::new(backend.clone()));
    (workflow, service, backend)
}

async fn wait_for_stage(workflow: &Workflow, expected: Stage) -> bool {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if workflow.stage().await == expected {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

async fn convert(workflow: &Workflow, name: &str) {
    workflow
        .select_file(fixtures::png_candidate(name, 512))
        .await
        .unwrap();
    workflow.convert().await.unwrap();
    assert!(wait_for_stage(workflow, Stage::Ready).await);
}

/// Lets the media event pump run.
async fn pump() {
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_playback_controls_after_conversion() {
    let (workflow, _service, backend) = setup(ServiceResponse::success("a.mp3", "a.mid")).await;
    convert(&workflow, "score.png").await;

    backend
        .emit(MediaEvent::MetadataLoaded {
            duration_secs: 95.0,
        })
        .await;
    pump().await;

    let playback = workflow.playback().unwrap();
    playback.play().await.unwrap();
    assert_eq!(playback.seek(61.0).await.unwrap(), 61.0);

    let session = workflow.snapshot().await.playback.unwrap();
    assert!(session.playing);
    assert_eq!(session.position_secs, 61.0);
    assert_eq!(session.duration_secs, Some(95.0));
    assert_eq!(musescan_core::format_time(session.position_secs), "1:01");
    assert_eq!(backend.last_handle().unwrap().play_calls, 1);
}

#[tokio::test(start_paused = true)]
async fn test_new_file_tears_down_playback() {
    let (workflow, _service, backend) = setup(ServiceResponse::success("a.mp3", "a.mid")).await;
    convert(&workflow, "first.png").await;
    workflow.playback().unwrap().play().await.unwrap();

    workflow
        .select_file(fixtures::png_candidate("second.png", 512))
        .await
        .unwrap();
    pump().await;

    let first = backend.handle(0).unwrap();
    assert!(first.released);
    assert!(!first.playing);
    assert!(workflow.snapshot().await.playback.is_none());
    assert!(
        !backend
            .emit(MediaEvent::TimeUpdate { position_secs: 5.0 })
            .await
    );

    workflow.convert().await.unwrap();
    assert!(wait_for_stage(&workflow, Stage::Ready).await);
    assert_eq!(backend.open_count(), 2);
    assert!(!backend.last_handle().unwrap().released);
}

#[tokio::test(start_paused = true)]
async fn test_volume_survives_new_result() {
    let (workflow, _service, backend) = setup(ServiceResponse::success("a.mp3", "a.mid")).await;
    convert(&workflow, "first.png").await;
    workflow.playback().unwrap().set_volume(30).await;

    workflow.rearm().await.unwrap();
    workflow.convert().await.unwrap();
    assert!(wait_for_stage(&workflow, Stage::Ready).await);

    let session = workflow.snapshot().await.playback.unwrap();
    assert_eq!(session.volume, 30);
    assert!(!session.muted);
    assert_eq!(backend.last_handle().unwrap().gain, 0.3);
}

#[tokio::test(start_paused = true)]
async fn test_playback_failure_does_not_fail_workflow() {
    let (workflow, _service, backend) = setup(ServiceResponse::success("bad.mp3", "a.mid")).await;
    backend.fail_next_open("unsupported format");
    convert(&workflow, "score.png").await;

    let snapshot = workflow.snapshot().await;
    assert_eq!(snapshot.stage, Stage::Ready);
    assert!(snapshot.can_download);
    let session = snapshot.playback.unwrap();
    assert!(session.error.unwrap().contains("unsupported format"));
    assert!(matches!(
        workflow.playback().unwrap().play().await,
        Err(PlaybackError::Resource { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_reset_releases_media() {
    let (workflow, _service, backend) = setup(ServiceResponse::success("a.mp3", "a.mid")).await;
    convert(&workflow, "score.png").await;

    workflow.reset().await;
    pump().await;

    assert!(backend.last_handle().unwrap().released);
    assert!(!workflow.playback().unwrap().is_attached().await);
}

#[tokio::test(start_paused = true)]
async fn test_failed_conversion_never_attaches() {
    let (workflow, _service, backend) = setup(ServiceResponse::failure()).await;
    workflow
        .select_file(fixtures::png_candidate("score.png", 512))
        .await
        .unwrap();
    workflow.convert().await.unwrap();
    assert!(wait_for_stage(&workflow, Stage::Failed).await);

    assert_eq!(backend.open_count(), 0);
    assert!(workflow.snapshot().await.playback.is_none());
}
