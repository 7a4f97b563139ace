//! Job orchestration: conflict detection, timeout semantics, cancellation
//! guards, supersession, and multi-stage sequences.

use std::time::Duration;

use draftloom::event_bus::{Event, EventBus, JobPhase, MemorySink};
use draftloom::jobs::{JobError, StageSpec};
use draftloom::store::InMemoryArtifactStore;
use draftloom::types::{ArtifactKind, ArtifactStatus};
use draftloom::wizard::{Wizard, WizardError, analysis_stages};

mod common;
use common::*;

use serde_json::json;

#[tokio::test]
async fn completion_commits_the_payload_through_cache_and_store() {
    let service = ScriptedService::new();
    let (wizard, workflow) = wizard_with(service.clone()).await;

    service.script(
        &ArtifactKind::SourceAnalysis,
        Script::CompleteAfter {
            polls: 2,
            payload: json!({"topics": ["budget", "scope"]}),
        },
    );
    let handle = wizard
        .generate(&workflow.id, &ArtifactKind::SourceAnalysis, json!({}))
        .await
        .unwrap();
    let payload = handle.outcome().await.unwrap();
    assert_eq!(payload["topics"][0], "budget");

    let current = wizard.workflow(&workflow.id).await.unwrap();
    assert_eq!(
        current.status_of(&ArtifactKind::SourceAnalysis),
        ArtifactStatus::Completed
    );
    // Terminal job: the pair is free for the next launch.
    assert!(
        !wizard
            .orchestrator()
            .has_active_job(&workflow.id, &ArtifactKind::SourceAnalysis)
    );
}

#[tokio::test]
async fn launching_over_an_active_job_fails_with_conflicting_job() {
    let service = ScriptedService::new();
    let (wizard, workflow) = wizard_with(service.clone()).await;

    service.script(&ArtifactKind::SourceAnalysis, Script::NeverFinish);
    let _running = wizard
        .generate(&workflow.id, &ArtifactKind::SourceAnalysis, json!({}))
        .await
        .unwrap();

    let second = wizard
        .generate(&workflow.id, &ArtifactKind::SourceAnalysis, json!({}))
        .await;
    assert!(matches!(
        second,
        Err(WizardError::Launch(
            draftloom::jobs::LaunchError::ConflictingJob { .. }
        ))
    ));

    // Cancelling frees the pair.
    assert!(wizard.cancel_generation(&workflow.id, &ArtifactKind::SourceAnalysis));
    service.script(&ArtifactKind::SourceAnalysis, Script::NeverFinish);
    assert!(
        wizard
            .generate(&workflow.id, &ArtifactKind::SourceAnalysis, json!({}))
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn exhausting_the_poll_ceiling_times_out_but_keeps_the_artifact_processing() {
    let service = ScriptedService::new();
    let store = std::sync::Arc::new(InMemoryArtifactStore::new());
    let wizard = Wizard::new(
        service.clone(),
        store,
        fast_config().with_max_poll_attempts(4),
    );
    let workflow = wizard.create_workflow("owner-1").await.unwrap();

    service.script(&ArtifactKind::SourceAnalysis, Script::NeverFinish);
    let handle = wizard
        .generate(&workflow.id, &ArtifactKind::SourceAnalysis, json!({}))
        .await
        .unwrap();
    match handle.outcome().await {
        Err(JobError::Timeout { attempts }) => assert_eq!(attempts, 4),
        other => panic!("expected timeout, got {other:?}"),
    }

    // Not failed, not absent: processing, awaiting a manual retry.
    let current = wizard.workflow(&workflow.id).await.unwrap();
    assert_eq!(
        current.status_of(&ArtifactKind::SourceAnalysis),
        ArtifactStatus::Processing
    );

    // The retry launches without tripping the conflict check.
    service.script(
        &ArtifactKind::SourceAnalysis,
        Script::CompleteAfter {
            polls: 1,
            payload: json!({"second": "try"}),
        },
    );
    let retry = wizard
        .generate(&workflow.id, &ArtifactKind::SourceAnalysis, json!({}))
        .await
        .unwrap();
    assert!(retry.outcome().await.is_ok());
}

#[tokio::test]
async fn a_cancelled_jobs_late_completion_never_mutates_state() {
    let service = ScriptedService::new();
    let (wizard, workflow) = wizard_with(service.clone()).await;

    service.script(
        &ArtifactKind::SourceAnalysis,
        Script::CompleteAfter {
            polls: 5,
            payload: json!({"stale": true}),
        },
    );
    let handle = wizard
        .generate(&workflow.id, &ArtifactKind::SourceAnalysis, json!({}))
        .await
        .unwrap();
    let generation_at_launch = handle.generation();

    wizard.cancel_generation(&workflow.id, &ArtifactKind::SourceAnalysis);
    assert!(matches!(handle.outcome().await, Err(JobError::Cancelled)));

    // The counter moved past the cancelled job's generation.
    assert!(
        wizard
            .orchestrator()
            .current_generation(&workflow.id, &ArtifactKind::SourceAnalysis)
            > generation_at_launch
    );

    // Even after the service would have completed, nothing was committed.
    tokio::time::sleep(Duration::from_millis(30)).await;
    let current = wizard.workflow(&workflow.id).await.unwrap();
    assert_ne!(
        current.status_of(&ArtifactKind::SourceAnalysis),
        ArtifactStatus::Completed
    );
}

#[tokio::test]
async fn superseding_replaces_the_running_job() {
    let service = ScriptedService::new();
    let (wizard, workflow) = wizard_with(service.clone()).await;

    service.script(&ArtifactKind::SourceAnalysis, Script::NeverFinish);
    let first = wizard
        .generate(&workflow.id, &ArtifactKind::SourceAnalysis, json!({}))
        .await
        .unwrap();

    service.script(
        &ArtifactKind::SourceAnalysis,
        Script::CompleteAfter {
            polls: 1,
            payload: json!({"fresh": true}),
        },
    );
    let second = wizard
        .orchestrator()
        .supersede(&workflow.id, &ArtifactKind::SourceAnalysis, json!({}))
        .await
        .unwrap();

    assert!(matches!(first.outcome().await, Err(JobError::Cancelled)));
    let payload = second.outcome().await.unwrap();
    assert_eq!(payload["fresh"], true);
}

#[tokio::test]
async fn upstream_failure_marks_the_artifact_failed_and_retryable() {
    let service = ScriptedService::new();
    let (wizard, workflow) = wizard_with(service.clone()).await;

    service.script(
        &ArtifactKind::SourceAnalysis,
        Script::FailAfter {
            polls: 1,
            error: "model refused the request".to_string(),
        },
    );
    let handle = wizard
        .generate(&workflow.id, &ArtifactKind::SourceAnalysis, json!({}))
        .await
        .unwrap();
    match handle.outcome().await {
        Err(JobError::UpstreamGenerationFailed { detail }) => {
            assert!(detail.contains("refused"));
        }
        other => panic!("expected upstream failure, got {other:?}"),
    }

    let current = wizard.workflow(&workflow.id).await.unwrap();
    let record = current.record(&ArtifactKind::SourceAnalysis).unwrap();
    assert_eq!(record.status(), ArtifactStatus::Failed);
    assert_eq!(
        record.state.error_detail(),
        Some("model refused the request")
    );

    // Failed is retryable: a fresh launch goes through.
    assert!(
        wizard
            .generate(&workflow.id, &ArtifactKind::SourceAnalysis, json!({}))
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn a_failing_stage_aborts_the_rest_without_committing_the_composite() {
    let service = ScriptedService::new();
    let (wizard, workflow) = wizard_with(service.clone()).await;

    let notes = ArtifactKind::Custom("ParseNotes".to_string());
    // Stage 1 succeeds and commits its payload independently; stage 2 fails;
    // stage 3 must never start.
    service.script(
        &ArtifactKind::SourceAnalysis,
        Script::CompleteAfter {
            polls: 1,
            payload: json!({"notes": "parsed fine"}),
        },
    );
    service.script(
        &ArtifactKind::SourceAnalysis,
        Script::FailAfter {
            polls: 1,
            error: "assessment blew up".to_string(),
        },
    );

    let stages = vec![
        StageSpec::new("parse source", json!({"stage": 1})).committing_to(notes.clone()),
        StageSpec::new("assess content", json!({"stage": 2})),
        StageSpec::new("compose analysis", json!({"stage": 3})),
    ];
    let handle = wizard
        .generate_staged(&workflow.id, &ArtifactKind::SourceAnalysis, stages)
        .await
        .unwrap();
    assert!(matches!(
        handle.outcome().await,
        Err(JobError::UpstreamGenerationFailed { .. })
    ));

    // Only two stages ever reached the service.
    assert_eq!(service.starts(), 2);

    let current = wizard.workflow(&workflow.id).await.unwrap();
    assert_eq!(
        current.status_of(&ArtifactKind::SourceAnalysis),
        ArtifactStatus::Failed
    );
    // The independent stage-1 artifact was committed and survives.
    assert_eq!(current.status_of(&notes), ArtifactStatus::Completed);
}

#[tokio::test]
async fn staged_generation_surfaces_the_active_stage() {
    let service = ScriptedService::new();
    let store = std::sync::Arc::new(InMemoryArtifactStore::new());
    let sink = MemorySink::new();
    let bus = EventBus::with_sink(sink.clone());
    bus.listen_for_events();
    let wizard = Wizard::new(service.clone(), store, fast_config()).with_event_bus(&bus);
    let workflow = wizard.create_workflow("owner-1").await.unwrap();

    let handle = wizard
        .generate_staged(
            &workflow.id,
            &ArtifactKind::SourceAnalysis,
            analysis_stages(json!({"doc": "…"})),
        )
        .await
        .unwrap();
    assert!(handle.outcome().await.is_ok());

    tokio::time::sleep(Duration::from_millis(20)).await;
    bus.stop_listener().await;

    let stage_labels: Vec<String> = sink
        .snapshot()
        .into_iter()
        .filter_map(|event| match event {
            Event::Job(job) if job.phase == JobPhase::StageStarted => Some(job.detail),
            _ => None,
        })
        .collect();
    assert_eq!(stage_labels.len(), 3);
    assert!(stage_labels[0].contains("parse source"));
    assert!(stage_labels[2].contains("compose analysis"));
}
