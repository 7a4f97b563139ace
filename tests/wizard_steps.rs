//! Step gating through the wizard: validation preconditions, derived
//! navigation, and explicit workflow completion.

use draftloom::jobs::LaunchError;
use draftloom::steps::WizardStep;
use draftloom::types::{ArtifactKind, WorkflowStatus};
use draftloom::wizard::WizardError;

mod common;
use common::*;

use serde_json::json;

#[tokio::test]
async fn launching_without_completed_upstream_fails_validation() {
    let service = ScriptedService::new();
    let (wizard, workflow) = wizard_with(service).await;

    let result = wizard
        .generate(&workflow.id, &ArtifactKind::Structure, json!({}))
        .await;
    match result {
        Err(WizardError::Launch(LaunchError::ValidationFailed { missing, .. })) => {
            assert!(missing.contains(&ArtifactKind::ConceptDocument));
            assert!(missing.contains(&ArtifactKind::RetrievedMaterial));
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
    // The precondition failure never reached the service.
    assert!(
        !wizard
            .orchestrator()
            .has_active_job(&workflow.id, &ArtifactKind::Structure)
    );
}

#[tokio::test]
async fn can_advance_tracks_the_active_step_predicate_exactly() {
    let service = ScriptedService::new();
    let (wizard, workflow) = wizard_with(service).await;

    assert!(!wizard.can_advance(&workflow.id).await.unwrap());

    seed_completed(&wizard, &workflow.id, &ArtifactKind::SourceAnalysis).await;
    assert!(wizard.can_advance(&workflow.id).await.unwrap());

    // Advancing moves to the evaluation step, which is not complete yet.
    assert_eq!(
        wizard.advance(&workflow.id).await.unwrap(),
        WizardStep::Evaluation
    );
    assert!(!wizard.can_advance(&workflow.id).await.unwrap());

    // Blocked forward navigation is an explicit error.
    assert!(matches!(
        wizard.advance(&workflow.id).await,
        Err(WizardError::StepIncomplete {
            step: WizardStep::Evaluation
        })
    ));

    // Retreat is always permitted, including at a blocked step.
    assert_eq!(
        wizard.retreat(&workflow.id).await.unwrap(),
        WizardStep::SourceIntake
    );
}

#[tokio::test]
async fn completion_report_is_recomputed_per_query() {
    let service = ScriptedService::new();
    let (wizard, workflow) = wizard_with(service).await;

    seed_completed(&wizard, &workflow.id, &ArtifactKind::SourceAnalysis).await;
    let report = wizard.get_step_completion(&workflow.id).await.unwrap();
    assert!(report.is_complete(WizardStep::SourceIntake));
    assert_eq!(report.active, WizardStep::SourceIntake);

    // Invalidate the analysis: the next report must reflect it immediately.
    wizard
        .invalidate_artifact(&workflow.id, &ArtifactKind::SourceAnalysis)
        .await
        .unwrap();
    let report = wizard.get_step_completion(&workflow.id).await.unwrap();
    assert!(!report.is_complete(WizardStep::SourceIntake));
}

#[tokio::test]
async fn walking_the_wizard_to_explicit_completion() {
    let service = ScriptedService::new();
    let (wizard, workflow) = wizard_with(service).await;
    seed_chain(&wizard, &workflow.id, &ArtifactKind::BUILT_IN).await;

    // Completing early is refused: completion is an explicit final-step act.
    assert!(matches!(
        wizard.complete_workflow(&workflow.id).await,
        Err(WizardError::StepIncomplete { .. })
    ));

    for expected in [
        WizardStep::Evaluation,
        WizardStep::ConceptDraft,
        WizardStep::Outline,
        WizardStep::Review,
        WizardStep::Finalize,
    ] {
        assert_eq!(wizard.advance(&workflow.id).await.unwrap(), expected);
    }

    // Entering review flips the workflow status.
    let current = wizard.workflow(&workflow.id).await.unwrap();
    assert_eq!(current.status, WorkflowStatus::Review);

    // No forward navigation off the final step.
    assert!(!wizard.can_advance(&workflow.id).await.unwrap());

    wizard.complete_workflow(&workflow.id).await.unwrap();
    let current = wizard.workflow(&workflow.id).await.unwrap();
    assert_eq!(current.status, WorkflowStatus::Completed);
    let report = wizard.get_step_completion(&workflow.id).await.unwrap();
    assert!(report.is_complete(WizardStep::Finalize));
}

#[tokio::test]
async fn listing_workflows_by_owner() {
    let service = ScriptedService::new();
    let (wizard, workflow) = wizard_with(service).await;
    let other = wizard.create_workflow("owner-2").await.unwrap();

    let mine = wizard.list_workflows("owner-1").await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, workflow.id);
    assert_eq!(mine[0].code, workflow.code);

    let theirs = wizard.list_workflows("owner-2").await.unwrap();
    assert_eq!(theirs.len(), 1);
    assert_eq!(theirs[0].id, other.id);
}

#[tokio::test]
async fn archiving_marks_the_workflow_read_only_status() {
    let service = ScriptedService::new();
    let (wizard, workflow) = wizard_with(service).await;

    wizard.archive_workflow(&workflow.id).await.unwrap();
    let current = wizard.workflow(&workflow.id).await.unwrap();
    assert_eq!(current.status, WorkflowStatus::Archived);
}
