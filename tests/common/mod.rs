//! Shared fixtures: a scripted generation service and wizard builders.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::{Value, json};

use draftloom::artifact::{ArtifactRecord, ArtifactState};
use draftloom::config::OrchestratorConfig;
use draftloom::jobs::{
    GenerationService, JobRef, PollReply, ServiceError, StartAck, StartStatus,
};
use draftloom::store::InMemoryArtifactStore;
use draftloom::types::ArtifactKind;
use draftloom::wizard::Wizard;
use draftloom::workflow::Workflow;

/// How one launched job should behave under polling.
#[derive(Clone, Debug)]
pub enum Script {
    /// Report `processing` for `polls - 1` polls, then complete.
    CompleteAfter { polls: u32, payload: Value },
    /// Report `processing` for `polls - 1` polls, then fail.
    FailAfter { polls: u32, error: String },
    /// Report `processing` forever (exercises the attempt ceiling).
    NeverFinish,
}

struct RunningJob {
    script: Script,
    polls_done: u32,
}

/// Generation service driven entirely by per-artifact scripts.
///
/// Each `start` for an artifact consumes the next queued script; artifacts
/// without a queue fall back to completing on the first poll.
#[derive(Default)]
pub struct ScriptedService {
    scripts: Mutex<FxHashMap<String, VecDeque<Script>>>,
    jobs: Mutex<FxHashMap<String, RunningJob>>,
    next_ref: AtomicU32,
    starts: AtomicU32,
}

impl ScriptedService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue the next launch behavior for `artifact`.
    pub fn script(&self, artifact: &ArtifactKind, script: Script) {
        self.scripts
            .lock()
            .entry(artifact.encode())
            .or_default()
            .push_back(script);
    }

    /// Number of jobs started so far.
    pub fn starts(&self) -> u32 {
        self.starts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationService for ScriptedService {
    async fn start(
        &self,
        _workflow_id: &str,
        artifact: &ArtifactKind,
        _request: Value,
    ) -> Result<StartAck, ServiceError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        let script = self
            .scripts
            .lock()
            .get_mut(&artifact.encode())
            .and_then(VecDeque::pop_front)
            .unwrap_or(Script::CompleteAfter {
                polls: 1,
                payload: json!({"generated": artifact.encode()}),
            });
        let reference = format!("job-{}", self.next_ref.fetch_add(1, Ordering::SeqCst));
        self.jobs.lock().insert(
            reference.clone(),
            RunningJob {
                script,
                polls_done: 0,
            },
        );
        Ok(StartAck {
            status: StartStatus::Started,
            job_ref: JobRef::new(reference),
        })
    }

    async fn poll(&self, job_ref: &JobRef) -> Result<PollReply, ServiceError> {
        let mut jobs = self.jobs.lock();
        let job = jobs
            .get_mut(job_ref.as_str())
            .ok_or_else(|| ServiceError::transport(format!("unknown job {job_ref}")))?;
        job.polls_done += 1;
        let reply = match &job.script {
            Script::CompleteAfter { polls, payload } => {
                if job.polls_done >= *polls {
                    PollReply::Completed {
                        payload: payload.clone(),
                    }
                } else {
                    PollReply::Processing
                }
            }
            Script::FailAfter { polls, error } => {
                if job.polls_done >= *polls {
                    PollReply::Failed {
                        error: error.clone(),
                    }
                } else {
                    PollReply::Processing
                }
            }
            Script::NeverFinish => PollReply::Processing,
        };
        Ok(reply)
    }
}

/// Millisecond-scale polling so tests finish quickly.
pub fn fast_config() -> OrchestratorConfig {
    OrchestratorConfig::default()
        .with_poll_interval(Duration::from_millis(2))
        .with_max_poll_attempts(25)
}

/// A wizard over an in-memory store plus one persisted workflow.
pub async fn wizard_with(service: Arc<ScriptedService>) -> (Wizard, Workflow) {
    let store = Arc::new(InMemoryArtifactStore::new());
    let wizard = Wizard::new(service, store, fast_config());
    let workflow = wizard
        .create_workflow("owner-1")
        .await
        .expect("create workflow");
    (wizard, workflow)
}

/// Seed a completed artifact directly through the repository, bypassing the
/// generation pipeline.
pub async fn seed_completed(wizard: &Wizard, workflow_id: &str, artifact: &ArtifactKind) {
    wizard
        .repository()
        .put(
            workflow_id,
            artifact,
            ArtifactRecord {
                state: ArtifactState::completed(json!({"seeded": artifact.encode()})),
                ..Default::default()
            },
        )
        .await;
}

/// Seed every artifact upstream of the given step chain as completed.
pub async fn seed_chain(wizard: &Wizard, workflow_id: &str, artifacts: &[ArtifactKind]) {
    for artifact in artifacts {
        seed_completed(wizard, workflow_id, artifact).await;
    }
}
