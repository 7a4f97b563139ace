//! The invalidation engine: change events in, ordered clear-sets out.
//!
//! The engine is pure: it decides *what* to clear, never touches storage.
//! Applying a clear-set (cache removal, best-effort store delete, job
//! cancellation, step recomputation) is the wizard runtime's job, which
//! keeps the narrowest-clear-set policy testable in isolation.

use std::slice::Iter;

use super::builder::DependencyGraph;
use super::edges::GraphNode;
use crate::types::{ArtifactKind, InputKind};

/// What changed, and in what way.
///
/// The origin decides whether the changed node itself joins the clear-set:
///
/// - `Input`: never — inputs are not content and cannot be cleared.
/// - `ArtifactUpstream`: no — the artifact is being regenerated in place;
///   only what derives from it goes stale.
/// - `ArtifactSelf`: yes — the user explicitly invalidated the artifact, so
///   it is cleared along with everything downstream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChangeOrigin {
    /// A raw input changed (re-upload, selection edit, query edit).
    Input(InputKind),
    /// An artifact is being regenerated; downstream goes stale, the
    /// artifact itself is replaced by the new generation.
    ArtifactUpstream(ArtifactKind),
    /// An artifact was explicitly invalidated by the user.
    ArtifactSelf(ArtifactKind),
}

/// The ordered set of artifacts to clear for one change event.
///
/// Order is topological (upstream before downstream) and deterministic;
/// each artifact appears at most once.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClearSet {
    artifacts: Vec<ArtifactKind>,
}

impl ClearSet {
    #[must_use]
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    #[must_use]
    pub fn contains(&self, kind: &ArtifactKind) -> bool {
        self.artifacts.contains(kind)
    }

    pub fn iter(&self) -> Iter<'_, ArtifactKind> {
        self.artifacts.iter()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<ArtifactKind> {
        self.artifacts
    }
}

impl<'a> IntoIterator for &'a ClearSet {
    type Item = &'a ArtifactKind;
    type IntoIter = Iter<'a, ArtifactKind>;

    fn into_iter(self) -> Self::IntoIter {
        self.artifacts.iter()
    }
}

/// Walks the dependency graph forward from a changed node and produces the
/// clear-set for it.
#[derive(Clone, Debug)]
pub struct InvalidationEngine {
    graph: DependencyGraph,
}

impl InvalidationEngine {
    #[must_use]
    pub fn new(graph: DependencyGraph) -> Self {
        Self { graph }
    }

    #[must_use]
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// The clear-set for `origin`.
    #[must_use]
    pub fn on_changed(&self, origin: &ChangeOrigin) -> ClearSet {
        let artifacts = match origin {
            ChangeOrigin::Input(input) => self
                .graph
                .downstream_closure(&GraphNode::Input(input.clone())),
            ChangeOrigin::ArtifactUpstream(kind) => self
                .graph
                .downstream_closure(&GraphNode::Artifact(kind.clone())),
            ChangeOrigin::ArtifactSelf(kind) => {
                let mut closure = self
                    .graph
                    .downstream_closure(&GraphNode::Artifact(kind.clone()));
                closure.insert(0, kind.clone());
                closure
            }
        };
        ClearSet { artifacts }
    }

    /// Clear-set for an edited raw input.
    #[must_use]
    pub fn input_changed(&self, input: &InputKind) -> ClearSet {
        self.on_changed(&ChangeOrigin::Input(input.clone()))
    }

    /// Clear-set for regenerating `kind` in place (strictly downstream).
    #[must_use]
    pub fn artifact_regenerating(&self, kind: &ArtifactKind) -> ClearSet {
        self.on_changed(&ChangeOrigin::ArtifactUpstream(kind.clone()))
    }

    /// Clear-set for an explicit user invalidation of `kind` (inclusive).
    #[must_use]
    pub fn artifact_invalidated(&self, kind: &ArtifactKind) -> ClearSet {
        self.on_changed(&ChangeOrigin::ArtifactSelf(kind.clone()))
    }
}
