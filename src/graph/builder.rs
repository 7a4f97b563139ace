//! DependencyGraphBuilder and the validated, compiled graph.
//!
//! The builder collects edges with a fluent API and compiles them into a
//! [`DependencyGraph`]: adjacency in both directions plus a deterministic
//! topological index over artifacts, which the invalidation engine uses to
//! emit clear-sets in a stable order.

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;

use super::edges::GraphNode;
use crate::types::{ArtifactKind, InputKind};

/// Errors produced when compiling a dependency graph.
#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    /// The declared edges contain a cycle among artifacts.
    #[error("dependency cycle involving: {involving}")]
    #[diagnostic(
        code(draftloom::graph::cycle),
        help("Artifact dependencies must form a DAG; remove one of the edges in the cycle.")
    )]
    CycleDetected { involving: String },
}

/// Builder for declaring artifact dependencies with a fluent API.
///
/// # Examples
///
/// ```rust
/// use draftloom::graph::{DependencyGraphBuilder, GraphNode};
/// use draftloom::types::{ArtifactKind, InputKind};
///
/// let graph = DependencyGraphBuilder::new()
///     .add_edge(InputKind::SourceDocument, ArtifactKind::SourceAnalysis)
///     .add_edge(ArtifactKind::SourceAnalysis, ArtifactKind::ConceptEvaluation)
///     .build()
///     .unwrap();
/// assert_eq!(graph.artifact_count(), 2);
/// ```
#[derive(Default)]
pub struct DependencyGraphBuilder {
    /// Outgoing edges keyed by source node.
    edges: FxHashMap<GraphNode, Vec<ArtifactKind>>,
    /// Artifacts in first-seen order; the tie-break for topological sorting.
    artifact_order: Vec<ArtifactKind>,
}

impl DependencyGraphBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a directed edge `from → to`.
    ///
    /// `from` may be an input or an artifact; `to` is always an artifact.
    /// Duplicate edges are collapsed.
    #[must_use]
    pub fn add_edge(mut self, from: impl Into<GraphNode>, to: ArtifactKind) -> Self {
        let from = from.into();
        if let GraphNode::Artifact(kind) = &from {
            self.register_artifact(kind.clone());
        }
        self.register_artifact(to.clone());
        let targets = self.edges.entry(from).or_default();
        if !targets.contains(&to) {
            targets.push(to);
        }
        self
    }

    fn register_artifact(&mut self, kind: ArtifactKind) {
        if !self.artifact_order.contains(&kind) {
            self.artifact_order.push(kind);
        }
    }

    /// Validate acyclicity and compile to a [`DependencyGraph`].
    pub fn build(self) -> Result<DependencyGraph, GraphError> {
        let mut in_degree: FxHashMap<&ArtifactKind, usize> =
            self.artifact_order.iter().map(|kind| (kind, 0)).collect();
        for (from, targets) in &self.edges {
            if from.as_artifact().is_some() {
                for target in targets {
                    if let Some(degree) = in_degree.get_mut(target) {
                        *degree += 1;
                    }
                }
            }
        }

        // Kahn's algorithm; ready nodes are taken in first-seen order so the
        // resulting index is deterministic across runs.
        let mut emitted: Vec<ArtifactKind> = Vec::with_capacity(self.artifact_order.len());
        let mut remaining: Vec<&ArtifactKind> = self.artifact_order.iter().collect();
        while !remaining.is_empty() {
            let position = remaining
                .iter()
                .position(|kind| in_degree.get(kind).copied().unwrap_or(0) == 0);
            let Some(position) = position else {
                let involving = remaining
                    .iter()
                    .map(|kind| kind.encode())
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(GraphError::CycleDetected { involving });
            };
            let ready = remaining.remove(position);
            if let Some(targets) = self.edges.get(&GraphNode::Artifact(ready.clone())) {
                for target in targets {
                    if let Some(degree) = in_degree.get_mut(target) {
                        *degree = degree.saturating_sub(1);
                    }
                }
            }
            emitted.push(ready.clone());
        }

        let topo_index: FxHashMap<ArtifactKind, usize> = emitted
            .iter()
            .cloned()
            .enumerate()
            .map(|(index, kind)| (kind, index))
            .collect();

        let mut upstream: FxHashMap<ArtifactKind, Vec<ArtifactKind>> = FxHashMap::default();
        for (from, targets) in &self.edges {
            if let Some(parent) = from.as_artifact() {
                for target in targets {
                    let parents = upstream.entry(target.clone()).or_default();
                    if !parents.contains(parent) {
                        parents.push(parent.clone());
                    }
                }
            }
        }
        for parents in upstream.values_mut() {
            parents.sort_by_key(|kind| topo_index.get(kind).copied().unwrap_or(usize::MAX));
        }

        Ok(DependencyGraph {
            edges: self.edges,
            upstream,
            topo_index,
        })
    }
}

/// A validated, acyclic artifact dependency graph.
///
/// Construction goes through [`DependencyGraphBuilder::build`], which
/// guarantees acyclicity and fixes a topological index used for ordering
/// clear-sets and upstream listings deterministically.
#[derive(Clone, Debug)]
pub struct DependencyGraph {
    edges: FxHashMap<GraphNode, Vec<ArtifactKind>>,
    upstream: FxHashMap<ArtifactKind, Vec<ArtifactKind>>,
    topo_index: FxHashMap<ArtifactKind, usize>,
}

impl DependencyGraph {
    /// Direct downstream artifacts of `node`.
    #[must_use]
    pub fn direct_downstream(&self, node: &GraphNode) -> &[ArtifactKind] {
        self.edges.get(node).map_or(&[], Vec::as_slice)
    }

    /// Direct upstream *artifact* dependencies of `artifact` (inputs are not
    /// listed; they gate nothing at launch time).
    #[must_use]
    pub fn required_upstream(&self, artifact: &ArtifactKind) -> &[ArtifactKind] {
        self.upstream.get(artifact).map_or(&[], Vec::as_slice)
    }

    /// The transitive closure of downstream artifacts from `node`, excluding
    /// the node itself, in topological order.
    ///
    /// Breadth-first over the edge list; each artifact joins the closure at
    /// most once, and the final ordering is by the compiled topological
    /// index so results are deterministic and upstream-before-downstream.
    #[must_use]
    pub fn downstream_closure(&self, node: &GraphNode) -> Vec<ArtifactKind> {
        let mut seen: Vec<ArtifactKind> = Vec::new();
        let mut frontier: Vec<ArtifactKind> = self.direct_downstream(node).to_vec();
        while let Some(kind) = frontier.pop() {
            if seen.contains(&kind) {
                continue;
            }
            frontier.extend_from_slice(self.direct_downstream(&GraphNode::Artifact(kind.clone())));
            seen.push(kind);
        }
        seen.sort_by_key(|kind| self.topo_index.get(kind).copied().unwrap_or(usize::MAX));
        seen
    }

    /// Position of `artifact` in the topological order, if known.
    #[must_use]
    pub fn topo_position(&self, artifact: &ArtifactKind) -> Option<usize> {
        self.topo_index.get(artifact).copied()
    }

    /// Number of artifacts participating in the graph.
    #[must_use]
    pub fn artifact_count(&self) -> usize {
        self.topo_index.len()
    }
}

/// The wizard's domain dependency graph.
///
/// This is the authoritative edge table; every clear-set the invalidation
/// engine produces derives from it:
///
/// - source document → source analysis → concept evaluation → concept
///   document → structure → draft feedback
/// - evaluation selections → concept document
/// - retrieval query → retrieved material → structure
#[must_use]
pub fn dependency_graph() -> DependencyGraph {
    DependencyGraphBuilder::new()
        .add_edge(InputKind::SourceDocument, ArtifactKind::SourceAnalysis)
        .add_edge(ArtifactKind::SourceAnalysis, ArtifactKind::ConceptEvaluation)
        .add_edge(ArtifactKind::ConceptEvaluation, ArtifactKind::ConceptDocument)
        .add_edge(InputKind::EvaluationSelection, ArtifactKind::ConceptDocument)
        .add_edge(ArtifactKind::ConceptDocument, ArtifactKind::Structure)
        .add_edge(InputKind::RetrievalQuery, ArtifactKind::RetrievedMaterial)
        .add_edge(ArtifactKind::RetrievedMaterial, ArtifactKind::Structure)
        .add_edge(ArtifactKind::Structure, ArtifactKind::DraftFeedback)
        .build()
        .unwrap_or_else(|_| unreachable!("the built-in dependency table is acyclic"))
}
