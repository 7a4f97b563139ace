//! Dependency graph definition and the invalidation engine.
//!
//! This module declares which artifact depends on which upstream artifacts
//! and raw inputs, and computes the exact set of artifacts to clear when a
//! node changes. The main entry points are [`DependencyGraphBuilder`] for
//! constructing a validated [`DependencyGraph`], and [`InvalidationEngine`]
//! for turning change events into ordered clear-sets.
//!
//! # Core Concepts
//!
//! - **Nodes**: Either raw inputs ([`GraphNode::Input`]) or artifacts
//!   ([`GraphNode::Artifact`]); only artifacts can appear in a clear-set.
//! - **Edges**: Directed `upstream → downstream artifact` relationships.
//! - **Clear-set**: The transitive closure of downstream artifacts from a
//!   changed node, emitted in deterministic topological order.
//! - **Validation**: [`DependencyGraphBuilder::build`] rejects cyclic graphs.
//!
//! # Quick Start
//!
//! ```rust
//! use draftloom::graph::{DependencyGraphBuilder, GraphNode, InvalidationEngine};
//! use draftloom::types::{ArtifactKind, InputKind};
//!
//! let graph = DependencyGraphBuilder::new()
//!     .add_edge(
//!         GraphNode::Input(InputKind::SourceDocument),
//!         ArtifactKind::SourceAnalysis,
//!     )
//!     .add_edge(
//!         GraphNode::Artifact(ArtifactKind::SourceAnalysis),
//!         ArtifactKind::ConceptEvaluation,
//!     )
//!     .build()
//!     .unwrap();
//!
//! let engine = InvalidationEngine::new(graph);
//! let cleared = engine.input_changed(&InputKind::SourceDocument);
//! assert_eq!(cleared.len(), 2);
//! ```
//!
//! The wizard uses the domain graph from [`dependency_graph`], which encodes
//! the narrowest clear-set per edit (clearing more than listed is as much a
//! defect as clearing less).

mod builder;
mod edges;
mod invalidation;

#[cfg(test)]
mod tests;

pub use builder::{DependencyGraph, DependencyGraphBuilder, GraphError, dependency_graph};
pub use edges::GraphNode;
pub use invalidation::{ChangeOrigin, ClearSet, InvalidationEngine};
