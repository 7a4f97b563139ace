//! Node identities for the dependency graph.

use std::fmt;

use crate::types::{ArtifactKind, InputKind};

/// A node in the dependency graph: a raw user input or an artifact.
///
/// Edges always point *at* artifacts — inputs have no upstream — so the
/// distinction matters only on the source side of an edge and when deciding
/// membership of a clear-set (inputs are never cleared; they are not
/// content).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum GraphNode {
    /// A raw user input (upload, selection, query).
    Input(InputKind),
    /// A generated or user-authored artifact.
    Artifact(ArtifactKind),
}

impl GraphNode {
    /// The artifact identity, if this node is an artifact.
    #[must_use]
    pub fn as_artifact(&self) -> Option<&ArtifactKind> {
        match self {
            GraphNode::Artifact(kind) => Some(kind),
            GraphNode::Input(_) => None,
        }
    }

    #[must_use]
    pub fn is_input(&self) -> bool {
        matches!(self, GraphNode::Input(_))
    }
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphNode::Input(input) => write!(f, "input:{input}"),
            GraphNode::Artifact(kind) => write!(f, "artifact:{kind}"),
        }
    }
}

impl From<InputKind> for GraphNode {
    fn from(input: InputKind) -> Self {
        GraphNode::Input(input)
    }
}

impl From<ArtifactKind> for GraphNode {
    fn from(kind: ArtifactKind) -> Self {
        GraphNode::Artifact(kind)
    }
}
