//! Property tests for clear-set computation over arbitrary DAGs.

use proptest::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};

use draftloom::graph::{DependencyGraphBuilder, GraphNode, InvalidationEngine};
use draftloom::types::ArtifactKind;

const NODES: usize = 8;

fn node(index: usize) -> ArtifactKind {
    ArtifactKind::Custom(format!("n{index}"))
}

/// Naive reachability over the raw edge list, for comparison.
fn reachable(edges: &[(usize, usize)], start: usize) -> FxHashSet<usize> {
    let mut adjacency: FxHashMap<usize, Vec<usize>> = FxHashMap::default();
    for (from, to) in edges {
        adjacency.entry(*from).or_default().push(*to);
    }
    let mut seen = FxHashSet::default();
    let mut frontier = vec![start];
    while let Some(current) = frontier.pop() {
        for next in adjacency.get(&current).cloned().unwrap_or_default() {
            if seen.insert(next) {
                frontier.push(next);
            }
        }
    }
    seen.remove(&start);
    seen
}

proptest! {
    /// The clear-set is exactly the set of artifacts reachable from the
    /// changed node, with no duplicates, in topological order.
    #[test]
    fn clear_set_is_exact_reachability(
        raw_edges in proptest::collection::vec((0usize..NODES, 0usize..NODES), 1..24),
        start in 0usize..NODES,
    ) {
        // Orient every edge low→high so the graph is acyclic by construction.
        let edges: Vec<(usize, usize)> = raw_edges
            .into_iter()
            .filter(|(from, to)| from != to)
            .map(|(from, to)| (from.min(to), from.max(to)))
            .collect();
        prop_assume!(!edges.is_empty());

        let mut builder = DependencyGraphBuilder::new();
        for (from, to) in &edges {
            builder = builder.add_edge(node(*from), node(*to));
        }
        let graph = builder.build().expect("low→high edges cannot cycle");
        let engine = InvalidationEngine::new(graph);

        let cleared = engine.artifact_regenerating(&node(start)).into_vec();

        // No duplicates.
        let unique: FxHashSet<&ArtifactKind> = cleared.iter().collect();
        prop_assert_eq!(unique.len(), cleared.len());

        // Exactly the reachable set.
        let expected = reachable(&edges, start);
        prop_assert_eq!(cleared.len(), expected.len());
        for index in &expected {
            prop_assert!(cleared.contains(&node(*index)));
        }

        // Topologically ordered (upstream before downstream).
        let positions: Vec<usize> = cleared
            .iter()
            .map(|kind| engine.graph().topo_position(kind).expect("in graph"))
            .collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        prop_assert_eq!(positions, sorted);
    }

    /// Two engines over the same edge list produce identical clear-sets.
    #[test]
    fn clear_sets_are_deterministic(
        raw_edges in proptest::collection::vec((0usize..NODES, 0usize..NODES), 1..24),
        start in 0usize..NODES,
    ) {
        let edges: Vec<(usize, usize)> = raw_edges
            .into_iter()
            .filter(|(from, to)| from != to)
            .map(|(from, to)| (from.min(to), from.max(to)))
            .collect();
        prop_assume!(!edges.is_empty());

        let build = || {
            let mut builder = DependencyGraphBuilder::new();
            for (from, to) in &edges {
                builder = builder.add_edge(node(*from), node(*to));
            }
            InvalidationEngine::new(builder.build().expect("acyclic"))
        };
        let first = build().artifact_regenerating(&node(start));
        let second = build().artifact_regenerating(&node(start));
        prop_assert_eq!(first, second);
    }
}

#[test]
fn input_nodes_are_never_members_of_their_own_clear_set() {
    use draftloom::types::InputKind;

    let graph = DependencyGraphBuilder::new()
        .add_edge(InputKind::SourceDocument, node(0))
        .add_edge(node(0), node(1))
        .build()
        .unwrap();
    let engine = InvalidationEngine::new(graph);
    let cleared = engine.input_changed(&InputKind::SourceDocument).into_vec();
    assert_eq!(cleared, vec![node(0), node(1)]);
}

#[test]
fn unregistered_nodes_have_empty_clear_sets() {
    let graph = DependencyGraphBuilder::new()
        .add_edge(node(0), node(1))
        .build()
        .unwrap();
    let engine = InvalidationEngine::new(graph);
    assert!(
        engine
            .artifact_regenerating(&ArtifactKind::Custom("unknown".to_string()))
            .is_empty()
    );
    assert!(engine.graph().direct_downstream(&GraphNode::Artifact(node(1))).is_empty());
}
