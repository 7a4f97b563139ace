//! Test suite for dependency graph construction and clear-set computation.

#[cfg(test)]
mod tests {
    use super::super::{
        ChangeOrigin, DependencyGraphBuilder, GraphError, GraphNode, InvalidationEngine,
        dependency_graph,
    };
    use crate::types::{ArtifactKind, InputKind};

    fn engine() -> InvalidationEngine {
        InvalidationEngine::new(dependency_graph())
    }

    #[test]
    fn source_document_clears_the_whole_derivation_chain() {
        let cleared = engine().input_changed(&InputKind::SourceDocument);
        assert_eq!(
            cleared.clone().into_vec(),
            vec![
                ArtifactKind::SourceAnalysis,
                ArtifactKind::ConceptEvaluation,
                ArtifactKind::ConceptDocument,
                ArtifactKind::Structure,
                ArtifactKind::DraftFeedback,
            ]
        );
        // Retrieval derives from the query, not from the source document.
        assert!(!cleared.contains(&ArtifactKind::RetrievedMaterial));
    }

    #[test]
    fn evaluation_selection_spares_analysis_and_the_evaluation_itself() {
        let cleared = engine().input_changed(&InputKind::EvaluationSelection);
        assert_eq!(
            cleared.clone().into_vec(),
            vec![
                ArtifactKind::ConceptDocument,
                ArtifactKind::Structure,
                ArtifactKind::DraftFeedback,
            ]
        );
        assert!(!cleared.contains(&ArtifactKind::SourceAnalysis));
        assert!(!cleared.contains(&ArtifactKind::ConceptEvaluation));
    }

    #[test]
    fn retrieval_query_clears_material_then_structure() {
        let cleared = engine().input_changed(&InputKind::RetrievalQuery);
        assert_eq!(
            cleared.into_vec(),
            vec![
                ArtifactKind::RetrievedMaterial,
                ArtifactKind::Structure,
                ArtifactKind::DraftFeedback,
            ]
        );
    }

    #[test]
    fn regenerating_structure_clears_feedback_only() {
        let cleared = engine().artifact_regenerating(&ArtifactKind::Structure);
        assert_eq!(cleared.into_vec(), vec![ArtifactKind::DraftFeedback]);
    }

    #[test]
    fn explicit_invalidation_includes_the_artifact_itself() {
        let cleared = engine().artifact_invalidated(&ArtifactKind::Structure);
        assert_eq!(
            cleared.into_vec(),
            vec![ArtifactKind::Structure, ArtifactKind::DraftFeedback]
        );
    }

    #[test]
    fn terminal_artifact_has_empty_downstream() {
        let cleared = engine().artifact_regenerating(&ArtifactKind::DraftFeedback);
        assert!(cleared.is_empty());
    }

    #[test]
    fn on_changed_is_idempotent_per_node() {
        // Structure is reachable via both the concept document and the
        // retrieved material; it must appear exactly once.
        let cleared = engine().input_changed(&InputKind::SourceDocument);
        let count = cleared
            .iter()
            .filter(|kind| **kind == ArtifactKind::Structure)
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn clear_set_order_is_topological() {
        let graph = dependency_graph();
        let cleared = engine().input_changed(&InputKind::SourceDocument);
        let positions: Vec<usize> = cleared
            .iter()
            .map(|kind| graph.topo_position(kind).unwrap())
            .collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn required_upstream_lists_direct_artifact_parents() {
        let graph = dependency_graph();
        let parents = graph.required_upstream(&ArtifactKind::Structure);
        assert_eq!(
            parents,
            &[
                ArtifactKind::ConceptDocument,
                ArtifactKind::RetrievedMaterial,
            ]
        );
        assert!(
            graph
                .required_upstream(&ArtifactKind::SourceAnalysis)
                .is_empty()
        );
    }

    #[test]
    fn duplicate_edges_are_collapsed() {
        let graph = DependencyGraphBuilder::new()
            .add_edge(ArtifactKind::SourceAnalysis, ArtifactKind::ConceptEvaluation)
            .add_edge(ArtifactKind::SourceAnalysis, ArtifactKind::ConceptEvaluation)
            .build()
            .unwrap();
        assert_eq!(
            graph.direct_downstream(&GraphNode::Artifact(ArtifactKind::SourceAnalysis)),
            &[ArtifactKind::ConceptEvaluation]
        );
    }

    #[test]
    fn cycle_is_rejected_at_build_time() {
        let result = DependencyGraphBuilder::new()
            .add_edge(ArtifactKind::SourceAnalysis, ArtifactKind::ConceptEvaluation)
            .add_edge(ArtifactKind::ConceptEvaluation, ArtifactKind::SourceAnalysis)
            .build();
        assert!(matches!(result, Err(GraphError::CycleDetected { .. })));
    }

    #[test]
    fn change_origin_enum_routes_like_the_convenience_methods() {
        let engine = engine();
        assert_eq!(
            engine.on_changed(&ChangeOrigin::Input(InputKind::RetrievalQuery)),
            engine.input_changed(&InputKind::RetrievalQuery)
        );
        assert_eq!(
            engine.on_changed(&ChangeOrigin::ArtifactSelf(ArtifactKind::Structure)),
            engine.artifact_invalidated(&ArtifactKind::Structure)
        );
    }
}
