//! Property-based tests for the collection invariants.
//!
//! These verify the behavioral contracts of the collector over randomly
//! shaped dependency universes (cycles included):
//! - no node repeats an ancestor's versionless coordinate
//! - equal inputs collect structurally identical graphs
//! - the text rendering of a collected graph reparses to an equal graph

mod support;

use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;

use quarry_collect::{CollectRequest, Collector, DependencyGraph, NodeId};
use quarry_core::{Session, VersionlessKey};

use support::{dep, dep_scoped, descriptor, repository, DescriptorExt, StaticDescriptorReader,
    StubVersionRangeResolver};

// =============================================================================
// Universe generation
// =============================================================================

/// A universe is, per artifact index, the list of artifact indices it
/// depends on. Cycles and self-references are allowed; the collector is
/// expected to truncate them.
fn universe_strategy() -> impl Strategy<Value = Vec<Vec<usize>>> {
    (2usize..8).prop_flat_map(|count| {
        proptest::collection::vec(
            proptest::collection::vec(0..count, 0..=3),
            count,
        )
    })
}

fn reader_for(universe: &[Vec<usize>]) -> StaticDescriptorReader {
    let mut reader = StaticDescriptorReader::new();
    for (index, deps) in universe.iter().enumerate() {
        let mut d = descriptor(&format!("u:a{index}:jar:1"));
        for dep_index in deps {
            d = d.with_dependency(dep_scoped(&format!("u:a{dep_index}:jar:1"), "compile"));
        }
        reader = reader.put(d);
    }
    reader
}

fn collect(universe: &[Vec<usize>]) -> DependencyGraph {
    let collector = Collector::new(
        Arc::new(reader_for(universe)),
        Arc::new(StubVersionRangeResolver::new()),
    );
    let request = CollectRequest::root(dep("u:a0:jar:1"), vec![repository("id")]);
    collector
        .collect(&Session::default(), request)
        .expect("universe descriptors are all present")
        .graph
}

// =============================================================================
// Invariant checks
// =============================================================================

/// A node whose versionless coordinate already appears on its own path is
/// a truncated cycle and must be a leaf; no expanded node repeats an
/// ancestor.
fn assert_path_invariant(graph: &DependencyGraph) {
    fn walk(graph: &DependencyGraph, id: NodeId, path: &mut HashSet<VersionlessKey>) {
        let node = graph.node(id);
        let key = node.dependency().map(|d| d.coordinate.versionless());
        if let Some(key) = &key {
            if path.contains(key) {
                assert!(
                    node.children().is_empty(),
                    "cycle node {key} was expanded instead of truncated"
                );
                return;
            }
            path.insert(key.clone());
        }
        for &child in node.children() {
            walk(graph, child, path);
        }
        if let Some(key) = &key {
            path.remove(key);
        }
    }
    walk(graph, graph.root(), &mut HashSet::new());
}

proptest! {
    #[test]
    fn no_node_repeats_an_ancestor(universe in universe_strategy()) {
        let graph = collect(&universe);
        assert_path_invariant(&graph);
    }

    #[test]
    fn equal_inputs_collect_equal_graphs(universe in universe_strategy()) {
        let first = collect(&universe);
        let second = collect(&universe);
        prop_assert_eq!(&first, &second);
    }

    #[test]
    fn text_rendering_round_trips(universe in universe_strategy()) {
        let graph = collect(&universe);
        let text = graph.to_text();
        let reparsed = quarry_collect::parse_text(&text).unwrap();
        prop_assert_eq!(reparsed.to_text(), text);
        prop_assert_eq!(reparsed.node_count(), graph.node_count());
    }
}
