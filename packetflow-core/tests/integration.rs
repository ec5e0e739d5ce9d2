//! Integration Tests for the Evaluation Engine
//!
//! These tests build graphs from the builtin catalog and check whole-pass
//! behaviour through the public API.

use packetflow_core::graph::VisitState;
use packetflow_core::nodes::{DisplayBuffer, DisplayFilter, DisplayInteger, DisplayStats};
use packetflow_core::{
    CapabilityStore, EngineConfig, ErrorKind, Graph, GraphError, NodeCatalog, NodeId, Overlay,
    PersistedGraph, Value,
};
use serde_json::json;

fn int(graph: &mut Graph, catalog: &NodeCatalog, value: u64) -> NodeId {
    let id = graph.create_node(catalog, "constants.int").unwrap();
    graph.node_mut(id).unwrap().load(json!({ "data": value })).unwrap();
    id
}

fn bytes(graph: &mut Graph, catalog: &NodeCatalog, data: &[u8]) -> NodeId {
    let id = graph.create_node(catalog, "constants.buffer").unwrap();
    graph
        .node_mut(id)
        .unwrap()
        .load(json!({ "size": data.len(), "data": data }))
        .unwrap();
    id
}

/// Two writes sharing an address constant, plus a display of a sum.
fn patch_graph(catalog: &NodeCatalog) -> (Graph, NodeId) {
    let mut graph = Graph::new();

    let base = int(&mut graph, catalog, 0x100);
    let offset = int(&mut graph, catalog, 4);
    let sum = graph.create_node(catalog, "arithmetic.add").unwrap();
    graph.link(base, 0, sum, 0).unwrap();
    graph.link(offset, 0, sum, 1).unwrap();

    let header = bytes(&mut graph, catalog, &[0xDE, 0xAD]);
    let first = graph.create_node(catalog, "data_access.write").unwrap();
    graph.link(base, 0, first, 0).unwrap();
    graph.link(header, 0, first, 1).unwrap();

    let payload = bytes(&mut graph, catalog, &[0xBE, 0xEF]);
    let second = graph.create_node(catalog, "data_access.write").unwrap();
    graph.link(sum, 2, second, 0).unwrap();
    graph.link(payload, 0, second, 1).unwrap();

    let display = graph.create_node(catalog, "display.int").unwrap();
    graph.link(sum, 2, display, 0).unwrap();

    (graph, display)
}

/// Test that a full pass writes every terminal's bytes into the overlay.
#[test]
fn terminals_patch_the_overlay() {
    let catalog = NodeCatalog::builtin();
    let (mut graph, display) = patch_graph(&catalog);

    let mut overlay = Overlay::with_base_address(0x100);
    let summary = graph
        .evaluate_terminals(&mut overlay, &CapabilityStore::new())
        .unwrap();

    assert_eq!(summary.terminals, 3);
    assert_eq!(overlay.data(), &[0xDE, 0xAD, 0x00, 0x00, 0xBE, 0xEF]);
    assert_eq!(
        graph.node_as::<DisplayInteger>(display).unwrap().render(),
        "0x104"
    );
}

/// Test that a shared producer runs once per pass however many consumers
/// pull from it.
#[test]
fn shared_producer_is_processed_once() {
    let catalog = NodeCatalog::builtin();
    let (mut graph, _) = patch_graph(&catalog);

    let summary = graph
        .evaluate_terminals(&mut Overlay::with_base_address(0x100), &CapabilityStore::new())
        .unwrap();

    // Every node is reachable from a terminal and ran exactly once.
    assert_eq!(summary.processed, graph.node_count());
    for id in graph.node_ids() {
        assert_eq!(graph.visit_state(id), Some(VisitState::Done));
    }
}

/// Test that repeated passes produce the same values and overlay bytes.
#[test]
fn passes_are_deterministic_and_idempotent() {
    let catalog = NodeCatalog::builtin();
    let (mut graph, display) = patch_graph(&catalog);
    let capabilities = CapabilityStore::new();

    let mut overlay = Overlay::with_base_address(0x100);
    graph.evaluate_terminals(&mut overlay, &capabilities).unwrap();
    let first_bytes = overlay.data().to_vec();
    let first_value = graph.node_as::<DisplayInteger>(display).unwrap().value();

    graph.evaluate_terminals(&mut overlay, &capabilities).unwrap();
    assert_eq!(overlay.data(), first_bytes.as_slice());

    let mut fresh = Overlay::with_base_address(0x100);
    graph.evaluate_terminals(&mut fresh, &capabilities).unwrap();
    assert_eq!(fresh, overlay);
    assert_eq!(graph.node_as::<DisplayInteger>(display).unwrap().value(), first_value);
    assert_eq!(first_value, Some(0x104));
}

/// Test that a cycle fails the pass with an error naming a node on the
/// loop, and that writes finished before it stay in the overlay.
#[test]
fn cycle_aborts_after_earlier_writes() {
    let catalog = NodeCatalog::builtin();
    let mut graph = Graph::new();

    let address = int(&mut graph, &catalog, 0);
    let data = bytes(&mut graph, &catalog, &[1, 2, 3]);
    let write = graph.create_node(&catalog, "data_access.write").unwrap();
    graph.link(address, 0, write, 0).unwrap();
    graph.link(data, 0, write, 1).unwrap();

    // A ring of adders feeding each other.
    let one = int(&mut graph, &catalog, 1);
    let ring: Vec<NodeId> = (0..100)
        .map(|_| graph.create_node(&catalog, "arithmetic.add").unwrap())
        .collect();
    for (i, &node) in ring.iter().enumerate() {
        let next = ring[(i + 1) % ring.len()];
        graph.link(node, 2, next, 0).unwrap();
        graph.link(one, 0, node, 1).unwrap();
    }
    let display = graph.create_node(&catalog, "display.int").unwrap();
    graph.link(ring[0], 2, display, 0).unwrap();

    let mut overlay = Overlay::new();
    let err = graph
        .evaluate(&[write, display], &mut overlay, &CapabilityStore::new())
        .unwrap_err();

    match err {
        GraphError::Evaluation(err) => {
            assert_eq!(err.kind, ErrorKind::Cycle);
            assert!(ring.contains(&err.node));
            assert_eq!(err.message(), "recursion detected");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(overlay.data(), &[1, 2, 3]);
    for &node in &ring {
        assert!(graph.in_progress(node).unwrap().is_empty());
    }
}

/// Test that a chain deeper than the configured limit fails cleanly.
#[test]
fn depth_limit_from_config() {
    let catalog = NodeCatalog::builtin();
    let config = EngineConfig::from_json(r#"{ "max_depth": 8 }"#).unwrap();
    let mut graph = Graph::with_config(config);

    let mut prev = bytes(&mut graph, &catalog, &[0x0F]);
    for _ in 0..16 {
        let not = graph.create_node(&catalog, "bitwise.not").unwrap();
        let out = if graph.type_id(prev) == Some("bitwise.not") { 1 } else { 0 };
        graph.link(prev, out, not, 0).unwrap();
        prev = not;
    }

    let err = graph
        .evaluate(&[prev], &mut Overlay::new(), &CapabilityStore::new())
        .unwrap_err();
    assert!(matches!(
        err,
        GraphError::Evaluation(ref e) if e.kind == ErrorKind::DepthExceeded { limit: 8 }
    ));
}

/// Test that a long acyclic chain evaluates under the default config,
/// every node running once.
#[test]
fn long_chain_with_default_config() {
    let catalog = NodeCatalog::builtin();
    let mut graph = Graph::new();

    let one = int(&mut graph, &catalog, 1);
    let mut prev = one;
    for _ in 0..5_000 {
        let add = graph.create_node(&catalog, "arithmetic.add").unwrap();
        let out = if prev == one { 0 } else { 2 };
        graph.link(prev, out, add, 0).unwrap();
        graph.link(one, 0, add, 1).unwrap();
        prev = add;
    }
    let display = graph.create_node(&catalog, "display.int").unwrap();
    graph.link(prev, 2, display, 0).unwrap();

    let summary = graph
        .evaluate(&[display], &mut Overlay::new(), &CapabilityStore::new())
        .unwrap();
    assert_eq!(summary.processed, graph.node_count());
    assert_eq!(
        graph.node_as::<DisplayInteger>(display).unwrap().value(),
        Some(5_001)
    );
}

/// Test that the first failing node aborts the pass and later terminals
/// are not attempted.
#[test]
fn first_error_stops_the_pass() {
    let catalog = NodeCatalog::builtin();
    let mut graph = Graph::new();

    let ten = int(&mut graph, &catalog, 10);
    let zero = int(&mut graph, &catalog, 0);
    let div = graph.create_node(&catalog, "arithmetic.div").unwrap();
    graph.link(ten, 0, div, 0).unwrap();
    graph.link(zero, 0, div, 1).unwrap();
    let failing = graph.create_node(&catalog, "display.int").unwrap();
    graph.link(div, 2, failing, 0).unwrap();

    let later = graph.create_node(&catalog, "display.int").unwrap();
    graph.link(ten, 0, later, 0).unwrap();

    let err = graph
        .evaluate(&[failing, later], &mut Overlay::new(), &CapabilityStore::new())
        .unwrap_err();
    let GraphError::Evaluation(err) = err else {
        panic!("expected an evaluation error");
    };
    assert_eq!(err.node, div);
    assert_eq!(err.to_string(), format!("evaluation stopped at node {}: Division by zero", div));
    assert_eq!(graph.visit_state(later), Some(VisitState::Pending));
    assert_eq!(graph.node_as::<DisplayInteger>(later).unwrap().value(), None);
}

/// Test that parameters edited between passes take effect on the next
/// pass.
#[test]
fn parameter_edit_between_passes() {
    let catalog = NodeCatalog::builtin();
    let mut graph = Graph::new();
    let text = graph.create_node(&catalog, "constants.string").unwrap();
    let display = graph.create_node(&catalog, "display.buffer").unwrap();
    graph.link(text, 0, display, 0).unwrap();

    graph.node_mut(text).unwrap().load(json!({ "data": "AB" })).unwrap();
    graph
        .evaluate_terminals(&mut Overlay::new(), &CapabilityStore::new())
        .unwrap();
    assert_eq!(graph.node_as::<DisplayBuffer>(display).unwrap().render(), "41 42");

    graph.node_mut(text).unwrap().load(json!({ "data": "C" })).unwrap();
    graph
        .evaluate_terminals(&mut Overlay::new(), &CapabilityStore::new())
        .unwrap();
    assert_eq!(graph.node_as::<DisplayBuffer>(display).unwrap().render(), "43");
}

/// Test that filters and statistics reach display nodes through the
/// capability store.
#[test]
fn capability_backed_nodes() {
    let catalog = NodeCatalog::builtin();
    let capabilities = CapabilityStore::new();
    let mut graph = Graph::new();

    let http = graph.create_node(&catalog, "filter.port").unwrap();
    let dns = graph.create_node(&catalog, "filter.port").unwrap();
    graph.node_mut(dns).unwrap().load(json!({ "data": 53 })).unwrap();
    let or = graph.create_node(&catalog, "filter.or").unwrap();
    graph.link(http, 0, or, 0).unwrap();
    graph.link(dns, 0, or, 1).unwrap();
    let show_filter = graph.create_node(&catalog, "display.filter").unwrap();
    graph.link(or, 2, show_filter, 0).unwrap();

    let show_stats = graph.create_node(&catalog, "display.stats").unwrap();

    for _ in 0..3 {
        graph
            .evaluate_terminals(&mut Overlay::new(), &capabilities)
            .unwrap();
    }

    assert_eq!(
        graph.node_as::<DisplayFilter>(show_filter).unwrap().expression(),
        Some("(port 80) or (port 53)")
    );
    assert_eq!(graph.node_as::<DisplayStats>(show_stats).unwrap().render(), "???");
    // One object per filter node, reused across passes.
    assert_eq!(capabilities.len(), 3);
    assert!(matches!(graph.value(or, 2), Some(Value::Pointer(_))));
}

/// Test that a saved graph reloads with the same ids, links and results,
/// and that new nodes get ids above the loaded ones.
#[test]
fn save_and_reload() {
    let catalog = NodeCatalog::builtin();
    let (graph, display) = patch_graph(&catalog);

    let json = graph.store().unwrap().to_json().unwrap();
    let saved = PersistedGraph::from_json(&json).unwrap();
    let mut reloaded = Graph::load(&saved, &catalog).unwrap();

    assert_eq!(reloaded.node_ids().collect::<Vec<_>>(), graph.node_ids().collect::<Vec<_>>());
    assert_eq!(reloaded.links(), graph.links());

    let mut overlay = Overlay::with_base_address(0x100);
    reloaded
        .evaluate_terminals(&mut overlay, &CapabilityStore::new())
        .unwrap();
    assert_eq!(overlay.data(), &[0xDE, 0xAD, 0x00, 0x00, 0xBE, 0xEF]);
    assert_eq!(
        reloaded.node_as::<DisplayInteger>(display).unwrap().value(),
        Some(0x104)
    );

    let max = saved.max_id().unwrap();
    let fresh = reloaded.create_node(&catalog, "constants.int").unwrap();
    assert!(fresh > max);
}

/// Test that the binary document decodes to the same graph.
#[test]
fn msgpack_round_trip() {
    let catalog = NodeCatalog::builtin();
    let (graph, _) = patch_graph(&catalog);

    let stored = graph.store().unwrap();
    let decoded = PersistedGraph::from_msgpack(&stored.to_msgpack().unwrap()).unwrap();
    assert_eq!(decoded, stored);
}
