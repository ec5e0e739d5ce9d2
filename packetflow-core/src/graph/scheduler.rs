//! Graph and Evaluation Pass
//!
//! The graph owns every node, keeps attribute connections consistent on both
//! ends, and drives evaluation passes.
//!
//! # Algorithm
//!
//! A pass is pull-based:
//!
//! 1. Reset pass state: clear every computed value, in-progress mark and
//!    visit color.
//! 2. Process each requested terminal in the caller's order. Producers
//!    upstream of a terminal are resolved first, depth first, so every node
//!    reachable from a terminal runs at most once. A node that fails keeps
//!    its error for the rest of the pass and is not run again.
//! 3. Stop at the first error a terminal reports. Nodes that already
//!    finished keep their outputs for inspection; later terminals are not
//!    attempted.
//!
//! Nothing is cached across passes. The only side effects are overlay
//! writes and whatever nodes publish to the capability store.

use indexmap::IndexMap;
use tracing::{debug, debug_span, warn};

use super::attribute::{Attribute, Direction, Endpoint, Value};
use super::context::Pass;
use super::node::{BoxedNode, IdAllocator, Node, NodeId, NodeSlot, VisitState};
use super::overlay::Overlay;
use crate::capability::CapabilityStore;
use crate::catalog::NodeCatalog;
use crate::config::EngineConfig;
use crate::error::GraphError;

/// An edge from an output attribute to an input attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Link {
    pub from: Endpoint,
    pub to: Endpoint,
}

/// Outcome of a successful pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PassSummary {
    /// Terminals evaluated.
    pub terminals: usize,
    /// Nodes whose `process` completed.
    pub processed: usize,
}

/// A node graph and its evaluation engine.
pub struct Graph {
    /// All nodes, in insertion order.
    nodes: IndexMap<NodeId, NodeSlot>,
    ids: IdAllocator,
    config: EngineConfig,
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("ids", &self.ids)
            .field("config", &self.config)
            .finish()
    }
}

impl Graph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            nodes: IndexMap::new(),
            ids: IdAllocator::new(),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The id allocator. Loading raises its watermark.
    pub fn ids(&self) -> &IdAllocator {
        &self.ids
    }

    pub(crate) fn ids_mut(&mut self) -> &mut IdAllocator {
        &mut self.ids
    }

    /// Add a node under a freshly allocated id.
    ///
    /// The node is recorded under its own [`type_name`](Node::type_name).
    pub fn add_node(&mut self, node: BoxedNode) -> NodeId {
        let type_id = node.type_name();
        self.add_typed(type_id, node)
    }

    /// Instantiate a catalog entry with default parameters and add it.
    ///
    /// The node is recorded under `type_id`, which is what gets saved.
    pub fn create_node(&mut self, catalog: &NodeCatalog, type_id: &str) -> Result<NodeId, GraphError> {
        let node = catalog.create(type_id)?;
        Ok(self.add_typed(type_id, node))
    }

    fn add_typed(&mut self, type_id: &str, node: BoxedNode) -> NodeId {
        let id = self.ids.allocate();
        debug!(node = %id, type_id, "adding node");
        self.nodes.insert(id, NodeSlot::new(id, type_id, node));
        id
    }

    /// Add a node under an externally supplied id.
    ///
    /// The allocator watermark is raised past `id` first. Returns false and
    /// drops the node if the id is taken.
    pub(crate) fn insert_with_id(&mut self, id: NodeId, type_id: &str, node: BoxedNode) -> bool {
        self.ids.observe(id);
        if self.nodes.contains_key(&id) {
            return false;
        }
        self.nodes.insert(id, NodeSlot::new(id, type_id, node));
        true
    }

    /// Remove a node and every edge touching it.
    pub fn remove_node(&mut self, id: NodeId) -> Option<BoxedNode> {
        let slot = self.nodes.shift_remove(&id)?;
        debug!(node = %id, "removing node");

        let peers: Vec<NodeId> = slot
            .attributes
            .iter()
            .flat_map(|attr| attr.connections().iter().map(|peer| peer.node))
            .collect();
        for peer in peers {
            if let Some(peer_slot) = self.nodes.get_mut(&peer) {
                for attribute in &mut peer_slot.attributes {
                    attribute.disconnect_node(id);
                }
            }
        }

        slot.node
    }

    /// Connect an output attribute to an input attribute.
    ///
    /// Attribute kinds are not compared here; a mismatch surfaces when the
    /// consumer reads the value.
    pub fn link(
        &mut self,
        from_node: NodeId,
        from_attr: usize,
        to_node: NodeId,
        to_attr: usize,
    ) -> Result<(), GraphError> {
        let from = self.attribute_checked(from_node, from_attr)?;
        if from.direction() != Direction::Output {
            return Err(GraphError::NotAnOutput {
                node: from_node,
                attribute: from_attr,
            });
        }

        let to = self.attribute_checked(to_node, to_attr)?;
        if to.direction() != Direction::Input {
            return Err(GraphError::NotAnInput {
                node: to_node,
                attribute: to_attr,
            });
        }
        if to.is_connected() {
            return Err(GraphError::InputOccupied {
                node: to_node,
                attribute: to_attr,
            });
        }

        let from = Endpoint::new(from_node, from_attr);
        let to = Endpoint::new(to_node, to_attr);
        self.attribute_mut(from).connect(to);
        self.attribute_mut(to).connect(from);

        debug!(from = %from_node, from_attr, to = %to_node, to_attr, "linked");
        Ok(())
    }

    /// Remove the edge feeding an input. Returns the former producer.
    pub fn unlink(&mut self, to_node: NodeId, to_attr: usize) -> Option<Endpoint> {
        let to = Endpoint::new(to_node, to_attr);
        let producer = self.attribute(to_node, to_attr)?.producer()?;

        self.attribute_mut(to).disconnect(producer);
        self.attribute_mut(producer).disconnect(to);

        debug!(from = %producer.node, to = %to_node, to_attr, "unlinked");
        Some(producer)
    }

    /// Every edge, ordered by consumer node then input index.
    pub fn links(&self) -> Vec<Link> {
        self.nodes
            .values()
            .flat_map(|slot| {
                slot.attributes.iter().enumerate().filter_map(move |(index, attr)| {
                    attr.producer().map(|from| Link {
                        from,
                        to: Endpoint::new(slot.id, index),
                    })
                })
            })
            .collect()
    }

    /// Run one pass ending at `terminals`, in order.
    ///
    /// Fails with [`GraphError::NodeNotFound`] before touching any state if
    /// a terminal does not exist, and with [`GraphError::Evaluation`] if a
    /// node fails during the pass.
    pub fn evaluate(
        &mut self,
        terminals: &[NodeId],
        overlay: &mut Overlay,
        capabilities: &CapabilityStore,
    ) -> Result<PassSummary, GraphError> {
        if let Some(missing) = terminals.iter().find(|id| !self.nodes.contains_key(*id)) {
            return Err(GraphError::NodeNotFound(*missing));
        }

        let span = debug_span!("pass", terminals = terminals.len(), nodes = self.nodes.len());
        let _enter = span.enter();

        self.reset_pass();

        let mut pass = Pass::new(&mut self.nodes, overlay, capabilities, self.config.max_depth);
        for &terminal in terminals {
            if let Err(err) = pass.run(terminal) {
                warn!(node = %err.node, error = %err.kind, "pass aborted");
                return Err(err.into());
            }
        }

        let summary = PassSummary {
            terminals: terminals.len(),
            processed: pass.processed(),
        };
        debug!(processed = summary.processed, "pass complete");
        Ok(summary)
    }

    /// Run one pass ending at every terminal node, in insertion order.
    pub fn evaluate_terminals(
        &mut self,
        overlay: &mut Overlay,
        capabilities: &CapabilityStore,
    ) -> Result<PassSummary, GraphError> {
        let terminals = self.terminals();
        self.evaluate(&terminals, overlay, capabilities)
    }

    /// Ids of the display and write style nodes, in insertion order.
    pub fn terminals(&self) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|slot| slot.node.as_ref().is_some_and(|node| node.is_terminal()))
            .map(|slot| slot.id)
            .collect()
    }

    /// Clear computed values and pass marks on every node.
    pub fn reset_pass(&mut self) {
        for slot in self.nodes.values_mut() {
            slot.reset_pass();
        }
    }

    /// Get the total number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Node ids in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// The catalog type id a node was created from.
    pub fn type_id(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(&id).map(|slot| slot.type_id.as_str())
    }

    /// Borrow a node's behaviour object.
    pub fn node(&self, id: NodeId) -> Option<&dyn Node> {
        self.nodes.get(&id)?.node.as_deref()
    }

    /// Borrow a node as its concrete type.
    pub fn node_as<T: Node>(&self, id: NodeId) -> Option<&T> {
        self.node(id)?.as_any().downcast_ref::<T>()
    }

    /// Mutably borrow a node, e.g. to [`load`](Node::load) new parameters
    /// between passes.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut BoxedNode> {
        self.nodes.get_mut(&id)?.node.as_mut()
    }

    pub fn attribute(&self, id: NodeId, index: usize) -> Option<&Attribute> {
        self.nodes.get(&id)?.attributes.get(index)
    }

    pub fn attributes(&self, id: NodeId) -> Option<&[Attribute]> {
        self.nodes.get(&id).map(|slot| slot.attributes.as_slice())
    }

    /// The value computed for an attribute in the last pass.
    pub fn value(&self, id: NodeId, index: usize) -> Option<&Value> {
        self.attribute(id, index)?.value()
    }

    /// Visit color of a node in the current pass.
    pub fn visit_state(&self, id: NodeId) -> Option<VisitState> {
        self.nodes.get(&id).map(|slot| slot.state)
    }

    /// Input indices of a node that are being resolved.
    ///
    /// Empty outside of a pass.
    pub fn in_progress(&self, id: NodeId) -> Option<&[usize]> {
        self.nodes.get(&id).map(|slot| slot.in_progress.as_slice())
    }

    fn attribute_checked(&self, node: NodeId, index: usize) -> Result<&Attribute, GraphError> {
        self.nodes
            .get(&node)
            .ok_or(GraphError::NodeNotFound(node))?
            .attributes
            .get(index)
            .ok_or(GraphError::AttributeNotFound {
                node,
                attribute: index,
            })
    }

    /// Callers validate the endpoint first.
    fn attribute_mut(&mut self, endpoint: Endpoint) -> &mut Attribute {
        &mut self.nodes[&endpoint.node].attributes[endpoint.attribute]
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::error::{ErrorKind, NodeError};
    use crate::graph::{AttributeKind, Port, ProcessContext};

    /// Emits a constant and counts how often it ran.
    struct Source {
        value: u64,
        runs: Arc<AtomicUsize>,
    }

    impl Node for Source {
        fn type_name(&self) -> &'static str {
            "test.source"
        }

        fn ports(&self) -> &'static [Port] {
            const PORTS: &[Port] = &[Port::output(AttributeKind::Integer, "out")];
            PORTS
        }

        fn process(&mut self, ctx: &mut ProcessContext<'_, '_>) -> Result<(), NodeError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            ctx.set_integer_on_output(0, self.value)
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    /// Passes its input through, incrementing it.
    #[derive(Default)]
    struct Increment {
        runs: Arc<AtomicUsize>,
    }

    impl Node for Increment {
        fn type_name(&self) -> &'static str {
            "test.increment"
        }

        fn ports(&self) -> &'static [Port] {
            const PORTS: &[Port] = &[
                Port::input(AttributeKind::Integer, "in"),
                Port::output(AttributeKind::Integer, "out"),
            ];
            PORTS
        }

        fn process(&mut self, ctx: &mut ProcessContext<'_, '_>) -> Result<(), NodeError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            let input = ctx.integer_on_input(0)?;
            ctx.set_integer_on_output(1, input + 1)
        }

        fn is_terminal(&self) -> bool {
            true
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    /// Sets its output, then fails.
    struct Broken {
        runs: Arc<AtomicUsize>,
    }

    impl Node for Broken {
        fn type_name(&self) -> &'static str {
            "test.broken"
        }

        fn ports(&self) -> &'static [Port] {
            const PORTS: &[Port] = &[Port::output(AttributeKind::Integer, "out")];
            PORTS
        }

        fn process(&mut self, ctx: &mut ProcessContext<'_, '_>) -> Result<(), NodeError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            ctx.set_integer_on_output(0, 7)?;
            Err(ctx.error("broken"))
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    /// Keeps the error its input produced instead of failing.
    #[derive(Default)]
    struct Tolerant {
        seen: Option<NodeError>,
    }

    impl Node for Tolerant {
        fn type_name(&self) -> &'static str {
            "test.tolerant"
        }

        fn ports(&self) -> &'static [Port] {
            const PORTS: &[Port] = &[Port::input(AttributeKind::Integer, "in")];
            PORTS
        }

        fn process(&mut self, ctx: &mut ProcessContext<'_, '_>) -> Result<(), NodeError> {
            self.seen = ctx.integer_on_input(0).err();
            Ok(())
        }

        fn is_terminal(&self) -> bool {
            true
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn source(graph: &mut Graph, value: u64) -> (NodeId, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        let id = graph.add_node(Box::new(Source {
            value,
            runs: runs.clone(),
        }));
        (id, runs)
    }

    fn run(graph: &mut Graph, terminals: &[NodeId]) -> Result<PassSummary, GraphError> {
        graph.evaluate(terminals, &mut Overlay::new(), &CapabilityStore::new())
    }

    #[test]
    fn add_and_remove_nodes() {
        let mut graph = Graph::new();
        let (a, _) = source(&mut graph, 1);
        let b = graph.add_node(Box::new(Increment::default()));
        graph.link(a, 0, b, 0).unwrap();

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.links().len(), 1);

        assert!(graph.remove_node(a).is_some());
        assert_eq!(graph.node_count(), 1);
        assert!(!graph.attribute(b, 0).unwrap().is_connected());
        assert!(graph.links().is_empty());
    }

    #[test]
    fn link_keeps_both_ends_consistent() {
        let mut graph = Graph::new();
        let (a, _) = source(&mut graph, 1);
        let b = graph.add_node(Box::new(Increment::default()));
        let c = graph.add_node(Box::new(Increment::default()));

        graph.link(a, 0, b, 0).unwrap();
        graph.link(a, 0, c, 0).unwrap();

        assert_eq!(graph.attribute(a, 0).unwrap().connections().len(), 2);
        assert_eq!(graph.attribute(b, 0).unwrap().producer(), Some(Endpoint::new(a, 0)));

        assert_eq!(graph.unlink(b, 0), Some(Endpoint::new(a, 0)));
        assert_eq!(
            graph.attribute(a, 0).unwrap().connections(),
            &[Endpoint::new(c, 0)]
        );
        assert_eq!(graph.unlink(b, 0), None);
    }

    #[test]
    fn link_validation() {
        let mut graph = Graph::new();
        let (a, _) = source(&mut graph, 1);
        let b = graph.add_node(Box::new(Increment::default()));

        assert_eq!(
            graph.link(b, 0, a, 0),
            Err(GraphError::NotAnOutput { node: b, attribute: 0 })
        );
        assert_eq!(
            graph.link(a, 0, b, 1),
            Err(GraphError::NotAnInput { node: b, attribute: 1 })
        );
        assert_eq!(
            graph.link(a, 3, b, 0),
            Err(GraphError::AttributeNotFound { node: a, attribute: 3 })
        );
        assert_eq!(
            graph.link(a, 0, NodeId::from(99), 0),
            Err(GraphError::NodeNotFound(NodeId::from(99)))
        );

        graph.link(a, 0, b, 0).unwrap();
        assert_eq!(
            graph.link(a, 0, b, 0),
            Err(GraphError::InputOccupied { node: b, attribute: 0 })
        );
    }

    #[test]
    fn chain_evaluates_once_per_pass() {
        let mut graph = Graph::new();
        let (a, source_runs) = source(&mut graph, 41);
        let b = graph.add_node(Box::new(Increment::default()));
        graph.link(a, 0, b, 0).unwrap();

        let summary = run(&mut graph, &[b]).unwrap();
        assert_eq!(summary, PassSummary { terminals: 1, processed: 2 });
        assert_eq!(graph.value(b, 1), Some(&Value::Integer(42)));
        assert_eq!(source_runs.load(Ordering::SeqCst), 1);

        // Listing a terminal twice, or one already pulled as a producer,
        // does not process it again.
        run(&mut graph, &[b, a, b]).unwrap();
        assert_eq!(source_runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn fan_out_producer_runs_once() {
        let mut graph = Graph::new();
        let (a, source_runs) = source(&mut graph, 1);
        let consumers: Vec<NodeId> = (0..3)
            .map(|_| graph.add_node(Box::new(Increment::default())))
            .collect();
        for &consumer in &consumers {
            graph.link(a, 0, consumer, 0).unwrap();
        }

        let summary = run(&mut graph, &consumers).unwrap();
        assert_eq!(summary.processed, 4);
        assert_eq!(source_runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unconnected_input_aborts_pass() {
        let mut graph = Graph::new();
        let b = graph.add_node(Box::new(Increment::default()));

        let err = run(&mut graph, &[b]).unwrap_err();
        assert_eq!(
            err,
            GraphError::Evaluation(NodeError::new(b, ErrorKind::Unconnected { index: 0 }))
        );
        assert_eq!(graph.visit_state(b), Some(VisitState::Failed));
        assert!(graph.in_progress(b).unwrap().is_empty());
    }

    #[test]
    fn failed_producer_is_not_rerun() {
        let mut graph = Graph::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let broken = graph.add_node(Box::new(Broken { runs: runs.clone() }));
        let readers: Vec<NodeId> = (0..2)
            .map(|_| graph.add_node(Box::new(Tolerant::default())))
            .collect();
        for &reader in &readers {
            graph.link(broken, 0, reader, 0).unwrap();
        }

        let summary = run(&mut graph, &readers).unwrap();
        assert_eq!(summary.processed, 2);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(graph.visit_state(broken), Some(VisitState::Failed));

        let expected = NodeError::new(broken, ErrorKind::Compute("broken".to_string()));
        for &reader in &readers {
            let seen = graph.node_as::<Tolerant>(reader).unwrap().seen.clone();
            assert_eq!(seen, Some(expected.clone()));
        }

        // The mark lasts one pass only.
        run(&mut graph, &readers).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn long_chain_within_default_config() {
        let mut graph = Graph::new();
        let (mut prev, _) = source(&mut graph, 0);
        let mut prev_out = 0;
        for _ in 0..20_000 {
            let next = graph.add_node(Box::new(Increment::default()));
            graph.link(prev, prev_out, next, 0).unwrap();
            prev = next;
            prev_out = 1;
        }

        let summary = run(&mut graph, &[prev]).unwrap();
        assert_eq!(summary.processed, 20_001);
        assert_eq!(graph.value(prev, 1), Some(&Value::Integer(20_000)));
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let mut graph = Graph::new();
        let b = graph.add_node(Box::new(Increment::default()));
        graph.link(b, 1, b, 0).unwrap();

        let err = run(&mut graph, &[b]).unwrap_err();
        assert_eq!(err, GraphError::Evaluation(NodeError::new(b, ErrorKind::Cycle)));
        assert!(graph.in_progress(b).unwrap().is_empty());
    }

    #[test]
    fn unknown_terminal_is_rejected_up_front() {
        let mut graph = Graph::new();
        let (a, _) = source(&mut graph, 1);
        run(&mut graph, &[a]).unwrap();

        let err = run(&mut graph, &[a, NodeId::from(77)]).unwrap_err();
        assert_eq!(err, GraphError::NodeNotFound(NodeId::from(77)));
        // The previous pass's values were not reset.
        assert_eq!(graph.value(a, 0), Some(&Value::Integer(1)));
    }

    #[test]
    fn depth_limit_aborts_deep_chains() {
        let mut graph = Graph::with_config(EngineConfig { max_depth: 4 });
        let (mut prev, _) = source(&mut graph, 0);
        let mut prev_out = 0;
        for _ in 0..8 {
            let next = graph.add_node(Box::new(Increment::default()));
            graph.link(prev, prev_out, next, 0).unwrap();
            prev = next;
            prev_out = 1;
        }

        let err = run(&mut graph, &[prev]).unwrap_err();
        match err {
            GraphError::Evaluation(NodeError {
                kind: ErrorKind::DepthExceeded { limit },
                ..
            }) => assert_eq!(limit, 4),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn terminals_follow_insertion_order() {
        let mut graph = Graph::new();
        let (a, _) = source(&mut graph, 1);
        let b = graph.add_node(Box::new(Increment::default()));
        let c = graph.add_node(Box::new(Increment::default()));
        graph.link(a, 0, b, 0).unwrap();
        graph.link(a, 0, c, 0).unwrap();

        assert_eq!(graph.terminals(), vec![b, c]);
        let summary = graph
            .evaluate_terminals(&mut Overlay::new(), &CapabilityStore::new())
            .unwrap();
        assert_eq!(summary.terminals, 2);
        assert_eq!(graph.value(c, 1), Some(&Value::Integer(2)));
    }
}
