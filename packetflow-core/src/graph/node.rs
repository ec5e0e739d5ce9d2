//! Graph Nodes
//!
//! This module defines the node contract implemented by every node type and
//! the per-node state the engine keeps alongside it.

use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use smallvec::SmallVec;

use super::attribute::{Attribute, Port};
use super::context::ProcessContext;
use crate::error::{ErrorKind, NodeError};

/// Unique identifier for a node in a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    /// Get the raw ID value.
    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl From<u32> for NodeId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out node ids for one graph.
///
/// The watermark only ever moves up: ids loaded from a persisted graph raise
/// it past themselves, so nodes created afterwards never collide with them.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh id.
    pub fn allocate(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }

    /// Record an externally supplied id, advancing the watermark past it.
    pub fn observe(&mut self, id: NodeId) {
        if id.0 >= self.next {
            self.next = id.0.saturating_add(1);
        }
    }

    /// The id the next call to [`allocate`](Self::allocate) returns.
    pub fn peek(&self) -> NodeId {
        NodeId(self.next)
    }
}

/// A unit of computation in the graph.
///
/// Implementations declare a fixed list of ports and compute their outputs
/// from their inputs in [`process`](Node::process), using only the accessors
/// on [`ProcessContext`]. Parameters that survive a save/load round trip go
/// through [`store`](Node::store) and [`load`](Node::load); computed values
/// are never persisted.
pub trait Node: Any + Send {
    /// Catalog identifier of this node type.
    fn type_name(&self) -> &'static str;

    /// The node's attributes, in index order.
    fn ports(&self) -> &'static [Port];

    /// Compute the outputs for the current pass.
    fn process(&mut self, ctx: &mut ProcessContext<'_, '_>) -> Result<(), NodeError>;

    /// Whether the node ends a chain (display and write nodes).
    ///
    /// [`Graph::evaluate_terminals`](crate::graph::Graph::evaluate_terminals)
    /// starts a pass from every terminal node.
    fn is_terminal(&self) -> bool {
        false
    }

    /// Serialize the node's parameters.
    fn store(&self) -> Result<JsonValue, serde_json::Error> {
        Ok(JsonValue::Null)
    }

    /// Restore parameters produced by [`store`](Node::store).
    fn load(&mut self, _params: JsonValue) -> Result<(), serde_json::Error> {
        Ok(())
    }

    /// Returns `self` as `&dyn Any` for downcasting.
    fn as_any(&self) -> &dyn Any;
}

/// A boxed node.
pub type BoxedNode = Box<dyn Node>;

/// Pass-local visit marking of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitState {
    /// Not processed yet in this pass.
    Pending,

    /// On the pass's work stack. Reaching the node again is a cycle.
    Processing,

    /// Processed successfully in this pass. Its outputs are final.
    Done,

    /// Failed in this pass. Later reads get the same error back.
    Failed,
}

/// A node together with the engine-side state the graph keeps for it.
pub(crate) struct NodeSlot {
    pub(crate) id: NodeId,
    /// Catalog key the node was created under.
    pub(crate) type_id: String,
    pub(crate) attributes: Vec<Attribute>,

    /// Input indices currently being resolved.
    pub(crate) in_progress: SmallVec<[usize; 4]>,

    pub(crate) state: VisitState,
    pub(crate) failure: Option<NodeError>,

    /// Moved out while the node's `process` runs.
    pub(crate) node: Option<BoxedNode>,
}

impl NodeSlot {
    pub(crate) fn new(id: NodeId, type_id: impl Into<String>, node: BoxedNode) -> Self {
        Self {
            id,
            type_id: type_id.into(),
            attributes: node.ports().iter().copied().map(Attribute::new).collect(),
            in_progress: SmallVec::new(),
            state: VisitState::Pending,
            failure: None,
            node: Some(node),
        }
    }

    /// Clear computed values and pass marks.
    pub(crate) fn reset_pass(&mut self) {
        for attribute in &mut self.attributes {
            attribute.clear_value();
        }
        self.in_progress.clear();
        self.state = VisitState::Pending;
        self.failure = None;
    }

    /// Mark the node failed for the rest of the pass.
    pub(crate) fn fail(&mut self, err: NodeError) {
        self.state = VisitState::Failed;
        self.failure = Some(err);
    }

    /// The error recorded by [`fail`](Self::fail).
    pub(crate) fn failure(&self) -> NodeError {
        self.failure
            .clone()
            .unwrap_or_else(|| NodeError::new(self.id, ErrorKind::Compute("failed earlier in this pass".to_string())))
    }

    /// Mark an input as being resolved. Returns false if it already was.
    pub(crate) fn begin_input(&mut self, index: usize) -> bool {
        if self.in_progress.contains(&index) {
            return false;
        }
        self.in_progress.push(index);
        true
    }

    pub(crate) fn end_input(&mut self, index: usize) {
        self.in_progress.retain(|i| *i != index);
    }
}
