//! Process Context
//!
//! The process context is the only window a node has onto the graph while
//! its `process` runs. Reading an input returns the value its producer
//! computed in this pass.
//!
//! # Resolution order
//!
//! [`Pass::run`] walks producers with an explicit work stack rather than
//! native recursion: a node's connected producers are resolved, depth
//! first, before its own `process` runs. Chain length is therefore bounded
//! by `EngineConfig::max_depth` only, never by the thread's stack.
//!
//! # Cycle detection
//!
//! Two marks guard the walk:
//!
//! - Each node slot carries a white/gray/black [`VisitState`]. Reaching a
//!   gray (`Processing`) node again means the pull chain looped back onto
//!   it, which fails with [`ErrorKind::Cycle`] for that node.
//! - Each node also records the input indices it is currently resolving.
//!   An index is released when its producer returns, whether it succeeded
//!   or not, so the guard only covers the in-flight chain.
//!
//! Black (`Done`) nodes are never processed again within a pass; that is
//! the memoization. `Failed` nodes are not retried either: every later read
//! gets the error they recorded.

use indexmap::IndexMap;
use tracing::trace;

use super::attribute::{Attribute, AttributeKind, Direction, Signature, Value};
use super::node::{NodeId, NodeSlot, VisitState};
use super::overlay::Overlay;
use crate::capability::{CapabilityStore, Handle};
use crate::error::{ErrorKind, NodeError};

/// Mutable state of one evaluation pass.
pub(crate) struct Pass<'p> {
    nodes: &'p mut IndexMap<NodeId, NodeSlot>,
    overlay: &'p mut Overlay,
    capabilities: &'p CapabilityStore,
    max_depth: usize,
    processed: usize,
}

impl<'p> Pass<'p> {
    pub(crate) fn new(
        nodes: &'p mut IndexMap<NodeId, NodeSlot>,
        overlay: &'p mut Overlay,
        capabilities: &'p CapabilityStore,
        max_depth: usize,
    ) -> Self {
        Self {
            nodes,
            overlay,
            capabilities,
            max_depth,
            processed: 0,
        }
    }

    /// Number of `process` calls that completed successfully.
    pub(crate) fn processed(&self) -> usize {
        self.processed
    }

    /// Process a node and everything upstream of it, unless already visited
    /// in this pass.
    ///
    /// A producer that cannot be processed is marked and left for its
    /// consumer to read, so the error surfaces where that consumer pulls it.
    pub(crate) fn run(&mut self, id: NodeId) -> Result<(), NodeError> {
        let Some(slot) = self.nodes.get_mut(&id) else {
            return Ok(());
        };

        match slot.state {
            VisitState::Done => return Ok(()),
            VisitState::Failed => return Err(slot.failure()),
            VisitState::Processing => return Err(NodeError::new(id, ErrorKind::Cycle)),
            VisitState::Pending => {}
        }
        slot.state = VisitState::Processing;

        // (node, first input index not yet looked at)
        let mut stack: Vec<(NodeId, usize)> = vec![(id, 0)];

        while let Some(frame) = stack.last_mut() {
            let (node, from) = *frame;
            let Some((index, producer)) = self.next_producer(node, from) else {
                stack.pop();
                let result = self.process(node);
                if node == id {
                    return result;
                }
                continue;
            };
            frame.1 = index + 1;

            let depth = stack.len();
            let Some(slot) = self.nodes.get_mut(&producer) else {
                continue;
            };
            if slot.state != VisitState::Pending {
                continue;
            }
            if depth >= self.max_depth {
                slot.fail(NodeError::new(
                    producer,
                    ErrorKind::DepthExceeded {
                        limit: self.max_depth,
                    },
                ));
                continue;
            }
            slot.state = VisitState::Processing;
            stack.push((producer, 0));
        }

        Ok(())
    }

    /// The first connected input of `node` at or after `from`.
    fn next_producer(&self, node: NodeId, from: usize) -> Option<(usize, NodeId)> {
        let slot = self.nodes.get(&node)?;
        slot.attributes
            .iter()
            .enumerate()
            .skip(from)
            .filter(|(_, attribute)| attribute.direction() == Direction::Input)
            .find_map(|(index, attribute)| attribute.producer().map(|p| (index, p.node)))
    }

    /// Run one node's `process` and record the outcome on its slot.
    fn process(&mut self, id: NodeId) -> Result<(), NodeError> {
        let Some(slot) = self.nodes.get_mut(&id) else {
            return Ok(());
        };
        let Some(mut node) = slot.node.take() else {
            return Err(NodeError::new(id, ErrorKind::Cycle));
        };
        trace!(node = %id, type_id = %slot.type_id, "processing node");

        let result = node.process(&mut ProcessContext { pass: self, node: id });

        if let Some(slot) = self.nodes.get_mut(&id) {
            slot.node = Some(node);
            match &result {
                Ok(()) => {
                    slot.state = VisitState::Done;
                    self.processed += 1;
                }
                Err(err) => slot.fail(err.clone()),
            }
        }
        result
    }
}

/// Accessors available to a node while it is being processed.
pub struct ProcessContext<'a, 'p> {
    pass: &'a mut Pass<'p>,
    node: NodeId,
}

impl<'a, 'p> ProcessContext<'a, 'p> {
    /// The id of the node being processed.
    pub fn node_id(&self) -> NodeId {
        self.node
    }

    /// Build a compute error attributed to this node.
    ///
    /// ```rust,ignore
    /// if divisor == 0 {
    ///     return Err(ctx.error("Division by zero"));
    /// }
    /// ```
    pub fn error(&self, message: impl Into<String>) -> NodeError {
        NodeError::new(self.node, ErrorKind::Compute(message.into()))
    }

    /// The host's capability store, for resolving pointer handles.
    pub fn capabilities(&self) -> &'p CapabilityStore {
        self.pass.capabilities
    }

    pub fn integer_on_input(&mut self, index: usize) -> Result<u64, NodeError> {
        self.pull(index, AttributeKind::Integer, Value::as_integer)
    }

    pub fn float_on_input(&mut self, index: usize) -> Result<f32, NodeError> {
        self.pull(index, AttributeKind::Float, Value::as_float)
    }

    /// Returns a copy of the producer's buffer.
    pub fn buffer_on_input(&mut self, index: usize) -> Result<Vec<u8>, NodeError> {
        self.pull(index, AttributeKind::Buffer, |value| value.as_buffer().map(<[u8]>::to_vec))
    }

    pub fn string_on_input(&mut self, index: usize) -> Result<String, NodeError> {
        self.pull(index, AttributeKind::String, |value| value.as_str().map(str::to_owned))
    }

    pub fn pointer_on_input(&mut self, index: usize) -> Result<Handle, NodeError> {
        self.pull(index, AttributeKind::Pointer, Value::as_pointer)
    }

    pub fn set_integer_on_output(&mut self, index: usize, value: u64) -> Result<(), NodeError> {
        self.push(index, Value::Integer(value))
    }

    pub fn set_float_on_output(&mut self, index: usize, value: f32) -> Result<(), NodeError> {
        self.push(index, Value::Float(value))
    }

    pub fn set_buffer_on_output(&mut self, index: usize, value: Vec<u8>) -> Result<(), NodeError> {
        self.push(index, Value::Buffer(value))
    }

    pub fn set_string_on_output(&mut self, index: usize, value: String) -> Result<(), NodeError> {
        self.push(index, Value::String(value))
    }

    pub fn set_pointer_on_output(&mut self, index: usize, value: Handle) -> Result<(), NodeError> {
        self.push(index, Value::Pointer(value))
    }

    /// Write a copy of `data` into the pass overlay at `address`.
    pub fn set_overlay_data(&mut self, address: u64, data: &[u8]) -> Result<(), NodeError> {
        trace!(node = %self.node, address, len = data.len(), "overlay write");
        self.pass
            .overlay
            .write(address, data)
            .map_err(|err| NodeError::new(self.node, ErrorKind::Compute(err.to_string())))
    }

    /// Look up one of this node's attributes and check its signature.
    fn attribute(&mut self, index: usize, expected: Signature) -> Result<&mut Attribute, NodeError> {
        let node = self.node;
        let attributes = match self.pass.nodes.get_mut(&node) {
            Some(slot) => &mut slot.attributes[..],
            None => &mut [],
        };
        let len = attributes.len();

        let attribute = attributes
            .get_mut(index)
            .ok_or(NodeError::new(node, ErrorKind::IndexOutOfBounds { index, len }))?;

        let found = attribute.signature();
        if found != expected {
            return Err(NodeError::new(
                node,
                ErrorKind::TypeMismatch {
                    index,
                    expected,
                    found,
                },
            ));
        }

        Ok(attribute)
    }

    /// Resolve an input to its producer's value, processing the producer if
    /// needed, and extract it as `kind`.
    fn pull<T>(
        &mut self,
        index: usize,
        kind: AttributeKind,
        extract: impl FnOnce(&Value) -> Option<T>,
    ) -> Result<T, NodeError> {
        let node = self.node;
        let producer = self
            .attribute(index, Signature::new(Direction::Input, kind))?
            .producer()
            .ok_or(NodeError::new(node, ErrorKind::Unconnected { index }))?;

        let entered = self
            .pass
            .nodes
            .get_mut(&node)
            .is_some_and(|slot| slot.begin_input(index));
        if !entered {
            return Err(NodeError::new(node, ErrorKind::Cycle));
        }

        let resolved = self.pass.run(producer.node);

        if let Some(slot) = self.pass.nodes.get_mut(&node) {
            slot.end_input(index);
        }
        resolved?;

        let value = self
            .pass
            .nodes
            .get(&producer.node)
            .and_then(|slot| slot.attributes.get(producer.attribute))
            .and_then(Attribute::value)
            .ok_or(NodeError::new(node, ErrorKind::Unconnected { index }))?;

        let found = value.kind();
        extract(value).ok_or_else(|| self.value_mismatch(index, kind, found))
    }

    fn push(&mut self, index: usize, value: Value) -> Result<(), NodeError> {
        let node = self.node;
        let attribute = self.attribute(index, Signature::new(Direction::Output, value.kind()))?;

        if !attribute.set_value(value) {
            return Err(NodeError::new(
                node,
                ErrorKind::Compute(format!("output {} was already set in this pass", index)),
            ));
        }
        Ok(())
    }

    fn value_mismatch(&self, index: usize, expected: AttributeKind, found: AttributeKind) -> NodeError {
        NodeError::new(
            self.node,
            ErrorKind::TypeMismatch {
                index,
                expected: Signature::new(Direction::Output, expected),
                found: Signature::new(Direction::Output, found),
            },
        )
    }
}
