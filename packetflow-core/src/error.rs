//! Error types for packetflow-core.

use thiserror::Error;

use crate::graph::{NodeId, Signature};

/// What went wrong while a node was being processed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ErrorKind {
    /// Attribute index outside the node's attribute list.
    #[error("attribute index {index} out of bounds ({len} attributes)")]
    IndexOutOfBounds {
        /// Requested index.
        index: usize,
        /// Number of attributes on the node.
        len: usize,
    },

    /// Accessor direction or kind disagrees with the attribute or its value.
    #[error("type mismatch on attribute {index}: expected {expected}, found {found}")]
    TypeMismatch {
        /// Attribute index on the accessing node.
        index: usize,
        /// What the accessor asked for.
        expected: Signature,
        /// What the attribute or value actually is.
        found: Signature,
    },

    /// The input has no producer, or the producer left its output unset.
    #[error("no value available on input {index}")]
    Unconnected {
        /// Input index.
        index: usize,
    },

    /// A node was re-entered while one of its inputs was being resolved.
    #[error("recursion detected")]
    Cycle,

    /// Node-specific precondition failure raised inside `process`.
    #[error("{0}")]
    Compute(String),

    /// The producer chain is deeper than the configured limit.
    #[error("maximum evaluation depth of {limit} exceeded")]
    DepthExceeded {
        /// Configured limit.
        limit: usize,
    },
}

/// A failure attributed to one node.
///
/// This is the single error shape that reaches the pass boundary. Accessors
/// propagate it unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("evaluation stopped at node {node}: {kind}")]
pub struct NodeError {
    /// The node that raised the error.
    pub node: NodeId,
    /// The failure.
    pub kind: ErrorKind,
}

impl NodeError {
    pub fn new(node: NodeId, kind: ErrorKind) -> Self {
        Self { node, kind }
    }

    /// The human-readable message without the node prefix.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }

    /// True for the "no value available" condition.
    pub fn is_unconnected(&self) -> bool {
        matches!(self.kind, ErrorKind::Unconnected { .. })
    }
}

/// Downgrade a missing value on one of `reader`'s own inputs to `None`,
/// keeping every other error.
///
/// For nodes that render an absent signal rather than failing. An
/// `Unconnected` raised further upstream names another node and still
/// propagates.
pub fn optional<T>(reader: NodeId, result: Result<T, NodeError>) -> Result<Option<T>, NodeError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.node == reader && err.is_unconnected() => Ok(None),
        Err(err) => Err(err),
    }
}

/// Errors from editing the graph structure or starting a pass.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    /// Node with the given ID was not found.
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// Attribute on a node was not found.
    #[error("attribute not found: node {node}, attribute {attribute}")]
    AttributeNotFound {
        /// Node ID.
        node: NodeId,
        /// Attribute index.
        attribute: usize,
    },

    /// A link must start at an output attribute.
    #[error("node {node} attribute {attribute} is not an output")]
    NotAnOutput {
        /// Node ID.
        node: NodeId,
        /// Attribute index.
        attribute: usize,
    },

    /// A link must end at an input attribute.
    #[error("node {node} attribute {attribute} is not an input")]
    NotAnInput {
        /// Node ID.
        node: NodeId,
        /// Attribute index.
        attribute: usize,
    },

    /// The input already has a producer.
    #[error("input already connected: node {node}, attribute {attribute}")]
    InputOccupied {
        /// Node ID.
        node: NodeId,
        /// Attribute index.
        attribute: usize,
    },

    /// No catalog entry for this type id.
    #[error("unknown node type: {0}")]
    UnknownNodeType(String),

    /// The evaluation pass aborted.
    #[error(transparent)]
    Evaluation(#[from] NodeError),
}

/// Errors from saving or loading a graph.
#[derive(Debug, Error)]
pub enum PersistError {
    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// MessagePack encoding error.
    #[error("msgpack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MessagePack decoding error.
    #[error("msgpack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    /// Graph error during reconstruction.
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    /// Two persisted nodes, or a persisted and a live node, share an id.
    #[error("duplicate node id: {0}")]
    DuplicateNode(NodeId),

    /// A node rejected its stored parameters.
    #[error("invalid parameters for node {node}: {source}")]
    Params {
        /// Node ID.
        node: NodeId,
        /// Underlying decode error.
        source: serde_json::Error,
    },
}
