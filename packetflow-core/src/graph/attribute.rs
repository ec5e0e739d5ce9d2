//! Graph Attributes
//!
//! Attributes are the typed ports of a node. Every node declares a fixed,
//! ordered list of them when it is constructed, and the engine addresses
//! them by index from then on.
//!
//! An input attribute has at most one producer. An output attribute may fan
//! out to any number of consumers. The engine keeps both ends of an edge in
//! sync: an edge exists iff both endpoints list each other.

use std::fmt;

use smallvec::SmallVec;

use super::node::NodeId;
use crate::capability::Handle;

/// Whether an attribute consumes or produces values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Pulls a value from a connected producer.
    Input,
    /// Holds a value computed by the owning node.
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => write!(f, "input"),
            Direction::Output => write!(f, "output"),
        }
    }
}

/// The closed set of payload kinds that can cross a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    Integer,
    Float,
    Buffer,
    String,
    /// Opaque handle to an externally owned capability object.
    Pointer,
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeKind::Integer => write!(f, "integer"),
            AttributeKind::Float => write!(f, "float"),
            AttributeKind::Buffer => write!(f, "buffer"),
            AttributeKind::String => write!(f, "string"),
            AttributeKind::Pointer => write!(f, "pointer"),
        }
    }
}

/// Direction and kind of a port, as compared by the accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature {
    pub direction: Direction,
    pub kind: AttributeKind,
}

impl Signature {
    pub const fn new(direction: Direction, kind: AttributeKind) -> Self {
        Self { direction, kind }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.direction)
    }
}

/// Static declaration of one attribute of a node type.
///
/// Node types list their ports in a `const` slice; the engine instantiates
/// an [`Attribute`] per entry when the node joins a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Port {
    pub direction: Direction,
    pub kind: AttributeKind,
    /// Display label. Never used for lookup.
    pub label: &'static str,
}

impl Port {
    /// Declare an input port.
    pub const fn input(kind: AttributeKind, label: &'static str) -> Self {
        Self {
            direction: Direction::Input,
            kind,
            label,
        }
    }

    /// Declare an output port.
    pub const fn output(kind: AttributeKind, label: &'static str) -> Self {
        Self {
            direction: Direction::Output,
            kind,
            label,
        }
    }

    pub fn signature(&self) -> Signature {
        Signature::new(self.direction, self.kind)
    }
}

/// A payload computed during a pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(u64),
    Float(f32),
    Buffer(Vec<u8>),
    String(String),
    Pointer(Handle),
}

impl Value {
    /// Returns the kind tag of this value.
    pub fn kind(&self) -> AttributeKind {
        match self {
            Value::Integer(_) => AttributeKind::Integer,
            Value::Float(_) => AttributeKind::Float,
            Value::Buffer(_) => AttributeKind::Buffer,
            Value::String(_) => AttributeKind::String,
            Value::Pointer(_) => AttributeKind::Pointer,
        }
    }

    pub fn as_integer(&self) -> Option<u64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_buffer(&self) -> Option<&[u8]> {
        match self {
            Value::Buffer(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_pointer(&self) -> Option<Handle> {
        match self {
            Value::Pointer(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Integer(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Buffer(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Handle> for Value {
    fn from(v: Handle) -> Self {
        Value::Pointer(v)
    }
}

/// One end of an edge: a node and one of its attribute indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub node: NodeId,
    pub attribute: usize,
}

impl Endpoint {
    pub fn new(node: NodeId, attribute: usize) -> Self {
        Self { node, attribute }
    }
}

/// A live attribute owned by a node slot in the graph.
#[derive(Debug, Clone)]
pub struct Attribute {
    port: Port,

    /// The value computed in the current pass, if any.
    value: Option<Value>,

    /// Peer endpoints. At most one entry for inputs.
    connections: SmallVec<[Endpoint; 1]>,
}

impl Attribute {
    /// Instantiate an attribute from its declaration.
    pub fn new(port: Port) -> Self {
        Self {
            port,
            value: None,
            connections: SmallVec::new(),
        }
    }

    pub fn direction(&self) -> Direction {
        self.port.direction
    }

    pub fn kind(&self) -> AttributeKind {
        self.port.kind
    }

    pub fn label(&self) -> &'static str {
        self.port.label
    }

    pub fn signature(&self) -> Signature {
        self.port.signature()
    }

    /// The value computed during the current pass.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Store a computed value.
    ///
    /// Returns false, leaving the slot untouched, if a value is already
    /// present. Values are immutable until the next pass reset.
    pub(crate) fn set_value(&mut self, value: Value) -> bool {
        if self.value.is_some() {
            return false;
        }
        self.value = Some(value);
        true
    }

    pub(crate) fn clear_value(&mut self) {
        self.value = None;
    }

    /// All peer endpoints.
    pub fn connections(&self) -> &[Endpoint] {
        &self.connections
    }

    /// The producer feeding this attribute, for inputs.
    pub fn producer(&self) -> Option<Endpoint> {
        match self.port.direction {
            Direction::Input => self.connections.first().copied(),
            Direction::Output => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        !self.connections.is_empty()
    }

    pub(crate) fn connect(&mut self, peer: Endpoint) {
        if !self.connections.contains(&peer) {
            self.connections.push(peer);
        }
    }

    pub(crate) fn disconnect(&mut self, peer: Endpoint) {
        self.connections.retain(|p| *p != peer);
    }

    /// Drop every connection whose peer lives on `node`.
    pub(crate) fn disconnect_node(&mut self, node: NodeId) {
        self.connections.retain(|p| p.node != node);
    }
}
