//! Node Graph
//!
//! This module implements the node graph and its pull-based evaluation
//! engine.
//!
//! # Overview
//!
//! - Nodes are units of computation with a fixed, ordered list of typed
//!   attributes (ports).
//! - Edges connect an output attribute of a producer to an input attribute
//!   of a consumer. An input has at most one producer; an output may feed
//!   any number of consumers.
//!
//! Evaluation starts at a terminal node and flows backwards: reading an
//! input processes the producer behind it on demand. Values flow from
//! producers to consumers, and overlay writes are the only side effect.
//!
//! # Design Decisions
//!
//! 1. Pull evaluation rather than a precomputed topological order, because:
//!    - Only nodes upstream of a requested terminal are processed
//!    - Cycles may exist in the edited graph and are only an error if a
//!      pass actually walks into one
//!
//! 2. The graph is indexed by node ID, in insertion order, so passes over
//!    "all terminals" are deterministic.
//!
//! 3. Every computed value lives on its attribute and is cleared at the
//!    start of each pass. There is no caching across passes.

mod attribute;
mod context;
mod node;
mod overlay;
mod scheduler;

pub use attribute::{Attribute, AttributeKind, Direction, Endpoint, Port, Signature, Value};
pub use context::ProcessContext;
pub use node::{BoxedNode, IdAllocator, Node, NodeId, VisitState};
pub use overlay::{Overlay, OverlayError, MAX_OVERLAY_LEN};
pub use scheduler::{Graph, Link, PassSummary};
