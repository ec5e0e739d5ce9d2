//! PacketFlow Core
//!
//! This crate provides the node-graph evaluation engine behind the
//! PacketFlow editor. It implements:
//!
//! - Typed node attributes and the edges between them
//! - Pull-based evaluation with per-pass memoization
//! - Cycle detection and per-node error reporting
//! - A byte overlay that write nodes patch during a pass
//! - A catalog of builtin nodes and graph persistence
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `graph`: attributes, nodes, the overlay and the evaluation pass
//! - `catalog`: type id to node factory registry
//! - `nodes`: the builtin node types
//! - `capability`: host-owned objects that pointer attributes refer to
//! - `persist`: saving and loading graphs as JSON or MessagePack
//!
//! # Example
//!
//! ```rust,ignore
//! use packetflow_core::{CapabilityStore, Graph, NodeCatalog, Overlay};
//!
//! let catalog = NodeCatalog::builtin();
//! let mut graph = Graph::new();
//!
//! let address = graph.create_node(&catalog, "constants.int")?;
//! let data = graph.create_node(&catalog, "constants.buffer")?;
//! let write = graph.create_node(&catalog, "data_access.write")?;
//! graph.link(address, 0, write, 0)?;
//! graph.link(data, 0, write, 1)?;
//!
//! let mut overlay = Overlay::new();
//! graph.evaluate_terminals(&mut overlay, &CapabilityStore::new())?;
//! // overlay.data() now holds the bytes written by `write`
//! ```

pub mod capability;
pub mod catalog;
pub mod config;
pub mod error;
pub mod graph;
pub mod nodes;
pub mod persist;

pub use capability::{CapabilityStore, Handle};
pub use catalog::NodeCatalog;
pub use config::EngineConfig;
pub use error::{ErrorKind, GraphError, NodeError, PersistError};
pub use graph::{Graph, Node, NodeId, Overlay, ProcessContext, Value};
pub use persist::PersistedGraph;
