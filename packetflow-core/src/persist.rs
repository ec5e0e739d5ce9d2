//! Graph persistence.
//!
//! A saved graph is a flat list of nodes (id, type id, parameters) plus a
//! list of links. Computed values and pass state are never saved. The same
//! [`PersistedGraph`] is written either as JSON or as MessagePack.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::catalog::NodeCatalog;
use crate::error::PersistError;
use crate::graph::{Graph, NodeId};

/// One saved node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedNode {
    pub id: NodeId,
    pub type_id: String,
    #[serde(default)]
    pub params: JsonValue,
}

/// One saved edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedLink {
    pub from_node: NodeId,
    pub from_attr: usize,
    pub to_node: NodeId,
    pub to_attr: usize,
}

/// Serializable snapshot of a graph's structure and node parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedGraph {
    #[serde(default)]
    pub nodes: Vec<PersistedNode>,
    #[serde(default)]
    pub links: Vec<PersistedLink>,
}

impl PersistedGraph {
    /// Serialize to a pretty JSON document.
    pub fn to_json(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, PersistError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to MessagePack with named fields.
    pub fn to_msgpack(&self) -> Result<Vec<u8>, PersistError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, PersistError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }

    /// Largest node id in the document.
    pub fn max_id(&self) -> Option<NodeId> {
        self.nodes.iter().map(|node| node.id).max()
    }
}

impl Graph {
    /// Snapshot the graph for saving.
    pub fn store(&self) -> Result<PersistedGraph, PersistError> {
        let mut nodes = Vec::with_capacity(self.node_count());
        for id in self.node_ids() {
            let (Some(node), Some(type_id)) = (self.node(id), self.type_id(id)) else {
                continue;
            };
            nodes.push(PersistedNode {
                id,
                type_id: type_id.to_string(),
                params: node
                    .store()
                    .map_err(|source| PersistError::Params { node: id, source })?,
            });
        }

        let links = self
            .links()
            .into_iter()
            .map(|link| PersistedLink {
                from_node: link.from.node,
                from_attr: link.from.attribute,
                to_node: link.to.node,
                to_attr: link.to.attribute,
            })
            .collect();

        Ok(PersistedGraph { nodes, links })
    }

    /// Build a new graph from a saved document.
    pub fn load(saved: &PersistedGraph, catalog: &NodeCatalog) -> Result<Graph, PersistError> {
        let mut graph = Graph::new();
        graph.import(saved, catalog)?;
        Ok(graph)
    }

    /// Add the saved nodes and links to this graph, keeping their ids.
    ///
    /// The id allocator is raised past every saved id before anything is
    /// inserted, so ids handed out afterwards never collide with loaded
    /// ones, even when the import fails part way.
    pub fn import(&mut self, saved: &PersistedGraph, catalog: &NodeCatalog) -> Result<(), PersistError> {
        if let Some(max) = saved.max_id() {
            self.ids_mut().observe(max);
        }

        for entry in &saved.nodes {
            let mut node = catalog.create(&entry.type_id)?;
            if !entry.params.is_null() {
                node.load(entry.params.clone())
                    .map_err(|source| PersistError::Params {
                        node: entry.id,
                        source,
                    })?;
            }
            if !self.insert_with_id(entry.id, &entry.type_id, node) {
                return Err(PersistError::DuplicateNode(entry.id));
            }
        }

        for link in &saved.links {
            self.link(link.from_node, link.from_attr, link.to_node, link.to_attr)?;
        }

        debug!(
            nodes = saved.nodes.len(),
            links = saved.links.len(),
            next_id = %self.ids().peek(),
            "graph imported"
        );
        Ok(())
    }
}
