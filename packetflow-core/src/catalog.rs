//! Node catalog for type-based construction.

use indexmap::IndexMap;

use crate::error::GraphError;
use crate::graph::{BoxedNode, Node};

/// Type alias for node factory functions.
pub type NodeFactory = Box<dyn Fn() -> BoxedNode + Send + Sync>;

struct Entry {
    category: String,
    factory: NodeFactory,
}

/// Registry mapping type ids to node factories.
///
/// Used when the user adds a node and when a persisted graph is loaded.
/// Entries keep their registration order so menus built from
/// [`categories`](Self::categories) are stable.
pub struct NodeCatalog {
    entries: IndexMap<String, Entry>,
}

impl NodeCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Creates a catalog holding every builtin node type.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        crate::nodes::register_builtin(&mut catalog);
        catalog
    }

    /// Registers a factory under `type_id`, replacing any previous entry.
    ///
    /// Nodes added through [`Graph::create_node`](crate::graph::Graph::create_node) are saved under
    /// `type_id`, whatever their [`Node::type_name`] says.
    pub fn register<F>(&mut self, category: &str, type_id: &str, factory: F)
    where
        F: Fn() -> BoxedNode + Send + Sync + 'static,
    {
        self.entries.insert(
            type_id.to_string(),
            Entry {
                category: category.to_string(),
                factory: Box::new(factory),
            },
        );
    }

    /// Registers a node type constructed through `Default`, keyed by its
    /// own type name.
    pub fn add<N>(&mut self, category: &str)
    where
        N: Node + Default,
    {
        let type_id = N::default().type_name();
        self.register(category, type_id, || Box::new(N::default()) as BoxedNode);
    }

    /// Instantiates a node with default parameters.
    pub fn create(&self, type_id: &str) -> Result<BoxedNode, GraphError> {
        let entry = self
            .entries
            .get(type_id)
            .ok_or_else(|| GraphError::UnknownNodeType(type_id.to_string()))?;
        Ok((entry.factory)())
    }

    /// Checks if a type id is registered.
    pub fn contains(&self, type_id: &str) -> bool {
        self.entries.contains_key(type_id)
    }

    /// Returns the category a type id was registered under.
    pub fn category(&self, type_id: &str) -> Option<&str> {
        self.entries.get(type_id).map(|entry| entry.category.as_str())
    }

    /// Returns an iterator over all registered type ids.
    pub fn type_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Type ids grouped by category, both in registration order.
    pub fn categories(&self) -> IndexMap<&str, Vec<&str>> {
        let mut groups: IndexMap<&str, Vec<&str>> = IndexMap::new();
        for (type_id, entry) in &self.entries {
            groups
                .entry(entry.category.as_str())
                .or_default()
                .push(type_id.as_str());
        }
        groups
    }

    /// Returns the number of registered types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no types are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for NodeCatalog {
    fn default() -> Self {
        Self::new()
    }
}
