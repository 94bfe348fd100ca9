//! Property Schema
//!
//! A schema describes every property of one kind of entity: which values are
//! fed from outside, which are derived, and how they depend on each other.
//! It is built once with a [`SchemaBuilder`], frozen by
//! [`SchemaBuilder::finalize`] and then shared by every instance of that kind.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut builder = SchemaBuilder::<()>::new("player");
//! builder.declare_leaf("strength", &[])?;
//! builder.declare_derived(
//!     "damage",
//!     &["strength"],
//!     |_, args| Value::Float(args[0].as_float().unwrap_or(0.0) * 1.5),
//!     DerivedOptions::default().pushable(),
//! )?;
//! let schema = Arc::new(builder.finalize()?);
//! ```

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;
use tracing::debug;

use super::node::{DerivedOptions, EvalFn, Node, NodeId};
use super::scheduler::UpdateScheduler;
use crate::error::{PropertyError, SchemaError};
use crate::reactive::{PropertyHost, PropertyInstance};
use crate::value::Value;

/// Canonical name of the reserved ambient randomness leaf.
pub const RANDOM_LEAF: &str = "random";

/// Incremental schema definition.
///
/// Dependencies must be declared before their dependents, so the graph is
/// acyclic by construction. A failed declaration leaves the builder as it
/// was.
pub struct SchemaBuilder<H> {
    kind: String,
    nodes: Vec<Node<H>>,
    lookup: IndexMap<String, NodeId>,
}

impl<H> SchemaBuilder<H> {
    /// Start an empty schema for the given entity kind.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            nodes: Vec::new(),
            lookup: IndexMap::new(),
        }
    }

    /// Declare an externally fed property.
    ///
    /// With no aliases the property is visible under its canonical name only.
    pub fn declare_leaf(&mut self, name: &str, aliases: &[&str]) -> Result<NodeId, SchemaError> {
        let aliases = self.check_names(name, aliases.iter().copied())?;
        let id = NodeId::from(self.nodes.len());
        self.register(Node::leaf(id, name.to_string(), aliases, false));
        Ok(id)
    }

    /// Declare the per-tick random draw, named [`RANDOM_LEAF`].
    ///
    /// It never fires `on_pending_external_update`.
    pub fn declare_random_leaf(&mut self) -> Result<NodeId, SchemaError> {
        let aliases = self.check_names(RANDOM_LEAF, std::iter::empty())?;
        let id = NodeId::from(self.nodes.len());
        self.register(Node::leaf(id, RANDOM_LEAF.to_string(), aliases, true));
        Ok(id)
    }

    /// Declare a property computed from `depends`.
    ///
    /// `eval` receives the host and the dependency values in `depends` order.
    pub fn declare_derived<F>(
        &mut self,
        name: &str,
        depends: &[&str],
        eval: F,
        options: DerivedOptions,
    ) -> Result<NodeId, SchemaError>
    where
        F: Fn(&H, &[Value]) -> Value + Send + Sync + 'static,
    {
        let aliases = self.check_names(name, options.aliases.iter().map(String::as_str))?;

        let mut dependency_ids: SmallVec<[NodeId; 4]> = SmallVec::with_capacity(depends.len());
        for &dependency in depends {
            let dep_id = self.lookup.get(dependency).copied().ok_or_else(|| {
                SchemaError::UndeclaredDependency {
                    node: name.to_string(),
                    dependency: dependency.to_string(),
                }
            })?;
            dependency_ids.push(dep_id);
        }

        let id = NodeId::from(self.nodes.len());
        let mut force_eval = options.force_eval;
        for &dep_id in &dependency_ids {
            let dependency = &mut self.nodes[dep_id.index()];
            dependency.add_dependent(id);
            force_eval |= dependency.force_eval;
        }

        let eval: EvalFn<H> = Arc::new(eval);
        let mut node = Node::derived(id, name.to_string(), aliases, dependency_ids, eval, &options);
        node.force_eval = force_eval;

        self.register(node);
        Ok(id)
    }

    /// Freeze the schema and compute every leaf's push order.
    pub fn finalize(self) -> Result<PropertySchema<H>, SchemaError> {
        let scheduler = UpdateScheduler::build(&self.nodes)?;

        let always_valid = self.nodes.iter().filter(|n| n.is_leaf()).map(Node::id).collect();
        let init_nodes = self.nodes.iter().filter(|n| n.eager_init).map(Node::id).collect();

        debug!(
            kind = %self.kind,
            nodes = self.nodes.len(),
            leaves = scheduler.leaf_count(),
            "property schema finalized"
        );

        Ok(PropertySchema {
            kind: self.kind,
            nodes: self.nodes,
            lookup: self.lookup,
            always_valid,
            init_nodes,
            scheduler,
        })
    }

    /// Validate a canonical name and its aliases against every name taken so
    /// far. Returns the alias set to store on the node.
    fn check_names<'a>(
        &self,
        name: &'a str,
        aliases: impl Iterator<Item = &'a str>,
    ) -> Result<IndexSet<String>, SchemaError> {
        let mut alias_set: IndexSet<String> = aliases.map(str::to_string).collect();
        if alias_set.is_empty() {
            alias_set.insert(name.to_string());
        }

        let taken = |candidate: &str| self.lookup.contains_key(candidate);
        if taken(name) {
            return Err(SchemaError::DuplicateName(name.to_string()));
        }
        if let Some(alias) = alias_set.iter().find(|a| taken(a.as_str())) {
            return Err(SchemaError::DuplicateName(alias.clone()));
        }
        Ok(alias_set)
    }

    fn register(&mut self, node: Node<H>) {
        self.lookup.insert(node.name.clone(), node.id);
        for alias in &node.aliases {
            self.lookup.insert(alias.clone(), node.id);
        }
        self.nodes.push(node);
    }
}

/// A finalized, immutable property schema.
///
/// Share it through an `Arc`; instances created with
/// [`PropertySchema::instantiate`] keep a handle to it.
pub struct PropertySchema<H> {
    kind: String,
    pub(crate) nodes: Vec<Node<H>>,
    lookup: IndexMap<String, NodeId>,
    pub(crate) always_valid: Vec<NodeId>,
    pub(crate) init_nodes: Vec<NodeId>,
    pub(crate) scheduler: UpdateScheduler,
}

impl<H> PropertySchema<H> {
    /// The entity kind this schema describes.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Number of nodes, which is also the slot count of every instance.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Resolve a canonical name or alias.
    pub fn resolve(&self, name: &str) -> Option<NodeId> {
        self.lookup.get(name).copied()
    }

    /// Look up a node by id. `None` for ids this schema never issued.
    pub fn get_node(&self, id: NodeId) -> Option<&Node<H>> {
        self.nodes.get(id.index())
    }

    /// Ids handed out by this schema are always in range.
    pub(crate) fn node(&self, id: NodeId) -> &Node<H> {
        &self.nodes[id.index()]
    }

    /// All nodes in slot order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node<H>> {
        self.nodes.iter()
    }

    /// Every resolvable name, canonical names and aliases, in declaration
    /// order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.lookup.keys().map(String::as_str)
    }

    /// Aliases of the node reachable under `name`.
    pub fn aliases(&self, name: &str) -> Option<Vec<&str>> {
        self.resolve(name).map(|id| self.node(id).aliases().collect())
    }

    /// Canonical names of the pushable nodes recomputed when `leaf` changes,
    /// in push order.
    pub fn push_order(&self, leaf: &str) -> Option<Vec<&str>> {
        let id = self.resolve(leaf)?;
        Some(
            self.scheduler
                .sequence(id)
                .iter()
                .map(|&d| self.node(d).name())
                .collect(),
        )
    }

    pub(crate) fn resolve_or_err(&self, name: &str) -> Result<NodeId, PropertyError> {
        self.resolve(name)
            .ok_or_else(|| PropertyError::UnknownProperty(name.to_string()))
    }
}

impl<H: PropertyHost> PropertySchema<H> {
    /// Create a fresh instance backed by this schema.
    pub fn instantiate(self: &Arc<Self>, host: H) -> PropertyInstance<H> {
        PropertyInstance::new(Arc::clone(self), host)
    }

    /// Reject instances that were created from another schema.
    pub(crate) fn check_owner(&self, instance: &PropertyInstance<H>) -> Result<(), PropertyError> {
        if std::ptr::eq(Arc::as_ptr(instance.schema()), self) {
            Ok(())
        } else {
            Err(PropertyError::ForeignInstance {
                schema: self.kind.clone(),
                instance: instance.schema().kind().to_string(),
            })
        }
    }
}

impl<H> std::fmt::Debug for PropertySchema<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertySchema")
            .field("kind", &self.kind)
            .field("nodes", &self.nodes)
            .field("scheduler", &self.scheduler)
            .finish()
    }
}
