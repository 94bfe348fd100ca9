//! Graph Nodes
//!
//! This module defines the schema-level descriptor of one named property.
//! Nodes are shared by every instance of a schema and never change after the
//! schema is finalized; per-instance state lives in [`SlotState`].
//!
//! [`SlotState`]: crate::reactive::SlotState

use std::fmt;
use std::sync::Arc;

use indexmap::IndexSet;
use smallvec::SmallVec;

use crate::value::Value;

/// Evaluation function of a derived node.
///
/// Receives the instance's host and the dependency values in declaration
/// order.
pub type EvalFn<H> = Arc<dyn Fn(&H, &[Value]) -> Value + Send + Sync>;

/// Identifier of a node, doubling as its slot index in every instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Get the raw slot index.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl From<usize> for NodeId {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

/// The kind of node in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A value supplied by the owning entity. Leaves have no dependencies.
    Leaf,

    /// A value computed from other nodes and cached per instance.
    Derived,
}

/// Whether a node's updates cascade eagerly to its dependents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PropagationMode {
    /// Recomputed as soon as an upstream leaf changes.
    Pushable,

    /// Recomputed lazily on the next read.
    #[default]
    NonPushable,
}

/// Leaf or derived evaluation behavior.
pub(crate) enum Behavior<H> {
    Leaf {
        /// The reserved randomness leaf: skips pending-update notifications.
        ambient: bool,
    },
    Derived {
        eval: EvalFn<H>,
    },
}

/// Declaration options for a derived node.
///
/// ```rust,ignore
/// let opts = DerivedOptions::default().pushable().alias("hurt");
/// ```
#[derive(Debug, Clone, Default)]
pub struct DerivedOptions {
    pub force_eval: bool,
    pub mode: PropagationMode,
    /// Evaluate during `run_init_evaluations`.
    pub eager_init: bool,
    /// Externally visible names. Empty means the canonical name only.
    pub aliases: Vec<String>,
}

impl DerivedOptions {
    pub fn pushable(mut self) -> Self {
        self.mode = PropagationMode::Pushable;
        self
    }

    pub fn force_eval(mut self) -> Self {
        self.force_eval = true;
        self
    }

    pub fn eager_init(mut self) -> Self {
        self.eager_init = true;
        self
    }

    pub fn alias(mut self, name: impl Into<String>) -> Self {
        self.aliases.push(name.into());
        self
    }
}

/// A node in the dependency graph.
pub struct Node<H> {
    /// Slot index of this node.
    pub(crate) id: NodeId,

    /// Canonical name, unique within the schema.
    pub(crate) name: String,

    /// Names this node answers to, in declaration order.
    pub(crate) aliases: IndexSet<String>,

    pub(crate) behavior: Behavior<H>,

    /// Nodes this node reads, in argument order.
    pub(crate) depends: SmallVec<[NodeId; 4]>,

    /// Nodes that read this node.
    pub(crate) deriveds: IndexSet<NodeId>,

    /// True if this node or any transitive dependency refuses to serve a
    /// cached value.
    pub(crate) force_eval: bool,

    pub(crate) mode: PropagationMode,

    pub(crate) eager_init: bool,
}

impl<H> Node<H> {
    pub(crate) fn leaf(id: NodeId, name: String, aliases: IndexSet<String>, ambient: bool) -> Self {
        Self {
            id,
            name,
            aliases,
            behavior: Behavior::Leaf { ambient },
            depends: SmallVec::new(),
            deriveds: IndexSet::new(),
            force_eval: false,
            mode: PropagationMode::NonPushable,
            eager_init: false,
        }
    }

    pub(crate) fn derived(
        id: NodeId,
        name: String,
        aliases: IndexSet<String>,
        depends: SmallVec<[NodeId; 4]>,
        eval: EvalFn<H>,
        options: &DerivedOptions,
    ) -> Self {
        Self {
            id,
            name,
            aliases,
            behavior: Behavior::Derived { eval },
            depends,
            deriveds: IndexSet::new(),
            force_eval: options.force_eval,
            mode: options.mode,
            eager_init: options.eager_init,
        }
    }

    /// Get the node's ID.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Get the canonical name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the node's kind.
    pub fn kind(&self) -> NodeKind {
        match self.behavior {
            Behavior::Leaf { .. } => NodeKind::Leaf,
            Behavior::Derived { .. } => NodeKind::Derived,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.kind() == NodeKind::Leaf
    }

    /// Whether this is the ambient randomness leaf.
    pub fn is_ambient(&self) -> bool {
        matches!(self.behavior, Behavior::Leaf { ambient: true })
    }

    pub fn is_pushable(&self) -> bool {
        self.mode == PropagationMode::Pushable
    }

    pub fn force_eval(&self) -> bool {
        self.force_eval
    }

    pub fn mode(&self) -> PropagationMode {
        self.mode
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.aliases.iter().map(String::as_str)
    }

    /// Nodes this node reads, in argument order.
    pub fn dependencies(&self) -> &[NodeId] {
        &self.depends
    }

    /// Nodes that read this node.
    pub fn dependents(&self) -> &IndexSet<NodeId> {
        &self.deriveds
    }

    pub(crate) fn add_dependent(&mut self, node_id: NodeId) {
        self.deriveds.insert(node_id);
    }
}

impl<H> fmt::Debug for Node<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind())
            .field("mode", &self.mode)
            .field("force_eval", &self.force_eval)
            .field("depends", &self.depends)
            .field("deriveds", &self.deriveds)
            .finish()
    }
}
