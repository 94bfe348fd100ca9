//! Dependency Graph
//!
//! This module implements the schema-level dependency graph: the named
//! properties of one entity kind and the edges between them.
//!
//! # Overview
//!
//! The dependency graph is a directed acyclic graph (DAG) where:
//!
//! - Nodes are properties, either leaves (fed by the owning entity) or
//!   derived values (computed from other nodes)
//! - Edges represent dependencies: if A depends on B, there is an edge from B to A
//!
//! The graph never changes after [`SchemaBuilder::finalize`]. Mutable state
//! lives in each [`PropertyInstance`](crate::reactive::PropertyInstance).
//!
//! # Design Decisions
//!
//! 1. Node IDs are dense slot indexes, so per-instance state is a plain
//!    vector and every lookup is O(1).
//!
//! 2. Names and aliases are resolved through one table at the boundary; the
//!    evaluation algorithms only ever see IDs.
//!
//! 3. Push orders are computed once per leaf at build time, not per update.

mod node;
mod scheduler;
mod schema;

pub use node::{DerivedOptions, EvalFn, Node, NodeId, NodeKind, PropagationMode};
pub(crate) use node::Behavior;
pub use scheduler::{PushSequence, UpdateScheduler};
pub use schema::{PropertySchema, SchemaBuilder, RANDOM_LEAF};
