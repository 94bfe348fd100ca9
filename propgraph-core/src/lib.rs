//! Propgraph Core
//!
//! This crate provides the property engine behind game-entity attributes.
//! It implements:
//!
//! - Property schemas: named leaf and derived values with their dependencies
//! - Tri-state invalidation (clean, dirty, conditionally dirty)
//! - Lazy, memoized pull evaluation
//! - Eager push propagation in a precomputed topological order
//! - Aliases and change notifications for the owning entity
//!
//! # Architecture
//!
//! The crate is organized into two modules:
//!
//! - `graph`: the schema, its nodes and the build-time push orders
//! - `reactive`: per-entity slots, hosts and the evaluation algorithms
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use propgraph_core::{DerivedOptions, SchemaBuilder, Value};
//!
//! let mut builder = SchemaBuilder::<()>::new("player");
//! builder.declare_leaf("strength", &[])?;
//! builder.declare_leaf("equip_strength", &[])?;
//! builder.declare_derived(
//!     "base_hurt",
//!     &["strength", "equip_strength"],
//!     |_, args| Value::Float(args[0].as_float().unwrap_or(0.0) * args[1].as_float().unwrap_or(0.0)),
//!     DerivedOptions::default().pushable(),
//! )?;
//! let schema = Arc::new(builder.finalize()?);
//!
//! let mut player = schema.instantiate(());
//! player.write("strength", 2)?;
//! player.write("equip_strength", 3)?;
//! assert_eq!(player.read("base_hurt")?, Some(Value::Float(6.0)));
//! ```

pub mod error;
pub mod graph;
pub mod reactive;
pub mod value;

pub use error::{PropertyError, Result, SchemaError};
pub use graph::{
    DerivedOptions, NodeId, NodeKind, PropagationMode, PropertySchema, SchemaBuilder, RANDOM_LEAF,
};
pub use reactive::{DirtyState, LeafSnapshot, PropertyHost, PropertyInstance};
pub use value::Value;
