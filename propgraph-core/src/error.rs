//! Error Types
//!
//! Two families of failure exist. Schema errors are programming mistakes in a
//! schema definition and surface while the schema is being built. Property
//! errors come from instance operations that name something the schema does
//! not allow.
//!
//! Staleness is not an error. A derived property that cannot be resolved yet
//! reads as `Ok(None)`.

use thiserror::Error;

/// Errors raised while declaring or finalizing a schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("property `{0}` is already declared")]
    DuplicateName(String),

    #[error("property `{node}` depends on undeclared property `{dependency}`")]
    UndeclaredDependency { node: String, dependency: String },

    #[error("pushable properties reachable from leaf `{leaf}` form a cycle: {remaining:?}")]
    PushCycle { leaf: String, remaining: Vec<String> },
}

/// Errors raised by reads and writes against a property instance.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PropertyError {
    #[error("unknown property `{0}`")]
    UnknownProperty(String),

    #[error("property `{0}` is derived and cannot be written")]
    NotWritable(String),

    /// The owning entity never assigned this leaf.
    #[error("leaf property `{0}` was read before it was initialized")]
    UninitializedLeaf(String),

    #[error("instance of `{instance}` was passed to the `{schema}` schema")]
    ForeignInstance { schema: String, instance: String },
}

pub type Result<T, E = PropertyError> = std::result::Result<T, E>;
