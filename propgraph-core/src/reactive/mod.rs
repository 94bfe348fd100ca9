//! Instance Runtime
//!
//! This module holds everything that varies per entity: the slot array, the
//! host that observes changes, and the evaluation algorithms that run over
//! them.
//!
//! # Concepts
//!
//! ## Slots
//!
//! Each node of a schema owns one slot in every instance. A slot is clean
//! (its value can be used as is), dirty (an upstream leaf changed since) or
//! conditionally dirty (nothing is known; the next read re-pulls).
//!
//! ## Pull and push
//!
//! Derived values are memoized and recomputed lazily on read. Nodes declared
//! pushable are instead recomputed as soon as an upstream leaf changes, in a
//! dependency-respecting order fixed when the schema was built, so hosts
//! hear about their new values immediately.
//!
//! ## Hosts
//!
//! The owning entity implements [`PropertyHost`] to observe value changes.
//! The same host is the context argument of every evaluation function.
//!
//! # Threading
//!
//! A schema is immutable and may be shared across threads. An instance is
//! mutated through `&mut self` only, so one instance is driven by one thread
//! at a time.

mod evaluate;
mod host;
mod instance;
mod slot;

pub use host::PropertyHost;
pub use instance::{LeafSnapshot, PropertyInstance};
pub use slot::{DirtyState, SlotState};
