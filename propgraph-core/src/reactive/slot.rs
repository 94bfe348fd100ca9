//! Slot State
//!
//! Each instance keeps one slot per schema node: a freshness flag and the
//! last value the node produced (or, for a leaf, the value it was given).

use crate::value::Value;

/// Freshness of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirtyState {
    /// The cached value is up-to-date.
    Clean,

    /// An upstream leaf changed since the value was cached. It must be
    /// recomputed before use.
    Dirty,

    /// Nothing is known about the value. The default for a new or
    /// invalidated instance; the node re-pulls its dependencies on next use.
    ConditionallyDirty,
}

/// Per-instance storage cell for one node.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotState {
    pub(crate) state: DirtyState,
    pub(crate) value: Option<Value>,
}

impl SlotState {
    pub(crate) fn new(state: DirtyState) -> Self {
        Self { state, value: None }
    }

    pub fn state(&self) -> DirtyState {
        self.state
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn is_clean(&self) -> bool {
        self.state == DirtyState::Clean
    }

    pub(crate) fn mark_clean(&mut self) {
        self.state = DirtyState::Clean;
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.state = DirtyState::Dirty;
    }

    pub(crate) fn mark_conditionally_dirty(&mut self) {
        self.state = DirtyState::ConditionallyDirty;
    }

    /// Store a freshly computed value and return the previous one.
    pub(crate) fn store(&mut self, value: Value) -> Option<Value> {
        let old = self.value.replace(value);
        self.state = DirtyState::Clean;
        old
    }
}
