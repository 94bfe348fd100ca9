//! Property Instance
//!
//! One instance per entity. It owns the slot array for its schema and the
//! host that observes it, and holds a shared handle to the schema itself.
//! Every operation is forwarded to the schema together with the instance.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::host::PropertyHost;
use super::slot::{DirtyState, SlotState};
use crate::error::{PropertyError, Result};
use crate::graph::PropertySchema;
use crate::value::Value;

/// Per-entity runtime state of a property schema.
pub struct PropertyInstance<H = ()> {
    schema: Arc<PropertySchema<H>>,
    pub(crate) slots: Vec<SlotState>,
    pub(crate) host: H,
}

impl<H: PropertyHost> PropertyInstance<H> {
    /// Allocate one slot per schema node. Leaves start clean, everything
    /// else starts conditionally dirty.
    pub fn new(schema: Arc<PropertySchema<H>>, host: H) -> Self {
        let mut slots = vec![SlotState::new(DirtyState::ConditionallyDirty); schema.len()];
        for id in &schema.always_valid {
            slots[id.index()].mark_clean();
        }
        Self { schema, slots, host }
    }

    pub fn schema(&self) -> &Arc<PropertySchema<H>> {
        &self.schema
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Read a property; `Ok(None)` while it is stale.
    pub fn read(&mut self, name: &str) -> Result<Option<Value>> {
        let schema = Arc::clone(&self.schema);
        schema.read(self, name)
    }

    /// Read a property, falling back to `default` while it is stale.
    pub fn read_or(&mut self, name: &str, default: impl Into<Value>) -> Result<Value> {
        let schema = Arc::clone(&self.schema);
        schema.read_or(self, name, default.into())
    }

    /// Assign a leaf property and propagate the change.
    pub fn write(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let schema = Arc::clone(&self.schema);
        schema.write(self, name, value.into())
    }

    pub fn state(&self, name: &str) -> Result<DirtyState> {
        self.schema.state(self, name)
    }

    pub fn invalidate_all(&mut self) {
        let schema = Arc::clone(&self.schema);
        schema.reset_slots(self);
    }

    pub fn run_init_evaluations(&mut self) {
        let schema = Arc::clone(&self.schema);
        schema.init_evaluations(self);
    }

    /// Assigned leaf values, keyed by canonical name in slot order.
    pub fn snapshot_leaves(&self) -> LeafSnapshot {
        let values = self
            .schema
            .nodes()
            .filter(|node| node.is_leaf())
            .filter_map(|node| {
                self.slots[node.id().index()]
                    .value()
                    .map(|v| (node.name().to_string(), v.clone()))
            })
            .collect();
        LeafSnapshot { values }
    }

    /// Reload leaf values: invalidate everything, then update each stored
    /// leaf in snapshot order.
    ///
    /// Every name is checked before anything changes.
    pub fn restore_leaves(&mut self, snapshot: &LeafSnapshot) -> Result<()> {
        for name in snapshot.values.keys() {
            let id = self.schema.resolve_or_err(name)?;
            if !self.schema.node(id).is_leaf() {
                return Err(PropertyError::NotWritable(name.clone()));
            }
        }

        self.invalidate_all();
        for (name, value) in &snapshot.values {
            self.write(name, value.clone())?;
        }
        Ok(())
    }
}

impl<H: std::fmt::Debug> std::fmt::Debug for PropertyInstance<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyInstance")
            .field("kind", &self.schema.kind())
            .field("slots", &self.slots)
            .field("host", &self.host)
            .finish()
    }
}

/// Leaf values of one instance, for the owner to persist in any serde format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeafSnapshot {
    values: IndexMap<String, Value>,
}

impl LeafSnapshot {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
