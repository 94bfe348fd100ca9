//! Evaluation and Propagation
//!
//! The algorithms that move values through a schema for one instance.
//!
//! # Pull
//!
//! Reading a derived node returns its cached value when the slot is clean.
//! Otherwise every dependency is pulled recursively, the evaluation function
//! runs and the result is cached. If any dependency cannot be resolved the
//! node is marked dirty and the read yields nothing. That is staleness, not
//! an error.
//!
//! # Push
//!
//! Updating a leaf stores the value, marks every clean descendant dirty and
//! then recomputes the leaf's pushable descendants in the order computed by
//! the [`UpdateScheduler`](crate::graph::UpdateScheduler). The push stops at
//! the first node that cannot be brought back to clean; the rest stay dirty
//! and resolve lazily on their next read.

use smallvec::SmallVec;
use tracing::{debug, trace};

use super::host::PropertyHost;
use super::instance::PropertyInstance;
use super::slot::DirtyState;
use crate::error::{PropertyError, Result};
use crate::graph::{Behavior, NodeId, PropertySchema};
use crate::value::Value;

impl<H: PropertyHost> PropertySchema<H> {
    /// Read a property by name or alias.
    ///
    /// Returns `Ok(None)` when a derived property cannot be resolved yet.
    /// Reading a leaf that was never assigned is an error.
    pub fn read(&self, instance: &mut PropertyInstance<H>, name: &str) -> Result<Option<Value>> {
        self.check_owner(instance)?;
        let id = self.resolve_or_err(name)?;
        let value = self.evaluate(instance, id);
        let node = self.node(id);
        if node.is_leaf() && value.is_none() {
            return Err(PropertyError::UninitializedLeaf(node.name().to_string()));
        }
        Ok(value)
    }

    /// Read a property, falling back to `default` while it is stale.
    pub fn read_or(
        &self,
        instance: &mut PropertyInstance<H>,
        name: &str,
        default: Value,
    ) -> Result<Value> {
        Ok(self.read(instance, name)?.unwrap_or(default))
    }

    /// Assign a leaf and propagate the change.
    pub fn write(&self, instance: &mut PropertyInstance<H>, name: &str, value: Value) -> Result<()> {
        self.check_owner(instance)?;
        let id = self.resolve_or_err(name)?;
        let node = self.node(id);
        if !node.is_leaf() {
            return Err(PropertyError::NotWritable(node.name().to_string()));
        }
        self.update(instance, id, value);
        Ok(())
    }

    /// Current freshness of a property's slot.
    pub fn state(&self, instance: &PropertyInstance<H>, name: &str) -> Result<DirtyState> {
        self.check_owner(instance)?;
        let id = self.resolve_or_err(name)?;
        Ok(instance.slots[id.index()].state())
    }

    /// Forget what is known about every derived value. Leaves stay clean.
    pub fn invalidate_all(&self, instance: &mut PropertyInstance<H>) -> Result<()> {
        self.check_owner(instance)?;
        self.reset_slots(instance);
        Ok(())
    }

    /// Evaluate every node declared with `eager_init` and announce the ones
    /// that resolve.
    pub fn run_init_evaluations(&self, instance: &mut PropertyInstance<H>) -> Result<()> {
        self.check_owner(instance)?;
        self.init_evaluations(instance);
        Ok(())
    }

    pub(crate) fn reset_slots(&self, instance: &mut PropertyInstance<H>) {
        for slot in instance.slots.iter_mut() {
            slot.mark_conditionally_dirty();
        }
        for id in &self.always_valid {
            instance.slots[id.index()].mark_clean();
        }
    }

    pub(crate) fn init_evaluations(&self, instance: &mut PropertyInstance<H>) {
        for &id in &self.init_nodes {
            if let Some(value) = self.evaluate(instance, id) {
                self.notify_changed(instance, id, None, &value);
            }
        }
    }

    /// Pull a node's value, memoized.
    pub(crate) fn evaluate(&self, instance: &mut PropertyInstance<H>, id: NodeId) -> Option<Value> {
        let node = self.node(id);
        if node.is_leaf() {
            return refresh_leaf(instance, id);
        }

        let slot = &instance.slots[id.index()];
        if !node.force_eval() && slot.is_clean() {
            return slot.value.clone();
        }

        self.force_evaluate(instance, id, true, false);
        let slot = &instance.slots[id.index()];
        if slot.is_clean() {
            slot.value.clone()
        } else {
            None
        }
    }

    /// Recompute a node regardless of its cached state.
    ///
    /// Without `descend`, a dependency that is already non-clean is not
    /// pulled and the node goes dirty instead. With `push`, a changed value
    /// of a pushable node is announced to the host.
    fn force_evaluate(
        &self,
        instance: &mut PropertyInstance<H>,
        id: NodeId,
        descend: bool,
        push: bool,
    ) {
        let node = self.node(id);
        let eval = match &node.behavior {
            Behavior::Leaf { .. } => {
                refresh_leaf(instance, id);
                return;
            }
            Behavior::Derived { eval } => eval,
        };

        let mut args: SmallVec<[Value; 4]> = SmallVec::with_capacity(node.depends.len());
        for &dep_id in &node.depends {
            if !descend && !instance.slots[dep_id.index()].is_clean() {
                self.stall(instance, id, dep_id);
                return;
            }
            match self.evaluate(instance, dep_id) {
                Some(value) => args.push(value),
                None => {
                    self.stall(instance, id, dep_id);
                    return;
                }
            }
        }

        let value = eval(&instance.host, args.as_slice());
        let old = instance.slots[id.index()].store(value.clone());
        trace!(node = %node.name(), value = %value, "evaluated");

        if push && node.is_pushable() && old.as_ref() != Some(&value) {
            self.notify_changed(instance, id, old.as_ref(), &value);
        }
    }

    /// Externally driven update of a leaf.
    fn update(&self, instance: &mut PropertyInstance<H>, id: NodeId, value: Value) {
        let node = self.node(id);
        if !node.is_ambient() {
            instance
                .host
                .on_pending_external_update(node.name(), instance.slots[id.index()].value());
        }

        let old = instance.slots[id.index()].store(value.clone());
        self.invalidate_dependents(instance, id);
        self.push_from(instance, id);

        if old.as_ref() != Some(&value) {
            self.notify_changed(instance, id, old.as_ref(), &value);
        }
    }

    /// Mark clean descendants dirty. Subtrees under an already non-clean
    /// node were invalidated before and are not walked again.
    fn invalidate_dependents(&self, instance: &mut PropertyInstance<H>, id: NodeId) {
        let mut stack: Vec<NodeId> = self.node(id).dependents().iter().copied().collect();
        while let Some(node_id) = stack.pop() {
            let slot = &mut instance.slots[node_id.index()];
            if slot.is_clean() {
                slot.mark_dirty();
                trace!(node = %self.node(node_id).name(), "invalidated");
                stack.extend(self.node(node_id).dependents().iter().copied());
            }
        }
    }

    /// Recompute the pushable descendants of a leaf in push order.
    fn push_from(&self, instance: &mut PropertyInstance<H>, leaf: NodeId) {
        for &node_id in self.scheduler.sequence(leaf) {
            let descend = instance.slots[node_id.index()].state() == DirtyState::ConditionallyDirty;
            self.force_evaluate(instance, node_id, descend, true);
            if !instance.slots[node_id.index()].is_clean() {
                trace!(
                    leaf = %self.node(leaf).name(),
                    node = %self.node(node_id).name(),
                    "push halted"
                );
                return;
            }
        }
    }

    fn stall(&self, instance: &mut PropertyInstance<H>, id: NodeId, dependency: NodeId) {
        instance.slots[id.index()].mark_dirty();
        let node = self.node(id).name();
        let dependency = self.node(dependency).name();
        debug!(node = %node, dependency = %dependency, "evaluation stalled on unresolved dependency");
        instance.host.on_evaluation_stalled(node, dependency);
    }

    fn notify_changed(
        &self,
        instance: &mut PropertyInstance<H>,
        id: NodeId,
        old: Option<&Value>,
        new: &Value,
    ) {
        for alias in self.node(id).aliases() {
            instance.host.on_value_changed(alias, old, new);
        }
    }
}

/// Leaves are always valid once assigned; an unassigned leaf goes dirty.
fn refresh_leaf<H>(instance: &mut PropertyInstance<H>, id: NodeId) -> Option<Value> {
    let slot = &mut instance.slots[id.index()];
    match slot.value.clone() {
        Some(value) => {
            slot.mark_clean();
            Some(value)
        }
        None => {
            slot.mark_dirty();
            None
        }
    }
}
