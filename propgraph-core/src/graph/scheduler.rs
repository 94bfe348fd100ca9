//! Update Scheduler
//!
//! The scheduler decides, once per schema, the order in which pushable nodes
//! are recomputed when a leaf changes. Dependencies always come before their
//! dependents.
//!
//! # Algorithm
//!
//! For every leaf:
//!
//! 1. Walk the dependents of the leaf, following only edges into pushable
//!    nodes. A non-pushable node ends the walk along that path.
//! 2. Count, for each reached node, its incoming edges from other reached
//!    nodes. Edges from the leaf itself are not counted.
//! 3. Run Kahn's algorithm over the reached nodes.
//! 4. Any node left with a nonzero in-degree sits on a cycle.
//!
//! The leaf is the trigger of the sequence, so it is not part of it.

use std::collections::VecDeque;

use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;
use tracing::trace;

use super::node::{Node, NodeId};
use crate::error::SchemaError;

/// Ordered pushable descendants of one leaf.
pub type PushSequence = SmallVec<[NodeId; 8]>;

/// Precomputed push orders, one per leaf.
#[derive(Debug, Default)]
pub struct UpdateScheduler {
    sequences: IndexMap<NodeId, PushSequence>,
}

impl UpdateScheduler {
    /// Compute the push order of every leaf in `nodes`.
    ///
    /// `nodes` must be indexed by slot, i.e. `nodes[i].id().index() == i`.
    pub fn build<H>(nodes: &[Node<H>]) -> Result<Self, SchemaError> {
        let mut sequences = IndexMap::new();
        for node in nodes.iter().filter(|n| n.is_leaf()) {
            let sequence = push_order(nodes, node.id())?;
            trace!(leaf = %node.name(), steps = sequence.len(), "push order computed");
            sequences.insert(node.id(), sequence);
        }
        Ok(Self { sequences })
    }

    /// Get the push order for a leaf. Empty for unknown or isolated leaves.
    pub fn sequence(&self, leaf: NodeId) -> &[NodeId] {
        self.sequences.get(&leaf).map(|s| s.as_slice()).unwrap_or(&[])
    }

    /// Number of leaves with a computed order.
    pub fn leaf_count(&self) -> usize {
        self.sequences.len()
    }
}

/// Topologically ordered pushable descendants of `leaf`.
fn push_order<H>(nodes: &[Node<H>], leaf: NodeId) -> Result<PushSequence, SchemaError> {
    let node = |id: NodeId| &nodes[id.index()];

    // Pushable subgraph reachable from the leaf
    let mut reached: IndexSet<NodeId> = IndexSet::new();
    let mut queue: VecDeque<NodeId> = node(leaf)
        .dependents()
        .iter()
        .copied()
        .filter(|&d| node(d).is_pushable())
        .collect();

    while let Some(node_id) = queue.pop_front() {
        if !reached.insert(node_id) {
            continue;
        }
        for &dependent_id in node(node_id).dependents() {
            if node(dependent_id).is_pushable() && !reached.contains(&dependent_id) {
                queue.push_back(dependent_id);
            }
        }
    }

    // In-degrees, only counting edges within the subgraph
    let mut in_degree: IndexMap<NodeId, usize> = reached.iter().map(|&id| (id, 0)).collect();
    for &node_id in &reached {
        for dependent_id in node(node_id).dependents() {
            if let Some(degree) = in_degree.get_mut(dependent_id) {
                *degree += 1;
            }
        }
    }

    // Kahn's algorithm
    let mut ready: VecDeque<NodeId> = in_degree
        .iter()
        .filter(|(_, &degree)| degree == 0)
        .map(|(&id, _)| id)
        .collect();
    let mut result = PushSequence::new();

    while let Some(node_id) = ready.pop_front() {
        result.push(node_id);

        for dependent_id in node(node_id).dependents() {
            if let Some(degree) = in_degree.get_mut(dependent_id) {
                *degree -= 1;
                if *degree == 0 {
                    ready.push_back(*dependent_id);
                }
            }
        }
    }

    if result.len() != reached.len() {
        let remaining = in_degree
            .iter()
            .filter(|(_, &degree)| degree > 0)
            .map(|(&id, _)| node(id).name().to_string())
            .collect();
        return Err(SchemaError::PushCycle {
            leaf: node(leaf).name().to_string(),
            remaining,
        });
    }

    Ok(result)
}
