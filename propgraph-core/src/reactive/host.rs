//! Notification Hooks
//!
//! The owning entity plugs into the engine through [`PropertyHost`]. The host
//! lives inside the [`PropertyInstance`](super::PropertyInstance); it receives
//! change notifications and is handed, read-only, to every evaluation
//! function as its context.

use crate::value::Value;

/// Observer and evaluation context of one property instance.
///
/// Every method has a no-op default, so a host only implements what it
/// cares about.
pub trait PropertyHost {
    /// A node's value changed. Fired once per alias of the node.
    ///
    /// Leaves fire this after an update; pushable derived nodes fire it
    /// when a push recomputes them. `old` is `None` when there was no
    /// previous value.
    fn on_value_changed(&mut self, name: &str, old: Option<&Value>, new: &Value) {
        let _ = (name, old, new);
    }

    /// A leaf is about to be updated. Fired once per update, before the
    /// value is replaced, with the canonical name. Never fired for the
    /// ambient randomness leaf.
    fn on_pending_external_update(&mut self, name: &str, current: Option<&Value>) {
        let _ = (name, current);
    }

    /// Evaluation of `node` stopped because `dependency` could not be
    /// resolved. The node stays dirty and is retried on the next read.
    fn on_evaluation_stalled(&mut self, node: &str, dependency: &str) {
        let _ = (node, dependency);
    }
}

impl PropertyHost for () {}
