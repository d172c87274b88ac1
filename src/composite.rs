//! Immutable multicast tree over [`ShellListener`]s.
//!
//! Listener sets are binary trees that are rebuilt, never mutated, on every
//! add and remove. A dispatch that captured a node before a concurrent
//! add/remove keeps seeing a consistent tree for the rest of that dispatch;
//! the owner just swaps its reference to the new root. Unchanged subtrees are
//! shared between the old and new root.
//!
//! [`ShellListener`]: crate::listener::ShellListener

use std::ptr;
use std::sync::Arc;

use crate::listener::ListenerRef;

/// A node of the listener tree: a single listener, or an ordered pair of
/// subtrees. Dispatch visits `a` before `b`, depth first.
pub enum ListenerNode {
    Leaf(ListenerRef),
    Pair(Arc<ListenerNode>, Arc<ListenerNode>),
}

impl ListenerNode {
    /// Wrap a listener as a tree of one.
    pub fn leaf(listener: ListenerRef) -> Arc<Self> {
        Arc::new(ListenerNode::Leaf(listener))
    }

    /// Forward `text` to every listener in the tree, in registration order.
    ///
    /// Dispatch is synchronous and unisolated: a panic in one listener
    /// prevents the listeners after it from seeing this chunk.
    pub fn receive(&self, text: &str) {
        match self {
            ListenerNode::Leaf(listener) => listener.receive(text),
            ListenerNode::Pair(a, b) => {
                a.receive(text);
                b.receive(text);
            }
        }
    }
}

/// Compose two trees. Absence is identity on either side; two present trees
/// become a new pair. Never mutates its inputs.
pub fn add(
    existing: Option<Arc<ListenerNode>>,
    to_add: Option<Arc<ListenerNode>>,
) -> Option<Arc<ListenerNode>> {
    match (existing, to_add) {
        (None, node) | (node, None) => node,
        (Some(a), Some(b)) => Some(Arc::new(ListenerNode::Pair(a, b))),
    }
}

/// Remove `target` from the tree, matching by handle identity.
///
/// A pair whose direct child is a leaf of `target` collapses to the other
/// child unchanged. Otherwise both children are searched recursively; if
/// neither changes the original node is returned as is, so an absent target
/// costs no allocation.
pub fn remove(
    existing: Option<Arc<ListenerNode>>,
    target: &ListenerRef,
) -> Option<Arc<ListenerNode>> {
    let node = existing?;
    match &*node {
        ListenerNode::Leaf(listener) => {
            if same_listener(listener, target) {
                None
            } else {
                Some(node)
            }
        }
        ListenerNode::Pair(a, b) => {
            if is_leaf_of(a, target) {
                return Some(Arc::clone(b));
            }
            if is_leaf_of(b, target) {
                return Some(Arc::clone(a));
            }
            let new_a = remove(Some(Arc::clone(a)), target);
            let new_b = remove(Some(Arc::clone(b)), target);
            let unchanged = matches!(
                (&new_a, &new_b),
                (Some(x), Some(y)) if Arc::ptr_eq(x, a) && Arc::ptr_eq(y, b)
            );
            if unchanged { Some(node) } else { add(new_a, new_b) }
        }
    }
}

fn is_leaf_of(node: &Arc<ListenerNode>, target: &ListenerRef) -> bool {
    matches!(&**node, ListenerNode::Leaf(listener) if same_listener(listener, target))
}

fn same_listener(a: &ListenerRef, b: &ListenerRef) -> bool {
    // Compare data addresses only; vtable pointers are not stable enough to
    // take part in identity.
    ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
