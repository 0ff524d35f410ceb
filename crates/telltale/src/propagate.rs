//! Dirty-path propagation.
//!
//! Every mutation walks the handle graph upward from the mutated node
//! through *all* parent edges, recording into each reachable root's change
//! set the full path of the mutation and every strict ancestor prefix.
//! A value has no single canonical path: when the graph fans in (the same
//! node reachable along several chains) every chain contributes its own
//! paths. After the walk, each distinct change set that gained at least one
//! new path is handed to the notification engine exactly once.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use telltale_value::Key;

use crate::changeset::ChangeSetRef;
use crate::graph::{NodeRef, TrackNode};
use crate::notify;

/// Mark `key` (or, with `None`, the node itself, the container-mutation
/// case) dirty in every root that can reach `node`, then notify the change
/// sets that actually changed.
pub(crate) fn propagate(node: &NodeRef, key: Option<&Key>) {
    let mut touched: Vec<ChangeSetRef> = Vec::new();
    walk_from(node, key, &mut touched);
    deliver_all(&touched);
}

/// Batched variant for operations that move several keys in one logical
/// mutation (list insert): every key walks first, then each affected change
/// set is still notified exactly once.
pub(crate) fn propagate_keys(node: &NodeRef, keys: &[Key]) {
    let mut touched: Vec<ChangeSetRef> = Vec::new();
    for key in keys {
        walk_from(node, Some(key), &mut touched);
    }
    deliver_all(&touched);
}

fn walk_from(node: &NodeRef, leaf: Option<&Key>, touched: &mut Vec<ChangeSetRef>) {
    let mut branch: Vec<*const RefCell<TrackNode>> = Vec::new();
    let mut suffix: VecDeque<Key> = VecDeque::new();
    walk(node, Rc::as_ptr(node), &mut suffix, leaf, &mut branch, touched);
}

// Delivery happens after the walk so no node borrow is live when
// subscriber callbacks (which may re-enter and mutate) run.
fn deliver_all(touched: &[ChangeSetRef]) {
    for cs in touched {
        notify::deliver(cs);
    }
}

fn walk(
    node: &NodeRef,
    origin: *const RefCell<TrackNode>,
    suffix: &mut VecDeque<Key>,
    leaf: Option<&Key>,
    branch: &mut Vec<*const RefCell<TrackNode>>,
    touched: &mut Vec<ChangeSetRef>,
) {
    let ptr = Rc::as_ptr(node);
    // Cycle guard, scoped to the current branch only: the same node may
    // legitimately be visited again along a different converging chain.
    // The mutated node itself may be re-entered once more, so a cycle
    // passing through it still contributes its longer suffix (`a.b.back`
    // alongside `a`) before the walk terminates.
    let seen = branch.iter().filter(|&&p| p == ptr).count();
    let limit = if ptr == origin { 2 } else { 1 };
    if seen >= limit {
        return;
    }
    branch.push(ptr);

    let n = node.borrow();
    for cs in &n.root_of {
        if record_paths(cs, suffix, leaf) {
            touch(touched, cs);
        }
    }

    let mut resolvable_parent = false;
    for (weak, key_in_parent) in &n.parents {
        // A dangling back-reference means the parent was collected; skip.
        let Some(parent) = weak.upgrade() else {
            continue;
        };
        resolvable_parent = true;
        suffix.push_front(key_in_parent.clone());
        walk(&parent, origin, suffix, leaf, branch, touched);
        suffix.pop_front();
    }

    if !resolvable_parent && n.root_of.is_empty() {
        // Orphan: no path to any root resolves any more, but the change
        // sets that once owned this subtree still want to know.
        for cs in &n.owned {
            if record_paths(cs, suffix, leaf) {
                touch(touched, cs);
            }
        }
    }

    drop(n);
    branch.pop();
}

/// Record the joined path and every strict non-empty prefix, deepest
/// first. Returns true when at least one path was new to the set.
fn record_paths(cs: &ChangeSetRef, suffix: &VecDeque<Key>, leaf: Option<&Key>) -> bool {
    let mut segments: Vec<String> = suffix.iter().map(Key::segment).collect();
    if let Some(key) = leaf {
        segments.push(key.segment());
    }
    if segments.is_empty() {
        // A container-level mutation of the root itself has no path to
        // record.
        return false;
    }
    let mut any_new = false;
    let mut set = cs.borrow_mut();
    for end in (1..=segments.len()).rev() {
        if set.insert(segments[..end].join(".")) {
            any_new = true;
        }
    }
    any_new
}

fn touch(touched: &mut Vec<ChangeSetRef>, cs: &ChangeSetRef) {
    if !touched.iter().any(|c| Rc::ptr_eq(c, cs)) {
        touched.push(Rc::clone(cs));
    }
}
