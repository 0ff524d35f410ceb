//! The handle graph: one node per distinct underlying structured value.
//!
//! Nodes hold strong references *down* (the children cache, which makes
//! repeated reads identity-stable) and weak references *up* (parent edges,
//! so an ancestor tree can be dropped independently of a shared child; a
//! parent edge that no longer upgrades is simply skipped by traversals).
//! A thread-local registry keyed on value identity enforces the one-node-
//! per-value invariant, which is what makes circular references and
//! repeated wraps safe and cheap.
//!
//! Invariants kept here:
//!
//! - exactly one live node per distinct underlying value;
//! - a node's `owned` change-set list is monotonically non-decreasing and,
//!   once a change set is connected, it is connected to every descendant;
//! - a node with no parents that was created for a tracker root is
//!   registered against that tracker's change set.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};

use telltale_value::{Key, Value, ValueId};

use crate::changeset::ChangeSetRef;
use crate::error::Error;

pub(crate) type NodeRef = Rc<RefCell<TrackNode>>;
pub(crate) type WeakNode = Weak<RefCell<TrackNode>>;

/// Per-value graph record.
#[derive(Debug)]
pub(crate) struct TrackNode {
    /// The underlying structured value; the node pins its identity.
    pub target: Value,
    /// Weak back-references to parents, each with the key under which this
    /// node hangs off that parent.
    pub parents: Vec<(WeakNode, Key)>,
    /// Key → child node cache; re-reading a key yields the same node.
    pub children: HashMap<Key, NodeRef>,
    /// Change sets that consider this node part of their tree.
    pub owned: Vec<ChangeSetRef>,
    /// Change sets this node is the registered root of.
    pub root_of: Vec<ChangeSetRef>,
}

thread_local! {
    static REGISTRY: RefCell<HashMap<ValueId, WeakNode>> = RefCell::new(HashMap::new());
}

fn lookup(id: ValueId) -> Option<NodeRef> {
    REGISTRY.with(|reg| {
        let mut reg = reg.borrow_mut();
        match reg.get(&id).and_then(Weak::upgrade) {
            Some(node) => Some(node),
            None => {
                // Stale entry: the node (or its value) is gone.
                reg.remove(&id);
                None
            }
        }
    })
}

/// The node for an already-wrapped value, if any.
pub(crate) fn node_for(value: &Value) -> Option<NodeRef> {
    value.identity().and_then(lookup)
}

/// Get-or-create the canonical node for a structured value.
pub(crate) fn ensure_node(value: &Value) -> Result<NodeRef, Error> {
    let id = value.identity().ok_or(Error::NotStructured)?;
    if let Some(node) = lookup(id) {
        return Ok(node);
    }
    if value.is_frozen() {
        return Err(Error::Frozen);
    }
    let node = Rc::new(RefCell::new(TrackNode {
        target: value.clone(),
        parents: Vec::new(),
        children: HashMap::new(),
        owned: Vec::new(),
        root_of: Vec::new(),
    }));
    REGISTRY.with(|reg| {
        reg.borrow_mut().insert(id, Rc::downgrade(&node));
    });
    Ok(node)
}

/// Cache `child` under `key` in `parent` and add the reverse weak edge,
/// unless that exact edge already exists.
pub(crate) fn link(parent: &NodeRef, key: &Key, child: &NodeRef) {
    {
        let mut p = parent.borrow_mut();
        p.children.insert(key.clone(), Rc::clone(child));
    }
    let mut c = child.borrow_mut();
    let exists = c
        .parents
        .iter()
        .any(|(weak, k)| k == key && weak.as_ptr() == Rc::as_ptr(parent));
    if !exists {
        c.parents.push((Rc::downgrade(parent), key.clone()));
    }
}

/// Drop the child cache entry for `key` and the matching reverse edge.
/// The child node itself survives as long as anything else references it;
/// its `owned` list is untouched (monotonic), which is what lets an
/// orphaned value keep reporting into the change sets that saw it.
pub(crate) fn detach_child(parent: &NodeRef, key: &Key) {
    let child = parent.borrow_mut().children.remove(key);
    if let Some(child) = child {
        child
            .borrow_mut()
            .parents
            .retain(|(weak, k)| !(k == key && weak.as_ptr() == Rc::as_ptr(parent)));
    }
}

/// Union `cs` into `node.owned` and, on first connection, into every
/// descendant. The early return on an already-connected node doubles as
/// the cycle guard.
pub(crate) fn connect(node: &NodeRef, cs: &ChangeSetRef) {
    let already = node.borrow().owned.iter().any(|c| Rc::ptr_eq(c, cs));
    if already {
        return;
    }
    node.borrow_mut().owned.push(Rc::clone(cs));
    let children: Vec<NodeRef> = node.borrow().children.values().cloned().collect();
    for child in &children {
        connect(child, cs);
    }
}

/// Register `node` as the root of `cs` (idempotent).
pub(crate) fn register_root(node: &NodeRef, cs: &ChangeSetRef) {
    let mut n = node.borrow_mut();
    if !n.root_of.iter().any(|c| Rc::ptr_eq(c, cs)) {
        n.root_of.push(Rc::clone(cs));
    }
}

/// Wrap a structured child of `parent` reachable under `key`: reuse or
/// create its node, add the edge, connect every change set `parent` is
/// owned by, and eagerly descend so all shared-edge registrations exist
/// before the next mutation. Returns `None` for scalar values.
pub(crate) fn adopt(parent: &NodeRef, key: &Key, value: &Value) -> Result<Option<NodeRef>, Error> {
    if !value.is_structured() {
        return Ok(None);
    }
    let child = ensure_node(value)?;
    link(parent, key, &child);
    let owned: Vec<ChangeSetRef> = parent.borrow().owned.clone();
    for cs in &owned {
        connect(&child, cs);
    }
    let mut visited = HashSet::new();
    descend(&child, &mut visited)?;
    Ok(Some(child))
}

/// Build the graph for everything reachable from `value` and connect it to
/// `cs`. Used by tracker construction; root registration is the caller's
/// step.
pub(crate) fn wrap_tree(value: &Value, cs: &ChangeSetRef) -> Result<NodeRef, Error> {
    let node = ensure_node(value)?;
    connect(&node, cs);
    let mut visited = HashSet::new();
    descend(&node, &mut visited)?;
    Ok(node)
}

/// Eagerly wrap the structured children of `node`'s record/list target.
/// Container categories are leaves: their entries are intentionally not
/// tracked.
fn descend(node: &NodeRef, visited: &mut HashSet<*const RefCell<TrackNode>>) -> Result<(), Error> {
    if !visited.insert(Rc::as_ptr(node)) {
        return Ok(());
    }
    let entries = structured_entries(&node.borrow().target);
    let owned: Vec<ChangeSetRef> = node.borrow().owned.clone();
    for (key, value) in entries {
        let child = ensure_node(&value)?;
        link(node, &key, &child);
        for cs in &owned {
            connect(&child, cs);
        }
        descend(&child, visited)?;
    }
    Ok(())
}

fn structured_entries(target: &Value) -> Vec<(Key, Value)> {
    match target {
        Value::Record(rc) => rc
            .borrow()
            .iter()
            .filter(|(_, v)| v.is_structured())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        Value::List(rc) => rc
            .borrow()
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_structured())
            .map(|(i, v)| (Key::Index(i), v.clone()))
            .collect(),
        _ => Vec::new(),
    }
}
