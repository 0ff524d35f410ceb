//! Change sets: "what changed since the last reset", one per tracker root.
//!
//! A change set is an insertion-ordered collection of distinct dotted path
//! strings. It is shared by reference between the tracker that owns it, the
//! handle-graph nodes it is connected to, and the notification engine,
//! which keys subscriber registries on its identity.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexSet;

/// Shared reference to a change set; identity (`Rc::ptr_eq`) is what the
/// graph and the notification engine key on.
pub(crate) type ChangeSetRef = Rc<RefCell<ChangeSet>>;

/// The dirty-path collection of one tracker root.
#[derive(Debug, Default)]
pub struct ChangeSet {
    paths: IndexSet<String>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a path. Idempotent: returns false when the path was already
    /// present (insertion order is kept from the first recording).
    pub fn insert(&mut self, path: String) -> bool {
        self.paths.insert(path)
    }

    pub fn is_dirty(&self) -> bool {
        !self.paths.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    /// All dirty paths, in insertion order of first recording.
    pub fn dirty_paths(&self) -> Vec<String> {
        self.paths.iter().cloned().collect()
    }

    /// Empty the set. Does not notify anyone.
    pub fn mark_clean(&mut self) {
        self.paths.clear();
    }
}

pub(crate) fn new_ref() -> ChangeSetRef {
    Rc::new(RefCell::new(ChangeSet::new()))
}

/// Identity key for registry maps.
pub(crate) fn set_id(cs: &ChangeSetRef) -> usize {
    Rc::as_ptr(cs) as usize
}
