//! Tracker construction and change-set query operations.
//!
//! A [`Tracker`] pairs one root change set with the handle graph built
//! over a canonical starting structure. Schema-backed trackers run the
//! external [`Canonicalize`] collaborator first; its validation failures
//! propagate unchanged to the caller. The graph is wrapped eagerly at
//! construction so every shared-edge registration exists before the first
//! mutation.

use std::rc::Rc;

use indexmap::IndexMap;
use telltale_value::{deep_clone, Value};

use crate::changeset::{self, ChangeSetRef};
use crate::error::{Error, SchemaError};
use crate::graph;
use crate::handle::Handle;
use crate::notify::{self, PullSubscription, PushSubscription};

/// The schema-validation/default-filling collaborator boundary.
///
/// Given a raw partial input, an implementation returns a fully defaulted
/// structure of a known shape, or fails with a validation error. The
/// tracking core never inspects how the structure was produced.
pub trait Canonicalize {
    fn canonicalize(&self, raw: Value) -> Result<Value, SchemaError>;
}

/// A top-level tracked structure with its own independent change set.
#[derive(Debug)]
pub struct Tracker {
    handle: Handle,
    changes: ChangeSetRef,
    baseline: Value,
    schema_backed: bool,
}

impl Tracker {
    /// Track a canonical structure directly (schema-less).
    pub fn new(canonical: Value) -> Result<Self, Error> {
        Self::build(canonical, false)
    }

    /// Run the schema collaborator on `raw` and track its output.
    /// Validation failures pass through unchanged.
    pub fn with_schema(schema: &dyn Canonicalize, raw: Value) -> Result<Self, Error> {
        let canonical = schema.canonicalize(raw)?;
        Self::build(canonical, true)
    }

    fn build(canonical: Value, schema_backed: bool) -> Result<Self, Error> {
        if !canonical.is_structured() {
            return Err(Error::NotStructured);
        }
        let baseline = deep_clone(&canonical);
        let changes = changeset::new_ref();
        let node = graph::wrap_tree(&canonical, &changes)?;
        graph::register_root(&node, &changes);
        Ok(Self {
            handle: Handle::from_node(node),
            changes,
            baseline,
            schema_backed,
        })
    }

    /// The canonical handle for the tracked root.
    pub fn handle(&self) -> Handle {
        self.handle.clone()
    }

    /// A deep-cloned snapshot of the starting structure, untouched by any
    /// later mutation.
    pub fn baseline(&self) -> &Value {
        &self.baseline
    }

    // ── Change-set ops ────────────────────────────────────────────────────

    pub fn is_dirty(&self) -> bool {
        self.changes.borrow().is_dirty()
    }

    /// Dirty paths in insertion order of first recording.
    pub fn dirty_paths(&self) -> Vec<String> {
        self.changes.borrow().dirty_paths()
    }

    /// Empty the change set without notifying subscribers.
    pub fn mark_clean(&self) {
        self.changes.borrow_mut().mark_clean();
    }

    /// For schema-backed trackers: map each dirty path's top-level key to
    /// the handle's current value at that key. Keys are deduplicated, in
    /// insertion order of the first dirty path under each key; keys whose
    /// value has since been deleted are skipped.
    pub fn dirty_top_level_slice(&self) -> Result<IndexMap<String, Value>, Error> {
        if !self.schema_backed {
            return Err(Error::NotSchemaBacked);
        }
        let mut slice = IndexMap::new();
        for path in self.dirty_paths() {
            let top = path.split('.').next().unwrap_or("");
            if top.is_empty() || slice.contains_key(top) {
                continue;
            }
            if let Some(value) = self.handle.get_by_segment(top)? {
                slice.insert(top.to_owned(), value);
            }
        }
        Ok(slice)
    }

    // ── Subscription surface ──────────────────────────────────────────────

    /// Push-mode subscription to this tracker's change set.
    pub fn subscribe(&self, callback: impl Fn(&[String]) + 'static) -> PushSubscription {
        notify::subscribe_push(std::slice::from_ref(&self.changes), callback)
    }

    /// Pull-mode subscription to this tracker's change set.
    pub fn subscribe_pull(&self, coalesce: bool) -> PullSubscription {
        notify::subscribe_pull(std::slice::from_ref(&self.changes), coalesce)
    }
}

/// Whether `value` currently has a node in the handle graph.
pub fn is_tracked(value: &Value) -> bool {
    graph::node_for(value).is_some()
}

/// Push-mode subscription by tracked value: resolves the value's node and
/// subscribes to the change set(s) it reports into: its own when it is a
/// registered root, otherwise every change set that owns it. Fails with
/// [`Error::NotTracked`] for values the graph has never seen.
pub fn subscribe(
    value: &Value,
    callback: impl Fn(&[String]) + 'static,
) -> Result<PushSubscription, Error> {
    Ok(notify::subscribe_push(&sets_of(value)?, callback))
}

/// Pull-mode counterpart of [`subscribe`].
pub fn subscribe_pull(value: &Value, coalesce: bool) -> Result<PullSubscription, Error> {
    Ok(notify::subscribe_pull(&sets_of(value)?, coalesce))
}

fn sets_of(value: &Value) -> Result<Vec<ChangeSetRef>, Error> {
    let node = graph::node_for(value).ok_or(Error::NotTracked)?;
    let node = node.borrow();
    let sets: Vec<ChangeSetRef> = if node.root_of.is_empty() {
        node.owned.iter().map(Rc::clone).collect()
    } else {
        node.root_of.iter().map(Rc::clone).collect()
    };
    if sets.is_empty() {
        return Err(Error::NotTracked);
    }
    Ok(sets)
}
