//! The canonical accessor handle for a tracked value.
//!
//! A [`Handle`] is the one wrapper callers mutate a tracked structure
//! through. Field access goes through explicit `get`/`set`/`delete`
//! operations (the interception seam of this design); every mutation
//! updates the underlying value first and then runs dirty-path propagation
//! through the handle graph. Reads are identity-stable: reading the same
//! key twice yields the same node, so `get_handle` twice compares equal.
//!
//! Container-category children bypass the field path entirely: convert
//! with [`Handle::as_map`] and friends to a typed container handle whose
//! operations run against the exact underlying instance.

use std::rc::Rc;

use telltale_value::{Key, List, Record, Shared, Value};

use crate::container::{BytesHandle, MapHandle, NumBufHandle, SetHandle, TimeHandle};
use crate::error::Error;
use crate::graph::{self, NodeRef};
use crate::propagate::{propagate, propagate_keys};

/// Canonical wrapper for one tracked structured value. Cheap to clone; two
/// handles are equal only when they wrap the same node.
#[derive(Clone)]
pub struct Handle {
    node: NodeRef,
}

/// Field-addressable payloads; containers are rejected with `WrongKind`.
enum FieldTarget {
    Record(Shared<Record>),
    List(Shared<List>),
}

impl Handle {
    pub(crate) fn from_node(node: NodeRef) -> Self {
        Self { node }
    }

    pub(crate) fn node(&self) -> &NodeRef {
        &self.node
    }

    /// The underlying shared value (same identity the handle was built on).
    pub fn value(&self) -> Value {
        self.node.borrow().target.clone()
    }

    pub fn is_record(&self) -> bool {
        matches!(self.node.borrow().target, Value::Record(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self.node.borrow().target, Value::List(_))
    }

    /// JSON projection of the current state (test/debug convenience).
    pub fn to_json(&self) -> serde_json::Value {
        self.value().to_json()
    }

    // ── Field reads ───────────────────────────────────────────────────────

    /// Read a field. Structured children are wrapped into the graph on
    /// first access and come back with their shared identity intact;
    /// scalars come back as plain copies.
    pub fn get(&self, key: impl Into<Key>) -> Result<Option<Value>, Error> {
        let key = key.into();
        if let Some(child) = self.node.borrow().children.get(&key) {
            return Ok(Some(child.borrow().target.clone()));
        }
        match self.read_field(&key)? {
            Some(value) if value.is_structured() => {
                graph::adopt(&self.node, &key, &value)?;
                Ok(Some(value))
            }
            other => Ok(other),
        }
    }

    /// Read a structured field as a handle; `None` for absent or scalar
    /// fields. Identity-stable: the same key always yields the same node.
    pub fn get_handle(&self, key: impl Into<Key>) -> Result<Option<Handle>, Error> {
        let key = key.into();
        if let Some(child) = self.node.borrow().children.get(&key) {
            return Ok(Some(Handle::from_node(Rc::clone(child))));
        }
        match self.read_field(&key)? {
            Some(value) if value.is_structured() => Ok(graph::adopt(&self.node, &key, &value)?
                .map(Handle::from_node)),
            _ => Ok(None),
        }
    }

    pub fn has(&self, key: impl Into<Key>) -> Result<bool, Error> {
        let key = key.into();
        match self.field_target()? {
            FieldTarget::Record(rc) => Ok(rc.borrow().contains(&key)),
            FieldTarget::List(rc) => {
                let index = key.as_index().ok_or(Error::IndexExpected)?;
                Ok(index < rc.borrow().len())
            }
        }
    }

    /// Enumeration pass-through; never marks anything dirty.
    pub fn keys(&self) -> Result<Vec<Key>, Error> {
        match self.field_target()? {
            FieldTarget::Record(rc) => Ok(rc.borrow().keys().cloned().collect()),
            FieldTarget::List(rc) => Ok((0..rc.borrow().len()).map(Key::Index).collect()),
        }
    }

    pub fn len(&self) -> Result<usize, Error> {
        match self.field_target()? {
            FieldTarget::Record(rc) => Ok(rc.borrow().len()),
            FieldTarget::List(rc) => Ok(rc.borrow().len()),
        }
    }

    pub fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len()? == 0)
    }

    /// Snapshot of `(key, value)` pairs in field order.
    pub fn entries(&self) -> Result<Vec<(Key, Value)>, Error> {
        match self.field_target()? {
            FieldTarget::Record(rc) => Ok(rc
                .borrow()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()),
            FieldTarget::List(rc) => Ok(rc
                .borrow()
                .iter()
                .enumerate()
                .map(|(i, v)| (Key::Index(i), v.clone()))
                .collect()),
        }
    }

    // ── Field writes ──────────────────────────────────────────────────────

    /// Write a field. Writing a value identical to the current one (same
    /// reference for structured values, ordinary equality for scalars) is
    /// a no-op with respect to dirtiness. Otherwise the old child mapping
    /// is dropped, the value stored, and the key propagated dirty in every
    /// reachable root.
    pub fn set(&self, key: impl Into<Key>, value: impl Into<Value>) -> Result<(), Error> {
        let key = key.into();
        let value = value.into();
        let target = self.field_target()?;
        let old = self.read_field(&key)?;
        if let Some(old) = &old {
            if Value::same_identity(old, &value) {
                return Ok(());
            }
        }
        if self.node.borrow().target.is_frozen() {
            return Err(Error::Frozen);
        }
        graph::detach_child(&self.node, &key);
        if value.is_structured() {
            graph::adopt(&self.node, &key, &value)?;
        }
        match target {
            FieldTarget::Record(rc) => {
                rc.borrow_mut().set(key.clone(), value);
            }
            FieldTarget::List(rc) => {
                let index = key.as_index().ok_or(Error::IndexExpected)?;
                rc.borrow_mut().set(index, value);
            }
        }
        propagate(&self.node, Some(&key));
        Ok(())
    }

    /// Delete a field. Propagation runs *before* removal, while the path is
    /// still resolvable against the pre-delete graph. On lists the slot is
    /// emptied to `Null` (a hole); the length is unchanged.
    pub fn delete(&self, key: impl Into<Key>) -> Result<bool, Error> {
        let key = key.into();
        let target = self.field_target()?;
        if !self.has(key.clone())? {
            return Ok(false);
        }
        if self.node.borrow().target.is_frozen() {
            return Err(Error::Frozen);
        }
        propagate(&self.node, Some(&key));
        graph::detach_child(&self.node, &key);
        match target {
            FieldTarget::Record(rc) => {
                rc.borrow_mut().remove(&key);
            }
            FieldTarget::List(rc) => {
                let index = key.as_index().ok_or(Error::IndexExpected)?;
                rc.borrow_mut().set(index, Value::Null);
            }
        }
        Ok(true)
    }

    // ── List conveniences ─────────────────────────────────────────────────

    /// Append to a list: equivalent to writing at index `len`.
    pub fn push(&self, value: impl Into<Value>) -> Result<(), Error> {
        let len = self.list_target()?.borrow().len();
        self.set(Key::Index(len), value)
    }

    /// Remove and return the last element. The index is propagated dirty
    /// before removal.
    pub fn pop(&self) -> Result<Option<Value>, Error> {
        let rc = self.list_target()?;
        let len = rc.borrow().len();
        if len == 0 {
            return Ok(None);
        }
        if self.node.borrow().target.is_frozen() {
            return Err(Error::Frozen);
        }
        let key = Key::Index(len - 1);
        let removed = rc.borrow().get(len - 1).cloned();
        propagate(&self.node, Some(&key));
        graph::detach_child(&self.node, &key);
        rc.borrow_mut().truncate(len - 1);
        Ok(removed)
    }

    /// Insert at `index`, shifting later elements up by one. Every index
    /// from the insertion point to the new end holds a different value
    /// afterwards, so all of them are recorded dirty in one batched
    /// propagation (subscribers see a single notification per change set).
    pub fn insert(&self, index: usize, value: impl Into<Value>) -> Result<(), Error> {
        let rc = self.list_target()?;
        let len = rc.borrow().len();
        if index >= len {
            return self.set(Key::Index(index), value);
        }
        if self.node.borrow().target.is_frozen() {
            return Err(Error::Frozen);
        }
        // The shifted tail's cached child mappings all describe stale
        // indices now.
        for i in index..len {
            graph::detach_child(&self.node, &Key::Index(i));
        }
        rc.borrow_mut().insert(index, value.into());
        for i in index..=len {
            let shifted = rc.borrow().get(i).cloned();
            if let Some(shifted) = shifted {
                if shifted.is_structured() {
                    graph::adopt(&self.node, &Key::Index(i), &shifted)?;
                }
            }
        }
        let keys: Vec<Key> = (index..=len).map(Key::Index).collect();
        propagate_keys(&self.node, &keys);
        Ok(())
    }

    /// Shorten a list in one internal length change. Only the
    /// length-bearing path and the container path are marked dirty;
    /// individual truncated indices are not (accepted limitation of
    /// whole-length truncation).
    pub fn truncate(&self, len: usize) -> Result<(), Error> {
        let rc = self.list_target()?;
        let current = rc.borrow().len();
        if len >= current {
            return Ok(());
        }
        if self.node.borrow().target.is_frozen() {
            return Err(Error::Frozen);
        }
        for index in len..current {
            graph::detach_child(&self.node, &Key::Index(index));
        }
        rc.borrow_mut().truncate(len);
        propagate(&self.node, Some(&Key::from("length")));
        Ok(())
    }

    // ── Container views ───────────────────────────────────────────────────

    pub fn as_map(&self) -> Option<MapHandle> {
        match &self.node.borrow().target {
            Value::Map(rc) => Some(MapHandle::new(Rc::clone(&self.node), Rc::clone(rc))),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<SetHandle> {
        match &self.node.borrow().target {
            Value::Set(rc) => Some(SetHandle::new(Rc::clone(&self.node), Rc::clone(rc))),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<TimeHandle> {
        match &self.node.borrow().target {
            Value::Time(rc) => Some(TimeHandle::new(Rc::clone(&self.node), Rc::clone(rc))),
            _ => None,
        }
    }

    pub fn as_num_buf(&self) -> Option<NumBufHandle> {
        match &self.node.borrow().target {
            Value::NumBuf(rc) => Some(NumBufHandle::new(Rc::clone(&self.node), Rc::clone(rc))),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<BytesHandle> {
        match &self.node.borrow().target {
            Value::Bytes(rc) => Some(BytesHandle::new(Rc::clone(&self.node), Rc::clone(rc))),
            _ => None,
        }
    }

    /// Read a keyed-map child as its typed container handle; `None` when
    /// the field is absent or not a map.
    pub fn get_map(&self, key: impl Into<Key>) -> Result<Option<MapHandle>, Error> {
        Ok(self.get_handle(key)?.and_then(|h| h.as_map()))
    }

    pub fn get_set(&self, key: impl Into<Key>) -> Result<Option<SetHandle>, Error> {
        Ok(self.get_handle(key)?.and_then(|h| h.as_set()))
    }

    pub fn get_time(&self, key: impl Into<Key>) -> Result<Option<TimeHandle>, Error> {
        Ok(self.get_handle(key)?.and_then(|h| h.as_time()))
    }

    pub fn get_num_buf(&self, key: impl Into<Key>) -> Result<Option<NumBufHandle>, Error> {
        Ok(self.get_handle(key)?.and_then(|h| h.as_num_buf()))
    }

    pub fn get_bytes(&self, key: impl Into<Key>) -> Result<Option<BytesHandle>, Error> {
        Ok(self.get_handle(key)?.and_then(|h| h.as_bytes()))
    }

    /// Read a top-level field by its rendered path segment (the reverse of
    /// [`Key::segment`]); used for dirty-slice queries.
    pub(crate) fn get_by_segment(&self, segment: &str) -> Result<Option<Value>, Error> {
        match self.field_target()? {
            FieldTarget::Record(rc) => {
                let key = rc
                    .borrow()
                    .keys()
                    .find(|k| k.segment() == segment)
                    .cloned();
                match key {
                    Some(key) => self.get(key),
                    None => Ok(None),
                }
            }
            FieldTarget::List(_) => match segment.parse::<usize>() {
                Ok(index) => self.get(Key::Index(index)),
                Err(_) => Ok(None),
            },
        }
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn field_target(&self) -> Result<FieldTarget, Error> {
        match &self.node.borrow().target {
            Value::Record(rc) => Ok(FieldTarget::Record(Rc::clone(rc))),
            Value::List(rc) => Ok(FieldTarget::List(Rc::clone(rc))),
            _ => Err(Error::WrongKind),
        }
    }

    fn list_target(&self) -> Result<Shared<List>, Error> {
        match &self.node.borrow().target {
            Value::List(rc) => Ok(Rc::clone(rc)),
            _ => Err(Error::WrongKind),
        }
    }

    fn read_field(&self, key: &Key) -> Result<Option<Value>, Error> {
        match self.field_target()? {
            FieldTarget::Record(rc) => Ok(rc.borrow().get(key).cloned()),
            FieldTarget::List(rc) => {
                let index = key.as_index().ok_or(Error::IndexExpected)?;
                Ok(rc.borrow().get(index).cloned())
            }
        }
    }
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.node, &other.node)
    }
}

impl Eq for Handle {}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle")
            .field("target", &self.node.borrow().target)
            .finish()
    }
}
