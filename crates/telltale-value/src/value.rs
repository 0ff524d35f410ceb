//! The [`Value`] enum and the field-level structured types.
//!
//! Structured variants hold `Rc<RefCell<..>>` payloads, so cloning a `Value`
//! shares the underlying data and its identity. Scalars are plain copies.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::containers::{ByteBuf, MapValue, NumBuffer, SetValue, TimeValue};
use crate::key::Key;

/// Shared, interiorly mutable payload of a structured value.
pub type Shared<T> = Rc<RefCell<T>>;

/// A dynamically shaped value.
///
/// `Record` and `List` are tracked field-by-field; the remaining structured
/// variants are container categories tracked at container granularity.
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Record(Shared<Record>),
    List(Shared<List>),
    Map(Shared<MapValue>),
    Set(Shared<SetValue>),
    Time(Shared<TimeValue>),
    NumBuf(Shared<NumBuffer>),
    Bytes(Shared<ByteBuf>),
}

/// Address-based identity of a structured value, stable for the payload's
/// lifetime. Used as the handle-graph registry key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ValueId(usize);

impl Value {
    pub fn record() -> Value {
        Value::Record(Rc::new(RefCell::new(Record::new())))
    }

    pub fn list() -> Value {
        Value::List(Rc::new(RefCell::new(List::new())))
    }

    pub fn map() -> Value {
        Value::Map(Rc::new(RefCell::new(MapValue::new())))
    }

    pub fn set() -> Value {
        Value::Set(Rc::new(RefCell::new(SetValue::new())))
    }

    pub fn time(millis: i64) -> Value {
        Value::Time(Rc::new(RefCell::new(TimeValue::from_millis(millis))))
    }

    pub fn num_buf(data: Vec<f64>) -> Value {
        Value::NumBuf(Rc::new(RefCell::new(NumBuffer::from_vec(data))))
    }

    pub fn bytes(data: Vec<u8>) -> Value {
        Value::Bytes(Rc::new(RefCell::new(ByteBuf::from_vec(data))))
    }

    /// True for the shared (reference-identity) variants.
    pub fn is_structured(&self) -> bool {
        self.identity().is_some()
    }

    /// Identity key for structured values; `None` for scalars.
    pub fn identity(&self) -> Option<ValueId> {
        let addr = match self {
            Value::Record(rc) => Rc::as_ptr(rc) as usize,
            Value::List(rc) => Rc::as_ptr(rc) as usize,
            Value::Map(rc) => Rc::as_ptr(rc) as usize,
            Value::Set(rc) => Rc::as_ptr(rc) as usize,
            Value::Time(rc) => Rc::as_ptr(rc) as usize,
            Value::NumBuf(rc) => Rc::as_ptr(rc) as usize,
            Value::Bytes(rc) => Rc::as_ptr(rc) as usize,
            _ => return None,
        };
        Some(ValueId(addr))
    }

    /// The write-comparison relation: structured values compare by reference
    /// identity, scalars by ordinary value equality.
    ///
    /// Float semantics follow the host comparison operator: assigning `NaN`
    /// over `NaN` counts as a change, assigning `-0.0` over `0.0` does not.
    /// Integers and floats compare numerically, as a single number line.
    pub fn same_identity(a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(x), Value::Bool(y)) => x == y,
            (Value::Int(x), Value::Int(y)) => x == y,
            (Value::Float(x), Value::Float(y)) => x == y,
            (Value::Int(x), Value::Float(y)) | (Value::Float(y), Value::Int(x)) => {
                *x as f64 == *y
            }
            (Value::Str(x), Value::Str(y)) => x == y,
            _ => match (a.identity(), b.identity()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }

    /// True when the value refuses tracking metadata (frozen record/list).
    pub fn is_frozen(&self) -> bool {
        match self {
            Value::Record(rc) => rc.borrow().is_frozen(),
            Value::List(rc) => rc.borrow().is_frozen(),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

// ── Record ─────────────────────────────────────────────────────────────────

/// An insertion-ordered key→value mapping tracked field-by-field.
///
/// Keys follow [`Key`] equality, so `record.set(Key::from(5), ..)` and
/// `record.get(&Key::from("5"))` address the same slot.
#[derive(Debug, Default)]
pub struct Record {
    fields: IndexMap<Key, Value>,
    frozen: bool,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &Key) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Insert or overwrite, returning the previous value. Overwrites keep
    /// the key's original insertion position.
    pub fn set(&mut self, key: Key, value: Value) -> Option<Value> {
        self.fields.insert(key, value)
    }

    /// Remove a field, preserving the order of the remaining fields.
    pub fn remove(&mut self, key: &Key) -> Option<Value> {
        self.fields.shift_remove(key)
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.fields.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.fields.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Value)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Seal the record: it can no longer be mutated or wrapped for tracking.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }
}

// ── List ───────────────────────────────────────────────────────────────────

/// An ordered sequence tracked index-by-index.
#[derive(Debug, Default)]
pub struct List {
    items: Vec<Value>,
    frozen: bool,
}

impl List {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(items: Vec<Value>) -> Self {
        Self {
            items,
            frozen: false,
        }
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    /// Write `value` at `index`, padding intermediate slots with `Null` when
    /// the index is past the end. Returns the previous value, if any.
    pub fn set(&mut self, index: usize, value: Value) -> Option<Value> {
        if index >= self.items.len() {
            self.items.resize(index + 1, Value::Null);
            self.items[index] = value;
            None
        } else {
            Some(std::mem::replace(&mut self.items[index], value))
        }
    }

    /// Insert at `index`, shifting later items up by one; pads with `Null`
    /// when the index is past the end.
    pub fn insert(&mut self, index: usize, value: Value) {
        if index >= self.items.len() {
            self.set(index, value);
        } else {
            self.items.insert(index, value);
        }
    }

    pub fn remove(&mut self, index: usize) -> Option<Value> {
        if index < self.items.len() {
            Some(self.items.remove(index))
        } else {
            None
        }
    }

    pub fn truncate(&mut self, len: usize) {
        self.items.truncate(len);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.items.iter()
    }

    /// Seal the list: it can no longer be mutated or wrapped for tracking.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }
}

// ── Scalar keys for container categories ───────────────────────────────────

/// Hashable scalar used as keyed-map keys and set elements.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ScalarKey {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
}

impl From<bool> for ScalarKey {
    fn from(v: bool) -> Self {
        ScalarKey::Bool(v)
    }
}

impl From<i64> for ScalarKey {
    fn from(v: i64) -> Self {
        ScalarKey::Int(v)
    }
}

impl From<&str> for ScalarKey {
    fn from(v: &str) -> Self {
        ScalarKey::Str(v.to_owned())
    }
}

impl From<String> for ScalarKey {
    fn from(v: String) -> Self {
        ScalarKey::Str(v)
    }
}
