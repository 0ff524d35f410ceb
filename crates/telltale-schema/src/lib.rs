//! Schema validation and default filling for telltale trackers.
//!
//! A [`Shape`] describes the known form of a structure. Feeding a raw
//! partial input through [`Shape::canonicalize`] validates it and fills
//! missing fields from their defaults, producing the fully defaulted
//! structure a [`telltale::Tracker`] starts from, or a validation error
//! naming the offending path. The tracking core only sees this crate
//! through the [`telltale::Canonicalize`] trait.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use telltale::{Tracker, Value};
//! use telltale_schema::{Field, ScalarKind, Shape};
//!
//! let shape = Shape::record([
//!     ("title", Field::required(Shape::Scalar(ScalarKind::Str))),
//!     ("count", Field::optional(Shape::Scalar(ScalarKind::Int), Value::Int(0))),
//! ]);
//!
//! let tracker =
//!     Tracker::with_schema(&shape, Value::from_json(json!({"title": "hi"}))).unwrap();
//! assert_eq!(tracker.handle().to_json(), json!({"title": "hi", "count": 0}));
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use telltale::{Canonicalize, SchemaError};
use telltale_value::{deep_clone, ContainerKind, Key, List, Record, Value};

/// Scalar type tags for leaf fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarKind {
    Bool,
    Int,
    Float,
    Str,
}

/// One declared field of a record shape.
#[derive(Clone, Debug)]
pub struct Field {
    pub shape: Shape,
    pub default: Option<Value>,
}

impl Field {
    /// A field that must be present in the raw input.
    pub fn required(shape: Shape) -> Self {
        Self {
            shape,
            default: None,
        }
    }

    /// A field filled from `default` when absent. The default is
    /// deep-cloned on every use, so two canonicalized structures never
    /// share a defaulted sub-value.
    pub fn optional(shape: Shape, default: Value) -> Self {
        Self {
            shape,
            default: Some(default),
        }
    }
}

/// The declared form of a structure.
#[derive(Clone, Debug, Default)]
pub enum Shape {
    /// Anything goes; the raw value passes through unchanged.
    #[default]
    Any,
    Scalar(ScalarKind),
    Record(IndexMap<String, Field>),
    List(Box<Shape>),
    Container(ContainerKind),
}

impl Shape {
    /// Convenience constructor for record shapes.
    pub fn record<K: Into<String>>(fields: impl IntoIterator<Item = (K, Field)>) -> Self {
        Shape::Record(
            fields
                .into_iter()
                .map(|(name, field)| (name.into(), field))
                .collect(),
        )
    }

    pub fn list(element: Shape) -> Self {
        Shape::List(Box::new(element))
    }

    /// Validate `raw` against this shape and fill defaults, producing the
    /// canonical structure. Valid structured sub-values keep their
    /// identity; record and list shells are rebuilt so the caller's raw
    /// input is never mutated.
    pub fn canonicalize(&self, raw: Value) -> Result<Value, SchemaError> {
        canonicalize_at(self, raw, &mut Vec::new())
    }
}

impl Canonicalize for Shape {
    fn canonicalize(&self, raw: Value) -> Result<Value, SchemaError> {
        Shape::canonicalize(self, raw)
    }
}

fn canonicalize_at(shape: &Shape, raw: Value, path: &mut Vec<String>) -> Result<Value, SchemaError> {
    match shape {
        Shape::Any => Ok(raw),
        Shape::Scalar(kind) => canonicalize_scalar(*kind, raw, path),
        Shape::Record(fields) => canonicalize_record(fields, raw, path),
        Shape::List(element) => canonicalize_list(element, raw, path),
        Shape::Container(kind) => match ContainerKind::of(&raw) {
            Some(found) if found == *kind => Ok(raw),
            _ => Err(error_at(path, format!("expected {kind:?} container"))),
        },
    }
}

fn canonicalize_scalar(
    kind: ScalarKind,
    raw: Value,
    path: &mut Vec<String>,
) -> Result<Value, SchemaError> {
    match (kind, raw) {
        (ScalarKind::Bool, Value::Bool(b)) => Ok(Value::Bool(b)),
        (ScalarKind::Int, Value::Int(i)) => Ok(Value::Int(i)),
        (ScalarKind::Float, Value::Float(f)) => Ok(Value::Float(f)),
        // Integers widen into float fields.
        (ScalarKind::Float, Value::Int(i)) => Ok(Value::Float(i as f64)),
        (ScalarKind::Str, Value::Str(s)) => Ok(Value::Str(s)),
        (kind, other) => Err(error_at(
            path,
            format!("expected {kind:?} scalar, found {}", kind_name(&other)),
        )),
    }
}

fn canonicalize_record(
    fields: &IndexMap<String, Field>,
    raw: Value,
    path: &mut Vec<String>,
) -> Result<Value, SchemaError> {
    let Value::Record(raw_rc) = &raw else {
        return Err(error_at(
            path,
            format!("expected record, found {}", kind_name(&raw)),
        ));
    };

    // Reject fields the shape does not declare.
    for key in raw_rc.borrow().keys() {
        let named = matches!(key, Key::Str(name) if fields.contains_key(name.as_str()));
        if !named {
            path.push(key.segment());
            let err = error_at(path, "unknown field".to_owned());
            path.pop();
            return Err(err);
        }
    }

    let mut out = Record::new();
    for (name, field) in fields {
        let key = Key::Str(name.clone());
        let present = raw_rc.borrow().get(&key).cloned();
        path.push(name.clone());
        let value = match (present, &field.default) {
            (Some(value), _) => canonicalize_at(&field.shape, value, path)?,
            (None, Some(default)) => deep_clone(default),
            (None, None) => {
                let err = error_at(path, "missing required field".to_owned());
                path.pop();
                return Err(err);
            }
        };
        path.pop();
        out.set(key, value);
    }
    Ok(Value::Record(Rc::new(RefCell::new(out))))
}

fn canonicalize_list(
    element: &Shape,
    raw: Value,
    path: &mut Vec<String>,
) -> Result<Value, SchemaError> {
    let Value::List(raw_rc) = &raw else {
        return Err(error_at(
            path,
            format!("expected list, found {}", kind_name(&raw)),
        ));
    };
    let items: Vec<Value> = raw_rc.borrow().iter().cloned().collect();
    let mut out = List::new();
    for (index, item) in items.into_iter().enumerate() {
        path.push(index.to_string());
        let value = canonicalize_at(element, item, path)?;
        path.pop();
        out.set(index, value);
    }
    Ok(Value::List(Rc::new(RefCell::new(out))))
}

fn error_at(path: &[String], message: String) -> SchemaError {
    SchemaError::new(path.join("."), message)
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Int(_) => "int",
        Value::Float(_) => "float",
        Value::Str(_) => "string",
        Value::Record(_) => "record",
        Value::List(_) => "list",
        Value::Map(_) => "map",
        Value::Set(_) => "set",
        Value::Time(_) => "time",
        Value::NumBuf(_) => "numeric buffer",
        Value::Bytes(_) => "byte buffer",
    }
}
