//! Conversion between [`Value`] and `serde_json::Value`.
//!
//! JSON objects become records and arrays become lists. Container
//! categories have no JSON source form; they serialize to a plain-data
//! projection (map → object, set → array, timestamp → RFC 3339 string,
//! numeric buffer → number array, bytes → integer array).

use std::collections::HashSet;

use serde_json::{Map, Number, Value as Json};

use crate::key::Key;
use crate::value::{ScalarKey, Value, ValueId};

impl Value {
    /// Build a value tree from JSON. Numbers land as `Int` when they fit
    /// `i64`, otherwise as `Float`.
    pub fn from_json(json: Json) -> Value {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Json::String(s) => Value::Str(s),
            Json::Array(items) => {
                let list = Value::list();
                if let Value::List(rc) = &list {
                    let mut inner = rc.borrow_mut();
                    for (index, item) in items.into_iter().enumerate() {
                        inner.set(index, Value::from_json(item));
                    }
                }
                list
            }
            Json::Object(map) => {
                let record = Value::record();
                if let Value::Record(rc) = &record {
                    let mut inner = rc.borrow_mut();
                    for (key, field) in map {
                        inner.set(Key::Str(key), Value::from_json(field));
                    }
                }
                record
            }
        }
    }

    /// Project the value to JSON. Re-visited shared values on the current
    /// descent (cycles) project to `null`.
    pub fn to_json(&self) -> Json {
        let mut on_stack = HashSet::new();
        to_json_inner(self, &mut on_stack)
    }
}

fn to_json_inner(value: &Value, on_stack: &mut HashSet<ValueId>) -> Json {
    if let Some(id) = value.identity() {
        if !on_stack.insert(id) {
            return Json::Null;
        }
        let out = structured_to_json(value, on_stack);
        on_stack.remove(&id);
        return out;
    }
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => Json::Number((*i).into()),
        Value::Float(f) => Number::from_f64(*f).map(Json::Number).unwrap_or(Json::Null),
        Value::Str(s) => Json::String(s.clone()),
        _ => Json::Null,
    }
}

fn structured_to_json(value: &Value, on_stack: &mut HashSet<ValueId>) -> Json {
    match value {
        Value::Record(rc) => {
            let mut map = Map::new();
            for (key, field) in rc.borrow().iter() {
                // Raw key text: the `\`-escape is a path-segment concern
                // and has no place in the data projection.
                map.insert(key.raw().into_owned(), to_json_inner(field, on_stack));
            }
            Json::Object(map)
        }
        Value::List(rc) => Json::Array(
            rc.borrow()
                .iter()
                .map(|item| to_json_inner(item, on_stack))
                .collect(),
        ),
        Value::Map(rc) => {
            let mut map = Map::new();
            for (key, entry) in rc.borrow().entries() {
                map.insert(scalar_key_string(key), to_json_inner(entry, on_stack));
            }
            Json::Object(map)
        }
        Value::Set(rc) => Json::Array(
            rc.borrow()
                .iter()
                .map(|elem| Json::String(scalar_key_string(elem)))
                .collect(),
        ),
        Value::Time(rc) => Json::String(rc.borrow().to_rfc3339()),
        Value::NumBuf(rc) => Json::Array(
            rc.borrow()
                .as_slice()
                .iter()
                .map(|n| Number::from_f64(*n).map(Json::Number).unwrap_or(Json::Null))
                .collect(),
        ),
        Value::Bytes(rc) => Json::Array(
            rc.borrow()
                .as_slice()
                .iter()
                .map(|b| Json::Number((*b).into()))
                .collect(),
        ),
        _ => Json::Null,
    }
}

fn scalar_key_string(key: &ScalarKey) -> String {
    match key {
        ScalarKey::Null => "null".to_owned(),
        ScalarKey::Bool(b) => b.to_string(),
        ScalarKey::Int(i) => i.to_string(),
        ScalarKey::Str(s) => s.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_roundtrip_preserves_shape_and_order() {
        let src = json!({"b": 1, "a": {"nested": [1, 2.5, "x", null, true]}});
        let value = Value::from_json(src.clone());
        assert_eq!(value.to_json(), src);
    }

    #[test]
    fn containers_project_to_plain_data() {
        let map = Value::map();
        if let Value::Map(rc) = &map {
            rc.borrow_mut().set(ScalarKey::from("k"), Value::Int(1));
        }
        assert_eq!(map.to_json(), json!({"k": 1}));

        let bytes = Value::bytes(vec![1, 2]);
        assert_eq!(bytes.to_json(), json!([1, 2]));
    }

    #[test]
    fn projection_emits_raw_keys_not_path_escaped_ones() {
        // Keys that would be escaped in a *path* string stay verbatim in
        // the data projection, so the round trip holds.
        let src = json!({"Symbol(test)": 1, "\\weird": 2});
        let value = Value::from_json(src.clone());
        assert_eq!(value.to_json(), src);

        let sym_keyed = Value::record();
        if let Value::Record(rc) = &sym_keyed {
            rc.borrow_mut()
                .set(Key::Sym(crate::key::Symbol::new("test")), Value::Int(3));
        }
        assert_eq!(sym_keyed.to_json(), json!({"Symbol(test)": 3}));
    }

    #[test]
    fn cycles_project_to_null() {
        let root = Value::record();
        if let Value::Record(rc) = &root {
            rc.borrow_mut().set(Key::from("me"), root.clone());
        }
        assert_eq!(root.to_json(), json!({"me": null}));
    }
}
