//! Deep-clone snapshots.
//!
//! [`deep_clone`] is the baseline-copy collaborator: it copies a value's
//! entire structure into fresh identities, so the copy is invisible to any
//! tracking graph built over the original. Shared sub-values stay shared in
//! the copy (the same source identity maps to the same clone), which also
//! makes the walk cycle-tolerant.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::value::{List, Record, Value, ValueId};

/// Recursively copy `value` into fresh identities.
pub fn deep_clone(value: &Value) -> Value {
    let mut seen: HashMap<ValueId, Value> = HashMap::new();
    clone_inner(value, &mut seen)
}

fn clone_inner(value: &Value, seen: &mut HashMap<ValueId, Value>) -> Value {
    let id = match value.identity() {
        Some(id) => id,
        None => return value.clone(),
    };
    if let Some(done) = seen.get(&id) {
        return done.clone();
    }
    match value {
        Value::Record(rc) => {
            let out = Rc::new(RefCell::new(Record::new()));
            seen.insert(id, Value::Record(Rc::clone(&out)));
            for (key, field) in rc.borrow().iter() {
                out.borrow_mut().set(key.clone(), clone_inner(field, seen));
            }
            if rc.borrow().is_frozen() {
                out.borrow_mut().freeze();
            }
            Value::Record(out)
        }
        Value::List(rc) => {
            let out = Rc::new(RefCell::new(List::new()));
            seen.insert(id, Value::List(Rc::clone(&out)));
            for (index, item) in rc.borrow().iter().enumerate() {
                out.borrow_mut().set(index, clone_inner(item, seen));
            }
            if rc.borrow().is_frozen() {
                out.borrow_mut().freeze();
            }
            Value::List(out)
        }
        Value::Map(rc) => {
            let out = Value::map();
            seen.insert(id, out.clone());
            if let Value::Map(dst) = &out {
                for (key, entry) in rc.borrow().entries() {
                    dst.borrow_mut().set(key.clone(), clone_inner(entry, seen));
                }
            }
            out
        }
        Value::Set(rc) => {
            let out = Value::set();
            seen.insert(id, out.clone());
            if let Value::Set(dst) = &out {
                for elem in rc.borrow().iter() {
                    dst.borrow_mut().add(elem.clone());
                }
            }
            out
        }
        Value::Time(rc) => {
            let out = Value::Time(Rc::new(RefCell::new(rc.borrow().clone())));
            seen.insert(id, out.clone());
            out
        }
        Value::NumBuf(rc) => {
            let out = Value::NumBuf(Rc::new(RefCell::new(rc.borrow().clone())));
            seen.insert(id, out.clone());
            out
        }
        Value::Bytes(rc) => {
            let out = Value::Bytes(Rc::new(RefCell::new(rc.borrow().clone())));
            seen.insert(id, out.clone());
            out
        }
        _ => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Key;

    #[test]
    fn clone_produces_fresh_identities() {
        let inner = Value::record();
        let root = Value::record();
        if let Value::Record(rc) = &root {
            rc.borrow_mut().set(Key::from("inner"), inner.clone());
        }
        let copy = deep_clone(&root);
        assert_ne!(root.identity(), copy.identity());
        if let Value::Record(rc) = &copy {
            let copied_inner = rc.borrow().get(&Key::from("inner")).cloned();
            assert_ne!(copied_inner.and_then(|v| v.identity()), inner.identity());
        } else {
            panic!("copy should be a record");
        }
    }

    #[test]
    fn shared_subvalue_stays_shared_in_the_copy() {
        let shared = Value::record();
        let root = Value::record();
        if let Value::Record(rc) = &root {
            rc.borrow_mut().set(Key::from("a"), shared.clone());
            rc.borrow_mut().set(Key::from("b"), shared.clone());
        }
        let copy = deep_clone(&root);
        if let Value::Record(rc) = &copy {
            let a = rc.borrow().get(&Key::from("a")).cloned();
            let b = rc.borrow().get(&Key::from("b")).cloned();
            assert_eq!(
                a.and_then(|v| v.identity()),
                b.and_then(|v| v.identity())
            );
        } else {
            panic!("copy should be a record");
        }
    }

    #[test]
    fn cyclic_structure_terminates() {
        let root = Value::record();
        if let Value::Record(rc) = &root {
            rc.borrow_mut().set(Key::from("me"), root.clone());
        }
        let copy = deep_clone(&root);
        if let (Value::Record(orig), Value::Record(rc)) = (&root, &copy) {
            let me = rc.borrow().get(&Key::from("me")).cloned();
            let me_id = me.and_then(|v| v.identity());
            assert_eq!(me_id, copy.identity());
            assert_ne!(me_id, Value::Record(Rc::clone(orig)).identity());
        } else {
            panic!("copy should be a record");
        }
    }
}
