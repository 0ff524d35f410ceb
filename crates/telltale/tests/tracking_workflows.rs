use serde_json::json;
use telltale::{Error, Key, Tracker, Value};

fn sorted(mut paths: Vec<String>) -> Vec<String> {
    paths.sort();
    paths
}

#[test]
fn nested_write_records_leaf_and_every_ancestor() {
    let tracker = Tracker::new(Value::from_json(json!({"a": {"b": {"c": 0}}}))).unwrap();
    let a = tracker.handle().get_handle("a").unwrap().unwrap();
    let b = a.get_handle("b").unwrap().unwrap();
    b.set("c", 1i64).unwrap();

    assert!(tracker.is_dirty());
    assert_eq!(tracker.dirty_paths(), vec!["a.b.c", "a.b", "a"]);
}

#[test]
fn reading_the_same_key_twice_yields_the_same_handle() {
    let tracker = Tracker::new(Value::from_json(json!({"a": {"b": 1}}))).unwrap();
    let first = tracker.handle().get_handle("a").unwrap().unwrap();
    let second = tracker.handle().get_handle("a").unwrap().unwrap();
    assert_eq!(first, second);

    let v1 = tracker.handle().get("a").unwrap().unwrap();
    let v2 = tracker.handle().get("a").unwrap().unwrap();
    assert_eq!(v1.identity(), v2.identity());
    assert!(!tracker.is_dirty());
}

#[test]
fn identical_write_is_a_dirtiness_noop() {
    let tracker = Tracker::new(Value::from_json(json!({"n": 3, "nested": {}}))).unwrap();
    let handle = tracker.handle();

    handle.set("n", 3i64).unwrap();
    let nested = handle.get("nested").unwrap().unwrap();
    handle.set("nested", nested).unwrap();

    assert!(!tracker.is_dirty());
}

#[test]
fn float_write_comparison_follows_the_host_operator() {
    let tracker = Tracker::new(Value::from_json(json!({"x": 0.0, "y": null}))).unwrap();
    let handle = tracker.handle();

    handle.set("y", f64::NAN).unwrap();
    tracker.mark_clean();
    // NaN over NaN counts as a change.
    handle.set("y", f64::NAN).unwrap();
    assert_eq!(tracker.dirty_paths(), vec!["y"]);

    tracker.mark_clean();
    // -0.0 over 0.0 does not.
    handle.set("x", -0.0).unwrap();
    assert!(!tracker.is_dirty());
}

#[test]
fn delete_records_the_path_and_removes_the_key() {
    let tracker = Tracker::new(Value::from_json(json!({"k": {"v": 1}, "other": 2}))).unwrap();
    let handle = tracker.handle();

    assert!(handle.delete("k").unwrap());
    assert_eq!(tracker.dirty_paths(), vec!["k"]);
    assert!(!handle.has("k").unwrap());

    // Deleting an absent key reports nothing.
    tracker.mark_clean();
    assert!(!handle.delete("k").unwrap());
    assert!(!tracker.is_dirty());
}

#[test]
fn mark_clean_resets_and_later_writes_record_again() {
    let tracker = Tracker::new(Value::from_json(json!({"a": {"b": 0}}))).unwrap();
    let a = tracker.handle().get_handle("a").unwrap().unwrap();

    a.set("b", 1i64).unwrap();
    assert!(tracker.is_dirty());
    tracker.mark_clean();
    assert!(!tracker.is_dirty());

    a.set("b", 2i64).unwrap();
    assert_eq!(tracker.dirty_paths(), vec!["a.b", "a"]);
}

#[test]
fn push_onto_tracked_list_records_index_and_container() {
    let tracker = Tracker::new(Value::from_json(json!({"items": []}))).unwrap();
    let items = tracker.handle().get_handle("items").unwrap().unwrap();
    items.push(1i64).unwrap();
    assert_eq!(tracker.dirty_paths(), vec!["items.0", "items"]);
}

#[test]
fn truncation_marks_length_and_container_only() {
    let tracker = Tracker::new(Value::from_json(json!({"items": [1, 2, 3]}))).unwrap();
    let items = tracker.handle().get_handle("items").unwrap().unwrap();
    items.truncate(1).unwrap();
    assert_eq!(
        sorted(tracker.dirty_paths()),
        vec!["items", "items.length"]
    );
    assert_eq!(items.len().unwrap(), 1);
}

#[test]
fn pop_records_the_removed_index() {
    let tracker = Tracker::new(Value::from_json(json!({"items": [7, 8]}))).unwrap();
    let items = tracker.handle().get_handle("items").unwrap().unwrap();
    let removed = items.pop().unwrap();
    assert!(matches!(removed, Some(Value::Int(8))));
    assert_eq!(tracker.dirty_paths(), vec!["items.1", "items"]);
    assert_eq!(items.len().unwrap(), 1);
}

#[test]
fn insert_records_every_shifted_index() {
    let tracker = Tracker::new(Value::from_json(json!({"items": [1, 3]}))).unwrap();
    let items = tracker.handle().get_handle("items").unwrap().unwrap();
    items.insert(1, 2i64).unwrap();

    assert_eq!(
        sorted(tracker.dirty_paths()),
        vec!["items", "items.1", "items.2"]
    );
    assert_eq!(items.to_json(), json!([1, 2, 3]));

    // Inserting past the end degenerates to a padded write at that index.
    tracker.mark_clean();
    items.insert(5, 9i64).unwrap();
    assert_eq!(tracker.dirty_paths(), vec!["items.5", "items"]);
    assert_eq!(items.len().unwrap(), 6);
}

#[test]
fn inserted_subtree_keeps_reporting_from_its_shifted_index() {
    let tracker = Tracker::new(Value::from_json(json!({"items": [{"n": 0}]}))).unwrap();
    let items = tracker.handle().get_handle("items").unwrap().unwrap();
    let first = items.get_handle(0usize).unwrap().unwrap();

    items.insert(0, 99i64).unwrap();
    tracker.mark_clean();

    // The record that used to live at index 0 now reports through index 1.
    first.set("n", 1i64).unwrap();
    assert_eq!(tracker.dirty_paths(), vec!["items.1.n", "items.1", "items"]);
}

#[test]
fn dirty_slice_requires_a_schema_backed_tracker() {
    let tracker = Tracker::new(Value::from_json(json!({"a": 1}))).unwrap();
    tracker.handle().set("a", 2i64).unwrap();
    assert!(matches!(
        tracker.dirty_top_level_slice(),
        Err(Error::NotSchemaBacked)
    ));
}

#[test]
fn symbol_keys_render_with_their_description() {
    let tracker = Tracker::new(Value::from_json(json!({}))).unwrap();
    let sym = telltale::Symbol::new("meta");
    tracker.handle().set(Key::Sym(sym), 1i64).unwrap();
    assert_eq!(tracker.dirty_paths(), vec!["Symbol(meta)"]);

    // A literal string key with the same text renders escaped, so the two
    // paths stay distinct.
    tracker.mark_clean();
    tracker.handle().set("Symbol(meta)", 2i64).unwrap();
    assert_eq!(tracker.dirty_paths(), vec!["\\Symbol(meta)"]);
}

#[test]
fn frozen_value_fails_tracker_construction() {
    let value = Value::from_json(json!({"a": 1}));
    if let Value::Record(rc) = &value {
        rc.borrow_mut().freeze();
    }
    assert!(matches!(Tracker::new(value), Err(Error::Frozen)));
}

#[test]
fn frozen_nested_value_fails_construction_too() {
    let value = Value::from_json(json!({"outer": {"inner": 1}}));
    if let Value::Record(rc) = &value {
        let inner = rc.borrow().get(&Key::from("outer")).cloned();
        if let Some(Value::Record(inner_rc)) = inner {
            inner_rc.borrow_mut().freeze();
        }
    }
    assert!(matches!(Tracker::new(value), Err(Error::Frozen)));
}

#[test]
fn writes_through_a_frozen_target_are_refused() {
    let value = Value::from_json(json!({"a": 1}));
    let tracker = Tracker::new(value.clone()).unwrap();
    if let Value::Record(rc) = &value {
        rc.borrow_mut().freeze();
    }
    assert!(matches!(
        tracker.handle().set("a", 2i64),
        Err(Error::Frozen)
    ));
    assert!(!tracker.is_dirty());
}

#[test]
fn untracked_value_queries_fail() {
    let loose = Value::from_json(json!({"x": 1}));
    assert!(!telltale::is_tracked(&loose));
    assert!(matches!(
        telltale::subscribe(&loose, |_| {}),
        Err(Error::NotTracked)
    ));
    assert!(matches!(
        telltale::subscribe_pull(&loose, true),
        Err(Error::NotTracked)
    ));
}

#[test]
fn field_access_on_container_targets_is_refused() {
    let root = Value::record();
    if let Value::Record(rc) = &root {
        rc.borrow_mut().set(Key::from("m"), Value::map());
    }
    let tracker = Tracker::new(root).unwrap();
    let map_handle = tracker.handle().get_handle("m").unwrap().unwrap();
    assert!(matches!(map_handle.get("k"), Err(Error::WrongKind)));
    assert!(matches!(map_handle.set("k", 1i64), Err(Error::WrongKind)));
    assert!(map_handle.as_map().is_some());
}

#[test]
fn baseline_snapshot_is_unaffected_by_mutation() {
    let tracker = Tracker::new(Value::from_json(json!({"a": {"b": 0}}))).unwrap();
    let a = tracker.handle().get_handle("a").unwrap().unwrap();
    a.set("b", 42i64).unwrap();

    assert_eq!(tracker.baseline().to_json(), json!({"a": {"b": 0}}));
    assert_eq!(tracker.handle().to_json(), json!({"a": {"b": 42}}));
}

#[test]
fn replaced_subtree_stops_reporting_through_the_old_path() {
    let tracker = Tracker::new(Value::from_json(json!({"a": {"b": 0}}))).unwrap();
    let old_a = tracker.handle().get_handle("a").unwrap().unwrap();

    tracker
        .handle()
        .set("a", Value::from_json(json!({"c": 1})))
        .unwrap();
    tracker.mark_clean();

    // The detached subtree is an orphan: it still reports into the change
    // set that owned it, but by its own path, not through `a`.
    old_a.set("b", 9i64).unwrap();
    assert_eq!(tracker.dirty_paths(), vec!["b"]);
}
