use telltale::{Key, ScalarKey, Tracker, Value};

fn root_with(key: &str, value: Value) -> Tracker {
    let root = Value::record();
    if let Value::Record(rc) = &root {
        rc.borrow_mut().set(Key::from(key), value);
    }
    Tracker::new(root).unwrap()
}

#[test]
fn map_mutators_mark_the_container_path_only() {
    let tracker = root_with("lookup", Value::map());
    let map = tracker.handle().get_map("lookup").unwrap().unwrap();

    map.set("k", 1i64);
    assert_eq!(tracker.dirty_paths(), vec!["lookup"]);

    tracker.mark_clean();
    map.delete(&ScalarKey::from("k"));
    assert_eq!(tracker.dirty_paths(), vec!["lookup"]);

    tracker.mark_clean();
    map.clear();
    assert_eq!(tracker.dirty_paths(), vec!["lookup"]);
}

#[test]
fn map_readers_never_mark_anything() {
    let tracker = root_with("lookup", Value::map());
    let map = tracker.handle().get_map("lookup").unwrap().unwrap();
    map.set("k", 1i64);
    tracker.mark_clean();

    assert!(matches!(map.get(&ScalarKey::from("k")), Some(Value::Int(1))));
    assert!(map.has(&ScalarKey::from("k")));
    assert_eq!(map.size(), 1);
    assert_eq!(map.keys(), vec![ScalarKey::from("k")]);
    assert_eq!(map.entries().len(), 1);
    assert!(!tracker.is_dirty());
}

#[test]
fn set_granularity() {
    let tracker = root_with("tags", Value::set());
    let set = tracker.handle().get_set("tags").unwrap().unwrap();

    assert!(set.add("a"));
    assert_eq!(tracker.dirty_paths(), vec!["tags"]);

    tracker.mark_clean();
    // Re-adding an existing element still ran the mutating method, so the
    // container is marked even though the set is unchanged.
    assert!(!set.add("a"));
    assert_eq!(tracker.dirty_paths(), vec!["tags"]);

    tracker.mark_clean();
    assert!(set.has(&ScalarKey::from("a")));
    assert_eq!(set.size(), 1);
    assert_eq!(set.elems(), vec![ScalarKey::from("a")]);
    assert!(!tracker.is_dirty());

    set.delete(&ScalarKey::from("a"));
    assert_eq!(tracker.dirty_paths(), vec!["tags"]);
}

#[test]
fn time_granularity() {
    let tracker = root_with("updated_at", Value::time(0));
    let time = tracker.handle().get_time("updated_at").unwrap().unwrap();

    assert_eq!(time.get_time(), 0);
    assert_eq!(time.year(), 1970);
    assert!(!tracker.is_dirty());

    time.set_time(86_400_000);
    assert_eq!(tracker.dirty_paths(), vec!["updated_at"]);

    tracker.mark_clean();
    assert!(time.set_year(2001));
    assert_eq!(tracker.dirty_paths(), vec!["updated_at"]);

    tracker.mark_clean();
    time.to_rfc3339();
    assert!(!tracker.is_dirty());
}

#[test]
fn num_buffer_granularity() {
    let tracker = root_with("samples", Value::num_buf(vec![3.0, 1.0, 2.0]));
    let buf = tracker.handle().get_num_buf("samples").unwrap().unwrap();

    assert_eq!(buf.get(0), Some(3.0));
    assert_eq!(buf.slice(0, 2), vec![3.0, 1.0]);
    assert_eq!(buf.len(), 3);
    assert!(!tracker.is_dirty());

    buf.sort();
    assert_eq!(tracker.dirty_paths(), vec!["samples"]);
    assert_eq!(buf.slice(0, 3), vec![1.0, 2.0, 3.0]);

    tracker.mark_clean();
    buf.set(0, 9.0);
    buf.fill(0.0);
    buf.reverse();
    buf.copy_within(1, 0, 1);
    // Four mutations, one idempotent path.
    assert_eq!(tracker.dirty_paths(), vec!["samples"]);
}

#[test]
fn byte_buffer_granularity() {
    let tracker = root_with("blob", Value::bytes(vec![0; 8]));
    let bytes = tracker.handle().get_bytes("blob").unwrap().unwrap();

    assert_eq!(bytes.get_u32(0), Some(0));
    assert_eq!(bytes.len(), 8);
    assert!(!tracker.is_dirty());

    assert!(bytes.set_u16(2, 0xBEEF));
    assert_eq!(tracker.dirty_paths(), vec!["blob"]);
    assert_eq!(bytes.get_u16(2), Some(0xBEEF));

    tracker.mark_clean();
    // An out-of-range write fails on the underlying buffer but the
    // mutating method still ran; the container is marked regardless.
    assert!(!bytes.set_f64(4, 1.0));
    assert_eq!(tracker.dirty_paths(), vec!["blob"]);

    tracker.mark_clean();
    bytes.fill(0xFF);
    assert_eq!(tracker.dirty_paths(), vec!["blob"]);
}

#[test]
fn nested_container_marks_its_ancestors_too() {
    let assets = Value::record();
    if let Value::Record(rc) = &assets {
        rc.borrow_mut().set(Key::from("blob"), Value::bytes(vec![0; 4]));
    }
    let tracker = root_with("assets", assets);

    let bytes = tracker
        .handle()
        .get_handle("assets")
        .unwrap()
        .unwrap()
        .get_bytes("blob")
        .unwrap()
        .unwrap();
    bytes.set_u8(0, 7);

    assert_eq!(tracker.dirty_paths(), vec!["assets.blob", "assets"]);
}

#[test]
fn container_shared_across_trackers_fans_out() {
    let shared = Value::map();
    let tracker1 = root_with("m1", shared.clone());
    let tracker2 = root_with("m2", shared.clone());

    let map = tracker1.handle().get_map("m1").unwrap().unwrap();
    map.set("k", 1i64);

    assert_eq!(tracker1.dirty_paths(), vec!["m1"]);
    assert_eq!(tracker2.dirty_paths(), vec!["m2"]);
}

#[test]
fn container_entries_are_not_tracked_per_key() {
    let tracker = root_with("lookup", Value::map());
    let map = tracker.handle().get_map("lookup").unwrap().unwrap();
    map.set("nested", Value::record());
    tracker.mark_clean();

    // A record stored inside a map is outside the tracked graph: mutating
    // it through a plain borrow records nothing anywhere.
    if let Some(Value::Record(rc)) = map.get(&ScalarKey::from("nested")) {
        rc.borrow_mut().set(Key::from("x"), Value::Int(1));
    }
    assert!(!tracker.is_dirty());
}

#[test]
fn dirty_paths_order_is_first_recording_order() {
    let tracker = root_with("tags", Value::set());
    let root = tracker.handle();
    root.set("name", "a").unwrap();
    let set = root.get_set("tags").unwrap().unwrap();
    set.add(1i64);
    root.set("name", "b").unwrap();

    assert_eq!(tracker.dirty_paths(), vec!["name", "tags"]);
}
