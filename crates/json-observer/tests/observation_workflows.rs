use std::cell::RefCell;
use std::rc::Rc;

use json_observer::{Change, ChangeKind, Entry, Handle, Key, ObserveOptions, Observable, Observer, Value};
use serde_json::json;

type Batches = Rc<RefCell<Vec<Vec<Change>>>>;

fn collecting() -> (Observer, Batches) {
    let batches: Batches = Rc::new(RefCell::new(Vec::new()));
    let sink = batches.clone();
    let observer = Observer::from_fn(move |changes| sink.borrow_mut().push(changes.to_vec()));
    (observer, batches)
}

fn observed(value: serde_json::Value) -> (Observable, Batches) {
    let root = Observable::from(value).unwrap();
    let (observer, batches) = collecting();
    root.observe(&observer, ObserveOptions::new()).unwrap();
    (root, batches)
}

fn child(handle: &Handle, path: &str) -> Handle {
    handle.get_in_str(path).unwrap().and_then(Entry::into_node).unwrap()
}

fn v(value: serde_json::Value) -> Value {
    Value::from(value)
}

#[test]
fn revoke_returns_the_original_value() {
    let source = json!({"a": [1, {"b": null}], "c": "s", "d": {}});
    let root = Observable::from(source.clone()).unwrap();
    assert_eq!(root.revoke().unwrap(), v(source));
}

#[test]
fn setting_current_value_never_dispatches() {
    let (root, batches) = observed(json!({"n": 1, "o": {"list": [1, 2]}}));
    root.set("n", 1).unwrap();
    root.set("o", json!({"list": [1, 2]})).unwrap();
    child(&root, "o.list").set(Key::Index(0), 1).unwrap();
    assert!(batches.borrow().is_empty());
}

#[test]
fn delete_reports_removed_value() {
    let (root, batches) = observed(json!({"keep": 1, "gone": {"deep": [true]}}));
    let removed = root.delete("gone").unwrap();
    assert_eq!(removed, Some(v(json!({"deep": [true]}))));
    let batches = batches.borrow();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0], vec![Change::delete(vec![Key::from("gone")], v(json!({"deep": [true]})))]);
}

#[test]
fn append_reports_inserts_in_order() {
    let (root, batches) = observed(json!({"list": [0, 1, 2, 3]}));
    let list = child(&root, "list");
    assert_eq!(list.append(["a", "b"]).unwrap(), 6);
    let batches = batches.borrow();
    assert_eq!(batches.len(), 1);
    assert_eq!(
        batches[0],
        vec![
            Change::insert(vec![Key::from("list"), Key::Index(4)], Value::from("a")),
            Change::insert(vec![Key::from("list"), Key::Index(5)], Value::from("b")),
        ]
    );
}

#[test]
fn remove_first_twice_dispatches_twice() {
    let (root, batches) = observed(json!([1, 2, 3]));
    assert_eq!(root.remove_first().unwrap(), Some(Value::from(1)));
    assert_eq!(root.remove_first().unwrap(), Some(Value::from(2)));
    assert_eq!(root.snapshot().unwrap(), v(json!([3])));
    let batches = batches.borrow();
    assert_eq!(
        *batches,
        vec![
            vec![Change::delete(vec![Key::Index(0)], Value::from(1))],
            vec![Change::delete(vec![Key::Index(0)], Value::from(2))],
        ]
    );
}

#[test]
fn splice_pairs_update_then_insert() {
    let (root, batches) = observed(json!([0, 3, 4, "a", "b"]));
    let removed = root.splice(0, 1, ["x", "y"]).unwrap();
    assert_eq!(removed, vec![Value::from(0)]);
    assert_eq!(root.snapshot().unwrap(), v(json!(["x", "y", 3, 4, "a", "b"])));
    let batches = batches.borrow();
    assert_eq!(
        *batches,
        vec![vec![
            Change::update(vec![Key::Index(0)], Value::from("x"), Value::from(0)),
            Change::insert(vec![Key::Index(1)], Value::from("y")),
        ]]
    );
}

#[test]
fn reverse_keeps_child_paths_correct() {
    let (root, batches) = observed(json!({"rows": [{"id": 1}, {"id": 2}, {"id": 3}]}));
    let rows = child(&root, "rows");
    let first = child(&rows, "0");
    rows.reverse().unwrap();
    first.set("id", 10).unwrap();

    assert_eq!(first.path().unwrap(), vec![Key::from("rows"), Key::Index(2)]);
    let batches = batches.borrow();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0], vec![Change::reverse(vec![Key::from("rows")])]);
    assert_eq!(batches[1][0].path_string(), "rows.2.id");
    assert_eq!(batches[1][0].kind, ChangeKind::Update);
    assert_eq!(batches[1][0].old_value, Some(Value::from(1)));
}

#[test]
fn path_filters_select_records() {
    let root = Observable::from(json!({"a": {"b": 1, "c": 2}, "z": 0})).unwrap();
    let (exact, exact_seen) = collecting();
    let (prefix, prefix_seen) = collecting();
    root.observe(&exact, ObserveOptions::path("a.b")).unwrap();
    root.observe(&prefix, ObserveOptions::paths_from("a")).unwrap();

    let a = child(&root, "a");
    a.set("b", 10).unwrap();
    a.set("c", 20).unwrap();
    root.set("z", 1).unwrap();

    let exact_paths: Vec<String> = exact_seen.borrow().iter().flatten().map(Change::path_string).collect();
    let prefix_paths: Vec<String> = prefix_seen.borrow().iter().flatten().map(Change::path_string).collect();
    assert_eq!(exact_paths, vec!["a.b"]);
    assert_eq!(prefix_paths, vec!["a.b", "a.c"]);

    root.unobserve(&[exact.clone()]).unwrap();
    a.set("b", 11).unwrap();
    assert_eq!(exact_seen.borrow().len(), 1);
    assert_eq!(prefix_seen.borrow().len(), 3);
}

#[test]
fn composite_assigned_by_set_is_observed() {
    let (root, batches) = observed(json!({}));
    root.set("profile", json!({"tags": []})).unwrap();
    let tags = child(&root, "profile.tags");
    tags.append(["x"]).unwrap();

    let batches = batches.borrow();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0][0].kind, ChangeKind::Insert);
    assert_eq!(batches[0][0].value, Some(v(json!({"tags": []}))));
    assert_eq!(batches[1][0].path_string(), "profile.tags.0");
}

#[test]
fn duplicate_registration_delivers_once() {
    let root = Observable::from(json!([])).unwrap();
    let (observer, batches) = collecting();
    root.observe(&observer, ObserveOptions::new()).unwrap();
    root.observe(&observer, ObserveOptions::new()).unwrap();
    root.append([1]).unwrap();
    assert_eq!(batches.borrow().len(), 1);
}

#[test]
fn unobserve_without_arguments_removes_all() {
    let (root, batches) = observed(json!({}));
    let (other, other_batches) = collecting();
    root.observe(&other, ObserveOptions::new()).unwrap();
    assert_eq!(root.observer_count().unwrap(), 2);
    root.unobserve(&[]).unwrap();
    root.set("k", 1).unwrap();
    assert!(batches.borrow().is_empty());
    assert!(other_batches.borrow().is_empty());
}

#[test]
fn records_carry_plain_values() {
    let (root, batches) = observed(json!({"o": {"x": 1}}));
    root.set("o", json!({"y": 2})).unwrap();
    let batches = batches.borrow();
    let change = &batches[0][0];
    assert_eq!(change.value, Some(v(json!({"y": 2}))));
    assert_eq!(change.old_value, Some(v(json!({"x": 1}))));
    assert_eq!(
        change.to_json(),
        json!({"type": "update", "path": ["o"], "value": {"y": 2}, "oldValue": {"x": 1}})
    );
}
