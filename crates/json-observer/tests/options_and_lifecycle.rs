use json_observer::{
    Atom, ConfigurationError, Entry, ObserveError, ObserveOptions, Observable, Observer, TypeConstraintError, Value,
};
use serde_json::json;

#[test]
fn options_from_json_feed_registration() {
    let root = Observable::from(json!({"a": 1})).unwrap();
    let observer = Observer::from_fn(|_| {});
    let options = ObserveOptions::from_json(&json!({"pathsFrom": "a"})).unwrap();
    root.observe(&observer, options).unwrap();
    assert_eq!(root.observer_count().unwrap(), 1);
}

#[test]
fn malformed_options_are_configuration_errors() {
    let cases = [
        (json!({"path": "a", "pathsFrom": "a"}), ConfigurationError::ExclusiveOptions),
        (json!({"depth": 1}), ConfigurationError::UnknownOption("depth".into())),
        (json!({"path": ""}), ConfigurationError::InvalidPath { option: "path" }),
        (json!({"path": ["a"]}), ConfigurationError::InvalidPath { option: "path" }),
        (json!(true), ConfigurationError::NotAnObject),
    ];
    for (options, expected) in cases {
        assert_eq!(ObserveOptions::from_json(&options), Err(expected), "options {options}");
    }
}

#[test]
fn rejected_registration_leaves_registry_untouched() {
    let root = Observable::from(json!([])).unwrap();
    let observer = Observer::from_fn(|_| {});
    let result = root.observe(&observer, ObserveOptions::paths_from(""));
    assert_eq!(
        result,
        Err(ObserveError::Configuration(ConfigurationError::InvalidPath { option: "pathsFrom" }))
    );
    assert_eq!(root.observer_count().unwrap(), 0);
}

#[test]
fn from_rejects_leaves_and_existing_observables() {
    let atoms = [
        Atom::Date(1_700_000_000_000),
        Atom::Error("bad".into()),
        Atom::RegExp { source: "a+".into(), flags: "g".into() },
        Atom::BoxedString("s".into()),
    ];
    for atom in atoms {
        assert!(matches!(
            Observable::from(Value::Atom(atom)),
            Err(TypeConstraintError::AtomicLeaf { .. })
        ));
    }
    assert!(matches!(Observable::from(json!("text")), Err(TypeConstraintError::NotComposite { .. })));

    let root = Observable::from(json!({"inner": {}})).unwrap();
    let inner = root.get("inner").unwrap().and_then(Entry::into_node).unwrap();
    assert_eq!(Observable::from(inner).unwrap_err(), TypeConstraintError::AlreadyObservable);
}

#[test]
fn atoms_are_stored_as_leaves() {
    let mut record = json_observer::Record::new();
    record.insert("at".into(), Value::Atom(Atom::Date(5)));
    let root = Observable::from(Value::Object(record)).unwrap();
    let entry = root.get("at").unwrap().unwrap();
    assert_eq!(entry.as_value(), Some(&Value::Atom(Atom::Date(5))));
}

#[test]
fn revoke_detaches_every_handle() {
    let root = Observable::from(json!({"a": {"b": [1]}})).unwrap();
    let b = root.get_in_str("a.b").unwrap().and_then(Entry::into_node).unwrap();
    let clone = root.clone();

    let plain = root.revoke().unwrap();
    assert_eq!(plain, Value::from(json!({"a": {"b": [1]}})));
    assert_eq!(clone.revoke().unwrap(), plain);
    assert!(!b.is_live());
    assert_eq!(b.append([2]), Err(ObserveError::InvalidState));
    assert_eq!(clone.get("a").map(|e| e.is_some()), Err(ObserveError::InvalidState));
}

#[test]
fn reserved_method_names_are_ordinary_keys() {
    let root = Observable::from(json!({"observe": 1, "revoke": {"unobserve": true}})).unwrap();
    root.set("observe", 2).unwrap();
    assert_eq!(
        root.snapshot().unwrap(),
        Value::from(json!({"observe": 2, "revoke": {"unobserve": true}}))
    );
}
