//! Public handles: the [`Observable`] factory and root surface, and
//! [`Handle`] for reading and mutating any live node.
//!
//! All mutation goes through a handle method. Each method mutates the
//! graph, computes its records and releases the graph before delivering
//! them, so by the time a mutator returns every relevant observer has run.

use std::any::Any;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use json_observer_path::parse_path;

use crate::arena::{Cell, NodeId, NodeKind, Storage};
use crate::base::Graph;
use crate::change::Change;
use crate::error::{ObserveError, TypeConstraintError};
use crate::key::{Key, Path};
use crate::options::ObserveOptions;
use crate::registry::{Filter, Observer};
use crate::value::{Value, ValueKind};

// ── Handle ─────────────────────────────────────────────────────────────────

/// A stored child as seen through a handle.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// Primitive or atomic leaf, copied out.
    Value(Value),
    /// Tracked composite, still live.
    Node(Handle),
}

impl Entry {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Entry::Value(value) => Some(value),
            Entry::Node(_) => None,
        }
    }

    pub fn into_node(self) -> Option<Handle> {
        match self {
            Entry::Node(handle) => Some(handle),
            Entry::Value(_) => None,
        }
    }
}

/// Access to one tracked node of an observed graph.
///
/// Handles are cheap to clone and share the graph of their root. Once the
/// node is revoked, overwritten or removed, every method fails with
/// [`ObserveError::InvalidState`].
#[derive(Clone)]
pub struct Handle {
    graph: Rc<RefCell<Graph>>,
    id: NodeId,
}

impl Handle {
    fn read<R>(&self, f: impl FnOnce(&Graph, &Storage) -> R) -> Result<R, ObserveError> {
        let graph = self.graph.try_borrow().map_err(|_| ObserveError::Busy)?;
        let node = graph.node(self.id)?;
        Ok(f(&graph, &node.storage))
    }

    /// Apply a mutation, then deliver its records.
    fn mutate<R>(
        &self,
        op: impl FnOnce(&mut Graph, NodeId) -> Result<(R, Vec<Change>), ObserveError>,
    ) -> Result<R, ObserveError> {
        let (out, dispatch) = {
            let mut graph = self.graph.try_borrow_mut().map_err(|_| ObserveError::Busy)?;
            let (out, changes) = op(&mut graph, self.id)?;
            (out, graph.registry.dispatch(changes))
        };
        if let Some(dispatch) = dispatch {
            dispatch.deliver();
        }
        Ok(out)
    }

    fn entry(&self, cell: &Cell) -> Entry {
        match cell {
            Cell::Plain(value) => Entry::Value(value.clone()),
            Cell::Node(id) => Entry::Node(Handle { graph: self.graph.clone(), id: *id }),
        }
    }

    pub fn is_live(&self) -> bool {
        self.graph.try_borrow().map(|g| g.arena.contains(self.id)).unwrap_or(false)
    }

    pub fn kind(&self) -> Result<NodeKind, ObserveError> {
        self.read(|_, storage| storage.kind())
    }

    /// Absolute path of this node from its root.
    pub fn path(&self) -> Result<Path, ObserveError> {
        self.read(|graph, _| graph.arena.resolve_path(self.id))
    }

    pub fn len(&self) -> Result<usize, ObserveError> {
        self.read(|_, storage| storage.len())
    }

    pub fn is_empty(&self) -> Result<bool, ObserveError> {
        Ok(self.len()? == 0)
    }

    /// Record field names in insertion order, or sequence indices.
    pub fn keys(&self) -> Result<Vec<Key>, ObserveError> {
        self.read(|_, storage| match storage {
            Storage::Record(map) => map.keys().cloned().map(Key::Field).collect(),
            Storage::Sequence(cells) => (0..cells.len()).map(Key::Index).collect(),
        })
    }

    pub fn get(&self, key: impl Into<Key>) -> Result<Option<Entry>, ObserveError> {
        let key = key.into();
        self.read(|_, storage| {
            let key = storage.slot_key(key)?;
            Ok(storage.get(&key).map(|cell| self.entry(cell)))
        })?
    }

    /// Follow `keys` down from this node.
    pub fn get_in(&self, keys: &[Key]) -> Result<Option<Entry>, ObserveError> {
        let Some((last, parents)) = keys.split_last() else {
            self.read(|_, _| ())?;
            return Ok(Some(Entry::Node(self.clone())));
        };
        let mut current = self.clone();
        for key in parents {
            match current.get(key.clone())? {
                Some(Entry::Node(next)) => current = next,
                _ => return Ok(None),
            }
        }
        current.get(last.clone())
    }

    /// Follow a path string such as `"a.b.0"` or `"a/b/0"`.
    pub fn get_in_str(&self, path: &str) -> Result<Option<Entry>, ObserveError> {
        let keys: Vec<Key> = parse_path(path).into_iter().map(Key::Field).collect();
        self.get_in(&keys)
    }

    /// Plain deep copy of the current value. Nothing is revoked.
    pub fn snapshot(&self) -> Result<Value, ObserveError> {
        self.read(|graph, _| graph.arena.materialize(self.id))
    }

    /// Set `key` to `value`.
    ///
    /// Setting data equal to what is stored does nothing and reports
    /// nothing. On a sequence, `key` may address an existing index or the
    /// index one past the end.
    pub fn set(&self, key: impl Into<Key>, value: impl Into<Value>) -> Result<(), ObserveError> {
        let (key, value) = (key.into(), value.into());
        self.mutate(|graph, id| Ok(((), graph.set(id, key, value)?)))
    }

    /// Remove `key`, returning its plain value. A sequence keeps its length
    /// and holds `Null` at the removed index.
    pub fn delete(&self, key: impl Into<Key>) -> Result<Option<Value>, ObserveError> {
        let key = key.into();
        self.mutate(|graph, id| graph.delete(id, key))
    }

    /// Append items, returning the new length.
    pub fn append(&self, items: impl IntoIterator<Item = impl Into<Value>>) -> Result<usize, ObserveError> {
        let items: Vec<Value> = items.into_iter().map(Into::into).collect();
        self.mutate(|graph, id| graph.append(id, items))
    }

    pub fn remove_last(&self) -> Result<Option<Value>, ObserveError> {
        self.mutate(|graph, id| graph.remove_last(id))
    }

    pub fn remove_first(&self) -> Result<Option<Value>, ObserveError> {
        self.mutate(|graph, id| graph.remove_first(id))
    }

    /// Insert items at the front, keeping their order. Returns the new
    /// length.
    pub fn prepend(&self, items: impl IntoIterator<Item = impl Into<Value>>) -> Result<usize, ObserveError> {
        let items: Vec<Value> = items.into_iter().map(Into::into).collect();
        self.mutate(|graph, id| graph.prepend(id, items))
    }

    pub fn reverse(&self) -> Result<(), ObserveError> {
        self.mutate(|graph, id| Ok(((), graph.reverse(id)?)))
    }

    /// Stable sort by [`compare_values`](crate::compare_values).
    pub fn sort(&self) -> Result<(), ObserveError> {
        self.mutate(|graph, id| Ok(((), graph.sort(id)?)))
    }

    /// Stable sort with a comparator over plain element values.
    ///
    /// The comparator runs while the graph is borrowed; touching the graph
    /// from inside it fails with [`ObserveError::Busy`].
    pub fn sort_by<F>(&self, compare: F) -> Result<(), ObserveError>
    where
        F: FnMut(&Value, &Value) -> Ordering,
    {
        self.mutate(|graph, id| Ok(((), graph.sort_by(id, compare)?)))
    }

    /// Overwrite `[start, end)` with `value`. Negative offsets count from
    /// the end; both are clamped to the current length.
    pub fn fill(&self, value: impl Into<Value>, start: isize, end: isize) -> Result<(), ObserveError> {
        let value = value.into();
        self.mutate(|graph, id| Ok(((), graph.fill(id, value, start, end)?)))
    }

    /// Replace `delete_count` elements at `start` with `items`, returning
    /// the removed elements. A negative `start` counts from the end.
    pub fn splice(
        &self,
        start: isize,
        delete_count: usize,
        items: impl IntoIterator<Item = impl Into<Value>>,
    ) -> Result<Vec<Value>, ObserveError> {
        let items: Vec<Value> = items.into_iter().map(Into::into).collect();
        self.mutate(|graph, id| graph.splice(id, start, delete_count, items))
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle").field("id", &self.id).field("live", &self.is_live()).finish()
    }
}

/// Two handles are equal when they address the same node of the same graph.
impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.graph, &other.graph) && self.id == other.id
    }
}

impl Eq for Handle {}

// ── Observable ─────────────────────────────────────────────────────────────

/// Input to [`Observable::from`].
#[derive(Debug)]
pub enum Candidate {
    Plain(Value),
    Observed(Handle),
}

impl From<Value> for Candidate {
    fn from(value: Value) -> Self {
        Candidate::Plain(value)
    }
}

impl From<serde_json::Value> for Candidate {
    fn from(value: serde_json::Value) -> Self {
        Candidate::Plain(Value::from(value))
    }
}

impl From<Handle> for Candidate {
    fn from(handle: Handle) -> Self {
        Candidate::Observed(handle)
    }
}

impl From<&Observable> for Candidate {
    fn from(observable: &Observable) -> Self {
        Candidate::Observed(observable.handle.clone())
    }
}

impl From<Observable> for Candidate {
    fn from(observable: Observable) -> Self {
        Candidate::Observed(observable.handle)
    }
}

/// The root of an observed graph.
///
/// Derefs to [`Handle`] for reads and mutations; adds observer
/// registration and revocation.
#[derive(Clone, Debug)]
pub struct Observable {
    handle: Handle,
}

impl Observable {
    /// Wrap a record or sequence, recursively tracking every nested
    /// composite.
    ///
    /// Fails for primitives, atomic leaves and anything already observed.
    pub fn from(candidate: impl Into<Candidate>) -> Result<Self, TypeConstraintError> {
        let value = match candidate.into() {
            Candidate::Plain(value) => value,
            Candidate::Observed(_) => return Err(TypeConstraintError::AlreadyObservable),
        };
        let graph = Graph::new(value).map_err(|rejected| match rejected.kind() {
            ValueKind::Atom => TypeConstraintError::AtomicLeaf { found: rejected.type_name() },
            _ => TypeConstraintError::NotComposite { found: rejected.type_name() },
        })?;
        tracing::debug!(nodes = graph.arena.len(), "observable created");
        let id = graph.root;
        Ok(Self { handle: Handle { graph: Rc::new(RefCell::new(graph)), id } })
    }

    /// Whether `candidate` is a live, unrevoked observable root.
    pub fn is_observable(candidate: &dyn Any) -> bool {
        candidate
            .downcast_ref::<Observable>()
            .is_some_and(|o| o.graph().try_borrow().map(|g| !g.is_revoked()).unwrap_or(true))
    }

    fn graph(&self) -> &Rc<RefCell<Graph>> {
        &self.handle.graph
    }

    /// Register `observer`. Registering an observer twice keeps the first
    /// registration and logs the attempt.
    pub fn observe(&self, observer: &Observer, options: ObserveOptions) -> Result<(), ObserveError> {
        let filter = Filter::try_from(options)?;
        let mut graph = self.graph().try_borrow_mut().map_err(|_| ObserveError::Busy)?;
        if graph.is_revoked() {
            return Err(ObserveError::InvalidState);
        }
        if !graph.registry.register(observer.clone(), filter) {
            tracing::info!(?observer, "observer may be bound to an observable only once");
        }
        Ok(())
    }

    /// Remove the given observers, or all of them when `observers` is empty.
    pub fn unobserve(&self, observers: &[Observer]) -> Result<(), ObserveError> {
        let mut graph = self.graph().try_borrow_mut().map_err(|_| ObserveError::Busy)?;
        if graph.is_revoked() {
            return Err(ObserveError::InvalidState);
        }
        graph.registry.unregister(observers);
        Ok(())
    }

    pub fn observer_count(&self) -> Result<usize, ObserveError> {
        let graph = self.graph().try_borrow().map_err(|_| ObserveError::Busy)?;
        if graph.is_revoked() {
            return Err(ObserveError::InvalidState);
        }
        Ok(graph.registry.len())
    }

    /// Detach the whole graph and return its plain value.
    ///
    /// Every handle into the graph stops working. Calling this again
    /// returns the same value.
    pub fn revoke(&self) -> Result<Value, ObserveError> {
        let mut graph = self.graph().try_borrow_mut().map_err(|_| ObserveError::Busy)?;
        Ok(graph.revoke_root())
    }
}

impl Deref for Observable {
    type Target = Handle;

    fn deref(&self) -> &Handle {
        &self.handle
    }
}

impl TryFrom<Value> for Observable {
    type Error = TypeConstraintError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Observable::from(value)
    }
}

impl TryFrom<serde_json::Value> for Observable {
    type Error = TypeConstraintError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        Observable::from(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::ChangeKind;
    use crate::value::Atom;
    use serde_json::json;
    use tracing_test::traced_test;

    fn collecting() -> (Observer, Rc<RefCell<Vec<Vec<Change>>>>) {
        let batches = Rc::new(RefCell::new(Vec::new()));
        let sink = batches.clone();
        let observer = Observer::from_fn(move |changes| sink.borrow_mut().push(changes.to_vec()));
        (observer, batches)
    }

    fn node(handle: &Handle, path: &str) -> Handle {
        handle.get_in_str(path).unwrap().and_then(Entry::into_node).unwrap()
    }

    #[test]
    fn test_from_rejects_non_composites() {
        assert_eq!(
            Observable::from(json!(1)).unwrap_err(),
            TypeConstraintError::NotComposite { found: "number" }
        );
        assert_eq!(
            Observable::from(json!(null)).unwrap_err(),
            TypeConstraintError::NotComposite { found: "null" }
        );
        assert!(matches!(
            Observable::from(Value::Atom(Atom::Date(0))),
            Err(TypeConstraintError::AtomicLeaf { .. })
        ));
        let root = Observable::from(json!({})).unwrap();
        assert_eq!(Observable::from(&root).unwrap_err(), TypeConstraintError::AlreadyObservable);
    }

    #[test]
    fn test_is_observable() {
        let root = Observable::from(json!([1])).unwrap();
        assert!(Observable::is_observable(&root));
        assert!(!Observable::is_observable(&json!([1])));
        root.revoke().unwrap();
        assert!(!Observable::is_observable(&root));
    }

    #[test]
    fn test_reads() {
        let root = Observable::from(json!({"a": {"b": [1, "x"]}, "n": 2})).unwrap();
        assert_eq!(root.kind().unwrap(), NodeKind::Record);
        assert_eq!(root.keys().unwrap(), vec![Key::from("a"), Key::from("n")]);
        let list = node(&root, "a.b");
        assert_eq!(list.kind().unwrap(), NodeKind::Sequence);
        assert_eq!(list.len().unwrap(), 2);
        assert_eq!(list.path().unwrap(), vec![Key::from("a"), Key::from("b")]);
        assert_eq!(list.get(1usize).unwrap().unwrap().as_value(), Some(&Value::from("x")));
        assert!(list.get(5usize).unwrap().is_none());
        assert!(matches!(list.get("n"), Err(ObserveError::InvalidKey(key)) if key == Key::from("n")));
        assert!(root.get_in_str("a.zz.q").unwrap().is_none());
        assert_eq!(root.get_in(&[]).unwrap(), Some(Entry::Node(Handle::clone(&root))));
        assert_eq!(root.get_in_str("a.b").unwrap(), Some(Entry::Node(list.clone())));
        assert_ne!(Some(Entry::Node(list)), root.get_in_str("a").unwrap());
        assert_eq!(root.snapshot().unwrap(), Value::from(json!({"a": {"b": [1, "x"]}, "n": 2})));
    }

    #[test]
    fn test_nested_set_reports_full_path() {
        let root = Observable::from(json!({"a": {}})).unwrap();
        let (observer, batches) = collecting();
        root.observe(&observer, ObserveOptions::new()).unwrap();

        node(&root, "a").set("b", json!({"c": [0]})).unwrap();
        node(&root, "a.b.c").append([1]).unwrap();

        let batches = batches.borrow();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0][0].path_string(), "a.b");
        assert_eq!(batches[1][0].path_string(), "a.b.c.1");
        assert_eq!(batches[1][0].kind, ChangeKind::Insert);
    }

    #[test]
    fn test_overwritten_handle_is_revoked() {
        let root = Observable::from(json!({"a": {"x": 1}})).unwrap();
        let a = node(&root, "a");
        root.set("a", 5).unwrap();
        assert!(!a.is_live());
        assert_eq!(a.set("x", 2), Err(ObserveError::InvalidState));
        assert_eq!(a.snapshot(), Err(ObserveError::InvalidState));
    }

    #[test]
    fn test_observer_may_mutate_reentrantly() {
        let root = Observable::from(json!({"count": 0, "log": []})).unwrap();
        let inner = root.clone();
        let observer = Observer::from_fn(move |changes| {
            if changes.iter().any(|c| c.path_string() == "count") {
                let log = inner.get("log").unwrap().and_then(Entry::into_node).unwrap();
                log.append(["changed"]).unwrap();
            }
        });
        root.observe(&observer, ObserveOptions::path("count")).unwrap();
        root.set("count", 1).unwrap();
        assert_eq!(root.snapshot().unwrap(), Value::from(json!({"count": 1, "log": ["changed"]})));
    }

    #[test]
    fn test_comparator_cannot_touch_graph() {
        let root = Observable::from(json!([3, 1, 2])).unwrap();
        let inner = root.clone();
        let mut seen = None;
        root.sort_by(|a, b| {
            seen.get_or_insert_with(|| inner.len());
            compare_values_desc(a, b)
        })
        .unwrap();
        assert_eq!(seen, Some(Err(ObserveError::Busy)));
        assert_eq!(root.snapshot().unwrap(), Value::from(json!([3, 2, 1])));
    }

    fn compare_values_desc(a: &Value, b: &Value) -> Ordering {
        crate::value::compare_values(b, a)
    }

    #[test]
    fn test_use_after_revoke() {
        let root = Observable::from(json!({"a": [1]})).unwrap();
        let list = node(&root, "a");
        let (observer, _) = collecting();
        assert_eq!(root.revoke().unwrap(), Value::from(json!({"a": [1]})));
        assert_eq!(root.revoke().unwrap(), Value::from(json!({"a": [1]})));
        assert_eq!(list.append([2]), Err(ObserveError::InvalidState));
        assert_eq!(root.len(), Err(ObserveError::InvalidState));
        assert_eq!(list.get_in(&[]), Err(ObserveError::InvalidState));
        assert_eq!(root.get_in_str(""), Err(ObserveError::InvalidState));
        assert_eq!(root.observe(&observer, ObserveOptions::new()), Err(ObserveError::InvalidState));
        assert_eq!(root.unobserve(&[]), Err(ObserveError::InvalidState));
        assert_eq!(root.observer_count(), Err(ObserveError::InvalidState));
    }

    #[test]
    fn test_invalid_options_do_not_register() {
        let root = Observable::from(json!({})).unwrap();
        let (observer, _) = collecting();
        let both = ObserveOptions { path: Some("a".into()), paths_from: Some("a".into()) };
        assert!(matches!(root.observe(&observer, both), Err(ObserveError::Configuration(_))));
        assert_eq!(root.observer_count().unwrap(), 0);
    }

    #[test]
    #[traced_test]
    fn test_duplicate_registration_is_logged() {
        let root = Observable::from(json!({})).unwrap();
        let (observer, batches) = collecting();
        root.observe(&observer, ObserveOptions::new()).unwrap();
        root.observe(&observer.clone(), ObserveOptions::path("x")).unwrap();
        assert_eq!(root.observer_count().unwrap(), 1);
        assert!(logs_contain("observer may be bound to an observable only once"));

        root.set("y", 1).unwrap();
        assert_eq!(batches.borrow().len(), 1);
    }

    #[test]
    #[traced_test]
    fn test_failing_observer_is_logged_and_isolated() {
        let root = Observable::from(json!([])).unwrap();
        let failing = Observer::new(|_| Err("boom".into()));
        let panicking = Observer::from_fn(|_| panic!("observer exploded"));
        let (observer, batches) = collecting();
        for o in [&failing, &panicking, &observer] {
            root.observe(o, ObserveOptions::new()).unwrap();
        }

        assert_eq!(root.append([1]).unwrap(), 1);
        assert_eq!(batches.borrow().len(), 1);
        assert!(logs_contain("failed to deliver changes to observer"));
        assert!(logs_contain("boom"));
        assert!(logs_contain("observer exploded"));
    }
}
