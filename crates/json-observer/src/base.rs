//! Contract shared by record and sequence nodes: wrapping, `set`,
//! `delete` and revocation.
//!
//! Mutations return the change records they produced; the caller hands
//! them to the registry once the graph borrow is released.

use crate::arena::{Arena, Cell, Node, NodeId, Storage};
use crate::change::{Change, ChangeBatch};
use crate::error::ObserveError;
use crate::key::{child_path, Key};
use crate::registry::Registry;
use crate::value::{Composite, Value};
use crate::sequence;

// ── Wrapping and unwrapping ────────────────────────────────────────────────

impl Arena {
    /// Store `value` under `parent` at `key`: trackable composites become
    /// child nodes, everything else is kept as-is.
    pub(crate) fn wrap(&mut self, value: Value, parent: NodeId, key: Key) -> Cell {
        match value.into_composite() {
            Ok(composite) => Cell::Node(self.alloc(composite, Some(parent), Some(key))),
            Err(plain) => Cell::Plain(plain),
        }
    }

    /// Wrap a root node. Hands the value back when it is not composite.
    pub(crate) fn wrap_root(&mut self, value: Value) -> Result<NodeId, Value> {
        let composite = value.into_composite()?;
        Ok(self.alloc(composite, None, None))
    }

    fn alloc(&mut self, composite: Composite, parent: Option<NodeId>, own_key: Option<Key>) -> NodeId {
        match composite {
            Composite::Record(map) => self.build_record(map, parent, own_key),
            Composite::Sequence(items) => self.build_sequence(items, parent, own_key),
        }
    }

    /// Detach `id` and all of its descendants, returning the plain value.
    ///
    /// `None` if the node is already gone.
    pub(crate) fn revoke(&mut self, id: NodeId) -> Option<Value> {
        let node = self.remove(id)?;
        Some(match node.storage {
            Storage::Record(map) => {
                Value::Object(map.into_iter().map(|(k, cell)| (k, self.into_plain(cell))).collect())
            }
            Storage::Sequence(cells) => {
                Value::Array(cells.into_iter().map(|cell| self.into_plain(cell)).collect())
            }
        })
    }

    /// Take a cell out of the graph, revoking it if it is a node.
    pub(crate) fn into_plain(&mut self, cell: Cell) -> Value {
        match cell {
            Cell::Plain(value) => value,
            Cell::Node(id) => self.revoke(id).unwrap_or_default(),
        }
    }

    /// Plain copy of a cell; the graph is left as it is.
    pub(crate) fn plain_of(&self, cell: &Cell) -> Value {
        match cell {
            Cell::Plain(value) => value.clone(),
            Cell::Node(id) => self.materialize(*id),
        }
    }

    pub(crate) fn materialize(&self, id: NodeId) -> Value {
        match self.get(id).map(|node| &node.storage) {
            Some(Storage::Record(map)) => Value::Object(
                map.iter().map(|(k, cell)| (k.clone(), self.plain_of(cell))).collect(),
            ),
            Some(Storage::Sequence(cells)) => {
                Value::Array(cells.iter().map(|cell| self.plain_of(cell)).collect())
            }
            None => Value::Null,
        }
    }

    /// Whether the stored cell holds the same data as `value`.
    pub(crate) fn equals(&self, cell: &Cell, value: &Value) -> bool {
        let id = match cell {
            Cell::Plain(plain) => return plain == value,
            Cell::Node(id) => *id,
        };
        match (self.get(id).map(|node| &node.storage), value) {
            (Some(Storage::Record(map)), Value::Object(other)) => {
                map.len() == other.len()
                    && map.iter().all(|(k, cell)| other.get(k).is_some_and(|v| self.equals(cell, v)))
            }
            (Some(Storage::Sequence(cells)), Value::Array(other)) => {
                cells.len() == other.len()
                    && cells.iter().zip(other).all(|(cell, v)| self.equals(cell, v))
            }
            _ => false,
        }
    }
}

// ── Slot access ────────────────────────────────────────────────────────────

impl Storage {
    /// Bring `key` into the canonical form for this storage.
    pub(crate) fn slot_key(&self, key: Key) -> Result<Key, ObserveError> {
        match self {
            Storage::Record(_) => Ok(Key::Field(key.into_field())),
            Storage::Sequence(_) => sequence::index_of(key).map(Key::Index),
        }
    }

    /// Look up a canonical key.
    pub(crate) fn get(&self, key: &Key) -> Option<&Cell> {
        match (self, key) {
            (Storage::Record(map), Key::Field(name)) => map.get(name),
            (Storage::Sequence(cells), Key::Index(index)) => cells.get(*index),
            _ => None,
        }
    }

    /// Store under a canonical key, returning the previous cell. A sequence
    /// index equal to the length appends.
    fn put(&mut self, key: &Key, cell: Cell) -> Option<Cell> {
        match (self, key) {
            (Storage::Record(map), Key::Field(name)) => map.insert(name.clone(), cell),
            (Storage::Sequence(cells), Key::Index(index)) => match cells.get_mut(*index) {
                Some(slot) => Some(std::mem::replace(slot, cell)),
                None => {
                    cells.push(cell);
                    None
                }
            },
            _ => None,
        }
    }

    /// Remove a canonical key. A sequence keeps its length: the slot
    /// becomes a `Null` hole.
    fn take(&mut self, key: &Key) -> Option<Cell> {
        match (self, key) {
            (Storage::Record(map), Key::Field(name)) => map.shift_remove(name),
            (Storage::Sequence(cells), Key::Index(index)) => cells
                .get_mut(*index)
                .map(|slot| std::mem::replace(slot, Cell::Plain(Value::Null))),
            _ => None,
        }
    }
}

// ── Graph ──────────────────────────────────────────────────────────────────

/// Everything one observed root owns: its nodes and its observers.
#[derive(Debug)]
pub(crate) struct Graph {
    pub(crate) arena: Arena,
    pub(crate) root: NodeId,
    pub(crate) registry: Registry,
    revoked: Option<Value>,
}

impl Graph {
    /// Wrap a root value. Hands the value back when it is not composite.
    pub(crate) fn new(value: Value) -> Result<Self, Value> {
        let mut arena = Arena::default();
        let root = arena.wrap_root(value)?;
        Ok(Self { arena, root, registry: Registry::default(), revoked: None })
    }

    pub(crate) fn node(&self, id: NodeId) -> Result<&Node, ObserveError> {
        self.arena.get(id).ok_or(ObserveError::InvalidState)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, ObserveError> {
        self.arena.get_mut(id).ok_or(ObserveError::InvalidState)
    }

    /// Records are only built while someone is listening.
    pub(crate) fn is_observed(&self) -> bool {
        !self.registry.is_empty()
    }

    pub(crate) fn is_revoked(&self) -> bool {
        self.revoked.is_some()
    }

    /// Set `key` of node `id` to `value`.
    ///
    /// Storing data equal to what is already there is a no-op. A tracked
    /// old value is revoked, so the record carries its plain form.
    pub(crate) fn set(&mut self, id: NodeId, key: Key, value: Value) -> Result<Vec<Change>, ObserveError> {
        let node = self.node(id)?;
        let key = node.storage.slot_key(key)?;
        if let Some(current) = node.storage.get(&key) {
            if self.arena.equals(current, &value) {
                return Ok(Vec::new());
            }
        }
        if let (Storage::Sequence(cells), Key::Index(index)) = (&node.storage, &key) {
            if *index > cells.len() {
                return Err(ObserveError::OutOfBounds { index: *index, len: cells.len() });
            }
        }

        let mut batch = ChangeBatch::new(self.is_observed());
        let cell = self.arena.wrap(value, id, key.clone());
        let stored = cell.clone();
        let old = self.node_mut(id)?.storage.put(&key, cell);
        let old = old.map(|cell| self.arena.into_plain(cell));

        batch.push_with(|| {
            let path = child_path(&self.arena.resolve_path(id), key);
            let value = self.arena.plain_of(&stored);
            match old {
                None => Change::insert(path, value),
                Some(old) => Change::update(path, value, old),
            }
        });
        Ok(batch.into_changes())
    }

    /// Remove `key` from node `id`, returning the removed plain value.
    /// Removing an absent key does nothing.
    pub(crate) fn delete(&mut self, id: NodeId, key: Key) -> Result<(Option<Value>, Vec<Change>), ObserveError> {
        let observed = self.is_observed();
        let node = self.node_mut(id)?;
        let key = node.storage.slot_key(key)?;
        let Some(old) = node.storage.take(&key) else {
            return Ok((None, Vec::new()));
        };
        let old = self.arena.into_plain(old);

        let mut batch = ChangeBatch::new(observed);
        batch.push_with(|| Change::delete(child_path(&self.arena.resolve_path(id), key), old.clone()));
        Ok((Some(old), batch.into_changes()))
    }

    /// Revoke the whole graph. Repeated calls return the same plain value.
    pub(crate) fn revoke_root(&mut self) -> Value {
        if let Some(plain) = &self.revoked {
            return plain.clone();
        }
        let plain = self.arena.revoke(self.root).unwrap_or_default();
        self.registry.unregister(&[]);
        tracing::debug!(nodes_left = self.arena.len(), "observable revoked");
        self.revoked = Some(plain.clone());
        plain
    }
}
