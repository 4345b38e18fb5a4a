//! Ordered-sequence nodes and their batch mutators.
//!
//! Every mutator produces exactly one batch. After any operation that moves
//! elements, each surviving child node gets its `own_key` re-derived from its
//! final position before records are built, so paths resolved later (or
//! from inside an observer) are correct.

use std::cmp::Ordering;

use crate::arena::{Arena, Cell, Node, NodeId, NodeKind, Storage};
use crate::base::Graph;
use crate::change::{Change, ChangeBatch};
use crate::error::ObserveError;
use crate::key::{child_path, Key, Path};
use crate::value::{compare_values, Value};

impl Arena {
    /// Allocate a sequence node and wrap every element into it.
    pub(crate) fn build_sequence(&mut self, source: Vec<Value>, parent: Option<NodeId>, own_key: Option<Key>) -> NodeId {
        let id = self.insert(Node { own_key, parent, storage: Storage::Sequence(Vec::new()) });
        let cells = source
            .into_iter()
            .enumerate()
            .map(|(index, value)| self.wrap(value, id, Key::Index(index)))
            .collect();
        if let Some(node) = self.get_mut(id) {
            node.storage = Storage::Sequence(cells);
        }
        id
    }

    /// Point every child node's `own_key` at its current position.
    fn reindex(&mut self, cells: &[Cell]) {
        for (index, cell) in cells.iter().enumerate() {
            if let Cell::Node(child) = cell {
                if let Some(node) = self.get_mut(*child) {
                    node.own_key = Some(Key::Index(index));
                }
            }
        }
    }
}

/// Position a key addresses in a sequence.
pub(crate) fn index_of(key: Key) -> Result<usize, ObserveError> {
    key.as_index().ok_or(ObserveError::InvalidKey(key))
}

/// Resolve a possibly negative offset against `len`, clamped to `[0, len]`.
pub(crate) fn normalize_offset(offset: isize, len: usize) -> usize {
    if offset < 0 {
        len.saturating_sub(offset.unsigned_abs())
    } else {
        offset.unsigned_abs().min(len)
    }
}

impl Graph {
    /// Run `op` on the cells of sequence node `id`.
    ///
    /// The cells are moved out for the duration of `op`, which leaves the
    /// arena free to wrap and revoke children meanwhile.
    fn with_cells<R>(
        &mut self,
        id: NodeId,
        op: impl FnOnce(&mut Arena, &mut Vec<Cell>, &mut ChangeBatch, &Path) -> R,
    ) -> Result<(R, Vec<Change>), ObserveError> {
        let mut batch = ChangeBatch::new(self.is_observed());
        let base = self.arena.resolve_path(id);
        let mut cells = match &mut self.node_mut(id)?.storage {
            Storage::Sequence(cells) => std::mem::take(cells),
            Storage::Record(_) => return Err(ObserveError::WrongKind { expected: NodeKind::Sequence }),
        };
        let out = op(&mut self.arena, &mut cells, &mut batch, &base);
        if let Storage::Sequence(slot) = &mut self.node_mut(id)?.storage {
            *slot = cells;
        }
        Ok((out, batch.into_changes()))
    }

    /// Append items; one `Insert` per item at its final index.
    pub(crate) fn append(&mut self, id: NodeId, items: Vec<Value>) -> Result<(usize, Vec<Change>), ObserveError> {
        self.with_cells(id, |arena, cells, batch, base| {
            for item in items {
                let index = cells.len();
                let cell = arena.wrap(item, id, Key::Index(index));
                batch.push_with(|| Change::insert(child_path(base, Key::Index(index)), arena.plain_of(&cell)));
                cells.push(cell);
            }
            cells.len()
        })
    }

    /// Remove the last element; one `Delete` at its former index.
    pub(crate) fn remove_last(&mut self, id: NodeId) -> Result<(Option<Value>, Vec<Change>), ObserveError> {
        self.with_cells(id, |arena, cells, batch, base| {
            let cell = cells.pop()?;
            let old = arena.into_plain(cell);
            let index = cells.len();
            batch.push_with(|| Change::delete(child_path(base, Key::Index(index)), old.clone()));
            Some(old)
        })
    }

    /// Remove the first element; one `Delete` at index 0.
    pub(crate) fn remove_first(&mut self, id: NodeId) -> Result<(Option<Value>, Vec<Change>), ObserveError> {
        self.with_cells(id, |arena, cells, batch, base| {
            if cells.is_empty() {
                return None;
            }
            let cell = cells.remove(0);
            arena.reindex(cells);
            let old = arena.into_plain(cell);
            batch.push_with(|| Change::delete(child_path(base, Key::Index(0)), old.clone()));
            Some(old)
        })
    }

    /// Insert items at the front; one `Insert` per item at its final index.
    pub(crate) fn prepend(&mut self, id: NodeId, items: Vec<Value>) -> Result<(usize, Vec<Change>), ObserveError> {
        self.with_cells(id, |arena, cells, batch, base| {
            let count = items.len();
            let wrapped: Vec<Cell> = items
                .into_iter()
                .enumerate()
                .map(|(index, item)| arena.wrap(item, id, Key::Index(index)))
                .collect();
            cells.splice(0..0, wrapped);
            arena.reindex(cells);
            for (index, cell) in cells.iter().enumerate().take(count) {
                batch.push_with(|| Change::insert(child_path(base, Key::Index(index)), arena.plain_of(cell)));
            }
            cells.len()
        })
    }

    /// Reverse in place; one `Reverse` record at the sequence's own path.
    pub(crate) fn reverse(&mut self, id: NodeId) -> Result<Vec<Change>, ObserveError> {
        let ((), changes) = self.with_cells(id, |arena, cells, batch, base| {
            cells.reverse();
            arena.reindex(cells);
            batch.push_with(|| Change::reverse(base.clone()));
        })?;
        Ok(changes)
    }

    /// Stable sort on the plain form of each element; one `Shuffle` record.
    ///
    /// The comparator only ever sees copies. Storage is reordered once the
    /// permutation is known, so a panicking comparator leaves it untouched.
    pub(crate) fn sort_by<F>(&mut self, id: NodeId, mut compare: F) -> Result<Vec<Change>, ObserveError>
    where
        F: FnMut(&Value, &Value) -> Ordering,
    {
        let plain: Vec<Value> = match &self.node(id)?.storage {
            Storage::Sequence(cells) => cells.iter().map(|cell| self.arena.plain_of(cell)).collect(),
            Storage::Record(_) => return Err(ObserveError::WrongKind { expected: NodeKind::Sequence }),
        };
        let mut order: Vec<usize> = (0..plain.len()).collect();
        order.sort_by(|&a, &b| compare(&plain[a], &plain[b]));

        let ((), changes) = self.with_cells(id, |arena, cells, batch, base| {
            let mut slots: Vec<Option<Cell>> = cells.drain(..).map(Some).collect();
            cells.extend(order.iter().filter_map(|&index| slots[index].take()));
            arena.reindex(cells);
            batch.push_with(|| Change::shuffle(base.clone()));
        })?;
        Ok(changes)
    }

    pub(crate) fn sort(&mut self, id: NodeId) -> Result<Vec<Change>, ObserveError> {
        self.sort_by(id, compare_values)
    }

    /// Overwrite `[start, end)` with independent copies of `value`.
    ///
    /// Offsets may be negative (counted from the end) and are clamped to
    /// the current length, so every record is an `Update`, one per index,
    /// ascending.
    pub(crate) fn fill(&mut self, id: NodeId, value: Value, start: isize, end: isize) -> Result<Vec<Change>, ObserveError> {
        let ((), changes) = self.with_cells(id, |arena, cells, batch, base| {
            let len = cells.len();
            let start = normalize_offset(start, len);
            let end = normalize_offset(end, len).max(start);
            for index in start..end {
                let cell = arena.wrap(value.clone(), id, Key::Index(index));
                let stored = cell.clone();
                let old = std::mem::replace(&mut cells[index], cell);
                let old = arena.into_plain(old);
                batch.push_with(|| Change::update(child_path(base, Key::Index(index)), arena.plain_of(&stored), old));
            }
        })?;
        Ok(changes)
    }

    /// Remove `delete_count` elements at `start` and insert `items` there,
    /// returning the removed elements as plain values.
    ///
    /// Records: an `Update` for each position both removed and refilled,
    /// then a `Delete` for each further removal, then an `Insert` for each
    /// further insertion.
    pub(crate) fn splice(
        &mut self,
        id: NodeId,
        start: isize,
        delete_count: usize,
        items: Vec<Value>,
    ) -> Result<(Vec<Value>, Vec<Change>), ObserveError> {
        self.with_cells(id, |arena, cells, batch, base| {
            let start = normalize_offset(start, cells.len());
            let removed_count = delete_count.min(cells.len() - start);
            let inserted_count = items.len();
            let wrapped: Vec<Cell> = items
                .into_iter()
                .enumerate()
                .map(|(offset, item)| arena.wrap(item, id, Key::Index(start + offset)))
                .collect();
            let removed: Vec<Cell> = cells.splice(start..start + removed_count, wrapped).collect();
            arena.reindex(cells);
            let removed: Vec<Value> = removed.into_iter().map(|cell| arena.into_plain(cell)).collect();

            for (offset, old) in removed.iter().enumerate() {
                let path = child_path(base, Key::Index(start + offset));
                if offset < inserted_count {
                    batch.push_with(|| Change::update(path, arena.plain_of(&cells[start + offset]), old.clone()));
                } else {
                    batch.push_with(|| Change::delete(path, old.clone()));
                }
            }
            for offset in removed_count..inserted_count {
                batch.push_with(|| {
                    Change::insert(child_path(base, Key::Index(start + offset)), arena.plain_of(&cells[start + offset]))
                });
            }
            removed
        })
    }
}
