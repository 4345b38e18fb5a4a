//! Keyed-record nodes.
//!
//! A record needs nothing beyond the shared contract in [`crate::base`];
//! this module only covers building one.

use indexmap::IndexMap;

use crate::arena::{Arena, Node, NodeId, Storage};
use crate::key::Key;
use crate::value::Record;

impl Arena {
    /// Allocate a record node and wrap every present key's value into it.
    pub(crate) fn build_record(&mut self, source: Record, parent: Option<NodeId>, own_key: Option<Key>) -> NodeId {
        let id = self.insert(Node { own_key, parent, storage: Storage::Record(IndexMap::new()) });
        let cells = source
            .into_iter()
            .map(|(name, value)| {
                let cell = self.wrap(value, id, Key::Field(name.clone()));
                (name, cell)
            })
            .collect();
        if let Some(node) = self.get_mut(id) {
            node.storage = Storage::Record(cells);
        }
        id
    }
}
