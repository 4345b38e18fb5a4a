//! Absolute path reconstruction from parent links.

use crate::arena::{Arena, NodeId};
use crate::key::Path;

impl Arena {
    /// Walk parent links from `id` up to the root.
    ///
    /// The path is the concatenation of every `own_key` on the way, read
    /// root first. The root has an empty path, and so does a node that is
    /// no longer live.
    pub(crate) fn resolve_path(&self, id: NodeId) -> Path {
        let mut keys = Vec::new();
        let mut current = id;
        while let Some(node) = self.get(current) {
            let Some(parent) = node.parent else { break };
            if let Some(key) = &node.own_key {
                keys.push(key.clone());
            }
            current = parent;
        }
        keys.reverse();
        keys
    }
}
