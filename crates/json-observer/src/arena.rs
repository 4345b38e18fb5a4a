//! Generational node arena.
//!
//! Every tracked node of one observed graph lives in a single [`Arena`].
//! Links between nodes are [`NodeId`]s: a parent owns its children through
//! the [`Cell::Node`] entries of its storage, while a child's `parent` is a
//! plain id and owns nothing. Freeing a slot bumps its generation, so ids
//! held after revocation resolve to nothing instead of to a reused slot.

use indexmap::IndexMap;

use crate::key::Key;
use crate::value::Value;

/// Identifies a node within its arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Record,
    Sequence,
}

/// A stored child: plain data, or a tracked child node.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Cell {
    Plain(Value),
    Node(NodeId),
}

#[derive(Debug)]
pub(crate) enum Storage {
    Record(IndexMap<String, Cell>),
    Sequence(Vec<Cell>),
}

impl Storage {
    pub(crate) fn kind(&self) -> NodeKind {
        match self {
            Storage::Record(_) => NodeKind::Record,
            Storage::Sequence(_) => NodeKind::Sequence,
        }
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            Storage::Record(map) => map.len(),
            Storage::Sequence(cells) => cells.len(),
        }
    }

    #[cfg(test)]
    pub(crate) fn cells(&self) -> Box<dyn Iterator<Item = &Cell> + '_> {
        match self {
            Storage::Record(map) => Box::new(map.values()),
            Storage::Sequence(cells) => Box::new(cells.iter()),
        }
    }
}

#[derive(Debug)]
pub(crate) struct Node {
    /// Key within the parent; `None` for the root.
    pub(crate) own_key: Option<Key>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) storage: Storage,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

#[derive(Debug, Default)]
pub(crate) struct Arena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl Arena {
    pub(crate) fn insert(&mut self, node: Node) -> NodeId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId { index, generation: slot.generation };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot { generation: 0, node: Some(node) });
        NodeId { index, generation: 0 }
    }

    /// Free the slot of `id`, returning its node. Children are untouched.
    pub(crate) fn remove(&mut self, id: NodeId) -> Option<Node> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
        Some(node)
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<&Node> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_mut()
    }

    pub(crate) fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live nodes.
    pub(crate) fn len(&self) -> usize {
        self.live
    }
}
