//! Topic Tree Node: one segment in the trie, arena-indexed.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use bytes::Bytes;
use compact_str::CompactString;

use super::MessageId;

/// Index into a [`Arena`]. Stable across insertions; a freed slot's id is
/// only reused once it has actually been returned to the free list, so a
/// stale `NodeId` held past a `trim` simply won't resolve to the node it
/// used to (the arena never hands it back out without the free list).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

pub(crate) struct Node<S: Ord> {
    /// Segment name this node was reached by (`"+"` and `"#"` are stored
    /// literally, like any other segment).
    pub(crate) segment: CompactString,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: HashMap<CompactString, NodeId>,
    /// Shortcut to the child named `"+"`, if any — aliases an entry in
    /// `children`.
    pub(crate) wildcard_child: Option<NodeId>,
    /// Shortcut to the child named `"#"`, if any — aliases an entry in
    /// `children`.
    pub(crate) terminating_wildcard_child: Option<NodeId>,
    /// Ordered by subscriber identity (invariant 6).
    pub(crate) subscribers: BTreeSet<S>,
    /// Per-tick buffer, ordered by `MessageId`. Empty outside a drain cycle.
    pub(crate) messages: BTreeMap<MessageId, Bytes>,
    pub(crate) triggered: bool,
}

impl<S: Ord> Node<S> {
    fn new(segment: CompactString, parent: Option<NodeId>) -> Self {
        Self {
            segment,
            parent,
            children: HashMap::new(),
            wildcard_child: None,
            terminating_wildcard_child: None,
            subscribers: BTreeSet::new(),
            messages: BTreeMap::new(),
            triggered: false,
        }
    }

    /// A node is a pruning candidate iff it has no subscribers, no
    /// children, and no wildcard shortcuts (invariant 3).
    pub(crate) fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
            && self.children.is_empty()
            && self.wildcard_child.is_none()
            && self.terminating_wildcard_child.is_none()
    }
}

/// Arena owning every node in the tree. Freed slots are tombstoned and
/// recycled via a free list so long-lived trees with churny subscriptions
/// don't grow without bound.
pub(crate) struct Arena<S: Ord> {
    slots: Vec<Option<Node<S>>>,
    free: Vec<usize>,
}

impl<S: Ord> Arena<S> {
    pub(crate) fn new() -> (Self, NodeId) {
        let root = Node::new(CompactString::new(""), None);
        let arena = Self {
            slots: vec![Some(root)],
            free: Vec::new(),
        };
        (arena, NodeId(0))
    }

    pub(crate) fn insert(&mut self, segment: CompactString, parent: NodeId) -> NodeId {
        let node = Node::new(segment, Some(parent));
        if let Some(idx) = self.free.pop() {
            self.slots[idx] = Some(node);
            NodeId(idx)
        } else {
            self.slots.push(Some(node));
            NodeId(self.slots.len() - 1)
        }
    }

    pub(crate) fn remove(&mut self, id: NodeId) {
        self.slots[id.0] = None;
        self.free.push(id.0);
    }

    pub(crate) fn get(&self, id: NodeId) -> &Node<S> {
        self.slots[id.0]
            .as_ref()
            .expect("NodeId referenced a freed arena slot")
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut Node<S> {
        self.slots[id.0]
            .as_mut()
            .expect("NodeId referenced a freed arena slot")
    }
}
