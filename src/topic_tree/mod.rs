//! Topic Tree: tick-batched MQTT-style publish/subscribe routing.
//!
//! - Exact matching: `"home/kitchen/temp"`
//! - Single-level wildcard: `"home/+/temp"`
//! - Terminating multi-level wildcard: `"home/#"`
//!
//! Single execution context, no internal locks: the tree is meant to be
//! owned by exactly one event-loop thread, matching the synchronous,
//! non-suspending contract the original design requires.

mod drain;
mod node;
mod publish;

use std::collections::HashMap;
use std::hash::Hash;

use arrayvec::ArrayVec;
use compact_str::CompactString;

use crate::error::TopicTreeError;
use node::{Arena, NodeId};

/// Tree-wide monotonically increasing counter, incremented once per
/// `publish`. Orders and dedupes messages across topic buffers at drain.
pub type MessageId = u64;

/// Fixed capacity of the triggered-topic array. Load-bearing: the
/// intersection bitmap used by `drain` is a `u64`, so this can never
/// exceed 64 without widening that bitmap too.
pub const MAX_TRIGGERED: usize = 64;

/// Hierarchical topic trie with tick-batched, deduplicated delivery.
///
/// Generic over `S`, the caller's own stable subscriber identity (e.g. a
/// connection id). The tree never mints subscriber identities itself —
/// subscribers are created and owned externally (see crate docs).
pub struct TopicTree<S: Clone + Eq + Hash + Ord, F: FnMut(&S, &[u8]) -> i32> {
    arena: Arena<S>,
    root: NodeId,
    /// Every leaf each known subscriber is registered at (with duplicates
    /// if the same subscriber subscribed the same topic more than once),
    /// for O(subs) teardown in `unsubscribe_all`.
    subscriptions: HashMap<S, Vec<NodeId>>,
    next_message_id: MessageId,
    triggered: ArrayVec<NodeId, MAX_TRIGGERED>,
    /// Smallest subscriber identity seen across all triggered topics'
    /// subscriber sets this tick; reset to `None` at the end of `drain`.
    min: Option<S>,
    callback: F,
    validate_publish_topics: bool,
}

impl<S: Clone + Eq + Hash + Ord, F: FnMut(&S, &[u8]) -> i32> TopicTree<S, F> {
    /// Construct an empty tree with a lone root, given the delivery
    /// callback. The callback must not re-enter `subscribe`/`unsubscribe`/
    /// `publish` on this same tree synchronously; its return value is
    /// discarded.
    pub fn new(callback: F) -> Self {
        Self::with_config(callback, crate::config::TopicTreeConfig::default())
    }

    pub fn with_config(callback: F, config: crate::config::TopicTreeConfig) -> Self {
        let (arena, root) = Arena::new();
        Self {
            arena,
            root,
            subscriptions: HashMap::new(),
            next_message_id: 0,
            triggered: ArrayVec::new(),
            min: None,
            callback,
            validate_publish_topics: config.validate_publish_topics,
        }
    }

    /// Subscribe `subscriber` to `topic`. Idempotent at the subscriber-set
    /// level; repeated subscriptions to the same topic by the same
    /// subscriber append a duplicate leaf entry (tolerated — it only
    /// affects how many times `unsubscribe_all` walks that leaf).
    pub fn subscribe(&mut self, topic: &str, subscriber: &S) {
        let leaf = self.insert_path(topic);
        self.arena
            .get_mut(leaf)
            .subscribers
            .insert(subscriber.clone());
        self.subscriptions
            .entry(subscriber.clone())
            .or_default()
            .push(leaf);
        tracing::trace!("subscribed to {}", topic);
    }

    /// Remove `subscriber` from every leaf it's registered at, pruning any
    /// node that becomes empty along the way. A subscriber with no
    /// subscriptions is a no-op.
    pub fn unsubscribe_all(&mut self, subscriber: &S) {
        let Some(leaves) = self.subscriptions.remove(subscriber) else {
            return;
        };
        for leaf in leaves {
            self.arena.get_mut(leaf).subscribers.remove(subscriber);
            self.trim(leaf);
        }
        tracing::trace!("unsubscribed all leaves for a subscriber");
    }

    /// Remove `subscriber` from exactly one `topic` subscription. Present
    /// for API completeness (spec's §4.1 marks this optional); the
    /// dominant disconnection path is [`Self::unsubscribe_all`].
    pub fn unsubscribe(&mut self, topic: &str, subscriber: &S) {
        let Some(leaf) = self.find_path(topic) else {
            return;
        };
        self.arena.get_mut(leaf).subscribers.remove(subscriber);
        if let Some(leaves) = self.subscriptions.get_mut(subscriber) {
            if let Some(pos) = leaves.iter().position(|&n| n.0 == leaf.0) {
                leaves.swap_remove(pos);
            }
            if leaves.is_empty() {
                self.subscriptions.remove(subscriber);
            }
        }
        self.trim(leaf);
    }

    // --- helpers shared with publish.rs / drain.rs ---

    /// Walk `topic`, creating nodes as needed, installing wildcard
    /// shortcuts when a segment is literally `+` or `#`. Returns the leaf.
    fn insert_path(&mut self, topic: &str) -> NodeId {
        let mut current = self.root;
        for part in topic.split('/') {
            let existing = self.arena.get(current).children.get(part).copied();
            current = if let Some(child) = existing {
                child
            } else {
                let child = self.arena.insert(CompactString::new(part), current);
                self.arena
                    .get_mut(current)
                    .children
                    .insert(CompactString::new(part), child);
                if part == "+" {
                    self.arena.get_mut(current).wildcard_child = Some(child);
                } else if part == "#" {
                    self.arena.get_mut(current).terminating_wildcard_child = Some(child);
                }
                child
            };
        }
        current
    }

    /// Walk `topic` literally (treating `+`/`#` segments as shortcut
    /// lookups, the way [`Self::insert_path`] installed them) without
    /// creating anything. Used by [`Self::unsubscribe`].
    fn find_path(&self, topic: &str) -> Option<NodeId> {
        let mut current = self.root;
        for part in topic.split('/') {
            let node = self.arena.get(current);
            current = match part {
                "+" => node.wildcard_child?,
                "#" => node.terminating_wildcard_child?,
                _ => *node.children.get(part)?,
            };
        }
        Some(current)
    }

    /// Prune `node` and its now-empty ancestors, stopping at the root.
    fn trim(&mut self, node: NodeId) {
        let mut current = node;
        loop {
            if current.0 == self.root.0 {
                return;
            }
            if !self.arena.get(current).is_empty() {
                return;
            }
            let parent = self
                .arena
                .get(current)
                .parent
                .expect("non-root node has a parent");
            let segment = self.arena.get(current).segment.clone();
            let parent_node = self.arena.get_mut(parent);
            if segment == "+" {
                parent_node.wildcard_child = None;
            } else if segment == "#" {
                parent_node.terminating_wildcard_child = None;
            }
            parent_node.children.remove(segment.as_str());
            self.arena.remove(current);
            tracing::trace!("pruned empty topic node '{}'", segment);
            current = parent;
        }
    }

    fn validate_segment(segment: &str) -> Result<(), TopicTreeError> {
        if segment == "+" || segment == "#" {
            return Err(TopicTreeError::WildcardInPublishedTopic {
                segment: segment.to_string(),
            });
        }
        Ok(())
    }
}
