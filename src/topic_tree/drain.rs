//! Drain engine: multi-way merge over triggered topics' subscriber sets,
//! keyed by an intersection bitmap so subscribers sharing the same
//! subscription pattern across triggered topics reuse one payload.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use bytes::{Bytes, BytesMut};

use super::node::NodeId;
use super::{MessageId, TopicTree};

impl<S: Clone + Eq + Hash + Ord, F: FnMut(&S, &[u8]) -> i32> TopicTree<S, F> {
    /// Deliver one coalesced, deduplicated, order-preserving payload to
    /// every subscriber of a currently triggered topic, then clear all
    /// per-tick state. A no-op if nothing was triggered since the last
    /// `drain`.
    pub fn drain(&mut self) {
        if self.triggered.is_empty() {
            return;
        }

        if self.triggered.len() == 1 {
            self.drain_single(self.triggered[0]);
        } else {
            self.drain_merge();
        }

        for &node in &self.triggered {
            let n = self.arena.get_mut(node);
            n.messages.clear();
            n.triggered = false;
        }
        self.triggered.clear();
        self.min = None;
    }

    /// Fast path (Design Notes §9): with exactly one triggered topic the
    /// intersection bitmap is always `0b1`, so every subscriber gets the
    /// same payload — just concatenate once and fan it out.
    fn drain_single(&mut self, node: NodeId) {
        let n = self.arena.get(node);
        let payload = concat_messages(&n.messages);
        for subscriber in n.subscribers.iter().cloned().collect::<Vec<_>>() {
            (self.callback)(&subscriber, &payload);
        }
    }

    fn drain_merge(&mut self) {
        let triggered: Vec<NodeId> = self.triggered.iter().copied().collect();
        let mut cursors: Vec<std::vec::IntoIter<S>> = triggered
            .iter()
            .map(|&node| {
                self.arena
                    .get(node)
                    .subscribers
                    .iter()
                    .cloned()
                    .collect::<Vec<_>>()
                    .into_iter()
            })
            .collect();
        let mut peeked: Vec<Option<S>> = cursors.iter_mut().map(|c| c.next()).collect();

        let mut cache: HashMap<u64, Bytes> = HashMap::new();
        let mut current_min = self.min.take();

        while let Some(min_val) = current_min {
            let mut bitmap: u64 = 0;
            let mut buffers: Vec<&BTreeMap<MessageId, Bytes>> = Vec::new();
            let mut next_min: Option<S> = None;

            for i in 0..triggered.len() {
                if peeked[i].as_ref() == Some(&min_val) {
                    bitmap |= 1 << i;
                    buffers.push(&self.arena.get(triggered[i]).messages);
                    peeked[i] = cursors[i].next();
                }
                if let Some(candidate) = &peeked[i] {
                    next_min = Some(match next_min {
                        Some(nm) if nm <= *candidate => nm,
                        _ => candidate.clone(),
                    });
                }
            }

            let payload = cache
                .entry(bitmap)
                .or_insert_with(|| merge_buffers(&buffers))
                .clone();
            (self.callback)(&min_val, &payload);

            current_min = next_min;
        }
    }
}

fn concat_messages(messages: &BTreeMap<MessageId, Bytes>) -> Bytes {
    let mut buf = BytesMut::with_capacity(messages.values().map(Bytes::len).sum());
    for payload in messages.values() {
        buf.extend_from_slice(payload);
    }
    buf.freeze()
}

/// Merge several per-topic message buffers into one deduplicated,
/// ascending-`MessageId`-ordered byte string. Ids are unique per publish,
/// so overlapping buffers that both contain the same id hold identical
/// bytes for it — a plain union, not a conflict to resolve.
fn merge_buffers(buffers: &[&BTreeMap<MessageId, Bytes>]) -> Bytes {
    let mut merged: BTreeMap<MessageId, &Bytes> = BTreeMap::new();
    for buffer in buffers {
        for (id, payload) in buffer.iter() {
            merged.insert(*id, payload);
        }
    }
    let mut buf = BytesMut::with_capacity(merged.values().map(|p| p.len()).sum());
    for payload in merged.values() {
        buf.extend_from_slice(payload);
    }
    buf.freeze()
}
