//! Publisher: recursive trie walk that marks triggered topics and buffers
//! messages under a monotonically increasing `MessageId`.

use std::hash::Hash;

use bytes::Bytes;

use super::node::NodeId;
use super::{TopicTree, MAX_TRIGGERED};
use crate::error::TopicTreeError;

impl<S: Clone + Eq + Hash + Ord, F: FnMut(&S, &[u8]) -> i32> TopicTree<S, F> {
    /// Buffer `message` at every node matching `topic`, under a fresh
    /// `MessageId`. Increments `MessageId` once this publish completes.
    ///
    /// Rejects (before mutating anything) a topic containing a literal
    /// `+`/`#` segment when `validate_publish_topics` is set (the
    /// default) — see `Config::topic_tree`. Returns
    /// [`TopicTreeError::TriggeredCapacityExceeded`] if a publish would
    /// trigger a topic beyond the 64-slot capacity.
    pub fn publish(
        &mut self,
        topic: &str,
        message: impl Into<Bytes>,
    ) -> Result<(), TopicTreeError> {
        if self.validate_publish_topics {
            for segment in topic.split('/') {
                Self::validate_segment(segment)?;
            }
        }

        let message_id = self.next_message_id;
        let payload = message.into();
        let segments: Vec<&str> = topic.split('/').collect();
        self.walk(self.root, &segments, message_id, &payload)?;
        self.next_message_id += 1;
        Ok(())
    }

    fn walk(
        &mut self,
        node: NodeId,
        remaining: &[&str],
        message_id: super::MessageId,
        payload: &Bytes,
    ) -> Result<(), TopicTreeError> {
        // `#` matches any remaining path including the empty tail, so it's
        // checked at every segment boundary, before consuming a segment.
        if let Some(hash_child) = self.arena.get(node).terminating_wildcard_child {
            self.trigger_and_buffer(hash_child, message_id, payload)?;
        }

        if remaining.is_empty() {
            // Topic fully consumed: this node itself is the exact match.
            self.trigger_and_buffer(node, message_id, payload)?;
            return Ok(());
        }

        let (head, tail) = (remaining[0], &remaining[1..]);

        // `+` consumes exactly this one segment.
        if let Some(plus_child) = self.arena.get(node).wildcard_child {
            self.walk(plus_child, tail, message_id, payload)?;
        }

        if let Some(child) = self.arena.get(node).children.get(head).copied() {
            self.walk(child, tail, message_id, payload)?;
        }

        Ok(())
    }

    fn trigger_and_buffer(
        &mut self,
        node: NodeId,
        message_id: super::MessageId,
        payload: &Bytes,
    ) -> Result<(), TopicTreeError> {
        let was_triggered = self.arena.get(node).triggered;
        if !was_triggered {
            if self.triggered.len() >= MAX_TRIGGERED {
                return Err(TopicTreeError::TriggeredCapacityExceeded {
                    capacity: MAX_TRIGGERED,
                });
            }
            self.triggered.push(node);
            self.arena.get_mut(node).triggered = true;
            if let Some(smallest) = self.arena.get(node).subscribers.iter().next().cloned() {
                self.min = Some(match self.min.take() {
                    Some(current) if current <= smallest => current,
                    _ => smallest,
                });
            }
            tracing::trace!("topic triggered by message {}", message_id);
        }
        self.arena
            .get_mut(node)
            .messages
            .insert(message_id, payload.clone());
        Ok(())
    }
}
