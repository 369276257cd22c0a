//! Tick-batched publish/subscribe topic routing engine.
//!
//! Maintains a hierarchical `/`-segmented topic namespace with MQTT-style
//! `+` (single-segment) and `#` (terminating multi-segment) wildcard
//! subscriptions. Publishes accumulate within a tick; [`TopicTree::drain`]
//! delivers one coalesced, deduplicated, order-preserving payload per
//! subscriber per tick.
//!
//! The socket/transport layer, subscriber identity allocation, and log
//! formatting are all host concerns — this crate only emits `tracing`
//! events, it never installs a subscriber.

pub mod config;
pub mod error;
pub mod topic_tree;

pub use config::Config;
pub use error::TopicTreeError;
pub use topic_tree::{MessageId, TopicTree, MAX_TRIGGERED};
