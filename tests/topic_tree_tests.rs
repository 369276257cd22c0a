use std::cell::RefCell;
use std::rc::Rc;

use topic_tree::TopicTree;

/// Subscribers are a plain `u64` in these tests — any `Clone + Eq + Hash +
/// Ord` type works, a connection id would look the same in a real host.
type SubscriberId = u64;

type Log = Rc<RefCell<Vec<(SubscriberId, String)>>>;
type RecordingTree = TopicTree<SubscriberId, Box<dyn FnMut(&SubscriberId, &[u8]) -> i32>>;

fn recording_tree() -> (RecordingTree, Log) {
    let log: Log = Rc::new(RefCell::new(Vec::new()));
    let log_handle = log.clone();
    let tree = TopicTree::new(Box::new(move |subscriber: &SubscriberId, payload: &[u8]| {
        log_handle
            .borrow_mut()
            .push((*subscriber, String::from_utf8_lossy(payload).into_owned()));
        0
    }) as Box<dyn FnMut(&SubscriberId, &[u8]) -> i32>);
    (tree, log)
}

mod scenarios {
    use super::*;

    // E1: exact, '+' and '#' subscriptions on the same topic each get one message.
    #[test]
    fn exact_plus_and_hash_all_receive_one_message() {
        let (mut tree, log) = recording_tree();
        tree.subscribe("news/sports", &1);
        tree.subscribe("news/+", &2);
        tree.subscribe("news/#", &3);

        tree.publish("news/sports", "A").unwrap();
        tree.drain();

        let received = log.borrow().clone();
        assert_eq!(received.len(), 3);
        assert!(received.contains(&(1, "A".to_string())));
        assert!(received.contains(&(2, "A".to_string())));
        assert!(received.contains(&(3, "A".to_string())));
    }

    // E2: two subscribers on the same exact topic share one cached payload.
    #[test]
    fn shared_subscription_gets_concatenated_payload() {
        let (mut tree, log) = recording_tree();
        tree.subscribe("a/b", &1);
        tree.subscribe("a/b", &2);

        tree.publish("a/b", "X").unwrap();
        tree.publish("a/b", "Y").unwrap();
        tree.drain();

        let received = log.borrow().clone();
        assert_eq!(received.len(), 2);
        assert!(received.contains(&(1, "XY".to_string())));
        assert!(received.contains(&(2, "XY".to_string())));
    }

    // E3: overlapping '#' and exact subscriptions dedupe to one delivery each.
    #[test]
    fn overlapping_matches_deliver_once_each() {
        let (mut tree, log) = recording_tree();
        tree.subscribe("a/#", &1);
        tree.subscribe("a/b", &2);

        tree.publish("a/b", "M").unwrap();
        tree.drain();

        let received = log.borrow().clone();
        assert_eq!(received.len(), 2);
        assert!(received.iter().all(|(_, payload)| payload == "M"));
    }

    // E4: unsubscribe_all removes the subscriber and prunes the trie.
    #[test]
    fn unsubscribe_all_stops_delivery_and_prunes() {
        let (mut tree, log) = recording_tree();
        tree.subscribe("a/b", &1);
        tree.unsubscribe_all(&1);

        tree.publish("a/b", "Z").unwrap();
        tree.drain();

        assert!(log.borrow().is_empty());
    }

    // E5: "+/+" matches two-segment topics, not one-segment ones.
    #[test]
    fn double_plus_matches_exactly_two_segments() {
        let (mut tree, log) = recording_tree();
        tree.subscribe("+/+", &1);

        tree.publish("a/b", "1").unwrap();
        tree.publish("c/d", "2").unwrap();
        tree.publish("a", "3").unwrap();
        tree.drain();

        let received = log.borrow().clone();
        assert_eq!(received, vec![(1, "12".to_string())]);
    }

    // E6: disjoint subscriptions get distinct payloads (different intersection bitmaps).
    #[test]
    fn disjoint_subscribers_get_distinct_payloads() {
        let (mut tree, log) = recording_tree();
        tree.subscribe("a/b", &1);
        tree.subscribe("a/c", &2);

        tree.publish("a/b", "P").unwrap();
        tree.publish("a/c", "Q").unwrap();
        tree.drain();

        let received = log.borrow().clone();
        assert_eq!(received.len(), 2);
        assert!(received.contains(&(1, "P".to_string())));
        assert!(received.contains(&(2, "Q".to_string())));
    }
}

mod properties {
    use super::*;

    // Property 8: terminating wildcard matches the empty tail.
    #[test]
    fn hash_matches_empty_tail() {
        let (mut tree, log) = recording_tree();
        tree.subscribe("a/#", &1);

        tree.publish("a", "hi").unwrap();
        tree.drain();

        assert_eq!(log.borrow().clone(), vec![(1, "hi".to_string())]);
    }

    // Property 7: draining with nothing published since the last drain is a no-op.
    #[test]
    fn empty_drain_emits_nothing() {
        let (mut tree, log) = recording_tree();
        tree.subscribe("a/b", &1);
        tree.drain();
        assert!(log.borrow().is_empty());
    }

    // Property 2: payload is the ordered concatenation of matching messages, in publish order.
    #[test]
    fn payload_preserves_publish_order_across_ticks() {
        let (mut tree, log) = recording_tree();
        tree.subscribe("a/b", &1);

        tree.publish("a/b", "1").unwrap();
        tree.publish("a/b", "2").unwrap();
        tree.publish("a/b", "3").unwrap();
        tree.drain();

        assert_eq!(log.borrow().clone(), vec![(1, "123".to_string())]);

        // A fresh tick starts clean: no leftover messages from the prior drain.
        log.borrow_mut().clear();
        tree.publish("a/b", "4").unwrap();
        tree.drain();
        assert_eq!(log.borrow().clone(), vec![(1, "4".to_string())]);
    }

    // Property 1: a subscriber with no matching publish this tick gets no callback.
    #[test]
    fn non_matching_subscriber_receives_nothing() {
        let (mut tree, log) = recording_tree();
        tree.subscribe("a/b", &1);
        tree.subscribe("c/d", &2);

        tree.publish("a/b", "only for 1").unwrap();
        tree.drain();

        let received = log.borrow().clone();
        assert_eq!(received, vec![(1, "only for 1".to_string())]);
    }

    // Round-trip: subscribe then unsubscribe_all with no other subscribers
    // restores the structural emptiness of the trie (exercised indirectly:
    // a second, unrelated subscription on an overlapping prefix still works).
    #[test]
    fn subscribe_then_teardown_is_clean() {
        let (mut tree, log) = recording_tree();
        tree.subscribe("x/y/z", &1);
        tree.unsubscribe_all(&1);

        tree.subscribe("x/y/z", &2);
        tree.publish("x/y/z", "fresh").unwrap();
        tree.drain();

        assert_eq!(log.borrow().clone(), vec![(2, "fresh".to_string())]);
    }

    // Per-topic unsubscribe leaves other subscriptions for the same subscriber intact.
    #[test]
    fn per_topic_unsubscribe_is_scoped() {
        let (mut tree, log) = recording_tree();
        tree.subscribe("a/b", &1);
        tree.subscribe("c/d", &1);

        tree.unsubscribe("a/b", &1);

        tree.publish("a/b", "gone").unwrap();
        tree.publish("c/d", "stays").unwrap();
        tree.drain();

        assert_eq!(log.borrow().clone(), vec![(1, "stays".to_string())]);
    }
}

mod errors {
    use super::*;
    use topic_tree::TopicTreeError;

    #[test]
    fn publishing_a_wildcard_segment_is_rejected() {
        let (mut tree, _log) = recording_tree();
        let err = tree.publish("a/+/c", "nope").unwrap_err();
        assert_eq!(
            err,
            TopicTreeError::WildcardInPublishedTopic {
                segment: "+".to_string()
            }
        );
    }

    #[test]
    fn triggered_capacity_is_enforced() {
        let (mut tree, _log) = recording_tree();
        for i in 0..topic_tree::MAX_TRIGGERED {
            tree.subscribe(&format!("topic{i}"), &(i as u64));
        }
        for i in 0..topic_tree::MAX_TRIGGERED {
            tree.publish(&format!("topic{i}"), "x").unwrap();
        }

        tree.subscribe("overflow", &999);
        let err = tree.publish("overflow", "y").unwrap_err();
        assert_eq!(
            err,
            TopicTreeError::TriggeredCapacityExceeded {
                capacity: topic_tree::MAX_TRIGGERED
            }
        );

        // Draining recovers capacity for the next tick.
        tree.drain();
        tree.publish("overflow", "y").unwrap();
    }
}
