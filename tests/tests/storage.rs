//! Keystore semantics end to end: write-once values, misses, routing of
//! replies straight back to the caller.

use rondo_integration_tests::sim::{addr, four_node_ring};
use rondo_node::Message;

#[test]
fn writes_are_write_once_across_the_ring() {
    let (mut ring, [n1, n4, n9, _]) = four_node_ring();
    let client = addr(7000);

    assert_eq!(
        ring.put(n1, client, "plum", b"v1"),
        Message::Ack { value: None }
    );
    // Same key through a different entry node: refused, value untouched.
    assert_eq!(ring.put(n9, client, "plum", b"v2"), Message::Nack);
    assert_eq!(
        ring.get(n4, client, "plum"),
        Message::Ack {
            value: Some(b"v1".to_vec())
        }
    );
}

#[test]
fn missing_keys_are_nacked() {
    let (mut ring, [n1, ..]) = four_node_ring();
    let client = addr(7000);

    assert_eq!(ring.get(n1, client, "never-stored"), Message::Nack);
}

#[test]
fn distinct_clients_get_their_own_replies() {
    let (mut ring, [n1, _, n9, _]) = four_node_ring();

    assert_eq!(
        ring.put(n1, addr(7001), "pear", b"green"),
        Message::Ack { value: None }
    );
    assert_eq!(
        ring.get(n9, addr(7002), "pear"),
        Message::Ack {
            value: Some(b"green".to_vec())
        }
    );
}
