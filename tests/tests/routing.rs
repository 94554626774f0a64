//! Lookup and ownership behavior on a stabilized ring.

use rondo_integration_tests::sim::{addr, four_node_ring};
use rondo_lib::{hash, in_arc};
use rondo_node::Message;

#[test]
fn lookup_rides_the_finger_table() {
    let (mut ring, [n1, ..]) = four_node_ring();
    let client = addr(7000);

    let (reply, hops) = ring.lookup(n1, client, 11);
    match reply {
        Message::SuccessorReply {
            queried_id,
            successor_id,
            ..
        } => {
            assert_eq!(queried_id, 11);
            assert_eq!(successor_id, 13, "13 is the first node at or after 11");
        }
        other => panic!("unexpected reply {:?}", other),
    }
    assert!(hops <= 4, "lookup took {} hops on a 4-bit ring", hops);
}

#[test]
fn exactly_one_node_owns_each_identifier() {
    let (ring, addrs) = four_node_ring();

    for id in 0..16 {
        let owners = addrs
            .iter()
            .filter(|a| {
                let node = ring.node(**a);
                let pred = node
                    .predecessor()
                    .expect("stabilized node lacks a predecessor");
                in_arc(pred.id, node.id(), id)
            })
            .count();
        assert_eq!(owners, 1, "identifier {} has {} owners", id, owners);
    }
}

#[test]
fn every_key_lands_on_its_owner() {
    let (mut ring, addrs) = four_node_ring();
    let client = addr(7000);

    for i in 0..12 {
        let key = format!("fruit-{}", i);
        // Enter the ring at a different node each time.
        let reply = ring.put(addrs[i % addrs.len()], client, &key, b"ripe");
        assert_eq!(reply, Message::Ack { value: None }, "put of {:?}", key);

        let key_hash = hash(key.as_bytes(), 4);
        let owner = addrs
            .iter()
            .copied()
            .find(|a| {
                let node = ring.node(*a);
                in_arc(node.predecessor().unwrap().id, node.id(), key_hash)
            })
            .unwrap();

        assert_eq!(
            ring.node(owner).stored(&key),
            Some(&b"ripe"[..]),
            "{:?} (hash {}) missing from its owner",
            key,
            key_hash
        );
        for a in addrs {
            if a != owner {
                assert!(
                    ring.node(a).stored(&key).is_none(),
                    "{:?} leaked onto a non-owner",
                    key
                );
            }
        }
    }
}
