use std::net::SocketAddr;

use rondo_lib::{id_mask, in_arc, Id};

use crate::node::Peer;

/// One routing slot: the ring position this slot tracks, and the peer last
/// observed to cover it.
#[derive(Debug, Clone)]
struct Slot {
    expected: Id,
    peer: Option<Peer>,
}

/// Per-node routing table with one slot per ring bit. Slot `i` (1-based)
/// targets `(node_id + 2^(i-1)) mod 2^bits` and should point at the first
/// node at or after that identifier. Targets never change; only the
/// pointers do.
#[derive(Debug, Clone)]
pub struct FingerTable {
    node_id: Id,
    slots: Vec<Slot>,
}

impl FingerTable {
    pub fn new(node_id: Id, bits: u8) -> Self {
        let mask = id_mask(bits);
        let slots = (0..bits)
            .map(|i| Slot {
                expected: node_id.wrapping_add(1 << i) & mask,
                peer: None,
            })
            .collect();
        FingerTable { node_id, slots }
    }

    /// Number of slots (the ring bit width).
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Point every slot at `peer`. Used when the table collapses to a single
    /// known node: admitting the first peer, or learning a successor on join.
    pub fn fill(&mut self, peer: Peer) {
        for slot in &mut self.slots {
            slot.peer = Some(peer);
        }
    }

    /// Set the pointer at 1-based `index`, leaving its target untouched.
    /// Out-of-range indices are ignored.
    pub fn update(&mut self, index: usize, peer: Peer) {
        let Some(slot) = index.checked_sub(1).and_then(|i| self.slots.get_mut(i)) else {
            return;
        };
        slot.peer = Some(peer);
    }

    /// Pointer currently held at 1-based `index`.
    pub fn peer(&self, index: usize) -> Option<Peer> {
        index
            .checked_sub(1)
            .and_then(|i| self.slots.get(i))
            .and_then(|slot| slot.peer)
    }

    /// Address of the longest useful hop toward `id`: the last set slot
    /// whose pointer lies strictly inside `(node_id, id)`, falling back to
    /// the farthest slot when none qualifies. The scan runs over pointer
    /// ids, so a hop never lands on the node covering `id` itself; it
    /// lands just before it, on the node able to answer. Routing through
    /// a stale pointer is acceptable; the table repairs itself as
    /// stabilization rounds run.
    pub fn closest_preceding(&self, id: Id) -> Option<SocketAddr> {
        for slot in self.slots.iter().rev() {
            let Some(peer) = slot.peer else { continue };
            if peer.id != id && in_arc(self.node_id, id, peer.id) {
                return Some(peer.addr);
            }
        }
        self.slots.last().and_then(|slot| slot.peer).map(|p| p.addr)
    }

    /// Refresh-probe targets: 1-based index and target id of every slot.
    pub fn expected_keys(&self) -> Vec<(usize, Id)> {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, slot)| (i + 1, slot.expected))
            .collect()
    }

    /// 1-based index of the slot answered by a probe for `id`: the last
    /// slot walking clockwise whose target lies in `(node_id, id]`. A probe
    /// for a slot's own target maps back to that slot.
    pub fn index_for(&self, id: Id) -> usize {
        for (i, slot) in self.slots.iter().enumerate().rev() {
            if in_arc(self.node_id, id, slot.expected) {
                return i + 1;
            }
        }
        self.slots.len()
    }
}
