use std::collections::HashMap;
use std::net::SocketAddr;

use log::{debug, info};

use rondo_lib::messages::Message;
use rondo_lib::{hash, in_arc, Id};

use crate::finger::FingerTable;

macro_rules! log_info {
    ($addr:expr, $($arg:tt)*) => ({
        info!("[{}] {}", $addr, format_args!($($arg)*));
    })
}

macro_rules! log_debug {
    ($addr:expr, $($arg:tt)*) => ({
        debug!("[{}] {}", $addr, format_args!($($arg)*));
    })
}

/// Identity and reachability of one ring member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Peer {
    pub id: Id,
    pub addr: SocketAddr,
}

/// A datagram the engine wants sent.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub to: SocketAddr,
    pub message: Message,
}

fn send(to: SocketAddr, message: Message) -> Outbound {
    Outbound { to, message }
}

/// Protocol state machine of a single node. Owns all routing state and the
/// keystore and performs no I/O: every handler consumes one inbound message
/// and returns the datagrams to send in response. The transport loop is the
/// sole caller, so no locking is involved.
#[derive(Debug)]
pub struct DhtNode {
    id: Id,
    addr: SocketAddr,
    bits: u8,
    successor: Peer,
    predecessor: Option<Peer>,
    fingers: FingerTable,
    keystore: HashMap<String, Vec<u8>>,
    joined: bool,
    bootstrap: Option<SocketAddr>,
}

impl DhtNode {
    /// Create a node whose id is derived from its bind address. Without a
    /// bootstrap peer the node starts a ring of its own.
    pub fn new(addr: SocketAddr, bits: u8, bootstrap: Option<SocketAddr>) -> Self {
        let id = hash(addr.to_string().as_bytes(), bits);
        Self::with_id(id, addr, bits, bootstrap)
    }

    /// Create a node at a fixed ring position. Simulations and tests use
    /// this to lay out rings exactly.
    pub fn with_id(id: Id, addr: SocketAddr, bits: u8, bootstrap: Option<SocketAddr>) -> Self {
        DhtNode {
            id,
            addr,
            bits,
            successor: Peer { id, addr },
            predecessor: None,
            fingers: FingerTable::new(id, bits),
            keystore: HashMap::new(),
            joined: bootstrap.is_none(),
            bootstrap,
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn successor(&self) -> Peer {
        self.successor
    }

    pub fn predecessor(&self) -> Option<Peer> {
        self.predecessor
    }

    pub fn is_joined(&self) -> bool {
        self.joined
    }

    pub fn fingers(&self) -> &FingerTable {
        &self.fingers
    }

    /// Value stored locally under `key`, if any.
    pub fn stored(&self, key: &str) -> Option<&[u8]> {
        self.keystore.get(key).map(Vec::as_slice)
    }

    /// Messages to send before entering the receive loop: the first join
    /// announcement, or nothing when this node starts its own ring.
    pub fn startup(&self) -> Vec<Outbound> {
        match self.bootstrap {
            Some(bootstrap) if !self.joined => {
                log_info!(self.addr, "node {} joining the ring via {}", self.id, bootstrap);
                vec![send(
                    bootstrap,
                    Message::JoinRequest {
                        id: self.id,
                        addr: self.addr,
                    },
                )]
            }
            _ => {
                log_info!(self.addr, "node {} starting a new ring", self.id);
                Vec::new()
            }
        }
    }

    /// Receive-timeout action: retry the join announcement until admitted,
    /// then drive one stabilization round by probing the successor for its
    /// predecessor. The timeout is the only clock this node has.
    pub fn tick(&mut self) -> Vec<Outbound> {
        if !self.joined {
            log_debug!(self.addr, "join still pending, retrying");
            if let Some(bootstrap) = self.bootstrap {
                return vec![send(
                    bootstrap,
                    Message::JoinRequest {
                        id: self.id,
                        addr: self.addr,
                    },
                )];
            }
            return Vec::new();
        }
        log_debug!(self.addr, "stabilize: probing successor {}", self.successor.addr);
        vec![send(self.successor.addr, Message::PredecessorQuery)]
    }

    /// Dispatch one inbound message. A node that has not been admitted yet
    /// listens only for its join acknowledgment and drops everything else.
    pub fn handle(&mut self, message: Message, from: SocketAddr) -> Vec<Outbound> {
        if !self.joined {
            return match message {
                Message::JoinReply {
                    successor_id,
                    successor_addr,
                } => self.on_join_reply(successor_id, successor_addr),
                other => {
                    log_debug!(self.addr, "not admitted yet, dropping {:?}", other);
                    Vec::new()
                }
            };
        }
        match message {
            Message::JoinRequest { id, addr } => self.on_join_request(id, addr),
            // Stale acknowledgment of an already completed join.
            Message::JoinReply { .. } => Vec::new(),
            Message::SuccessorQuery { id, reply_to } => self.on_successor_query(id, reply_to),
            Message::SuccessorReply {
                queried_id,
                successor_id,
                successor_addr,
            } => self.on_successor_reply(queried_id, successor_id, successor_addr),
            Message::Notify {
                predecessor_id,
                predecessor_addr,
            } => self.on_notify(predecessor_id, predecessor_addr),
            Message::PredecessorQuery => self.on_predecessor_query(from),
            Message::StabilizeReply { predecessor_id } => {
                self.on_stabilize_reply(predecessor_id, from)
            }
            Message::Put {
                key,
                value,
                reply_to,
            } => self.on_put(key, value, reply_to),
            Message::Get { key, reply_to } => self.on_get(key, reply_to),
            // Replies addressed to a client; nothing for a node to do.
            Message::Ack { .. } | Message::Nack => Vec::new(),
        }
    }

    fn on_join_request(&mut self, id: Id, addr: SocketAddr) -> Vec<Outbound> {
        if self.successor.id == self.id {
            // Sole member: the requester becomes successor and the whole
            // routing table, and learns this node as its own successor.
            log_info!(self.addr, "admitting {} as the first peer", id);
            let requester = Peer { id, addr };
            self.successor = requester;
            self.fingers.fill(requester);
            return vec![send(
                addr,
                Message::JoinReply {
                    successor_id: self.id,
                    successor_addr: self.addr,
                },
            )];
        }
        if in_arc(self.id, self.successor.id, id) {
            // The requester lands between this node and its successor: it
            // inherits the old successor and becomes the new one.
            log_info!(self.addr, "admitting {} as the new successor", id);
            let old = self.successor;
            let requester = Peer { id, addr };
            self.successor = requester;
            self.fingers.fill(requester);
            return vec![send(
                addr,
                Message::JoinReply {
                    successor_id: old.id,
                    successor_addr: old.addr,
                },
            )];
        }
        // Not this node's arc: keep walking clockwise.
        log_debug!(self.addr, "forwarding join of {} to {}", id, self.successor.addr);
        vec![send(self.successor.addr, Message::JoinRequest { id, addr })]
    }

    fn on_join_reply(&mut self, successor_id: Id, successor_addr: SocketAddr) -> Vec<Outbound> {
        let successor = Peer {
            id: successor_id,
            addr: successor_addr,
        };
        self.successor = successor;
        self.fingers.fill(successor);
        self.joined = true;
        log_info!(
            self.addr,
            "admitted to the ring, successor is {} at {}",
            successor_id,
            successor_addr
        );
        Vec::new()
    }

    fn on_successor_query(&mut self, id: Id, reply_to: SocketAddr) -> Vec<Outbound> {
        if in_arc(self.id, self.successor.id, id) {
            return vec![send(
                reply_to,
                Message::SuccessorReply {
                    queried_id: id,
                    successor_id: self.successor.id,
                    successor_addr: self.successor.addr,
                },
            )];
        }
        let next = self
            .fingers
            .closest_preceding(id)
            .unwrap_or(self.successor.addr);
        vec![send(next, Message::SuccessorQuery { id, reply_to })]
    }

    fn on_successor_reply(
        &mut self,
        queried_id: Id,
        successor_id: Id,
        successor_addr: SocketAddr,
    ) -> Vec<Outbound> {
        let index = self.fingers.index_for(queried_id);
        self.fingers.update(
            index,
            Peer {
                id: successor_id,
                addr: successor_addr,
            },
        );
        Vec::new()
    }

    fn on_notify(&mut self, candidate_id: Id, candidate_addr: SocketAddr) -> Vec<Outbound> {
        let accept = match self.predecessor {
            None => true,
            Some(p) => candidate_id != self.id && in_arc(p.id, self.id, candidate_id),
        };
        if accept {
            log_debug!(self.addr, "predecessor is now {}", candidate_id);
            self.predecessor = Some(Peer {
                id: candidate_id,
                addr: candidate_addr,
            });
        }
        // A stale or out-of-range candidate is dropped without a reply.
        Vec::new()
    }

    fn on_predecessor_query(&mut self, from: SocketAddr) -> Vec<Outbound> {
        vec![send(
            from,
            Message::StabilizeReply {
                predecessor_id: self.predecessor.map(|p| p.id),
            },
        )]
    }

    fn on_stabilize_reply(
        &mut self,
        predecessor_id: Option<Id>,
        from: SocketAddr,
    ) -> Vec<Outbound> {
        if let Some(candidate) = predecessor_id {
            if candidate != self.successor.id && in_arc(self.id, self.successor.id, candidate) {
                // The reply carries only the id; `from` is the current
                // successor and stands in for the candidate's address until
                // a finger probe reports the real one.
                log_info!(self.addr, "stabilize: adopting {} as successor", candidate);
                let adopted = Peer {
                    id: candidate,
                    addr: from,
                };
                self.successor = adopted;
                for index in 1..=self.fingers.index_for(candidate) {
                    self.fingers.update(index, adopted);
                }
            }
        }

        // Announce ourselves to the (possibly new) successor and refresh
        // every routing slot through its current pointer.
        let mut out = vec![send(
            self.successor.addr,
            Message::Notify {
                predecessor_id: self.id,
                predecessor_addr: self.addr,
            },
        )];
        for (index, target) in self.fingers.expected_keys() {
            if let Some(peer) = self.fingers.peer(index) {
                out.push(send(
                    peer.addr,
                    Message::SuccessorQuery {
                        id: target,
                        reply_to: self.addr,
                    },
                ));
            }
        }
        self.log_ring_state();
        out
    }

    // The arc a node stores keys for runs from its predecessor (exclusive)
    // to itself (inclusive). An unset predecessor collapses the arc to the
    // full ring: the sole member owns every key.
    fn owns(&self, key_hash: Id) -> bool {
        let lower = self.predecessor.map_or(self.id, |p| p.id);
        in_arc(lower, self.id, key_hash)
    }

    fn on_put(&mut self, key: String, value: Vec<u8>, reply_to: SocketAddr) -> Vec<Outbound> {
        let key_hash = hash(key.as_bytes(), self.bits);
        log_debug!(self.addr, "put {:?} (hash {})", key, key_hash);
        if self.owns(key_hash) {
            // Write-once: an existing key is refused, never overwritten.
            let message = if self.keystore.contains_key(&key) {
                Message::Nack
            } else {
                self.keystore.insert(key, value);
                Message::Ack { value: None }
            };
            return vec![send(reply_to, message)];
        }
        let message = Message::Put {
            key,
            value,
            reply_to,
        };
        if in_arc(self.id, self.successor.id, key_hash) {
            return vec![send(self.successor.addr, message)];
        }
        let next = self
            .fingers
            .closest_preceding(key_hash)
            .unwrap_or(self.successor.addr);
        vec![send(next, message)]
    }

    fn on_get(&mut self, key: String, reply_to: SocketAddr) -> Vec<Outbound> {
        let key_hash = hash(key.as_bytes(), self.bits);
        log_debug!(self.addr, "get {:?} (hash {})", key, key_hash);
        if self.owns(key_hash) {
            let message = match self.keystore.get(&key) {
                Some(value) => Message::Ack {
                    value: Some(value.clone()),
                },
                None => Message::Nack,
            };
            return vec![send(reply_to, message)];
        }
        let message = Message::Get { key, reply_to };
        if in_arc(self.id, self.successor.id, key_hash) {
            return vec![send(self.successor.addr, message)];
        }
        let next = self
            .fingers
            .closest_preceding(key_hash)
            .unwrap_or(self.successor.addr);
        vec![send(next, message)]
    }

    fn log_ring_state(&self) {
        log_debug!(
            self.addr,
            "ring state: self={}, pred={}, succ={}",
            self.id,
            self.predecessor
                .map(|p| p.id.to_string())
                .unwrap_or_else(|| "unset".to_string()),
            self.successor.id
        );
    }
}
