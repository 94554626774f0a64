use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::Id;

// One message per datagram. The closed set of variants replaces the loose
// method-string dispatch of older designs: an unknown method cannot be
// expressed, only a datagram that fails to decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
    // A node asking to be admitted; forwarded clockwise until it reaches
    // the node whose arc covers the requester.
    JoinRequest { id: Id, addr: SocketAddr },
    // Admission acknowledgment, carrying the joiner's successor.
    JoinReply {
        successor_id: Id,
        successor_addr: SocketAddr,
    },
    // Ring lookup: which node is responsible for `id`? The answer goes
    // straight back to `reply_to`, wherever the query ends up.
    SuccessorQuery { id: Id, reply_to: SocketAddr },
    // Answer to SuccessorQuery.
    SuccessorReply {
        queried_id: Id,
        successor_id: Id,
        successor_addr: SocketAddr,
    },
    // Sender believes it is the receiver's predecessor.
    Notify {
        predecessor_id: Id,
        predecessor_addr: SocketAddr,
    },
    // Stabilize probe: "tell me your predecessor".
    PredecessorQuery,
    // Stabilize answer. Carries only the bare id; the responder's address
    // is implied by the datagram source.
    StabilizeReply { predecessor_id: Option<Id> },
    // Store a value under `key`. Any hop replies straight to `reply_to`.
    Put {
        key: String,
        value: Vec<u8>,
        reply_to: SocketAddr,
    },
    // Fetch the value stored under `key`.
    Get { key: String, reply_to: SocketAddr },
    // Positive reply; carries the value for a Get, nothing for a Put.
    Ack { value: Option<Vec<u8>> },
    // Negative reply: duplicate write or unknown key.
    Nack,
}

impl Message {
    pub fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}
