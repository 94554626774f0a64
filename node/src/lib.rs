//! Chord-style DHT node.
//!
//! A node hashes itself onto a circular identifier space, keeps
//! successor/predecessor pointers and a finger table pointing across the
//! ring, and stores the key/value pairs whose hashes fall into its arc.
//! Membership changes heal through periodic stabilization rounds driven by
//! receive timeouts. The crate doubles as the node binary and as a library
//! for simulations and integration tests.

pub mod finger;
pub mod node;
pub mod service;
pub mod transport;

pub use finger::FingerTable;
pub use node::{DhtNode, Outbound, Peer};
pub use service::NodeService;
pub use transport::{Transport, UdpTransport};

// Re-exports from the shared crate for convenience.
pub use rondo_lib::messages::Message;
pub use rondo_lib::Id;

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// Runtime configuration for a node.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the UDP socket binds to; also this node's ring identity.
    pub bind_addr: SocketAddr,
    /// Peer used to join an existing ring; `None` starts a new one.
    pub bootstrap: Option<SocketAddr>,
    /// Ring bit width: identifiers live in `[0, 2^ring_bits)`.
    pub ring_bits: u8,
    /// Bounded receive wait; its expiry drives stabilization.
    pub recv_wait: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            bootstrap: None,
            ring_bits: 10,
            recv_wait: Duration::from_millis(3000),
        }
    }
}

impl Config {
    /// Read configuration from the environment, falling back to defaults:
    /// `NODE_ADDRESS`, `BOOTSTRAP_ADDRESS`, `RING_BITS`, `RECV_WAIT_MS`.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let mut config = Self::default();
        if let Ok(addr) = env::var("NODE_ADDRESS") {
            config.bind_addr = addr.parse()?;
        }
        if let Ok(addr) = env::var("BOOTSTRAP_ADDRESS") {
            config.bootstrap = Some(addr.parse()?);
        }
        if let Ok(bits) = env::var("RING_BITS") {
            let bits: u8 = bits.parse()?;
            if !(1..=63).contains(&bits) {
                return Err(format!("RING_BITS must be within 1..=63, got {}", bits).into());
            }
            config.ring_bits = bits;
        }
        if let Ok(ms) = env::var("RECV_WAIT_MS") {
            config.recv_wait = Duration::from_millis(ms.parse()?);
        }
        Ok(config)
    }
}
