use std::time::Duration;

use log::{debug, error};

use rondo_lib::messages::Message;

use crate::node::{DhtNode, Outbound};
use crate::transport::Transport;

/// Ties a protocol engine to a transport: one receive loop with a bounded
/// wait, dispatching inbound datagrams to the engine and sending whatever
/// it returns. The receive timeout is the clock that drives join retries
/// and stabilization; there are no other timers.
pub struct NodeService<T: Transport> {
    node: DhtNode,
    transport: T,
    recv_wait: Duration,
}

impl<T: Transport> NodeService<T> {
    pub fn new(node: DhtNode, transport: T, recv_wait: Duration) -> Self {
        NodeService {
            node,
            transport,
            recv_wait,
        }
    }

    pub fn node(&self) -> &DhtNode {
        &self.node
    }

    /// Run the node until the process is terminated.
    pub async fn run(mut self) {
        let announce = self.node.startup();
        self.send_all(announce).await;
        loop {
            self.step().await;
        }
    }

    /// One iteration of the receive loop.
    pub async fn step(&mut self) {
        match self.transport.recv(self.recv_wait).await {
            Ok(Some((payload, from))) => match Message::decode(&payload) {
                Ok(message) => {
                    debug!("[{}] received {:?} from {}", self.node.addr(), message, from);
                    let out = self.node.handle(message, from);
                    self.send_all(out).await;
                }
                Err(e) => {
                    // Transport noise: drop without a reply.
                    debug!(
                        "[{}] dropping undecodable datagram from {}: {}",
                        self.node.addr(),
                        from,
                        e
                    );
                }
            },
            Ok(None) => {
                let out = self.node.tick();
                self.send_all(out).await;
            }
            Err(e) => {
                error!("[{}] receive failed: {}", self.node.addr(), e);
            }
        }
    }

    async fn send_all(&self, messages: Vec<Outbound>) {
        for Outbound { to, message } in messages {
            let payload = match message.encode() {
                Ok(payload) => payload,
                Err(e) => {
                    error!("[{}] failed to encode {:?}: {}", self.node.addr(), message, e);
                    continue;
                }
            };
            debug!("[{}] sending {:?} to {}", self.node.addr(), message, to);
            if let Err(e) = self.transport.send(to, payload).await {
                // Datagram loss is an assumed condition; the protocol
                // recovers through retries and stabilization.
                error!("[{}] failed to send to {}: {}", self.node.addr(), to, e);
            }
        }
    }
}
