use log::info;

use rondo_node::{Config, DhtNode, NodeService, UdpTransport};

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = Config::from_env().expect("invalid configuration");
    let transport = UdpTransport::bind(config.bind_addr)
        .await
        .expect("failed to bind UDP socket");

    let node = DhtNode::new(config.bind_addr, config.ring_bits, config.bootstrap);
    info!(
        "node {} listening on {} ({}-bit ring, stabilizing every {:?})",
        node.id(),
        config.bind_addr,
        config.ring_bits,
        config.recv_wait
    );

    NodeService::new(node, transport, config.recv_wait).run().await;
}
