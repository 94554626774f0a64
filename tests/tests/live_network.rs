//! Smoke tests over real UDP sockets: full service loops, wire codec and
//! all. Nodes bind ephemeral loopback ports, so tests do not collide.

use std::net::SocketAddr;
use std::time::Duration;

use rondo_node::{DhtNode, Message, NodeService, Transport, UdpTransport};

const BITS: u8 = 10;
const RECV_WAIT: Duration = Duration::from_millis(100);

fn loopback() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 0))
}

async fn spawn_node(id: u64, bootstrap: Option<SocketAddr>) -> SocketAddr {
    let transport = UdpTransport::bind(loopback()).await.unwrap();
    let addr = transport.local_addr().unwrap();
    let node = DhtNode::with_id(id, addr, BITS, bootstrap);
    tokio::spawn(NodeService::new(node, transport, RECV_WAIT).run());
    addr
}

async fn call(client: &UdpTransport, to: SocketAddr, message: &Message) -> Option<Message> {
    client.send(to, message.encode().unwrap()).await.unwrap();
    let (payload, _) = client.recv(Duration::from_millis(300)).await.unwrap()?;
    Message::decode(&payload).ok()
}

#[tokio::test]
async fn single_node_serves_clients_over_udp() {
    let node = spawn_node(0, None).await;
    let client = UdpTransport::bind(loopback()).await.unwrap();
    let client_addr = client.local_addr().unwrap();

    let put = Message::Put {
        key: "melon".to_string(),
        value: b"sweet".to_vec(),
        reply_to: client_addr,
    };
    assert_eq!(
        call(&client, node, &put).await,
        Some(Message::Ack { value: None })
    );

    let get = Message::Get {
        key: "melon".to_string(),
        reply_to: client_addr,
    };
    assert_eq!(
        call(&client, node, &get).await,
        Some(Message::Ack {
            value: Some(b"sweet".to_vec())
        })
    );

    // Second write of the same key is refused.
    assert_eq!(call(&client, node, &put).await, Some(Message::Nack));
}

#[tokio::test]
async fn joiner_is_admitted_over_udp() {
    let a = spawn_node(0, None).await;
    let _b = spawn_node(512, Some(a)).await;

    let client = UdpTransport::bind(loopback()).await.unwrap();
    let client_addr = client.local_addr().unwrap();

    // succ(300) is the joiner once it is in; the sole member answers with
    // itself. Poll until the admission has gone through.
    let query = Message::SuccessorQuery {
        id: 300,
        reply_to: client_addr,
    };
    let mut admitted = false;
    for _ in 0..50 {
        if let Some(Message::SuccessorReply { successor_id, .. }) =
            call(&client, a, &query).await
        {
            if successor_id == 512 {
                admitted = true;
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(admitted, "joiner never became the successor");
}

#[tokio::test]
async fn malformed_datagrams_are_ignored() {
    let node = spawn_node(0, None).await;
    let client = UdpTransport::bind(loopback()).await.unwrap();
    let client_addr = client.local_addr().unwrap();

    client.send(node, vec![0xFF; 16]).await.unwrap();

    // The node neither crashed nor replied to the noise: a real request
    // right after still works, and the only reply is for that request.
    let get = Message::Get {
        key: "nothing".to_string(),
        reply_to: client_addr,
    };
    assert_eq!(call(&client, node, &get).await, Some(Message::Nack));
}
