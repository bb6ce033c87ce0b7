use crate::config::{NameTable, NodeAddress};
use crate::network::{Transport, TransportError};
use crate::protocol::{Envelope, MessageKind};
use std::time::Duration;
use tokio::net::UdpSocket;

async fn loopback() -> (UdpSocket, NameTable) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let mut names = NameTable::new();
    names.insert("A", NodeAddress::new("127.0.0.1", socket.local_addr().unwrap().port()));
    (socket, names)
}

#[tokio::test]
async fn close_releases_the_port() {
    let (socket, names) = loopback().await;
    let addr = socket.local_addr().unwrap();
    let transport = Transport::with_socket(socket, &names, Duration::ZERO).await.unwrap();
    assert!(!transport.is_closed());

    transport.close();
    assert!(transport.is_closed());
    assert!(transport.local_addr().is_err());

    let envelope = Envelope::new("lsr", MessageKind::Data, "A", "A");
    assert!(matches!(
        transport.send("A", &envelope).await,
        Err(TransportError::Closed)
    ));
    let mut buf = [0u8; 16];
    assert!(matches!(transport.recv(&mut buf).await, Err(TransportError::Closed)));

    UdpSocket::bind(addr).await.expect("port still held after close");
}

#[tokio::test]
async fn unresolvable_peer_is_skipped() {
    let (socket, mut names) = loopback().await;
    names.insert("Ghost", NodeAddress::new("ghost.invalid", 5001));

    let transport = Transport::with_socket(socket, &names, Duration::ZERO).await.unwrap();
    assert!(transport.address_of("A").is_some());
    assert!(transport.address_of("Ghost").is_none());

    let envelope = Envelope::new("lsr", MessageKind::Data, "A", "Ghost");
    assert!(matches!(
        transport.send("Ghost", &envelope).await,
        Err(TransportError::UnknownNode(node)) if node == "Ghost"
    ));
}
