use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{anyhow, Context};
use log::{debug, warn};
use thiserror::Error;
use tokio::net::{lookup_host, UdpSocket};

use crate::config::{NameTable, NodeAddress};
use crate::protocol::Envelope;
use crate::NodeName;

const SEND_ATTEMPTS: usize = 2;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no address known for node {0}")]
    UnknownNode(NodeName),

    #[error("transport closed")]
    Closed,

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

/// One UDP endpoint plus the resolved address of every named node. The
/// socket is released on `close`.
#[derive(Debug)]
pub struct Transport {
    socket: Mutex<Option<Arc<UdpSocket>>>,
    addresses: HashMap<NodeName, SocketAddr>,
    retry_backoff: Duration,
}

async fn resolve(address: &NodeAddress) -> anyhow::Result<SocketAddr> {
    let candidates: Vec<SocketAddr> = lookup_host((address.host.as_str(), address.port))
        .await
        .with_context(|| format!("resolving {}:{}", address.host, address.port))?
        .collect();

    candidates
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| candidates.first())
        .copied()
        .ok_or_else(|| anyhow!("{}:{} resolved to no address", address.host, address.port))
}

impl Transport {
    /// Binds the address registered for `name` in the name table.
    pub async fn bind(name: &str, names: &NameTable, retry_backoff: Duration) -> anyhow::Result<Self> {
        let own = names
            .get(name)
            .ok_or_else(|| anyhow!("node {} is missing from the name table", name))?;
        let bind_addr = resolve(own).await?;
        let socket = UdpSocket::bind(bind_addr)
            .await
            .with_context(|| format!("binding {} for node {}", bind_addr, name))?;

        Self::with_socket(socket, names, retry_backoff).await
    }

    /// Uses an already bound socket.
    pub async fn with_socket(
        socket: UdpSocket,
        names: &NameTable,
        retry_backoff: Duration,
    ) -> anyhow::Result<Self> {
        let mut addresses = HashMap::new();
        for (node, address) in names.iter() {
            match resolve(address).await {
                Ok(addr) => {
                    addresses.insert(node.clone(), addr);
                }
                Err(e) => warn!("Skipping node {}: {:#}", node, e),
            }
        }

        Ok(Self {
            socket: Mutex::new(Some(Arc::new(socket))),
            addresses,
            retry_backoff,
        })
    }

    fn socket(&self) -> Result<Arc<UdpSocket>, TransportError> {
        self.socket
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(TransportError::Closed)
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        match self.socket() {
            Ok(socket) => socket.local_addr(),
            Err(_) => Err(io::Error::new(io::ErrorKind::NotConnected, "transport closed")),
        }
    }

    pub fn address_of(&self, node: &str) -> Option<SocketAddr> {
        self.addresses.get(node).copied()
    }

    pub async fn send(&self, target: &str, envelope: &Envelope) -> Result<(), TransportError> {
        let socket = self.socket()?;
        let addr = self
            .address_of(target)
            .ok_or_else(|| TransportError::UnknownNode(target.to_string()))?;
        let data = envelope.encode();

        let mut attempt = 1;
        loop {
            match socket.send_to(data.as_bytes(), addr).await {
                Ok(_) => {
                    debug!("Sent {} to {} at {}", envelope.kind, target, addr);
                    return Ok(());
                }
                Err(e) if attempt < SEND_ATTEMPTS => {
                    warn!("Send to {} failed ({}), retrying", target, e);
                    attempt += 1;
                    tokio::time::sleep(self.retry_backoff).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub async fn recv(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr), TransportError> {
        let socket = self.socket()?;
        Ok(socket.recv_from(buf).await?)
    }

    /// Drops our handle on the socket. The port is freed once a pending
    /// `recv` holding its own handle returns or is cancelled.
    pub fn close(&self) {
        self.socket.lock().unwrap_or_else(PoisonError::into_inner).take();
    }

    pub fn is_closed(&self) -> bool {
        self.socket
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}
