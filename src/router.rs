use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use log::{debug, error, info, warn};
use serde_json::{Map, Value};
use tokio::net::UdpSocket;
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::algorithms::PathError;
use crate::config::{EngineConfig, NameTable, StaticTopology};
use crate::network::{LinkStateDb, Transport};
use crate::protocol::message_handler::timestamp_secs;
use crate::protocol::{
    handle_envelope, resolve, task_manager, Action, Envelope, Forwarding, HandlerContext, Lsa,
    MessageKind, NodeEvent, RoutingTable, HEADER_CAME_FROM, HEADER_SENT_AT,
};
use crate::{Graph, NodeName};

const EVENT_CAPACITY: usize = 256;

/// State shared by the node's activities.
pub(crate) struct NodeContext {
    pub name: NodeName,
    pub neighbors: Vec<NodeName>,
    pub config: EngineConfig,
    pub transport: Transport,
    pub link_state: Mutex<LinkStateDb>,
    pub routing_table: RwLock<Arc<RoutingTable>>,
    pub events: broadcast::Sender<NodeEvent>,
    pub is_running: AtomicBool,
}

impl NodeContext {
    fn handler_context(&self) -> HandlerContext<'_> {
        HandlerContext {
            name: &self.name,
            neighbors: &self.neighbors,
            protocol_tag: &self.config.protocol_tag,
        }
    }

    pub async fn routing_snapshot(&self) -> Arc<RoutingTable> {
        self.routing_table.read().await.clone()
    }

    /// Send path: local delivery, a resolved next hop, or one-hop fan-out.
    pub async fn send(&self, envelope: Envelope) {
        let table = self.routing_snapshot().await;

        match resolve(&self.name, &table, &self.neighbors, &envelope) {
            Forwarding::Local => self.notify(NodeEvent::Delivered(envelope)),
            Forwarding::Unicast(hop) => self.transmit(&hop, &envelope).await,
            Forwarding::Fanout(targets) => {
                debug!(
                    "[{}] no route to {}, sending {} to all {} neighbors",
                    self.name,
                    envelope.dst,
                    envelope.kind,
                    targets.len()
                );
                for target in targets {
                    self.transmit(&target, &envelope).await;
                }
            }
        }
    }

    pub async fn transmit(&self, target: &str, envelope: &Envelope) {
        if let Err(e) = self.transport.send(target, envelope).await {
            warn!("[{}] failed to send {} to {}: {}", self.name, envelope.kind, target, e);
        }
    }

    pub fn notify(&self, event: NodeEvent) {
        match &event {
            NodeEvent::Delivered(envelope) => {
                info!(
                    "[{}] {} delivered from {} -> {} | payload={}",
                    self.name,
                    envelope.kind.as_str().to_uppercase(),
                    envelope.src,
                    envelope.dst,
                    Value::Object(envelope.payload.clone())
                );
            }
            NodeEvent::RoundTrip { peer, rtt_ms } => {
                info!("[{}] RTT with {}: {:.1} ms", self.name, peer, rtt_ms);
            }
        }
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Decodes and runs one inbound datagram through the state machine.
    pub async fn process_raw(&self, raw: &[u8]) {
        let envelope = match Envelope::decode_bytes(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                let preview: String = String::from_utf8_lossy(raw).chars().take(60).collect();
                warn!("[{}] invalid packet: {}... err={}", self.name, preview, e);
                return;
            }
        };

        let result = {
            let mut db = self.link_state.lock().await;
            handle_envelope(self.handler_context(), &mut db, envelope, Utc::now())
        };

        match result {
            Ok(actions) => self.perform(actions).await,
            Err(e) => warn!("[{}] discarding message: {}", self.name, e),
        }
    }

    pub async fn perform(&self, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::Transmit { target, envelope } => self.transmit(&target, &envelope).await,
                Action::Route(envelope) => self.send(envelope).await,
                Action::Notify(event) => self.notify(event),
            }
        }
    }

    /// Re-asserts configured links, rebuilds the routing table from the
    /// current graph and publishes it. Returns whether the table changed.
    pub async fn recompute_routes(&self) -> Result<bool, PathError> {
        let graph = {
            let mut db = self.link_state.lock().await;
            db.refresh_links(&self.name, &self.neighbors);
            db.snapshot()
        };

        let table = RoutingTable::compute(&graph, &self.name)?;

        let mut current = self.routing_table.write().await;
        if **current == table {
            debug!("[{}] routing table unchanged ({} routes)", self.name, table.len());
            return Ok(false);
        }
        info!("[{}] routing table: {}", self.name, table);
        *current = Arc::new(table);
        Ok(true)
    }

    /// Hello with a send timestamp to every neighbor.
    pub async fn probe(&self) {
        let sent_at = timestamp_secs(Utc::now());
        for neighbor in &self.neighbors {
            let hello = Envelope::new(
                self.config.protocol_tag.clone(),
                MessageKind::Hello,
                self.name.clone(),
                neighbor.clone(),
            )
            .with_ttl(self.config.default_hop_limit)
            .with_header(HEADER_SENT_AT, sent_at);
            self.transmit(neighbor, &hello).await;
        }
    }

    /// Originates a fresh self-announcement to every neighbor.
    pub async fn announce(&self) {
        let lsa = Lsa::originate(&self.name, &self.neighbors);

        // Our own announcement coming back around is a duplicate
        self.link_state.lock().await.mark_seen(&lsa.id);

        debug!("[{}] announcing LSA {}", self.name, lsa.id);
        let payload = lsa.to_payload();
        for neighbor in &self.neighbors {
            let envelope = Envelope::new(
                self.config.protocol_tag.clone(),
                MessageKind::Lsa,
                self.name.clone(),
                neighbor.clone(),
            )
            .with_ttl(self.config.default_hop_limit)
            .with_header(HEADER_CAME_FROM, self.name.clone())
            .with_payload(payload.clone());
            self.transmit(neighbor, &envelope).await;
        }
    }
}

/// One simulated routing node.
pub struct Router {
    ctx: Arc<NodeContext>,
    shutdown_tx: broadcast::Sender<()>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Router {
    /// Binds the address the name table registers for `name`, with the
    /// neighbors the static topology lists for it.
    pub async fn bind(
        name: &str,
        names: &NameTable,
        topology: &StaticTopology,
        config: EngineConfig,
    ) -> anyhow::Result<Self> {
        let transport = Transport::bind(name, names, config.send_retry_backoff()).await?;
        Ok(Self::from_transport(
            name,
            transport,
            topology.neighbors_of(name).to_vec(),
            config,
        ))
    }

    /// Builds a router on an already bound socket.
    pub async fn with_socket(
        name: &str,
        socket: UdpSocket,
        names: &NameTable,
        neighbors: Vec<NodeName>,
        config: EngineConfig,
    ) -> anyhow::Result<Self> {
        let transport = Transport::with_socket(socket, names, config.send_retry_backoff()).await?;
        Ok(Self::from_transport(name, transport, neighbors, config))
    }

    fn from_transport(
        name: &str,
        transport: Transport,
        neighbors: Vec<NodeName>,
        config: EngineConfig,
    ) -> Self {
        let mut unique: Vec<NodeName> = Vec::with_capacity(neighbors.len());
        for neighbor in neighbors {
            if neighbor != name && !unique.contains(&neighbor) {
                unique.push(neighbor);
            }
        }

        let link_state = LinkStateDb::seeded(name, &unique, config.seen_lsa_capacity);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (shutdown_tx, _) = broadcast::channel(1);

        let ctx = NodeContext {
            name: name.to_string(),
            neighbors: unique,
            config,
            transport,
            link_state: Mutex::new(link_state),
            routing_table: RwLock::new(Arc::new(RoutingTable::new())),
            events,
            is_running: AtomicBool::new(false),
        };

        Self {
            ctx: Arc::new(ctx),
            shutdown_tx,
            task_handles: Mutex::new(Vec::new()),
        }
    }

    /// Launches the receive, processing, route and probe activities.
    /// Starting an already started router is not supported.
    pub async fn start(&self) {
        self.ctx.is_running.store(true, Ordering::Relaxed);

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let handles = task_manager::start_tasks(&self.ctx, &self.shutdown_tx, inbound_tx, inbound_rx);

        let mut guard = self.task_handles.lock().await;
        guard.extend(handles);
        info!(
            "[{}] started on {:?} with neighbors {:?}",
            self.ctx.name,
            self.local_addr(),
            self.ctx.neighbors
        );
    }

    /// Signals every activity to stop and closes the transport. In-flight
    /// messages may be abandoned.
    pub async fn stop(&self) {
        self.ctx.is_running.store(false, Ordering::Relaxed);
        self.ctx.transport.close();
        let _ = self.shutdown_tx.send(());

        let handles: Vec<JoinHandle<()>> = self.task_handles.lock().await.drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                error!("[{}] task ended abnormally: {}", self.ctx.name, e);
            }
        }
        info!("[{}] stopped", self.ctx.name);
    }

    pub async fn send_data(&self, destination: &str, text: &str, hop_limit: i64) {
        let mut payload = Map::new();
        payload.insert("text".to_string(), Value::from(text));

        let envelope = Envelope::new(
            self.ctx.config.protocol_tag.clone(),
            MessageKind::Data,
            self.ctx.name.clone(),
            destination,
        )
        .with_ttl(hop_limit)
        .with_payload(payload);

        self.ctx.send(envelope).await;
    }

    /// Info messages are only consumed at their destination, never relayed.
    pub async fn send_info(&self, destination: &str, payload: Map<String, Value>) {
        let envelope = Envelope::new(
            self.ctx.config.protocol_tag.clone(),
            MessageKind::Info,
            self.ctx.name.clone(),
            destination,
        )
        .with_ttl(self.ctx.config.default_hop_limit)
        .with_payload(payload);

        self.ctx.send(envelope).await;
    }

    /// Recomputes routes immediately instead of waiting for the next period.
    pub async fn recompute_routes(&self) -> Result<bool, PathError> {
        self.ctx.recompute_routes().await
    }

    pub async fn routing_table(&self) -> Arc<RoutingTable> {
        self.ctx.routing_snapshot().await
    }

    pub async fn topology(&self) -> Graph {
        self.ctx.link_state.lock().await.snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NodeEvent> {
        self.ctx.events.subscribe()
    }

    pub fn name(&self) -> &str {
        &self.ctx.name
    }

    pub fn neighbors(&self) -> &[NodeName] {
        &self.ctx.neighbors
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.ctx.transport.local_addr()
    }

    pub fn is_running(&self) -> bool {
        self.ctx.is_running.load(Ordering::Relaxed)
    }
}
