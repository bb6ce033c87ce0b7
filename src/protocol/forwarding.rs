use super::envelope::{Envelope, MessageKind};
use super::routing_table::RoutingTable;
use crate::NodeName;

/// Where the send path puts a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Forwarding {
    /// Addressed to this node; no network I/O.
    Local,
    Unicast(NodeName),
    /// No next hop known: one copy to each configured neighbor. This is a
    /// one-hop fan-out, not a network-wide flood.
    Fanout(Vec<NodeName>),
}

pub fn resolve(
    me: &str,
    table: &RoutingTable,
    neighbors: &[NodeName],
    envelope: &Envelope,
) -> Forwarding {
    if envelope.dst == me {
        return Forwarding::Local;
    }

    let mut next_hop = None;
    if envelope.kind == MessageKind::Data {
        next_hop = table.next_hop(&envelope.dst).cloned();
    }

    // Routes may not have converged yet; a direct neighbor is always reachable
    if next_hop.is_none() && neighbors.iter().any(|n| *n == envelope.dst) {
        next_hop = Some(envelope.dst.clone());
    }

    match next_hop {
        Some(hop) => Forwarding::Unicast(hop),
        None => Forwarding::Fanout(neighbors.to_vec()),
    }
}
