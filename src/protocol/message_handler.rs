use chrono::{DateTime, Utc};
use log::debug;
use serde_json::Value;

use super::envelope::{DecodeError, Envelope, MessageKind, HEADER_CAME_FROM, HEADER_SENT_AT};
use super::lsa::Lsa;
use crate::network::LinkStateDb;
use crate::NodeName;

/// Something the application can observe about a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeEvent {
    /// A data or info message addressed to this node.
    Delivered(Envelope),
    RoundTrip { peer: NodeName, rtt_ms: f64 },
}

/// Side effects the processing task must carry out for one message.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Straight to a neighbor, bypassing the routing table.
    Transmit { target: NodeName, envelope: Envelope },
    /// Through the send path.
    Route(Envelope),
    Notify(NodeEvent),
}

/// The node-local facts the state machine needs.
#[derive(Debug, Clone, Copy)]
pub struct HandlerContext<'a> {
    pub name: &'a str,
    pub neighbors: &'a [NodeName],
    pub protocol_tag: &'a str,
}

pub fn timestamp_secs(now: DateTime<Utc>) -> f64 {
    now.timestamp_micros() as f64 / 1_000_000.0
}

/// Runs one decoded message through the state machine. Protocol drops
/// (expired ttl, duplicates, foreign echoes) yield no actions.
pub fn handle_envelope(
    ctx: HandlerContext<'_>,
    db: &mut LinkStateDb,
    mut envelope: Envelope,
    now: DateTime<Utc>,
) -> Result<Vec<Action>, DecodeError> {
    if envelope.ttl <= 0 {
        debug!(
            "[{}] dropping {} from {}: hop limit exhausted",
            ctx.name, envelope.kind, envelope.src
        );
        return Ok(Vec::new());
    }
    envelope.ttl -= 1;

    let actions = match envelope.kind {
        MessageKind::Hello => handle_hello(ctx, envelope),
        MessageKind::Echo => handle_echo(ctx, envelope, now),
        MessageKind::Lsa => handle_lsa(ctx, db, envelope)?,
        MessageKind::Data => {
            if envelope.dst == ctx.name {
                vec![Action::Notify(NodeEvent::Delivered(envelope))]
            } else {
                vec![Action::Route(envelope)]
            }
        }
        MessageKind::Info => {
            if envelope.dst == ctx.name {
                vec![Action::Notify(NodeEvent::Delivered(envelope))]
            } else {
                debug!("[{}] info for {} not forwarded", ctx.name, envelope.dst);
                Vec::new()
            }
        }
        MessageKind::Other(ref kind) => {
            debug!("[{}] ignoring message kind {:?} from {}", ctx.name, kind, envelope.src);
            Vec::new()
        }
    };

    Ok(actions)
}

fn handle_hello(ctx: HandlerContext<'_>, hello: Envelope) -> Vec<Action> {
    // Hello is never forwarded
    if hello.dst != ctx.name {
        return Vec::new();
    }

    let mut echo = Envelope::new(hello.proto.clone(), MessageKind::Echo, ctx.name, hello.src.clone());
    if let Some(sent_at) = hello.headers.get(HEADER_SENT_AT) {
        echo = echo.with_header(HEADER_SENT_AT, sent_at.clone());
    }

    vec![Action::Route(echo)]
}

fn handle_echo(ctx: HandlerContext<'_>, echo: Envelope, now: DateTime<Utc>) -> Vec<Action> {
    if echo.dst != ctx.name {
        return Vec::new();
    }

    match echo.headers.get(HEADER_SENT_AT).and_then(Value::as_f64) {
        Some(sent_at) => {
            let rtt_ms = (timestamp_secs(now) - sent_at) * 1000.0;
            vec![Action::Notify(NodeEvent::RoundTrip {
                peer: echo.src,
                rtt_ms,
            })]
        }
        None => {
            debug!("[{}] echo from {} carries no send timestamp", ctx.name, echo.src);
            Vec::new()
        }
    }
}

fn handle_lsa(
    ctx: HandlerContext<'_>,
    db: &mut LinkStateDb,
    envelope: Envelope,
) -> Result<Vec<Action>, DecodeError> {
    let lsa = Lsa::from_payload(&envelope.payload)?;

    if !db.apply(&lsa) {
        debug!("[{}] duplicate LSA {} absorbed", ctx.name, lsa.id);
        return Ok(Vec::new());
    }

    debug!(
        "[{}] merged LSA {} from {} ({} links)",
        ctx.name,
        lsa.id,
        lsa.node,
        lsa.links.len()
    );

    let came_from = envelope.header_str(HEADER_CAME_FROM);
    let actions = ctx
        .neighbors
        .iter()
        .filter(|n| Some(n.as_str()) != came_from)
        .map(|neighbor| Action::Transmit {
            target: neighbor.clone(),
            envelope: Envelope::new(ctx.protocol_tag, MessageKind::Lsa, ctx.name, neighbor.clone())
                .with_ttl(envelope.ttl)
                .with_header(HEADER_CAME_FROM, ctx.name)
                .with_payload(envelope.payload.clone()),
        })
        .collect();

    Ok(actions)
}
