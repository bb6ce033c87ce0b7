use std::fmt;

use serde::Deserialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::NodeName;

pub const DEFAULT_TTL: i64 = 8;

/// Send timestamp (seconds since the epoch) carried by hello and echo.
pub const HEADER_SENT_AT: &str = "t0";
/// Identity of the node that relayed an announcement, not its originator.
pub const HEADER_CAME_FROM: &str = "came_from";

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("message is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("malformed envelope: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed {kind} payload: {source}")]
    Payload {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum MessageKind {
    Hello,
    Echo,
    Lsa,
    Data,
    Info,
    /// Anything else on the wire, including a missing `type`.
    Other(String),
}

impl MessageKind {
    pub fn as_str(&self) -> &str {
        match self {
            MessageKind::Hello => "hello",
            MessageKind::Echo => "echo",
            MessageKind::Lsa => "lsa",
            MessageKind::Data => "data",
            MessageKind::Info => "info",
            MessageKind::Other(s) => s,
        }
    }
}

impl Default for MessageKind {
    fn default() -> Self {
        MessageKind::Other(String::new())
    }
}

impl From<String> for MessageKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "hello" => MessageKind::Hello,
            "echo" => MessageKind::Echo,
            "lsa" => MessageKind::Lsa,
            "data" => MessageKind::Data,
            "info" => MessageKind::Info,
            _ => MessageKind::Other(s),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_ttl() -> i64 {
    DEFAULT_TTL
}

/// A protocol message as it travels between nodes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub proto: String,
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
    #[serde(rename = "from", default)]
    pub src: NodeName,
    #[serde(rename = "to", default)]
    pub dst: NodeName,
    #[serde(default = "default_ttl")]
    pub ttl: i64,
    #[serde(default)]
    pub headers: Map<String, Value>,
    #[serde(default)]
    pub payload: Map<String, Value>,
}

impl Envelope {
    pub fn new(
        proto: impl Into<String>,
        kind: MessageKind,
        src: impl Into<NodeName>,
        dst: impl Into<NodeName>,
    ) -> Self {
        Self {
            proto: proto.into(),
            kind,
            src: src.into(),
            dst: dst.into(),
            ttl: DEFAULT_TTL,
            headers: Map::new(),
            payload: Map::new(),
        }
    }

    pub fn with_ttl(mut self, ttl: i64) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_payload(mut self, payload: Map<String, Value>) -> Self {
        self.payload = payload;
        self
    }

    pub fn header_str(&self, key: &str) -> Option<&str> {
        self.headers.get(key).and_then(Value::as_str)
    }

    pub fn encode(&self) -> String {
        json!({
            "proto": self.proto,
            "type": self.kind.as_str(),
            "from": self.src,
            "to": self.dst,
            "ttl": self.ttl,
            "headers": self.headers,
            "payload": self.payload,
        })
        .to_string()
    }

    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn decode_bytes(raw: &[u8]) -> Result<Self, DecodeError> {
        Self::decode(std::str::from_utf8(raw)?)
    }
}
