use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::NodeName;

const MIN_LSA_EVERY_TICKS: u32 = 2;

/// Topology and name files wrap their content in a `config` object.
#[derive(Debug, Deserialize)]
struct ConfigFile<T> {
    config: T,
}

fn load_wrapped<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let file: ConfigFile<T> = serde_json::from_str(&content)
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(file.config)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAddress {
    pub host: String,
    pub port: u16,
}

impl NodeAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

/// Logical node name -> transport address.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NameTable(HashMap<NodeName, NodeAddress>);

impl NameTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_wrapped(path.as_ref())
    }

    pub fn insert(&mut self, name: impl Into<NodeName>, address: NodeAddress) {
        self.0.insert(name.into(), address);
    }

    pub fn get(&self, name: &str) -> Option<&NodeAddress> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeName, &NodeAddress)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Logical node name -> ordered list of configured neighbors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticTopology(HashMap<NodeName, Vec<NodeName>>);

impl StaticTopology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_wrapped(path.as_ref())
    }

    pub fn insert(&mut self, name: impl Into<NodeName>, neighbors: Vec<NodeName>) {
        self.0.insert(name.into(), neighbors);
    }

    pub fn neighbors_of(&self, name: &str) -> &[NodeName] {
        self.0.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub protocol_tag: String,
    pub hello_interval_ms: u64,
    pub route_interval_ms: u64,
    /// A self-announcement goes out every this many hello ticks. Values
    /// below 2 are raised to 2.
    pub lsa_every_ticks: u32,
    pub default_hop_limit: i64,
    pub recv_buffer: usize,
    pub recv_backoff_ms: u64,
    pub send_retry_backoff_ms: u64,
    /// Bound on remembered LSA ids. `None` keeps every id forever.
    pub seen_lsa_capacity: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            protocol_tag: "lsr".to_string(),
            hello_interval_ms: 1000,
            route_interval_ms: 1000,
            lsa_every_ticks: 3,
            default_hop_limit: 8,
            recv_buffer: 65535,
            recv_backoff_ms: 100,
            send_retry_backoff_ms: 10,
            seen_lsa_capacity: None,
        }
    }
}

impl EngineConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: EngineConfig = serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    pub fn hello_interval(&self) -> Duration {
        Duration::from_millis(self.hello_interval_ms.max(1))
    }

    pub fn route_interval(&self) -> Duration {
        Duration::from_millis(self.route_interval_ms.max(1))
    }

    pub fn recv_backoff(&self) -> Duration {
        Duration::from_millis(self.recv_backoff_ms)
    }

    pub fn send_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.send_retry_backoff_ms)
    }

    pub fn lsa_every_ticks(&self) -> u64 {
        u64::from(self.lsa_every_ticks.max(MIN_LSA_EVERY_TICKS))
    }
}
