pub mod algorithms;
pub mod config;
pub mod network;
pub mod protocol;
pub mod router;

use std::collections::HashMap;

pub type NodeName = String;

/// Node name -> (neighbor name -> link weight).
pub type Graph = HashMap<NodeName, HashMap<NodeName, f64>>;

/// Weight assigned to every configured neighbor link.
pub const LINK_COST: f64 = 1.0;

pub use config::{EngineConfig, NameTable, NodeAddress, StaticTopology};
pub use protocol::{Envelope, MessageKind, NodeEvent, RoutingTable};
pub use router::Router;

#[cfg(test)]
mod test;
