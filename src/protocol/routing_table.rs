use std::collections::BTreeMap;
use std::fmt;

use crate::algorithms::{next_hop, shortest_paths, PathError};
use crate::{Graph, NodeName};

/// Destination -> next hop. Built whole and published as an immutable
/// snapshot; never edited in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingTable {
    entries: BTreeMap<NodeName, NodeName>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs Dijkstra from `source` and resolves a next hop for every other
    /// node in the graph. Unresolvable destinations are left out.
    pub fn compute(graph: &Graph, source: &str) -> Result<Self, PathError> {
        let mut entries = BTreeMap::new();

        if graph.is_empty() {
            return Ok(Self { entries });
        }

        let paths = shortest_paths(graph, source)?;

        for dest in paths.distances.keys() {
            if dest == source {
                continue;
            }
            if let Some(hop) = next_hop(dest, source, &paths.predecessors) {
                entries.insert(dest.clone(), hop);
            }
        }

        Ok(Self { entries })
    }

    pub fn next_hop(&self, destination: &str) -> Option<&NodeName> {
        self.entries.get(destination)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeName, &NodeName)> {
        self.entries.iter()
    }
}

impl FromIterator<(NodeName, NodeName)> for RoutingTable {
    fn from_iter<I: IntoIterator<Item = (NodeName, NodeName)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for RoutingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entries.is_empty() {
            return write!(f, "(no routes)");
        }
        let mut first = true;
        for (dest, hop) in &self.entries {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{} via {}", dest, hop)?;
            first = false;
        }
        Ok(())
    }
}
