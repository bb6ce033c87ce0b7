use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use thiserror::Error;

use crate::{Graph, NodeName};

#[derive(Debug, Error, PartialEq)]
pub enum PathError {
    #[error("link {from} -> {to} has invalid weight {weight}")]
    InvalidWeight { from: NodeName, to: NodeName, weight: f64 },
}

/// Result of a single-source shortest path run.
#[derive(Debug, Clone, Default)]
pub struct ShortestPaths {
    /// Every node seen in the graph; `f64::INFINITY` when unreachable.
    pub distances: HashMap<NodeName, f64>,
    /// Immediate predecessor on a shortest path. Absent for the source and
    /// for unreachable nodes.
    pub predecessors: HashMap<NodeName, NodeName>,
}

impl ShortestPaths {
    pub fn distance(&self, node: &str) -> f64 {
        self.distances.get(node).copied().unwrap_or(f64::INFINITY)
    }

    pub fn is_reachable(&self, node: &str) -> bool {
        self.distance(node).is_finite()
    }
}

#[derive(Debug)]
struct State {
    cost: f64,
    node: NodeName,
}

impl Eq for State {}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.cost.total_cmp(&other.cost) == Ordering::Equal
    }
}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap
        other.cost.total_cmp(&self.cost)
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn validate(graph: &Graph) -> Result<(), PathError> {
    for (from, links) in graph {
        for (to, &weight) in links {
            if !weight.is_finite() || weight < 0.0 {
                return Err(PathError::InvalidWeight {
                    from: from.clone(),
                    to: to.clone(),
                    weight,
                });
            }
        }
    }
    Ok(())
}

pub fn shortest_paths(graph: &Graph, source: &str) -> Result<ShortestPaths, PathError> {
    validate(graph)?;

    let mut distances: HashMap<NodeName, f64> = HashMap::new();
    let mut predecessors: HashMap<NodeName, NodeName> = HashMap::new();
    let mut heap = BinaryHeap::new();

    // Initialize distances for keys and for nodes only known as neighbors
    for (node, links) in graph {
        distances.insert(node.clone(), f64::INFINITY);
        for neighbor in links.keys() {
            distances.insert(neighbor.clone(), f64::INFINITY);
        }
    }
    distances.insert(source.to_string(), 0.0);

    heap.push(State {
        cost: 0.0,
        node: source.to_string(),
    });

    while let Some(State { cost, node }) = heap.pop() {
        // Skip stale queue entries
        if cost > distances.get(&node).copied().unwrap_or(f64::INFINITY) {
            continue;
        }

        let Some(links) = graph.get(&node) else {
            continue;
        };

        for (neighbor, &weight) in links {
            let new_cost = cost + weight;

            if new_cost < distances.get(neighbor).copied().unwrap_or(f64::INFINITY) {
                distances.insert(neighbor.clone(), new_cost);
                predecessors.insert(neighbor.clone(), node.clone());

                heap.push(State {
                    cost: new_cost,
                    node: neighbor.clone(),
                });
            }
        }
    }

    Ok(ShortestPaths {
        distances,
        predecessors,
    })
}

/// Walks predecessors back from `dest` to find the neighbor of `source` on
/// the path. The walk is capped so a malformed map can never loop forever.
pub fn next_hop(
    dest: &str,
    source: &str,
    predecessors: &HashMap<NodeName, NodeName>,
) -> Option<NodeName> {
    if dest == source {
        return Some(source.to_string());
    }

    let max_steps = predecessors.len() + 1;
    let mut current = dest;

    for _ in 0..max_steps {
        let prev = predecessors.get(current)?;
        if prev == source {
            return Some(current.to_string());
        }
        current = prev;
    }

    None
}
