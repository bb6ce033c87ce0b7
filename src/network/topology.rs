use std::collections::{HashSet, VecDeque};

use crate::protocol::Lsa;
use crate::{Graph, NodeName, LINK_COST};

/// The locally learned topology plus the ids of announcements already
/// processed. Both live together so one lock covers an LSA merge and the
/// periodic self refresh.
#[derive(Debug, Clone, Default)]
pub struct LinkStateDb {
    graph: Graph,
    seen: HashSet<String>,
    seen_order: VecDeque<String>,
    seen_capacity: Option<usize>,
}

impl LinkStateDb {
    pub fn new(seen_capacity: Option<usize>) -> Self {
        Self {
            seen_capacity,
            ..Self::default()
        }
    }

    pub fn seeded(owner: &str, neighbors: &[NodeName], seen_capacity: Option<usize>) -> Self {
        let mut db = Self::new(seen_capacity);
        db.refresh_links(owner, neighbors);
        db
    }

    /// Re-asserts `node`'s configured neighbors at the fixed link cost.
    /// Other entries for `node` are left alone.
    pub fn refresh_links(&mut self, node: &str, neighbors: &[NodeName]) {
        let entry = self.graph.entry(node.to_string()).or_default();
        for neighbor in neighbors {
            entry.insert(neighbor.clone(), LINK_COST);
        }
    }

    pub fn has_seen(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Returns false when the id was already known.
    pub fn mark_seen(&mut self, id: &str) -> bool {
        if !self.seen.insert(id.to_string()) {
            return false;
        }

        if let Some(capacity) = self.seen_capacity {
            self.seen_order.push_back(id.to_string());
            while self.seen_order.len() > capacity.max(1) {
                if let Some(oldest) = self.seen_order.pop_front() {
                    self.seen.remove(&oldest);
                }
            }
        }

        true
    }

    /// Merges an announcement unless its id was seen before. Returns whether
    /// the graph was touched.
    pub fn apply(&mut self, lsa: &Lsa) -> bool {
        if !self.mark_seen(&lsa.id) {
            return false;
        }

        let entry = self.graph.entry(lsa.node.clone()).or_default();
        for (neighbor, weight) in &lsa.links {
            entry.insert(neighbor.clone(), *weight);
        }

        true
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn snapshot(&self) -> Graph {
        self.graph.clone()
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}
