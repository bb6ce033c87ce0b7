use crate::algorithms::{next_hop, shortest_paths, PathError};
use crate::Graph;
use std::collections::HashMap;

fn graph(edges: &[(&str, &str, f64)]) -> Graph {
    let mut g: Graph = HashMap::new();
    for &(from, to, w) in edges {
        g.entry(from.to_string()).or_default().insert(to.to_string(), w);
    }
    g
}

fn preds(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Floyd-Warshall reference over the same node set.
fn all_pairs(g: &Graph, nodes: &[String]) -> HashMap<(String, String), f64> {
    let mut d = HashMap::new();
    for a in nodes {
        for b in nodes {
            let w = if a == b {
                0.0
            } else {
                g.get(a).and_then(|l| l.get(b)).copied().unwrap_or(f64::INFINITY)
            };
            d.insert((a.clone(), b.clone()), w);
        }
    }
    for k in nodes {
        for i in nodes {
            for j in nodes {
                let through = d[&(i.clone(), k.clone())] + d[&(k.clone(), j.clone())];
                if through < d[&(i.clone(), j.clone())] {
                    d.insert((i.clone(), j.clone()), through);
                }
            }
        }
    }
    d
}

#[test]
fn weighted_detour_beats_direct_link() {
    let g = graph(&[("A", "B", 4.0), ("A", "C", 1.0), ("C", "B", 1.0), ("B", "D", 1.0)]);
    let paths = shortest_paths(&g, "A").unwrap();

    assert_eq!(paths.distance("A"), 0.0);
    assert_eq!(paths.distance("C"), 1.0);
    assert_eq!(paths.distance("B"), 2.0);
    assert_eq!(paths.distance("D"), 3.0);
    assert_eq!(paths.predecessors.get("B").map(String::as_str), Some("C"));
    assert!(!paths.predecessors.contains_key("A"));
}

#[test]
fn unreachable_nodes_are_infinite_without_predecessor() {
    // E only points at A; nothing reaches E
    let g = graph(&[("A", "B", 1.0), ("E", "A", 1.0), ("F", "G", 1.0)]);
    let paths = shortest_paths(&g, "A").unwrap();

    for node in ["E", "F", "G"] {
        assert!(paths.distances[node].is_infinite(), "{node} should be unreachable");
        assert!(!paths.predecessors.contains_key(node));
        assert!(!paths.is_reachable(node));
    }
    assert!(paths.is_reachable("B"));
}

#[test]
fn nodes_known_only_as_neighbors_are_included() {
    let g = graph(&[("A", "B", 1.0), ("B", "C", 1.0)]);
    let paths = shortest_paths(&g, "A").unwrap();

    assert_eq!(paths.distances.len(), 3);
    assert_eq!(paths.distance("C"), 2.0);
}

#[test]
fn matches_exhaustive_reference_on_generated_graphs() {
    // Small deterministic LCG so the graphs vary without a rand dependency
    let mut seed: u64 = 0x5eed;
    let mut next = move || {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        seed >> 33
    };

    for _ in 0..20 {
        let nodes: Vec<String> = (0..7).map(|i| format!("n{i}")).collect();
        let mut g: Graph = HashMap::new();
        for a in &nodes {
            g.entry(a.clone()).or_default();
            for b in &nodes {
                if a != b && next() % 3 == 0 {
                    let w = (next() % 10) as f64;
                    g.get_mut(a).unwrap().insert(b.clone(), w);
                }
            }
        }

        let reference = all_pairs(&g, &nodes);
        let paths = shortest_paths(&g, "n0").unwrap();
        for n in &nodes {
            let expected = reference[&("n0".to_string(), n.clone())];
            assert_eq!(paths.distance(n), expected, "distance to {n}");
            if n != "n0" {
                assert_eq!(paths.predecessors.contains_key(n), expected.is_finite());
            }
        }
    }
}

#[test]
fn negative_or_nan_weights_are_rejected() {
    let g = graph(&[("A", "B", -1.0)]);
    assert_eq!(
        shortest_paths(&g, "A").unwrap_err(),
        PathError::InvalidWeight {
            from: "A".to_string(),
            to: "B".to_string(),
            weight: -1.0
        }
    );

    let g = graph(&[("A", "B", f64::NAN)]);
    assert!(shortest_paths(&g, "A").is_err());
}

#[test]
fn zero_weight_edges_keep_a_tree() {
    let g = graph(&[("A", "B", 0.0), ("B", "C", 0.0), ("C", "A", 0.0)]);
    let paths = shortest_paths(&g, "A").unwrap();

    assert_eq!(paths.distance("C"), 0.0);
    assert_eq!(next_hop("C", "A", &paths.predecessors).as_deref(), Some("B"));
}

#[test]
fn next_hop_of_source_is_source() {
    assert_eq!(next_hop("A", "A", &HashMap::new()).as_deref(), Some("A"));
}

#[test]
fn next_hop_of_unreachable_is_none() {
    let p = preds(&[("B", "A")]);
    assert_eq!(next_hop("Z", "A", &p), None);
}

#[test]
fn next_hop_of_adjacent_destination_is_itself() {
    let p = preds(&[("B", "A"), ("C", "B")]);
    assert_eq!(next_hop("B", "A", &p).as_deref(), Some("B"));
}

#[test]
fn next_hop_walks_back_to_first_hop() {
    let p = preds(&[("B", "A"), ("C", "B"), ("D", "C")]);
    assert_eq!(next_hop("D", "A", &p).as_deref(), Some("B"));
}

#[test]
fn next_hop_terminates_on_predecessor_cycle() {
    let p = preds(&[("X", "Y"), ("Y", "Z"), ("Z", "X")]);
    assert_eq!(next_hop("X", "A", &p), None);
}

#[test]
fn next_hop_is_none_when_chain_ends_away_from_source() {
    let p = preds(&[("D", "C"), ("C", "Q")]);
    assert_eq!(next_hop("D", "A", &p), None);
}
