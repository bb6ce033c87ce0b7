pub mod dijkstra;

pub use dijkstra::{next_hop, shortest_paths, PathError, ShortestPaths};
