mod dijkstra;
mod envelope;
mod transport;
