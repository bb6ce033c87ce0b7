pub mod topology;
pub mod transport;

pub use topology::LinkStateDb;
pub use transport::{Transport, TransportError};
