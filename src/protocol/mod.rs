pub mod envelope;
pub mod forwarding;
pub mod lsa;
pub mod message_handler;
pub mod routing_table;
pub mod task_manager;

pub use envelope::*;
pub use forwarding::{resolve, Forwarding};
pub use lsa::Lsa;
pub use message_handler::{handle_envelope, Action, HandlerContext, NodeEvent};
pub use routing_table::RoutingTable;
