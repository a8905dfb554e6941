pub mod connection;
pub mod handler;
pub mod hub;
pub mod protocol;
pub mod session;

pub use handler::room_socket;
pub use hub::{Client, ConnectionId, Hub};
pub use protocol::{ClientMessage, ErrorSignal, ServerMessage};
