pub mod client;
pub mod protocol;
pub mod server;

pub use client::SocketLink;
pub use protocol::*;
pub use server::SocketServer;
