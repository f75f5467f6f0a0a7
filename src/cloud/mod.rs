// src/cloud/mod.rs - Server synchronization core
pub mod connection;
pub mod dispatcher;
pub mod queue;
pub mod registration;
pub mod sync_loop;
pub mod tracker;

pub use connection::{Connection, ConnectionError, ConnectionHandler, SocketState};
pub use dispatcher::{CommandDispatcher, DispatchError, PrintRequest, ServerMessage};
pub use queue::OutboundQueue;
pub use registration::register_device;
pub use sync_loop::CloudBridge;
pub use tracker::{
    EventTracker, OutboundMessage, PrintEvent, PrintEventKind, PrintSession, StatusPayload,
};
