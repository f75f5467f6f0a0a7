//! printlink - keeps a remote server synchronized with a 3D printer's live
//! state over one long-lived websocket and executes remote print commands.
//!
//! The core is [`cloud`]: an event tracker folds printer lifecycle events
//! into status payloads, a bounded queue hands them to a background sync
//! loop, and a command dispatcher routes inbound server frames back into
//! printer-control actions. Printer control and file storage are capability
//! traits ([`printer::PrinterControl`], [`file_manager::Storage`]) supplied
//! by the host.

pub mod cloud;
pub mod config;
pub mod file_manager;
pub mod printer;
pub mod simulator;

pub use cloud::CloudBridge;
pub use config::Config;
