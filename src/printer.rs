// src/printer.rs - Printer-control capability surface
//
// The bridge does not speak the physical printer protocol itself; the host
// environment provides an implementation of this trait (the binary ships a
// simulated one). All state the bridge forwards is opaque JSON.
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrinterControlError {
    #[error("file is not printable gcode")]
    InvalidFileType,
    #[error("file location is not accessible to the printer")]
    InvalidFileLocation,
    #[error("printer action failed: {0}")]
    Failed(String),
}

/// State of the link between the host and the physical printer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrinterLink {
    Closed,
    Connecting,
    Operational,
}

#[async_trait]
pub trait PrinterControl: Send + Sync {
    async fn get_current_connection(&self) -> PrinterLink;

    async fn connect(&self) -> Result<(), PrinterControlError>;

    async fn disconnect(&self) -> Result<(), PrinterControlError>;

    /// Current printer state snapshot (job, progress, state flags) as opaque
    /// structured data.
    async fn get_current_data(&self) -> Result<Value, PrinterControlError>;

    /// Current temperature readings keyed by tool/bed.
    async fn get_current_temperatures(&self) -> Result<Value, PrinterControlError>;

    async fn select_file(
        &self,
        path: &Path,
        from_sd: bool,
        print_immediately: bool,
    ) -> Result<(), PrinterControlError>;

    async fn start_print(&self) -> Result<(), PrinterControlError>;

    async fn pause_print(&self) -> Result<(), PrinterControlError>;

    async fn cancel_print(&self) -> Result<(), PrinterControlError>;

    async fn resume_print(&self) -> Result<(), PrinterControlError>;
}
