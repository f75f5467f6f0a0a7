// src/cloud/dispatcher.rs - Inbound server commands
use crate::cloud::tracker::EventTracker;
use crate::printer::{PrinterControl, PrinterControlError};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("inbound message malformed: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("gcode fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("gcode persist failed: {0}")]
    Persist(#[from] std::io::Error),
    #[error(transparent)]
    Printer(#[from] PrinterControlError),
}

/// Inbound wire shape. All fields optional; a frame can carry a log-only
/// message, a command, or both.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerMessage {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub data: Option<PrintRequest>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrintRequest {
    pub gcode_id: String,
    pub gcode_name: String,
    pub gcode_url: String,
}

/// Maps decoded server messages onto printer-control actions.
///
/// Nothing here propagates: every failure is classified, logged, and the
/// dispatcher stays alive for the next frame.
pub struct CommandDispatcher {
    printer: Arc<dyn PrinterControl>,
    tracker: Arc<EventTracker>,
    http: reqwest::Client,
    gcode_folder: PathBuf,
}

impl CommandDispatcher {
    pub fn new(
        printer: Arc<dyn PrinterControl>,
        tracker: Arc<EventTracker>,
        http: reqwest::Client,
        gcode_folder: PathBuf,
    ) -> Self {
        Self {
            printer,
            tracker,
            http,
            gcode_folder,
        }
    }

    pub async fn handle_inbound(&self, raw: &str) {
        let message: ServerMessage = match serde_json::from_str(raw) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("ignoring undecodable server frame: {e}");
                return;
            }
        };

        if let Some(text) = message.message.as_deref().filter(|t| !t.is_empty()) {
            tracing::info!("server message: {text}");
        }

        let Some(command) = message.command.as_deref() else {
            return;
        };

        match command {
            "print" => match message.data {
                Some(request) => {
                    if let Err(e) = self.handle_print(request).await {
                        log_print_failure(&e);
                    }
                }
                None => tracing::warn!("print command carried no file data"),
            },
            "pause" => {
                if let Err(e) = self.printer.pause_print().await {
                    tracing::warn!("pause failed: {e}");
                }
            }
            "cancel" => {
                if let Err(e) = self.printer.cancel_print().await {
                    tracing::warn!("cancel failed: {e}");
                }
            }
            "resume" => {
                if let Err(e) = self.printer.resume_print().await {
                    tracing::warn!("resume failed: {e}");
                }
            }
            // Unknown commands are not an error; newer servers may speak a
            // wider vocabulary.
            _ => {}
        }
    }

    /// Fetch, persist, select, start. The job id binds before the fetch so
    /// status pushes during the download already reference it. Selection
    /// always uses the exact path the file was written to.
    async fn handle_print(&self, request: PrintRequest) -> Result<(), DispatchError> {
        self.tracker.set_job_id(request.gcode_id.clone());

        let local_path = self.gcode_folder.join(&request.gcode_name);
        let body = self
            .http
            .get(&request.gcode_url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        tokio::fs::write(&local_path, &body).await?;
        tracing::info!(
            "fetched {} ({} bytes) to {}",
            request.gcode_url,
            body.len(),
            local_path.display()
        );

        self.printer.select_file(&local_path, false, false).await?;
        self.printer.start_print().await?;
        tracing::info!("print started for job {}", request.gcode_id);
        Ok(())
    }
}

fn log_print_failure(error: &DispatchError) {
    match error {
        DispatchError::Fetch(e) => tracing::warn!("gcode fetch failed, print aborted: {e}"),
        DispatchError::Persist(e) => tracing::warn!("gcode persist failed, print aborted: {e}"),
        DispatchError::Printer(PrinterControlError::InvalidFileType) => {
            tracing::warn!("fetched file is not gcode, print aborted");
        }
        DispatchError::Printer(PrinterControlError::InvalidFileLocation) => {
            tracing::warn!("fetched file landed outside printable storage, print aborted");
        }
        DispatchError::Printer(PrinterControlError::Failed(reason)) => {
            tracing::warn!("print failed: {reason}");
        }
        DispatchError::Decode(e) => tracing::warn!("print command malformed: {e}"),
    }
}
