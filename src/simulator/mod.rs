// src/simulator/mod.rs - In-memory printer for running without hardware
use crate::cloud::tracker::PrintEventKind;
use crate::printer::{PrinterControl, PrinterControlError, PrinterLink};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tokio::sync::broadcast;

#[derive(Debug, Clone)]
struct SimState {
    link: PrinterLink,
    selected_file: Option<PathBuf>,
    printing: bool,
    paused: bool,
    progress: f64,
}

/// A stand-in printer-control implementation. Tracks just enough state to
/// exercise the bridge end to end and emits the lifecycle events a real host
/// would deliver.
pub struct SimulatedPrinter {
    state: Mutex<SimState>,
    events: broadcast::Sender<(PrintEventKind, Value)>,
}

impl SimulatedPrinter {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            state: Mutex::new(SimState {
                link: PrinterLink::Closed,
                selected_file: None,
                printing: false,
                paused: false,
                progress: 0.0,
            }),
            events,
        }
    }

    /// Lifecycle event feed for the host adapter.
    pub fn subscribe(&self) -> broadcast::Receiver<(PrintEventKind, Value)> {
        self.events.subscribe()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, kind: PrintEventKind, data: Value) {
        let _ = self.events.send((kind, data));
    }

    fn file_value(state: &SimState) -> Value {
        match &state.selected_file {
            Some(path) => json!({
                "origin": "local",
                "path": path.to_string_lossy(),
                "name": path.file_name().map(|n| n.to_string_lossy().into_owned()),
            }),
            None => Value::Null,
        }
    }
}

impl Default for SimulatedPrinter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PrinterControl for SimulatedPrinter {
    async fn get_current_connection(&self) -> PrinterLink {
        self.lock().link
    }

    async fn connect(&self) -> Result<(), PrinterControlError> {
        self.lock().link = PrinterLink::Operational;
        tracing::info!("simulated printer connected");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), PrinterControlError> {
        self.lock().link = PrinterLink::Closed;
        tracing::info!("simulated printer disconnected");
        Ok(())
    }

    async fn get_current_data(&self) -> Result<Value, PrinterControlError> {
        let state = self.lock();
        let text = if state.printing {
            if state.paused { "Paused" } else { "Printing" }
        } else {
            "Operational"
        };
        Ok(json!({
            "state": { "text": text, "flags": { "printing": state.printing, "paused": state.paused } },
            "job": { "file": Self::file_value(&state) },
            "progress": { "completion": state.progress },
        }))
    }

    async fn get_current_temperatures(&self) -> Result<Value, PrinterControlError> {
        Ok(json!({
            "tool0": { "actual": 210.0, "target": 210.0 },
            "bed": { "actual": 60.0, "target": 60.0 },
        }))
    }

    async fn select_file(
        &self,
        path: &Path,
        from_sd: bool,
        print_immediately: bool,
    ) -> Result<(), PrinterControlError> {
        if from_sd {
            return Err(PrinterControlError::InvalidFileLocation);
        }
        let printable = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("gcode") || e.eq_ignore_ascii_case("gco"));
        if !printable {
            return Err(PrinterControlError::InvalidFileType);
        }
        if !path.exists() {
            return Err(PrinterControlError::InvalidFileLocation);
        }
        {
            let mut state = self.lock();
            state.selected_file = Some(path.to_path_buf());
        }
        if print_immediately {
            self.start_print().await?;
        }
        Ok(())
    }

    async fn start_print(&self) -> Result<(), PrinterControlError> {
        let file = {
            let mut state = self.lock();
            let Some(file) = state.selected_file.clone() else {
                return Err(PrinterControlError::Failed("no file selected".to_string()));
            };
            state.printing = true;
            state.paused = false;
            state.progress = 0.0;
            file
        };
        self.emit(
            PrintEventKind::PrintStarted,
            json!({ "path": file.to_string_lossy() }),
        );
        Ok(())
    }

    async fn pause_print(&self) -> Result<(), PrinterControlError> {
        {
            let mut state = self.lock();
            if !state.printing {
                return Err(PrinterControlError::Failed("no active print".to_string()));
            }
            state.paused = true;
        }
        self.emit(PrintEventKind::PrintPaused, Value::Null);
        Ok(())
    }

    async fn cancel_print(&self) -> Result<(), PrinterControlError> {
        {
            let mut state = self.lock();
            if !state.printing {
                return Err(PrinterControlError::Failed("no active print".to_string()));
            }
            state.printing = false;
            state.paused = false;
            state.progress = 0.0;
        }
        // Cancellation surfaces as Cancelled followed by the terminal Failed,
        // matching the host event convention.
        self.emit(PrintEventKind::PrintCancelled, Value::Null);
        self.emit(PrintEventKind::PrintFailed, json!({ "reason": "cancelled" }));
        Ok(())
    }

    async fn resume_print(&self) -> Result<(), PrinterControlError> {
        {
            let mut state = self.lock();
            if !state.printing || !state.paused {
                return Err(PrinterControlError::Failed("no paused print".to_string()));
            }
            state.paused = false;
        }
        self.emit(PrintEventKind::PrintResumed, Value::Null);
        Ok(())
    }
}
