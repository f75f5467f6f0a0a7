// src/cloud/tracker.rs - Print session tracking and status payload assembly
use crate::file_manager::Storage;
use crate::printer::PrinterControl;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex, PoisonError};

/// Printer lifecycle events the bridge reacts to.
///
/// Serialized variant names match the event strings the remote server
/// already understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrintEventKind {
    PrintStarted,
    PrintPaused,
    PrintResumed,
    PrintCancelled,
    PrintFailed,
    PrintDone,
}

impl PrintEventKind {
    /// Failed and Done end the job; the session unbinds after either.
    pub fn is_terminal(self) -> bool {
        matches!(self, PrintEventKind::PrintFailed | PrintEventKind::PrintDone)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintEvent {
    pub event_type: PrintEventKind,
    pub data: Value,
}

/// The job currently bound to this tracker.
///
/// `job_id` may be set before `started_at` (a remote command pre-binds the
/// job before the printer confirms the start). Both clear together on a
/// terminal event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrintSession {
    pub job_id: Option<String>,
    pub started_at: Option<i64>,
}

/// One status push to the server. Built fresh per send, never mutated after.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusPayload {
    pub printer: Value,
    pub temperatures: Value,
    #[serde(rename = "_ts")]
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_print_ts: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_metadata: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<PrintEvent>,
}

/// A [`StatusPayload`] with the routing tag attached just before transmission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub device_id: String,
    #[serde(flatten)]
    pub payload: StatusPayload,
}

/// Folds printer lifecycle events and the live printer state into outbound
/// status payloads. Mutated from the event-callback context and read from the
/// network loop; the session fields sit behind their own lock and nothing
/// else does.
pub struct EventTracker {
    printer: Arc<dyn PrinterControl>,
    storage: Arc<dyn Storage>,
    session: Mutex<PrintSession>,
}

impl EventTracker {
    pub fn new(printer: Arc<dyn PrinterControl>, storage: Arc<dyn Storage>) -> Self {
        Self {
            printer,
            storage,
            session: Mutex::new(PrintSession::default()),
        }
    }

    /// Folds one lifecycle event into a status payload.
    ///
    /// A terminal event clears the session only after the snapshot is built,
    /// so the terminal payload still carries the just-ended job's id and
    /// start timestamp.
    pub async fn on_event(&self, kind: PrintEventKind, data: Value) -> StatusPayload {
        if kind == PrintEventKind::PrintStarted {
            self.lock_session().started_at = Some(chrono::Utc::now().timestamp());
        }

        let mut payload = self.build_snapshot(false).await;
        payload.event = Some(PrintEvent {
            event_type: kind,
            data,
        });

        if kind.is_terminal() {
            let mut session = self.lock_session();
            session.job_id = None;
            session.started_at = None;
        }

        payload
    }

    /// Current printer state as a payload. With `status_only` the (possibly
    /// slow) file-metadata lookup is skipped; that is the shape the periodic
    /// fallback push uses.
    ///
    /// Collaborator failures degrade to missing fields, never to an error.
    pub async fn build_snapshot(&self, status_only: bool) -> StatusPayload {
        let printer = match self.printer.get_current_data().await {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!("printer state query failed: {e}");
                Value::Null
            }
        };
        let temperatures = match self.printer.get_current_temperatures().await {
            Ok(temps) => temps,
            Err(e) => {
                tracing::warn!("temperature query failed: {e}");
                Value::Null
            }
        };

        let (job_id, started_at) = {
            let session = self.lock_session();
            (session.job_id.clone(), session.started_at)
        };

        let mut payload = StatusPayload {
            printer,
            temperatures,
            timestamp: chrono::Utc::now().timestamp(),
            current_print_ts: started_at,
            job_id,
            file_metadata: None,
            event: None,
        };

        if !status_only {
            payload.file_metadata = self.file_metadata(&payload.printer).await;
        }

        payload
    }

    /// Binds a job id ahead of the printer confirming the start.
    pub fn set_job_id(&self, id: impl Into<String>) {
        self.lock_session().job_id = Some(id.into());
    }

    pub fn get_job_id(&self) -> Option<String> {
        self.lock_session().job_id.clone()
    }

    pub fn session(&self) -> PrintSession {
        self.lock_session().clone()
    }

    fn lock_session(&self) -> std::sync::MutexGuard<'_, PrintSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Analysis metadata for the file the printer currently has selected.
    /// Absence of a selected file or any lookup failure yields `None`.
    async fn file_metadata(&self, snapshot: &Value) -> Option<Value> {
        let file = snapshot.get("job")?.get("file")?;
        let origin = file.get("origin")?.as_str()?;
        let path = file.get("path")?.as_str()?;

        let metadata = self.storage.get_metadata(origin, path).await?;
        let printing_area = metadata.get("analysis")?.get("printingArea")?.clone();
        Some(json!({ "analysis": { "printingArea": printing_area } }))
    }
}
