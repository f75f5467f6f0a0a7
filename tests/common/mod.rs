//! Shared test doubles for the capability surface.
#![allow(dead_code)]

use async_trait::async_trait;
use printlink::file_manager::{Storage, StorageError};
use printlink::printer::{PrinterControl, PrinterControlError, PrinterLink};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Records every printer-control call and serves canned state.
pub struct MockPrinter {
    pub data: Mutex<Value>,
    pub temperatures: Mutex<Value>,
    pub link: Mutex<PrinterLink>,
    pub fail_queries: Mutex<bool>,
    pub calls: Mutex<Vec<String>>,
}

impl MockPrinter {
    pub fn new() -> Self {
        Self {
            data: Mutex::new(json!({ "state": { "text": "Operational" } })),
            temperatures: Mutex::new(json!({ "tool0": { "actual": 200.0 } })),
            link: Mutex::new(PrinterLink::Operational),
            fail_queries: Mutex::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_data(data: Value) -> Self {
        let printer = Self::new();
        *printer.data.lock().unwrap() = data;
        printer
    }

    pub fn set_failing(&self, failing: bool) {
        *self.fail_queries.lock().unwrap() = failing;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

#[async_trait]
impl PrinterControl for MockPrinter {
    async fn get_current_connection(&self) -> PrinterLink {
        *self.link.lock().unwrap()
    }

    async fn connect(&self) -> Result<(), PrinterControlError> {
        self.record("connect");
        *self.link.lock().unwrap() = PrinterLink::Operational;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), PrinterControlError> {
        self.record("disconnect");
        *self.link.lock().unwrap() = PrinterLink::Closed;
        Ok(())
    }

    async fn get_current_data(&self) -> Result<Value, PrinterControlError> {
        if *self.fail_queries.lock().unwrap() {
            return Err(PrinterControlError::Failed("query failed".to_string()));
        }
        Ok(self.data.lock().unwrap().clone())
    }

    async fn get_current_temperatures(&self) -> Result<Value, PrinterControlError> {
        if *self.fail_queries.lock().unwrap() {
            return Err(PrinterControlError::Failed("query failed".to_string()));
        }
        Ok(self.temperatures.lock().unwrap().clone())
    }

    async fn select_file(
        &self,
        path: &Path,
        from_sd: bool,
        print_immediately: bool,
    ) -> Result<(), PrinterControlError> {
        self.record(format!(
            "select_file:{}:{from_sd}:{print_immediately}",
            path.display()
        ));
        Ok(())
    }

    async fn start_print(&self) -> Result<(), PrinterControlError> {
        self.record("start_print");
        Ok(())
    }

    async fn pause_print(&self) -> Result<(), PrinterControlError> {
        self.record("pause_print");
        Ok(())
    }

    async fn cancel_print(&self) -> Result<(), PrinterControlError> {
        self.record("cancel_print");
        Ok(())
    }

    async fn resume_print(&self) -> Result<(), PrinterControlError> {
        self.record("resume_print");
        Ok(())
    }
}

/// In-memory storage double with preloaded metadata.
pub struct MockStorage {
    pub root: PathBuf,
    pub metadata: Mutex<HashMap<(String, String), Value>>,
}

impl MockStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            metadata: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert_metadata(&self, origin: &str, path: &str, value: Value) {
        self.metadata
            .lock()
            .unwrap()
            .insert((origin.to_string(), path.to_string()), value);
    }
}

#[async_trait]
impl Storage for MockStorage {
    async fn folder_exists(&self, _location: &str, path: &str) -> bool {
        self.root.join(path).is_dir()
    }

    async fn create_folder(&self, _location: &str, path: &str) -> Result<(), StorageError> {
        std::fs::create_dir_all(self.root.join(path))?;
        Ok(())
    }

    fn resolve_disk_path(&self, _location: &str, path: &str) -> PathBuf {
        self.root.join(path)
    }

    async fn get_metadata(&self, origin: &str, path: &str) -> Option<Value> {
        self.metadata
            .lock()
            .unwrap()
            .get(&(origin.to_string(), path.to_string()))
            .cloned()
    }
}
