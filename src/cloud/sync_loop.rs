// src/cloud/sync_loop.rs - The resilient state-synchronization loop
use crate::cloud::connection::{Connection, ConnectionHandler};
use crate::cloud::dispatcher::CommandDispatcher;
use crate::cloud::queue::OutboundQueue;
use crate::cloud::tracker::{EventTracker, OutboundMessage, PrintEventKind, StatusPayload};
use crate::config::Config;
use crate::file_manager::Storage;
use crate::printer::{PrinterControl, PrinterLink};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Routes inbound websocket frames to the command dispatcher.
struct InboundHandler {
    dispatcher: CommandDispatcher,
}

#[async_trait::async_trait]
impl ConnectionHandler for InboundHandler {
    async fn on_open(&self) {
        tracing::info!("server connection opened");
    }

    async fn on_close(&self) {
        tracing::info!("server connection closed");
    }

    async fn on_message(&self, raw: String) {
        self.dispatcher.handle_inbound(&raw).await;
    }
}

/// Wires the tracker, queue, dispatcher and sync loop together and owns the
/// shutdown sequencing. One instance per bridged printer.
pub struct CloudBridge {
    config: Config,
    printer: Arc<dyn PrinterControl>,
    tracker: Arc<EventTracker>,
    queue: Arc<OutboundQueue>,
    handler: Arc<InboundHandler>,
    shutdown_tx: broadcast::Sender<()>,
}

impl CloudBridge {
    pub fn new(
        config: Config,
        printer: Arc<dyn PrinterControl>,
        storage: Arc<dyn Storage>,
        gcode_folder: PathBuf,
    ) -> Self {
        let tracker = Arc::new(EventTracker::new(printer.clone(), storage));
        let queue = Arc::new(OutboundQueue::with_capacity(config.bridge.queue_capacity));
        let dispatcher = CommandDispatcher::new(
            printer.clone(),
            tracker.clone(),
            reqwest::Client::new(),
            gcode_folder,
        );
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            printer,
            tracker,
            queue,
            handler: Arc::new(InboundHandler { dispatcher }),
            shutdown_tx,
        }
    }

    /// Entry point for host lifecycle events: fold into a payload and queue
    /// it. Runs in the event-callback context, so it never blocks on the
    /// network; a full queue is a logged drop.
    pub async fn on_printer_event(&self, kind: PrintEventKind, data: Value) {
        let payload = self.tracker.on_event(kind, data).await;
        if !self.queue.try_put(payload) {
            tracing::warn!("outbound queue full, dropping {kind:?} update");
        }
    }

    pub fn tracker(&self) -> Arc<EventTracker> {
        self.tracker.clone()
    }

    /// Spawns the background sync task. The task owns the connection and is
    /// the sole queue consumer; it runs until `shutdown()`.
    pub fn start(&self) {
        let sync_loop = SyncLoop {
            printer: self.printer.clone(),
            tracker: self.tracker.clone(),
            queue: self.queue.clone(),
            handler: self.handler.clone(),
            websocket_url: self.config.bridge.websocket_url().to_string(),
            device_id: self.config.bridge.device_id.clone(),
            connect_timeout: self.config.bridge.connect_timeout(),
            connection: None,
        };
        let tick_interval = self.config.bridge.tick_interval();
        let shutdown_rx = self.shutdown_tx.subscribe();
        tokio::spawn(sync_loop.run(tick_interval, shutdown_rx));
    }

    /// Ordered shutdown: disconnect the printer first, leave the loop running
    /// through the grace period so the final status push goes out, then stop
    /// the loop (which closes any live connection).
    pub async fn shutdown(&self) {
        tracing::info!("shutting down bridge");
        if let Err(e) = self.printer.disconnect().await {
            tracing::warn!("printer disconnect failed: {e}");
        }
        tokio::time::sleep(self.config.bridge.shutdown_grace()).await;
        let _ = self.shutdown_tx.send(());
    }
}

struct SyncLoop {
    printer: Arc<dyn PrinterControl>,
    tracker: Arc<EventTracker>,
    queue: Arc<OutboundQueue>,
    handler: Arc<InboundHandler>,
    websocket_url: String,
    device_id: String,
    connect_timeout: std::time::Duration,
    connection: Option<Connection>,
}

impl SyncLoop {
    async fn run(mut self, tick_interval: std::time::Duration, mut shutdown_rx: broadcast::Receiver<()>) {
        let mut interval = tokio::time::interval(tick_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    if let Some(connection) = &self.connection {
                        connection.close();
                    }
                    tracing::info!("sync loop stopped");
                    break;
                }
                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }
    }

    /// One sync cycle. A fault-isolation boundary: every failure in here is
    /// logged and retried next tick.
    async fn tick(&mut self) {
        // The printer link comes first; without it there is nothing worth
        // pushing this tick.
        if self.printer.get_current_connection().await == PrinterLink::Closed {
            if let Err(e) = self.printer.connect().await {
                tracing::warn!("printer reconnect failed: {e}");
            }
            return;
        }

        if !self.connection.as_ref().is_some_and(Connection::is_connected) {
            // Only one connection is authoritative; close the stale one
            // before opening its replacement.
            if let Some(stale) = self.connection.take() {
                stale.close();
            }
            match Connection::open(
                &self.websocket_url,
                self.handler.clone(),
                self.connect_timeout,
            )
            .await
            {
                Ok(connection) => {
                    tracing::info!("connected to {}", self.websocket_url);
                    self.connection = Some(connection);
                }
                Err(e) => {
                    tracing::warn!("server connection failed, retrying next tick: {e}");
                    return;
                }
            }
        }

        let tracker = self.tracker.clone();
        let payload = self
            .queue
            .take_or(move || async move { tracker.build_snapshot(true).await })
            .await;
        self.push(payload);
    }

    fn push(&self, payload: StatusPayload) {
        let envelope = OutboundMessage {
            device_id: self.device_id.clone(),
            payload,
        };
        match serde_json::to_string(&envelope) {
            Ok(raw) => {
                if let Some(connection) = &self.connection {
                    connection.send(raw);
                    tracing::debug!("status pushed");
                }
            }
            Err(e) => tracing::warn!("failed to encode status payload: {e}"),
        }
    }
}
