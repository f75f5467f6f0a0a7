//! Event tracker: session lifecycle and payload assembly.
mod common;

use common::{MockPrinter, MockStorage};
use printlink::cloud::tracker::{EventTracker, PrintEventKind};
use serde_json::{Value, json};
use std::sync::Arc;

fn tracker_with(printer: MockPrinter, storage: MockStorage) -> EventTracker {
    EventTracker::new(Arc::new(printer), Arc::new(storage))
}

fn default_tracker() -> EventTracker {
    tracker_with(MockPrinter::new(), MockStorage::new("/tmp"))
}

#[tokio::test]
async fn print_started_binds_timestamp() {
    let tracker = default_tracker();
    let before = chrono::Utc::now().timestamp();
    let payload = tracker.on_event(PrintEventKind::PrintStarted, Value::Null).await;
    let after = chrono::Utc::now().timestamp();

    let started_at = payload.current_print_ts.expect("session should be bound");
    assert!((before..=after).contains(&started_at));

    // A later snapshot reports the same start time, not a fresh one.
    let later = tracker.build_snapshot(true).await;
    assert_eq!(later.current_print_ts, Some(started_at));
}

#[tokio::test]
async fn terminal_event_clears_session_after_snapshot() {
    let tracker = default_tracker();
    tracker.set_job_id("g1");
    let started = tracker.on_event(PrintEventKind::PrintStarted, Value::Null).await;
    let started_at = started.current_print_ts.expect("bound");

    // The terminal payload still reflects the just-ended job.
    let terminal = tracker
        .on_event(PrintEventKind::PrintFailed, json!({ "reason": "error" }))
        .await;
    assert_eq!(terminal.job_id.as_deref(), Some("g1"));
    assert_eq!(terminal.current_print_ts, Some(started_at));

    // The session is gone afterwards.
    let after = tracker.build_snapshot(true).await;
    assert_eq!(after.job_id, None);
    assert_eq!(after.current_print_ts, None);
    assert_eq!(tracker.get_job_id(), None);
}

#[tokio::test]
async fn print_done_also_clears_session() {
    let tracker = default_tracker();
    tracker.on_event(PrintEventKind::PrintStarted, Value::Null).await;
    tracker.on_event(PrintEventKind::PrintDone, Value::Null).await;
    assert_eq!(tracker.session(), Default::default());
}

#[tokio::test]
async fn non_terminal_events_leave_session_bound() {
    let tracker = default_tracker();
    tracker.set_job_id("g2");
    tracker.on_event(PrintEventKind::PrintStarted, Value::Null).await;
    tracker.on_event(PrintEventKind::PrintPaused, Value::Null).await;
    tracker.on_event(PrintEventKind::PrintResumed, Value::Null).await;
    assert_eq!(tracker.get_job_id().as_deref(), Some("g2"));
    assert!(tracker.session().started_at.is_some());
}

#[tokio::test]
async fn event_payload_carries_event_and_state() {
    let tracker = default_tracker();
    let payload = tracker
        .on_event(PrintEventKind::PrintPaused, json!({ "position": 42 }))
        .await;
    let event = payload.event.expect("event attached");
    assert_eq!(event.event_type, PrintEventKind::PrintPaused);
    assert_eq!(event.data, json!({ "position": 42 }));
    assert_eq!(payload.printer["state"]["text"], "Operational");
    assert_eq!(payload.temperatures["tool0"]["actual"], 200.0);
}

#[tokio::test]
async fn pre_bound_job_id_shows_before_start() {
    let tracker = default_tracker();
    tracker.set_job_id("g3");
    let snapshot = tracker.build_snapshot(true).await;
    assert_eq!(snapshot.job_id.as_deref(), Some("g3"));
    // Not started yet, so no start timestamp.
    assert_eq!(snapshot.current_print_ts, None);
}

#[tokio::test]
async fn printer_fault_degrades_to_null_fields() {
    let printer = MockPrinter::new();
    printer.set_failing(true);
    let tracker = tracker_with(printer, MockStorage::new("/tmp"));

    let payload = tracker.on_event(PrintEventKind::PrintStarted, Value::Null).await;
    assert_eq!(payload.printer, Value::Null);
    assert_eq!(payload.temperatures, Value::Null);
    // The event and session data still made it out.
    assert!(payload.event.is_some());
    assert!(payload.current_print_ts.is_some());
}

#[tokio::test]
async fn file_metadata_resolved_for_selected_file() {
    let printer = MockPrinter::with_data(json!({
        "state": { "text": "Printing" },
        "job": { "file": { "origin": "local", "path": "gcode/a.gcode" } },
    }));
    let storage = MockStorage::new("/tmp");
    storage.insert_metadata(
        "local",
        "gcode/a.gcode",
        json!({ "analysis": { "printingArea": { "maxX": 120.0 } }, "hash": "abc" }),
    );
    let tracker = tracker_with(printer, storage);

    let full = tracker.build_snapshot(false).await;
    assert_eq!(
        full.file_metadata,
        Some(json!({ "analysis": { "printingArea": { "maxX": 120.0 } } }))
    );

    // status_only skips the lookup entirely.
    let status_only = tracker.build_snapshot(true).await;
    assert_eq!(status_only.file_metadata, None);
}

#[tokio::test]
async fn missing_file_or_metadata_yields_absent_field() {
    // No selected file at all.
    let tracker = default_tracker();
    assert_eq!(tracker.build_snapshot(false).await.file_metadata, None);

    // Selected file but no analysis data known.
    let printer = MockPrinter::with_data(json!({
        "job": { "file": { "origin": "local", "path": "gcode/unknown.gcode" } },
    }));
    let tracker = tracker_with(printer, MockStorage::new("/tmp"));
    assert_eq!(tracker.build_snapshot(false).await.file_metadata, None);
}
