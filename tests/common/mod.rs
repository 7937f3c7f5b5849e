//! Common test utilities shared across integration tests.

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use nudge::testing::{Delivery, EventRecorder, RecordingSink, TestClock};
use nudge::{Event, EventBus, NotificationSink, ReminderRequest, ReminderScheduler};
use std::sync::Arc;
use std::time::Duration;

/// Wall-clock time every test starts at.
pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap()
}

/// Scheduler on a test clock starting at [`start`], with an event recorder attached.
pub async fn recorded_scheduler(
    sink: Arc<dyn NotificationSink>,
) -> (ReminderScheduler, Arc<EventRecorder>) {
    let recorder = Arc::new(EventRecorder::new());
    let bus = EventBus::new();
    bus.register(recorder.clone()).await;

    let scheduler = ReminderScheduler::new(sink)
        .with_clock(Arc::new(TestClock::new(start())))
        .with_event_bus(bus);
    (scheduler, recorder)
}

/// Reminder for `subject` due `minutes` after [`start`], default lead time.
pub fn request_due_in(subject: &str, minutes: i64) -> ReminderRequest {
    ReminderRequest::new(
        subject,
        "alice@example.com",
        start() + TimeDelta::minutes(minutes),
        format!("Reminder: Your task \"{}\" is due in 5 minutes.", subject),
    )
}

/// Wait until the sink has seen `expected` deliveries, polling every 10ms.
///
/// # Panics
///
/// Panics if the timeout is reached first.
pub async fn wait_for_deliveries(
    sink: &RecordingSink,
    expected: usize,
    timeout: Duration,
) -> Vec<Delivery> {
    let start = tokio::time::Instant::now();
    loop {
        let deliveries = sink.deliveries();
        if deliveries.len() >= expected {
            return deliveries;
        }
        if start.elapsed() > timeout {
            panic!(
                "Timeout waiting for {} deliveries, got {}",
                expected,
                deliveries.len()
            );
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Wait until `expected` recorded events match `predicate`, polling every 10ms.
///
/// # Panics
///
/// Panics if the timeout is reached first.
pub async fn wait_for_events(
    recorder: &EventRecorder,
    predicate: impl Fn(&Event) -> bool,
    expected: usize,
    timeout: Duration,
) {
    let start = tokio::time::Instant::now();
    loop {
        let seen = recorder.count_where(&predicate).await;
        if seen >= expected {
            return;
        }
        if start.elapsed() > timeout {
            panic!("Timeout waiting for {} matching events, got {}", expected, seen);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
