//! Testing utilities for users of the nudge library.
//!
//! This module provides helpers for exercising the scheduler without real
//! delivery or real waiting:
//!
//! - [`RecordingSink`]: A sink that captures every delivery
//! - [`FailingSink`]: A sink that always fails and counts attempts
//! - [`TestClock`]: A wall clock driven by Tokio's (pausable) time
//! - [`EventRecorder`]: An event handler that keeps every event it sees

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::core::clock::Clock;
use crate::events::{Event, EventHandler};
use crate::sink::{DeliveryError, NotificationSink};

/// One call made to a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub recipient: String,
    pub message: String,
    /// Tokio time at which the sink was called.
    pub at: tokio::time::Instant,
}

/// A sink that records deliveries instead of sending them.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use nudge::testing::RecordingSink;
/// use nudge::ReminderScheduler;
///
/// let sink = Arc::new(RecordingSink::new());
/// let scheduler = ReminderScheduler::new(sink.clone());
/// assert_eq!(sink.count(), 0);
/// # drop(scheduler);
/// ```
#[derive(Debug, Default)]
pub struct RecordingSink {
    deliveries: Mutex<Vec<Delivery>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All deliveries so far, in call order.
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }

    /// Messages delivered so far, in call order.
    pub fn messages(&self) -> Vec<String> {
        self.deliveries().into_iter().map(|d| d.message).collect()
    }

    /// Number of deliveries so far.
    pub fn count(&self) -> usize {
        self.deliveries.lock().map(|d| d.len()).unwrap_or(0)
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn deliver(&self, recipient: &str, message: &str) -> Result<(), DeliveryError> {
        let delivery = Delivery {
            recipient: recipient.to_string(),
            message: message.to_string(),
            at: tokio::time::Instant::now(),
        };
        self.deliveries
            .lock()
            .map_err(|_| DeliveryError::Other("recording sink lock poisoned".into()))?
            .push(delivery);
        Ok(())
    }
}

/// A sink whose every delivery fails with [`DeliveryError::Other`].
///
/// Useful for checking that failures are reported and never retried.
#[derive(Debug)]
pub struct FailingSink {
    error_message: String,
    attempts: AtomicUsize,
}

impl FailingSink {
    pub fn new(error_message: impl Into<String>) -> Self {
        Self {
            error_message: error_message.into(),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Number of times `deliver` has been called.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationSink for FailingSink {
    fn name(&self) -> &str {
        "failing"
    }

    async fn deliver(&self, _recipient: &str, _message: &str) -> Result<(), DeliveryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(DeliveryError::Other(self.error_message.clone()))
    }
}

/// Wall clock that advances together with Tokio's clock.
///
/// Under `#[tokio::test(start_paused = true)]` sleeping auto-advances Tokio
/// time, so this clock and the scheduler's timers stay in step without any
/// real waiting.
#[derive(Debug, Clone)]
pub struct TestClock {
    start: DateTime<Utc>,
    anchor: tokio::time::Instant,
}

impl TestClock {
    /// Create a clock reading `start` right now.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            start,
            anchor: tokio::time::Instant::now(),
        }
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = TimeDelta::from_std(self.anchor.elapsed()).unwrap_or_default();
        self.start
            .checked_add_signed(elapsed)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Event handler that keeps a copy of every event.
#[derive(Debug, Default)]
pub struct EventRecorder {
    events: tokio::sync::Mutex<Vec<Event>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events so far, in emission order.
    pub async fn events(&self) -> Vec<Event> {
        self.events.lock().await.clone()
    }

    /// Number of events matching `predicate`.
    pub async fn count_where(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        self.events.lock().await.iter().filter(|e| predicate(e)).count()
    }
}

#[async_trait]
impl EventHandler for EventRecorder {
    async fn handle(&self, event: &Event) {
        self.events.lock().await.push(event.clone());
    }
}
