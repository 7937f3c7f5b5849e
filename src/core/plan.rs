//! Fire-time decision for a reminder.

use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;

/// What to do with a reminder at the moment it is armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirePlan {
    /// The fire time is in the future: wait `delay`, then deliver.
    Schedule {
        fire_at: DateTime<Utc>,
        delay: Duration,
    },
    /// The lead window has been reached but the event has not happened yet.
    FireNow,
    /// The event itself is already in the past; nothing is delivered.
    Overdue,
}

impl FirePlan {
    /// Decide how to handle a reminder for `event_time` with the given lead time.
    pub fn compute(event_time: DateTime<Utc>, lead_time: TimeDelta, now: DateTime<Utc>) -> Self {
        if event_time <= now {
            return FirePlan::Overdue;
        }

        let fire_at = event_time
            .checked_sub_signed(lead_time)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        if fire_at <= now {
            return FirePlan::FireNow;
        }

        let delay = (fire_at - now).to_std().unwrap_or_default();
        FirePlan::Schedule { fire_at, delay }
    }

    /// Short label used in logs and the CLI.
    pub fn label(&self) -> &'static str {
        match self {
            FirePlan::Schedule { .. } => "scheduled",
            FirePlan::FireNow => "fire now",
            FirePlan::Overdue => "overdue",
        }
    }
}
