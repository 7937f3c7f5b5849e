//! Notification text for task events.

use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;

/// Text of the reminder sent shortly before a task is due.
pub fn reminder_message(title: &str, lead_time: TimeDelta) -> String {
    match describe_lead_time(lead_time) {
        Some(span) => format!("Reminder: Your task \"{}\" is due in {}.", title, span),
        None => format!("Reminder: Your task \"{}\" is due now.", title),
    }
}

/// Text of the notice sent when a task is created.
pub fn creation_message(title: &str, due_at: Option<DateTime<Utc>>, timezone: Tz) -> String {
    match due_at {
        Some(due) => format!(
            "You have created a new task: {}. Due date: {}",
            title,
            due.with_timezone(&timezone).format("%Y-%m-%d %H:%M %Z")
        ),
        None => format!("You have created a new task: {}. Due date: none", title),
    }
}

/// Render a lead time in the largest whole unit, e.g. "5 minutes".
///
/// Returns `None` for a zero (or negative) lead time.
pub fn describe_lead_time(lead_time: TimeDelta) -> Option<String> {
    let secs = lead_time.num_seconds();
    if secs <= 0 {
        return None;
    }

    let (amount, unit) = if secs % 86_400 == 0 {
        (secs / 86_400, "day")
    } else if secs % 3_600 == 0 {
        (secs / 3_600, "hour")
    } else if secs % 60 == 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };

    let plural = if amount == 1 { "" } else { "s" };
    Some(format!("{} {}{}", amount, unit, plural))
}
