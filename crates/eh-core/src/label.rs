//! Display helpers for authors and timestamps.

use chrono::{DateTime, Utc};

use crate::models::{Actor, Role};

const DOCTOR_PREFIX: &str = "Dr.";

/// Name shown for an author: `Dr. {name} ({specialization})` for doctors,
/// the plain display name for everyone else.
///
/// A doctor whose stored name already carries the prefix is not prefixed twice.
pub fn format_author_label(actor: &Actor) -> String {
    if actor.role != Role::Doctor {
        return actor.display_name.clone();
    }

    let mut label = if actor.display_name.starts_with(DOCTOR_PREFIX) {
        actor.display_name.clone()
    } else {
        format!("{DOCTOR_PREFIX} {}", actor.display_name)
    };
    if let Some(specialization) = actor.specialization.as_deref() {
        label.push_str(&format!(" ({specialization})"));
    }
    label
}

/// Relative time for anything from today, a calendar date otherwise.
pub fn format_timestamp(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    if at.date_naive() != now.date_naive() {
        return at.format("%m/%d/%Y").to_string();
    }

    let seconds = (now - at).num_seconds().max(0);
    match seconds {
        0..=59 => format!("{seconds} seconds ago"),
        60..=3599 => format!("{} minutes ago", seconds / 60),
        _ => format!("{} hours ago", seconds / 3600),
    }
}
