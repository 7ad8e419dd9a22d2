//! The game server's timestamp format, `DD-MM-YY HH:MM:SS.mmm`.

use chrono::{NaiveDateTime, TimeDelta};

const FORMAT: &str = "%d-%m-%y %H:%M:%S%.f";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed game timestamp {input:?}")]
pub struct TimestampError {
    pub input: String,
}

/// Parse a server timestamp such as `16-10-26 14:03:07.123`.
///
/// The milliseconds are optional.  Two-digit years 00-68 map to 20xx.
pub fn parse_game_timestamp(input: &str) -> Result<NaiveDateTime, TimestampError> {
    NaiveDateTime::parse_from_str(input.trim(), FORMAT).map_err(|_| TimestampError {
        input: input.to_string(),
    })
}

/// Coarse age of `then` relative to `now`: "Just now", "5 mins ago", "1 hour ago", "3 days ago".
pub fn format_relative(then: NaiveDateTime, now: NaiveDateTime) -> String {
    let age = now.signed_duration_since(then).max(TimeDelta::zero());

    let mins = age.num_minutes();
    let hours = age.num_hours();
    let days = age.num_days();

    if mins < 1 {
        "Just now".to_string()
    } else if mins < 60 {
        plural(mins, "min")
    } else if hours < 24 {
        plural(hours, "hour")
    } else {
        plural(days, "day")
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("{n} {unit} ago")
    } else {
        format!("{n} {unit}s ago")
    }
}
