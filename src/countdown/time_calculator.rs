//! All time arithmetic for the wallpaper lives here so the render loop stays
//! mode-agnostic. Everything is a pure function of its inputs; the caller
//! supplies `now`.

use chrono::{NaiveDateTime, Timelike};

use super::countdown_mode::CountdownMode;
use crate::constants::ZEROED_COUNTDOWN;

const NANOS_PER_SECOND: i64 = 1_000_000_000;
const NANOS_PER_MINUTE: i64 = 60 * NANOS_PER_SECOND;
const LAST_SECOND_OF_DAY: i64 = 86_399;
const LAST_NANO_OF_SECOND: i64 = NANOS_PER_SECOND - 1;

/// Text to display for `now` in the given mode. `target` is only consulted by
/// [`CountdownMode::FullCountdown`].
pub fn calculate(mode: CountdownMode, target: NaiveDateTime, now: NaiveDateTime) -> String {
    match mode {
        CountdownMode::FullCountdown => full_countdown(now, target),
        CountdownMode::SecondsRemainingToday => {
            (nanos_left_today(now) / NANOS_PER_SECOND).to_string()
        }
        CountdownMode::MinutesRemainingToday => {
            (nanos_left_today(now) / NANOS_PER_MINUTE).to_string()
        }
    }
}

/// `DD : HH : MM : SS` until `target`; days are not wrapped.
fn full_countdown(now: NaiveDateTime, target: NaiveDateTime) -> String {
    if now >= target {
        return ZEROED_COUNTDOWN.to_string();
    }

    let remaining = target - now;
    let days = remaining.num_days();
    let hours = remaining.num_hours() % 24;
    let minutes = remaining.num_minutes() % 60;
    let seconds = remaining.num_seconds() % 60;

    format!("{:02} : {:02} : {:02} : {:02}", days, hours, minutes, seconds)
}

/// Nanoseconds between `now` and 23:59:59.999999999 of the same day.
/// Clamped at zero because chrono encodes a leap second as nanos >= 1e9.
fn nanos_left_today(now: NaiveDateTime) -> i64 {
    let elapsed_secs = i64::from(now.num_seconds_from_midnight());
    let elapsed_nanos = i64::from(now.nanosecond());
    let left = (LAST_SECOND_OF_DAY - elapsed_secs) * NANOS_PER_SECOND
        + (LAST_NANO_OF_SECOND - elapsed_nanos);
    left.max(0)
}
