// SPDX-License-Identifier: MIT

//! Elapsed-time formatting for report fields.

use std::time::Duration;

/// Format an elapsed duration as `H:MM:SS`, with a day prefix once the run
/// exceeds 24 hours (`2d 1:03:04`). Sub-second precision is dropped; reports
/// are informational.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;
    if days > 0 {
        format!("{days}d {hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{hours}:{minutes:02}:{seconds:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero() {
        assert_eq!(format_elapsed(Duration::ZERO), "0:00:00");
    }

    #[test]
    fn seconds_only() {
        assert_eq!(format_elapsed(Duration::from_secs(3)), "0:00:03");
    }

    #[test]
    fn hours_minutes_seconds() {
        assert_eq!(format_elapsed(Duration::from_secs(3661)), "1:01:01");
    }

    #[test]
    fn days_get_a_prefix() {
        assert_eq!(format_elapsed(Duration::from_secs(90_061)), "1d 1:01:01");
    }

    #[test]
    fn subsecond_precision_is_dropped() {
        assert_eq!(format_elapsed(Duration::from_millis(2_900)), "0:00:02");
    }
}
