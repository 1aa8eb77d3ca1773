//! Friendly elapsed-time rendering

/// Break an elapsed duration into human-readable unit phrases, zero units
/// omitted. An elapsed time of zero yields an empty vector.
pub fn friendly_time(secs: u64) -> Vec<String> {
    let minutes = secs / 60;
    let seconds = secs % 60;

    let mut parts = Vec::new();
    if minutes > 0 {
        parts.push(format!(
            "{} minute{}",
            minutes,
            if minutes == 1 { "" } else { "s" }
        ));
    }
    if seconds > 0 {
        parts.push(format!(
            "{} second{}",
            seconds,
            if seconds == 1 { "" } else { "s" }
        ));
    }
    parts
}

/// The joined form shown to users, e.g. `2 minutes, 5 seconds`.
pub fn friendly_time_string(secs: u64) -> String {
    friendly_time(secs).join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_elapsed_is_empty() {
        assert!(friendly_time(0).is_empty());
        assert_eq!(friendly_time_string(0), "");
    }

    #[test]
    fn seconds_only() {
        assert_eq!(friendly_time(59), vec!["59 seconds"]);
    }

    #[test]
    fn whole_minutes_omit_seconds() {
        assert_eq!(friendly_time(60), vec!["1 minute"]);
        assert_eq!(friendly_time(120), vec!["2 minutes"]);
    }

    #[test]
    fn minutes_and_seconds() {
        assert_eq!(friendly_time(125), vec!["2 minutes", "5 seconds"]);
        assert_eq!(friendly_time_string(125), "2 minutes, 5 seconds");
    }

    #[test]
    fn pluralization_boundary() {
        assert_eq!(friendly_time(61), vec!["1 minute", "1 second"]);
        assert_eq!(friendly_time(122), vec!["2 minutes", "2 seconds"]);
    }
}
