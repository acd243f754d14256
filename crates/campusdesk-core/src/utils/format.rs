use chrono::{DateTime, NaiveTime, Utc};

/// Format an "HH:MM:SS" (or "HH:MM") time as a 12-hour clock: "2:30 PM".
/// Unparseable input is returned unchanged.
pub fn format_clock(time: &str) -> String {
    NaiveTime::parse_from_str(time, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M"))
        .map(|t| {
            let hour = t.format("%I").to_string().trim_start_matches('0').to_string();
            format!("{}:{} {}", hour, t.format("%M"), t.format("%p"))
        })
        .unwrap_or_else(|_| time.to_string())
}

/// Relative time such as "5 minutes ago". Older than a month falls back to
/// the date.
pub fn time_ago(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now - ts;
    let minutes = elapsed.num_minutes();

    fn plural(n: i64, unit: &str) -> String {
        if n == 1 {
            format!("1 {} ago", unit)
        } else {
            format!("{} {}s ago", n, unit)
        }
    }

    if minutes < 1 {
        "just now".to_string()
    } else if minutes < 60 {
        plural(minutes, "minute")
    } else if minutes < 24 * 60 {
        plural(elapsed.num_hours(), "hour")
    } else if elapsed.num_days() < 30 {
        plural(elapsed.num_days(), "day")
    } else {
        ts.format("%b %d, %Y").to_string()
    }
}

/// Truncate to `max_chars` characters, adding an ellipsis when cut.
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else if max_chars <= 3 {
        s.chars().take(max_chars).collect()
    } else {
        let truncated: String = s.chars().take(max_chars - 3).collect();
        format!("{}...", truncated.trim_end())
    }
}

/// Uppercase the first character.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Up to two initials for an avatar: "Asha Rao" -> "AR".
pub fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|w| w.chars().next())
        .take(2)
        .flat_map(char::to_uppercase)
        .collect()
}

/// Format an optional string, returning a default if None
pub fn format_optional(value: Option<&str>, default: &str) -> String {
    value.filter(|v| !v.trim().is_empty()).unwrap_or(default).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock("14:30:00"), "2:30 PM");
        assert_eq!(format_clock("09:05:00"), "9:05 AM");
        assert_eq!(format_clock("00:15"), "12:15 AM");
        assert_eq!(format_clock("12:00:00"), "12:00 PM");
        assert_eq!(format_clock("noon"), "noon");
    }

    #[test]
    fn test_time_ago() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        assert_eq!(time_ago(now - Duration::seconds(20), now), "just now");
        assert_eq!(time_ago(now - Duration::minutes(1), now), "1 minute ago");
        assert_eq!(time_ago(now - Duration::minutes(5), now), "5 minutes ago");
        assert_eq!(time_ago(now - Duration::hours(3), now), "3 hours ago");
        assert_eq!(time_ago(now - Duration::days(2), now), "2 days ago");
        assert_eq!(time_ago(now - Duration::days(45), now), "Jan 25, 2024");
        assert_eq!(time_ago(now + Duration::minutes(3), now), "just now");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Hello", 10), "Hello");
        assert_eq!(truncate("Hello World", 8), "Hello...");
        assert_eq!(truncate("Hi", 2), "Hi");
        assert_eq!(truncate("नमस्ते दुनिया", 5), "नम...");
    }

    #[test]
    fn test_capitalize_and_initials() {
        assert_eq!(capitalize("about 2 hours"), "About 2 hours");
        assert_eq!(capitalize(""), "");
        assert_eq!(initials("Asha Rao"), "AR");
        assert_eq!(initials("ravi"), "R");
        assert_eq!(initials("  "), "");
    }
}
