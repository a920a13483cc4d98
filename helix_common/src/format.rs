//! Text formatting for durations, temperatures and tool labels.

/// Compact duration: "45m", "4h", "4h 30m". Negative input is "0m".
pub fn duration(seconds: i32) -> String {
    let minutes = seconds.max(0) / 60;
    let (h, m) = (minutes / 60, minutes % 60);
    match (h, m) {
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}m"),
    }
}

/// Duration with seconds below five minutes and padded minutes above an
/// hour: "59s", "4m 59s", "59m", "2h 10m".
pub fn duration_padded(seconds: i32) -> String {
    let s = seconds.max(0);
    if s < 60 {
        format!("{s}s")
    } else if s < 300 {
        format!("{}m {:02}s", s / 60, s % 60)
    } else if s < 3600 {
        format!("{}m", s / 60)
    } else {
        format!("{}h {:02}m", s / 3600, (s % 3600) / 60)
    }
}

/// Countdown text: "0:05 left", "4:59 left", "10 min left", "2:00 left".
pub fn duration_remaining(seconds: i32) -> String {
    if seconds <= 0 {
        return "0 min left".to_string();
    }
    if seconds < 300 {
        format!("{}:{:02} left", seconds / 60, seconds % 60)
    } else if seconds < 3600 {
        format!("{} min left", seconds / 60)
    } else {
        format!("{}:{:02} left", seconds / 3600, (seconds % 3600) / 60)
    }
}

/// Whole-degree temperature: "55°C".
pub fn temp_c(celsius: i32) -> String {
    format!("{celsius}°C")
}

/// Tool label: "T3", or "---" when no tool is active.
pub fn tool_label(tool: i32) -> String {
    if tool < 0 {
        "---".to_string()
    } else {
        format!("T{tool}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration() {
        assert_eq!(duration(0), "0m");
        assert_eq!(duration(-5), "0m");
        assert_eq!(duration(45 * 60), "45m");
        assert_eq!(duration(4 * 3600), "4h");
        assert_eq!(duration(4 * 3600 + 30 * 60), "4h 30m");
    }

    #[test]
    fn test_duration_padded() {
        assert_eq!(duration_padded(0), "0s");
        assert_eq!(duration_padded(59), "59s");
        assert_eq!(duration_padded(60), "1m 00s");
        assert_eq!(duration_padded(299), "4m 59s");
        assert_eq!(duration_padded(300), "5m");
        assert_eq!(duration_padded(3660), "1h 01m");
        assert_eq!(duration_padded(7830), "2h 10m");
    }

    #[test]
    fn test_duration_remaining() {
        assert_eq!(duration_remaining(0), "0 min left");
        assert_eq!(duration_remaining(-10), "0 min left");
        assert_eq!(duration_remaining(5), "0:05 left");
        assert_eq!(duration_remaining(90), "1:30 left");
        assert_eq!(duration_remaining(299), "4:59 left");
        assert_eq!(duration_remaining(300), "5 min left");
        assert_eq!(duration_remaining(600), "10 min left");
        assert_eq!(duration_remaining(3660), "1:01 left");
        assert_eq!(duration_remaining(7200), "2:00 left");
    }

    #[test]
    fn test_labels() {
        assert_eq!(temp_c(55), "55°C");
        assert_eq!(tool_label(3), "T3");
        assert_eq!(tool_label(-1), "---");
    }
}
