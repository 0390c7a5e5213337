// Human-readable durations for poll progress lines

use std::time::Duration;

const UNITS: [(f64, &str); 3] = [(86_400.0, "d"), (3_600.0, "h"), (60.0, "m")];

/// Render seconds as days/hours/minutes/seconds, omitting zero-valued units
///
/// Whole units use floor division; the seconds part keeps one decimal and is
/// dropped when zero.
///
/// # Example
/// ```
/// use settle_core::domain::format_seconds;
///
/// assert_eq!(format_seconds(0.0), "");
/// assert_eq!(format_seconds(5.5), "5.5s");
/// assert_eq!(format_seconds(65.0), "1m5.0s");
/// assert_eq!(format_seconds(90_065.0), "1d1h1m5.0s");
/// ```
pub fn format_seconds(seconds: f64) -> String {
    let mut out = String::new();
    let mut remaining = seconds;

    for (unit_secs, suffix) in UNITS {
        if remaining >= unit_secs {
            let whole = (remaining / unit_secs).floor();
            out.push_str(&format!("{}{}", whole as u64, suffix));
            remaining %= unit_secs;
        }
    }

    if remaining > 0.0 {
        out.push_str(&format!("{:.1}s", remaining));
    }
    out
}

pub fn format_duration(duration: Duration) -> String {
    format_seconds(duration.as_secs_f64())
}

/// Like `format_duration`, but renders zero as "0s" so log lines never have a gap
pub fn display_duration(duration: Duration) -> String {
    let formatted = format_duration(duration);
    if formatted.is_empty() {
        "0s".to_string()
    } else {
        formatted
    }
}
