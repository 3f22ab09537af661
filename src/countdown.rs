use once_cell::sync::Lazy;
use regex::Regex;

static HOURS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(\d+)h").expect("hours regex"));
static MINUTES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(\d+)m").expect("minutes regex"));
static SECONDS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(\d+)s").expect("seconds regex"));

/// Parses countdown text such as `3h 42m 26s` or `42m 26s` into seconds.
///
/// Each unit is looked up on its own, so missing units count as zero and
/// garbage yields `0`.
pub fn parse_countdown(text: &str) -> u64 {
    if text.trim().is_empty() {
        return 0;
    }

    let unit = |re: &Regex| -> u64 {
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(0)
    };

    unit(&HOURS_RE) * 3600 + unit(&MINUTES_RE) * 60 + unit(&SECONDS_RE)
}

/// Formats seconds as `3h 42m 26s`, dropping zero components.
pub fn format_countdown(seconds: u64) -> String {
    if seconds == 0 {
        return "0s".to_string();
    }

    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    let mut parts = Vec::with_capacity(3);
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if secs > 0 || parts.is_empty() {
        parts.push(format!("{secs}s"));
    }
    parts.join(" ")
}
