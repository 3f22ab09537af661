use std::fmt::Display;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;

const DISPLAY_FORMAT: &str = "%I:%M %p";
const TZ_ENV: &str = "TZ";

static CLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(\d{1,2}):(\d{2})\s*([ap]m)\s*$").expect("valid clock regex")
});
static RANGE_IN_TEXT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d{1,2}:\d{2}\s*[ap]m)\s*-\s*(\d{1,2}:\d{2}\s*[ap]m)")
        .expect("valid range regex")
});

/// Zone the board renders wall-clock times in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayZone {
    Local,
    Named(Tz),
}

impl DisplayZone {
    pub fn from_setting(name: Option<&str>) -> Result<Self> {
        match name.map(str::trim).filter(|n| !n.is_empty()) {
            None => Ok(DisplayZone::Local),
            Some(raw) => raw
                .parse::<Tz>()
                .map(DisplayZone::Named)
                .map_err(|err| anyhow!("unknown timezone {raw}: {err}")),
        }
    }

    /// Short zone name for the window title, e.g. `CET`.
    ///
    /// `Local` resolves the system zone by name; the bare offset is only
    /// shown when the OS does not report one.
    pub fn label(&self) -> String {
        match self {
            DisplayZone::Local => match system_zone() {
                Some(tz) => abbreviation_at(&tz, Utc::now()),
                None => Local::now().format("%Z").to_string(),
            },
            DisplayZone::Named(tz) => abbreviation_at(tz, Utc::now()),
        }
    }

    pub fn convert_time(&self, text: &str, date: NaiveDate) -> String {
        match self {
            DisplayZone::Local => convert_utc_time(text, date, &Local),
            DisplayZone::Named(tz) => convert_utc_time(text, date, tz),
        }
    }

    pub fn convert_range(&self, range: &str, date: NaiveDate) -> String {
        match self {
            DisplayZone::Local => convert_time_range(range, date, &Local),
            DisplayZone::Named(tz) => convert_time_range(range, date, tz),
        }
    }

    pub fn localize_window_text(&self, text: &str, date: NaiveDate) -> String {
        match self {
            DisplayZone::Local => localize_window_text(text, date, &Local),
            DisplayZone::Named(tz) => localize_window_text(text, date, tz),
        }
    }
}

/// System zone as an IANA name, preferring `TZ` over the OS setting.
fn system_zone() -> Option<Tz> {
    let from_env = std::env::var(TZ_ENV)
        .ok()
        .and_then(|raw| parse_zone_name(&raw));
    from_env.or_else(|| match iana_time_zone::get_timezone() {
        Ok(name) => parse_zone_name(&name),
        Err(err) => {
            tracing::debug!(event = "timezone.system_lookup_failed", error = %err);
            None
        }
    })
}

// `TZ` may carry a leading colon (`:Europe/Berlin`); POSIX rules don't parse.
fn parse_zone_name(raw: &str) -> Option<Tz> {
    raw.trim().trim_start_matches(':').parse().ok()
}

fn abbreviation_at(tz: &Tz, instant: DateTime<Utc>) -> String {
    instant.with_timezone(tz).format("%Z").to_string()
}

fn parse_clock(text: &str) -> Option<NaiveTime> {
    let caps = CLOCK_RE.captures(text)?;
    let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minute: u32 = caps.get(2)?.as_str().parse().ok()?;
    if !(1..=12).contains(&hour) {
        return None;
    }
    let pm = caps.get(3)?.as_str().eq_ignore_ascii_case("pm");
    let hour24 = match (hour, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, false) => h,
        (h, true) => h + 12,
    };
    NaiveTime::from_hms_opt(hour24, minute, 0)
}

/// Converts a UTC wall-clock time such as `5:00 AM` on `date` into `zone`.
///
/// Unparseable input comes back trimmed but otherwise untouched.
pub fn convert_utc_time<Z>(text: &str, date: NaiveDate, zone: &Z) -> String
where
    Z: TimeZone,
    Z::Offset: Display,
{
    match parse_clock(text) {
        Some(time) => {
            let utc = Utc.from_utc_datetime(&NaiveDateTime::new(date, time));
            utc.with_timezone(zone).format(DISPLAY_FORMAT).to_string()
        }
        None => {
            tracing::debug!(event = "timezone.parse_failed", input = text);
            text.trim().to_string()
        }
    }
}

/// Converts `5:00 AM - 6:00 AM` (UTC) into `zone`. Anything that is not a
/// two-part range is returned as is.
pub fn convert_time_range<Z>(range: &str, date: NaiveDate, zone: &Z) -> String
where
    Z: TimeZone,
    Z::Offset: Display,
{
    if !range.contains('-') {
        return range.to_string();
    }
    let parts: Vec<&str> = range.split('-').collect();
    if parts.len() != 2 {
        return range.to_string();
    }
    format!(
        "{} - {}",
        convert_utc_time(parts[0], date, zone),
        convert_utc_time(parts[1], date, zone)
    )
}

/// Rewrites the first UTC time range embedded in free text, e.g.
/// `5:00 AM - 6:00 AM Dam in 3h 38m 42s`.
pub fn localize_window_text<Z>(text: &str, date: NaiveDate, zone: &Z) -> String
where
    Z: TimeZone,
    Z::Offset: Display,
{
    let Some(caps) = RANGE_IN_TEXT_RE.captures(text) else {
        return text.to_string();
    };
    let (Some(whole), Some(start), Some(end)) = (caps.get(0), caps.get(1), caps.get(2)) else {
        return text.to_string();
    };
    let local = format!(
        "{} - {}",
        convert_utc_time(start.as_str(), date, zone),
        convert_utc_time(end.as_str(), date, zone)
    );
    let mut out = String::with_capacity(text.len() + 4);
    out.push_str(&text[..whole.start()]);
    out.push_str(&local);
    out.push_str(&text[whole.end()..]);
    out
}
