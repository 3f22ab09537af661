use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use serde_json::Number;

use super::base;
use super::{EventSource, ScrapeContext};
use crate::models::{EventStatus, EventTimer};

const API_URLS: [&str; 3] = [
    "https://metaforge.app/api/arc-raiders/event-timers",
    "https://metaforge.app/api/events/arc-raiders",
    "https://api.metaforge.app/arc-raiders/event-timers",
];
const SOURCE_ID: &str = "metaforge_api";

// Every field is optional and may also be `null`.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    events: Option<Vec<ApiEvent>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiEvent {
    name: Option<String>,
    status: Option<String>,
    locations: Option<Vec<String>>,
    time: Option<String>,
    countdown: Option<Number>,
    windows: Option<Vec<String>>,
}

/// Whole seconds from an integer or float countdown; negatives become 0.
fn countdown_seconds(raw: Option<&Number>) -> u64 {
    let Some(number) = raw else {
        return 0;
    };
    number.as_u64().unwrap_or_else(|| {
        number
            .as_f64()
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(|secs| secs as u64)
            .unwrap_or(0)
    })
}

impl From<ApiEvent> for EventTimer {
    fn from(item: ApiEvent) -> Self {
        EventTimer {
            countdown_seconds: countdown_seconds(item.countdown.as_ref()),
            name: item.name.unwrap_or_default(),
            status: item
                .status
                .as_deref()
                .map(EventStatus::from_label)
                .unwrap_or_default(),
            locations: item.locations.unwrap_or_default(),
            time_info: item.time.unwrap_or_default(),
            upcoming_windows: item.windows.unwrap_or_default(),
        }
    }
}

pub struct MetaforgeApi;

impl EventSource for MetaforgeApi {
    fn source_id(&self) -> &'static str {
        SOURCE_ID
    }

    fn source_url(&self) -> &'static str {
        API_URLS[0]
    }

    fn fetch(&self, _ctx: &ScrapeContext) -> Result<Vec<EventTimer>> {
        for url in API_URLS {
            let parsed = base::fetch_json(url).and_then(|body| parse_payload(&body));
            match parsed {
                Ok(events) if !events.is_empty() => {
                    tracing::info!(event = "scrape.api_hit", url = url, count = events.len());
                    return Ok(events);
                }
                Ok(_) => tracing::debug!(event = "scrape.api_empty", url = url),
                Err(err) => tracing::debug!(event = "scrape.api_miss", url = url, error = %err),
            }
        }
        Err(anyhow!("no api endpoint returned events"))
    }
}

pub(crate) fn parse_payload(body: &str) -> Result<Vec<EventTimer>> {
    let response: ApiResponse =
        serde_json::from_str(body).context("event api payload is not the expected shape")?;
    Ok(response
        .events
        .unwrap_or_default()
        .into_iter()
        .map(EventTimer::from)
        .collect())
}
