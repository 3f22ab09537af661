pub mod base;
pub mod metaforge_api;
pub mod metaforge_html;

use std::path::PathBuf;

use chrono::{NaiveDate, Utc};

use crate::models::EventTimer;
use crate::timezone::DisplayZone;

/// Inputs every source needs to turn raw markup into display-ready records.
#[derive(Clone, Debug)]
pub struct ScrapeContext {
    pub zone: DisplayZone,
    pub today_utc: NaiveDate,
    pub debug_dump: Option<PathBuf>,
}

impl ScrapeContext {
    pub fn new(zone: DisplayZone, debug_dump: Option<PathBuf>) -> Self {
        Self {
            zone,
            today_utc: Utc::now().date_naive(),
            debug_dump,
        }
    }
}

pub trait EventSource: Send + Sync {
    fn source_id(&self) -> &'static str;
    fn source_url(&self) -> &'static str;
    fn fetch(&self, ctx: &ScrapeContext) -> anyhow::Result<Vec<EventTimer>>;
}

#[derive(Clone, serde::Serialize)]
pub struct SourceInfo {
    pub id: String,
    pub url: String,
}

// Priority order: the JSON API first, the scraped page as fallback.
fn active_sources() -> Vec<Box<dyn EventSource>> {
    vec![
        Box::new(metaforge_api::MetaforgeApi),
        Box::new(metaforge_html::MetaforgePage),
    ]
}

pub fn list_sources() -> Vec<SourceInfo> {
    active_sources()
        .into_iter()
        .map(|source| SourceInfo {
            id: source.source_id().to_string(),
            url: source.source_url().to_string(),
        })
        .collect()
}

fn find_source(id: &str) -> Option<Box<dyn EventSource>> {
    active_sources()
        .into_iter()
        .find(|source| source.source_id() == id)
}

/// Runs the sources in order and returns the first non-empty result.
///
/// Failures never escape: an empty list means nothing could be fetched.
pub fn fetch_events(ctx: &ScrapeContext) -> Vec<EventTimer> {
    for source in active_sources() {
        let source_id = source.source_id();
        tracing::info!(event = "scrape.fetch_started", source = source_id);
        match source.fetch(ctx) {
            Ok(events) if !events.is_empty() => {
                tracing::info!(
                    event = "scrape.fetch_completed",
                    source = source_id,
                    count = events.len()
                );
                return events;
            }
            Ok(_) => {
                tracing::warn!(event = "scrape.fetch_empty", source = source_id);
            }
            Err(err) => {
                tracing::warn!(event = "scrape.fetch_failed", source = source_id, error = %err);
            }
        }
    }

    tracing::error!(event = "scrape.no_events");
    Vec::new()
}

pub fn run_single(id: &str, ctx: &ScrapeContext) -> anyhow::Result<Vec<EventTimer>> {
    let source = find_source(id).ok_or_else(|| anyhow::anyhow!("unknown source id: {id}"))?;
    source.fetch(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_is_tried_before_page() {
        let ids: Vec<_> = list_sources().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["metaforge_api", "metaforge_page"]);
    }

    #[test]
    fn unknown_source_is_an_error() {
        let ctx = ScrapeContext::new(DisplayZone::Local, None);
        assert!(run_single("nope", &ctx).is_err());
    }
}
