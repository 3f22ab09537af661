use anyhow::Result;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use super::base;
use super::{EventSource, ScrapeContext};
use crate::countdown;
use crate::models::{EventStatus, EventTimer};
use crate::timezone::DisplayZone;

const URL: &str = "https://metaforge.app/arc-raiders/event-timers";
const SOURCE_ID: &str = "metaforge_page";
const KNOWN_LOCATIONS: [&str; 4] = ["Dam", "Spaceport", "Buried City", "Blue Gate"];
const FALLBACK_LOCATION: &str = "Multiple Locations";
const MAX_WINDOWS: usize = 5;

// The page is a Tailwind build, so cards are recognised by utility-class
// fragments rather than stable ids.
static CARD_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"div[class*="bg-secondary/70"]"#).expect("metaforge card"));
static NAME_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"h4[class*="text-foreground"][class*="font-semibold"]"#)
        .expect("metaforge name")
});
static STATUS_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"span[class*="text-green-400"], span[class*="text-blue-400"]"#)
        .expect("metaforge status badge")
});
static LOCATION_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(
        r#"div[class*="text-muted-foreground"][class*="text-xs"][class*="uppercase"]"#,
    )
    .expect("metaforge locations")
});
static COUNTDOWN_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"span[class*="text-lg"][class*="font-semibold"][class*="text-white"]"#)
        .expect("metaforge countdown")
});
static TIME_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"div[class*="text-foreground/90"][class*="text-sm"][class*="font-medium"]"#)
        .expect("metaforge time window")
});
static WINDOWS_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"div[class*="divide-border"]"#).expect("metaforge windows"));
static WINDOW_ROW_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"div[class*="py-1.5"]"#).expect("metaforge window row"));

pub struct MetaforgePage;

impl EventSource for MetaforgePage {
    fn source_id(&self) -> &'static str {
        SOURCE_ID
    }

    fn source_url(&self) -> &'static str {
        URL
    }

    fn fetch(&self, ctx: &ScrapeContext) -> Result<Vec<EventTimer>> {
        let html = base::fetch_html(URL)?;
        if let Some(path) = ctx.debug_dump.as_deref() {
            base::dump_debug(path, &html);
        }
        Ok(parse_document(&html, ctx.zone, ctx.today_utc))
    }
}

/// Extracts event cards from a saved or freshly fetched page.
///
/// Time windows on the page are UTC and are rewritten into `zone` using
/// `today_utc` as the reference date.
pub fn parse_document(html: &str, zone: DisplayZone, today_utc: NaiveDate) -> Vec<EventTimer> {
    let document = Html::parse_document(html);
    let cards: Vec<_> = document.select(&CARD_SELECTOR).collect();
    tracing::debug!(event = "scrape.cards_found", count = cards.len());

    let mut events = Vec::new();
    for card in cards {
        if let Some(event) = parse_card(&card, zone, today_utc) {
            tracing::debug!(
                event = "scrape.card_parsed",
                name = %event.name,
                status = event.status.label(),
                countdown = %countdown::format_countdown(event.countdown_seconds)
            );
            events.push(event);
        }
    }
    events
}

fn parse_card(
    card: &ElementRef<'_>,
    zone: DisplayZone,
    today_utc: NaiveDate,
) -> Option<EventTimer> {
    let name = base::first_text(card, &NAME_SELECTOR)?;

    let status = match base::first_text(card, &STATUS_SELECTOR) {
        Some(badge) if badge.contains("Active") => EventStatus::Active,
        _ => EventStatus::Upcoming,
    };

    let locations: Vec<String> = base::first_text(card, &LOCATION_SELECTOR)
        .map(|text| {
            KNOWN_LOCATIONS
                .iter()
                .filter(|loc| text.contains(*loc))
                .map(|loc| loc.to_string())
                .collect()
        })
        .unwrap_or_default();

    let countdown_seconds = base::first_text(card, &COUNTDOWN_SELECTOR)
        .map(|text| countdown::parse_countdown(&text))
        .unwrap_or(0);

    let time_info = base::first_text(card, &TIME_SELECTOR)
        .map(|text| zone.convert_range(&text, today_utc))
        .unwrap_or_default();

    let upcoming_windows = card
        .select(&WINDOWS_SELECTOR)
        .next()
        .map(|container| {
            container
                .select(&WINDOW_ROW_SELECTOR)
                .take(MAX_WINDOWS)
                .map(|row| zone.localize_window_text(&base::inner_text(row), today_utc))
                .collect()
        })
        .unwrap_or_default();

    if countdown_seconds == 0 && locations.is_empty() {
        tracing::debug!(event = "scrape.card_skipped", name = %name);
        return None;
    }

    let locations = if locations.is_empty() {
        vec![FALLBACK_LOCATION.to_string()]
    } else {
        locations
    };

    Some(EventTimer {
        name,
        status,
        locations,
        time_info,
        countdown_seconds,
        upcoming_windows,
    })
}
