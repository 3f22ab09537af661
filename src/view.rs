//! Display-ready snapshots pushed to the webview.

use serde::Serialize;

use crate::board::{Board, Phase};
use crate::countdown::format_countdown;
use crate::models::{EventStatus, EventTimer};

const LOCATIONS_MAX_CHARS: usize = 35;
const WINDOW_MAX_CHARS: usize = 38;
const WINDOWS_SHOWN: usize = 2;

#[derive(Serialize, Clone, Debug)]
pub struct EventCard {
    pub name: String,
    pub badge: String,
    pub active: bool,
    pub locations: String,
    pub time_info: String,
    pub countdown_caption: &'static str,
    pub countdown: String,
    pub countdown_seconds: u64,
    pub windows: Vec<String>,
}

#[derive(Serialize, Clone, Debug)]
pub struct BoardView {
    pub title: String,
    pub phase: Phase,
    pub status: String,
    pub refreshing: bool,
    pub events: Vec<EventCard>,
    pub debug_dump_path: Option<String>,
}

impl BoardView {
    pub fn from_board(board: &Board, zone_label: &str, debug_dump_path: Option<String>) -> Self {
        Self {
            title: format!("ARC Raiders Event Timers ({zone_label})"),
            phase: board.phase(),
            status: board.status_text(),
            refreshing: board.is_refreshing(),
            events: board.events().iter().map(EventCard::from).collect(),
            debug_dump_path,
        }
    }
}

impl From<&EventTimer> for EventCard {
    fn from(event: &EventTimer) -> Self {
        let active = event.status == EventStatus::Active;
        Self {
            name: event.name.clone(),
            badge: event.status.label().to_uppercase(),
            active,
            locations: truncate(&event.locations.join(", "), LOCATIONS_MAX_CHARS).to_uppercase(),
            time_info: event.time_info.clone(),
            countdown_caption: if active { "ENDS IN" } else { "STARTS IN" },
            countdown: format_countdown(event.countdown_seconds),
            countdown_seconds: event.countdown_seconds,
            windows: event
                .upcoming_windows
                .iter()
                .take(WINDOWS_SHOWN)
                .map(|window| truncate(window, WINDOW_MAX_CHARS))
                .collect(),
        }
    }
}

/// Cuts `text` to `max - 3` characters plus `...` when it exceeds `max`.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn timer(status: EventStatus, locations: &[&str], windows: &[&str]) -> EventTimer {
        EventTimer {
            name: "Harvester".to_string(),
            status,
            locations: locations.iter().map(|s| s.to_string()).collect(),
            time_info: "05:00 AM - 06:00 AM".to_string(),
            countdown_seconds: 13526,
            upcoming_windows: windows.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn active_card_captions() {
        let card = EventCard::from(&timer(EventStatus::Active, &["Dam", "Spaceport"], &[]));
        assert_eq!(card.badge, "ACTIVE");
        assert_eq!(card.countdown_caption, "ENDS IN");
        assert_eq!(card.countdown, "3h 45m 26s");
        assert_eq!(card.locations, "DAM, SPACEPORT");
        assert!(card.windows.is_empty());
    }

    #[test]
    fn long_location_lists_are_truncated() {
        let card = EventCard::from(&timer(
            EventStatus::Upcoming,
            &["Dam", "Spaceport", "Buried City", "Blue Gate"],
            &[],
        ));
        assert_eq!(card.countdown_caption, "STARTS IN");
        assert_eq!(card.locations, "DAM, SPACEPORT, BURIED CITY, BLU...");
        assert_eq!(card.locations.chars().count(), 35);
    }

    #[test]
    fn only_two_windows_shown_and_truncated() {
        let card = EventCard::from(&timer(
            EventStatus::Upcoming,
            &["Dam"],
            &[
                "07:00 AM - 08:00 AM Dam",
                "09:00 AM - 10:00 AM Buried City in 5h 38m 42s",
                "11:00 AM - 12:00 PM Spaceport",
            ],
        ));
        assert_eq!(card.windows.len(), 2);
        assert_eq!(card.windows[0], "07:00 AM - 08:00 AM Dam");
        assert_eq!(card.windows[1], "09:00 AM - 10:00 AM Buried City in ...");
    }

    #[test]
    fn board_view_title_and_status() {
        let board = Board::new(Duration::from_secs(60));
        let view = BoardView::from_board(&board, "CET", None);
        assert_eq!(view.title, "ARC Raiders Event Timers (CET)");
        assert_eq!(view.phase, Phase::Loading);
        assert_eq!(view.status, "Loading...");
        assert!(view.events.is_empty());
    }
}
