use serde::{Deserialize, Deserializer, Serialize};

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum EventStatus {
    Active,
    #[default]
    Upcoming,
}

impl EventStatus {
    pub fn from_label(label: &str) -> Self {
        if label.trim().eq_ignore_ascii_case("active") {
            EventStatus::Active
        } else {
            EventStatus::Upcoming
        }
    }

    pub fn is_active(self) -> bool {
        matches!(self, EventStatus::Active)
    }

    pub fn label(self) -> &'static str {
        match self {
            EventStatus::Active => "Active",
            EventStatus::Upcoming => "Upcoming",
        }
    }
}

impl<'de> Deserialize<'de> for EventStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(EventStatus::from_label(&raw))
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct EventTimer {
    pub name: String,
    pub status: EventStatus,
    pub locations: Vec<String>,
    pub time_info: String, // display-zone window, e.g. "05:00 AM - 06:00 AM"
    pub countdown_seconds: u64,
    pub upcoming_windows: Vec<String>,
}

impl EventTimer {
    /// Decrements the countdown by one second, stopping at zero.
    pub fn tick(&mut self) {
        self.countdown_seconds = self.countdown_seconds.saturating_sub(1);
    }

    pub fn is_expired(&self) -> bool {
        self.countdown_seconds == 0
    }
}

/// Orders events for the board: active events first in scraped order, then
/// upcoming events by ascending countdown.
pub fn sort_for_display(events: Vec<EventTimer>) -> Vec<EventTimer> {
    let (active, mut upcoming): (Vec<_>, Vec<_>) =
        events.into_iter().partition(|event| event.status.is_active());
    upcoming.sort_by_key(|event| event.countdown_seconds);

    let mut ordered = active;
    ordered.extend(upcoming);
    ordered
}
