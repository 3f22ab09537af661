use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::models::{sort_for_display, EventTimer};

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Loading,
    Loaded,
    Error,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    pub ticked: bool,
    pub refresh_due: bool,
}

/// In-memory timer board shared between the refresh worker and the ticker.
#[derive(Debug)]
pub struct Board {
    phase: Phase,
    events: Vec<EventTimer>,
    last_updated: Option<DateTime<Local>>,
    refresh_in_flight: bool,
    auto_refresh_pending: bool,
    last_auto_refresh: Option<Instant>,
    cooldown: Duration,
}

impl Board {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            phase: Phase::Loading,
            events: Vec::new(),
            last_updated: None,
            refresh_in_flight: false,
            auto_refresh_pending: false,
            last_auto_refresh: None,
            cooldown,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn events(&self) -> &[EventTimer] {
        &self.events
    }

    pub fn set_cooldown(&mut self, cooldown: Duration) {
        self.cooldown = cooldown;
    }

    /// Marks a refresh as started. Returns `false` when one is already running.
    pub fn begin_refresh(&mut self) -> bool {
        if self.refresh_in_flight {
            return false;
        }
        self.refresh_in_flight = true;
        self.phase = Phase::Loading;
        true
    }

    pub fn finish_refresh(&mut self, events: Vec<EventTimer>, now: DateTime<Local>) {
        self.events = sort_for_display(events);
        self.phase = if self.events.is_empty() {
            Phase::Error
        } else {
            Phase::Loaded
        };
        self.last_updated = Some(now);
        self.refresh_in_flight = false;
        self.auto_refresh_pending = false;
    }

    /// Advances every countdown by one second.
    ///
    /// A refresh is reported once when a countdown sits at zero, no more often
    /// than the cooldown allows.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        if self.phase != Phase::Loaded {
            return TickOutcome::default();
        }

        let mut any_expired = false;
        for event in &mut self.events {
            event.tick();
            any_expired |= event.is_expired();
        }

        let cooled_down = self
            .last_auto_refresh
            .map_or(true, |last| now.saturating_duration_since(last) > self.cooldown);
        let refresh_due = any_expired && !self.auto_refresh_pending && cooled_down;
        if refresh_due {
            self.auto_refresh_pending = true;
            self.last_auto_refresh = Some(now);
        }

        TickOutcome {
            ticked: true,
            refresh_due,
        }
    }

    pub fn status_text(&self) -> String {
        match self.phase {
            Phase::Loading => "Loading...".to_string(),
            Phase::Error => "ERROR: Failed to fetch events from website".to_string(),
            Phase::Loaded => {
                let stamp = self
                    .last_updated
                    .map(|at| at.format("%I:%M:%S %p").to_string())
                    .unwrap_or_default();
                format!(
                    "Last updated: {stamp} ({} events loaded)",
                    self.events.len()
                )
            }
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.refresh_in_flight
    }
}
