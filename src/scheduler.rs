use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::Local;
use tauri::{async_runtime, AppHandle, Emitter, Manager};
use tokio::time::{interval, sleep, MissedTickBehavior};

use crate::board::{Board, TickOutcome};
use crate::config::ConfigStore;
use crate::models::EventTimer;
use crate::scraping::{self, ScrapeContext};
use crate::utils;
use crate::view::BoardView;

pub const UPDATED_EVENT: &str = "board://updated";
pub const TICK_EVENT: &str = "board://tick";
pub const MAIN_WINDOW: &str = "main";

const TICK_PERIOD: Duration = Duration::from_secs(1);
const AUTO_REFRESH_DELAY: Duration = Duration::from_millis(100);

pub struct BoardState {
    board: Mutex<Board>,
    // Last title pushed to the native window.
    shown_title: Mutex<Option<String>>,
}

impl BoardState {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            board: Mutex::new(Board::new(cooldown)),
            shown_title: Mutex::new(None),
        }
    }

    /// Records `title` as shown and reports whether it differs from the
    /// previous one.
    fn title_changed(&self, title: &str) -> bool {
        let mut shown = self
            .shown_title
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if shown.as_deref() == Some(title) {
            return false;
        }
        *shown = Some(title.to_string());
        true
    }

    fn lock(&self) -> MutexGuard<'_, Board> {
        self.board
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_cooldown(&self, cooldown: Duration) {
        self.lock().set_cooldown(cooldown);
    }

    fn begin_refresh(&self) -> bool {
        self.lock().begin_refresh()
    }

    fn finish_refresh(&self, events: Vec<EventTimer>) {
        self.lock().finish_refresh(events, Local::now());
    }

    fn tick(&self, now: Instant) -> TickOutcome {
        self.lock().tick(now)
    }
}

/// Kicks off the first fetch and the single ticker for the app lifetime.
pub fn start(app: AppHandle) {
    trigger_refresh(&app);
    async_runtime::spawn(tick_loop(app));
}

pub fn snapshot(app: &AppHandle) -> BoardView {
    let store = app.state::<ConfigStore>();
    let dump_path = store
        .read()
        .debug_dump
        .then(|| utils::debug_dump_path().display().to_string());
    let zone_label = store.display_zone().label();
    let board = app.state::<BoardState>();
    let guard = board.lock();
    BoardView::from_board(&guard, &zone_label, dump_path)
}

fn emit_snapshot(app: &AppHandle, event: &str) {
    let view = snapshot(app);
    if event == UPDATED_EVENT {
        sync_window_title(app, &view.title);
    }
    if let Err(err) = app.emit(event, view) {
        tracing::warn!(event = "board.emit_failed", channel = event, error = %err);
    }
}

// The webview's document.title never reaches the native title bar.
fn sync_window_title(app: &AppHandle, title: &str) {
    if !app.state::<BoardState>().title_changed(title) {
        return;
    }
    if let Some(window) = app.get_webview_window(MAIN_WINDOW) {
        if let Err(err) = window.set_title(title) {
            tracing::warn!(event = "board.set_title_failed", error = %err);
        }
    }
}

/// Pushes the current board to the UI without fetching, e.g. after a
/// settings change while a refresh is already running.
pub fn publish(app: &AppHandle) {
    emit_snapshot(app, UPDATED_EVENT);
}

/// Starts a background fetch unless one is already running.
///
/// Network I/O happens on a blocking worker; the result is applied to the
/// board and announced with `board://updated`.
pub fn trigger_refresh(app: &AppHandle) -> bool {
    if !app.state::<BoardState>().begin_refresh() {
        tracing::debug!(event = "board.refresh_skipped");
        return false;
    }
    emit_snapshot(app, UPDATED_EVENT);

    let store = app.state::<ConfigStore>();
    let ctx = ScrapeContext::new(
        store.display_zone(),
        store.read().debug_dump.then(utils::debug_dump_path),
    );
    let app = app.clone();

    async_runtime::spawn(async move {
        tracing::info!(event = "board.refresh_started");
        let worker = async_runtime::spawn_blocking(move || scraping::fetch_events(&ctx));
        let events = match worker.await {
            Ok(events) => events,
            Err(err) => {
                tracing::error!(event = "board.refresh_worker_failed", error = %err);
                Vec::new()
            }
        };
        tracing::info!(event = "board.refresh_completed", count = events.len());
        app.state::<BoardState>().finish_refresh(events);
        emit_snapshot(&app, UPDATED_EVENT);
    });
    true
}

async fn tick_loop(app: AppHandle) {
    let mut ticker = interval(TICK_PERIOD);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let outcome = app.state::<BoardState>().tick(Instant::now());
        if outcome.ticked {
            emit_snapshot(&app, TICK_EVENT);
        }
        if outcome.refresh_due {
            tracing::info!(event = "board.countdown_expired");
            sleep(AUTO_REFRESH_DELAY).await;
            trigger_refresh(&app);
        }
    }
}
