pub mod board;
mod config;
pub mod countdown;
pub mod installer;
pub mod logging;
pub mod models;
mod scheduler;
pub mod scraping;
pub mod timezone;
mod utils;
pub mod view;

use tauri::{AppHandle, State, WebviewUrl, WebviewWindowBuilder};

use config::{AppConfig, ConfigStore};
use scheduler::BoardState;
use view::BoardView;

pub use utils::debug_dump_path;

pub(crate) fn context() -> tauri::Context<tauri::Wry> {
    tauri::generate_context!()
}

#[tauri::command]
async fn get_board(app: AppHandle) -> Result<BoardView, String> {
    Ok(scheduler::snapshot(&app))
}

#[tauri::command]
async fn refresh_events(app: AppHandle) -> Result<bool, String> {
    Ok(scheduler::trigger_refresh(&app))
}

#[tauri::command]
async fn list_sources() -> Result<Vec<scraping::SourceInfo>, String> {
    Ok(scraping::list_sources())
}

#[tauri::command]
async fn get_settings(config_store: State<'_, ConfigStore>) -> Result<AppConfig, String> {
    Ok(config_store.read())
}

#[tauri::command]
async fn update_settings(
    settings: AppConfig,
    app: AppHandle,
    config_store: State<'_, ConfigStore>,
    board: State<'_, BoardState>,
) -> Result<AppConfig, String> {
    let updated = config_store.apply(settings)?;
    board.set_cooldown(updated.refresh_cooldown());
    tracing::info!(
        event = "config.updated",
        timezone = ?updated.timezone,
        debug_dump = updated.debug_dump,
        cooldown_secs = updated.refresh_cooldown_secs
    );

    // Times on the board are baked in at parse time, so a zone change needs a
    // fresh fetch.
    if !scheduler::trigger_refresh(&app) {
        scheduler::publish(&app);
    }
    Ok(updated)
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    logging::init_logging();
    let config_store = ConfigStore::load();
    let cooldown = config_store.read().refresh_cooldown();

    tauri::Builder::default()
        .manage(config_store)
        .manage(BoardState::new(cooldown))
        .plugin(tauri_plugin_opener::init())
        .invoke_handler(tauri::generate_handler![
            get_board,
            refresh_events,
            list_sources,
            get_settings,
            update_settings
        ])
        .setup(|app| {
            let handle = app.handle().clone();
            let title = scheduler::snapshot(&handle).title;
            let url = WebviewUrl::App("index.html".into());
            WebviewWindowBuilder::new(app, scheduler::MAIN_WINDOW, url)
                .title(title)
                .inner_size(1600.0, 900.0)
                .min_inner_size(1200.0, 700.0)
                .build()?;
            scheduler::start(handle);
            Ok(())
        })
        .run(context())
        .expect("error while running tauri application");
}
