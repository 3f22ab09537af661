use dirs::data_dir;
use once_cell::sync::Lazy;
use std::{fs, path::PathBuf};

static DATA_ROOT: Lazy<PathBuf> = Lazy::new(|| {
    let base = data_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    let root = base.join("arc-timers");
    if let Err(err) = fs::create_dir_all(&root) {
        tracing::warn!(event = "utils.data_root_failed", path = ?root, error = %err);
    }
    root
});

pub fn data_root() -> PathBuf {
    DATA_ROOT.clone()
}

pub fn config_path() -> PathBuf {
    data_root().join("config.json")
}

/// Where the raw page response lands when debug dumps are on.
pub fn debug_dump_path() -> PathBuf {
    data_root().join("debug_response.html")
}
