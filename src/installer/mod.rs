//! Companion window that installs the system packages and crates the timer
//! board needs. Linux only.

pub mod distro;
pub mod requirements;
pub mod runner;
pub mod steps;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use tauri::{
    async_runtime, AppHandle, Emitter, Manager, State, WebviewUrl, WebviewWindowBuilder,
};
use thiserror::Error;

use distro::DistroInfo;
use requirements::Requirements;
use runner::SystemRunner;
use steps::{InstallPlan, LogSink};

pub const LOG_EVENT: &str = "installer://log";
pub const FINISHED_EVENT: &str = "installer://finished";

const STEP_PAUSE: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("please enter your sudo password")]
    MissingPassword,
    #[error(
        "could not detect your distribution's package manager; please install dependencies manually"
    )]
    UnsupportedDistro,
    #[error("an installation is already running")]
    AlreadyRunning,
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("command timed out")]
    Timeout,
    #[error("requirements file is invalid: {0}")]
    Requirements(String),
    #[error("{0} step failed")]
    StepFailed(&'static str),
}

#[derive(Debug, Serialize, Clone)]
struct SystemInfo {
    distro: String,
    package_manager: Option<String>,
    packages: Vec<String>,
    intro: Vec<String>,
}

#[derive(Debug, Serialize, Clone)]
struct FinishedPayload {
    success: bool,
    message: Option<String>,
}

struct InstallerState {
    plan: InstallPlan,
    running: AtomicBool,
}

struct EmitLog(AppHandle);

impl LogSink for EmitLog {
    fn log(&self, line: &str) {
        if let Err(err) = self.0.emit(LOG_EVENT, line) {
            tracing::warn!(event = "installer.emit_failed", error = %err);
        }
    }
}

/// Directory holding `requirements.toml` and `Cargo.toml`: the working
/// directory when it has a manifest, otherwise the source checkout.
fn project_root() -> PathBuf {
    if let Ok(cwd) = std::env::current_dir() {
        if cwd.join("Cargo.toml").exists() {
            return cwd;
        }
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

fn build_plan(root: &Path) -> InstallPlan {
    let distro = distro::detect();
    let requirements = match Requirements::load_from_dir(root) {
        Ok(requirements) => requirements,
        Err(err) => {
            tracing::warn!(event = "installer.requirements_invalid", error = %err);
            Requirements::bundled().unwrap_or_default()
        }
    };
    let packages = distro
        .package_manager
        .map(|manager| requirements.packages_for(manager).to_vec())
        .unwrap_or_default();
    let manifest = Some(root.join("Cargo.toml")).filter(|path| path.exists());

    InstallPlan {
        distro,
        packages,
        manifest,
        step_pause: STEP_PAUSE,
    }
}

fn system_info(distro: &DistroInfo, packages: &[String]) -> SystemInfo {
    SystemInfo {
        distro: distro.name.to_string(),
        package_manager: distro.package_manager.map(|m| m.name().to_string()),
        packages: packages.to_vec(),
        intro: steps::intro_lines(distro),
    }
}

// Step failures already logged their own ✗ line.
fn failure_log_line(err: &InstallError) -> Option<String> {
    match err {
        InstallError::StepFailed(_) => None,
        other => Some(format!("\n✗ Installation failed: {other}")),
    }
}

#[tauri::command]
async fn installer_system_info(state: State<'_, InstallerState>) -> Result<SystemInfo, String> {
    Ok(system_info(&state.plan.distro, &state.plan.packages))
}

#[tauri::command]
async fn installer_start(
    password: String,
    app: AppHandle,
    state: State<'_, InstallerState>,
) -> Result<(), String> {
    state.plan.validate(&password).map_err(|e| e.to_string())?;
    if state
        .running
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return Err(InstallError::AlreadyRunning.to_string());
    }

    let plan = state.plan.clone();
    async_runtime::spawn(async move {
        let sink = EmitLog(app.clone());
        let runner = SystemRunner::default();
        let result = steps::run_installation(&runner, &plan, &password, &sink).await;
        let payload = match result {
            Ok(()) => FinishedPayload {
                success: true,
                message: None,
            },
            Err(err) => {
                if let Some(line) = failure_log_line(&err) {
                    sink.log(&line);
                }
                FinishedPayload {
                    success: false,
                    message: Some(err.to_string()),
                }
            }
        };
        app.state::<InstallerState>()
            .running
            .store(false, Ordering::SeqCst);
        if let Err(err) = app.emit(FINISHED_EVENT, payload) {
            tracing::warn!(event = "installer.emit_failed", error = %err);
        }
    });
    Ok(())
}

pub fn run() {
    crate::logging::init_logging();
    let plan = build_plan(&project_root());
    tracing::info!(
        event = "installer.started",
        distro = plan.distro.name,
        packages = plan.packages.len()
    );

    tauri::Builder::default()
        .manage(InstallerState {
            plan,
            running: AtomicBool::new(false),
        })
        .invoke_handler(tauri::generate_handler![installer_system_info, installer_start])
        .setup(|app| {
            WebviewWindowBuilder::new(app, "installer", WebviewUrl::App("installer.html".into()))
                .title("ARC Raiders Event Timers - Dependency Installer")
                .inner_size(750.0, 700.0)
                .min_inner_size(750.0, 650.0)
                .resizable(true)
                .center()
                .build()?;
            Ok(())
        })
        .run(crate::context())
        .expect("error while running installer");
}
