use std::path::PathBuf;
use std::time::Duration;

use tokio::time::sleep;

use super::distro::DistroInfo;
use super::runner::{CommandOutcome, CommandRunner, CommandSpec};
use super::InstallError;

const UNPRIVILEGED_OUTPUT_LINES: usize = 5;

/// Receives installer log lines as they are produced.
pub trait LogSink: Send + Sync {
    fn log(&self, line: &str);
}

/// Everything the step pipeline needs besides the password.
#[derive(Clone, Debug)]
pub struct InstallPlan {
    pub distro: DistroInfo,
    pub packages: Vec<String>,
    pub manifest: Option<PathBuf>,
    pub step_pause: Duration,
}

impl InstallPlan {
    pub fn validate(&self, password: &str) -> Result<(), InstallError> {
        if password.is_empty() {
            return Err(InstallError::MissingPassword);
        }
        if self.distro.package_manager.is_none() {
            return Err(InstallError::UnsupportedDistro);
        }
        Ok(())
    }
}

/// Greeting shown in the log pane before anything runs.
pub fn intro_lines(distro: &DistroInfo) -> Vec<String> {
    vec![
        "✓ Ready to install dependencies!".to_string(),
        format!("✓ Detected: {}", distro.name),
        String::new(),
        "👉 Enter your sudo password above and click 'START INSTALLATION'".to_string(),
    ]
}

async fn run_logged<R, L>(runner: &R, spec: &CommandSpec, password: &str, log: &L) -> bool
where
    R: CommandRunner,
    L: LogSink,
{
    let secret = spec.is_privileged().then_some(password);
    match runner.run(spec, secret).await {
        Ok(outcome) if outcome.success => {
            for line in output_lines(spec, &outcome) {
                log.log(&format!("  {line}"));
            }
            true
        }
        Ok(outcome) => {
            if let Some(message) = error_message(spec, &outcome) {
                log.log(&format!("Error: {message}"));
            }
            false
        }
        Err(InstallError::Timeout) => {
            log.log("Error: Command timed out");
            false
        }
        Err(err) => {
            log.log(&format!("Error: {err}"));
            false
        }
    }
}

fn output_lines<'a>(spec: &CommandSpec, outcome: &'a CommandOutcome) -> Vec<&'a str> {
    let lines = outcome.stdout.trim().lines();
    if spec.is_privileged() {
        lines
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.to_lowercase().contains("[sudo]"))
            .collect()
    } else {
        lines
            .take(UNPRIVILEGED_OUTPUT_LINES)
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect()
    }
}

// The sudo prompt lands on stderr and is noise in the log.
fn error_message(spec: &CommandSpec, outcome: &CommandOutcome) -> Option<String> {
    if !spec.is_privileged() {
        return Some(outcome.stderr.trim().to_string());
    }
    let lines: Vec<&str> = outcome
        .stderr
        .trim()
        .lines()
        .filter(|line| {
            let lowered = line.to_lowercase();
            !line.trim().is_empty() && !lowered.contains("[sudo]") && !lowered.contains("password")
        })
        .collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join(" "))
    }
}

// (command, success line, line logged before retrying with it)
type FetchAttempt = (CommandSpec, &'static str, Option<&'static str>);

fn crate_fetch_attempts(manifest: &str) -> Vec<FetchAttempt> {
    let base = || CommandSpec::plain(["cargo", "fetch", "--manifest-path", manifest]);
    vec![
        (
            base().with_args(["--locked"]),
            "✓ Rust crates fetched successfully (locked)",
            None,
        ),
        (
            base(),
            "✓ Rust crates fetched successfully",
            Some("Retrying without --locked..."),
        ),
        (
            base().with_args(["--offline"]),
            "✓ Rust crates resolved from the local cache",
            Some("Retrying with --offline..."),
        ),
    ]
}

/// Runs the three installer steps, logging as it goes.
///
/// A failed index update is tolerated; failed package installs or crate
/// fetches abort the remaining steps.
pub async fn run_installation<R, L>(
    runner: &R,
    plan: &InstallPlan,
    password: &str,
    log: &L,
) -> Result<(), InstallError>
where
    R: CommandRunner,
    L: LogSink,
{
    plan.validate(password)?;
    let manager = plan
        .distro
        .package_manager
        .ok_or(InstallError::UnsupportedDistro)?;

    log.log("");
    log.log("=== Starting Installation ===");
    log.log("");

    log.log("Step 1/3: Updating package manager...");
    let update = CommandSpec::sudo(manager.update_args().iter().copied());
    if run_logged(runner, &update, password, log).await {
        log.log("✓ Package manager updated successfully");
    } else {
        tracing::warn!(event = "installer.update_failed", manager = manager.name());
        log.log("⚠ Package manager update had issues (continuing anyway)");
    }
    sleep(plan.step_pause).await;

    log.log("");
    log.log("Step 2/3: Installing system packages...");
    if !plan.packages.is_empty() {
        log.log(&format!("Installing: {}", plan.packages.join(", ")));
        let install = CommandSpec::sudo(manager.install_args().iter().copied())
            .with_args(plan.packages.iter().cloned());
        if run_logged(runner, &install, password, log).await {
            log.log("✓ System packages installed successfully");
        } else {
            tracing::error!(event = "installer.step_failed", step = "system_packages");
            log.log("✗ Failed to install some system packages");
            return Err(InstallError::StepFailed("system packages"));
        }
    }
    sleep(plan.step_pause).await;

    log.log("");
    log.log("Step 3/3: Fetching Rust crate dependencies...");
    match plan.manifest.as_ref().filter(|path| path.exists()) {
        Some(manifest) => {
            log.log(&format!("Fetching crates for {}...", manifest.display()));
            let manifest = manifest.display().to_string();
            let mut fetched = false;
            for (spec, success_line, retry_line) in crate_fetch_attempts(&manifest) {
                if let Some(line) = retry_line {
                    log.log(line);
                }
                if run_logged(runner, &spec, password, log).await {
                    log.log(success_line);
                    fetched = true;
                    break;
                }
            }
            if !fetched {
                tracing::error!(event = "installer.step_failed", step = "crates");
                log.log("✗ Failed to fetch Rust crates");
                return Err(InstallError::StepFailed("rust crates"));
            }
        }
        None => log.log("⚠ Cargo.toml not found, skipping crate fetch"),
    }
    sleep(plan.step_pause).await;

    log.log("");
    log.log("=== Installation Complete ===");
    log.log("All dependencies have been installed successfully!");
    log.log("You can now run: arc-timers");
    tracing::info!(event = "installer.completed", manager = manager.name());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::installer::distro::{detect_from_os_release, PackageManager};
    use std::collections::VecDeque;
    use std::future::Future;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ScriptedRunner {
        results: Mutex<VecDeque<Result<CommandOutcome, InstallError>>>,
        seen: Mutex<Vec<(Vec<String>, Option<String>)>>,
    }

    impl ScriptedRunner {
        fn with(results: Vec<Result<CommandOutcome, InstallError>>) -> Self {
            Self {
                results: Mutex::new(results.into()),
                seen: Mutex::default(),
            }
        }

        fn commands(&self) -> Vec<String> {
            self.seen
                .lock()
                .expect("seen lock")
                .iter()
                .map(|(argv, _)| argv.join(" "))
                .collect()
        }
    }

    impl CommandRunner for ScriptedRunner {
        fn run<'a>(
            &'a self,
            spec: &'a CommandSpec,
            password: Option<&'a str>,
        ) -> impl Future<Output = Result<CommandOutcome, InstallError>> + Send + 'a {
            async move {
                self.seen
                    .lock()
                    .expect("seen lock")
                    .push((spec.argv(), password.map(str::to_string)));
                self.results
                    .lock()
                    .expect("results lock")
                    .pop_front()
                    .unwrap_or_else(|| Ok(ok("")))
            }
        }
    }

    #[derive(Default)]
    struct MemoryLog(Mutex<Vec<String>>);

    impl LogSink for MemoryLog {
        fn log(&self, line: &str) {
            self.0.lock().expect("log lock").push(line.to_string());
        }
    }

    impl MemoryLog {
        fn lines(&self) -> Vec<String> {
            self.0.lock().expect("log lock").clone()
        }
    }

    fn ok(stdout: &str) -> CommandOutcome {
        CommandOutcome {
            success: true,
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    fn failed(stderr: &str) -> CommandOutcome {
        CommandOutcome {
            success: false,
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    fn plan(manifest: Option<PathBuf>) -> InstallPlan {
        InstallPlan {
            distro: detect_from_os_release("ID=arch"),
            packages: vec!["webkit2gtk-4.1".to_string(), "curl".to_string()],
            manifest,
            step_pause: Duration::ZERO,
        }
    }

    fn manifest_dir() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("Cargo.toml");
        std::fs::write(&path, "[package]\nname = \"x\"\n").expect("write manifest");
        (dir, path)
    }

    #[tokio::test]
    async fn refuses_without_password_or_manager() {
        let runner = ScriptedRunner::default();
        let log = MemoryLog::default();
        let err = run_installation(&runner, &plan(None), "", &log)
            .await
            .expect_err("missing password");
        assert!(matches!(err, InstallError::MissingPassword));

        let mut unknown = plan(None);
        unknown.distro = detect_from_os_release("ID=gentoo");
        let err = run_installation(&runner, &unknown, "hunter2", &log)
            .await
            .expect_err("unknown distro");
        assert!(matches!(err, InstallError::UnsupportedDistro));
        assert!(runner.commands().is_empty());
    }

    #[tokio::test]
    async fn full_run_uses_sudo_with_password() {
        let (_dir, manifest) = manifest_dir();
        let runner = ScriptedRunner::with(vec![
            Ok(ok(":: Synchronizing package databases...\n[sudo] password for raider:")),
            Ok(ok("")),
            Ok(ok("")),
        ]);
        let log = MemoryLog::default();
        run_installation(&runner, &plan(Some(manifest.clone())), "hunter2", &log)
            .await
            .expect("installation succeeds");

        let commands = runner.commands();
        assert_eq!(commands[0], "sudo -S pacman -Sy");
        assert_eq!(
            commands[1],
            "sudo -S pacman -S --noconfirm webkit2gtk-4.1 curl"
        );
        assert_eq!(
            commands[2],
            format!("cargo fetch --manifest-path {} --locked", manifest.display())
        );

        let seen = runner.seen.lock().expect("seen lock").clone();
        assert_eq!(seen[0].1.as_deref(), Some("hunter2"));
        assert_eq!(seen[2].1, None);

        let lines = log.lines();
        assert!(lines.contains(&"  :: Synchronizing package databases...".to_string()));
        assert!(!lines.iter().any(|l| l.contains("[sudo]")));
        assert!(lines.contains(&"Installing: webkit2gtk-4.1, curl".to_string()));
        assert_eq!(lines.last().map(String::as_str), Some("You can now run: arc-timers"));
    }

    #[tokio::test]
    async fn update_failure_is_tolerated() {
        let runner = ScriptedRunner::with(vec![Ok(failed(
            "[sudo] password for raider:\nerror: failed to synchronize",
        ))]);
        let log = MemoryLog::default();
        run_installation(&runner, &plan(None), "hunter2", &log)
            .await
            .expect("installation continues");

        let lines = log.lines();
        assert!(lines.contains(&"Error: error: failed to synchronize".to_string()));
        assert!(lines
            .contains(&"⚠ Package manager update had issues (continuing anyway)".to_string()));
        assert!(lines.contains(&"⚠ Cargo.toml not found, skipping crate fetch".to_string()));
    }

    #[tokio::test]
    async fn package_failure_aborts_remaining_steps() {
        let (_dir, manifest) = manifest_dir();
        let runner = ScriptedRunner::with(vec![
            Ok(ok("")),
            Ok(failed("Sorry, try again.\nsudo: 1 incorrect password attempt")),
        ]);
        let log = MemoryLog::default();
        let err = run_installation(&runner, &plan(Some(manifest)), "wrong", &log)
            .await
            .expect_err("install fails");
        assert!(matches!(err, InstallError::StepFailed("system packages")));
        assert_eq!(runner.commands().len(), 2);

        let lines = log.lines();
        assert!(lines.contains(&"Error: Sorry, try again.".to_string()));
        assert!(lines.contains(&"✗ Failed to install some system packages".to_string()));
        assert!(!lines.iter().any(|l| l.starts_with("Step 3/3")));
    }

    #[tokio::test]
    async fn crate_fetch_falls_back_through_attempts() {
        let (_dir, manifest) = manifest_dir();
        let runner = ScriptedRunner::with(vec![
            Ok(ok("")),
            Ok(ok("")),
            Ok(failed("error: the lock file needs to be updated")),
            Err(InstallError::Timeout),
            Ok(ok("")),
        ]);
        let log = MemoryLog::default();
        run_installation(&runner, &plan(Some(manifest)), "hunter2", &log)
            .await
            .expect("offline fetch succeeds");

        let commands = runner.commands();
        assert_eq!(commands.len(), 5);
        assert!(commands[4].ends_with("--offline"));

        let lines = log.lines();
        assert!(lines.contains(&"Retrying without --locked...".to_string()));
        assert!(lines.contains(&"Error: Command timed out".to_string()));
        assert!(lines.contains(&"✓ Rust crates resolved from the local cache".to_string()));
    }

    #[tokio::test]
    async fn exhausted_crate_fetch_fails() {
        let (_dir, manifest) = manifest_dir();
        let runner = ScriptedRunner::with(vec![
            Ok(ok("")),
            Ok(ok("")),
            Ok(failed("network down")),
            Ok(failed("network down")),
            Ok(failed("no cache")),
        ]);
        let log = MemoryLog::default();
        let err = run_installation(&runner, &plan(Some(manifest)), "hunter2", &log)
            .await
            .expect_err("crate fetch fails");
        assert!(matches!(err, InstallError::StepFailed("rust crates")));
        assert!(log.lines().contains(&"✗ Failed to fetch Rust crates".to_string()));
    }

    #[test]
    fn unprivileged_output_is_capped() {
        let spec = CommandSpec::plain(["cargo", "fetch"]);
        let outcome = ok("1\n2\n3\n4\n5\n6\n7");
        assert_eq!(output_lines(&spec, &outcome), vec!["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn intro_mentions_distribution() {
        let info = detect_from_os_release("ID=fedora");
        assert_eq!(info.package_manager, Some(PackageManager::Dnf));
        let lines = intro_lines(&info);
        assert_eq!(lines[1], "✓ Detected: Fedora/RHEL");
    }
}
