use std::future::Future;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

use super::InstallError;

pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(300);

/// One command line, optionally run through `sudo`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    args: Vec<String>,
    privileged: bool,
}

impl CommandSpec {
    pub fn plain<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            privileged: false,
        }
    }

    pub fn sudo<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            privileged: true,
        }
    }

    pub fn with_args<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(extra.into_iter().map(Into::into));
        self
    }

    pub fn is_privileged(&self) -> bool {
        self.privileged
    }

    /// Full argv. Privileged commands become `sudo -S ...` so the password
    /// can be fed on stdin.
    pub fn argv(&self) -> Vec<String> {
        if !self.privileged {
            return self.args.clone();
        }
        let mut argv = Vec::with_capacity(self.args.len() + 2);
        argv.push("sudo".to_string());
        argv.push("-S".to_string());
        argv.extend(self.args.iter().cloned());
        argv
    }

    pub fn display(&self) -> String {
        self.argv().join(" ")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutcome {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

pub trait CommandRunner: Send + Sync {
    fn run<'a>(
        &'a self,
        spec: &'a CommandSpec,
        password: Option<&'a str>,
    ) -> impl Future<Output = Result<CommandOutcome, InstallError>> + Send + 'a;
}

/// Spawns real processes with a hard timeout.
pub struct SystemRunner {
    timeout: Duration,
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self {
            timeout: COMMAND_TIMEOUT,
        }
    }
}

impl CommandRunner for SystemRunner {
    fn run<'a>(
        &'a self,
        spec: &'a CommandSpec,
        password: Option<&'a str>,
    ) -> impl Future<Output = Result<CommandOutcome, InstallError>> + Send + 'a {
        async move {
            let argv = spec.argv();
            let (program, args) = argv
                .split_first()
                .ok_or_else(|| InstallError::Spawn {
                    program: String::new(),
                    source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
                })?;
            let feed_password = spec.is_privileged() && password.is_some();

            tracing::info!(event = "installer.command_started", command = %spec.display());
            let mut child = Command::new(program)
                .args(args)
                .stdin(if feed_password {
                    Stdio::piped()
                } else {
                    Stdio::null()
                })
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn()
                .map_err(|source| InstallError::Spawn {
                    program: program.clone(),
                    source,
                })?;

            if let (true, Some(secret)) = (feed_password, password) {
                if let Some(mut stdin) = child.stdin.take() {
                    // sudo may exit before reading when credentials are cached
                    if let Err(err) = stdin.write_all(format!("{secret}\n").as_bytes()).await {
                        tracing::debug!(event = "installer.stdin_write_failed", error = %err);
                    }
                }
            }

            let output = timeout(self.timeout, child.wait_with_output())
                .await
                .map_err(|_| InstallError::Timeout)??;

            tracing::info!(
                event = "installer.command_finished",
                command = %spec.display(),
                status = ?output.status.code()
            );
            Ok(CommandOutcome {
                success: output.status.success(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }
    }
}
