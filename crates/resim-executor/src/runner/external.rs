use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command as TokioCommand;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const TERMINATE_GRACE: Duration = Duration::from_secs(2);

/// Why an external job did not succeed. Returned inside the run outcome.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubprocessFailure {
    #[error("Failed to spawn '{executable}': {message}")]
    Spawn { executable: PathBuf, message: String },

    #[error("'{executable}' exited with code {code:?}.\n--- STDERR ---\n{stderr}")]
    NonZeroExit {
        executable: PathBuf,
        code: Option<i32>,
        stderr: String,
    },

    #[error("'{executable}' was terminated after cancellation.")]
    Cancelled { executable: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalOutcome {
    pub executable: PathBuf,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub failure: Option<SubprocessFailure>,
}

impl ExternalOutcome {
    pub fn success(&self) -> bool {
        self.failure.is_none()
    }

    pub fn was_cancelled(&self) -> bool {
        matches!(self.failure, Some(SubprocessFailure::Cancelled { .. }))
    }

    fn spawn_failed(executable: &Path, err: std::io::Error) -> Self {
        Self {
            executable: executable.to_path_buf(),
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            failure: Some(SubprocessFailure::Spawn {
                executable: executable.to_path_buf(),
                message: err.to_string(),
            }),
        }
    }
}

#[derive(Debug)]
pub struct ExternalRunner {
    job: String,
    executable: PathBuf,
    token: CancellationToken,
}

impl ExternalRunner {
    pub fn new(job: &str, executable: &Path) -> Self {
        Self {
            job: job.to_string(),
            executable: executable.to_path_buf(),
            token: CancellationToken::new(),
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn build_command(&self, args: &[String]) -> TokioCommand {
        let mut cmd = TokioCommand::new(&self.executable);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true);
        cmd
    }

    pub async fn run(&self, args: &[String], verbose: bool) -> ExternalOutcome {
        let mut cmd = self.build_command(args);
        resim_core::logging::log_command(cmd.as_std());
        tracing::info!(
            "Executing external job '{}': {}",
            self.job,
            self.executable.display()
        );

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!("Job '{}' could not be spawned: {}", self.job, e);
                return ExternalOutcome::spawn_failed(&self.executable, e);
            }
        };

        // The child leads its own process group, so its pid is the group id.
        let group = child.id().map(|pid| Pid::from_raw(pid as i32));
        let stdout_reader = capture(child.stdout.take());
        let stderr_reader = capture(child.stderr.take());

        let waited = tokio::select! {
            status = child.wait() => Some(status),
            _ = self.token.cancelled() => None,
        };

        let (status, cancelled) = match waited {
            Some(status) => (status, false),
            None => {
                tracing::info!("Cancelling external job '{}'", self.job);
                signal_group(group, Signal::SIGTERM);
                let status = match tokio::time::timeout(TERMINATE_GRACE, child.wait()).await {
                    Ok(status) => status,
                    Err(_) => {
                        let _ = child.kill().await;
                        child.wait().await
                    }
                };
                // Anything the job started may still hold the output pipes open.
                signal_group(group, Signal::SIGKILL);
                (status, true)
            }
        };

        let stdout = stdout_reader.await.unwrap_or_default();
        let stderr = stderr_reader.await.unwrap_or_default();
        if verbose && !stdout.is_empty() {
            tracing::info!("[{}] {}", self.job, stdout.trim_end());
        }

        let exit_code = status.as_ref().ok().and_then(|s| s.code());
        let failure = match status {
            _ if cancelled => Some(SubprocessFailure::Cancelled {
                executable: self.executable.clone(),
            }),
            Ok(s) if s.success() => None,
            Ok(s) => Some(SubprocessFailure::NonZeroExit {
                executable: self.executable.clone(),
                code: s.code(),
                stderr: stderr.clone(),
            }),
            Err(e) => Some(SubprocessFailure::Spawn {
                executable: self.executable.clone(),
                message: e.to_string(),
            }),
        };

        if let Some(f) = &failure {
            tracing::warn!("Job '{}': {}", self.job, f);
        }

        ExternalOutcome {
            executable: self.executable.clone(),
            exit_code,
            stdout,
            stderr,
            failure,
        }
    }
}

fn signal_group(group: Option<Pid>, signal: Signal) {
    if let Some(group) = group {
        if let Err(e) = killpg(group, signal) {
            tracing::trace!("Signal {} to process group {} not delivered: {}", signal, group, e);
        }
    }
}

fn capture<R>(stream: Option<R>) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut stream) = stream {
            let _ = stream.read_to_end(&mut buf).await;
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}
