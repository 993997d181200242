use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use crate::tools::{ProcessOutput, ProcessRequest, ProcessRunner};
use async_trait::async_trait;
use std::future::Future;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Await `fut` unless the token is cancelled or the optional deadline elapses first.
///
/// Dropping the inner future on cancellation is what releases the underlying resource:
/// child processes are spawned with `kill_on_drop` and in-flight HTTP requests are aborted.
pub async fn guarded<F, T>(
    cancel: &CancellationToken,
    timeout: Option<Duration>,
    fut: F,
) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    match timeout {
        Some(limit) => tokio::select! {
            _ = cancel.cancelled() => Err(AppError::cancelled()),
            result = tokio::time::timeout(limit, fut) => match result {
                Ok(inner) => inner,
                Err(_) => Err(AppError::new(
                    ErrorCategory::TimeoutError,
                    format!("timed out after {}s", limit.as_secs()),
                )
                .with_code("PROC-003")),
            },
        },
        None => tokio::select! {
            _ = cancel.cancelled() => Err(AppError::cancelled()),
            result = fut => result,
        },
    }
}

/// Default runner backed by `tokio::process`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    fn resolve(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }

    async fn run(
        &self,
        request: &ProcessRequest,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, AppError> {
        tracing::debug!(command = %request.display(), "spawning process");

        let mut command = Command::new(&request.program);
        command
            .args(&request.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command.spawn().map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                AppError::new(
                    ErrorCategory::ToolNotFound,
                    format!("{}: executable file not found in $PATH", request.program),
                )
                .with_code("PROC-001")
            } else {
                AppError::new(
                    ErrorCategory::ExternalCallFailure,
                    format!("failed to execute {}: {}", request.program, err),
                )
                .with_code("PROC-002")
            }
        })?;

        let output = guarded(cancel, request.timeout, async {
            child.wait_with_output().await.map_err(|err| {
                AppError::new(
                    ErrorCategory::ExternalCallFailure,
                    format!("failed to wait for {}: {}", request.program, err),
                )
                .with_code("PROC-002")
            })
        })
        .await?;

        Ok(ProcessOutput {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}
