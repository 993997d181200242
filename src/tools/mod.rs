#![allow(clippy::result_large_err)] // Runner trait returns AppError so adapters can surface diagnostics verbatim.

pub mod execution;

use crate::core::error::AppError;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub use execution::{guarded, TokioProcessRunner};

/// A single external binary invocation.
#[derive(Clone, Debug)]
pub struct ProcessRequest {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Option<Duration>,
}

impl ProcessRequest {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ProcessRequest {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Human-readable command line.
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ProcessOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: i32,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// Stdout followed by stderr, the way a terminal would interleave them.
    pub fn combined(&self) -> String {
        let mut combined = self.stdout_lossy();
        let stderr = self.stderr_lossy();
        if !stderr.is_empty() {
            if !combined.is_empty() && !combined.ends_with('\n') {
                combined.push('\n');
            }
            combined.push_str(&stderr);
        }
        combined
    }
}

/// Seam over subprocess execution so adapters and the probe can be tested without real binaries.
#[async_trait]
pub trait ProcessRunner: Send + Sync + 'static {
    /// Resolve a program name on the search path.
    fn resolve(&self, program: &str) -> Option<PathBuf>;

    /// Run the request to completion, honouring its timeout and the cancellation token.
    async fn run(
        &self,
        request: &ProcessRequest,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, AppError>;
}
