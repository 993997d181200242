use crate::core::config::ProbeConfig;
use crate::core::entities::ToolStatus;
use crate::tools::{ProcessRequest, ProcessRunner, TokioProcessRunner};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// One binary to probe and the arguments that make it print its version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolCheck {
    pub name: &'static str,
    pub program: &'static str,
    pub args: &'static [&'static str],
}

impl ToolCheck {
    pub const fn version_flag(name: &'static str) -> Self {
        ToolCheck {
            name,
            program: name,
            args: &["--version"],
        }
    }
}

pub const DEFAULT_TOOLS: &[ToolCheck] = &[
    ToolCheck::version_flag("sonar-scanner"),
    ToolCheck::version_flag("trivy"),
    ToolCheck::version_flag("docker"),
    ToolCheck {
        name: "kubectl",
        program: "kubectl",
        args: &["version", "--client"],
    },
    ToolCheck::version_flag("terraform"),
    ToolCheck::version_flag("ansible"),
    ToolCheck::version_flag("git"),
    ToolCheck::version_flag("curl"),
    ToolCheck::version_flag("jq"),
];

/// Reports which external binaries can be run on this host.
#[derive(Clone)]
pub struct ToolAvailabilityProbe {
    runner: Arc<dyn ProcessRunner>,
    tools: Vec<ToolCheck>,
    timeout: Option<Duration>,
}

impl Default for ToolAvailabilityProbe {
    fn default() -> Self {
        ToolAvailabilityProbe::new(Arc::new(TokioProcessRunner))
    }
}

impl ToolAvailabilityProbe {
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        ToolAvailabilityProbe {
            runner,
            tools: DEFAULT_TOOLS.to_vec(),
            timeout: ProbeConfig::default().timeout(),
        }
    }

    pub fn from_config(config: &ProbeConfig) -> Self {
        ToolAvailabilityProbe::default().with_timeout(config.timeout())
    }

    pub fn with_tools(mut self, tools: Vec<ToolCheck>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn tools(&self) -> &[ToolCheck] {
        &self.tools
    }

    pub async fn check_availability(&self) -> Vec<ToolStatus> {
        self.check_availability_with_cancel(&CancellationToken::new())
            .await
    }

    /// Probe every tool in order. A tool is never skipped; failures become `available: false`.
    pub async fn check_availability_with_cancel(
        &self,
        cancel: &CancellationToken,
    ) -> Vec<ToolStatus> {
        let mut statuses = Vec::with_capacity(self.tools.len());
        for tool in &self.tools {
            statuses.push(self.check(tool, cancel).await);
        }
        let available = statuses.iter().filter(|s| s.available).count();
        tracing::info!(available, total = statuses.len(), "probed tool availability");
        statuses
    }

    async fn check(&self, tool: &ToolCheck, cancel: &CancellationToken) -> ToolStatus {
        let mut request = ProcessRequest::new(tool.program, tool.args.iter().copied());
        if let Some(timeout) = self.timeout {
            request = request.with_timeout(timeout);
        }

        let (version, error) = match self.runner.run(&request, cancel).await {
            Ok(output) if output.success() => {
                let stdout = output.stdout_lossy();
                let version = if stdout.trim().is_empty() {
                    output.stderr_lossy()
                } else {
                    stdout
                };
                (Some(version.trim().to_string()), None)
            }
            Ok(output) => {
                let stderr = output.stderr_lossy();
                let error = if stderr.trim().is_empty() {
                    format!("exit status {}", output.exit_code)
                } else {
                    format!("exit status {}: {}", output.exit_code, stderr.trim())
                };
                (None, Some(error))
            }
            Err(err) => (None, Some(err.message)),
        };

        tracing::debug!(tool = tool.name, available = error.is_none(), "probed tool");
        ToolStatus {
            name: tool.name.to_string(),
            available: error.is_none(),
            version,
            error,
            timestamp: Utc::now(),
        }
    }
}
