#![allow(clippy::result_large_err)]

use super::scan_int;
use crate::core::adapters::github::MAX_RUNS_PER_PAGE;
use crate::core::adapters::trivy::{ScanKind, ScanSummary};
use crate::core::adapters::{to_data, Adapters};
use crate::core::error::AppError;
use crate::core::probe::ToolAvailabilityProbe;
use crate::core::registry::CommandRegistry;
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

/// Everything a handler may touch while running one command.
pub struct Invocation<'a> {
    pub adapters: &'a Adapters,
    pub probe: &'a ToolAvailabilityProbe,
    pub registry: &'a CommandRegistry,
    pub args: &'a [String],
    pub cancel: &'a CancellationToken,
    /// Page size for `github-runs` when no limit argument is given.
    pub runs_limit: u32,
}

impl Invocation<'_> {
    fn arg(&self, index: usize) -> &str {
        self.args.get(index).map(String::as_str).unwrap_or_default()
    }
}

/// What a handler reports back to the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Completed {
        output: String,
        data: Option<Value>,
    },
    /// The adapter answered, but the operation itself did not succeed.
    Failed { error: String, data: Option<Value> },
}

impl Outcome {
    pub fn completed(output: impl Into<String>, data: Value) -> Self {
        Outcome::Completed {
            output: output.into(),
            data: Some(data),
        }
    }

    pub fn output_only(output: impl Into<String>) -> Self {
        Outcome::Completed {
            output: output.into(),
            data: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Outcome::Failed {
            error: error.into(),
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Completed { .. })
    }
}

/// Runs one registered command. Argument count and adapter presence are
/// checked by the dispatcher before `handle` is called.
#[async_trait]
pub trait CommandHandler: Send + Sync + 'static {
    async fn handle(&self, invocation: Invocation<'_>) -> Result<Outcome, AppError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SonarCommand {
    Scan,
    Metrics,
    Gate,
    Issues,
}

#[async_trait]
impl CommandHandler for SonarCommand {
    async fn handle(&self, inv: Invocation<'_>) -> Result<Outcome, AppError> {
        let sonar = inv.adapters.sonarqube()?;
        match self {
            SonarCommand::Scan => {
                let result = sonar.trigger_scan(inv.arg(0), inv.cancel).await?;
                let data = to_data(&result)?;
                Ok(if result.success {
                    Outcome::completed(result.message, data)
                } else {
                    Outcome::Failed {
                        error: result.message,
                        data: Some(data),
                    }
                })
            }
            SonarCommand::Metrics => {
                let measures = sonar.project_measures(inv.cancel).await?;
                Ok(Outcome::completed(
                    "Successfully retrieved project metrics",
                    to_data(&measures)?,
                ))
            }
            SonarCommand::Gate => {
                let gate = sonar.quality_gate_status(inv.cancel).await?;
                Ok(Outcome::completed(
                    format!("Quality gate status: {}", gate.project_status.status),
                    to_data(&gate)?,
                ))
            }
            SonarCommand::Issues => {
                let issues = sonar.project_issues(inv.cancel).await?;
                Ok(Outcome::completed(
                    format!("Found {} issues", issues.total),
                    to_data(&issues)?,
                ))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrivyScan(pub ScanKind);

#[async_trait]
impl CommandHandler for TrivyScan {
    async fn handle(&self, inv: Invocation<'_>) -> Result<Outcome, AppError> {
        let summary = inv
            .adapters
            .trivy()?
            .scan(self.0, inv.arg(0), inv.cancel)
            .await?;
        scan_outcome(summary)
    }
}

fn scan_outcome(summary: ScanSummary) -> Result<Outcome, AppError> {
    let data = to_data(&summary)?;
    Ok(if summary.success {
        Outcome::completed(summary.headline(), data)
    } else {
        Outcome::Failed {
            error: summary.message,
            data: Some(data),
        }
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JenkinsCommand {
    Jobs,
    Trigger,
    Status,
    Logs,
    Queue,
    Stop,
}

#[async_trait]
impl CommandHandler for JenkinsCommand {
    async fn handle(&self, inv: Invocation<'_>) -> Result<Outcome, AppError> {
        let jenkins = inv.adapters.jenkins()?;
        match self {
            JenkinsCommand::Jobs => {
                let jobs = jenkins.jobs(inv.cancel).await?;
                Ok(Outcome::completed(
                    format!("Found {} Jenkins jobs", jobs.len()),
                    to_data(&jobs)?,
                ))
            }
            JenkinsCommand::Trigger => {
                let parameters = key_value_pairs(&inv.args[1..])?;
                let result = jenkins
                    .trigger_job(inv.arg(0), &parameters, inv.cancel)
                    .await?;
                let data = to_data(&result)?;
                Ok(if result.success {
                    Outcome::completed(result.message, data)
                } else {
                    Outcome::Failed {
                        error: result.message,
                        data: Some(data),
                    }
                })
            }
            JenkinsCommand::Status => {
                let build = build_number(inv.arg(1))?;
                let details = jenkins.build_status(inv.arg(0), build, inv.cancel).await?;
                Ok(Outcome::completed(
                    format!(
                        "Build {} status: {}",
                        details.number,
                        details.result_label()
                    ),
                    to_data(&details)?,
                ))
            }
            JenkinsCommand::Logs => {
                let build = build_number(inv.arg(1))?;
                let log = jenkins.build_log(inv.arg(0), build, inv.cancel).await?;
                Ok(Outcome::output_only(log))
            }
            JenkinsCommand::Queue => {
                let items = jenkins.queue(inv.cancel).await?;
                Ok(Outcome::completed(
                    format!("Found {} queued builds", items.len()),
                    to_data(&items)?,
                ))
            }
            JenkinsCommand::Stop => {
                let build = build_number(inv.arg(1))?;
                jenkins.stop_build(inv.arg(0), build, inv.cancel).await?;
                Ok(Outcome::output_only(format!("Build {} stopped", build)))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitHubCommand {
    Workflows,
    Runs,
    Trigger,
    Summary,
    Jobs,
}

#[async_trait]
impl CommandHandler for GitHubCommand {
    async fn handle(&self, inv: Invocation<'_>) -> Result<Outcome, AppError> {
        let github = inv.adapters.github()?;
        let (owner, repo) = (inv.arg(0), inv.arg(1));
        match self {
            GitHubCommand::Workflows => {
                let workflows = github.workflows(owner, repo, inv.cancel).await?;
                Ok(Outcome::completed(
                    format!("Found {} workflows", workflows.len()),
                    to_data(&workflows)?,
                ))
            }
            GitHubCommand::Runs => {
                let limit = match inv.args.get(2) {
                    Some(raw) => runs_limit(raw)?,
                    None => inv.runs_limit,
                };
                let runs = github.workflow_runs(owner, repo, limit, inv.cancel).await?;
                Ok(Outcome::completed(
                    format!("Found {} workflow runs", runs.len()),
                    to_data(&runs)?,
                ))
            }
            GitHubCommand::Trigger => {
                let workflow_id = scan_int(inv.arg(2))
                    .ok_or_else(|| invalid_argument("Invalid workflow ID"))?;
                let inputs = workflow_inputs(&inv.args[4..])?;
                github
                    .trigger_workflow(
                        owner,
                        repo,
                        workflow_id,
                        inv.arg(3),
                        inputs.as_ref(),
                        inv.cancel,
                    )
                    .await?;
                Ok(Outcome::output_only("Workflow triggered successfully"))
            }
            GitHubCommand::Summary => {
                let summary = github.workflow_summary(owner, repo, inv.cancel).await?;
                Ok(Outcome::completed(summary.headline(), to_data(&summary)?))
            }
            GitHubCommand::Jobs => {
                let run_id =
                    scan_int(inv.arg(2)).ok_or_else(|| invalid_argument("Invalid run ID"))?;
                let jobs = github.workflow_jobs(owner, repo, run_id, inv.cancel).await?;
                Ok(Outcome::completed(
                    format!("Found {} jobs", jobs.len()),
                    to_data(&jobs)?,
                ))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtilityCommand {
    ToolStatus,
    Help,
}

#[async_trait]
impl CommandHandler for UtilityCommand {
    async fn handle(&self, inv: Invocation<'_>) -> Result<Outcome, AppError> {
        match self {
            UtilityCommand::ToolStatus => {
                let statuses = inv.probe.check_availability_with_cancel(inv.cancel).await;
                if inv.cancel.is_cancelled() {
                    return Err(AppError::cancelled());
                }
                let available = statuses.iter().filter(|s| s.available).count();
                Ok(Outcome::completed(
                    format!("{}/{} tools available", available, statuses.len()),
                    to_data(&statuses)?,
                ))
            }
            UtilityCommand::Help => {
                let commands = inv.registry.list_commands();
                Ok(Outcome::completed(
                    format!("Available commands: {}", commands.len()),
                    to_data(&commands)?,
                ))
            }
        }
    }
}

fn invalid_argument(message: &str) -> AppError {
    AppError::new(ErrorCategory::InvalidArgumentFormat, message)
}

fn build_number(raw: &str) -> Result<u64, AppError> {
    scan_int(raw)
        .and_then(|n| u64::try_from(n).ok())
        .ok_or_else(|| invalid_argument("Invalid build number"))
}

fn runs_limit(raw: &str) -> Result<u32, AppError> {
    scan_int(raw)
        .filter(|n| (1..=i64::from(MAX_RUNS_PER_PAGE)).contains(n))
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| invalid_argument("Invalid limit"))
}

/// Split `KEY=VALUE` arguments. Keys must be non-empty; values may be.
fn key_value_pairs(args: &[String]) -> Result<Vec<(String, String)>, AppError> {
    args.iter()
        .map(|arg| match arg.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
            _ => Err(invalid_argument(&format!("Invalid parameter: {}", arg))),
        })
        .collect()
}

fn workflow_inputs(args: &[String]) -> Result<Option<Value>, AppError> {
    if args.is_empty() {
        return Ok(None);
    }
    let inputs: Map<String, Value> = key_value_pairs(args)?
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect();
    Ok(Some(Value::Object(inputs)))
}
