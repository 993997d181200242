use super::encode_segment;
use super::rest::{Auth, RestClient};
use crate::core::config::GitHubConfig;
use crate::core::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Number of recent runs inspected by the workflow summary.
pub const SUMMARY_RUN_LIMIT: u32 = 50;

/// Largest page GitHub serves for run listings.
pub const MAX_RUNS_PER_PAGE: u32 = 100;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Workflow {
    pub id: i64,
    pub name: String,
    pub path: String,
    pub state: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub url: String,
    pub html_url: String,
    pub badge_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Actor {
    pub login: String,
    pub id: i64,
    pub avatar_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunRepository {
    pub id: i64,
    pub name: String,
    pub full_name: String,
    pub private: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowRun {
    pub id: i64,
    pub name: Option<String>,
    pub display_title: Option<String>,
    pub status: Option<String>,
    pub conclusion: Option<String>,
    pub workflow_id: i64,
    pub url: String,
    pub html_url: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub run_started_at: Option<DateTime<Utc>>,
    pub event: String,
    pub head_branch: Option<String>,
    pub head_sha: String,
    pub actor: Option<Actor>,
    pub repository: Option<RunRepository>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobStep {
    pub name: String,
    pub status: String,
    pub conclusion: Option<String>,
    pub number: i64,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowJob {
    pub id: i64,
    pub run_id: i64,
    pub name: String,
    pub status: String,
    pub conclusion: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub url: String,
    pub html_url: Option<String>,
    pub steps: Vec<JobStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSummary {
    pub repository: String,
    pub total_runs: usize,
    pub successful_runs: usize,
    pub failed_runs: usize,
    pub in_progress_runs: usize,
    pub workflows: Vec<Workflow>,
    pub recent_runs: Vec<WorkflowRun>,
    pub timestamp: DateTime<Utc>,
}

impl WorkflowSummary {
    pub fn from_runs(
        repository: String,
        workflows: Vec<Workflow>,
        runs: Vec<WorkflowRun>,
    ) -> Self {
        let mut summary = WorkflowSummary {
            repository,
            total_runs: runs.len(),
            successful_runs: 0,
            failed_runs: 0,
            in_progress_runs: 0,
            workflows,
            recent_runs: Vec::new(),
            timestamp: Utc::now(),
        };
        for run in &runs {
            match classify_run(run.conclusion.as_deref(), run.status.as_deref()) {
                Some(RunBucket::Successful) => summary.successful_runs += 1,
                Some(RunBucket::Failed) => summary.failed_runs += 1,
                Some(RunBucket::InProgress) => summary.in_progress_runs += 1,
                None => {}
            }
        }
        summary.recent_runs = runs;
        summary
    }

    pub fn headline(&self) -> String {
        format!(
            "{} runs: {} successful, {} failed, {} in progress",
            self.total_runs, self.successful_runs, self.failed_runs, self.in_progress_runs
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunBucket {
    Successful,
    Failed,
    InProgress,
}

/// Bucket a run by conclusion, falling back to status for unfinished runs.
pub fn classify_run(conclusion: Option<&str>, status: Option<&str>) -> Option<RunBucket> {
    match conclusion.unwrap_or("") {
        "success" => Some(RunBucket::Successful),
        "failure" | "cancelled" | "timed_out" => Some(RunBucket::Failed),
        "" => match status {
            Some("in_progress") | Some("queued") => Some(RunBucket::InProgress),
            _ => None,
        },
        _ => None,
    }
}

#[derive(Deserialize)]
struct WorkflowsResponse {
    #[serde(default)]
    workflows: Vec<Workflow>,
}

#[derive(Deserialize)]
struct RunsResponse {
    #[serde(default)]
    workflow_runs: Vec<WorkflowRun>,
}

#[derive(Deserialize)]
struct JobsResponse {
    #[serde(default)]
    jobs: Vec<WorkflowJob>,
}

#[async_trait]
pub trait GitHubApi: Send + Sync {
    async fn workflows(
        &self,
        owner: &str,
        repo: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Workflow>, AppError>;

    async fn workflow_runs(
        &self,
        owner: &str,
        repo: &str,
        limit: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<WorkflowRun>, AppError>;

    /// Fire a `workflow_dispatch` event on `git_ref`.
    async fn trigger_workflow(
        &self,
        owner: &str,
        repo: &str,
        workflow_id: i64,
        git_ref: &str,
        inputs: Option<&Value>,
        cancel: &CancellationToken,
    ) -> Result<(), AppError>;

    async fn workflow_jobs(
        &self,
        owner: &str,
        repo: &str,
        run_id: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<WorkflowJob>, AppError>;

    async fn workflow_summary(
        &self,
        owner: &str,
        repo: &str,
        cancel: &CancellationToken,
    ) -> Result<WorkflowSummary, AppError> {
        let workflows = self.workflows(owner, repo, cancel).await?;
        let runs = self
            .workflow_runs(owner, repo, SUMMARY_RUN_LIMIT, cancel)
            .await?;
        Ok(WorkflowSummary::from_runs(
            format!("{}/{}", owner, repo),
            workflows,
            runs,
        ))
    }
}

pub struct GitHubClient {
    rest: RestClient,
}

impl GitHubClient {
    pub fn new(config: &GitHubConfig) -> Result<Self, AppError> {
        let rest = RestClient::builder(config.api_url.clone())
            .auth(Auth::Bearer(config.token.clone()))
            .header("accept", "application/vnd.github.v3+json")
            .timeout(config.timeout())
            .build()?;
        Ok(GitHubClient { rest })
    }

    fn repo_path(owner: &str, repo: &str) -> String {
        format!(
            "/repos/{}/{}/actions",
            encode_segment(owner),
            encode_segment(repo)
        )
    }
}

#[async_trait]
impl GitHubApi for GitHubClient {
    async fn workflows(
        &self,
        owner: &str,
        repo: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Workflow>, AppError> {
        let path = format!("{}/workflows", Self::repo_path(owner, repo));
        let response: WorkflowsResponse = self
            .rest
            .get_json(&path, "GitHub API request", cancel)
            .await?;
        Ok(response.workflows)
    }

    async fn workflow_runs(
        &self,
        owner: &str,
        repo: &str,
        limit: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<WorkflowRun>, AppError> {
        let path = format!("{}/runs?per_page={}", Self::repo_path(owner, repo), limit);
        let response: RunsResponse = self
            .rest
            .get_json(&path, "GitHub API request", cancel)
            .await
            .inspect_err(|err| tracing::error!(error = %err, "failed to fetch workflow runs"))?;
        tracing::info!(
            repo = %format!("{}/{}", owner, repo),
            count = response.workflow_runs.len(),
            "fetched workflow runs"
        );
        Ok(response.workflow_runs)
    }

    async fn trigger_workflow(
        &self,
        owner: &str,
        repo: &str,
        workflow_id: i64,
        git_ref: &str,
        inputs: Option<&Value>,
        cancel: &CancellationToken,
    ) -> Result<(), AppError> {
        let path = format!(
            "{}/workflows/{}/dispatches",
            Self::repo_path(owner, repo),
            workflow_id
        );
        let mut payload = serde_json::json!({ "ref": git_ref });
        if let Some(inputs) = inputs {
            payload["inputs"] = inputs.clone();
        }

        self.rest
            .send(
                self.rest.request(Method::POST, &path).json(&payload),
                "Workflow trigger",
                &[StatusCode::NO_CONTENT],
                cancel,
            )
            .await?;

        tracing::info!(
            repo = %format!("{}/{}", owner, repo),
            workflow_id,
            "triggered workflow"
        );
        Ok(())
    }

    async fn workflow_jobs(
        &self,
        owner: &str,
        repo: &str,
        run_id: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<WorkflowJob>, AppError> {
        let path = format!("{}/runs/{}/jobs", Self::repo_path(owner, repo), run_id);
        let response: JobsResponse = self
            .rest
            .get_json(&path, "GitHub API request", cancel)
            .await?;
        Ok(response.jobs)
    }
}
