use super::encode_segment;
use super::rest::{Auth, RestClient};
use crate::core::config::JenkinsConfig;
use crate::core::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::LOCATION;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const JOBS_TREE: &str = "jobs[name,url,color,buildable,lastBuild[number,url,result,building,duration,timestamp,fullDisplayName],nextBuildNumber,inQueue,description]";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    #[serde(default)]
    pub number: u64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub building: bool,
    #[serde(default)]
    pub duration: i64,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub full_display_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JenkinsJob {
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub buildable: bool,
    #[serde(default)]
    pub last_build: Option<BuildInfo>,
    #[serde(default)]
    pub next_build_number: u64,
    #[serde(default)]
    pub in_queue: bool,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeAuthor {
    #[serde(default)]
    pub full_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeItem {
    #[serde(default)]
    pub author: ChangeAuthor,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub date: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    #[serde(default)]
    pub items: Vec<ChangeItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildDetails {
    #[serde(default)]
    pub number: u64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub building: bool,
    #[serde(default)]
    pub duration: i64,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub actions: Vec<Value>,
    #[serde(default)]
    pub change_set: ChangeSet,
}

impl BuildDetails {
    /// Jenkins reports no result while a build is running.
    pub fn result_label(&self) -> &str {
        match self.result.as_deref() {
            Some(result) if !result.is_empty() => result,
            _ if self.building => "BUILDING",
            _ => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueTask {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub id: u64,
    #[serde(default)]
    pub task: QueueTask,
    #[serde(default)]
    pub why: Option<String>,
    #[serde(default)]
    pub blocked: bool,
    #[serde(default)]
    pub buildable: bool,
    #[serde(default)]
    pub in_queue_since: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobTriggerResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_id: Option<u64>,
    pub job_name: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Deserialize)]
struct JobsResponse {
    #[serde(default)]
    jobs: Vec<JenkinsJob>,
}

#[derive(Deserialize)]
struct QueueResponse {
    #[serde(default)]
    items: Vec<QueueItem>,
}

#[async_trait]
pub trait JenkinsApi: Send + Sync {
    async fn jobs(&self, cancel: &CancellationToken) -> Result<Vec<JenkinsJob>, AppError>;

    /// Queue a build. Parameters switch the call to `buildWithParameters`.
    async fn trigger_job(
        &self,
        job: &str,
        parameters: &[(String, String)],
        cancel: &CancellationToken,
    ) -> Result<JobTriggerResult, AppError>;

    async fn build_status(
        &self,
        job: &str,
        build: u64,
        cancel: &CancellationToken,
    ) -> Result<BuildDetails, AppError>;

    async fn build_log(
        &self,
        job: &str,
        build: u64,
        cancel: &CancellationToken,
    ) -> Result<String, AppError>;

    async fn queue(&self, cancel: &CancellationToken) -> Result<Vec<QueueItem>, AppError>;

    async fn stop_build(
        &self,
        job: &str,
        build: u64,
        cancel: &CancellationToken,
    ) -> Result<(), AppError>;
}

pub struct JenkinsClient {
    rest: RestClient,
    log_timeout: Duration,
}

impl JenkinsClient {
    pub fn new(config: &JenkinsConfig) -> Result<Self, AppError> {
        // Stop answers with a redirect; keep it visible instead of following it.
        let rest = RestClient::builder(config.url.clone())
            .auth(Auth::Basic {
                username: config.username.clone(),
                password: Some(config.token.clone()),
            })
            .timeout(config.timeout())
            .follow_redirects(false)
            .build()?;

        Ok(JenkinsClient {
            rest,
            log_timeout: config.log_timeout(),
        })
    }
}

/// `folder/job` becomes `/job/folder/job/job`.
pub fn job_path(job: &str) -> String {
    job.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| format!("/job/{}", encode_segment(segment)))
        .collect()
}

/// Extract the queue item id from a `.../queue/item/{id}/` location.
pub fn parse_queue_id(location: &str) -> Option<u64> {
    let mut segments = location.trim_end_matches('/').rsplit('/');
    let id = segments.next()?.parse().ok()?;
    (segments.next()? == "item").then_some(id)
}

#[async_trait]
impl JenkinsApi for JenkinsClient {
    async fn jobs(&self, cancel: &CancellationToken) -> Result<Vec<JenkinsJob>, AppError> {
        let path = format!("/api/json?tree={}", JOBS_TREE);
        let response: JobsResponse = self
            .rest
            .get_json(&path, "Jenkins API request", cancel)
            .await
            .inspect_err(|err| tracing::error!(error = %err, "failed to fetch Jenkins jobs"))?;
        tracing::info!(count = response.jobs.len(), "fetched Jenkins jobs");
        Ok(response.jobs)
    }

    async fn trigger_job(
        &self,
        job: &str,
        parameters: &[(String, String)],
        cancel: &CancellationToken,
    ) -> Result<JobTriggerResult, AppError> {
        tracing::info!(job, parameters = parameters.len(), "triggering Jenkins job");

        let request = if parameters.is_empty() {
            self.rest
                .request(Method::POST, &format!("{}/build", job_path(job)))
        } else {
            self.rest
                .request(Method::POST, &format!("{}/buildWithParameters", job_path(job)))
                .query(parameters)
        };

        let response = self
            .rest
            .send(
                request,
                "Job trigger",
                &[StatusCode::OK, StatusCode::CREATED],
                cancel,
            )
            .await?;

        let queue_id = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_queue_id);

        tracing::info!(job, queue_id, "triggered Jenkins job");
        Ok(JobTriggerResult {
            success: true,
            message: "Job triggered successfully".to_string(),
            queue_id,
            job_name: job.to_string(),
            timestamp: Utc::now(),
        })
    }

    async fn build_status(
        &self,
        job: &str,
        build: u64,
        cancel: &CancellationToken,
    ) -> Result<BuildDetails, AppError> {
        let path = format!("{}/{}/api/json", job_path(job), build);
        self.rest
            .get_json(&path, "Build status request", cancel)
            .await
    }

    async fn build_log(
        &self,
        job: &str,
        build: u64,
        cancel: &CancellationToken,
    ) -> Result<String, AppError> {
        let path = format!("{}/{}/consoleText", job_path(job), build);
        self.rest
            .get_text(&path, "Build log request", self.log_timeout, cancel)
            .await
    }

    async fn queue(&self, cancel: &CancellationToken) -> Result<Vec<QueueItem>, AppError> {
        let response: QueueResponse = self
            .rest
            .get_json("/queue/api/json", "Queue request", cancel)
            .await?;
        Ok(response.items)
    }

    async fn stop_build(
        &self,
        job: &str,
        build: u64,
        cancel: &CancellationToken,
    ) -> Result<(), AppError> {
        let path = format!("{}/{}/stop", job_path(job), build);
        self.rest
            .send(
                self.rest.request(Method::POST, &path),
                "Stop build request",
                &[StatusCode::OK, StatusCode::FOUND],
                cancel,
            )
            .await?;
        tracing::info!(job, build, "stopped Jenkins build");
        Ok(())
    }
}
