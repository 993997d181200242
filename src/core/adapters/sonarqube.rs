use super::encode_segment;
use super::rest::{Auth, RestClient};
use crate::core::config::SonarQubeConfig;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use crate::tools::{ProcessRequest, ProcessRunner};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const NOT_FOUND_MESSAGE: &str = "sonar-scanner not found. Please install SonarQube Scanner CLI";

const MEASURE_KEYS: &str = "ncloc,bugs,vulnerabilities,code_smells,coverage,duplicated_lines_density";
const ISSUE_PAGE_SIZE: u32 = 500;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateCondition {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub metric_key: String,
    #[serde(default)]
    pub comparator: String,
    #[serde(default)]
    pub error_threshold: String,
    #[serde(default)]
    pub actual_value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub conditions: Vec<GateCondition>,
}

/// Response of `/api/qualitygates/project_status`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityGateStatus {
    #[serde(default)]
    pub project_status: ProjectStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    pub metric: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasuredComponent {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub measures: Vec<Measure>,
}

/// Response of `/api/measures/component`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectMeasures {
    #[serde(default)]
    pub component: MeasuredComponent,
}

impl ProjectMeasures {
    pub fn value(&self, metric: &str) -> Option<&str> {
        self.component
            .measures
            .iter()
            .find(|m| m.metric == metric)
            .map(|m| m.value.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub rule: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub component: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

/// Response of `/api/issues/search`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueSearch {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub issues: Vec<Issue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub status: String,
    pub message: String,
    /// Raw scanner output when the scan failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<QualityGateStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measures: Option<ProjectMeasures>,
    pub timestamp: DateTime<Utc>,
}

impl ScanResult {
    fn failed(message: impl Into<String>, output: Option<String>) -> Self {
        ScanResult {
            success: false,
            task_id: None,
            status: "FAILED".to_string(),
            message: message.into(),
            output,
            metrics: None,
            measures: None,
            timestamp: Utc::now(),
        }
    }
}

#[async_trait]
pub trait SonarQubeApi: Send + Sync {
    /// Run sonar-scanner over `project_path`, then fetch gate status and measures.
    async fn trigger_scan(
        &self,
        project_path: &str,
        cancel: &CancellationToken,
    ) -> Result<ScanResult, AppError>;

    async fn quality_gate_status(
        &self,
        cancel: &CancellationToken,
    ) -> Result<QualityGateStatus, AppError>;

    async fn project_measures(
        &self,
        cancel: &CancellationToken,
    ) -> Result<ProjectMeasures, AppError>;

    async fn project_issues(&self, cancel: &CancellationToken) -> Result<IssueSearch, AppError>;
}

pub struct SonarQubeClient {
    rest: RestClient,
    token: String,
    project_key: String,
    scanner_binary: String,
    scan_timeout: Option<Duration>,
    runner: Arc<dyn ProcessRunner>,
}

impl SonarQubeClient {
    pub fn new(
        config: &SonarQubeConfig,
        runner: Arc<dyn ProcessRunner>,
    ) -> Result<Self, AppError> {
        let rest = RestClient::builder(config.url.clone())
            .auth(Auth::Basic {
                username: config.token.clone(),
                password: None,
            })
            .timeout(config.timeout())
            .build()?;

        Ok(SonarQubeClient {
            rest,
            token: config.token.clone(),
            project_key: config.project_key.clone(),
            scanner_binary: config.scanner_binary.clone(),
            scan_timeout: config.scan_timeout(),
            runner,
        })
    }

    fn scanner_args(&self, project_path: &str) -> Vec<String> {
        vec![
            format!("-Dsonar.projectKey={}", self.project_key),
            format!("-Dsonar.sources={}", project_path),
            format!("-Dsonar.host.url={}", self.rest.base_url()),
            format!("-Dsonar.login={}", self.token),
            "-Dsonar.qualitygate.wait=true".to_string(),
        ]
    }
}

#[async_trait]
impl SonarQubeApi for SonarQubeClient {
    async fn trigger_scan(
        &self,
        project_path: &str,
        cancel: &CancellationToken,
    ) -> Result<ScanResult, AppError> {
        tracing::info!(project = %self.project_key, "starting SonarQube scan");

        if self.runner.resolve(&self.scanner_binary).is_none() {
            return Ok(ScanResult::failed(NOT_FOUND_MESSAGE, None));
        }

        let mut request =
            ProcessRequest::new(self.scanner_binary.clone(), self.scanner_args(project_path));
        if let Some(timeout) = self.scan_timeout {
            request = request.with_timeout(timeout);
        }

        let output = match self.runner.run(&request, cancel).await {
            Ok(output) => output,
            Err(err) if err.category == ErrorCategory::ToolNotFound => {
                return Ok(ScanResult::failed(NOT_FOUND_MESSAGE, None));
            }
            Err(err) if err.is_cancelled() => return Err(err),
            Err(err) => {
                tracing::error!(error = %err, "SonarQube scan failed");
                return Ok(ScanResult::failed(
                    format!("Scan failed: {}", err.message),
                    None,
                ));
            }
        };

        if !output.success() {
            let combined = output.combined();
            tracing::error!(
                exit_code = output.exit_code,
                output = %combined,
                "SonarQube scan failed"
            );
            return Ok(ScanResult::failed(
                format!("Scan failed: exit status {}", output.exit_code),
                Some(combined),
            ));
        }

        tracing::info!("SonarQube scan completed successfully");

        let metrics = match self.quality_gate_status(cancel).await {
            Ok(metrics) => Some(metrics),
            Err(err) if err.is_cancelled() => return Err(err),
            Err(err) => {
                tracing::warn!(error = %err, "failed to fetch quality gate status");
                None
            }
        };

        let measures = match self.project_measures(cancel).await {
            Ok(measures) => Some(measures),
            Err(err) if err.is_cancelled() => return Err(err),
            Err(err) => {
                tracing::warn!(error = %err, "failed to fetch project measures");
                None
            }
        };

        Ok(ScanResult {
            success: true,
            task_id: None,
            status: "SUCCESS".to_string(),
            message: "Scan completed successfully".to_string(),
            output: None,
            metrics,
            measures,
            timestamp: Utc::now(),
        })
    }

    async fn quality_gate_status(
        &self,
        cancel: &CancellationToken,
    ) -> Result<QualityGateStatus, AppError> {
        let path = format!(
            "/api/qualitygates/project_status?projectKey={}",
            encode_segment(&self.project_key)
        );
        self.rest
            .get_json(&path, "SonarQube quality gate request", cancel)
            .await
    }

    async fn project_measures(
        &self,
        cancel: &CancellationToken,
    ) -> Result<ProjectMeasures, AppError> {
        let path = format!(
            "/api/measures/component?component={}&metricKeys={}",
            encode_segment(&self.project_key),
            MEASURE_KEYS
        );
        self.rest
            .get_json(&path, "SonarQube measures request", cancel)
            .await
    }

    async fn project_issues(&self, cancel: &CancellationToken) -> Result<IssueSearch, AppError> {
        let path = format!(
            "/api/issues/search?componentKeys={}&ps={}",
            encode_segment(&self.project_key),
            ISSUE_PAGE_SIZE
        );
        self.rest
            .get_json(&path, "SonarQube issues request", cancel)
            .await
    }
}
