use crate::core::config::TrivyConfig;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use crate::tools::{ProcessRequest, ProcessRunner};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const NOT_FOUND_MESSAGE: &str = "Trivy not found. Please install Trivy security scanner";

/// Trivy subcommand to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanKind {
    Filesystem,
    Image,
    Repository,
    Config,
}

impl ScanKind {
    pub fn subcommand(self) -> &'static str {
        match self {
            ScanKind::Filesystem => "fs",
            ScanKind::Image => "image",
            ScanKind::Repository => "repo",
            ScanKind::Config => "config",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScanKind::Filesystem => "filesystem",
            ScanKind::Image => "image",
            ScanKind::Repository => "repository",
            ScanKind::Config => "config",
        }
    }
}

impl fmt::Display for ScanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TrivyVulnerability {
    #[serde(rename = "VulnerabilityID", default)]
    pub vulnerability_id: String,
    #[serde(default)]
    pub pkg_name: String,
    #[serde(default)]
    pub installed_version: String,
    #[serde(default)]
    pub fixed_version: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub references: Vec<String>,
}

/// Finding from `trivy config`. Only `FAIL` entries are counted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TrivyMisconfiguration {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(rename = "AVDID", default)]
    pub avd_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub resolution: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TrivyResult {
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub class: String,
    #[serde(default)]
    pub r#type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vulnerabilities: Option<Vec<TrivyVulnerability>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub misconfigurations: Option<Vec<TrivyMisconfiguration>>,
}

/// Report printed by `trivy --format json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TrivyScanReport {
    #[serde(default)]
    pub schema_version: i64,
    #[serde(default)]
    pub artifact_name: String,
    #[serde(default)]
    pub artifact_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<TrivyResult>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl TrivyScanReport {
    pub fn vulnerabilities(&self) -> impl Iterator<Item = &TrivyVulnerability> {
        self.results
            .iter()
            .flatten()
            .flat_map(|result| result.vulnerabilities.iter().flatten())
    }

    pub fn failed_misconfigurations(&self) -> impl Iterator<Item = &TrivyMisconfiguration> {
        self.results
            .iter()
            .flatten()
            .flat_map(|result| result.misconfigurations.iter().flatten())
            .filter(|finding| finding.status == "FAIL")
    }

    /// Severities of the findings a scan of `kind` reports.
    fn severities(&self, kind: ScanKind) -> Vec<&str> {
        match kind {
            ScanKind::Config => self
                .failed_misconfigurations()
                .map(|m| m.severity.as_str())
                .collect(),
            _ => self.vulnerabilities().map(|v| v.severity.as_str()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeverityCounts {
    #[serde(rename = "totalVulnerabilities")]
    pub total: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub unknown: usize,
}

impl SeverityCounts {
    /// Bucket severities; anything outside CRITICAL/HIGH/MEDIUM/LOW counts as unknown.
    pub fn tally<'a>(severities: impl IntoIterator<Item = &'a str>) -> Self {
        let mut counts = SeverityCounts::default();
        for severity in severities {
            counts.total += 1;
            match severity {
                "CRITICAL" => counts.critical += 1,
                "HIGH" => counts.high += 1,
                "MEDIUM" => counts.medium += 1,
                "LOW" => counts.low += 1,
                _ => counts.unknown += 1,
            }
        }
        counts
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    pub success: bool,
    pub target: String,
    pub scan_type: String,
    #[serde(flatten)]
    pub counts: SeverityCounts,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<TrivyScanReport>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ScanSummary {
    fn failed(kind: ScanKind, target: &str, message: impl Into<String>) -> Self {
        ScanSummary {
            success: false,
            target: target.to_string(),
            scan_type: kind.label().to_string(),
            counts: SeverityCounts::default(),
            report: None,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// One-line summary used as command output.
    pub fn headline(&self) -> String {
        let noun = if self.scan_type == ScanKind::Config.label() {
            "misconfigurations"
        } else {
            "vulnerabilities"
        };
        format!(
            "Found {} {} ({} critical, {} high)",
            self.counts.total, noun, self.counts.critical, self.counts.high
        )
    }
}

#[async_trait]
pub trait TrivyApi: Send + Sync {
    /// Run one scan. A missing binary or a failing scan is reported in the summary,
    /// unparsable output is an error.
    async fn scan(
        &self,
        kind: ScanKind,
        target: &str,
        cancel: &CancellationToken,
    ) -> Result<ScanSummary, AppError>;
}

pub struct TrivyClient {
    binary: String,
    timeout: Option<Duration>,
    runner: Arc<dyn ProcessRunner>,
}

impl TrivyClient {
    pub fn new(config: &TrivyConfig, runner: Arc<dyn ProcessRunner>) -> Self {
        TrivyClient {
            binary: config.binary.clone(),
            timeout: config.timeout(),
            runner,
        }
    }

    fn parse_report(
        &self,
        stdout: &[u8],
        kind: ScanKind,
        target: &str,
    ) -> Result<ScanSummary, AppError> {
        let report: TrivyScanReport = serde_json::from_slice(stdout).map_err(|err| {
            tracing::error!(error = %err, scan_target = target, "failed to parse Trivy results");
            AppError::new(
                ErrorCategory::ParseFailure,
                format!("failed to parse Trivy results: {}", err),
            )
            .with_code("TRIVY-002")
        })?;

        let counts = SeverityCounts::tally(report.severities(kind));
        tracing::info!(
            scan_target = target,
            scan_type = kind.label(),
            total_vulnerabilities = counts.total,
            critical = counts.critical,
            high = counts.high,
            "Trivy scan completed"
        );

        Ok(ScanSummary {
            success: true,
            target: target.to_string(),
            scan_type: kind.label().to_string(),
            counts,
            report: Some(report),
            message: "Scan completed successfully".to_string(),
            timestamp: Utc::now(),
        })
    }
}

#[async_trait]
impl TrivyApi for TrivyClient {
    async fn scan(
        &self,
        kind: ScanKind,
        target: &str,
        cancel: &CancellationToken,
    ) -> Result<ScanSummary, AppError> {
        tracing::info!(scan_target = target, scan_type = kind.label(), "starting Trivy scan");

        if self.runner.resolve(&self.binary).is_none() {
            return Ok(ScanSummary::failed(kind, target, NOT_FOUND_MESSAGE));
        }

        let mut request = ProcessRequest::new(
            self.binary.clone(),
            [kind.subcommand(), "--format", "json", "--quiet", target],
        );
        if let Some(timeout) = self.timeout {
            request = request.with_timeout(timeout);
        }

        let output = match self.runner.run(&request, cancel).await {
            Ok(output) => output,
            Err(err) if err.category == ErrorCategory::ToolNotFound => {
                return Ok(ScanSummary::failed(kind, target, NOT_FOUND_MESSAGE));
            }
            Err(err) if err.is_cancelled() => return Err(err),
            Err(err) => {
                tracing::error!(error = %err, scan_target = target, "Trivy scan failed");
                return Ok(ScanSummary::failed(
                    kind,
                    target,
                    format!("Scan failed: {}", err.message),
                ));
            }
        };

        if !output.success() {
            let stderr = output.stderr_lossy();
            tracing::error!(exit_code = output.exit_code, scan_target = target, "Trivy scan failed");
            let message = if stderr.trim().is_empty() {
                format!("Scan failed: exit status {}", output.exit_code)
            } else {
                format!("Scan failed: exit status {}: {}", output.exit_code, stderr.trim())
            };
            return Ok(ScanSummary::failed(kind, target, message));
        }

        self.parse_report(&output.stdout, kind, target)
    }
}
