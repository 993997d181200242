pub mod loader;
pub mod validation;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub use loader::ConfigLoader;
pub use validation::ConfigValidator;

/// Main configuration loaded from devops.toml
///
/// The `[logging]` table of the same file is read by [`crate::logging::config::LoggingConfig`].
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DevOpsConfig {
    #[serde(default)]
    pub sonarqube: SonarQubeConfig,

    #[serde(default)]
    pub trivy: TrivyConfig,

    #[serde(default)]
    pub jenkins: JenkinsConfig,

    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub probe: ProbeConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

/// SonarQube server and scanner settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SonarQubeConfig {
    #[serde(default = "default_sonar_url")]
    pub url: String,

    /// User token, sent as the basic-auth user with an empty password
    #[serde(default)]
    pub token: String,

    #[serde(default = "default_project_key")]
    pub project_key: String,

    #[serde(default = "default_scanner_binary")]
    pub scanner_binary: String,

    /// Upper bound for one sonar-scanner run, 0 disables it
    #[serde(default = "default_scan_timeout_secs")]
    pub scan_timeout_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,
}

/// Trivy scanner settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrivyConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_trivy_binary")]
    pub binary: String,

    /// Upper bound for one scan, 0 disables it
    #[serde(default = "default_scan_timeout_secs")]
    pub timeout_secs: u64,
}

/// Jenkins server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JenkinsConfig {
    #[serde(default = "default_jenkins_url")]
    pub url: String,

    #[serde(default = "default_jenkins_user")]
    pub username: String,

    /// API token
    #[serde(default)]
    pub token: String,

    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,

    /// Timeout for console log downloads
    #[serde(default = "default_log_timeout_secs")]
    pub log_timeout_secs: u64,
}

/// GitHub Actions settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    #[serde(default)]
    pub token: String,

    #[serde(default = "default_github_api_url")]
    pub api_url: String,

    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,

    /// Page size used by `github-runs` when no limit argument is given
    #[serde(default = "default_runs_limit")]
    pub runs_limit: u32,
}

/// Command history settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_history_dir")]
    pub dir: PathBuf,

    /// Maximum number of retained records, 0 keeps everything
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

/// Tool availability probe settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    #[serde(default = "default_probe_timeout_secs")]
    pub timeout_secs: u64,
}

/// HTTP shell settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

// Default functions
fn default_true() -> bool {
    true
}

fn default_sonar_url() -> String {
    "http://localhost:9000".to_string()
}

fn default_project_key() -> String {
    "devops-console".to_string()
}

fn default_scanner_binary() -> String {
    "sonar-scanner".to_string()
}

fn default_scan_timeout_secs() -> u64 {
    1800
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_log_timeout_secs() -> u64 {
    60
}

fn default_trivy_binary() -> String {
    "trivy".to_string()
}

fn default_jenkins_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_jenkins_user() -> String {
    "admin".to_string()
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_runs_limit() -> u32 {
    20
}

fn default_history_dir() -> PathBuf {
    PathBuf::from("/tmp/devops-history")
}

fn default_max_entries() -> usize {
    1000
}

fn default_probe_timeout_secs() -> u64 {
    10
}

fn default_bind() -> String {
    "127.0.0.1:8088".to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:5173".to_string()]
}

fn default_body_limit() -> usize {
    64 * 1024
}

fn optional_timeout(secs: u64) -> Option<Duration> {
    (secs > 0).then_some(Duration::from_secs(secs))
}

/// Log which required fields are empty and return `None`, or return the section itself.
fn require_fields<'a, T>(
    section: &'a T,
    name: &str,
    missing: Vec<&'static str>,
) -> Option<&'a T> {
    if missing.is_empty() {
        Some(section)
    } else {
        tracing::info!(
            adapter = name,
            missing = %missing.join(", "),
            "adapter not configured"
        );
        None
    }
}

impl SonarQubeConfig {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.url.trim().is_empty() {
            missing.push("url");
        }
        if self.token.trim().is_empty() {
            missing.push("token");
        }
        if self.project_key.trim().is_empty() {
            missing.push("project_key");
        }
        missing
    }

    /// The section when every required field is present.
    pub fn configured(&self) -> Option<&Self> {
        require_fields(self, "SonarQube", self.missing_fields())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn scan_timeout(&self) -> Option<Duration> {
        optional_timeout(self.scan_timeout_secs)
    }
}

impl TrivyConfig {
    pub fn timeout(&self) -> Option<Duration> {
        optional_timeout(self.timeout_secs)
    }
}

impl JenkinsConfig {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.url.trim().is_empty() {
            missing.push("url");
        }
        if self.username.trim().is_empty() {
            missing.push("username");
        }
        if self.token.trim().is_empty() {
            missing.push("token");
        }
        missing
    }

    pub fn configured(&self) -> Option<&Self> {
        require_fields(self, "Jenkins", self.missing_fields())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn log_timeout(&self) -> Duration {
        Duration::from_secs(self.log_timeout_secs)
    }
}

impl GitHubConfig {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.token.trim().is_empty() {
            missing.push("token");
        }
        if self.api_url.trim().is_empty() {
            missing.push("api_url");
        }
        missing
    }

    pub fn configured(&self) -> Option<&Self> {
        require_fields(self, "GitHub", self.missing_fields())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Option<Duration> {
        optional_timeout(self.timeout_secs)
    }
}

impl Default for SonarQubeConfig {
    fn default() -> Self {
        SonarQubeConfig {
            url: default_sonar_url(),
            token: String::new(),
            project_key: default_project_key(),
            scanner_binary: default_scanner_binary(),
            scan_timeout_secs: default_scan_timeout_secs(),
            timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for TrivyConfig {
    fn default() -> Self {
        TrivyConfig {
            enabled: true,
            binary: default_trivy_binary(),
            timeout_secs: default_scan_timeout_secs(),
        }
    }
}

impl Default for JenkinsConfig {
    fn default() -> Self {
        JenkinsConfig {
            url: default_jenkins_url(),
            username: default_jenkins_user(),
            token: String::new(),
            timeout_secs: default_request_timeout_secs(),
            log_timeout_secs: default_log_timeout_secs(),
        }
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        GitHubConfig {
            token: String::new(),
            api_url: default_github_api_url(),
            timeout_secs: default_request_timeout_secs(),
            runs_limit: default_runs_limit(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        HistoryConfig {
            enabled: true,
            dir: default_history_dir(),
            max_entries: default_max_entries(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        ProbeConfig {
            timeout_secs: default_probe_timeout_secs(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: default_bind(),
            cors_origins: default_cors_origins(),
            body_limit_bytes: default_body_limit(),
        }
    }
}
