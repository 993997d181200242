#![allow(clippy::result_large_err)]

use super::{ConfigValidator, DevOpsConfig};
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "devops.toml";
pub const CONFIG_PATH_ENV: &str = "DEVOPS_CONFIG";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Pick the config file: explicit path, then `DEVOPS_CONFIG`, then `./devops.toml`.
    ///
    /// The boolean tells whether the path was requested explicitly, in which case it must exist.
    pub fn resolve_path(explicit: Option<&Path>) -> Option<(PathBuf, bool)> {
        if let Some(path) = explicit {
            return Some((path.to_path_buf(), true));
        }
        if let Ok(path) = env::var(CONFIG_PATH_ENV) {
            if !path.trim().is_empty() {
                return Some((PathBuf::from(path), true));
            }
        }
        let local = PathBuf::from(DEFAULT_CONFIG_FILE);
        local.exists().then_some((local, false))
    }

    /// Load config from the resolved path, apply environment overrides and validate.
    pub fn load(explicit: Option<&Path>) -> Result<DevOpsConfig, AppError> {
        let mut config = match Self::resolve_path(explicit) {
            Some((path, required)) => match Self::load_from_file(&path)? {
                Some(config) => config,
                None if required => {
                    return Err(AppError::new(
                        ErrorCategory::ValidationError,
                        format!("Config file not found: {}", path.display()),
                    )
                    .with_code("CFG-001"))
                }
                None => DevOpsConfig::default(),
            },
            None => DevOpsConfig::default(),
        };

        Self::apply_env_overrides(&mut config);
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Load config from specific file path
    /// Returns Ok(None) if file doesn't exist
    pub fn load_from_file(path: &Path) -> Result<Option<DevOpsConfig>, AppError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::new(
                ErrorCategory::IoError,
                format!("Failed to read config file {}: {}", path.display(), e),
            )
            .with_code("CFG-003")
        })?;

        let config: DevOpsConfig = toml::from_str(&content).map_err(|e| {
            AppError::new(
                ErrorCategory::ValidationError,
                format!("Failed to parse config file {}: {}", path.display(), e),
            )
            .with_code("CFG-002")
        })?;

        Ok(Some(config))
    }

    /// Environment variables take precedence over config file values
    pub fn apply_env_overrides(config: &mut DevOpsConfig) {
        if let Some(url) = non_empty_var("SONAR_URL") {
            config.sonarqube.url = url;
        }
        if let Some(token) = non_empty_var("SONAR_TOKEN") {
            config.sonarqube.token = token;
        }
        if let Some(project_key) = non_empty_var("SONAR_PROJECT_KEY") {
            config.sonarqube.project_key = project_key;
        }

        if let Some(binary) = non_empty_var("TRIVY_BINARY") {
            config.trivy.binary = binary;
        }

        if let Some(url) = non_empty_var("JENKINS_URL") {
            config.jenkins.url = url;
        }
        if let Some(username) = non_empty_var("JENKINS_USER") {
            config.jenkins.username = username;
        }
        if let Some(token) = non_empty_var("JENKINS_TOKEN") {
            config.jenkins.token = token;
        }

        if let Some(token) = non_empty_var("GITHUB_TOKEN") {
            config.github.token = token;
        }
        if let Some(api_url) = non_empty_var("GITHUB_API_URL") {
            config.github.api_url = api_url;
        }

        if let Some(dir) = non_empty_var("DEVOPS_HISTORY_DIR") {
            config.history.dir = PathBuf::from(dir);
        }
        if let Some(max_entries) = non_empty_var("DEVOPS_HISTORY_MAX_ENTRIES") {
            match max_entries.parse::<usize>() {
                Ok(value) => config.history.max_entries = value,
                Err(_) => tracing::warn!(
                    value = %max_entries,
                    "ignoring non-numeric DEVOPS_HISTORY_MAX_ENTRIES"
                ),
            }
        }

        if let Some(bind) = non_empty_var("DEVOPS_BIND") {
            config.server.bind = bind;
        }
    }

    /// Get documentation for supported environment variables
    pub fn env_var_documentation() -> &'static [&'static str] {
        &[
            "DEVOPS_CONFIG - Path to the config file (default: ./devops.toml)",
            "SONAR_URL - SonarQube server URL (default: http://localhost:9000)",
            "SONAR_TOKEN - SonarQube user token",
            "SONAR_PROJECT_KEY - SonarQube project key (default: devops-console)",
            "TRIVY_BINARY - Trivy executable (default: trivy)",
            "JENKINS_URL - Jenkins server URL (default: http://localhost:8080)",
            "JENKINS_USER - Jenkins user name (default: admin)",
            "JENKINS_TOKEN - Jenkins API token",
            "GITHUB_TOKEN - GitHub token used for Actions calls",
            "GITHUB_API_URL - GitHub API base URL (default: https://api.github.com)",
            "DEVOPS_HISTORY_DIR - Command history directory (default: /tmp/devops-history)",
            "DEVOPS_HISTORY_MAX_ENTRIES - History retention cap, 0 keeps everything (default: 1000)",
            "DEVOPS_BIND - Listen address for `serve` (default: 127.0.0.1:8088)",
        ]
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}
