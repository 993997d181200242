#![allow(clippy::result_large_err)]

use super::DevOpsConfig;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use std::net::SocketAddr;
use url::Url;

pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration rules
    pub fn validate(config: &DevOpsConfig) -> Result<(), AppError> {
        Self::validate_url("sonarqube.url", &config.sonarqube.url)?;
        Self::validate_url("jenkins.url", &config.jenkins.url)?;
        Self::validate_url("github.api_url", &config.github.api_url)?;

        // REST clients always need a deadline; 0 would fail every call.
        for (field, secs) in [
            ("sonarqube.timeout_secs", config.sonarqube.timeout_secs),
            ("jenkins.timeout_secs", config.jenkins.timeout_secs),
            ("jenkins.log_timeout_secs", config.jenkins.log_timeout_secs),
            ("github.timeout_secs", config.github.timeout_secs),
        ] {
            if secs == 0 {
                return Err(invalid(format!("{} must be greater than 0", field)));
            }
        }

        if config.trivy.enabled && config.trivy.binary.trim().is_empty() {
            return Err(invalid("trivy.binary cannot be empty when trivy is enabled"));
        }

        if config.history.enabled && config.history.dir.as_os_str().is_empty() {
            return Err(invalid("history.dir cannot be empty"));
        }

        if config.github.runs_limit == 0 || config.github.runs_limit > 100 {
            return Err(invalid("github.runs_limit must be between 1 and 100"));
        }

        if config.server.bind.parse::<SocketAddr>().is_err() {
            return Err(invalid(format!(
                "server.bind must be a socket address, got '{}'",
                config.server.bind
            )));
        }

        Ok(())
    }

    /// Empty URLs are allowed: they leave the adapter unconfigured.
    fn validate_url(field: &str, value: &str) -> Result<(), AppError> {
        if value.trim().is_empty() {
            return Ok(());
        }
        let parsed = Url::parse(value)
            .map_err(|err| invalid(format!("invalid {}: {}", field, err)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid(format!("{} must use http or https", field)));
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> AppError {
    AppError::new(ErrorCategory::ValidationError, message).with_code("CFG-004")
}
