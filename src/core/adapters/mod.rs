pub mod github;
pub mod jenkins;
pub mod rest;
pub mod sonarqube;
pub mod trivy;

use crate::core::config::DevOpsConfig;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use crate::tools::{ProcessRunner, TokioProcessRunner};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

pub use github::{GitHubApi, GitHubClient};
pub use jenkins::{JenkinsApi, JenkinsClient};
pub use sonarqube::{SonarQubeApi, SonarQubeClient};
pub use trivy::{TrivyApi, TrivyClient};

/// Which external integration a command needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterKind {
    SonarQube,
    Trivy,
    Jenkins,
    GitHub,
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AdapterKind::SonarQube => "SonarQube",
            AdapterKind::Trivy => "Trivy",
            AdapterKind::Jenkins => "Jenkins",
            AdapterKind::GitHub => "GitHub",
        };
        f.write_str(name)
    }
}

impl AdapterKind {
    pub fn not_initialized(self) -> AppError {
        AppError::new(
            ErrorCategory::AdapterNotInitialized,
            format!("{} service not initialized", self),
        )
        .with_code("ADAPTER-001")
    }
}

/// The set of configured adapters. An absent entry means the integration was not configured.
#[derive(Clone, Default)]
pub struct Adapters {
    pub sonarqube: Option<Arc<dyn SonarQubeApi>>,
    pub trivy: Option<Arc<dyn TrivyApi>>,
    pub jenkins: Option<Arc<dyn JenkinsApi>>,
    pub github: Option<Arc<dyn GitHubApi>>,
}

impl Adapters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the real clients for every section of `config` that is fully configured.
    pub fn from_config(config: &DevOpsConfig) -> Result<Self, AppError> {
        Self::from_config_with_runner(config, Arc::new(TokioProcessRunner))
    }

    pub fn from_config_with_runner(
        config: &DevOpsConfig,
        runner: Arc<dyn ProcessRunner>,
    ) -> Result<Self, AppError> {
        let mut adapters = Adapters::new();

        if let Some(sonar) = config.sonarqube.configured() {
            adapters.sonarqube = Some(Arc::new(SonarQubeClient::new(sonar, runner.clone())?));
        }
        if config.trivy.enabled {
            adapters.trivy = Some(Arc::new(TrivyClient::new(&config.trivy, runner)));
        }
        if let Some(jenkins) = config.jenkins.configured() {
            adapters.jenkins = Some(Arc::new(JenkinsClient::new(jenkins)?));
        }
        if let Some(github) = config.github.configured() {
            adapters.github = Some(Arc::new(GitHubClient::new(github)?));
        }

        tracing::info!(
            sonarqube = adapters.sonarqube.is_some(),
            trivy = adapters.trivy.is_some(),
            jenkins = adapters.jenkins.is_some(),
            github = adapters.github.is_some(),
            "initialized DevOps adapters"
        );
        Ok(adapters)
    }

    pub fn with_sonarqube(mut self, adapter: Arc<dyn SonarQubeApi>) -> Self {
        self.sonarqube = Some(adapter);
        self
    }

    pub fn with_trivy(mut self, adapter: Arc<dyn TrivyApi>) -> Self {
        self.trivy = Some(adapter);
        self
    }

    pub fn with_jenkins(mut self, adapter: Arc<dyn JenkinsApi>) -> Self {
        self.jenkins = Some(adapter);
        self
    }

    pub fn with_github(mut self, adapter: Arc<dyn GitHubApi>) -> Self {
        self.github = Some(adapter);
        self
    }

    pub fn is_configured(&self, kind: AdapterKind) -> bool {
        match kind {
            AdapterKind::SonarQube => self.sonarqube.is_some(),
            AdapterKind::Trivy => self.trivy.is_some(),
            AdapterKind::Jenkins => self.jenkins.is_some(),
            AdapterKind::GitHub => self.github.is_some(),
        }
    }

    pub fn sonarqube(&self) -> Result<&dyn SonarQubeApi, AppError> {
        self.sonarqube
            .as_deref()
            .ok_or_else(|| AdapterKind::SonarQube.not_initialized())
    }

    pub fn trivy(&self) -> Result<&dyn TrivyApi, AppError> {
        self.trivy
            .as_deref()
            .ok_or_else(|| AdapterKind::Trivy.not_initialized())
    }

    pub fn jenkins(&self) -> Result<&dyn JenkinsApi, AppError> {
        self.jenkins
            .as_deref()
            .ok_or_else(|| AdapterKind::Jenkins.not_initialized())
    }

    pub fn github(&self) -> Result<&dyn GitHubApi, AppError> {
        self.github
            .as_deref()
            .ok_or_else(|| AdapterKind::GitHub.not_initialized())
    }
}

impl fmt::Debug for Adapters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapters")
            .field("sonarqube", &self.sonarqube.is_some())
            .field("trivy", &self.trivy.is_some())
            .field("jenkins", &self.jenkins.is_some())
            .field("github", &self.github.is_some())
            .finish()
    }
}

/// Convert an adapter payload into the opaque `data` value of a result.
pub fn to_data<T: Serialize>(payload: &T) -> Result<Value, AppError> {
    serde_json::to_value(payload).map_err(|err| {
        AppError::new(
            ErrorCategory::InternalError,
            format!("failed to encode result payload: {}", err),
        )
    })
}

/// Percent-encode a single path segment.
pub(crate) fn encode_segment(segment: &str) -> String {
    percent_encoding::utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

const PATH_SEGMENT: &percent_encoding::AsciiSet = &percent_encoding::NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');
