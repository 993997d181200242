//! Shared HTTP plumbing for the REST-backed adapters.

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use crate::tools::guarded;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Credentials attached to every request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Auth {
    None,
    Basic {
        username: String,
        password: Option<String>,
    },
    Bearer(String),
}

/// Error types for REST calls.
#[derive(Debug, thiserror::Error)]
pub enum RestError {
    #[error("{context} failed: {message}")]
    Network { context: String, message: String },
    #[error("{context} failed with status: {status}")]
    Status { context: String, status: u16 },
    #[error("failed to decode {context} response: {message}")]
    Deserialization { context: String, message: String },
    #[error("{context} timed out")]
    Timeout { context: String },
}

impl RestError {
    fn from_reqwest(context: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RestError::Timeout {
                context: context.to_string(),
            }
        } else if err.is_decode() {
            RestError::Deserialization {
                context: context.to_string(),
                message: err.to_string(),
            }
        } else {
            RestError::Network {
                context: context.to_string(),
                message: err.to_string(),
            }
        }
    }
}

impl From<RestError> for AppError {
    fn from(err: RestError) -> Self {
        let (category, code) = match &err {
            RestError::Network { .. } => (ErrorCategory::ExternalCallFailure, "HTTP-001"),
            RestError::Status { .. } => (ErrorCategory::ExternalCallFailure, "HTTP-002"),
            RestError::Deserialization { .. } => (ErrorCategory::ParseFailure, "HTTP-003"),
            RestError::Timeout { .. } => (ErrorCategory::TimeoutError, "HTTP-004"),
        };
        AppError::new(category, err.to_string()).with_code(code)
    }
}

pub struct RestClientBuilder {
    base_url: String,
    auth: Auth,
    timeout: Duration,
    headers: HeaderMap,
    follow_redirects: bool,
}

impl RestClientBuilder {
    pub fn auth(mut self, auth: Auth) -> Self {
        self.auth = auth;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
        self
    }

    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    pub fn build(self) -> Result<RestClient, AppError> {
        let policy = if self.follow_redirects {
            reqwest::redirect::Policy::default()
        } else {
            reqwest::redirect::Policy::none()
        };
        let http = reqwest::Client::builder()
            .user_agent(format!("devops-console/{}", crate::VERSION))
            .default_headers(self.headers)
            .redirect(policy)
            .build()
            .map_err(|err| {
                AppError::new(
                    ErrorCategory::InternalError,
                    format!("failed to build HTTP client: {}", err),
                )
                .with_code("HTTP-000")
            })?;

        Ok(RestClient {
            base_url: self.base_url.trim_end_matches('/').to_string(),
            http,
            auth: self.auth,
            timeout: self.timeout,
        })
    }
}

/// Thin reqwest wrapper bound to one base URL and credential.
#[derive(Clone, Debug)]
pub struct RestClient {
    base_url: String,
    http: reqwest::Client,
    auth: Auth,
    timeout: Duration,
}

impl RestClient {
    pub fn builder(base_url: impl Into<String>) -> RestClientBuilder {
        RestClientBuilder {
            base_url: base_url.into(),
            auth: Auth::None,
            timeout: DEFAULT_TIMEOUT,
            headers: HeaderMap::new(),
            follow_redirects: true,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Start a request with credentials and the default timeout applied.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, self.url(path))
            .timeout(self.timeout);
        match &self.auth {
            Auth::None => builder,
            Auth::Basic { username, password } => builder.basic_auth(username, password.as_ref()),
            Auth::Bearer(token) => builder.bearer_auth(token),
        }
    }

    /// Send a request and require one of `accepted` as the response status.
    ///
    /// An empty `accepted` slice means any 2xx.
    pub async fn send(
        &self,
        request: RequestBuilder,
        context: &str,
        accepted: &[StatusCode],
        cancel: &CancellationToken,
    ) -> Result<Response, AppError> {
        guarded(cancel, None, send_checked(request, context, accepted)).await
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        context: &str,
        cancel: &CancellationToken,
    ) -> Result<T, AppError> {
        let response = self
            .send(self.request(Method::GET, path), context, &[], cancel)
            .await?;
        guarded(cancel, None, async {
            response
                .json::<T>()
                .await
                .map_err(|err| AppError::from(RestError::from_reqwest(context, err)))
        })
        .await
    }

    pub async fn get_text(
        &self,
        path: &str,
        context: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<String, AppError> {
        let request = self.request(Method::GET, path).timeout(timeout);
        let response = self.send(request, context, &[], cancel).await?;
        guarded(cancel, None, async {
            response
                .text()
                .await
                .map_err(|err| AppError::from(RestError::from_reqwest(context, err)))
        })
        .await
    }
}

async fn send_checked(
    request: RequestBuilder,
    context: &str,
    accepted: &[StatusCode],
) -> Result<Response, AppError> {
    let response = request
        .send()
        .await
        .map_err(|err| RestError::from_reqwest(context, err))?;
    let status = response.status();
    let ok = if accepted.is_empty() {
        status.is_success()
    } else {
        accepted.contains(&status)
    };
    if !ok {
        tracing::debug!(context, status = status.as_u16(), "unexpected HTTP status");
        return Err(RestError::Status {
            context: context.to_string(),
            status: status.as_u16(),
        }
        .into());
    }
    Ok(response)
}
