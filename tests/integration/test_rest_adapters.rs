use devops_console::core::adapters::github::{GitHubApi, GitHubClient};
use devops_console::core::adapters::jenkins::{JenkinsApi, JenkinsClient};
use devops_console::core::adapters::sonarqube::{SonarQubeApi, SonarQubeClient};
use devops_console::core::config::{DevOpsConfig, GitHubConfig, JenkinsConfig, SonarQubeConfig};
use devops_console::core::types::ErrorCategory;
use devops_console::core::{Adapters, CommandDispatcher, ToolAvailabilityProbe};
use devops_console::tools::TokioProcessRunner;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn jenkins_config(server: &MockServer) -> JenkinsConfig {
    JenkinsConfig {
        url: server.uri(),
        username: "admin".to_string(),
        token: "jt".to_string(),
        ..Default::default()
    }
}

fn github_config(server: &MockServer) -> GitHubConfig {
    GitHubConfig {
        token: "ghp_x".to_string(),
        api_url: server.uri(),
        ..Default::default()
    }
}

fn sonar_config(server: &MockServer) -> SonarQubeConfig {
    SonarQubeConfig {
        url: server.uri(),
        token: "squ_abc".to_string(),
        project_key: "shop".to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_jenkins_jobs_use_basic_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/json"))
        .and(header("authorization", "Basic YWRtaW46anQ="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jobs": [
                {"name": "deploy", "color": "blue", "buildable": true,
                 "lastBuild": {"number": 41, "result": "SUCCESS"}},
                {"name": "nightly", "color": "red"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = JenkinsClient::new(&jenkins_config(&server)).unwrap();
    let jobs = client.jobs(&CancellationToken::new()).await.unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].last_build.as_ref().unwrap().number, 41);
}

#[tokio::test]
async fn test_jenkins_trigger_reads_queue_location() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/job/team/job/deploy/build"))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("Location", format!("{}/queue/item/4521/", server.uri()).as_str()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = JenkinsClient::new(&jenkins_config(&server)).unwrap();
    let result = client
        .trigger_job("team/deploy", &[], &CancellationToken::new())
        .await
        .unwrap();
    assert!(result.success);
    assert_eq!(result.queue_id, Some(4521));
    assert_eq!(result.job_name, "team/deploy");
}

#[tokio::test]
async fn test_jenkins_trigger_with_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/job/deploy/buildWithParameters"))
        .and(query_param("ENV", "prod"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let client = JenkinsClient::new(&jenkins_config(&server)).unwrap();
    let result = client
        .trigger_job(
            "deploy",
            &[("ENV".to_string(), "prod".to_string())],
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert!(result.queue_id.is_none());
}

#[tokio::test]
async fn test_jenkins_status_error_carries_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/job/deploy/99/api/json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = JenkinsClient::new(&jenkins_config(&server)).unwrap();
    let err = client
        .build_status("deploy", 99, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.category, ErrorCategory::ExternalCallFailure);
    assert_eq!(err.code, "HTTP-002");
    assert_eq!(err.message, "Build status request failed with status: 404");
}

#[tokio::test]
async fn test_jenkins_log_is_raw_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/job/deploy/42/consoleText"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Started\nFinished: FAILURE\n"))
        .mount(&server)
        .await;

    let client = JenkinsClient::new(&jenkins_config(&server)).unwrap();
    let log = client
        .build_log("deploy", 42, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(log, "Started\nFinished: FAILURE\n");
}

#[tokio::test]
async fn test_jenkins_stop_accepts_redirect() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/job/deploy/43/stop"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/job/deploy/43/"))
        .expect(1)
        .mount(&server)
        .await;

    let client = JenkinsClient::new(&jenkins_config(&server)).unwrap();
    client
        .stop_build("deploy", 43, &CancellationToken::new())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_jenkins_malformed_json_is_parse_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/queue/api/json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let client = JenkinsClient::new(&jenkins_config(&server)).unwrap();
    let err = client.queue(&CancellationToken::new()).await.unwrap_err();
    assert_eq!(err.category, ErrorCategory::ParseFailure);
}

#[tokio::test]
async fn test_request_timeout_maps_to_timeout_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"jobs": []}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let mut config = jenkins_config(&server);
    config.timeout_secs = 1;
    let client = JenkinsClient::new(&config).unwrap();
    let err = client.jobs(&CancellationToken::new()).await.unwrap_err();
    assert_eq!(err.category, ErrorCategory::TimeoutError);
}

#[tokio::test]
async fn test_cancel_aborts_in_flight_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"jobs": []}))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let client = JenkinsClient::new(&jenkins_config(&server)).unwrap();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });
    let err = client.jobs(&cancel).await.unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(err.message, "Command cancelled");
}

#[tokio::test]
async fn test_github_uses_bearer_and_accept_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/shop/actions/runs"))
        .and(query_param("per_page", "5"))
        .and(header("authorization", "Bearer ghp_x"))
        .and(header("accept", "application/vnd.github.v3+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 2,
            "workflow_runs": [
                {"id": 1, "status": "completed", "conclusion": "success"},
                {"id": 2, "status": "in_progress", "conclusion": null}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = GitHubClient::new(&github_config(&server)).unwrap();
    let runs = client
        .workflow_runs("acme", "shop", 5, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(runs.len(), 2);
    assert!(runs[1].conclusion.is_none());
}

#[tokio::test]
async fn test_github_dispatch_requires_no_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/shop/actions/workflows/7/dispatches"))
        .and(body_json(json!({"ref": "main", "inputs": {"env": "staging"}})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/shop/actions/workflows/8/dispatches"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = GitHubClient::new(&github_config(&server)).unwrap();
    let inputs = json!({"env": "staging"});
    client
        .trigger_workflow("acme", "shop", 7, "main", Some(&inputs), &CancellationToken::new())
        .await
        .unwrap();

    let err = client
        .trigger_workflow("acme", "shop", 8, "main", None, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.message, "Workflow trigger failed with status: 200");
}

#[tokio::test]
async fn test_github_summary_counts_runs() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/shop/actions/workflows"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 1,
            "workflows": [{"id": 7, "name": "CI", "state": "active"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/shop/actions/runs"))
        .and(query_param("per_page", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "workflow_runs": [
                {"id": 1, "status": "completed", "conclusion": "success"},
                {"id": 2, "status": "completed", "conclusion": "timed_out"},
                {"id": 3, "status": "queued", "conclusion": null},
                {"id": 4, "status": "completed", "conclusion": "neutral"}
            ]
        })))
        .mount(&server)
        .await;

    let client = GitHubClient::new(&github_config(&server)).unwrap();
    let summary = client
        .workflow_summary("acme", "shop", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.total_runs, 4);
    assert_eq!(summary.successful_runs, 1);
    assert_eq!(summary.failed_runs, 1);
    assert_eq!(summary.in_progress_runs, 1);
    assert_eq!(summary.workflows.len(), 1);
}

#[tokio::test]
async fn test_sonar_uses_token_as_basic_user() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/qualitygates/project_status"))
        .and(query_param("projectKey", "shop"))
        .and(header("authorization", "Basic c3F1X2FiYzo="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "projectStatus": {
                "status": "ERROR",
                "conditions": [
                    {"status": "ERROR", "metricKey": "coverage", "comparator": "LT",
                     "errorThreshold": "80", "actualValue": "61.5"}
                ]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = SonarQubeClient::new(&sonar_config(&server), Arc::new(TokioProcessRunner)).unwrap();
    let gate = client
        .quality_gate_status(&CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(gate.project_status.status, "ERROR");
    assert_eq!(gate.project_status.conditions[0].actual_value, "61.5");
}

#[tokio::test]
async fn test_sonar_measures_and_issues() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/measures/component"))
        .and(query_param("component", "shop"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "component": {
                "key": "shop",
                "name": "Shop",
                "measures": [
                    {"metric": "coverage", "value": "83.2"},
                    {"metric": "bugs", "value": "3"}
                ]
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/issues/search"))
        .and(query_param("componentKeys", "shop"))
        .and(query_param("ps", "500"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 2,
            "issues": [
                {"key": "AX1", "rule": "rust:S100", "severity": "MAJOR", "type": "CODE_SMELL",
                 "message": "Rename", "line": 12},
                {"key": "AX2", "rule": "rust:S200", "severity": "BLOCKER", "type": "BUG",
                 "message": "Null deref"}
            ]
        })))
        .mount(&server)
        .await;

    let client = SonarQubeClient::new(&sonar_config(&server), Arc::new(TokioProcessRunner)).unwrap();
    let cancel = CancellationToken::new();
    let measures = client.project_measures(&cancel).await.unwrap();
    assert_eq!(measures.value("coverage"), Some("83.2"));
    assert_eq!(measures.value("ncloc"), None);

    let issues = client.project_issues(&cancel).await.unwrap();
    assert_eq!(issues.total, 2);
    assert_eq!(issues.issues[0].line, Some(12));
    assert_eq!(issues.issues[1].kind, "BUG");
}

#[tokio::test]
async fn test_dispatch_through_configured_adapters() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/shop/actions/workflows/7/dispatches"))
        .and(body_json(json!({"ref": "release"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/job/deploy/42/api/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "number": 42, "result": null, "building": true
        })))
        .mount(&server)
        .await;

    let mut config = DevOpsConfig::default();
    config.trivy.enabled = false;
    config.github = github_config(&server);
    config.jenkins = jenkins_config(&server);
    let adapters = Adapters::from_config(&config).unwrap();
    assert!(adapters.sonarqube.is_none());
    assert!(adapters.trivy.is_none());

    let dispatcher = CommandDispatcher::new(
        adapters,
        ToolAvailabilityProbe::default().with_tools(Vec::new()),
    );

    let trigger = dispatcher
        .execute(
            "github-trigger",
            &["acme", "shop", "7", "release"].map(String::from),
        )
        .await;
    assert!(trigger.success, "{:?}", trigger.error);
    assert_eq!(
        trigger.output.as_deref(),
        Some("Workflow triggered successfully")
    );

    let status = dispatcher
        .execute("jenkins-status", &["deploy", "42"].map(String::from))
        .await;
    assert_eq!(status.output.as_deref(), Some("Build 42 status: BUILDING"));

    let gate = dispatcher.execute("sonar-gate", &[]).await;
    assert_eq!(
        gate.error.as_deref(),
        Some("SonarQube service not initialized")
    );
}
