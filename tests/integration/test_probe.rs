use async_trait::async_trait;
use devops_console::core::error::AppError;
use devops_console::core::probe::DEFAULT_TOOLS;
use devops_console::core::types::ErrorCategory;
use devops_console::core::{ToolAvailabilityProbe, ToolCheck};
use devops_console::tools::{ProcessOutput, ProcessRequest, ProcessRunner};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

enum Reply {
    Output(ProcessOutput),
    Missing,
    Hang,
}

/// Answers each program from a fixed table and records what was run.
struct ScriptedRunner {
    replies: HashMap<&'static str, Reply>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    fn new(replies: Vec<(&'static str, Reply)>) -> Arc<Self> {
        Arc::new(ScriptedRunner {
            replies: replies.into_iter().collect(),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

fn output(stdout: &str, stderr: &str, exit_code: i32) -> Reply {
    Reply::Output(ProcessOutput {
        stdout: stdout.as_bytes().to_vec(),
        stderr: stderr.as_bytes().to_vec(),
        exit_code,
    })
}

#[async_trait]
impl ProcessRunner for ScriptedRunner {
    fn resolve(&self, program: &str) -> Option<PathBuf> {
        match self.replies.get(program) {
            Some(Reply::Missing) | None => None,
            Some(_) => Some(PathBuf::from("/usr/bin").join(program)),
        }
    }

    async fn run(
        &self,
        request: &ProcessRequest,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, AppError> {
        self.calls.lock().unwrap().push(request.display());
        match self.replies.get(request.program.as_str()) {
            Some(Reply::Output(output)) => Ok(output.clone()),
            Some(Reply::Hang) => {
                devops_console::tools::guarded(cancel, request.timeout, async {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(ProcessOutput::default())
                })
                .await
            }
            Some(Reply::Missing) | None => Err(AppError::new(
                ErrorCategory::ToolNotFound,
                format!("{}: executable file not found in $PATH", request.program),
            )),
        }
    }
}

#[tokio::test]
async fn test_every_default_tool_is_reported_in_order() {
    let runner = ScriptedRunner::new(vec![
        ("git", output("git version 2.43.0\n", "", 0)),
        ("jq", output("jq-1.7.1\n", "", 0)),
    ]);
    let statuses = ToolAvailabilityProbe::new(runner.clone())
        .check_availability()
        .await;

    let names: Vec<&str> = statuses.iter().map(|s| s.name.as_str()).collect();
    let expected: Vec<&str> = DEFAULT_TOOLS.iter().map(|t| t.name).collect();
    assert_eq!(names, expected);
    assert_eq!(statuses.iter().filter(|s| s.available).count(), 2);
    assert_eq!(runner.calls().len(), DEFAULT_TOOLS.len());
    assert!(runner.calls().contains(&"kubectl version --client".to_string()));
}

#[tokio::test]
async fn test_version_is_trimmed_stdout() {
    let runner = ScriptedRunner::new(vec![("git", output("git version 2.43.0\n", "", 0))]);
    let statuses = ToolAvailabilityProbe::new(runner)
        .with_tools(vec![ToolCheck::version_flag("git")])
        .check_availability()
        .await;

    assert_eq!(statuses.len(), 1);
    assert!(statuses[0].available);
    assert_eq!(statuses[0].version.as_deref(), Some("git version 2.43.0"));
    assert!(statuses[0].error.is_none());
}

#[tokio::test]
async fn test_version_falls_back_to_stderr() {
    let runner = ScriptedRunner::new(vec![("ansible", output("", "ansible [core 2.16]\n", 0))]);
    let statuses = ToolAvailabilityProbe::new(runner)
        .with_tools(vec![ToolCheck::version_flag("ansible")])
        .check_availability()
        .await;
    assert_eq!(statuses[0].version.as_deref(), Some("ansible [core 2.16]"));
}

#[tokio::test]
async fn test_non_zero_exit_is_unavailable() {
    let runner = ScriptedRunner::new(vec![(
        "docker",
        output("", "Cannot connect to the Docker daemon\n", 1),
    )]);
    let statuses = ToolAvailabilityProbe::new(runner)
        .with_tools(vec![ToolCheck::version_flag("docker")])
        .check_availability()
        .await;

    assert!(!statuses[0].available);
    assert!(statuses[0].version.is_none());
    assert_eq!(
        statuses[0].error.as_deref(),
        Some("exit status 1: Cannot connect to the Docker daemon")
    );
}

#[tokio::test]
async fn test_missing_tool_reports_error_message() {
    let runner = ScriptedRunner::new(vec![("terraform", Reply::Missing)]);
    let statuses = ToolAvailabilityProbe::new(runner)
        .with_tools(vec![ToolCheck::version_flag("terraform")])
        .check_availability()
        .await;
    assert!(!statuses[0].available);
    assert!(statuses[0]
        .error
        .as_deref()
        .unwrap()
        .contains("executable file not found"));
}

#[tokio::test]
async fn test_hanging_tool_times_out_without_blocking_others() {
    let runner = ScriptedRunner::new(vec![
        ("sonar-scanner", Reply::Hang),
        ("git", output("git version 2.43.0", "", 0)),
    ]);
    let statuses = ToolAvailabilityProbe::new(runner)
        .with_tools(vec![
            ToolCheck::version_flag("sonar-scanner"),
            ToolCheck::version_flag("git"),
        ])
        .with_timeout(Some(Duration::from_millis(50)))
        .check_availability()
        .await;

    assert!(!statuses[0].available);
    assert!(statuses[0].error.as_deref().unwrap().contains("timed out"));
    assert!(statuses[1].available);
}

#[tokio::test]
async fn test_cancelled_probe_marks_tools_unavailable() {
    let runner = ScriptedRunner::new(vec![("trivy", Reply::Hang)]);
    let cancel = CancellationToken::new();
    cancel.cancel();
    let statuses = ToolAvailabilityProbe::new(runner)
        .with_tools(vec![ToolCheck::version_flag("trivy")])
        .with_timeout(None)
        .check_availability_with_cancel(&cancel)
        .await;
    assert_eq!(statuses[0].error.as_deref(), Some("Command cancelled"));
}
