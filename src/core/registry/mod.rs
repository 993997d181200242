use crate::core::adapters::trivy::ScanKind;
use crate::core::adapters::AdapterKind;
use crate::core::dispatcher::handlers::{
    CommandHandler, GitHubCommand, JenkinsCommand, SonarCommand, TrivyScan, UtilityCommand,
};
use crate::core::entities::{CommandCategory, CommandDescriptor, ParameterSpec};
use std::collections::HashMap;
use std::sync::Arc;

/// A registered command: its descriptor, the adapter it needs and the handler that runs it.
#[derive(Clone)]
pub struct CommandEntry {
    pub descriptor: CommandDescriptor,
    pub requires: Option<AdapterKind>,
    missing_args: &'static str,
    handler: Arc<dyn CommandHandler>,
}

impl CommandEntry {
    pub fn new<H: CommandHandler>(descriptor: CommandDescriptor, handler: H) -> Self {
        CommandEntry {
            descriptor,
            requires: None,
            missing_args: "",
            handler: Arc::new(handler),
        }
    }

    pub fn requires(mut self, adapter: AdapterKind) -> Self {
        self.requires = Some(adapter);
        self
    }

    pub fn missing_args(mut self, message: &'static str) -> Self {
        self.missing_args = message;
        self
    }

    pub fn name(&self) -> &'static str {
        self.descriptor.name
    }

    /// Message reported when fewer than `min_args` arguments were supplied.
    pub fn missing_args_message(&self) -> String {
        if !self.missing_args.is_empty() {
            return self.missing_args.to_string();
        }
        let missing: Vec<&str> = self
            .descriptor
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();
        format!("Missing {} arguments", missing.join(", "))
    }

    pub fn handler(&self) -> &dyn CommandHandler {
        self.handler.as_ref()
    }
}

/// Builder used to register commands before dispatching.
#[derive(Default)]
pub struct CommandRegistryBuilder {
    entries: Vec<CommandEntry>,
}

impl CommandRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entry: CommandEntry) -> &mut Self {
        if self.entries.iter().any(|e| e.name() == entry.name()) {
            panic!("duplicate command registered: {}", entry.name());
        }
        self.entries.push(entry);
        self
    }

    pub fn build(self) -> CommandRegistry {
        let index = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (entry.name(), i))
            .collect();
        let descriptors = self.entries.iter().map(|e| e.descriptor).collect();
        CommandRegistry {
            entries: Arc::new(self.entries),
            descriptors: Arc::new(descriptors),
            index: Arc::new(index),
        }
    }
}

/// Immutable catalog of commands in registration order.
#[derive(Clone)]
pub struct CommandRegistry {
    entries: Arc<Vec<CommandEntry>>,
    descriptors: Arc<Vec<CommandDescriptor>>,
    index: Arc<HashMap<&'static str, usize>>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CommandRegistry {
    pub fn builder() -> CommandRegistryBuilder {
        CommandRegistryBuilder::new()
    }

    /// The built-in command table.
    pub fn builtin() -> Self {
        let mut builder = CommandRegistryBuilder::new();
        register_builtins(&mut builder);
        builder.build()
    }

    pub fn list_commands(&self) -> &[CommandDescriptor] {
        &self.descriptors
    }

    pub fn get(&self, name: &str) -> Option<&CommandEntry> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

const PROJECT_PATH: &[ParameterSpec] =
    &[ParameterSpec::required("path", "Project path to scan")];
const PATH: &[ParameterSpec] = &[ParameterSpec::required("path", "Path to scan")];
const IMAGE: &[ParameterSpec] = &[ParameterSpec::required("image", "Docker image name")];
const REPO_URL: &[ParameterSpec] = &[ParameterSpec::required("repo", "Repository URL")];
const JOB: &[ParameterSpec] = &[
    ParameterSpec::required("job", "Job name"),
    ParameterSpec::optional("params", "KEY=VALUE build parameters"),
];
const JOB_BUILD: &[ParameterSpec] = &[
    ParameterSpec::required("job", "Job name"),
    ParameterSpec::required("build", "Build number"),
];
const OWNER_REPO: &[ParameterSpec] = &[
    ParameterSpec::required("owner", "Repository owner"),
    ParameterSpec::required("repo", "Repository name"),
];
const OWNER_REPO_LIMIT: &[ParameterSpec] = &[
    ParameterSpec::required("owner", "Repository owner"),
    ParameterSpec::required("repo", "Repository name"),
    ParameterSpec::optional("limit", "Number of runs to fetch"),
];
const WORKFLOW_DISPATCH: &[ParameterSpec] = &[
    ParameterSpec::required("owner", "Repository owner"),
    ParameterSpec::required("repo", "Repository name"),
    ParameterSpec::required("workflow", "Workflow ID"),
    ParameterSpec::required("ref", "Git ref"),
    ParameterSpec::optional("inputs", "KEY=VALUE workflow inputs"),
];
const RUN: &[ParameterSpec] = &[
    ParameterSpec::required("owner", "Repository owner"),
    ParameterSpec::required("repo", "Repository name"),
    ParameterSpec::required("run", "Run ID"),
];

const MISSING_JOB_BUILD: &str = "Missing job name and build number arguments";
const MISSING_OWNER_REPO: &str = "Missing owner and repository arguments";

fn descriptor(
    name: &'static str,
    description: &'static str,
    category: CommandCategory,
    parameters: &'static [ParameterSpec],
    example: &'static str,
) -> CommandDescriptor {
    CommandDescriptor {
        name,
        description,
        category,
        parameters,
        example,
    }
}

/// Register the built-in commands, grouped by category.
pub fn register_builtins(builder: &mut CommandRegistryBuilder) {
    use CommandCategory::{CiCd, CodeQuality, Security, Utilities};

    builder
        .register(
            CommandEntry::new(
                descriptor(
                    "sonar-scan",
                    "Run SonarQube code quality scan",
                    CodeQuality,
                    PROJECT_PATH,
                    "sonar-scan /path/to/project",
                ),
                SonarCommand::Scan,
            )
            .requires(AdapterKind::SonarQube)
            .missing_args("Missing project path argument"),
        )
        .register(
            CommandEntry::new(
                descriptor(
                    "sonar-metrics",
                    "Get SonarQube project metrics",
                    CodeQuality,
                    &[],
                    "sonar-metrics",
                ),
                SonarCommand::Metrics,
            )
            .requires(AdapterKind::SonarQube),
        )
        .register(
            CommandEntry::new(
                descriptor(
                    "sonar-gate",
                    "Get SonarQube quality gate status",
                    CodeQuality,
                    &[],
                    "sonar-gate",
                ),
                SonarCommand::Gate,
            )
            .requires(AdapterKind::SonarQube),
        )
        .register(
            CommandEntry::new(
                descriptor(
                    "sonar-issues",
                    "List open SonarQube issues",
                    CodeQuality,
                    &[],
                    "sonar-issues",
                ),
                SonarCommand::Issues,
            )
            .requires(AdapterKind::SonarQube),
        )
        .register(
            CommandEntry::new(
                descriptor(
                    "trivy-fs",
                    "Scan filesystem for vulnerabilities",
                    Security,
                    PATH,
                    "trivy-fs /path/to/scan",
                ),
                TrivyScan(ScanKind::Filesystem),
            )
            .requires(AdapterKind::Trivy)
            .missing_args("Missing path argument"),
        )
        .register(
            CommandEntry::new(
                descriptor(
                    "trivy-image",
                    "Scan Docker image for vulnerabilities",
                    Security,
                    IMAGE,
                    "trivy-image nginx:latest",
                ),
                TrivyScan(ScanKind::Image),
            )
            .requires(AdapterKind::Trivy)
            .missing_args("Missing image name argument"),
        )
        .register(
            CommandEntry::new(
                descriptor(
                    "trivy-repo",
                    "Scan Git repository for vulnerabilities",
                    Security,
                    REPO_URL,
                    "trivy-repo https://github.com/user/repo",
                ),
                TrivyScan(ScanKind::Repository),
            )
            .requires(AdapterKind::Trivy)
            .missing_args("Missing repository URL argument"),
        )
        .register(
            CommandEntry::new(
                descriptor(
                    "trivy-config",
                    "Scan configuration files for misconfigurations",
                    Security,
                    PATH,
                    "trivy-config ./deploy",
                ),
                TrivyScan(ScanKind::Config),
            )
            .requires(AdapterKind::Trivy)
            .missing_args("Missing path argument"),
        )
        .register(
            CommandEntry::new(
                descriptor(
                    "jenkins-jobs",
                    "List all Jenkins jobs",
                    CiCd,
                    &[],
                    "jenkins-jobs",
                ),
                JenkinsCommand::Jobs,
            )
            .requires(AdapterKind::Jenkins),
        )
        .register(
            CommandEntry::new(
                descriptor(
                    "jenkins-trigger",
                    "Trigger a Jenkins job",
                    CiCd,
                    JOB,
                    "jenkins-trigger my-job BRANCH=main",
                ),
                JenkinsCommand::Trigger,
            )
            .requires(AdapterKind::Jenkins)
            .missing_args("Missing job name argument"),
        )
        .register(
            CommandEntry::new(
                descriptor(
                    "jenkins-status",
                    "Get build status",
                    CiCd,
                    JOB_BUILD,
                    "jenkins-status my-job 123",
                ),
                JenkinsCommand::Status,
            )
            .requires(AdapterKind::Jenkins)
            .missing_args(MISSING_JOB_BUILD),
        )
        .register(
            CommandEntry::new(
                descriptor(
                    "jenkins-logs",
                    "Get build logs",
                    CiCd,
                    JOB_BUILD,
                    "jenkins-logs my-job 123",
                ),
                JenkinsCommand::Logs,
            )
            .requires(AdapterKind::Jenkins)
            .missing_args(MISSING_JOB_BUILD),
        )
        .register(
            CommandEntry::new(
                descriptor(
                    "jenkins-queue",
                    "List queued Jenkins builds",
                    CiCd,
                    &[],
                    "jenkins-queue",
                ),
                JenkinsCommand::Queue,
            )
            .requires(AdapterKind::Jenkins),
        )
        .register(
            CommandEntry::new(
                descriptor(
                    "jenkins-stop",
                    "Abort a running build",
                    CiCd,
                    JOB_BUILD,
                    "jenkins-stop my-job 123",
                ),
                JenkinsCommand::Stop,
            )
            .requires(AdapterKind::Jenkins)
            .missing_args(MISSING_JOB_BUILD),
        )
        .register(
            CommandEntry::new(
                descriptor(
                    "github-workflows",
                    "List GitHub Actions workflows",
                    CiCd,
                    OWNER_REPO,
                    "github-workflows owner repo",
                ),
                GitHubCommand::Workflows,
            )
            .requires(AdapterKind::GitHub)
            .missing_args(MISSING_OWNER_REPO),
        )
        .register(
            CommandEntry::new(
                descriptor(
                    "github-runs",
                    "List workflow runs",
                    CiCd,
                    OWNER_REPO_LIMIT,
                    "github-runs owner repo",
                ),
                GitHubCommand::Runs,
            )
            .requires(AdapterKind::GitHub)
            .missing_args(MISSING_OWNER_REPO),
        )
        .register(
            CommandEntry::new(
                descriptor(
                    "github-trigger",
                    "Trigger workflow dispatch",
                    CiCd,
                    WORKFLOW_DISPATCH,
                    "github-trigger owner repo 123456 main",
                ),
                GitHubCommand::Trigger,
            )
            .requires(AdapterKind::GitHub)
            .missing_args("Missing owner, repository, workflow ID, and ref arguments"),
        )
        .register(
            CommandEntry::new(
                descriptor(
                    "github-summary",
                    "Summarize recent workflow runs",
                    CiCd,
                    OWNER_REPO,
                    "github-summary owner repo",
                ),
                GitHubCommand::Summary,
            )
            .requires(AdapterKind::GitHub)
            .missing_args(MISSING_OWNER_REPO),
        )
        .register(
            CommandEntry::new(
                descriptor(
                    "github-jobs",
                    "List jobs of a workflow run",
                    CiCd,
                    RUN,
                    "github-jobs owner repo 987654",
                ),
                GitHubCommand::Jobs,
            )
            .requires(AdapterKind::GitHub)
            .missing_args("Missing owner, repository, and run ID arguments"),
        )
        .register(CommandEntry::new(
            descriptor(
                "tool-status",
                "Check availability of DevOps tools",
                Utilities,
                &[],
                "tool-status",
            ),
            UtilityCommand::ToolStatus,
        ))
        .register(CommandEntry::new(
            descriptor(
                "help",
                "Show available commands",
                Utilities,
                &[],
                "help",
            ),
            UtilityCommand::Help,
        ));
}
