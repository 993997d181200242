pub mod args;
pub mod commands;

pub use args::{CommandsArgs, ExecArgs, HistoryArgs, ServeArgs, ToolsArgs};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{name} {version}\n\
{about-with-newline}\n\
USAGE:\n    {usage}\n\
\nOPTIONS:\n{options}\n\
COMMANDS:\n{subcommands}\n";

#[derive(Parser, Debug)]
#[command(name = "devops-console")]
#[command(version = crate::VERSION)]
#[command(about = "Run SonarQube, Trivy, Jenkins and GitHub Actions commands through one facade")]
#[command(help_template = HELP_TEMPLATE)]
#[command(
    after_long_help = "Configuration is read from --config, $DEVOPS_CONFIG or ./devops.toml; credentials can also come from SONAR_TOKEN, JENKINS_TOKEN and GITHUB_TOKEN."
)]
pub struct Args {
    /// Path to devops.toml
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(
        about = "Execute one DevOps command",
        long_about = "Exec dispatches a registered command with its positional arguments and prints the JSON result envelope. The process exits non-zero when the command did not succeed.",
        after_help = "Examples:\n    devops-console exec trivy-image nginx:latest\n    devops-console exec jenkins-status deploy 42 --pretty"
    )]
    Exec(ExecArgs),
    #[command(
        about = "List available commands",
        after_help = "Example:\n    devops-console commands --json"
    )]
    Commands(CommandsArgs),
    #[command(
        about = "Check which DevOps binaries are installed",
        after_help = "Example:\n    devops-console tools"
    )]
    Tools(ToolsArgs),
    #[command(
        about = "Show recently executed commands",
        after_help = "Example:\n    devops-console history --limit 5"
    )]
    History(HistoryArgs),
    #[command(
        about = "Serve the command API over HTTP",
        long_about = "Serve exposes /api/devops/{commands,execute,history,tools/status} for the web console.",
        after_help = "Example:\n    devops-console serve --bind 0.0.0.0:8088"
    )]
    Serve(ServeArgs),
}

pub async fn run(args: Args) -> crate::Result<()> {
    let config = args.config.as_deref();
    match args.command {
        Command::Exec(exec_args) => commands::exec(config, exec_args).await,
        Command::Commands(commands_args) => commands::commands(commands_args),
        Command::Tools(tools_args) => commands::tools(config, tools_args).await,
        Command::History(history_args) => commands::history(config, history_args),
        Command::Serve(serve_args) => commands::serve(config, serve_args).await,
    }
}
