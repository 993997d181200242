use crate::cli::Command;

/// Execution contexts that influence how logging is routed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionContext {
    /// One-shot CLI invocation whose stdout carries command output.
    Cli,
    /// Long-running HTTP shell.
    Server,
}

/// Derive the active execution context from a parsed CLI command.
pub fn detect_context(command: &Command) -> ExecutionContext {
    match command {
        Command::Serve(_) => ExecutionContext::Server,
        Command::Exec(_) | Command::Commands(_) | Command::Tools(_) | Command::History(_) => {
            ExecutionContext::Cli
        }
    }
}
