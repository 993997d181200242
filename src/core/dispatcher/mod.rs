#![allow(clippy::result_large_err)]

pub mod handlers;

use crate::core::adapters::Adapters;
use crate::core::config::DevOpsConfig;
use crate::core::entities::{CommandDescriptor, CommandResult};
use crate::core::error::AppError;
use crate::core::history::HistoryStore;
use crate::core::probe::ToolAvailabilityProbe;
use crate::core::registry::CommandRegistry;
use chrono::Utc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

pub use handlers::{CommandHandler, Invocation, Outcome};

const DEFAULT_RUNS_LIMIT: u32 = 20;

/// Routes a command name and its arguments to the matching handler and
/// normalises whatever happens into a [`CommandResult`].
#[derive(Clone)]
pub struct CommandDispatcher {
    registry: CommandRegistry,
    adapters: Adapters,
    probe: ToolAvailabilityProbe,
    history: Option<HistoryStore>,
    runs_limit: u32,
}

impl CommandDispatcher {
    pub fn new(adapters: Adapters, probe: ToolAvailabilityProbe) -> Self {
        CommandDispatcher {
            registry: CommandRegistry::builtin(),
            adapters,
            probe,
            history: None,
            runs_limit: DEFAULT_RUNS_LIMIT,
        }
    }

    /// Real adapters, probe and history store as described by `config`.
    pub fn from_config(config: &DevOpsConfig) -> Result<Self, AppError> {
        let adapters = Adapters::from_config(config)?;
        let probe = ToolAvailabilityProbe::from_config(&config.probe);
        let mut dispatcher =
            CommandDispatcher::new(adapters, probe).with_runs_limit(config.github.runs_limit);
        if config.history.enabled {
            dispatcher = dispatcher.with_history(HistoryStore::from_config(&config.history));
        }
        Ok(dispatcher)
    }

    pub fn with_history(mut self, history: HistoryStore) -> Self {
        self.history = Some(history);
        self
    }

    pub fn with_registry(mut self, registry: CommandRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_runs_limit(mut self, runs_limit: u32) -> Self {
        self.runs_limit = runs_limit;
        self
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn list_commands(&self) -> &[CommandDescriptor] {
        self.registry.list_commands()
    }

    pub fn adapters(&self) -> &Adapters {
        &self.adapters
    }

    pub fn probe(&self) -> &ToolAvailabilityProbe {
        &self.probe
    }

    pub fn history(&self) -> Option<&HistoryStore> {
        self.history.as_ref()
    }

    pub async fn execute(&self, name: &str, args: &[String]) -> CommandResult {
        self.execute_with_cancel(name, args, &CancellationToken::new())
            .await
    }

    /// Run one command to completion. Never fails; every problem ends up in
    /// `success`/`error` of the returned result.
    pub async fn execute_with_cancel(
        &self,
        name: &str,
        args: &[String],
        cancel: &CancellationToken,
    ) -> CommandResult {
        let started = Instant::now();
        let mut result = CommandResult::new(name, args, Utc::now());
        tracing::info!(command = %result.command, "executing DevOps command");

        match self.run(name, args, cancel).await {
            Outcome::Completed { output, data } => {
                result.success = true;
                result.output = Some(output);
                result.data = data;
            }
            Outcome::Failed { error, data } => {
                result.fail(error);
                result.data = data;
            }
        }
        result.duration = started.elapsed();

        tracing::info!(
            command = %result.command,
            success = result.success,
            duration_ms = result.duration.as_millis() as u64,
            "command execution completed"
        );

        self.record(&result).await;
        result
    }

    async fn run(&self, name: &str, args: &[String], cancel: &CancellationToken) -> Outcome {
        let Some(entry) = self.registry.get(name) else {
            return Outcome::failed(format!("Unknown command: {}", name));
        };

        if let Some(kind) = entry.requires {
            if !self.adapters.is_configured(kind) {
                return Outcome::failed(kind.not_initialized().message);
            }
        }

        if args.len() < entry.descriptor.min_args() {
            return Outcome::failed(entry.missing_args_message());
        }

        let invocation = Invocation {
            adapters: &self.adapters,
            probe: &self.probe,
            registry: &self.registry,
            args,
            cancel,
            runs_limit: self.runs_limit,
        };
        match entry.handler().handle(invocation).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::debug!(command = name, error = %err, "command handler failed");
                Outcome::failed(err.message)
            }
        }
    }

    async fn record(&self, result: &CommandResult) {
        let Some(store) = self.history.clone() else {
            return;
        };
        let record = result.clone();
        match tokio::task::spawn_blocking(move || store.save(&record)).await {
            Ok(Ok(path)) => tracing::debug!(path = %path.display(), "recorded command history"),
            Ok(Err(err)) => tracing::warn!(error = %err, "failed to save command history"),
            Err(err) => tracing::warn!(error = %err, "history writer task failed"),
        }
    }
}

/// Permissive decimal scan: optional leading whitespace and sign, then the
/// leading run of digits. Anything after the digits is ignored.
pub fn scan_int(input: &str) -> Option<i64> {
    let trimmed = input.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if digits_end == 0 {
        return None;
    }
    let magnitude: i64 = rest[..digits_end].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}
