use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

pub use crate::core::types::{ErrorCategory, ErrorSeverity};

/// Category tag used to group commands in help output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandCategory {
    #[serde(rename = "Code Quality")]
    CodeQuality,
    Security,
    #[serde(rename = "CI/CD")]
    CiCd,
    Utilities,
}

impl fmt::Display for CommandCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CommandCategory::CodeQuality => "Code Quality",
            CommandCategory::Security => "Security",
            CommandCategory::CiCd => "CI/CD",
            CommandCategory::Utilities => "Utilities",
        };
        f.write_str(label)
    }
}

/// A positional parameter of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParameterSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
}

impl ParameterSpec {
    pub const fn required(name: &'static str, description: &'static str) -> Self {
        ParameterSpec {
            name,
            description,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, description: &'static str) -> Self {
        ParameterSpec {
            name,
            description,
            required: false,
        }
    }
}

/// Static description of a command, used for help output and argument validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommandDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub category: CommandCategory,
    pub parameters: &'static [ParameterSpec],
    pub example: &'static str,
}

impl CommandDescriptor {
    /// Number of leading positional arguments that must be present.
    pub fn min_args(&self) -> usize {
        self.parameters.iter().filter(|p| p.required).count()
    }
}

/// Uniform envelope returned for every executed command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    pub command: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(with = "duration_nanos")]
    pub duration: Duration,
    pub timestamp: DateTime<Utc>,
}

impl CommandResult {
    pub fn new(name: &str, args: &[String], timestamp: DateTime<Utc>) -> Self {
        let command = if args.is_empty() {
            name.to_string()
        } else {
            format!("{} {}", name, args.join(" "))
        };
        CommandResult {
            command,
            success: false,
            output: None,
            error: None,
            data: None,
            duration: Duration::ZERO,
            timestamp,
        }
    }

    /// Mark the result as failed with the given message.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.success = false;
        self.error = Some(message.into());
    }
}

/// Availability of a single external binary, produced by one probe run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolStatus {
    pub name: String,
    pub available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Durations are stored as integer nanoseconds.
mod duration_nanos {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let nanos = u64::try_from(value.as_nanos()).unwrap_or(u64::MAX);
        serializer.serialize_u64(nanos)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let nanos = u64::deserialize(deserializer)?;
        Ok(Duration::from_nanos(nanos))
    }
}
