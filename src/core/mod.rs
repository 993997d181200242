pub mod adapters;
pub mod config;
pub mod dispatcher;
pub mod entities;
pub mod error;
pub mod history;
pub mod probe;
pub mod registry;
pub mod types;

pub use adapters::{AdapterKind, Adapters};
pub use config::{ConfigLoader, DevOpsConfig};
pub use dispatcher::{CommandDispatcher, Outcome};
pub use entities::{CommandCategory, CommandDescriptor, CommandResult, ParameterSpec, ToolStatus};
pub use error::{AppError, CANCELLED_MESSAGE};
pub use history::HistoryStore;
pub use probe::{ToolAvailabilityProbe, ToolCheck};
pub use registry::{CommandEntry, CommandRegistry};
pub use types::*;
