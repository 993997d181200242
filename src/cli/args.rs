use clap::Args;

#[derive(Args, Debug)]
pub struct ExecArgs {
    /// Command name as listed by `devops-console commands`
    #[arg(value_name = "COMMAND")]
    pub name: String,

    /// Positional arguments passed to the command
    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// Pretty-print the JSON result
    #[arg(long, help_heading = "Output Options")]
    pub pretty: bool,
}

#[derive(Args, Debug)]
pub struct CommandsArgs {
    /// Emit the catalog as JSON instead of a grouped listing
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ToolsArgs {
    /// Emit tool statuses as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Number of most recent records to show, 0 for all (default: 20)
    #[arg(long, default_value = "20", value_name = "N")]
    pub limit: usize,

    /// Emit records as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Listen address (default: server.bind from devops.toml)
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<String>,
}
