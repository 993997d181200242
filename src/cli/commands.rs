use crate::{
    cli::args::{CommandsArgs, ExecArgs, HistoryArgs, ServeArgs, ToolsArgs},
    core::{
        entities::{CommandCategory, CommandDescriptor, ToolStatus},
        CommandDispatcher, CommandRegistry, ConfigLoader, HistoryStore, ToolAvailabilityProbe,
    },
    server,
    utils::serialization::{JsonSerializer, Serializer},
    Result,
};
use anyhow::anyhow;
use std::path::Path;

pub async fn exec(config_path: Option<&Path>, args: ExecArgs) -> Result<()> {
    let config = ConfigLoader::load(config_path)?;
    let dispatcher = CommandDispatcher::from_config(&config)?;

    let result = dispatcher.execute(&args.name, &args.args).await;
    let serializer = JsonSerializer {
        pretty: args.pretty,
    };
    println!("{}", serializer.serialize_to_string(&result)?);

    if result.success {
        Ok(())
    } else {
        Err(anyhow!(
            "{} failed: {}",
            args.name,
            result.error.as_deref().unwrap_or("unknown error")
        ))
    }
}

pub fn commands(args: CommandsArgs) -> Result<()> {
    let registry = CommandRegistry::builtin();
    let descriptors = registry.list_commands();

    if args.json {
        println!(
            "{}",
            JsonSerializer::pretty().serialize_to_string(&descriptors)?
        );
        return Ok(());
    }

    print!("{}", render_catalog(descriptors));
    Ok(())
}

pub async fn tools(config_path: Option<&Path>, args: ToolsArgs) -> Result<()> {
    let config = ConfigLoader::load(config_path)?;
    let statuses = ToolAvailabilityProbe::from_config(&config.probe)
        .check_availability()
        .await;

    if args.json {
        println!(
            "{}",
            JsonSerializer::pretty().serialize_to_string(&statuses)?
        );
        return Ok(());
    }

    for status in &statuses {
        println!("{}", render_tool_status(status));
    }
    let available = statuses.iter().filter(|s| s.available).count();
    println!("\n{}/{} tools available", available, statuses.len());
    Ok(())
}

pub fn history(config_path: Option<&Path>, args: HistoryArgs) -> Result<()> {
    let config = ConfigLoader::load(config_path)?;
    let store = HistoryStore::from_config(&config.history);
    let records = store.list(args.limit)?;

    if args.json {
        println!(
            "{}",
            JsonSerializer::pretty().serialize_to_string(&records)?
        );
        return Ok(());
    }

    if records.is_empty() {
        println!("No command history in {}", store.dir().display());
        return Ok(());
    }
    for record in &records {
        println!(
            "{}  {:<4}  {}  ({}ms)",
            record.timestamp.to_rfc3339(),
            if record.success { "OK" } else { "FAIL" },
            record.command,
            record.duration.as_millis()
        );
    }
    Ok(())
}

pub async fn serve(config_path: Option<&Path>, args: ServeArgs) -> Result<()> {
    let mut config = ConfigLoader::load(config_path)?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    server::serve(&config).await?;
    Ok(())
}

/// `name <required> [optional]`
pub fn usage(descriptor: &CommandDescriptor) -> String {
    let mut usage = descriptor.name.to_string();
    for parameter in descriptor.parameters {
        if parameter.required {
            usage.push_str(&format!(" <{}>", parameter.name));
        } else {
            usage.push_str(&format!(" [{}]", parameter.name));
        }
    }
    usage
}

fn render_catalog(descriptors: &[CommandDescriptor]) -> String {
    let width = descriptors
        .iter()
        .map(|d| usage(d).len())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    let mut current: Option<CommandCategory> = None;
    for descriptor in descriptors {
        if current != Some(descriptor.category) {
            if current.is_some() {
                out.push('\n');
            }
            out.push_str(&format!("{}\n", descriptor.category));
            current = Some(descriptor.category);
        }
        out.push_str(&format!(
            "  {:<width$}  {}\n",
            usage(descriptor),
            descriptor.description,
            width = width
        ));
    }
    out
}

fn render_tool_status(status: &ToolStatus) -> String {
    let detail = if status.available {
        status.version.as_deref().unwrap_or_default()
    } else {
        status.error.as_deref().unwrap_or_default()
    };
    format!(
        "{:<14} {:<9} {}",
        status.name,
        if status.available { "available" } else { "missing" },
        detail.lines().next().unwrap_or_default()
    )
}
