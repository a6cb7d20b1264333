//! Configuration command handlers

use crate::cli::{ConfigAction, ConfigArgs, ConfigFormat, ConfigInitArgs, ConfigShowArgs};
use crate::config::{Config, FileFormat};
use crate::error::{Error, Result};
use crate::logging::redaction;
use crate::output::OutputWriter;

/// Handle the config command
pub async fn handle_config(
    args: ConfigArgs,
    config: &Config,
    output: &mut OutputWriter,
) -> Result<()> {
    match args.action {
        ConfigAction::Init(init_args) => handle_config_init(init_args, output),
        ConfigAction::Show(show_args) => handle_config_show(show_args, config, output),
    }
}

/// Handle config init subcommand
fn handle_config_init(args: ConfigInitArgs, output: &mut OutputWriter) -> Result<()> {
    let path = if args.user {
        Config::user_config_path()
            .ok_or_else(|| Error::config("Unable to determine user config directory"))?
    } else {
        Config::project_config_path()
    };

    if path.exists() && !args.force {
        output.warning(&format!(
            "Config already exists at {} (use --force to overwrite)",
            path.display()
        ))?;
        return Ok(());
    }

    Config::default().save(&path)?;
    output.success(&format!("✓ Created config at {}", path.display()))?;
    output.info("Edit it to set global statics, dispatch and auth settings.")?;
    Ok(())
}

/// Handle config show subcommand
///
/// Secrets are masked; `${ENV:NAME}` references are masked too.
fn handle_config_show(args: ConfigShowArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let content = render_redacted(config, args.format)?;
    output.writeln(content.trim_end())
}

fn render_redacted(config: &Config, format: ConfigFormat) -> Result<String> {
    let mut value = serde_json::to_value(config)?;
    redaction::redact_json_value(&mut value);
    let redacted: Config = serde_json::from_value(value)?;

    let format = match format {
        ConfigFormat::Yaml => FileFormat::Yaml,
        ConfigFormat::Json => FileFormat::Json,
        ConfigFormat::Toml => FileFormat::Toml,
    };
    redacted.to_string_as(format)
}
