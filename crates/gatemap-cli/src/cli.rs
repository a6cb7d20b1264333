//! Command-line interface argument parsing and definitions
//!
//! This module defines the CLI structure using clap's derive API.

use clap::{Parser, Subcommand, ValueEnum};
use gatemap_core::MultiplicityPolicy;
use is_terminal::IsTerminal;
use std::path::PathBuf;

/// Gatemap CLI - declarative payload translation for protocol gateways
///
/// Runs integration definitions against inbound payloads, validates their
/// field mappings and dispatches the translated documents downstream.
#[derive(Parser, Debug)]
#[command(
    name = "gatemap",
    version,
    author,
    about,
    long_about = None,
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Enable verbose output (can be used multiple times for increased verbosity)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "GATEMAP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(short, long, value_enum, global = true, default_value = "human")]
    pub output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run an integration against an input file and print the mapped document
    Map(MapArgs),

    /// Compile an integration definition and report mapping errors
    Validate(ValidateArgs),

    /// Map an input file and send the result to a downstream endpoint
    Send(SendArgs),

    /// Manage configuration files and settings
    Config(ConfigArgs),

    /// Generate shell completions for the specified shell
    Completions(CompletionsArgs),
}

/// Arguments for the map command
#[derive(Parser, Debug)]
pub struct MapArgs {
    /// Path to the integration definition (JSON, YAML or TOML)
    #[arg(value_name = "INTEGRATION")]
    pub integration: PathBuf,

    /// Path to the inbound payload
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Write the mapped document to a file instead of stdout
    #[arg(long, value_name = "FILE")]
    pub save_to: Option<PathBuf>,

    /// Pretty-print the mapped document
    #[arg(long)]
    pub pretty: bool,

    /// Override the multiplicity policy of the integration
    #[arg(long, value_enum)]
    pub policy: Option<PolicyArg>,
}

/// Arguments for the validate command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to the integration definition (JSON, YAML or TOML)
    #[arg(value_name = "INTEGRATION")]
    pub integration: PathBuf,

    /// List every mapping, not just the failing ones
    #[arg(long)]
    pub detailed: bool,
}

/// Arguments for the send command
#[derive(Parser, Debug)]
pub struct SendArgs {
    /// Path to the integration definition (JSON, YAML or TOML)
    #[arg(value_name = "INTEGRATION")]
    pub integration: PathBuf,

    /// Path to the inbound payload
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Downstream endpoint receiving the mapped document
    #[arg(short, long, env = "GATEMAP_ENDPOINT")]
    pub endpoint: String,

    /// Acquire a bearer token before sending (uses the auth section of the config)
    #[arg(long)]
    pub auth: bool,

    /// Token endpoint, overrides the configured one
    #[arg(long, requires = "auth")]
    pub token_url: Option<String>,

    /// Maximum retry attempts, overrides the configured value
    #[arg(long)]
    pub retries: Option<u32>,

    /// Request timeout in seconds, overrides the configured value
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Override the multiplicity policy of the integration
    #[arg(long, value_enum)]
    pub policy: Option<PolicyArg>,

    /// Pretty-print the document sent downstream
    #[arg(long)]
    pub pretty: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write a default configuration file
    Init(ConfigInitArgs),

    /// Show the effective configuration
    Show(ConfigShowArgs),
}

/// Arguments for config init
#[derive(Parser, Debug)]
pub struct ConfigInitArgs {
    /// Create the config in the user config directory instead of the current one
    #[arg(long)]
    pub user: bool,

    /// Overwrite an existing file
    #[arg(short, long)]
    pub force: bool,
}

/// Arguments for config show
#[derive(Parser, Debug)]
pub struct ConfigShowArgs {
    /// Serialization format
    #[arg(short, long, value_enum, default_value = "yaml")]
    pub format: ConfigFormat,
}

/// Arguments for the completions command
#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Output format options
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output with colors
    Human,
    /// Compact JSON
    Json,
    /// YAML
    Yaml,
    /// Pretty-printed JSON
    JsonPretty,
}

/// Multiplicity policy options
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    /// Write the first value
    First,
    /// Write the last value
    Last,
    /// Write nothing
    Skip,
}

/// Configuration file formats
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Supported shells for completions
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    /// PowerShell
    PowerShell,
    Elvish,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Effective verbosity; quiet wins
    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }

    /// Whether to emit ANSI colors
    pub fn use_color(&self) -> bool {
        !self.no_color && std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
    }
}

impl From<PolicyArg> for MultiplicityPolicy {
    fn from(policy: PolicyArg) -> Self {
        match policy {
            PolicyArg::First => MultiplicityPolicy::FirstValue,
            PolicyArg::Last => MultiplicityPolicy::LastValue,
            PolicyArg::Skip => MultiplicityPolicy::Skip,
        }
    }
}

impl Shell {
    /// Convert to clap_complete shell
    pub fn to_clap_shell(self) -> clap_complete::Shell {
        match self {
            Shell::Bash => clap_complete::Shell::Bash,
            Shell::Zsh => clap_complete::Shell::Zsh,
            Shell::Fish => clap_complete::Shell::Fish,
            Shell::PowerShell => clap_complete::Shell::PowerShell,
            Shell::Elvish => clap_complete::Shell::Elvish,
        }
    }
}
