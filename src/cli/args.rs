use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(name = "vulncases")]
#[clap(version, about = "Security training cases with sandboxed PHP snippets")]
#[clap(propagate_version = true)]
pub struct Cli {
    #[clap(flatten)]
    pub global_opts: GlobalOpts,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug)]
pub struct GlobalOpts {
    /// Configuration file path
    #[clap(short, long, global = true, env = "VULNCASES_CONFIG")]
    pub config: Option<PathBuf>,

    /// Cases root directory (overrides the configuration file)
    #[clap(long, global = true, env = "VULNCASES_CASES_DIR")]
    pub cases_dir: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[clap(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format
    #[clap(long, global = true, default_value = "text", value_enum)]
    pub format: OutputFormat,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute a PHP snippet from a file or stdin
    Exec(ExecArgs),

    /// Render a case the way its page would show it
    Case(CaseArgs),

    /// List case categories
    Categories,

    /// Check that the PHP interpreter is available
    Check,

    /// Write a default configuration file
    Init(InitArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

/// Simulated request options shared by `exec` and `case`
#[derive(Args, Debug)]
pub struct RequestArgs {
    /// HTTP method the snippet observes
    #[clap(long, short = 'X', default_value = "GET")]
    pub method: String,

    /// Query parameter (KEY=VALUE), repeatable, order preserved
    #[clap(long = "param", short = 'p', value_parser = parse_param)]
    pub params: Vec<(String, String)>,
}

#[derive(Args, Debug)]
pub struct ExecArgs {
    /// Snippet file (reads stdin when omitted or "-")
    pub file: Option<PathBuf>,

    #[clap(flatten)]
    pub request: RequestArgs,

    /// Run without a simulated request (no $_GET/$_SERVER preamble)
    #[clap(long, conflicts_with = "params")]
    pub raw: bool,
}

#[derive(Args, Debug)]
pub struct CaseArgs {
    /// Case category
    pub category: String,

    /// Case slug (file name without .json)
    pub slug: String,

    #[clap(flatten)]
    pub request: RequestArgs,
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing configuration
    #[clap(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[clap(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show effective configuration
    Show,
    /// Print configuration file path
    Path,
}

/// `KEY=VALUE`; a bare `KEY` is an empty value, as in `?flag`.
fn parse_param(s: &str) -> Result<(String, String), String> {
    let (key, value) = s.split_once('=').unwrap_or((s, ""));
    if key.is_empty() {
        return Err("Parameter format: KEY=VALUE".to_string());
    }
    Ok((key.to_string(), value.to_string()))
}

#[derive(Debug, Clone, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
