use clap::Parser;

use vulncases::cli::args::{Cli, Commands};
use vulncases::cli::commands;
use vulncases::config::loader::load_config;
use vulncases::error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.global_opts.verbose);

    // Load configuration (file + CLI overrides)
    let mut config = load_config(cli.global_opts.config.as_deref())?;
    if let Some(cases_dir) = cli.global_opts.cases_dir.clone() {
        config.cases.root = cases_dir;
    }
    let format = cli.global_opts.format.clone();

    // Dispatch to subcommand handler
    match cli.command {
        Commands::Exec(args) => {
            commands::exec(args, config, format).await?;
        }
        Commands::Case(args) => {
            commands::case(args, config, format).await?;
        }
        Commands::Categories => {
            commands::categories(config, format).await?;
        }
        Commands::Check => {
            commands::check(config, format).await?;
        }
        Commands::Init(args) => {
            commands::init(args, cli.global_opts.config).await?;
        }
        Commands::Config(args) => {
            commands::config(args, config).await?;
        }
    }

    Ok(())
}

fn init_logging(verbosity: u8) {
    use tracing_subscriber::EnvFilter;

    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Logs go to stderr; stdout carries the rendered body
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
