use std::path::PathBuf;

use tokio::io::AsyncReadExt;
use tracing::{info, warn};

use crate::cases::{render_case, CaseStore};
use crate::cli::args::{CaseArgs, ConfigAction, ConfigArgs, ExecArgs, InitArgs, OutputFormat, RequestArgs};
use crate::config::loader::{get_config_path, write_default_config};
use crate::config::types::VulnCasesConfig;
use crate::error::Result;
use crate::sandbox::{render_outcome, SandboxPolicy, SimulatedRequest, SnippetExecutor};

/// Execute a snippet read from a file or stdin
pub async fn exec(args: ExecArgs, config: VulnCasesConfig, format: OutputFormat) -> Result<()> {
    let snippet = read_snippet(args.file.as_ref()).await?;
    let request = (!args.raw).then(|| simulated_request(&args.request));

    info!(raw = args.raw, "Executing snippet");

    let executor = build_executor(&config)?;
    let outcome = executor.execute(&snippet, request.as_ref()).await;

    match format {
        OutputFormat::Text => {
            let body = render_outcome(outcome, executor.policy().timeout_seconds());
            print!("{}", body);
        }
        OutputFormat::Json => {
            let result = outcome?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}

/// Load a case and render its body
pub async fn case(args: CaseArgs, config: VulnCasesConfig, format: OutputFormat) -> Result<()> {
    let store = CaseStore::new(&config.cases.root);
    let case = store.load(&args.category, &args.slug).await?;
    let request = simulated_request(&args.request);

    // Static cases stay servable when the interpreter is missing
    let executor = build_executor(&config);
    if let Err(e) = &executor {
        warn!(error = %e, "PHP cases unavailable");
    }

    let body = render_case(&case, &request, executor.as_ref()).await?;

    match format {
        OutputFormat::Text => print!("{}", body),
        OutputFormat::Json => {
            let mut page = serde_json::to_value(&case)?;
            page["body"] = serde_json::Value::String(body);
            println!("{}", serde_json::to_string_pretty(&page)?);
        }
    }

    Ok(())
}

/// List case categories
pub async fn categories(config: VulnCasesConfig, format: OutputFormat) -> Result<()> {
    let store = CaseStore::new(&config.cases.root);
    let categories = store.categories().await?;

    match format {
        OutputFormat::Text => {
            if categories.is_empty() {
                println!("No categories in {}", store.root().display());
            }
            for category in categories {
                println!("{}", category);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&categories)?);
        }
    }

    Ok(())
}

/// Verify the interpreter can be found and started
pub async fn check(config: VulnCasesConfig, format: OutputFormat) -> Result<()> {
    let executor = build_executor(&config)?;
    let version = executor.interpreter_version().await?;

    match format {
        OutputFormat::Text => {
            println!("Interpreter: {}", executor.interpreter_path().display());
            println!("Version:     {}", version);
            println!(
                "Root:        {}",
                executor.policy().confinement_root.display()
            );
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "interpreter": executor.interpreter_path(),
                    "version": version,
                    "root": executor.policy().confinement_root,
                    "timeout_seconds": executor.policy().timeout_seconds(),
                    "disabled_functions": executor.policy().disabled_functions,
                })
            );
        }
    }

    Ok(())
}

/// Write a default configuration file
pub async fn init(args: InitArgs, config_path: Option<PathBuf>) -> Result<()> {
    let path = config_path.unwrap_or_else(get_config_path);
    write_default_config(&path, args.force)?;
    println!("Wrote {}", path.display());
    Ok(())
}

/// Manage configuration
pub async fn config(args: ConfigArgs, config: VulnCasesConfig) -> Result<()> {
    match args.action {
        ConfigAction::Show => {
            let content = toml::to_string_pretty(&config)
                .map_err(|e| crate::error::VulnCasesError::Config(e.to_string()))?;
            print!("{}", content);
        }
        ConfigAction::Path => {
            println!("{}", get_config_path().display());
        }
    }

    Ok(())
}

fn build_executor(config: &VulnCasesConfig) -> Result<SnippetExecutor> {
    let policy = SandboxPolicy::from_config(&config.cases, &config.sandbox)?;
    SnippetExecutor::new(policy)
}

fn simulated_request(args: &RequestArgs) -> SimulatedRequest {
    SimulatedRequest::new(args.method.to_uppercase(), args.params.clone())
}

async fn read_snippet(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) if path.as_os_str() != "-" => Ok(tokio::fs::read_to_string(path).await?),
        _ => {
            let mut snippet = String::new();
            tokio::io::stdin().read_to_string(&mut snippet).await?;
            Ok(snippet)
        }
    }
}
