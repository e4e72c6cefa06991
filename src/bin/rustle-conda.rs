use anyhow::{Context, Result};
use clap::Parser;
use rustle_conda::{ExecutionContext, ModuleArgs, ModuleRegistry};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

#[derive(Parser)]
#[command(name = "rustle-conda")]
#[command(about = "Idempotently install, upgrade or remove a conda package")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct RustleCondaCli {
    /// Name of the package to manage
    #[arg(short, long)]
    name: Option<String>,

    /// Specific version to install (incompatible with --state latest)
    #[arg(long = "package-version")]
    package_version: Option<String>,

    /// State in which to leave the package
    #[arg(short, long, value_parser = ["present", "absent", "latest"])]
    state: Option<String>,

    /// Whitespace-separated extra channels
    #[arg(short, long)]
    channels: Option<String>,

    /// Full path to the conda executable
    #[arg(short, long)]
    executable: Option<PathBuf>,

    /// Whitespace-separated extra arguments passed to conda
    #[arg(long, allow_hyphen_values = true)]
    extra_args: Option<String>,

    /// YAML or JSON file with module arguments; flags override its values
    #[arg(long)]
    args_file: Option<PathBuf>,

    /// Only report what would change; conda runs every mutation with --dry-run
    #[arg(long)]
    check: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = RustleCondaCli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting rustle-conda v{}", env!("CARGO_PKG_VERSION"));

    let args = build_module_args(&cli)?;
    debug!("Module arguments: {}", args.to_value());

    let registry = ModuleRegistry::with_core_modules();
    let context = ExecutionContext::local(cli.check);

    match registry.execute_module("conda", &args, &context).await {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Err(e) => {
            error!("conda module failed: {}", e);
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({"failed": true, "msg": e.to_string()}))?
            );
            std::process::exit(1);
        }
    }
}

fn build_module_args(cli: &RustleCondaCli) -> Result<ModuleArgs> {
    let mut args = match &cli.args_file {
        Some(path) => load_args_file(path)?,
        None => HashMap::new(),
    };

    let overrides = [
        ("name", cli.name.clone()),
        ("version", cli.package_version.clone()),
        ("state", cli.state.clone()),
        ("channels", cli.channels.clone()),
        (
            "executable",
            cli.executable
                .as_ref()
                .map(|p| p.to_string_lossy().to_string()),
        ),
        ("extra_args", cli.extra_args.clone()),
    ];
    for (key, value) in overrides {
        if let Some(value) = value {
            args.insert(key.to_string(), Value::String(value));
        }
    }

    Ok(ModuleArgs { args })
}

fn load_args_file(path: &Path) -> Result<HashMap<String, Value>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read args file {}", path.display()))?;
    // YAML is a superset of JSON, so one parser covers both.
    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse args file {}", path.display()))
}
