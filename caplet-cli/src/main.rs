use anyhow::{Context, Result};
use caplet_core::Config;
use caplet_plugin::{ExecutionRequest, ExecutionResult, PluginHelper, PluginRegistry};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "caplet")]
#[command(about = "Inspect and call caplet plugin capabilities", long_about = None)]
#[command(version)]
struct Cli {
    #[arg(short, long, default_value = caplet_core::config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Print the specs of every registered capability")]
    Specs,

    #[command(about = "Call a capability by name")]
    Call {
        #[arg(help = "Capability name (e.g., 'get_crypto_rate')")]
        function: String,

        #[arg(short, long, default_value = "{}", help = "Arguments as a JSON object")]
        args: String,
    },

    #[command(about = "Show the effective configuration")]
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("caplet_plugin=info,caplet_std=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Specs => show_specs(&config),
        Commands::Call { function, args } => call(&config, &function, &args).await,
        Commands::Config => show_config(&config),
    }
}

/// A missing config file means defaults; a broken one is an error.
fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "No config file, using defaults");
        return Ok(Config::default());
    }

    Config::load(path).with_context(|| format!("Failed to load config from {}", path.display()))
}

fn build_registry(config: &Config) -> Result<PluginRegistry> {
    let mut registry = PluginRegistry::new();
    for plugin in caplet_std::builtin_plugins(config) {
        registry
            .register(plugin)
            .context("Failed to register plugin")?;
    }
    Ok(registry)
}

fn show_specs(config: &Config) -> Result<()> {
    let registry = build_registry(config)?;

    for spec in registry.specs() {
        let source = registry.source_of(&spec.name).unwrap_or("unknown");
        println!("{} {}", spec.name.bold().green(), format!("({})", source).dimmed());
        println!(
            "{}",
            serde_json::to_string_pretty(spec).context("Failed to serialize spec")?
        );
        println!();
    }

    Ok(())
}

async fn call(config: &Config, function: &str, args: &str) -> Result<()> {
    let registry = build_registry(config)?;

    let arguments: serde_json::Value =
        serde_json::from_str(args).context("Arguments must be valid JSON")?;
    if !arguments.is_object() {
        anyhow::bail!("Arguments must be a JSON object");
    }

    let request = ExecutionRequest::from_json(function, arguments);
    let result = registry.execute(request, &PluginHelper::new()).await?;

    let rendered = serde_json::to_string_pretty(&result).context("Failed to serialize result")?;
    match &result {
        ExecutionResult::Error { .. } => println!("{} {}", "✗".red().bold(), rendered),
        ExecutionResult::Artifact(_) => println!("{} {}", "✓".green().bold(), rendered.cyan()),
        _ => println!("{} {}", "✓".green().bold(), rendered),
    }

    Ok(())
}

fn show_config(config: &Config) -> Result<()> {
    println!("{}", "Current Configuration:".bold().green());
    println!();
    println!("{}", "Crypto:".bold());
    println!("  Base URL:    {}", config.crypto.base_url.cyan());
    println!();
    println!("{}", "YouTube:".bold());
    println!("  Binary:      {}", config.youtube.binary.cyan());
    println!("  Format:      {}", config.youtube.format);
    println!("  Codec:       {}", config.youtube.codec);
    println!("  Quality:     {}K", config.youtube.quality);
    println!(
        "  Output Dir:  {}",
        config
            .youtube
            .output_dir
            .as_deref()
            .map(|dir| dir.display().to_string())
            .unwrap_or_else(|| ".".to_string())
    );
    println!();
    println!("{}", "Raw:".bold());
    print!(
        "{}",
        serde_yaml::to_string(config).context("Failed to serialize config")?
    );

    Ok(())
}
