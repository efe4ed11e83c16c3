//! element-template-updater CLI entrypoint
//! Parses command-line arguments and drives the template update engine.
#![deny(unsafe_code)]

// Internal imports (std, crate)
use element_template_updater::{TemplateUpdater, UpdaterConfig};
use std::path::{Path, PathBuf};

// External imports (alphabetized)
use anyhow::Context;
use clap::Parser;
use tracing::{Level, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "element-template-updater")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration listing the endpoints to sync
    #[arg(long, global = true, default_value = "element-templates.toml")]
    config: PathBuf,

    /// Override the directory below which caches are stored
    #[arg(long, global = true)]
    user_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Fetch new and changed templates for one execution platform
    Update {
        /// Execution platform whose endpoints should be updated
        #[arg(long)]
        platform: String,
        /// Version of the execution platform, e.g. 8.8
        #[arg(long)]
        platform_version: String,
    },
    /// Show the cached templates of every configured endpoint
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with default level INFO
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config, cli.user_path.as_deref())?;
    let updater =
        TemplateUpdater::from_config(&config).context("Failed to initialize template updater")?;

    match &cli.command {
        Commands::Update {
            platform,
            platform_version,
        } => run_update(&updater, platform, platform_version).await,
        Commands::List => run_list(&updater).await,
    }
}

fn load_config(path: &Path, user_path: Option<&Path>) -> anyhow::Result<UpdaterConfig> {
    let mut config = UpdaterConfig::load(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;

    if let Some(user_path) = user_path {
        config.user_path = Some(user_path.to_path_buf());
    }

    Ok(config)
}

async fn run_update(
    updater: &TemplateUpdater,
    platform: &str,
    platform_version: &str,
) -> anyhow::Result<()> {
    info!(platform = %platform, version = %platform_version, "Starting template update");

    let result = updater.update(platform, platform_version).await;

    if result.has_new {
        println!("New templates available.");
    } else {
        println!("No new templates.");
    }

    if !result.warnings.is_empty() {
        println!("\n{} warning(s):", result.warnings.len());
        for warning in &result.warnings {
            println!("  • {}", warning);
        }
    }

    Ok(())
}

async fn run_list(updater: &TemplateUpdater) -> anyhow::Result<()> {
    if updater.endpoints().is_empty() {
        println!("No endpoints configured.");
        return Ok(());
    }

    for endpoint in updater.endpoints() {
        let path = updater.cache_file_path(endpoint);
        println!("{} [{}]", endpoint.url, endpoint.execution_platform);
        println!("  cache: {}", path.display());

        let templates = match updater.cached_templates(endpoint).await {
            Ok(templates) => templates,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read template cache");
                println!("  (unreadable: {})", e);
                continue;
            }
        };

        if templates.is_empty() {
            println!("  (no cached templates)");
        }
        for template in &templates {
            let id = template.id().unwrap_or("<no id>");
            let version = template
                .version()
                .map(|version| version.to_string())
                .unwrap_or_else(|| "?".to_string());
            match template.upstream_ref() {
                Some(reference) => println!("  {}@{} <- {}", id, version, reference),
                None => println!("  {}@{}", id, version),
            }
        }
    }

    Ok(())
}
