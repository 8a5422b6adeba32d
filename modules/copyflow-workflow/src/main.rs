use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use copyflow_common::{load_config, resolve_relative, AppConfig, JsonCatalog};
use copyflow_workflow::{export, export_to_dir, DifyContentService, WorkflowOrchestrator, WorkflowSettings};

#[derive(Parser)]
#[command(name = "copyflow", about = "Scenario-driven copy generation with validation gates")]
struct Cli {
    /// Path to config TOML file
    #[arg(long, default_value = "./config/copyflow.toml")]
    config: PathBuf,

    /// Persona preset from the config file
    #[arg(long)]
    preset: String,

    /// Topic seed for scenario generation
    #[arg(long, default_value = "")]
    input: String,

    /// Override `[workflow] max_retries`
    #[arg(long)]
    max_retries: Option<u32>,

    /// Export to this file instead of a timestamped file in the output dir
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("copyflow=info".parse()?)
                .add_directive("dify_client=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    info!(preset = cli.preset.as_str(), "Copyflow starting...");

    let config = AppConfig::from_env()?;
    let file_config = load_config(&cli.config)?;
    let preset = file_config.preset(&cli.preset)?;

    let catalog = match &file_config.catalog {
        Some(catalog) => JsonCatalog::load(&resolve_relative(&cli.config, &catalog.path))?,
        None => {
            info!("No catalog configured, recommendations will be empty");
            JsonCatalog::empty()
        }
    };

    let settings = WorkflowSettings::builder()
        .persona(preset.persona.clone())
        .max_retries(cli.max_retries.unwrap_or(file_config.workflow.max_retries))
        .product_code(preset.product_code.clone())
        .build();

    let orchestrator = WorkflowOrchestrator::new(
        Arc::new(DifyContentService::from_config(&config)),
        Arc::new(catalog),
        settings,
    );

    let summary = orchestrator.run(&cli.input).await?;
    info!(run_id = %summary.run_id, scenarios = summary.scenarios, "Run finished");
    println!("{}", orchestrator.collector().stats());

    let records = orchestrator.collector().records();
    let written = match &cli.output {
        Some(path) => export(&records, path)?,
        None => export_to_dir(&records, &file_config.workflow.output_dir)?,
    };
    match written {
        Some(path) => info!(path = %path.display(), "Export written"),
        None => info!("Nothing to export"),
    }

    Ok(())
}
