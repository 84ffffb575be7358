mod args;
mod logging;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use sha2::{Digest, Sha256};
use tracing::{error, info, warn};

use hlspack_core::{
    load_config, metrics, preflight, validate_config, AssetProcessor, FfmpegPackager,
    IdentityAssigner, PipelineRunner, StateStore, Workspace,
};

use args::Cli;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exit status when at least one asset ended in final failure.
const EXIT_ASSET_FAILURES: u8 = 1;
/// Exit status when the run could not start or had to abort.
const EXIT_FATAL: u8 = 2;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            if tracing::dispatcher::has_been_set() {
                error!("Fatal error: {:#}", e);
            } else {
                eprintln!("Fatal error: {:#}", e);
            }
            ExitCode::from(EXIT_FATAL)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = load_config(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("Failed to load config from {}", path.display()),
        None => "Failed to load config".to_string(),
    })?;
    cli.apply(&mut config);
    validate_config(&config).context("Configuration validation failed")?;

    let workspace = Workspace::new(&config.workspace.root);
    workspace
        .ensure_dirs()
        .with_context(|| format!("Failed to prepare workspace {}", workspace.root().display()))?;
    logging::init(&workspace.log_path(), cli.verbose)?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!("hlspack {} (config {})", VERSION, &config_hash[..16]);

    let packager = Arc::new(FfmpegPackager::new(config.toolchain.clone()));
    let key = preflight(packager.as_ref(), &workspace)
        .await
        .context("Preflight failed")?;
    info!("Key URI: {}", key.key_uri());

    let state = StateStore::open(workspace.state_path()).context("Failed to open state")?;
    let processor = AssetProcessor::new(
        config.packaging.clone(),
        packager,
        workspace,
        key,
        IdentityAssigner::new(&config.identity),
        state,
    );
    let mut runner = PipelineRunner::new(processor);
    let result = runner.run(cli.run_options()).await;

    if let Some(path) = &config.metrics.textfile {
        match metrics::write_textfile(path) {
            Ok(()) => info!("Metrics written to {}", path.display()),
            Err(e) => warn!("Failed to write metrics to {}: {}", path.display(), e),
        }
    }

    let summary = result.context("Run aborted")?;
    if summary.has_failures() {
        Ok(ExitCode::from(EXIT_ASSET_FAILURES))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
