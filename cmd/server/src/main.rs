//! voxgender-server - HTTP endpoint for voice gender classification.

mod server;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use voxgender_classify::{DecisionEngine, DenseModel};

/// HTTP service that classifies the speaker gender of uploaded audio clips.
///
/// The classifier weights are loaded once at startup. When loading fails the
/// server still comes up and answers health checks, but every prediction
/// request fails fast until the artifact is fixed and the process restarted.
#[derive(Parser, Debug)]
#[command(name = "voxgender-server")]
#[command(about = "Voice gender classification HTTP service")]
struct Args {
    /// Listen address
    #[arg(long, default_value = "0.0.0.0:5000")]
    addr: String,

    /// Classifier weights artifact (JSON)
    #[arg(long, default_value = "models/gender.json")]
    model: PathBuf,

    /// Directory for temporary uploads
    #[arg(long, default_value = "uploads")]
    upload_dir: PathBuf,

    /// Verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    let engine = match DenseModel::load(&args.model) {
        Ok(model) => {
            let engine = DecisionEngine::new(Arc::new(model));
            info!("classifier ready ({} feature inputs)", engine.input_width());
            Some(Arc::new(engine))
        }
        Err(e) => {
            error!(
                "cannot load classifier from {}: {e}; predictions disabled",
                args.model.display()
            );
            None
        }
    };

    std::fs::create_dir_all(&args.upload_dir)?;

    server::serve(&args.addr, engine, args.upload_dir).await
}
