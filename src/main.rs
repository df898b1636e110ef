//! Reality Glitcher server binary

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use reality_glitcher::api::{self, AppContext};
use reality_glitcher::effects::EffectRegistry;
use reality_glitcher::ml;
use reality_glitcher::network::VirtualCamera;
use reality_glitcher::settings::AppSettings;
use reality_glitcher::telemetry::init_logging;

#[derive(Parser, Debug)]
#[command(name = "reality-glitcher", version)]
#[command(about = "Gesture-driven real-time video effects server")]
struct Cli {
    /// Settings file (default: <config>/RealityGlitcher/settings.xml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Gesture mapping document
    #[arg(long)]
    mappings: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Write the effective settings back to the settings file and exit
    #[arg(long)]
    save_config: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = AppSettings::load(cli.config.as_deref());
    if let Some(host) = cli.host {
        settings.host = host;
    }
    if let Some(port) = cli.port {
        settings.port = port;
    }
    if let Some(mappings) = cli.mappings {
        settings.mapping_path = Some(mappings);
    }
    if cli.json_logs {
        settings.logging.json_format = true;
    }
    settings.sanitize();

    // Keep the guard alive for the program duration
    let _log_guard = match init_logging(&settings.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            None
        }
    };

    tracing::info!("Reality Glitcher v{}", env!("CARGO_PKG_VERSION"));

    if cli.save_config {
        let saved = match &cli.config {
            Some(path) => settings.save_to_file(path),
            None => settings.save(),
        };
        saved.context("failed to save settings")?;
        tracing::info!("Settings saved");
        return Ok(());
    }

    if !ml::create_detector().is_available() {
        tracing::warn!("No server-side landmark backend; gestures require client-supplied landmarks");
    }

    let registry = EffectRegistry::load(&settings.mapping_path());
    let virtual_camera = VirtualCamera::start(settings.virtual_camera.clone());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("glitcher-worker")
        .build()
        .context("failed to build tokio runtime")?;

    let ctx = Arc::new(AppContext::new(settings, registry, virtual_camera));

    runtime.block_on(async move {
        api::run_server(ctx, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutdown requested");
        })
        .await
        .context("API server failed")
    })?;

    tracing::info!("Reality Glitcher stopped");
    Ok(())
}
