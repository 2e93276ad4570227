mod api;
mod controller;
mod logging;
mod metrics;
mod telegram;

use std::future::Future;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use vidconv_core::{
    load_config, validate_config, Config, ConvertService, FfmpegTranscoder, ReplyPresenter,
    SanitizedConfig, Transcoder,
};

use controller::Controller;
use logging::init_logging;
use telegram::{TelegramApi, TelegramTransport};

#[derive(Parser)]
#[command(name = "video-conv-bot", version, about = "Telegram bot that converts videos to mp4")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(
        long,
        global = true,
        env = "VIDCONV_CONFIG",
        default_value = "config.toml"
    )]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot until interrupted.
    Run,
    /// Load and validate the configuration, then exit.
    Check,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run => run(&cli.config).await,
        Commands::Check => check(&cli.config),
    };

    // Logging may not be installed yet, so report on stderr.
    if let Err(e) = result {
        eprintln!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn load_checked_config(path: &Path) -> Result<Config> {
    let config =
        load_config(path).with_context(|| format!("Failed to load config from {:?}", path))?;
    validate_config(&config).context("Configuration validation failed")?;
    Ok(config)
}

fn check(path: &Path) -> Result<()> {
    let config = load_checked_config(path)?;
    let sanitized = serde_json::to_string_pretty(&SanitizedConfig::from(&config))
        .context("Failed to render configuration")?;
    println!("{}", sanitized);
    Ok(())
}

async fn run(config_path: &Path) -> Result<()> {
    let config = load_checked_config(config_path)?;
    init_logging(&config.logging)?;

    info!("Configuration loaded from {:?}", config_path);
    info!(config = ?SanitizedConfig::from(&config), "Effective configuration");

    tokio::fs::create_dir_all(&config.convert.storage_path)
        .await
        .with_context(|| {
            format!(
                "Failed to create storage directory {:?}",
                config.convert.storage_path
            )
        })?;

    // Transcoder
    let transcoder = Arc::new(FfmpegTranscoder::new(config.transcoder.clone()));
    transcoder
        .validate()
        .await
        .context("Transcoder is not usable")?;
    info!(transcoder = transcoder.name(), "Transcoder ready");

    // Telegram
    let bot_api =
        Arc::new(TelegramApi::new(&config.telegram).context("Failed to create Telegram client")?);
    let bot = bot_api
        .get_me()
        .await
        .context("Failed to authenticate Telegram bot")?;
    info!(
        bot_id = bot.id,
        bot_username = bot.username.as_deref().unwrap_or("unknown"),
        "Telegram bot authenticated"
    );

    // Engine and presenter
    let service = Arc::new(
        ConvertService::new(config.convert.clone(), transcoder)
            .context("Failed to create conversion service")?,
    );
    let transport = Arc::new(TelegramTransport::new(Arc::clone(&bot_api)));
    let presenter = Arc::new(ReplyPresenter::new(transport, config.templates.clone()));
    let controller = Arc::new(Controller::new(
        bot_api,
        service,
        presenter,
        config.telegram.update_timeout_secs,
    ));

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        let shutdown = shutdown_signal();
        async move {
            shutdown.await;
            info!("Shutdown signal received");
            cancel.cancel();
        }
    });

    let metrics_server = if config.metrics.enabled {
        let addr = SocketAddr::new(config.metrics.host, config.metrics.port);
        let listener = api::bind(addr).await?;
        Some(tokio::spawn(api::serve(listener, cancel.child_token())))
    } else {
        info!("Metrics server disabled in config");
        None
    };

    controller.run(cancel.clone()).await;
    cancel.cancel();

    if let Some(handle) = metrics_server {
        handle.await.context("Metrics server task failed")??;
    }

    info!("Bot stopped");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
///
/// The SIGTERM handler is installed before this returns.
fn shutdown_signal() -> impl Future<Output = ()> {
    #[cfg(unix)]
    let sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(sigterm) => Some(sigterm),
        Err(e) => {
            warn!(error = %e, "Failed to install SIGTERM handler");
            None
        }
    };

    async move {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async move {
            match sigterm {
                Some(mut sigterm) => {
                    sigterm.recv().await;
                }
                None => std::future::pending::<()>().await,
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
    }
}
