//! skillchatd - skill-aware chat orchestration daemon
//!
//! Main entry point for the daemon binary.

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::path::PathBuf;

use clap::Parser;
use skillchat_core::Config;
use skillchatd::Daemon;
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "skillchatd", about = "Skill-aware chat orchestration daemon", version)]
struct Cli {
    /// Host to bind (overrides WEB_APP_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides WEB_APP_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Env file to load before reading the process environment
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    // Initialize tracing.
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = match Config::load(Some(&cli.env_file)) {
        Ok(config) => config,
        Err(e) => {
            error!("failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    let daemon = match Daemon::from_config(&config) {
        Ok(daemon) => daemon,
        Err(e) => {
            error!("configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Run the async main.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to create tokio runtime");

    runtime.block_on(async {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm =
                signal(SignalKind::terminate()).expect("failed to register SIGTERM handler");
            let mut sigint =
                signal(SignalKind::interrupt()).expect("failed to register SIGINT handler");

            let shutdown = async {
                tokio::select! {
                    _ = sigint.recv() => tracing::info!("received SIGINT, initiating graceful shutdown"),
                    _ = sigterm.recv() => tracing::info!("received SIGTERM, initiating graceful shutdown"),
                }
                daemon.shutdown();
                std::future::pending::<()>().await;
            };

            tokio::select! {
                result = daemon.run() => {
                    if let Err(e) = result {
                        error!("daemon error: {}", e);
                        std::process::exit(1);
                    }
                }
                () = shutdown => {}
            }
        }

        #[cfg(not(unix))]
        {
            let shutdown = async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("received SIGINT, initiating graceful shutdown");
                daemon.shutdown();
                std::future::pending::<()>().await;
            };

            tokio::select! {
                result = daemon.run() => {
                    if let Err(e) = result {
                        error!("daemon error: {}", e);
                        std::process::exit(1);
                    }
                }
                () = shutdown => {}
            }
        }
    });
}
