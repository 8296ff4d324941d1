pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod entities;
pub mod scheduler;
pub mod services;
pub mod state;

use std::sync::Arc;
use tokio::signal;

use anyhow::Context;
use clap::Parser;
pub use config::Config;
use scheduler::Sweeper;
use state::SharedState;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Credentials written by `init-db`. Rotate immediately after bootstrap.
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "123456";

pub async fn run() -> anyhow::Result<()> {
    let config = Config::load()?;
    config.validate()?;

    let prometheus_handle = if config.observability.metrics_enabled {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let builder = PrometheusBuilder::new();
        let handle = builder
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        info!("Prometheus metrics recorder initialized");
        Some(handle)
    } else {
        None
    };

    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let fmt_layer = tracing_subscriber::fmt::layer();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    if config.observability.loki_enabled {
        let url = url::Url::parse(&config.observability.loki_url).context("Invalid Loki URL")?;

        let (layer, task) = tracing_loki::builder()
            .label("app", "tokengate")?
            .extra_field("env", "production")?
            .build_url(url)?;

        tokio::spawn(task);

        registry.with(layer).init();
        info!(
            "Loki logging initialized at {}",
            config.observability.loki_url
        );
    } else {
        registry.init();
    }

    let cli = cli::Cli::parse();

    match cli.command {
        Some(cli::Commands::Sweep) => run_single_sweep(config).await,
        Some(cli::Commands::InitDb) => run_init_db(config).await,
        Some(cli::Commands::Daemon) | None => run_daemon(config, prometheus_handle).await,
    }
}

async fn run_daemon(
    config: Config,
    prometheus_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
) -> anyhow::Result<()> {
    info!(
        "Tokengate v{} starting in daemon mode...",
        env!("CARGO_PKG_VERSION")
    );

    let shared = Arc::new(SharedState::new(config.clone()).await?);
    let api_state = api::create_app_state(shared.clone(), prometheus_handle);

    let sweeper = Arc::new(Sweeper::new((*shared).clone(), config.scheduler.clone()));

    let sweeper_handle = {
        let sweeper = Arc::clone(&sweeper);
        tokio::spawn(async move {
            if let Err(e) = sweeper.start().await {
                error!("Sweeper error: {}", e);
            }
        })
    };

    let server_handle: Option<tokio::task::JoinHandle<()>> = if config.server.enabled {
        let port = config.server.port;
        info!("Starting Web API on port {}", port);

        let app = api::router(api_state).await;
        let addr = format!("0.0.0.0:{}", port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        Some(tokio::spawn(async move {
            info!("Web server running at http://0.0.0.0:{}", port);
            if let Err(e) = axum::serve(listener, app).await {
                error!("Web server error: {}", e);
            }
        }))
    } else {
        None
    };

    info!("Daemon running. Press Ctrl+C to stop.");

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
        }
        Err(e) => {
            error!("Error listening for shutdown: {}", e);
        }
    }

    // Stop the sweeper deterministically before tearing the tasks down.
    sweeper.stop().await;
    sweeper_handle.abort();
    if let Some(handle) = server_handle {
        handle.abort();
    }
    info!("Daemon stopped");

    Ok(())
}

async fn run_single_sweep(config: Config) -> anyhow::Result<()> {
    let shared = SharedState::new(config.clone()).await?;
    let sweeper = Sweeper::new(shared, config.scheduler);

    let removed = sweeper.run_once().await?;

    println!("Sweep complete. {} expired user(s) removed.", removed);

    Ok(())
}

async fn run_init_db(config: Config) -> anyhow::Result<()> {
    let store = db::Store::new(&config.general.database_url).await?;

    store
        .reset_admin(
            DEFAULT_ADMIN_USERNAME,
            DEFAULT_ADMIN_PASSWORD,
            &config.security,
        )
        .await?;

    println!("✓ Database initialized.");
    println!(
        "  Admin account reset to '{}' with the default password.",
        DEFAULT_ADMIN_USERNAME
    );
    println!("  Change it with POST /admin/password after logging in.");

    Ok(())
}
