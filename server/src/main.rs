use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use orchestrator_core::executor::ExecutorConfig;
use orchestrator_core::health::HealthCheckerConfig;
use orchestrator_core::{Orchestrator, OrchestratorConfig};
use orchestrator_database::FileStore;
use orchestrator_protocol::handler::OrchestratorHandler;
use orchestrator_protocol::server::build_router;
use orchestrator_server::config::Config;
use orchestrator_server::init_telemetry;

#[derive(Parser)]
#[command(name = "orchestrator-server")]
#[command(about = "Agent orchestrator: routing, execution and workflow scheduling across domain agents")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Path to a TOML config file layered on top of the bundled defaults.
    #[arg(long, env = "CONFIG_FILE")]
    config_file: Option<String>,

    /// HTTP port to listen on, overriding configuration.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv::dotenv();
    let cli = Cli::parse();

    if let Some(config_file) = &cli.config_file {
        std::env::set_var("CONFIG_FILE", config_file);
    }

    let mut config = Config::from_env().context("failed to load configuration")?;
    if let Some(port) = cli.port {
        config.http_port = port;
    }
    config.validate().context("invalid configuration")?;

    init_telemetry(&config.log_level);
    info!(data_dir = %config.data_dir, http_address = %config.http_address(), "starting agent orchestrator");

    let state_store = FileStore::new(format!("{}/state", config.data_dir))
        .await
        .context("failed to open state store")?;
    let workflow_store = FileStore::new(format!("{}/workflows", config.data_dir))
        .await
        .context("failed to open workflow checkpoint store")?;

    let orchestrator_config = OrchestratorConfig {
        seed_default_agents: true,
        routing_rules: Vec::new(),
        executor: ExecutorConfig {
            default_timeout_seconds: config.executor.default_timeout_seconds,
            retry_base_delay_seconds: config.executor.retry_base_delay_seconds,
            retry_max_delay_seconds: config.executor.retry_max_delay_seconds,
            retry_backoff_factor: config.executor.retry_backoff_factor,
            max_history_records: config.executor.max_history_records,
        },
        health_checker: HealthCheckerConfig {
            cache_ttl_seconds: config.health_checker.cache_ttl_seconds as i64,
            check_timeout_seconds: config.health_checker.check_timeout_seconds,
            max_history_per_agent: config.health_checker.max_history_per_agent,
            max_total_history: config.health_checker.max_total_history,
        },
        router_max_history: 1_000,
    };

    let orchestrator = Orchestrator::new(
        Arc::new(state_store),
        Arc::new(workflow_store),
        orchestrator_config,
    );
    orchestrator
        .initialize()
        .await
        .context("failed to initialize orchestrator")?;

    let handler = OrchestratorHandler::new(Arc::new(orchestrator));
    let app = build_router(handler, &config.cors_origins);

    let listener = tokio::net::TcpListener::bind(config.http_address())
        .await
        .context("failed to bind http listener")?;
    info!(address = %config.http_address(), "listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "server exited with error");
        return Err(e.into());
    }

    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
