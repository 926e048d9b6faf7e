//! CLI entrypoint for magi-quorum
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use clap::Parser;
use magi_application::{
    AggregateResultsUseCase, DispatchReviewUseCase, ExecuteJudgementUseCase, JudgeWorkerPool,
    TransportFabric,
};
use magi_infrastructure::{
    ConfigLoader, FileConfig, InMemoryTransport, OpenAiGateway, StaticJudgeDirectory,
};
use magi_presentation::{Cli, Command, GatewayState, TokenAuthority, gateway};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level; RUST_LOG wins when set
    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_ref());
        return Ok(());
    }

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref())
            .map_err(|e| anyhow!("Failed to load configuration: {}", e))?
    };
    config.validate().context("Invalid configuration")?;

    match cli.command() {
        Command::Token { app_id } => {
            let authority =
                TokenAuthority::new(config.gateway.secret.clone(), config.gateway.token_window_secs);
            println!("{}", authority.current_token(&app_id, Utc::now()));
            Ok(())
        }
        Command::Serve { host, port } => {
            let mut config = config;
            if let Some(host) = host {
                config.gateway.host = host;
            }
            if let Some(port) = port {
                config.gateway.port = port;
            }
            serve(config).await
        }
    }
}

async fn serve(config: FileConfig) -> Result<()> {
    info!("Starting magi-quorum");

    if config.gateway.uses_default_secret() {
        warn!("gateway.secret is the built-in development secret; set MAGI_GATEWAY__SECRET");
    }

    // === Dependency Injection ===
    let transport = Arc::new(InMemoryTransport::new());
    let directory = Arc::new(StaticJudgeDirectory::new(config.judge_configs()));
    let api_key = config.provider.resolve_api_key();
    if api_key.is_none() {
        warn!(
            "No API key found in {}; model calls are sent unauthenticated",
            config.provider.api_key_env
        );
    }
    let llm = Arc::new(
        OpenAiGateway::new(
            config.provider.base_url.clone(),
            api_key,
            config.provider.model.clone(),
        )
        .with_max_tokens(config.provider.max_tokens),
    );

    let dispatcher = Arc::new(DispatchReviewUseCase::new(
        transport.clone(),
        directory.clone(),
        config.dispatch.to_params(),
    ));
    let aggregator = Arc::new(AggregateResultsUseCase::new(
        transport.clone(),
        config.aggregator.to_params(),
    ));
    let pool = Arc::new(JudgeWorkerPool::new(
        transport.clone(),
        ExecuteJudgementUseCase::new(llm, config.workers.to_params()),
    ));

    info!(
        "Judge panel: {}",
        directory
            .all()
            .iter()
            .filter(|judge| judge.active)
            .map(|judge| format!("{} (weight {})", judge.display_name(), judge.weight))
            .collect::<Vec<_>>()
            .join(", ")
    );

    let cancel = CancellationToken::new();
    let mut components = JoinSet::new();
    {
        let (dispatcher, cancel) = (dispatcher.clone(), cancel.clone());
        components.spawn(async move { dispatcher.run(cancel).await });
    }
    {
        let (aggregator, cancel) = (aggregator.clone(), cancel.clone());
        components.spawn(async move { aggregator.run(cancel).await });
    }
    {
        let (aggregator, cancel) = (aggregator.clone(), cancel.clone());
        components.spawn(async move { aggregator.run_sweeper(cancel).await });
    }
    {
        let (pool, cancel) = (pool.clone(), cancel.clone());
        components.spawn(async move { pool.run(cancel).await });
    }

    {
        let cancel = cancel.clone();
        let transport = transport.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown requested");
            }
            cancel.cancel();
            transport.close();
        });
    }

    let fabric: Arc<dyn TransportFabric> = transport.clone();
    let state = GatewayState::new(
        fabric,
        TokenAuthority::new(config.gateway.secret.clone(), config.gateway.token_window_secs),
        cancel.clone(),
    );

    let served = gateway::serve(&config.gateway.bind_address(), state).await;

    // Stop the pipeline once the gateway has returned
    cancel.cancel();
    transport.close();
    while let Some(joined) = components.join_next().await {
        if let Err(e) = joined {
            error!("Pipeline component failed: {}", e);
        }
    }

    served.with_context(|| format!("Gateway failed on {}", config.gateway.bind_address()))?;
    info!("magi-quorum stopped");
    Ok(())
}
