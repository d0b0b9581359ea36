//! robot-mock-worker: impersonates a laboratory robot on a topic-routed
//! AMQP bus so a controller can be exercised without physical hardware.
//!
//! # Usage
//!
//! ```bash
//! BIC_ROBOT_CONFIG=./robot_worker.toml robot-mock-worker
//! ROBOT_ID=bic_robot_02 FAILURE_RATE=0.2 robot-mock-worker
//! ```
//!
//! # Environment Variables
//!
//! - `BIC_ROBOT_CONFIG`: path to a TOML config file
//! - `ROBOT_ID`, `FAILURE_RATE`, `TIMEOUT_RATE`: individual overrides
//! - `RUST_LOG`: logging level (default: info)

use anyhow::{Context, Result};
use bic_robot_mock::amqp::lapin_client;
use bic_robot_mock::config::{self, AppConfig};
use bic_robot_mock::dispatch::Dispatcher;
use bic_robot_mock::heartbeat;
use bic_robot_mock::world::WorldModel;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "robot-mock-worker")]
#[command(about = "Mock laboratory robot worker")]
#[command(version)]
struct CliArgs {
    /// Path to a TOML config file, overriding BIC_ROBOT_CONFIG
    #[arg(long)]
    config: Option<String>,

    /// Override the configured robot id
    #[arg(long)]
    robot_id: Option<String>,

    /// Seconds to wait for in-flight long-running tasks during shutdown
    #[arg(long, default_value_t = 10)]
    shutdown_deadline_secs: u64,
}

#[derive(Debug, Clone, Copy)]
enum TaskName {
    CommandConsumer,
    Heartbeat,
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskName::CommandConsumer => write!(f, "CommandConsumer"),
            TaskName::Heartbeat => write!(f, "Heartbeat"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    if let Some(path) = &args.config {
        std::env::set_var("BIC_ROBOT_CONFIG", path);
    }

    let mut app_config = AppConfig::load().context("failed to load configuration")?;
    if let Some(robot_id) = args.robot_id {
        app_config.robot_id = robot_id;
    }
    config::init(app_config.clone());

    info!(robot_id = %app_config.robot_id, exchange = %app_config.broker.exchange, "starting robot-mock-worker");

    let world = Arc::new(WorldModel::new());
    let cancel = CancellationToken::new();

    let (exchange, mut command_source) = lapin_client::connect(&app_config.broker, &app_config.robot_id)
        .await
        .context("failed to connect to broker")?;
    let exchange: Arc<dyn bic_robot_mock::amqp::ExchangeClient> = Arc::new(exchange);

    let dispatcher = Arc::new(Dispatcher::new(world.clone(), exchange.clone(), &app_config, cancel.clone()));

    let mut tasks: JoinSet<Result<TaskName>> = JoinSet::new();

    let consumer_dispatcher = dispatcher.clone();
    let consumer_cancel = cancel.clone();
    tasks.spawn(async move {
        info!("[CommandConsumer] task starting");
        loop {
            tokio::select! {
                _ = consumer_cancel.cancelled() => {
                    info!("[CommandConsumer] shutdown signal received");
                    return Ok(TaskName::CommandConsumer);
                }
                delivery = command_source.next() => {
                    match delivery {
                        Some(delivery) => {
                            let body = delivery.body.clone();
                            consumer_dispatcher.handle(&body).await;
                            if let Err(e) = delivery.ack().await {
                                warn!(error = %e, "failed to ack command delivery");
                            }
                        }
                        None => {
                            error!("[CommandConsumer] command stream ended unexpectedly");
                            return Err(anyhow::anyhow!("command stream ended"));
                        }
                    }
                }
            }
        }
    });

    let heartbeat_world = world.clone();
    let heartbeat_exchange = exchange.clone();
    let heartbeat_robot_id = app_config.robot_id.clone();
    let heartbeat_interval = app_config.behavior.heartbeat_interval_seconds;
    let heartbeat_cancel = cancel.clone();
    tasks.spawn(async move {
        info!("[Heartbeat] task starting");
        heartbeat::run(heartbeat_world, heartbeat_exchange, heartbeat_robot_id, heartbeat_interval, heartbeat_cancel).await;
        Ok(TaskName::Heartbeat)
    });

    let shutdown_cancel = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("received ctrl-c, initiating shutdown");
        shutdown_cancel.cancel();
    });

    let run_result = loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("supervisor: shutdown signal received");
                break Ok(());
            }
            result = tasks.join_next() => {
                match result {
                    Some(Ok(Ok(name))) => {
                        info!(task = %name, "supervisor: task completed normally");
                    }
                    Some(Ok(Err(e))) => {
                        error!(error = %e, "supervisor: task failed");
                        cancel.cancel();
                        break Err(e);
                    }
                    Some(Err(e)) => {
                        error!(error = %e, "supervisor: task panicked");
                        cancel.cancel();
                        break Err(anyhow::anyhow!("task panicked: {e}"));
                    }
                    None => {
                        info!("supervisor: all tasks completed");
                        break Ok(());
                    }
                }
            }
        }
    };

    dispatcher.shutdown(Duration::from_secs(args.shutdown_deadline_secs)).await;
    tasks.abort_all();
    while tasks.join_next().await.is_some() {}

    info!("robot-mock-worker shutdown complete");
    run_result
}
