use std::sync::Arc;

use grading_cluster::client::PeriodicRequester;
use grading_cluster::config::{Config, Role};
use grading_cluster::grading::answers::AnswerStore;
use grading_cluster::grading::handlers::process_request;
use grading_cluster::pool::executor::TaskPool;
use grading_cluster::server::service::TcpServer;
use grading_cluster::server::shutdown::GracefulShutdown;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_max_level(if config.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    match config.role {
        Role::Worker => run_worker(&config).await,
        Role::Orchestrator => run_orchestrator(&config).await,
    }
}

/// Worker role: serve the grading command protocol until a termination
/// signal, then drain in-flight connections and exit.
async fn run_worker(config: &Config) -> anyhow::Result<()> {
    tracing::info!("Starting worker on port {}", config.port);

    let answers = Arc::new(AnswerStore::new());

    let pool_threads = std::thread::available_parallelism().map_or(1, |n| n.get());
    let mut server = TcpServer::new(TaskPool::new(pool_threads));

    let handler_store = answers.clone();
    server.set_task(move |request| process_request(&handler_store, &request));

    let server = Arc::new(server);
    server.clone().start(config.port).await?;

    GracefulShutdown::spawn(server.clone());

    server.wait_drained().await;
    tracing::info!("Worker exited cleanly");
    Ok(())
}

/// Orchestrator role: fire a periodic echo request at the configured
/// worker until a termination signal arrives.
async fn run_orchestrator(config: &Config) -> anyhow::Result<()> {
    let host = config
        .host
        .clone()
        .ok_or_else(|| anyhow::anyhow!("HOST is required for the orchestrator role"))?;
    tracing::info!("Starting orchestrator against {}:{}", host, config.port);

    let requester = PeriodicRequester::new(host, config.port);
    tokio::select! {
        _ = requester.run() => unreachable!("the periodic requester never returns"),
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("Received termination signal, orchestrator exiting");
        }
    }
    Ok(())
}
