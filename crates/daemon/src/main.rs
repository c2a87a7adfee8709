//! Propscore Daemon - Main Entry Point
//! JSON-RPC server + scoring worker pool + lease recovery

mod settings;
mod logging;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use settings::{DaemonConfig, API_KEY_ENV};
use propscore_api_rpc::{RpcHandler, RpcServer, RpcServerConfig};
use propscore_core::application::{
    shutdown_channel, JobOptions, RecoveryService, RetryPolicy, ScoringEngine, ScoringJobHandler,
    ScoringOrchestrator, ScoringQueue, Worker,
};
use propscore_core::port::id_provider::UuidProvider;
use propscore_core::port::time_provider::SystemTimeProvider;
use propscore_core::port::{JobHandler, JobRepository, ScoreCache, TextGenerator, TimeProvider};
use propscore_infra_openai::OpenAiTextGenerator;
use propscore_infra_sqlite::{create_pool, run_migrations, SqliteJobRepository, SqliteScoreCache};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Configuration, then logging
    let cfg = DaemonConfig::load()?;
    let _log_guard = logging::init(cfg.log_format, cfg.log_dir.as_deref())?;

    info!(version = %propscore_core::VERSION, "Propscore daemon starting");

    // 2. Database
    if let Some(dir) = cfg.db_dir() {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let database_url = cfg.database_url();
    info!(database_url = %database_url, "Initializing database");
    let pool = create_pool(&database_url)
        .await
        .context("DB pool creation failed")?;
    run_migrations(&pool).await.context("Migration failed")?;

    // 3. Adapters
    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let job_repo: Arc<dyn JobRepository> =
        Arc::new(SqliteJobRepository::new(pool.clone(), time_provider.clone()));
    let cache: Arc<dyn ScoreCache> =
        Arc::new(SqliteScoreCache::new(pool.clone(), time_provider.clone()));

    if cfg.openai.api_key.is_empty() {
        warn!("{} is not set; scoring calls will fail", API_KEY_ENV);
    }
    let generator: Arc<dyn TextGenerator> = Arc::new(
        OpenAiTextGenerator::new(cfg.openai.clone()).context("Text generator setup failed")?,
    );

    // 4. Application services
    let engine = ScoringEngine::new(generator);
    let queue = Arc::new(ScoringQueue::new(
        cfg.queue.clone(),
        JobOptions {
            max_attempts: cfg.retry.max_attempts,
            backoff_factor: cfg.retry.backoff_factor,
        },
        job_repo.clone(),
        Arc::new(UuidProvider),
        time_provider.clone(),
    ));
    let orchestrator = Arc::new(ScoringOrchestrator::with_ttl_minutes(
        engine.clone(),
        cache.clone(),
        queue,
        cfg.cache_ttl_minutes,
    ));
    let handler: Arc<dyn JobHandler> = Arc::new(ScoringJobHandler::new(engine, cache.clone()));
    let retry_policy = Arc::new(RetryPolicy::new(
        time_provider.clone(),
        cfg.retry.base_delay_ms,
    ));

    let (shutdown_tx, shutdown_rx) = shutdown_channel();

    // 5. Lease recovery: once now, then periodically
    let recovery = RecoveryService::new(
        job_repo.clone(),
        handler.clone(),
        retry_policy.clone(),
        time_provider.clone(),
        cfg.lease_ms,
    );
    let recovery_interval = Duration::from_secs(cfg.recovery_interval_secs.max(1));
    let recovery_token = shutdown_rx.clone();
    let recovery_handle = tokio::spawn(async move {
        recovery.run(recovery_interval, recovery_token).await;
    });

    // 6. JSON-RPC server
    let rpc_server = RpcServer::new(
        RpcServerConfig {
            host: cfg.rpc_host.clone(),
            port: cfg.rpc_port,
        },
        RpcHandler::new(orchestrator, job_repo.clone(), cache, cfg.queue.clone()),
    );
    let (rpc_addr, rpc_handle) = rpc_server
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    // 7. Worker pool
    let worker = Arc::new(Worker::new(
        cfg.queue.clone(),
        job_repo,
        handler,
        retry_policy,
        time_provider,
    ));
    let worker_handles = worker.spawn_pool(cfg.workers, shutdown_rx);

    info!(
        rpc_addr = %rpc_addr,
        workers = cfg.workers,
        queue = %cfg.queue,
        "System ready"
    );

    // 8. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    // 9. Graceful shutdown: stop intake, let in-flight jobs finish
    shutdown_tx.shutdown();
    if let Err(e) = rpc_handle.stop() {
        warn!(error = %e, "RPC server already stopped");
    }
    let drain = async {
        for handle in worker_handles {
            match handle.await {
                Ok(Err(e)) => error!(error = %e, "Worker failed"),
                Err(e) => error!(error = %e, "Worker task aborted"),
                Ok(Ok(())) => {}
            }
        }
        let _ = recovery_handle.await;
    };
    if tokio::time::timeout(SHUTDOWN_GRACE, drain).await.is_err() {
        warn!("Workers did not stop within the grace period");
    }

    info!("Shutdown complete");
    Ok(())
}
