//! Several workers draining one SQLite queue

use async_trait::async_trait;
use propscore_core::application::{
    shutdown_channel, JobOptions, RetryPolicy, ScoringQueue, Worker, DEFAULT_QUEUE,
};
use propscore_core::domain::{Job, JobState, PropertyId, ScoringJob};
use propscore_core::port::id_provider::UuidProvider;
use propscore_core::port::time_provider::SystemTimeProvider;
use propscore_core::port::{JobFailure, JobHandler, JobRepository};
use propscore_infra_sqlite::{create_pool, run_migrations, SqliteJobRepository};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const JOBS: usize = 20;
const WORKERS: usize = 4;

#[derive(Default)]
struct RecordingHandler {
    seen: Mutex<HashMap<String, usize>>,
}

#[async_trait]
impl JobHandler for RecordingHandler {
    async fn handle(&self, job: &Job) -> Result<(), JobFailure> {
        tokio::time::sleep(Duration::from_millis(5)).await;
        *self.seen.lock().unwrap().entry(job.id.clone()).or_default() += 1;
        Ok(())
    }
}

/// Every job is claimed by exactly one worker
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pool_handles_each_job_once() {
    let path = std::env::temp_dir().join(format!("propscore-pool-{}.db", std::process::id()));
    let pool = create_pool(&format!("sqlite://{}", path.display()))
        .await
        .unwrap();
    run_migrations(&pool).await.unwrap();

    let clock = Arc::new(SystemTimeProvider);
    let job_repo = Arc::new(SqliteJobRepository::new(pool.clone(), clock.clone()));
    let queue = ScoringQueue::new(
        DEFAULT_QUEUE,
        JobOptions::default(),
        job_repo.clone(),
        Arc::new(UuidProvider),
        clock.clone(),
    );

    for i in 0..JOBS {
        let id = format!("p-{}", i);
        let job = ScoringJob {
            property_id: PropertyId::new(json!(id)).unwrap(),
            filter: serde_json::from_value(json!({"budget": 400000})).unwrap(),
            property: serde_json::from_value(json!({"id": id})).unwrap(),
        };
        queue.enqueue(&job).await.unwrap();
    }

    let handler = Arc::new(RecordingHandler::default());
    let worker = Arc::new(Worker::new(
        DEFAULT_QUEUE,
        job_repo.clone(),
        handler.clone(),
        Arc::new(RetryPolicy::new(clock.clone(), 1000)),
        clock,
    ));

    let (shutdown, token) = shutdown_channel();
    let handles = worker.spawn_pool(WORKERS, token);
    assert_eq!(handles.len(), WORKERS);

    let drained = tokio::time::timeout(Duration::from_secs(15), async {
        loop {
            let done = job_repo
                .count_by_state(DEFAULT_QUEUE, JobState::Done)
                .await
                .unwrap();
            if done as usize == JOBS {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;
    assert!(drained.is_ok(), "queue was not drained in time");

    shutdown.shutdown();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let seen = handler.seen.lock().unwrap().clone();
    assert_eq!(seen.len(), JOBS);
    assert!(seen.values().all(|&count| count == 1));

    pool.close().await;
    for suffix in ["", "-wal", "-shm"] {
        std::fs::remove_file(format!("{}{}", path.display(), suffix)).ok();
    }
}
