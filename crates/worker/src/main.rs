//! Job worker process: subscribes to the job channel, computes results, and
//! writes them to the durable table and the cache hash.

use std::sync::Arc;

use anyhow::{Context, bail};
use tracing::{error, info};

use fibdispatch_infra::{
    ConnectionState, establish,
    cache_store::{CacheStore, RedisCacheStore},
    config::Settings,
    event_bus::RedisPubSubJobBus,
    result_store::{PostgresResultStore, ResultStore},
    signal::shutdown_signal,
    workers::{JobWorker, run_subscribed},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fibdispatch_observability::init("fibdispatch-worker");

    let settings = Settings::from_env().context("invalid configuration")?;
    if !settings.use_persistent_stores {
        bail!("the standalone worker needs USE_PERSISTENT_STORES=true; the in-memory API runs its own worker");
    }
    let policy = settings.reconnect_policy();

    let results = Arc::new(PostgresResultStore::connect_lazy(
        settings.postgres.connect_options(),
    ));
    if let Err(e) = results.ensure_schema().await {
        error!(error = %e, "error creating result table");
    }

    let redis_url = settings.redis.url();
    let cache = Arc::new(RedisCacheStore::new(&redis_url, &settings.results_key)?);
    let bus = RedisPubSubJobBus::new(&redis_url, &settings.job_channel)?;

    let cache_state = ConnectionState::new("redis cache");
    establish(&cache_state, &policy, || cache.connect())
        .await
        .context("worker failed to start")?;

    let subscriber_state = ConnectionState::new("redis subscriber");
    info!(channel = %settings.job_channel, "listening for jobs");

    // Resubscribes after a dropped pub/sub connection; exits non-zero once
    // the reconnect policy gives up.
    let outcome = run_subscribed(
        JobWorker::new(results.clone(), cache.clone()),
        "fibdispatch-worker",
        &bus,
        &subscriber_state,
        &policy,
        async {
            shutdown_signal().await;
            info!("shutting down");
        },
    )
    .await;

    // Subscription is already closed; cache next, then durable store.
    cache.close().await;
    results.close().await;

    let stats = outcome.context("job subscription lost")?;
    info!(
        received = stats.received,
        succeeded = stats.succeeded,
        failed = stats.failed,
        "worker exited"
    );
    Ok(())
}
