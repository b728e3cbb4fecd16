//! Backend wiring for the HTTP API.
//!
//! Two modes, chosen by `USE_PERSISTENT_STORES`:
//!
//! - **Persistent**: Postgres results, Redis cache hash, Redis pub/sub bus.
//!   Redis connections are established in the background; until they are,
//!   the readiness gate makes dependent endpoints answer 503.
//! - **In-memory** (dev/test): in-memory stores and bus, plus a job worker
//!   running in-process so submissions complete without external services.

use std::sync::Arc;

use tokio::sync::Mutex;

use fibdispatch_events::{InMemoryJobBus, JobBus, JobMessage};
use fibdispatch_infra::{
    IngressService, ReadinessGate,
    cache_store::{CacheStore, InMemoryCacheStore},
    config::Settings,
    result_store::{InMemoryResultStore, ResultStore},
    workers::{JobWorker, JobWorkerHandle},
};

#[cfg(feature = "redis")]
use fibdispatch_infra::{
    ConnectionState, ReconnectPolicy,
    cache_store::RedisCacheStore,
    establish,
    event_bus::RedisPubSubJobBus,
    result_store::PostgresResultStore,
};

enum Backend {
    InMemory {
        worker: Mutex<Option<JobWorkerHandle>>,
    },
    #[cfg(feature = "redis")]
    Persistent {
        bus: Arc<RedisPubSubJobBus>,
        connector: tokio::task::JoinHandle<()>,
    },
}

pub struct AppServices {
    ingress: IngressService,
    results: Arc<dyn ResultStore>,
    cache: Arc<dyn CacheStore>,
    backend: Backend,
}

impl core::fmt::Debug for AppServices {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mode = match self.backend {
            Backend::InMemory { .. } => "in_memory",
            #[cfg(feature = "redis")]
            Backend::Persistent { .. } => "persistent",
        };
        f.debug_struct("AppServices")
            .field("mode", &mode)
            .field("ingress", &self.ingress)
            .finish()
    }
}

impl AppServices {
    /// In-memory backend with an in-process worker; every connection ready.
    pub async fn in_memory() -> anyhow::Result<Self> {
        Self::in_memory_with_gate(ReadinessGate::always_ready()).await
    }

    /// In-memory backend behind an explicit readiness gate.
    pub async fn in_memory_with_gate(gate: ReadinessGate) -> anyhow::Result<Self> {
        let results: Arc<dyn ResultStore> = Arc::new(InMemoryResultStore::new());
        let cache: Arc<dyn CacheStore> = Arc::new(InMemoryCacheStore::new());
        let bus: Arc<InMemoryJobBus<JobMessage>> = Arc::new(InMemoryJobBus::new());

        // Subscribe before serving so no submission is published into the void.
        let subscription = bus.subscribe().await?;
        let worker = JobWorker::new(results.clone(), cache.clone()).spawn("in-process-worker", subscription);

        let ingress = IngressService::new(results.clone(), cache.clone(), bus, gate);

        Ok(Self {
            ingress,
            results,
            cache,
            backend: Backend::InMemory {
                worker: Mutex::new(Some(worker)),
            },
        })
    }

    pub fn ingress(&self) -> &IngressService {
        &self.ingress
    }

    /// Stop background work and close connections in order:
    /// worker or connector, bus, cache, durable store.
    pub async fn shutdown(&self) {
        match &self.backend {
            Backend::InMemory { worker } => {
                if let Some(handle) = worker.lock().await.take() {
                    handle.shutdown().await;
                }
            }
            #[cfg(feature = "redis")]
            Backend::Persistent { bus, connector } => {
                connector.abort();
                bus.close().await;
            }
        }
        self.cache.close().await;
        self.results.close().await;
        tracing::info!("services shut down");
    }
}

pub async fn build_services(settings: &Settings) -> anyhow::Result<AppServices> {
    if settings.use_persistent_stores {
        #[cfg(feature = "redis")]
        {
            return build_persistent_services(settings).await;
        }
        #[cfg(not(feature = "redis"))]
        {
            tracing::warn!(
                "USE_PERSISTENT_STORES=true but redis feature not enabled, falling back to in-memory"
            );
        }
    }

    tracing::info!("using in-memory stores and in-process worker");
    AppServices::in_memory().await
}

#[cfg(feature = "redis")]
async fn build_persistent_services(settings: &Settings) -> anyhow::Result<AppServices> {
    let postgres = Arc::new(PostgresResultStore::connect_lazy(
        settings.postgres.connect_options(),
    ));
    if let Err(e) = postgres.ensure_schema().await {
        // Reads and writes will report the failure per request.
        tracing::error!(error = %e, "error creating result table");
    }

    let redis_url = settings.redis.url();
    let cache = Arc::new(RedisCacheStore::new(&redis_url, &settings.results_key)?);
    let bus = Arc::new(RedisPubSubJobBus::new(&redis_url, &settings.job_channel)?);

    let gate = ReadinessGate::new(
        Arc::new(ConnectionState::new("redis cache")),
        Arc::new(ConnectionState::new("redis publisher")),
    );

    let connector = tokio::spawn(connect_redis(
        cache.clone(),
        bus.clone(),
        gate.clone(),
        settings.reconnect_policy(),
    ));

    let results: Arc<dyn ResultStore> = postgres;
    let cache_dyn: Arc<dyn CacheStore> = cache;
    let ingress = IngressService::new(results.clone(), cache_dyn.clone(), bus.clone(), gate);

    Ok(AppServices {
        ingress,
        results,
        cache: cache_dyn,
        backend: Backend::Persistent { bus, connector },
    })
}

/// Connection lifecycle for the ingress: cache first, then publisher.
///
/// Each success flips its gate to ready; giving up leaves it failed.
#[cfg(feature = "redis")]
async fn connect_redis(
    cache: Arc<RedisCacheStore>,
    bus: Arc<RedisPubSubJobBus>,
    gate: ReadinessGate,
    policy: ReconnectPolicy,
) {
    if let Err(e) = establish(gate.cache(), &policy, || cache.connect()).await {
        tracing::error!(error = %e, "failed to connect to redis");
        return;
    }
    if let Err(e) = establish(gate.bus(), &policy, || bus.connect()).await {
        tracing::error!(error = %e, "failed to connect to redis");
    }
}
