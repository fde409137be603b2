use futures::future::{join_all, BoxFuture, Shared};
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::normalize::{normalize, RawMetrics};
use super::producer::MetricsProducer;
use super::types::{AnalysisResult, FileIdentity};
use crate::cache::ContentAddressedCache;
use crate::constants::DEFAULT_ANALYSIS_CACHE_CAPACITY;
use crate::metrics::{AnalysisMetrics, CacheMetrics};
use crate::utils::PipelineError;

type SharedAnalysis = Shared<BoxFuture<'static, Arc<AnalysisResult>>>;

/// Callback fired whenever an analysis settles (success or error)
pub type ResultListener = Box<dyn Fn(&AnalysisResult) + Send + Sync>;

/// Callback fired when cached results are dropped on request
pub type InvalidateListener = Box<dyn Fn(&Invalidation) + Send + Sync>;

/// What was invalidated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invalidation {
    File(String),
    All,
}

/// Cached result plus the identity it was produced for
#[derive(Debug, Clone)]
struct CachedAnalysis {
    content_hash: String,
    generation: u64,
    result: Arc<AnalysisResult>,
}

struct Flight {
    generation: u64,
    /// Bumped whenever a caller joins; the result is as new as its latest request
    last_requested: u64,
    future: SharedAnalysis,
}

#[derive(Debug, Default)]
struct AnalysisCounters {
    collisions: u64,
    producer_invocations: u64,
    producer_failures: u64,
}

/// Cache, flight table and counters change together under one lock, so the
/// "already in flight?" check and the flight insert are a single step.
struct OrchestratorState {
    cache: ContentAddressedCache<String, CachedAnalysis>,
    in_flight: HashMap<FileIdentity, Flight>,
    next_generation: u64,
    counters: AnalysisCounters,
}

struct Inner {
    state: Mutex<OrchestratorState>,
    result_listeners: RwLock<Vec<ResultListener>>,
    invalidate_listeners: RwLock<Vec<InvalidateListener>>,
}

/// Produces analysis results at most once per distinct file content.
///
/// Results are cached by path and validated against the content hash, so an
/// edit supersedes the previous entry instead of accumulating beside it.
/// Concurrent requests for the same identity share a single producer run.
#[derive(Clone)]
pub struct AnalysisOrchestrator {
    inner: Arc<Inner>,
}

impl Default for AnalysisOrchestrator {
    fn default() -> Self {
        Self::new(DEFAULT_ANALYSIS_CACHE_CAPACITY)
    }
}

impl std::fmt::Debug for AnalysisOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisOrchestrator")
            .field("metrics", &self.metrics())
            .finish()
    }
}

impl AnalysisOrchestrator {
    /// Create an orchestrator whose result cache holds `cache_capacity` files
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(OrchestratorState {
                    cache: ContentAddressedCache::new(cache_capacity),
                    in_flight: HashMap::new(),
                    next_generation: 0,
                    counters: AnalysisCounters::default(),
                }),
                result_listeners: RwLock::new(Vec::new()),
                invalidate_listeners: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Return the settled analysis for `identity`.
    ///
    /// `producer` runs only on a cache miss with no matching flight. Once
    /// started it runs to completion even if every caller stops waiting.
    /// Failures come back as an error result and are never cached.
    pub async fn analyze<F, Fut>(
        &self,
        identity: FileIdentity,
        producer: F,
    ) -> Arc<AnalysisResult>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<RawMetrics, PipelineError>> + Send + 'static,
    {
        let future = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;

            if let Some(cached) = state
                .cache
                .get_valid(&identity.path, |c| c.content_hash == identity.content_hash)
            {
                debug!("Analysis cache hit for {}", identity.path);
                return cached.result;
            }

            if let Some(flight) = state.in_flight.get_mut(&identity) {
                state.counters.collisions += 1;
                state.next_generation += 1;
                flight.last_requested = state.next_generation;
                debug!("Joining in-flight analysis of {}", identity.path);
                flight.future.clone()
            } else {
                state.next_generation += 1;
                let generation = state.next_generation;
                state.counters.producer_invocations += 1;
                debug!("Analysis cache miss for {}, starting producer", identity.path);

                let future = self.start(identity.clone(), generation, producer);
                state.in_flight.insert(
                    identity,
                    Flight {
                        generation,
                        last_requested: generation,
                        future: future.clone(),
                    },
                );
                future
            }
        };

        future.await
    }

    /// Convenience wrapper over [`analyze`](Self::analyze) for a shared producer
    pub async fn analyze_with(
        &self,
        identity: FileIdentity,
        producer: Arc<dyn MetricsProducer>,
    ) -> Arc<AnalysisResult> {
        let target = identity.clone();
        self.analyze(identity, move || async move { producer.produce(&target).await })
            .await
    }

    /// Spawn the producer; the task settles the flight itself so completion
    /// does not depend on anyone polling the shared handle.
    fn start<F, Fut>(&self, identity: FileIdentity, generation: u64, producer: F) -> SharedAnalysis
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<RawMetrics, PipelineError>> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let path = identity.path.clone();

        let handle = tokio::spawn(async move {
            let outcome = AssertUnwindSafe(async move { producer().await })
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(PipelineError::Producer("analyzer panicked".to_string())));
            inner.settle(identity, generation, outcome)
        });

        async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => Arc::new(AnalysisResult::failure(
                    path,
                    format!("analysis task failed: {}", e),
                )),
            }
        }
        .boxed()
        .shared()
    }

    /// Peek at the cached result for this exact identity without producing
    pub fn get_cached_result(&self, identity: &FileIdentity) -> Option<Arc<AnalysisResult>> {
        let state = self.inner.state.lock();
        state
            .cache
            .peek(&identity.path)
            .filter(|c| c.content_hash == identity.content_hash)
            .map(|c| Arc::clone(&c.result))
    }

    /// Whether an analysis for this identity is running
    pub fn is_in_flight(&self, identity: &FileIdentity) -> bool {
        self.inner.state.lock().in_flight.contains_key(identity)
    }

    /// Drop the cached result for `path`.
    ///
    /// Analyses of that path still in flight finish for their waiters but
    /// their results are not cached.
    pub fn invalidate(&self, path: &str) {
        {
            let mut state = self.inner.state.lock();
            state.cache.invalidate(&path.to_string());
            state.in_flight.retain(|identity, _| identity.path != path);
        }
        debug!("Invalidated analysis of {}", path);
        self.inner.notify_invalidate(&Invalidation::File(path.to_string()));
    }

    /// Drop every cached result and detach running analyses
    pub fn clear(&self) {
        {
            let mut state = self.inner.state.lock();
            state.cache.clear();
            state.in_flight.clear();
        }
        self.inner.notify_invalidate(&Invalidation::All);
    }

    /// Wait for every analysis currently in flight
    pub async fn drain(&self) {
        let pending: Vec<SharedAnalysis> = {
            let state = self.inner.state.lock();
            state.in_flight.values().map(|f| f.future.clone()).collect()
        };
        if !pending.is_empty() {
            debug!("Draining {} in-flight analyses", pending.len());
            join_all(pending).await;
        }
    }

    /// Register a listener for settled analyses
    pub fn on_result<F>(&self, listener: F)
    where
        F: Fn(&AnalysisResult) + Send + Sync + 'static,
    {
        self.inner.result_listeners.write().push(Box::new(listener));
    }

    /// Register a listener for invalidations and clears
    pub fn on_invalidate<F>(&self, listener: F)
    where
        F: Fn(&Invalidation) + Send + Sync + 'static,
    {
        self.inner.invalidate_listeners.write().push(Box::new(listener));
    }

    pub fn metrics(&self) -> AnalysisMetrics {
        let state = self.inner.state.lock();
        AnalysisMetrics {
            cache: CacheMetrics::new(
                state.cache.stats(),
                state.cache.size(),
                state.cache.capacity(),
            ),
            in_flight_collisions: state.counters.collisions,
            producer_invocations: state.counters.producer_invocations,
            producer_failures: state.counters.producer_failures,
            in_flight: state.in_flight.len(),
        }
    }
}

impl Inner {
    fn settle(
        &self,
        identity: FileIdentity,
        generation: u64,
        outcome: Result<RawMetrics, PipelineError>,
    ) -> Arc<AnalysisResult> {
        let result = match outcome.and_then(|raw| normalize(&raw)) {
            Ok(metrics) => Arc::new(AnalysisResult::success(
                identity.path.clone(),
                metrics.functions,
                metrics.classes,
            )),
            Err(e) => {
                warn!("Analysis of {} failed: {}", identity.path, e);
                Arc::new(AnalysisResult::failure(identity.path.clone(), e.to_string()))
            }
        };

        {
            let mut guard = self.state.lock();
            let state = &mut *guard;

            if !result.is_success() {
                state.counters.producer_failures += 1;
            }

            // Detached by invalidate/clear, or superseded by a newer flight
            let owned = state
                .in_flight
                .get(&identity)
                .filter(|flight| flight.generation == generation)
                .map(|flight| flight.last_requested);

            if let Some(last_requested) = owned {
                state.in_flight.remove(&identity);

                let newer_cached = state
                    .cache
                    .peek(&identity.path)
                    .is_some_and(|cached| cached.generation > last_requested);

                if result.is_success() && !newer_cached {
                    state.cache.set(
                        identity.path.clone(),
                        CachedAnalysis {
                            content_hash: identity.content_hash.clone(),
                            generation: last_requested,
                            result: Arc::clone(&result),
                        },
                    );
                    info!(
                        "Analyzed {} ({} functions, {} classes)",
                        identity.path,
                        result.functions.len(),
                        result.classes.len()
                    );
                } else if newer_cached {
                    debug!("Discarding stale analysis of {}", identity.path);
                }
            } else {
                debug!("Analysis of {} finished after being detached", identity.path);
            }
        }

        for listener in self.result_listeners.read().iter() {
            listener(&result);
        }

        result
    }

    fn notify_invalidate(&self, invalidation: &Invalidation) {
        for listener in self.invalidate_listeners.read().iter() {
            listener(invalidation);
        }
    }
}
