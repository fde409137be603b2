use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use super::engine::{SuggestionEngine, SuggestionSource};
use super::signature::Signature;
use super::types::{CodeUnit, Suggestion};
use crate::cache::ContentAddressedCache;
use crate::constants::{DEFAULT_SUGGESTION_CACHE_CAPACITY, DEFAULT_THROTTLE_WINDOW_MS};
use crate::metrics::{CacheMetrics, SuggestionMetrics};

/// Shared, immutable suggestion list
pub type SuggestionList = Arc<Vec<Suggestion>>;

type SharedSuggestions = Shared<BoxFuture<'static, SuggestionList>>;

struct Recent {
    served_at: Instant,
    suggestions: SuggestionList,
}

struct Flight {
    id: u64,
    future: SharedSuggestions,
}

#[derive(Default)]
struct SuggestionCounters {
    collisions: u64,
    throttled: u64,
    evaluations: u64,
}

struct SuggestionState {
    cache: ContentAddressedCache<Signature, SuggestionList>,
    /// Last serve per signature; survives eviction from `cache`
    recent: HashMap<Signature, Recent>,
    in_flight: HashMap<Signature, Flight>,
    next_flight: u64,
    counters: SuggestionCounters,
}

impl SuggestionState {
    fn prune_recent(&mut self, now: Instant, window: Duration) {
        self.recent
            .retain(|_, recent| now.duration_since(recent.served_at) < window);
    }

    fn mark_served(&mut self, signature: Signature, suggestions: &SuggestionList, now: Instant) {
        self.recent.insert(
            signature,
            Recent {
                served_at: now,
                suggestions: Arc::clone(suggestions),
            },
        );
    }
}

/// Bounded, coalescing cache in front of a [`SuggestionSource`].
///
/// Keyed by [`Signature`], so units that differ only in position share one
/// evaluation. Requests for a signature served within the throttle window
/// are answered from the last result even if the bounded cache evicted it.
pub struct ThrottledSuggestionCache<S = SuggestionEngine> {
    source: Arc<S>,
    throttle_window: Duration,
    state: Arc<Mutex<SuggestionState>>,
}

impl Default for ThrottledSuggestionCache<SuggestionEngine> {
    fn default() -> Self {
        Self::new(
            SuggestionEngine::default(),
            DEFAULT_SUGGESTION_CACHE_CAPACITY,
            Duration::from_millis(DEFAULT_THROTTLE_WINDOW_MS),
        )
    }
}

impl<S> Clone for ThrottledSuggestionCache<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            throttle_window: self.throttle_window,
            state: Arc::clone(&self.state),
        }
    }
}

impl<S> ThrottledSuggestionCache<S>
where
    S: SuggestionSource + 'static,
{
    pub fn new(source: S, capacity: usize, throttle_window: Duration) -> Self {
        Self {
            source: Arc::new(source),
            throttle_window,
            state: Arc::new(Mutex::new(SuggestionState {
                cache: ContentAddressedCache::new(capacity),
                recent: HashMap::new(),
                in_flight: HashMap::new(),
                next_flight: 0,
                counters: SuggestionCounters::default(),
            })),
        }
    }

    pub fn signature(&self, unit: &CodeUnit) -> Signature {
        Signature::of(unit, self.source.thresholds())
    }

    /// Suggestions for `unit`, evaluating at most once per signature at a time
    pub async fn get_suggestions(&self, unit: &CodeUnit) -> SuggestionList {
        let signature = self.signature(unit);

        let future = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let now = Instant::now();
            state.prune_recent(now, self.throttle_window);

            if let Some(recent) = state.recent.get(&signature) {
                state.counters.throttled += 1;
                return Arc::clone(&recent.suggestions);
            }

            if let Some(cached) = state.cache.get(&signature) {
                state.mark_served(signature, &cached, now);
                return cached;
            }

            if let Some(pending) = state.in_flight.get(&signature) {
                state.counters.collisions += 1;
                debug!("Joining in-flight suggestion evaluation for {}", unit.name());
                pending.future.clone()
            } else {
                state.counters.evaluations += 1;
                state.next_flight += 1;
                let id = state.next_flight;
                let future = self.evaluate(signature.clone(), id, unit.clone());
                state.in_flight.insert(
                    signature,
                    Flight {
                        id,
                        future: future.clone(),
                    },
                );
                future
            }
        };

        future.await
    }

    /// Build the shared evaluation; whoever polls it to completion stores the
    /// result and clears the flight entry, unless the flight was detached.
    fn evaluate(&self, signature: Signature, id: u64, unit: CodeUnit) -> SharedSuggestions {
        let source = Arc::clone(&self.source);
        let state = Arc::clone(&self.state);

        async move {
            let suggestions: SuggestionList = Arc::new(source.suggest(&unit).await);

            let mut state = state.lock();
            let owned = state
                .in_flight
                .get(&signature)
                .is_some_and(|flight| flight.id == id);
            if owned {
                state.in_flight.remove(&signature);
                state.cache.set(signature.clone(), Arc::clone(&suggestions));
                state.mark_served(signature, &suggestions, Instant::now());
            } else {
                debug!("Suggestion evaluation for {} finished after being detached", unit.name());
            }
            suggestions
        }
        .boxed()
        .shared()
    }

    /// Synchronous read for render passes; `None` means "not computed yet"
    pub fn peek(&self, unit: &CodeUnit) -> Option<SuggestionList> {
        let signature = self.signature(unit);
        let state = self.state.lock();
        let now = Instant::now();

        state
            .recent
            .get(&signature)
            .filter(|recent| now.duration_since(recent.served_at) < self.throttle_window)
            .map(|recent| Arc::clone(&recent.suggestions))
            .or_else(|| state.cache.peek(&signature).cloned())
    }

    /// Forget the suggestions for one unit's signature.
    ///
    /// A running evaluation for it still answers its waiters but is not cached.
    pub fn invalidate(&self, unit: &CodeUnit) {
        let signature = self.signature(unit);
        let mut state = self.state.lock();
        state.cache.invalidate(&signature);
        state.recent.remove(&signature);
        state.in_flight.remove(&signature);
    }

    /// Drop every cached list and detach running evaluations
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.cache.clear();
        state.recent.clear();
        state.in_flight.clear();
    }

    pub fn metrics(&self) -> SuggestionMetrics {
        let state = self.state.lock();
        SuggestionMetrics {
            cache: CacheMetrics::new(
                state.cache.stats(),
                state.cache.size(),
                state.cache.capacity(),
            ),
            in_flight_collisions: state.counters.collisions,
            throttled: state.counters.throttled,
            evaluations: state.counters.evaluations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::FunctionMetrics;
    use crate::suggestions::engine::SuggestionThresholds;
    use crate::suggestions::SuggestionType;
    use async_trait::async_trait;
    use futures::future::join_all;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Engine wrapper that counts calls and can be made slow
    struct CountingSource {
        engine: SuggestionEngine,
        calls: Arc<AtomicUsize>,
        delay: Duration,
    }

    #[async_trait]
    impl SuggestionSource for CountingSource {
        async fn suggest(&self, unit: &CodeUnit) -> Vec<Suggestion> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.engine.evaluate(unit)
        }

        fn thresholds(&self) -> &SuggestionThresholds {
            self.engine.thresholds()
        }
    }

    fn counting_cache(
        capacity: usize,
        window_ms: u64,
        delay: Duration,
    ) -> (ThrottledSuggestionCache<CountingSource>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = CountingSource {
            engine: SuggestionEngine::default(),
            calls: Arc::clone(&calls),
            delay,
        };
        (
            ThrottledSuggestionCache::new(source, capacity, Duration::from_millis(window_ms)),
            calls,
        )
    }

    fn function(name: &str, line: u32, complexity: u32) -> CodeUnit {
        CodeUnit::Function(FunctionMetrics {
            name: name.to_string(),
            line,
            complexity,
            line_count: 10,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_same_signature_different_lines_share_evaluation() {
        let (cache, calls) = counting_cache(10, 0, Duration::ZERO);

        let first = cache.get_suggestions(&function("f", 10, 7)).await;
        let second = cache.get_suggestions(&function("f", 42, 8)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
        assert_eq!(cache.metrics().cache.hits, 1);
    }

    #[tokio::test]
    async fn test_different_bucket_evaluates_again() {
        let (cache, calls) = counting_cache(10, 0, Duration::ZERO);

        let medium = cache.get_suggestions(&function("f", 1, 7)).await;
        let high = cache.get_suggestions(&function("f", 1, 12)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_ne!(medium, high);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_is_coalesced() {
        let (cache, calls) = counting_cache(10, 0, Duration::from_millis(20));
        let unit = function("f", 1, 3);

        let results = join_all((0..10).map(|_| cache.get_suggestions(&unit))).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for result in &results {
            assert!(Arc::ptr_eq(result, &results[0]));
        }
        let metrics = cache.metrics();
        assert_eq!(metrics.evaluations, 1);
        assert_eq!(metrics.in_flight_collisions, 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_window_survives_eviction() {
        let (cache, calls) = counting_cache(1, 100, Duration::ZERO);
        let a = function("a", 1, 1);
        let b = function("b", 1, 1);

        cache.get_suggestions(&a).await;
        cache.get_suggestions(&b).await; // evicts a from the bounded cache
        assert_eq!(cache.metrics().cache.evictions, 1);

        cache.get_suggestions(&a).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.metrics().throttled, 1);

        tokio::time::advance(Duration::from_millis(150)).await;
        cache.get_suggestions(&a).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_peek_before_and_after() {
        let cache: ThrottledSuggestionCache = ThrottledSuggestionCache::default();
        let unit = function("f", 1, 1);

        assert!(cache.peek(&unit).is_none());
        let computed = cache.get_suggestions(&unit).await;
        assert_eq!(cache.peek(&unit), Some(computed));
        // Peeking records nothing
        assert_eq!(cache.metrics().cache.hits, 0);
    }

    #[tokio::test]
    async fn test_invalidate_and_clear() {
        let (cache, calls) = counting_cache(10, 0, Duration::ZERO);
        let unit = function("f", 1, 1);

        cache.get_suggestions(&unit).await;
        cache.invalidate(&unit);
        assert!(cache.peek(&unit).is_none());
        cache.get_suggestions(&unit).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        cache.clear();
        assert!(cache.peek(&unit).is_none());
        assert_eq!(cache.metrics().cache.size, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_detaches_running_evaluation() {
        let (cache, calls) = counting_cache(10, 0, Duration::from_millis(50));
        let unit = function("f", 1, 1);

        let pending = {
            let cache = cache.clone();
            let unit = unit.clone();
            tokio::spawn(async move { cache.get_suggestions(&unit).await })
        };
        tokio::task::yield_now().await;

        cache.clear();
        let detached = pending.await.unwrap();

        assert_eq!(detached[0].suggestion_type, SuggestionType::Documentation);
        assert!(cache.peek(&unit).is_none());
        assert_eq!(cache.metrics().cache.size, 0);

        cache.get_suggestions(&unit).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.peek(&unit).is_some());
    }

    #[tokio::test]
    async fn test_results_match_engine() {
        let cache: ThrottledSuggestionCache = ThrottledSuggestionCache::default();
        let engine = SuggestionEngine::default();
        let unit = function("f", 1, 15);

        let cached = cache.get_suggestions(&unit).await;
        assert_eq!(*cached, engine.evaluate(&unit));
    }
}
