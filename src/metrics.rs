//! Read-only snapshots of pipeline cache behaviour.
//!
//! Components keep their own counters behind the same lock as their cache and
//! hand out these plain copies, so a snapshot is always internally consistent.

use serde::{Deserialize, Serialize};

use crate::cache::CacheStats;

/// Counters for one bounded cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
    pub capacity: usize,
}

impl CacheMetrics {
    pub fn new(stats: CacheStats, size: usize, capacity: usize) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            size,
            capacity,
        }
    }

    pub fn hit_rate(&self) -> f32 {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
        }
        .hit_rate()
    }
}

/// Analysis orchestrator counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetrics {
    pub cache: CacheMetrics,
    /// Requests that joined an analysis already in flight
    pub in_flight_collisions: u64,
    pub producer_invocations: u64,
    pub producer_failures: u64,
    /// Analyses currently running
    pub in_flight: usize,
}

/// Suggestion cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SuggestionMetrics {
    pub cache: CacheMetrics,
    /// Requests that joined an evaluation already in flight
    pub in_flight_collisions: u64,
    /// Requests answered from the throttle window
    pub throttled: u64,
    pub evaluations: u64,
}

/// Everything the pipeline reports about itself
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineMetrics {
    pub analysis: AnalysisMetrics,
    pub suggestions: SuggestionMetrics,
}

impl PipelineMetrics {
    /// Format metrics for display
    pub fn format(&self) -> String {
        let a = &self.analysis;
        let s = &self.suggestions;
        format!(
            "Pipeline Statistics:\n\
            Analysis cache: {}/{} entries, {:.1}% hit rate ({} hits, {} misses, {} evictions)\n\
            Analyzer: {} runs, {} failures, {} coalesced, {} in flight\n\
            Suggestion cache: {}/{} entries, {:.1}% hit rate ({} hits, {} misses, {} evictions)\n\
            Rule engine: {} evaluations, {} coalesced, {} throttled",
            a.cache.size,
            a.cache.capacity,
            a.cache.hit_rate(),
            a.cache.hits,
            a.cache.misses,
            a.cache.evictions,
            a.producer_invocations,
            a.producer_failures,
            a.in_flight_collisions,
            a.in_flight,
            s.cache.size,
            s.cache.capacity,
            s.cache.hit_rate(),
            s.cache.hits,
            s.cache.misses,
            s.cache.evictions,
            s.evaluations,
            s.in_flight_collisions,
            s.throttled,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_mentions_counters() {
        let metrics = PipelineMetrics {
            analysis: AnalysisMetrics {
                cache: CacheMetrics {
                    hits: 3,
                    misses: 1,
                    evictions: 0,
                    size: 1,
                    capacity: 100,
                },
                in_flight_collisions: 9,
                producer_invocations: 1,
                producer_failures: 0,
                in_flight: 0,
            },
            suggestions: SuggestionMetrics::default(),
        };

        let text = metrics.format();
        assert!(text.contains("1/100 entries"));
        assert!(text.contains("75.0% hit rate"));
        assert!(text.contains("9 coalesced"));
    }
}
