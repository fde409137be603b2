// Gateway module for analysis - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod normalize;
mod orchestrator;
mod producer;
mod types;

// Public re-exports - the ONLY way to access analysis functionality
pub use normalize::{normalize, NormalizedMetrics, RawMetrics, NESTED_LOOP_MARKER};
pub use orchestrator::{AnalysisOrchestrator, Invalidation, InvalidateListener, ResultListener};
pub use producer::{ExternalAnalyzer, MetricsProducer};
pub use types::{
    hash_content, AnalysisResult, AnalysisStatus, ClassMetrics, ComplexitySummary, FileIdentity,
    FunctionMetrics, ParamInfo,
};
