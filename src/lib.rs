pub mod analysis;
pub mod app;
pub mod cache;
pub mod cli;
pub mod constants;
pub mod metrics;
pub mod runtime;
pub mod suggestions;
pub mod utils;

pub use analysis::{AnalysisOrchestrator, AnalysisResult, FileIdentity, MetricsProducer};
pub use app::{load_config, Config};
pub use cache::ContentAddressedCache;
pub use metrics::PipelineMetrics;
pub use runtime::{FileReport, Pipeline};
pub use suggestions::{Suggestion, SuggestionEngine, ThrottledSuggestionCache};
pub use utils::PipelineError;
