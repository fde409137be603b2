use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::analysis::{
    AnalysisOrchestrator, AnalysisResult, ClassMetrics, ExternalAnalyzer, FileIdentity,
    FunctionMetrics, MetricsProducer,
};
use crate::app::Config;
use crate::metrics::PipelineMetrics;
use crate::suggestions::{CodeUnit, SuggestionEngine, SuggestionList, ThrottledSuggestionCache};
use crate::utils::PipelineError;

/// Suggestions for one function or method
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitReport {
    pub name: String,
    pub line: u32,
    pub suggestions: SuggestionList,
}

/// Suggestions for a class and, separately, for each of its methods
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassReport {
    pub name: String,
    pub line: u32,
    pub suggestions: SuggestionList,
    pub methods: Vec<UnitReport>,
}

/// Everything the render layer needs for one file version
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub identity: FileIdentity,
    pub result: Arc<AnalysisResult>,
    pub functions: Vec<UnitReport>,
    pub classes: Vec<ClassReport>,
}

impl FileReport {
    pub fn suggestion_count(&self) -> usize {
        let units = |reports: &[UnitReport]| -> usize {
            reports.iter().map(|r| r.suggestions.len()).sum()
        };
        units(&self.functions)
            + self
                .classes
                .iter()
                .map(|c| c.suggestions.len() + units(&c.methods))
                .sum::<usize>()
    }
}

/// Composition point owning the orchestrator, the suggestion cache and the
/// producer they share. Shutdown drains analyses before clearing caches.
#[derive(Clone)]
pub struct Pipeline {
    orchestrator: AnalysisOrchestrator,
    suggestions: ThrottledSuggestionCache,
    producer: Arc<dyn MetricsProducer>,
}

impl Pipeline {
    pub fn new(
        orchestrator: AnalysisOrchestrator,
        suggestions: ThrottledSuggestionCache,
        producer: Arc<dyn MetricsProducer>,
    ) -> Self {
        Self {
            orchestrator,
            suggestions,
            producer,
        }
    }

    /// Build a pipeline from configuration with a custom producer
    pub fn with_producer(
        config: &Config,
        producer: Arc<dyn MetricsProducer>,
    ) -> Result<Self, PipelineError> {
        let thresholds = config.suggestions.thresholds();
        thresholds.validate()?;

        Ok(Self::new(
            AnalysisOrchestrator::new(config.analysis.cache_capacity),
            ThrottledSuggestionCache::new(
                SuggestionEngine::new(thresholds),
                config.suggestions.cache_capacity,
                config.suggestions.throttle_window(),
            ),
            producer,
        ))
    }

    /// Build a pipeline that runs the configured external analyzer
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        Self::with_producer(config, Arc::new(ExternalAnalyzer::from_config(&config.analyzer)))
    }

    pub fn orchestrator(&self) -> &AnalysisOrchestrator {
        &self.orchestrator
    }

    pub fn suggestions(&self) -> &ThrottledSuggestionCache {
        &self.suggestions
    }

    /// Analyze the current text of `path` and collect its suggestions
    pub async fn analyze_source(
        &self,
        path: &str,
        content: &str,
    ) -> Result<FileReport, PipelineError> {
        let identity = FileIdentity::from_content(path, content)?;
        Ok(self.report(identity).await)
    }

    /// Analyze one file version and collect its suggestions
    pub async fn report(&self, identity: FileIdentity) -> FileReport {
        let result = self
            .orchestrator
            .analyze_with(identity.clone(), Arc::clone(&self.producer))
            .await;

        let functions = self.function_reports(&result.functions).await;
        let classes = join_all(result.classes.iter().map(|c| self.class_report(c))).await;
        debug!(
            "Report for {}: {} functions, {} classes",
            identity.path,
            functions.len(),
            classes.len()
        );

        FileReport {
            identity,
            result,
            functions,
            classes,
        }
    }

    async fn function_reports(&self, functions: &[FunctionMetrics]) -> Vec<UnitReport> {
        join_all(functions.iter().map(|f| async move {
            UnitReport {
                name: f.name.clone(),
                line: f.line,
                suggestions: self
                    .suggestions
                    .get_suggestions(&CodeUnit::Function(f.clone()))
                    .await,
            }
        }))
        .await
    }

    async fn class_report(&self, class: &ClassMetrics) -> ClassReport {
        let suggestions = self
            .suggestions
            .get_suggestions(&CodeUnit::Class(class.clone()))
            .await;
        ClassReport {
            name: class.name.clone(),
            line: class.line,
            suggestions,
            methods: self.function_reports(&class.methods).await,
        }
    }

    /// Cached result for this exact identity, without analyzing
    pub fn cached_result(&self, identity: &FileIdentity) -> Option<Arc<AnalysisResult>> {
        self.orchestrator.get_cached_result(identity)
    }

    /// Cached suggestions for a function, without evaluating
    pub fn peek_suggestions(&self, metrics: &FunctionMetrics) -> Option<SuggestionList> {
        self.suggestions.peek(&CodeUnit::Function(metrics.clone()))
    }

    /// Forget the cached analysis of a path (e.g. the file was deleted)
    pub fn invalidate(&self, path: &str) {
        self.orchestrator.invalidate(path);
    }

    pub fn metrics(&self) -> PipelineMetrics {
        PipelineMetrics {
            analysis: self.orchestrator.metrics(),
            suggestions: self.suggestions.metrics(),
        }
    }

    /// Wait for running analyses, then release the orchestrator cache
    /// followed by the suggestion cache
    pub async fn shutdown(self) {
        self.orchestrator.drain().await;
        self.orchestrator.clear();
        self.suggestions.clear();
        debug!("Pipeline shut down");
    }
}
