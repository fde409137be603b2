use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::types::{CodeUnit, Severity, Suggestion, SuggestionType};
use crate::analysis::{ClassMetrics, FunctionMetrics};
use crate::constants::{
    DEFAULT_COMPLEXITY_HIGH, DEFAULT_COMPLEXITY_MEDIUM, DEFAULT_MAX_CLASS_LINES,
    DEFAULT_MAX_FUNCTION_LINES, DEFAULT_MAX_PARAMETERS, PRIORITY_COMPLEXITY_HIGH,
    PRIORITY_COMPLEXITY_MEDIUM, PRIORITY_DOCUMENTATION, PRIORITY_LENGTH, PRIORITY_PARAMETERS,
    PRIORITY_PERFORMANCE,
};
use crate::utils::PipelineError;

/// Rule thresholds; every comparison is "value reaches threshold"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SuggestionThresholds {
    pub complexity_medium: u32,
    pub complexity_high: u32,
    pub max_parameters: usize,
    pub max_function_lines: u32,
    pub max_class_lines: u32,
}

impl Default for SuggestionThresholds {
    fn default() -> Self {
        Self {
            complexity_medium: DEFAULT_COMPLEXITY_MEDIUM,
            complexity_high: DEFAULT_COMPLEXITY_HIGH,
            max_parameters: DEFAULT_MAX_PARAMETERS,
            max_function_lines: DEFAULT_MAX_FUNCTION_LINES,
            max_class_lines: DEFAULT_MAX_CLASS_LINES,
        }
    }
}

impl SuggestionThresholds {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.complexity_medium == 0 || self.max_parameters == 0 {
            return Err(PipelineError::Config(
                "suggestion thresholds must be greater than zero".to_string(),
            ));
        }
        if self.complexity_high < self.complexity_medium {
            return Err(PipelineError::Config(format!(
                "complexity_high ({}) is below complexity_medium ({})",
                self.complexity_high, self.complexity_medium
            )));
        }
        Ok(())
    }
}

/// Anything that can turn metrics into suggestions
#[async_trait]
pub trait SuggestionSource: Send + Sync {
    async fn suggest(&self, unit: &CodeUnit) -> Vec<Suggestion>;

    /// Thresholds the source's rules use, needed to bucket signatures
    fn thresholds(&self) -> &SuggestionThresholds;
}

type FunctionRule = fn(&FunctionMetrics, &SuggestionThresholds) -> Option<Suggestion>;
type ClassRule = fn(&ClassMetrics, &SuggestionThresholds) -> Option<Suggestion>;

const FUNCTION_RULES: &[FunctionRule] = &[
    function_complexity,
    function_documentation,
    function_parameters,
    function_length,
    function_performance,
];

const CLASS_RULES: &[ClassRule] = &[class_complexity, class_length];

/// Fixed, ordered rule set evaluated over function and class metrics.
///
/// Pure: the output depends only on the input and the thresholds. Every rule
/// runs, then results are sorted by `(priority, type)`.
#[derive(Debug, Clone, Default)]
pub struct SuggestionEngine {
    thresholds: SuggestionThresholds,
}

impl SuggestionEngine {
    pub fn new(thresholds: SuggestionThresholds) -> Self {
        Self { thresholds }
    }

    pub fn evaluate(&self, unit: &CodeUnit) -> Vec<Suggestion> {
        match unit {
            CodeUnit::Function(f) => self.evaluate_function(f),
            CodeUnit::Class(c) => self.evaluate_class(c),
        }
    }

    pub fn evaluate_function(&self, metrics: &FunctionMetrics) -> Vec<Suggestion> {
        sorted(
            FUNCTION_RULES
                .iter()
                .filter_map(|rule| rule(metrics, &self.thresholds))
                .collect(),
        )
    }

    /// Class rules cover the class itself; methods are evaluated separately
    pub fn evaluate_class(&self, metrics: &ClassMetrics) -> Vec<Suggestion> {
        sorted(
            CLASS_RULES
                .iter()
                .filter_map(|rule| rule(metrics, &self.thresholds))
                .collect(),
        )
    }

    pub fn thresholds(&self) -> &SuggestionThresholds {
        &self.thresholds
    }
}

#[async_trait]
impl SuggestionSource for SuggestionEngine {
    async fn suggest(&self, unit: &CodeUnit) -> Vec<Suggestion> {
        self.evaluate(unit)
    }

    fn thresholds(&self) -> &SuggestionThresholds {
        &self.thresholds
    }
}

fn sorted(mut suggestions: Vec<Suggestion>) -> Vec<Suggestion> {
    suggestions.sort_by(|a, b| {
        (a.priority, a.suggestion_type.as_str()).cmp(&(b.priority, b.suggestion_type.as_str()))
    });
    suggestions
}

fn suggestion(
    kind: &str,
    name: &str,
    suggestion_type: SuggestionType,
    severity: Severity,
    priority: u8,
    message: String,
) -> Suggestion {
    Suggestion {
        id: format!("{}:{}:{}", kind, name, suggestion_type),
        suggestion_type,
        message,
        severity,
        priority,
        actionable: false,
        quick_fix: None,
    }
}

fn complexity_suggestion(
    kind: &str,
    name: &str,
    complexity: u32,
    thresholds: &SuggestionThresholds,
) -> Option<Suggestion> {
    if complexity >= thresholds.complexity_high {
        Some(suggestion(
            kind,
            name,
            SuggestionType::Complexity,
            Severity::Error,
            PRIORITY_COMPLEXITY_HIGH,
            format!(
                "`{}` has very high cyclomatic complexity ({} or more); \
                 split it into smaller units",
                name, thresholds.complexity_high
            ),
        ))
    } else if complexity >= thresholds.complexity_medium {
        Some(suggestion(
            kind,
            name,
            SuggestionType::Complexity,
            Severity::Warning,
            PRIORITY_COMPLEXITY_MEDIUM,
            format!(
                "`{}` has moderate cyclomatic complexity ({} or more); \
                 consider simplifying its branches",
                name, thresholds.complexity_medium
            ),
        ))
    } else {
        None
    }
}

fn function_complexity(f: &FunctionMetrics, t: &SuggestionThresholds) -> Option<Suggestion> {
    complexity_suggestion("function", &f.name, f.complexity, t)
}

fn function_documentation(f: &FunctionMetrics, _: &SuggestionThresholds) -> Option<Suggestion> {
    if f.has_docstring {
        return None;
    }
    let mut s = suggestion(
        "function",
        &f.name,
        SuggestionType::Documentation,
        Severity::Info,
        PRIORITY_DOCUMENTATION,
        format!("`{}` has no docstring", f.name),
    );
    s.actionable = true;
    s.quick_fix = Some(format!("Add a docstring describing what `{}` does", f.name));
    Some(s)
}

fn function_parameters(f: &FunctionMetrics, t: &SuggestionThresholds) -> Option<Suggestion> {
    if f.parameters.len() < t.max_parameters {
        return None;
    }
    let mut s = suggestion(
        "function",
        &f.name,
        SuggestionType::Parameters,
        Severity::Warning,
        PRIORITY_PARAMETERS,
        format!(
            "`{}` takes {} or more parameters; group related ones into a parameter object",
            f.name, t.max_parameters
        ),
    );
    s.actionable = true;
    s.quick_fix = Some("Introduce a parameter object".to_string());
    Some(s)
}

fn function_length(f: &FunctionMetrics, t: &SuggestionThresholds) -> Option<Suggestion> {
    if f.line_count < t.max_function_lines {
        return None;
    }
    Some(suggestion(
        "function",
        &f.name,
        SuggestionType::Length,
        Severity::Warning,
        PRIORITY_LENGTH,
        format!(
            "`{}` spans {} or more lines; extract helper functions",
            f.name, t.max_function_lines
        ),
    ))
}

fn function_performance(f: &FunctionMetrics, _: &SuggestionThresholds) -> Option<Suggestion> {
    if f.performance_markers.is_empty() {
        return None;
    }
    let mut markers = f.performance_markers.clone();
    markers.sort();
    markers.dedup();
    Some(suggestion(
        "function",
        &f.name,
        SuggestionType::Performance,
        Severity::Info,
        PRIORITY_PERFORMANCE,
        format!("`{}` contains expensive patterns: {}", f.name, markers.join(", ")),
    ))
}

fn class_complexity(c: &ClassMetrics, t: &SuggestionThresholds) -> Option<Suggestion> {
    complexity_suggestion("class", &c.name, c.total_complexity, t)
}

fn class_length(c: &ClassMetrics, t: &SuggestionThresholds) -> Option<Suggestion> {
    if c.line_count < t.max_class_lines {
        return None;
    }
    Some(suggestion(
        "class",
        &c.name,
        SuggestionType::Length,
        Severity::Warning,
        PRIORITY_LENGTH,
        format!(
            "`{}` spans {} or more lines; split its responsibilities",
            c.name, t.max_class_lines
        ),
    ))
}
