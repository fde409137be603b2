use serde::{Deserialize, Serialize};
use std::fmt;

use crate::analysis::{ClassMetrics, FunctionMetrics};

/// Category of advice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionType {
    Complexity,
    Documentation,
    Parameters,
    Length,
    Performance,
}

impl SuggestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionType::Complexity => "complexity",
            SuggestionType::Documentation => "documentation",
            SuggestionType::Parameters => "parameters",
            SuggestionType::Length => "length",
            SuggestionType::Performance => "performance",
        }
    }
}

impl fmt::Display for SuggestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// One advisory annotation for a function or class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: String,
    #[serde(rename = "type")]
    pub suggestion_type: SuggestionType,
    pub message: String,
    pub severity: Severity,
    /// Lower is more urgent
    pub priority: u8,
    pub actionable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quick_fix: Option<String>,
}

/// A function or class to evaluate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeUnit {
    Function(FunctionMetrics),
    Class(ClassMetrics),
}

impl CodeUnit {
    pub fn name(&self) -> &str {
        match self {
            CodeUnit::Function(f) => &f.name,
            CodeUnit::Class(c) => &c.name,
        }
    }
}

impl From<FunctionMetrics> for CodeUnit {
    fn from(metrics: FunctionMetrics) -> Self {
        CodeUnit::Function(metrics)
    }
}

impl From<ClassMetrics> for CodeUnit {
    fn from(metrics: ClassMetrics) -> Self {
        CodeUnit::Class(metrics)
    }
}
