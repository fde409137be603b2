use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::utils::PipelineError;

/// Identity of one version of a file: its path plus a hash of its content
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileIdentity {
    pub path: String,
    pub content_hash: String,
}

impl FileIdentity {
    /// Build an identity from an already-computed hash
    pub fn new(
        path: impl Into<String>,
        content_hash: impl Into<String>,
    ) -> Result<Self, PipelineError> {
        let path = path.into();
        let content_hash = content_hash.into();
        if path.is_empty() {
            return Err(PipelineError::InvalidIdentity("path is empty".to_string()));
        }
        if content_hash.is_empty() {
            return Err(PipelineError::InvalidIdentity(format!(
                "content hash for {} is empty",
                path
            )));
        }
        Ok(Self { path, content_hash })
    }

    /// Build an identity by hashing the current text of the file
    pub fn from_content(path: impl Into<String>, content: &str) -> Result<Self, PipelineError> {
        Self::new(path, hash_content(content))
    }
}

/// Compute SHA256 hash of file content
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Outcome of an analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Success,
    Error,
}

/// A single function parameter
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParamInfo {
    pub name: String,
    pub annotation: Option<String>,
    pub has_default: bool,
}

impl ParamInfo {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Metrics for one function or method
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionMetrics {
    pub name: String,
    pub line: u32,
    pub complexity: u32,
    pub reference_count: u32,
    pub line_count: u32,
    pub parameters: Vec<ParamInfo>,
    pub has_docstring: bool,
    /// Expensive patterns reported by the analyzer (e.g. `nested-loop`)
    #[serde(default)]
    pub performance_markers: Vec<String>,
}

/// Metrics for one class
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub name: String,
    pub line: u32,
    pub total_complexity: u32,
    pub line_count: u32,
    pub methods: Vec<FunctionMetrics>,
}

/// Aggregate complexity over every function and method in a file
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplexitySummary {
    pub average: f64,
    pub total: u64,
    pub max: u32,
    pub min: u32,
}

impl ComplexitySummary {
    pub fn from_functions(functions: &[FunctionMetrics], classes: &[ClassMetrics]) -> Self {
        let values: Vec<u32> = functions
            .iter()
            .chain(classes.iter().flat_map(|c| c.methods.iter()))
            .map(|f| f.complexity)
            .collect();

        if values.is_empty() {
            return Self::default();
        }

        let total: u64 = values.iter().map(|&v| u64::from(v)).sum();
        Self {
            average: total as f64 / values.len() as f64,
            total,
            max: values.iter().copied().max().unwrap_or(0),
            min: values.iter().copied().min().unwrap_or(0),
        }
    }
}

/// Settled result of analyzing one file version. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub file_path: String,
    pub timestamp: DateTime<Utc>,
    pub status: AnalysisStatus,
    pub error: Option<String>,
    pub functions: Vec<FunctionMetrics>,
    pub classes: Vec<ClassMetrics>,
    pub complexity_summary: ComplexitySummary,
}

impl AnalysisResult {
    pub fn success(
        file_path: impl Into<String>,
        functions: Vec<FunctionMetrics>,
        classes: Vec<ClassMetrics>,
    ) -> Self {
        let complexity_summary = ComplexitySummary::from_functions(&functions, &classes);
        Self {
            file_path: file_path.into(),
            timestamp: Utc::now(),
            status: AnalysisStatus::Success,
            error: None,
            functions,
            classes,
            complexity_summary,
        }
    }

    /// An error result carries no functions or classes
    pub fn failure(file_path: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            timestamp: Utc::now(),
            status: AnalysisStatus::Error,
            error: Some(error.into()),
            functions: Vec::new(),
            classes: Vec::new(),
            complexity_summary: ComplexitySummary::default(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == AnalysisStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn function(name: &str, complexity: u32) -> FunctionMetrics {
        FunctionMetrics {
            name: name.to_string(),
            complexity,
            ..Default::default()
        }
    }

    #[test]
    fn test_identity_equality() {
        let a = FileIdentity::from_content("a.py", "def f(): pass").unwrap();
        let b = FileIdentity::from_content("a.py", "def f(): pass").unwrap();
        let c = FileIdentity::from_content("a.py", "def f(): return 1").unwrap();
        let d = FileIdentity::from_content("b.py", "def f(): pass").unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_eq!(a.content_hash.len(), 64);
    }

    #[test]
    fn test_identity_rejects_empty_fields() {
        assert!(matches!(
            FileIdentity::new("", "abc"),
            Err(PipelineError::InvalidIdentity(_))
        ));
        assert!(matches!(
            FileIdentity::new("a.py", ""),
            Err(PipelineError::InvalidIdentity(_))
        ));
    }

    #[test]
    fn test_complexity_summary_includes_methods() {
        let functions = vec![function("a", 2), function("b", 8)];
        let classes = vec![ClassMetrics {
            name: "K".to_string(),
            methods: vec![function("m", 5)],
            ..Default::default()
        }];

        let summary = ComplexitySummary::from_functions(&functions, &classes);
        assert_eq!(summary.total, 15);
        assert_eq!(summary.max, 8);
        assert_eq!(summary.min, 2);
        assert!((summary.average - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_complexity_summary_empty() {
        assert_eq!(
            ComplexitySummary::from_functions(&[], &[]),
            ComplexitySummary::default()
        );
    }

    #[test]
    fn test_failure_result_is_empty() {
        let result = AnalysisResult::failure("a.py", "boom");
        assert_eq!(result.status, AnalysisStatus::Error);
        assert_eq!(result.error.as_deref(), Some("boom"));
        assert!(result.functions.is_empty());
        assert!(result.classes.is_empty());
    }
}
