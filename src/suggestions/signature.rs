use super::engine::SuggestionThresholds;
use super::types::CodeUnit;

/// Position-independent identity of a code unit for suggestion caching.
///
/// Buckets count how many rule thresholds a value reaches, so two units
/// with the same signature always trigger the same rules. Line numbers are
/// left out so edits elsewhere in the file keep the cached suggestions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Signature {
    Function {
        name: String,
        line_bucket: u8,
        parameter_count: usize,
        complexity_bucket: u8,
        has_docstring: bool,
        markers: Vec<String>,
    },
    Class {
        name: String,
        line_bucket: u8,
        method_count: usize,
        complexity_bucket: u8,
    },
}

impl Signature {
    pub fn of(unit: &CodeUnit, thresholds: &SuggestionThresholds) -> Self {
        match unit {
            CodeUnit::Function(f) => {
                let mut markers = f.performance_markers.clone();
                markers.sort();
                markers.dedup();
                Signature::Function {
                    name: f.name.clone(),
                    line_bucket: bucket(f.line_count, &[thresholds.max_function_lines]),
                    parameter_count: f.parameters.len(),
                    complexity_bucket: complexity_bucket(f.complexity, thresholds),
                    has_docstring: f.has_docstring,
                    markers,
                }
            }
            CodeUnit::Class(c) => Signature::Class {
                name: c.name.clone(),
                line_bucket: bucket(c.line_count, &[thresholds.max_class_lines]),
                method_count: c.methods.len(),
                complexity_bucket: complexity_bucket(c.total_complexity, thresholds),
            },
        }
    }
}

fn complexity_bucket(value: u32, thresholds: &SuggestionThresholds) -> u8 {
    bucket(value, &[thresholds.complexity_medium, thresholds.complexity_high])
}

/// Number of thresholds `value` reaches
fn bucket(value: u32, thresholds: &[u32]) -> u8 {
    thresholds.iter().filter(|&&t| value >= t).count() as u8
}
