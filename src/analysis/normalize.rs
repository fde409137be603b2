use serde_json::{Map, Value};

use super::types::{ClassMetrics, FunctionMetrics, ParamInfo};
use crate::utils::PipelineError;

// Field aliases, first present wins
const FUNCTION_NAME: &[&str] = &["name", "function_name", "func_name"];
const LINE: &[&str] = &["line", "line_number", "lineno", "start_line"];
const COMPLEXITY: &[&str] = &["complexity", "cyclomatic_complexity", "cc"];
const REFERENCE_COUNT: &[&str] = &["reference_count", "references", "ref_count", "call_count"];
const LINE_COUNT: &[&str] = &["line_count", "lines", "loc", "length"];
const PARAMETERS: &[&str] = &["parameters", "params", "args", "arguments"];
const HAS_DOCSTRING: &[&str] = &["has_docstring", "has_doc", "docstring"];
const PERFORMANCE_MARKERS: &[&str] = &["performance_markers", "performance_issues", "patterns"];
const NESTED_LOOPS: &[&str] = &["nested_loops", "has_nested_loops"];

const CLASS_NAME: &[&str] = &["name", "class_name"];
const TOTAL_COMPLEXITY: &[&str] = &["total_complexity", "complexity", "cyclomatic_complexity"];
const METHODS: &[&str] = &["methods", "functions"];

const ROOT_FUNCTIONS: &[&str] = &["functions", "function_metrics"];
const ROOT_CLASSES: &[&str] = &["classes", "class_metrics"];
const ROOT_ERROR: &[&str] = &["error"];

const PARAM_NAME: &[&str] = &["name", "arg", "id"];
const PARAM_ANNOTATION: &[&str] = &["type", "annotation", "type_annotation"];
const PARAM_DEFAULT: &[&str] = &["default", "has_default", "default_value"];

pub const NESTED_LOOP_MARKER: &str = "nested-loop";

/// Loosely-structured analyzer output, as received
#[derive(Debug, Clone, PartialEq)]
pub struct RawMetrics(pub Value);

impl RawMetrics {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Parse analyzer stdout
    pub fn from_json(text: &str) -> Result<Self, PipelineError> {
        let value: Value = serde_json::from_str(text.trim())
            .map_err(|e| PipelineError::MalformedPayload(e.to_string()))?;
        Ok(Self(value))
    }
}

impl From<Value> for RawMetrics {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Canonical metrics extracted from a raw payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedMetrics {
    pub functions: Vec<FunctionMetrics>,
    pub classes: Vec<ClassMetrics>,
}

/// Map a raw payload onto the canonical shape.
///
/// Missing fields degrade to defaults one at a time. Only a payload that is
/// not an object, or that reports its own `error`, fails as a whole.
pub fn normalize(raw: &RawMetrics) -> Result<NormalizedMetrics, PipelineError> {
    let root = raw.0.as_object().ok_or_else(|| {
        PipelineError::MalformedPayload(format!(
            "expected a JSON object, found {}",
            kind_of(&raw.0)
        ))
    })?;

    if let Some(error) = lookup(root, ROOT_ERROR).filter(|v| !v.is_null()) {
        let message = error
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(PipelineError::Producer(message));
    }

    let functions = objects(root, ROOT_FUNCTIONS)
        .map(normalize_function)
        .collect();
    let classes = objects(root, ROOT_CLASSES).map(normalize_class).collect();

    Ok(NormalizedMetrics { functions, classes })
}

pub fn normalize_function(record: &Map<String, Value>) -> FunctionMetrics {
    let mut performance_markers: Vec<String> = array(record, PERFORMANCE_MARKERS)
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();
    if lookup(record, NESTED_LOOPS).is_some_and(truthy)
        && !performance_markers.iter().any(|m| m == NESTED_LOOP_MARKER)
    {
        performance_markers.push(NESTED_LOOP_MARKER.to_string());
    }

    FunctionMetrics {
        name: string(record, FUNCTION_NAME),
        line: number(record, LINE),
        complexity: number(record, COMPLEXITY),
        reference_count: number(record, REFERENCE_COUNT),
        line_count: number(record, LINE_COUNT),
        parameters: array(record, PARAMETERS).filter_map(normalize_param).collect(),
        has_docstring: lookup(record, HAS_DOCSTRING).is_some_and(truthy),
        performance_markers,
    }
}

pub fn normalize_class(record: &Map<String, Value>) -> ClassMetrics {
    ClassMetrics {
        name: string(record, CLASS_NAME),
        line: number(record, LINE),
        total_complexity: number(record, TOTAL_COMPLEXITY),
        line_count: number(record, LINE_COUNT),
        methods: objects(record, METHODS).map(normalize_function).collect(),
    }
}

fn normalize_param(value: &Value) -> Option<ParamInfo> {
    match value {
        Value::String(name) => Some(ParamInfo::named(name.clone())),
        Value::Object(record) => Some(ParamInfo {
            name: string(record, PARAM_NAME),
            annotation: lookup(record, PARAM_ANNOTATION)
                .and_then(Value::as_str)
                .map(str::to_string),
            has_default: lookup(record, PARAM_DEFAULT)
                .is_some_and(|v| !v.is_null() && v != &Value::Bool(false)),
        }),
        _ => None,
    }
}

fn lookup<'a>(record: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases.iter().find_map(|alias| record.get(*alias))
}

fn string(record: &Map<String, Value>, aliases: &[&str]) -> String {
    lookup(record, aliases)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Integers, floats (truncated) and numeric strings; negatives clamp to 0
fn number(record: &Map<String, Value>, aliases: &[&str]) -> u32 {
    let parsed = match lookup(record, aliases) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() && v > 0.0 => v.min(f64::from(u32::MAX)) as u32,
        _ => 0,
    }
}

fn array<'a>(record: &'a Map<String, Value>, aliases: &[&str]) -> impl Iterator<Item = &'a Value> {
    lookup(record, aliases)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

fn objects<'a>(
    record: &'a Map<String, Value>,
    aliases: &[&str],
) -> impl Iterator<Item = &'a Map<String, Value>> {
    array(record, aliases).filter_map(Value::as_object)
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
        Value::Null => false,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn normalize_value(value: Value) -> NormalizedMetrics {
        normalize(&RawMetrics::new(value)).unwrap()
    }

    #[test]
    fn test_canonical_field_names() {
        let metrics = normalize_value(json!({
            "functions": [{
                "name": "f",
                "line": 3,
                "complexity": 4,
                "reference_count": 2,
                "line_count": 12,
                "parameters": ["a", "b"],
                "has_docstring": true
            }]
        }));

        assert_eq!(
            metrics.functions,
            vec![FunctionMetrics {
                name: "f".to_string(),
                line: 3,
                complexity: 4,
                reference_count: 2,
                line_count: 12,
                parameters: vec![ParamInfo::named("a"), ParamInfo::named("b")],
                has_docstring: true,
                performance_markers: vec![],
            }]
        );
        assert!(metrics.classes.is_empty());
    }

    #[test]
    fn test_alias_field_names() {
        let metrics = normalize_value(json!({
            "function_metrics": [{
                "function_name": "g",
                "line_number": 10,
                "cyclomatic_complexity": 7,
                "references": 1,
                "loc": 30,
                "args": [{"name": "x", "annotation": "int", "default": 0}],
                "docstring": "Does things."
            }]
        }));

        let f = &metrics.functions[0];
        assert_eq!(f.name, "g");
        assert_eq!(f.line, 10);
        assert_eq!(f.complexity, 7);
        assert_eq!(f.reference_count, 1);
        assert_eq!(f.line_count, 30);
        assert!(f.has_docstring);
        assert_eq!(
            f.parameters,
            vec![ParamInfo {
                name: "x".to_string(),
                annotation: Some("int".to_string()),
                has_default: true,
            }]
        );
    }

    #[test]
    fn test_missing_fields_default() {
        let metrics = normalize_value(json!({ "functions": [{}] }));
        assert_eq!(metrics.functions, vec![FunctionMetrics::default()]);
    }

    #[test]
    fn test_numeric_coercion() {
        let metrics = normalize_value(json!({
            "functions": [
                {"complexity": 3.9, "line": "42", "line_count": -5},
                {"complexity": "not a number", "line": null}
            ]
        }));

        assert_eq!(metrics.functions[0].complexity, 3);
        assert_eq!(metrics.functions[0].line, 42);
        assert_eq!(metrics.functions[0].line_count, 0);
        assert_eq!(metrics.functions[1].complexity, 0);
        assert_eq!(metrics.functions[1].line, 0);
    }

    #[test]
    fn test_empty_docstring_is_missing() {
        let metrics = normalize_value(json!({
            "functions": [{"name": "h", "docstring": ""}, {"name": "i", "docstring": null}]
        }));
        assert!(!metrics.functions[0].has_docstring);
        assert!(!metrics.functions[1].has_docstring);
    }

    #[test]
    fn test_performance_markers() {
        let metrics = normalize_value(json!({
            "functions": [
                {"name": "a", "nested_loops": 2},
                {
                    "name": "b",
                    "performance_issues": ["string-concat-in-loop", "nested-loop"],
                    "nested_loops": true
                },
                {"name": "c", "nested_loops": false}
            ]
        }));

        assert_eq!(metrics.functions[0].performance_markers, vec!["nested-loop"]);
        assert_eq!(
            metrics.functions[1].performance_markers,
            vec!["string-concat-in-loop", "nested-loop"]
        );
        assert!(metrics.functions[2].performance_markers.is_empty());
    }

    #[test]
    fn test_classes_with_methods() {
        let metrics = normalize_value(json!({
            "classes": [{
                "class_name": "Parser",
                "lineno": 5,
                "cyclomatic_complexity": 14,
                "lines": 120,
                "functions": [{"name": "parse", "cc": 9}]
            }]
        }));

        let class = &metrics.classes[0];
        assert_eq!(class.name, "Parser");
        assert_eq!(class.line, 5);
        assert_eq!(class.total_complexity, 14);
        assert_eq!(class.line_count, 120);
        assert_eq!(class.methods.len(), 1);
        assert_eq!(class.methods[0].complexity, 9);
    }

    #[test]
    fn test_non_object_items_are_skipped() {
        let metrics = normalize_value(json!({
            "functions": [1, "x", {"name": "ok"}],
            "classes": "not an array"
        }));
        assert_eq!(metrics.functions.len(), 1);
        assert!(metrics.classes.is_empty());
    }

    #[test]
    fn test_unparseable_payload_fails() {
        assert!(matches!(
            normalize(&RawMetrics::new(json!([1, 2, 3]))),
            Err(PipelineError::MalformedPayload(_))
        ));
        assert!(matches!(
            RawMetrics::from_json("<html>"),
            Err(PipelineError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_reported_error_fails() {
        let result = normalize(&RawMetrics::new(json!({"error": "SyntaxError: invalid syntax"})));
        match result {
            Err(PipelineError::Producer(message)) => assert!(message.contains("SyntaxError")),
            other => panic!("Expected producer error, got {:?}", other),
        }

        // A null error field is ignored
        assert!(normalize(&RawMetrics::new(json!({"error": null, "functions": []}))).is_ok());
    }
}
