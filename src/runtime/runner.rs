use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Interval;
use tracing::{debug, warn};

use super::pipeline::{FileReport, Pipeline};
use crate::cli::OutputFormat;
use crate::constants::WATCH_POLL_INTERVAL_MS;
use crate::metrics::PipelineMetrics;
use crate::suggestions::{Severity, Suggestion};
use crate::utils::{is_source_file, FileEvent, FileSystemWatcher};

/// Outcome of an `analyze` run
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub reports: Vec<FileReport>,
    /// Files that could not be read
    pub unreadable: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<PipelineMetrics>,
}

impl RunSummary {
    /// Files whose analysis could not be completed
    pub fn failures(&self) -> usize {
        self.unreadable.len() + self.reports.iter().filter(|r| !r.result.is_success()).count()
    }
}

/// Drives the pipeline for CLI commands
pub struct Runner {
    pipeline: Pipeline,
    format: OutputFormat,
}

impl Runner {
    pub fn new(pipeline: Pipeline, format: OutputFormat) -> Self {
        Self { pipeline, format }
    }

    /// Analyze every source file under `paths`
    pub async fn analyze_paths(&self, paths: &[PathBuf], with_stats: bool) -> Result<RunSummary> {
        let files = collect_source_files(paths);
        debug!("Analyzing {} files", files.len());

        let mut reports = Vec::with_capacity(files.len());
        let mut unreadable = Vec::new();
        for file in &files {
            match self.analyze_file(file).await {
                Ok(report) => reports.push(report),
                Err(e) => {
                    warn!("Skipping {}: {:#}", file.display(), e);
                    unreadable.push(file.display().to_string());
                }
            }
        }

        Ok(RunSummary {
            reports,
            unreadable,
            metrics: with_stats.then(|| self.pipeline.metrics()),
        })
    }

    async fn analyze_file(&self, path: &Path) -> Result<FileReport> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let report = self
            .pipeline
            .analyze_source(&path.display().to_string(), &content)
            .await?;
        Ok(report)
    }

    /// Format a whole run for output
    pub fn format_summary(&self, summary: &RunSummary) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(summary)?),
            OutputFormat::Text => {
                let mut out: Vec<String> = summary.reports.iter().map(format_report_text).collect();
                for path in &summary.unreadable {
                    out.push(format!("{}  {}", path.bold(), "unreadable".red()));
                }
                if let Some(metrics) = &summary.metrics {
                    out.push(metrics.format());
                }
                Ok(out.join("\n"))
            }
        }
    }

    fn format_report(&self, report: &FileReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string(report)?),
            OutputFormat::Text => Ok(format_report_text(report)),
        }
    }

    /// Re-analyze source files under `root` as they change, until Ctrl-C
    pub async fn watch(&self, root: &Path) -> Result<()> {
        let watcher = FileSystemWatcher::new(root)
            .with_context(|| format!("Failed to watch {}", root.display()))?;

        let initial = self.analyze_paths(&[root.to_path_buf()], false).await?;
        for report in &initial.reports {
            println!("{}", self.format_report(report)?);
        }

        let mut interval = tokio::time::interval(Duration::from_millis(WATCH_POLL_INTERVAL_MS));
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = self.poll_events(&watcher, &mut interval) => {}
            }
        }

        println!("{}", self.pipeline.metrics().format());
        Ok(())
    }

    /// Wait for the next tick and handle whatever the watcher collected
    async fn poll_events(&self, watcher: &FileSystemWatcher, interval: &mut Interval) {
        interval.tick().await;
        for event in watcher.check_events() {
            if let Err(e) = self.handle_event(event).await {
                warn!("Failed to handle file event: {:#}", e);
            }
        }
    }

    async fn handle_event(&self, event: FileEvent) -> Result<()> {
        match event {
            FileEvent::Created(paths) | FileEvent::Modified(paths) => {
                for path in paths.iter().filter(|p| p.is_file()) {
                    match self.analyze_file(path).await {
                        Ok(report) => println!("{}", self.format_report(&report)?),
                        Err(e) => warn!("Skipping {}: {:#}", path.display(), e),
                    }
                }
            }
            FileEvent::Deleted(paths) => {
                for path in paths {
                    self.pipeline.invalidate(&path.display().to_string());
                }
            }
        }
        Ok(())
    }

    pub async fn shutdown(self) {
        self.pipeline.shutdown().await;
    }
}

/// Expand directories (honouring .gitignore) into source files
pub fn collect_source_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
            continue;
        }
        let walker = ignore::WalkBuilder::new(path).build();
        for entry in walker.flatten() {
            let entry_path = entry.path();
            if entry.file_type().is_some_and(|t| t.is_file()) && is_source_file(entry_path) {
                files.push(entry_path.to_path_buf());
            }
        }
    }
    files.sort();
    files.dedup();
    files
}

fn format_report_text(report: &FileReport) -> String {
    let path = report.identity.path.bold();
    if !report.result.is_success() {
        return format!(
            "{}  {} {}",
            path,
            "analysis unavailable:".yellow(),
            report.result.error.as_deref().unwrap_or("unknown error").dimmed()
        );
    }

    let mut entries: Vec<(u32, String, &Suggestion)> = Vec::new();
    for f in &report.functions {
        entries.extend(f.suggestions.iter().map(|s| (f.line, f.name.clone(), s)));
    }
    for c in &report.classes {
        entries.extend(c.suggestions.iter().map(|s| (c.line, c.name.clone(), s)));
        for m in &c.methods {
            let label = format!("{}.{}", c.name, m.name);
            entries.extend(m.suggestions.iter().map(|s| (m.line, label.clone(), s)));
        }
    }
    entries.sort_by_key(|(line, _, s)| (*line, s.priority));

    let summary = &report.result.complexity_summary;
    let mut lines = vec![format!(
        "{}  {} functions, {} classes, complexity avg {:.1} / max {}",
        path,
        report.result.functions.len(),
        report.result.classes.len(),
        summary.average,
        summary.max
    )];
    if entries.is_empty() {
        lines.push(format!("  {}", "no suggestions".green()));
    }
    for (line, label, s) in entries {
        lines.push(format!(
            "  {:>5}:{}  {}  {}",
            line,
            label.cyan(),
            severity_label(s.severity),
            s.message
        ));
    }
    lines.join("\n")
}

fn severity_label(severity: Severity) -> colored::ColoredString {
    let label = format!("{:<7}", severity.as_str());
    match severity {
        Severity::Error => label.red().bold(),
        Severity::Warning => label.yellow(),
        Severity::Info => label.blue(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{FileIdentity, MetricsProducer, RawMetrics};
    use crate::app::Config;
    use crate::utils::PipelineError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct OneFunction;

    #[async_trait]
    impl MetricsProducer for OneFunction {
        async fn produce(&self, _identity: &FileIdentity) -> Result<RawMetrics, PipelineError> {
            Ok(RawMetrics::new(json!({
                "functions": [{"name": "f", "complexity": 1, "line_count": 1}]
            })))
        }
    }

    fn runner() -> Runner {
        let pipeline = Pipeline::with_producer(&Config::default(), Arc::new(OneFunction)).unwrap();
        Runner::new(pipeline, OutputFormat::Json)
    }

    #[tokio::test]
    async fn test_modified_event_with_same_content_is_cache_hit() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a.py");
        fs::write(&file, "def f(): pass").unwrap();
        let runner = runner();

        runner.handle_event(FileEvent::Created(vec![file.clone()])).await.unwrap();
        runner.handle_event(FileEvent::Modified(vec![file.clone()])).await.unwrap();

        let metrics = runner.pipeline.metrics();
        assert_eq!(metrics.analysis.producer_invocations, 1);
        assert_eq!(metrics.analysis.cache.hits, 1);

        fs::write(&file, "def f():\n    return 1").unwrap();
        runner.handle_event(FileEvent::Modified(vec![file])).await.unwrap();
        assert_eq!(runner.pipeline.metrics().analysis.producer_invocations, 2);
    }

    #[tokio::test]
    async fn test_deleted_event_invalidates_path() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a.py");
        let content = "def f(): pass";
        fs::write(&file, content).unwrap();
        let runner = runner();
        let identity = FileIdentity::from_content(&file.display().to_string(), content).unwrap();

        runner.handle_event(FileEvent::Modified(vec![file.clone()])).await.unwrap();
        assert!(runner.pipeline.cached_result(&identity).is_some());

        fs::remove_file(&file).unwrap();
        runner.handle_event(FileEvent::Deleted(vec![file])).await.unwrap();

        assert!(runner.pipeline.cached_result(&identity).is_none());
        assert_eq!(runner.pipeline.metrics().analysis.cache.size, 0);
    }

    #[tokio::test]
    async fn test_event_for_vanished_file_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let runner = runner();

        let missing = temp_dir.path().join("gone.py");
        runner.handle_event(FileEvent::Modified(vec![missing])).await.unwrap();
        assert_eq!(runner.pipeline.metrics().analysis.producer_invocations, 0);
    }

    #[test]
    fn test_collect_source_files() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir(root.join("pkg")).unwrap();
        fs::write(root.join("pkg/a.py"), "def a(): pass").unwrap();
        fs::write(root.join("b.rs"), "fn b() {}").unwrap();
        fs::write(root.join("notes.txt"), "ignore me").unwrap();

        let files = collect_source_files(&[root.to_path_buf(), root.join("b.rs")]);
        assert_eq!(files, vec![root.join("b.rs"), root.join("pkg/a.py")]);
    }
}
