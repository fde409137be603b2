use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use super::normalize::RawMetrics;
use super::types::FileIdentity;
use crate::app::AnalyzerConfig;
use crate::utils::PipelineError;

/// Source of raw metrics for one file version (the expensive, external step)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetricsProducer: Send + Sync {
    /// Analyze the file identified by `identity`
    async fn produce(&self, identity: &FileIdentity) -> Result<RawMetrics, PipelineError>;
}

/// Runs an external analyzer executable and reads JSON metrics from stdout
#[derive(Debug, Clone)]
pub struct ExternalAnalyzer {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ExternalAnalyzer {
    pub fn new(command: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self::new(
            config.command.clone(),
            config.args.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Resolve the analyzer executable on PATH
    pub fn resolve(&self) -> Result<PathBuf, PipelineError> {
        which::which(&self.command)
            .map_err(|e| PipelineError::AnalyzerUnavailable(format!("{}: {}", self.command, e)))
    }

    async fn run(&self, program: PathBuf, path: &str) -> Result<String, PipelineError> {
        let output = Command::new(program)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PipelineError::Producer(format!(
                "{} exited with status {}: {}",
                self.command,
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl MetricsProducer for ExternalAnalyzer {
    async fn produce(&self, identity: &FileIdentity) -> Result<RawMetrics, PipelineError> {
        let program = self.resolve()?;
        debug!("Running {} on {}", program.display(), identity.path);

        match timeout(self.timeout, self.run(program, &identity.path)).await {
            Ok(Ok(stdout)) => RawMetrics::from_json(&stdout),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(PipelineError::Timeout(self.timeout.as_millis() as u64)),
        }
    }
}
