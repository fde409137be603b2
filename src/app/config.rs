use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{
    ANALYZER_TIMEOUT_SECS, CONFIG_ENV_PREFIX, DEFAULT_ANALYSIS_CACHE_CAPACITY,
    DEFAULT_ANALYZER_COMMAND, DEFAULT_COMPLEXITY_HIGH, DEFAULT_COMPLEXITY_MEDIUM,
    DEFAULT_MAX_CLASS_LINES, DEFAULT_MAX_FUNCTION_LINES, DEFAULT_MAX_PARAMETERS,
    DEFAULT_SUGGESTION_CACHE_CAPACITY, DEFAULT_THROTTLE_WINDOW_MS, LOCAL_CONFIG_PATH,
};
use crate::suggestions::SuggestionThresholds;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Analysis result cache
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Suggestion rules and cache
    #[serde(default)]
    pub suggestions: SuggestionConfig,

    /// External analyzer invocation
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
}

/// Analysis cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Maximum number of files with cached results
    pub cache_capacity: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_ANALYSIS_CACHE_CAPACITY,
        }
    }
}

/// Suggestion configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionConfig {
    /// Maximum number of cached suggestion lists
    pub cache_capacity: usize,
    /// Window in which repeated requests reuse the last result
    pub throttle_window_ms: u64,
    /// Complexity at which a warning is raised
    pub complexity_medium: u32,
    /// Complexity at which an error is raised
    pub complexity_high: u32,
    /// Parameter count at which consolidation is suggested
    pub max_parameters: usize,
    /// Function length at which decomposition is suggested
    pub max_function_lines: u32,
    /// Class length at which splitting is suggested
    pub max_class_lines: u32,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_SUGGESTION_CACHE_CAPACITY,
            throttle_window_ms: DEFAULT_THROTTLE_WINDOW_MS,
            complexity_medium: DEFAULT_COMPLEXITY_MEDIUM,
            complexity_high: DEFAULT_COMPLEXITY_HIGH,
            max_parameters: DEFAULT_MAX_PARAMETERS,
            max_function_lines: DEFAULT_MAX_FUNCTION_LINES,
            max_class_lines: DEFAULT_MAX_CLASS_LINES,
        }
    }
}

impl SuggestionConfig {
    pub fn thresholds(&self) -> SuggestionThresholds {
        SuggestionThresholds {
            complexity_medium: self.complexity_medium,
            complexity_high: self.complexity_high,
            max_parameters: self.max_parameters,
            max_function_lines: self.max_function_lines,
            max_class_lines: self.max_class_lines,
        }
    }

    pub fn throttle_window(&self) -> Duration {
        Duration::from_millis(self.throttle_window_ms)
    }
}

/// External analyzer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Executable name or path
    pub command: String,
    /// Arguments placed before the file path
    pub args: Vec<String>,
    /// Seconds before a run counts as failed
    pub timeout_secs: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_ANALYZER_COMMAND.to_string(),
            args: vec![],
            timeout_secs: ANALYZER_TIMEOUT_SECS,
        }
    }
}

/// Load configuration from multiple sources.
///
/// An explicit file replaces the global and local files; environment
/// variables (`CODEPULSE_SECTION__KEY`) always apply last.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    if let Some(path) = explicit {
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        figment = figment.merge(Toml::file(path));
    } else {
        // Add global config if it exists
        if let Some(global_config) = global_config_path() {
            if global_config.exists() {
                figment = figment.merge(Toml::file(&global_config));
            }
        }

        // Add local config if it exists
        let local_config = PathBuf::from(LOCAL_CONFIG_PATH);
        if local_config.exists() {
            figment = figment.merge(Toml::file(&local_config));
        }
    }

    figment = figment.merge(Env::prefixed(CONFIG_ENV_PREFIX).split("__"));

    figment.extract().context("Failed to load configuration")
}

fn global_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "codepulse").map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "codepulse") {
        let config_dir = proj_dirs.config_dir();
        std::fs::create_dir_all(config_dir)?;
        Ok(config_dir.to_path_buf())
    } else {
        // Fallback to home directory
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .context("Could not determine home directory")?;
        let config_dir = PathBuf::from(home).join(".config").join("codepulse");
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }
}

/// Save configuration to file
pub fn save_config(config: &Config, path: Option<PathBuf>) -> Result<()> {
    let path = if let Some(p) = path {
        p
    } else {
        get_config_dir()?.join("config.toml")
    };

    let toml_string = toml::to_string_pretty(config)?;
    std::fs::write(&path, toml_string)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    Ok(())
}

/// Create a default configuration file if it doesn't exist
pub fn init_config() -> Result<PathBuf> {
    let config_file = get_config_dir()?.join("config.toml");

    if !config_file.exists() {
        save_config(&Config::default(), Some(config_file.clone()))?;
    }

    Ok(config_file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.analysis.cache_capacity, 100);
        assert_eq!(config.suggestions.cache_capacity, 50);
        assert_eq!(config.suggestions.complexity_medium, 6);
        assert_eq!(config.suggestions.complexity_high, 11);
        assert_eq!(config.suggestions.thresholds(), SuggestionThresholds::default());
    }

    #[test]
    fn test_explicit_file_overrides_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[suggestions]\ncomplexity_high = 20\n\n[analyzer]\ncommand = \"radon-json\"\n",
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.suggestions.complexity_high, 20);
        // Unset keys keep their defaults
        assert_eq!(config.suggestions.complexity_medium, 6);
        assert_eq!(config.analyzer.command, "radon-json");
        assert_eq!(config.analysis.cache_capacity, 100);
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        assert!(load_config(Some(&temp_dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn test_save_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("saved.toml");
        let mut config = Config::default();
        config.suggestions.throttle_window_ms = 10;

        save_config(&config, Some(path.clone())).unwrap();
        assert_eq!(load_config(Some(&path)).unwrap(), config);
    }
}
