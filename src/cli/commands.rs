use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;

use crate::{
    analysis::ExternalAnalyzer,
    app::{init_config, load_config, Config},
    runtime::{Pipeline, Runner},
};

use super::{Cli, Commands, OutputFormat};

/// Handle CLI subcommands; returns the process exit code
pub async fn handle_command(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Init => {
            let path = init_config()?;
            println!("Configuration at: {}", path.display());
            Ok(0)
        }
        Commands::Version => {
            show_version();
            Ok(0)
        }
        Commands::Analyze {
            paths,
            format,
            stats,
        } => {
            let config = load_config(cli.config.as_deref())?;
            warn_if_analyzer_missing(&config, format);

            let runner = Runner::new(Pipeline::from_config(&config)?, format);
            let summary = runner.analyze_paths(&paths, stats).await?;
            println!("{}", runner.format_summary(&summary)?);
            let failures = summary.failures();
            runner.shutdown().await;

            Ok(if failures > 0 { 1 } else { 0 })
        }
        Commands::Watch { path, format } => {
            let config = load_config(cli.config.as_deref())?;
            warn_if_analyzer_missing(&config, format);

            let root = path.unwrap_or_else(|| PathBuf::from("."));
            let runner = Runner::new(Pipeline::from_config(&config)?, format);
            runner.watch(&root).await?;
            runner.shutdown().await;
            Ok(0)
        }
    }
}

/// Results still come back as "analysis unavailable", this only saves a
/// confused user some time
fn warn_if_analyzer_missing(config: &Config, format: OutputFormat) {
    if format == OutputFormat::Text {
        if let Err(e) = ExternalAnalyzer::from_config(&config.analyzer).resolve() {
            eprintln!("{} {}", "[WARNING]".yellow(), e);
        }
    }
}

/// Show version information
pub fn show_version() {
    println!("codepulse v{}", env!("CARGO_PKG_VERSION"));
    println!("   Incremental code metrics and refactoring suggestions");
}
