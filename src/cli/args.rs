use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "codepulse")]
#[command(version)]
#[command(about = "Incremental code metrics and refactoring suggestions", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "CODEPULSE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze files or directories and print suggestions
    Analyze {
        /// Files or directories to analyze
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Print cache statistics after the run
        #[arg(long)]
        stats: bool,
    },
    /// Watch a directory and re-analyze files as they change
    Watch {
        /// Directory to watch (defaults to current directory)
        path: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Initialize configuration
    Init,
    /// Show version information
    Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON structured output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_analyze() {
        let cli = Cli::parse_from([
            "codepulse", "-v", "analyze", "src", "a.py", "--format", "json",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Analyze {
                paths,
                format,
                stats,
            } => {
                assert_eq!(paths, vec![PathBuf::from("src"), PathBuf::from("a.py")]);
                assert_eq!(format, OutputFormat::Json);
                assert!(!stats);
            }
            other => panic!("Expected analyze, got {:?}", other),
        }
    }

    #[test]
    fn test_analyze_requires_paths() {
        assert!(Cli::try_parse_from(["codepulse", "analyze"]).is_err());
    }
}
