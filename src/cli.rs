//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// corpus-stats - descriptive statistics for annotated corpora
///
/// Counts utterances, tokens, entity mentions and coreference-chain
/// lengths over a directory of recipe JSON files or a narration CSV.
///
/// Examples:
///   corpus-stats --recipes-path ./recipes/
///   corpus-stats --narration-path ./epic_train_action_labels.csv
///   corpus-stats --recipes-path ./recipes/ --format json -o stats.json
///   corpus-stats --recipes-path ./recipes/ --annotate-sample 20
///   corpus-stats --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Directory of per-recipe JSON files
    #[arg(
        long,
        value_name = "DIR",
        alias = "recipes_path",
        conflicts_with = "narration_path"
    )]
    pub recipes_path: Option<PathBuf>,

    /// CSV file of narration action labels
    #[arg(
        long,
        value_name = "FILE",
        aliases = ["epic_narration_path", "epic-narration-path"]
    )]
    pub narration_path: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .corpus-stats.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Report format (text, markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Write the report to a file instead of standard output
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Number of extraction worker threads
    #[arg(long, value_name = "NUM")]
    pub concurrency: Option<usize>,

    /// Descend into subdirectories of the recipe directory
    #[arg(long)]
    pub recursive: bool,

    /// Maximum number of recipe files to analyze
    #[arg(long, value_name = "COUNT")]
    pub max_files: Option<usize>,

    /// Send the first N utterances to the annotation server
    ///
    /// The statistics never depend on the server; this only adds an
    /// annotation section to the report.
    #[arg(long, value_name = "N")]
    pub annotate_sample: Option<usize>,

    /// CoreNLP server URL used by --annotate-sample
    #[arg(long, value_name = "URL", env = "CORENLP_URL")]
    pub corenlp_url: Option<String>,

    /// Annotation request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub annotation_timeout: Option<u64>,

    /// Exit with code 2 if any record was rejected
    #[arg(long)]
    pub fail_on_rejected: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .corpus-stats.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One labeled line per statistic (default)
    #[default]
    Text,
    /// Markdown tables
    Markdown,
    /// JSON document
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        match (&self.recipes_path, &self.narration_path) {
            (None, None) => {
                return Err("One of --recipes-path or --narration-path is required".to_string());
            }
            (Some(_), Some(_)) => {
                return Err("Cannot use both --recipes-path and --narration-path".to_string());
            }
            (Some(dir), None) => {
                if !dir.exists() {
                    return Err(format!("Recipe directory does not exist: {}", dir.display()));
                }
                if !dir.is_dir() {
                    return Err(format!("Recipe path is not a directory: {}", dir.display()));
                }
            }
            (None, Some(file)) => {
                if !file.exists() {
                    return Err(format!("Narration file does not exist: {}", file.display()));
                }
                if !file.is_file() {
                    return Err(format!("Narration path is not a file: {}", file.display()));
                }
            }
        }

        if self.concurrency == Some(0) {
            return Err("Concurrency must be at least 1".to_string());
        }

        if self.max_files == Some(0) {
            return Err("Max files must be at least 1".to_string());
        }

        if self.annotation_timeout == Some(0) {
            return Err("Annotation timeout must be at least 1 second".to_string());
        }

        if let Some(ref url) = self.corenlp_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("CoreNLP URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            recipes_path: Some(std::env::temp_dir()),
            narration_path: None,
            config: None,
            format: None,
            output: None,
            concurrency: None,
            recursive: false,
            max_files: None,
            annotate_sample: None,
            corenlp_url: None,
            annotation_timeout: None,
            fail_on_rejected: false,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_validation_ok() {
        assert!(make_args().validate().is_ok());
    }

    #[test]
    fn test_validation_requires_input() {
        let mut args = make_args();
        args.recipes_path = None;
        assert!(args.validate().is_err());

        args.init_config = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_missing_directory() {
        let mut args = make_args();
        args.recipes_path = Some(PathBuf::from("/definitely/not/a/recipe/dir"));
        let err = args.validate().unwrap_err();
        assert!(err.contains("does not exist"));
    }

    #[test]
    fn test_validation_narration_must_be_file() {
        let mut args = make_args();
        args.recipes_path = None;
        args.narration_path = Some(std::env::temp_dir());
        let err = args.validate().unwrap_err();
        assert!(err.contains("not a file"));
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_concurrency() {
        let mut args = make_args();
        args.concurrency = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_parse_legacy_flag_names() {
        let args = Args::try_parse_from(["corpus-stats", "--recipes_path", "/tmp"]).unwrap();
        assert_eq!(args.recipes_path, Some(PathBuf::from("/tmp")));

        let args =
            Args::try_parse_from(["corpus-stats", "--epic_narration_path", "labels.csv"]).unwrap();
        assert_eq!(args.narration_path, Some(PathBuf::from("labels.csv")));
    }

    #[test]
    fn test_parse_rejects_both_inputs() {
        let result = Args::try_parse_from([
            "corpus-stats",
            "--recipes-path",
            "/tmp",
            "--narration-path",
            "labels.csv",
        ]);
        assert!(result.is_err());
    }
}
