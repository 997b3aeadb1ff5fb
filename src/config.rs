//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.corpus-stats.toml` files.

use crate::cli::OutputFormat;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".corpus-stats.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Scanner settings.
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,

    /// Annotation server settings.
    #[serde(default)]
    pub annotation: AnnotationConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Number of extraction worker threads.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            verbose: false,
        }
    }
}

fn default_concurrency() -> usize {
    4
}

/// Recipe directory scanner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// File extensions treated as recipe records.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Directory or file names to skip.
    #[serde(default = "default_excludes")]
    pub excludes: Vec<String>,

    /// Descend into subdirectories.
    #[serde(default)]
    pub recursive: bool,

    /// Maximum number of files to analyze.
    #[serde(default)]
    pub max_files: Option<usize>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            excludes: default_excludes(),
            recursive: false,
            max_files: None,
        }
    }
}

fn default_extensions() -> Vec<String> {
    vec!["json".to_string()]
}

fn default_excludes() -> Vec<String> {
    vec!["__pycache__", ".ipynb_checkpoints"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Report settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Output format.
    #[serde(default)]
    pub format: OutputFormat,

    /// List rejected records in the report.
    #[serde(default = "default_true")]
    pub show_rejected: bool,

    /// Maximum number of rejected records listed.
    #[serde(default = "default_max_rejected_listed")]
    pub max_rejected_listed: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            show_rejected: true,
            max_rejected_listed: default_max_rejected_listed(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_rejected_listed() -> usize {
    20
}

/// NLP annotation server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationConfig {
    /// CoreNLP server URL.
    #[serde(default = "default_annotation_url")]
    pub url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_annotation_timeout")]
    pub timeout_seconds: u64,

    /// Utterances to annotate; 0 disables the probe.
    #[serde(default)]
    pub sample_size: usize,

    /// Concurrent in-flight annotation requests.
    #[serde(default = "default_annotation_concurrency")]
    pub concurrency: usize,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            url: default_annotation_url(),
            timeout_seconds: default_annotation_timeout(),
            sample_size: 0,
            concurrency: default_annotation_concurrency(),
        }
    }
}

fn default_annotation_url() -> String {
    "http://localhost:9000".to_string()
}

fn default_annotation_timeout() -> u64 {
    30
}

fn default_annotation_concurrency() -> usize {
    2
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(concurrency) = args.concurrency {
            self.general.concurrency = concurrency;
        }
        if args.verbose {
            self.general.verbose = true;
        }

        if args.recursive {
            self.scanner.recursive = true;
        }
        if args.max_files.is_some() {
            self.scanner.max_files = args.max_files;
        }

        if let Some(format) = args.format {
            self.report.format = format;
        }

        if let Some(ref url) = args.corenlp_url {
            self.annotation.url = url.clone();
        }
        if let Some(timeout) = args.annotation_timeout {
            self.annotation.timeout_seconds = timeout;
        }
        if let Some(sample) = args.annotate_sample {
            self.annotation.sample_size = sample;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
