//! File scanner for discovering recipe records.
//!
//! Enumerates files below an explicit root with path joins only; the process
//! working directory is never touched. Results are sorted so repeated runs see
//! the same files in the same order.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Configuration for file scanning.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// File extensions to include (e.g., ["json"])
    pub extensions: Vec<String>,
    /// Names to exclude (e.g., ["__pycache__"])
    pub excludes: Vec<String>,
    /// Descend into subdirectories
    pub recursive: bool,
    /// Maximum number of files to return
    pub max_files: Option<usize>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["json".to_string()],
            excludes: Vec::new(),
            recursive: false,
            max_files: None,
        }
    }
}

impl From<&crate::config::ScannerConfig> for ScanConfig {
    fn from(config: &crate::config::ScannerConfig) -> Self {
        Self {
            extensions: config.extensions.clone(),
            excludes: config.excludes.clone(),
            recursive: config.recursive,
            max_files: config.max_files,
        }
    }
}

/// Scanned file information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    /// Path relative to the scan root
    pub path: String,
    /// Root joined with the relative path
    pub full_path: PathBuf,
    /// File size in bytes
    pub size: u64,
}

impl ScannedFile {
    /// File name without its extension.
    pub fn stem(&self) -> String {
        self.full_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.clone())
    }
}

/// File scanner for discovering record files.
pub struct FileScanner {
    config: ScanConfig,
    root: PathBuf,
}

impl FileScanner {
    /// Create a new file scanner.
    pub fn new(root: PathBuf, config: ScanConfig) -> Self {
        Self { config, root }
    }

    /// Scan for all matching files.
    ///
    /// A missing or unreadable root is an error; so is any directory entry
    /// that cannot be read during the walk.
    pub fn scan(&self) -> Result<Vec<ScannedFile>> {
        if !self.root.is_dir() {
            anyhow::bail!("Not a readable directory: {}", self.root.display());
        }

        let max_depth = if self.config.recursive { usize::MAX } else { 1 };
        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                // Never filter the root itself
                if entry.depth() == 0 {
                    return true;
                }
                let name = entry.file_name().to_string_lossy();
                !self.is_excluded(&name)
            });

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry
                .with_context(|| format!("Failed to read directory {}", self.root.display()))?;

            if !entry.file_type().is_file() || !self.matches(entry.path()) {
                continue;
            }

            let metadata = entry
                .metadata()
                .with_context(|| format!("Failed to stat {}", entry.path().display()))?;
            let rel_path = entry.path().strip_prefix(&self.root).unwrap_or(entry.path());

            files.push(ScannedFile {
                path: rel_path.to_string_lossy().to_string(),
                full_path: self.root.join(rel_path),
                size: metadata.len(),
            });

            if let Some(max) = self.config.max_files {
                if files.len() >= max {
                    debug!("Reached max_files limit of {}", max);
                    break;
                }
            }
        }

        debug!("Scanned {} files under {}", files.len(), self.root.display());
        Ok(files)
    }

    /// Check if a file matches the extension filter.
    pub fn matches(&self, path: &Path) -> bool {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        self.config
            .extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ext))
    }

    /// Check if a name matches exclusion patterns.
    fn is_excluded(&self, name: &str) -> bool {
        // Hidden files
        if name.starts_with('.') {
            return true;
        }

        self.config.excludes.iter().any(|pattern| name == pattern)
    }
}
