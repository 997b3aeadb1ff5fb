//! Source adapters turning raw files into [`Record`]s.

pub mod narration;
pub mod recipe;

pub use narration::{load_narrations, NarrationCorpus};
pub use recipe::parse_recipe;

use crate::models::{CorpusKind, Record};
use crate::scanner::{FileScanner, ScanConfig};
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::debug;

/// Where a run reads its records from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorpusSource {
    /// Directory of recipe JSON files.
    Recipes(PathBuf),
    /// Narration CSV file.
    Narration(PathBuf),
}

impl CorpusSource {
    pub fn kind(&self) -> CorpusKind {
        match self {
            CorpusSource::Recipes(_) => CorpusKind::Recipes,
            CorpusSource::Narration(_) => CorpusKind::Narration,
        }
    }

    pub fn path(&self) -> &PathBuf {
        match self {
            CorpusSource::Recipes(path) | CorpusSource::Narration(path) => path,
        }
    }
}

fn utterances(record: &Record) -> impl Iterator<Item = String> + '_ {
    record
        .step_texts
        .iter()
        .filter(|(_, tokens)| !tokens.is_empty())
        .map(|(_, tokens)| tokens.join(" "))
}

/// Collect up to `limit` utterances, in corpus order, for the annotation probe.
///
/// Records that fail to parse are skipped here; the statistics pass reports them.
pub fn sample_utterances(
    source: &CorpusSource,
    scan_config: &ScanConfig,
    limit: usize,
) -> Result<Vec<String>> {
    let mut sample = Vec::with_capacity(limit);
    if limit == 0 {
        return Ok(sample);
    }

    match source {
        CorpusSource::Recipes(root) => {
            let files = FileScanner::new(root.clone(), scan_config.clone()).scan()?;
            for file in files {
                let bytes = std::fs::read(&file.full_path)
                    .with_context(|| format!("Failed to read {}", file.full_path.display()))?;
                match parse_recipe(&bytes, &file.stem()) {
                    Ok(record) => sample.extend(utterances(&record)),
                    Err(e) => debug!("Skipping {} for sampling: {}", file.path, e),
                }
                if sample.len() >= limit {
                    break;
                }
            }
        }
        CorpusSource::Narration(path) => {
            let corpus = load_narrations(path)?;
            for record in &corpus.records {
                sample.extend(utterances(record));
                if sample.len() >= limit {
                    break;
                }
            }
        }
    }

    sample.truncate(limit);
    Ok(sample)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_sample_recipe_utterances() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("a.json"),
            r#"{"text": {"0": ["mix","flour"], "1": ["add","water"]}, "ingredients": {}}"#,
        )
        .unwrap();
        fs::write(dir.path().join("b.json"), "not json").unwrap();
        fs::write(
            dir.path().join("c.json"),
            r#"{"text": {"0": ["bake"]}, "ingredients": {}}"#,
        )
        .unwrap();

        let source = CorpusSource::Recipes(dir.path().to_path_buf());
        let sample = sample_utterances(&source, &ScanConfig::default(), 10).unwrap();
        assert_eq!(sample, vec!["mix flour", "add water", "bake"]);

        let sample = sample_utterances(&source, &ScanConfig::default(), 1).unwrap();
        assert_eq!(sample, vec!["mix flour"]);
    }

    #[test]
    fn test_sample_narration_utterances() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("labels.csv");
        fs::write(
            &path,
            "video_id,narration,noun\nP01,open door,door\nP01,take cup,cup\n",
        )
        .unwrap();

        let source = CorpusSource::Narration(path);
        assert_eq!(source.kind(), CorpusKind::Narration);
        let sample = sample_utterances(&source, &ScanConfig::default(), 5).unwrap();
        assert_eq!(sample, vec!["open door", "take cup"]);
    }

    #[test]
    fn test_zero_limit_reads_nothing() {
        let source = CorpusSource::Recipes(PathBuf::from("/does/not/exist"));
        assert!(sample_utterances(&source, &ScanConfig::default(), 0)
            .unwrap()
            .is_empty());
    }
}
