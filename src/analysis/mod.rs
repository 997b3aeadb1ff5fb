//! Statistics pipeline.
//!
//! Records are extracted on a rayon pool and folded into per-worker
//! [`CorpusAccumulator`]s, which are then merged and finished on the calling
//! thread.

pub mod aggregator;
pub mod extractor;

pub use aggregator::CorpusAccumulator;
pub use extractor::extract;

use crate::models::{CorpusStats, PerRecordStats, Record, Rejection};
use crate::scanner::ScannedFile;
use crate::source::{parse_recipe, NarrationCorpus};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// Options for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Extraction worker threads.
    pub concurrency: usize,
    /// Draw a progress bar on stderr.
    pub show_progress: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            show_progress: false,
        }
    }
}

/// Statistics plus the records that were left out.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub stats: CorpusStats,
    /// Sorted by source.
    pub rejected: Vec<Rejection>,
}

/// Result of analyzing one unit.
enum Outcome {
    Accepted(PerRecordStats),
    Rejected(Rejection),
}

impl Outcome {
    fn fold_into(self, mut acc: CorpusAccumulator) -> CorpusAccumulator {
        match self {
            Outcome::Accepted(stats) => acc.push(stats),
            Outcome::Rejected(rejection) => acc.reject(rejection),
        }
        acc
    }
}

fn progress_bar(len: usize, show: bool) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

fn thread_pool(concurrency: usize) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(concurrency.max(1))
        .thread_name(|i| format!("extract-{}", i))
        .build()
        .context("Failed to build extraction thread pool")
}

/// Read, parse and extract one recipe file.
///
/// Unreadable files are fatal; malformed ones become rejections.
fn analyze_recipe_file(file: &ScannedFile) -> Result<Outcome> {
    debug!("Reading {} ({} bytes)", file.path, file.size);
    let bytes = std::fs::read(&file.full_path)
        .with_context(|| format!("Failed to read {}", file.full_path.display()))?;

    match parse_recipe(&bytes, &file.stem()) {
        Ok(record) => {
            let stats = extract(&record);
            debug!(
                "{}: {} utterances, {} tokens",
                stats.id, stats.utterance_count, stats.token_count
            );
            Ok(Outcome::Accepted(stats))
        }
        Err(e) => {
            warn!("Rejecting {}: {}", file.path, e);
            Ok(Outcome::Rejected(Rejection {
                source: file.path.clone(),
                reason: e.to_string(),
            }))
        }
    }
}

/// Compute statistics over scanned recipe files.
pub fn analyze_recipe_files(
    files: &[ScannedFile],
    options: &PipelineOptions,
) -> Result<PipelineOutput> {
    info!(
        "Extracting {} recipe files with {} workers",
        files.len(),
        options.concurrency
    );
    let pool = thread_pool(options.concurrency)?;
    let pb = progress_bar(files.len(), options.show_progress);

    let acc = pool.install(|| {
        files
            .par_iter()
            .map(|file| {
                let outcome = analyze_recipe_file(file);
                pb.inc(1);
                outcome
            })
            .try_fold(CorpusAccumulator::default, |acc, outcome| {
                outcome.map(|o| o.fold_into(acc))
            })
            .try_reduce(CorpusAccumulator::default, |a, b| Ok(a.merge(b)))
    })?;

    pb.finish_and_clear();
    Ok(finish(acc))
}

/// Compute statistics over records grouped from a narration file.
pub fn analyze_narrations(
    corpus: NarrationCorpus,
    options: &PipelineOptions,
) -> Result<PipelineOutput> {
    info!(
        "Extracting {} videos ({} rows) with {} workers",
        corpus.records.len(),
        corpus.rows,
        options.concurrency
    );
    let mut output = analyze_records(&corpus.records, options)?;

    if !corpus.rejected.is_empty() {
        output.stats.rejected_count += corpus.rejected.len();
        output.rejected.extend(corpus.rejected);
        output.rejected.sort();
    }
    Ok(output)
}

/// Compute statistics over already-parsed records.
pub fn analyze_records(records: &[Record], options: &PipelineOptions) -> Result<PipelineOutput> {
    let pool = thread_pool(options.concurrency)?;
    let pb = progress_bar(records.len(), options.show_progress);

    let acc = pool.install(|| {
        records
            .par_iter()
            .map(|record| {
                let stats = extract(record);
                pb.inc(1);
                stats
            })
            .fold(CorpusAccumulator::default, |mut acc, stats| {
                acc.push(stats);
                acc
            })
            .reduce(CorpusAccumulator::default, CorpusAccumulator::merge)
    });

    pb.finish_and_clear();
    Ok(finish(acc))
}

fn finish(acc: CorpusAccumulator) -> PipelineOutput {
    debug!("Reducing {} accepted records", acc.accepted());
    let (stats, rejected) = acc.finish();
    PipelineOutput { stats, rejected }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{FileScanner, ScanConfig};
    use crate::source::narration::group_narrations;
    use std::fs;
    use tempfile::TempDir;

    fn write_corpus() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("r1.json"),
            r#"{"split": "train", "text": {"0": ["mix","flour"], "1": ["add","water"]}, "ingredients": {"0": [0]}}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("r2.json"),
            r#"{"split": "dev", "text": {"0": ["bake"]}, "ingredients": {}}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("r3.json"),
            r#"{"text": {"0": ["fry", "onion"], "1": ["add", "onion"]}, "ingredients": {"0": [1], "1": [1, 2]}}"#,
        )
        .unwrap();
        fs::write(dir.path().join("broken.json"), "{\"text\": [").unwrap();
        fs::write(dir.path().join("partial.json"), r#"{"text": {"0": ["x"]}}"#).unwrap();
        dir
    }

    fn scan(dir: &TempDir) -> Vec<ScannedFile> {
        FileScanner::new(dir.path().to_path_buf(), ScanConfig::default())
            .scan()
            .unwrap()
    }

    #[test]
    fn test_recipe_pipeline_counts_rejections() {
        let dir = write_corpus();
        let output = analyze_recipe_files(&scan(&dir), &PipelineOptions::default()).unwrap();

        assert_eq!(output.stats.file_count, 3);
        assert_eq!(output.stats.rejected_count, 2);
        assert_eq!(output.rejected[0].source, "broken.json");
        assert!(output.rejected[0].reason.starts_with("parse error"));
        assert_eq!(output.rejected[1].source, "partial.json");
        assert_eq!(
            output.rejected[1].reason,
            "missing required field `ingredients`"
        );

        // tokens 4 + 1 + 4, utterances 2 + 1 + 2
        assert_eq!(output.stats.mean_tokens_per_file, 3.0);
        assert_eq!(output.stats.mean_utterances_per_file, 5.0 / 3.0);
        // unique 1 + 0 + 2, mentions 1 + 0 + 3
        assert_eq!(output.stats.mean_unique_entities_per_file, 1.0);
        assert_eq!(output.stats.mean_total_entity_mentions_per_file, 4.0 / 3.0);
        // chains 1.0 and 1.5, the entity-less recipe is skipped
        assert_eq!(output.stats.mean_entity_chain_length_per_file, 1.25);
        assert_eq!(output.stats.files_by_split.get("train"), Some(&1));
    }

    #[test]
    fn test_recipe_pipeline_is_idempotent_and_thread_count_independent() {
        let dir = write_corpus();
        let files = scan(&dir);

        let first = analyze_recipe_files(&files, &PipelineOptions::default()).unwrap();
        let second = analyze_recipe_files(&files, &PipelineOptions::default()).unwrap();
        let parallel = analyze_recipe_files(
            &files,
            &PipelineOptions {
                concurrency: 4,
                show_progress: false,
            },
        )
        .unwrap();

        assert_eq!(first.stats, second.stats);
        assert_eq!(first.stats, parallel.stats);
        assert_eq!(first.rejected, parallel.rejected);
    }

    #[test]
    fn test_empty_directory() {
        let dir = TempDir::new().unwrap();
        let output = analyze_recipe_files(&scan(&dir), &PipelineOptions::default()).unwrap();

        assert_eq!(output.stats.file_count, 0);
        assert!(output.stats.mean_tokens_per_file.is_nan());
        assert!(output.rejected.is_empty());
    }

    #[test]
    fn test_unreadable_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        let files = vec![ScannedFile {
            path: "gone.json".to_string(),
            full_path: dir.path().join("gone.json"),
            size: 0,
        }];
        assert!(analyze_recipe_files(&files, &PipelineOptions::default()).is_err());
    }

    #[test]
    fn test_narration_pipeline() {
        let csv = "\
video_id,narration,verb,noun
P01_01,open door,open,door
P01_01,take cup,take,cup
P01_01,close door,close,door
P02_01,wash cup,wash,cup
P03_01,,look,
";
        let corpus = group_narrations(csv.as_bytes()).unwrap();
        let output = analyze_narrations(corpus, &PipelineOptions::default()).unwrap();

        assert_eq!(output.stats.file_count, 2);
        assert_eq!(output.stats.rejected_count, 1);
        assert_eq!(output.rejected[0].source, "video P03_01");
        // tokens 6 + 2 over 2 videos, utterances 3 + 1
        assert_eq!(output.stats.mean_tokens_per_file, 4.0);
        assert_eq!(output.stats.mean_utterances_per_file, 2.0);
        assert_eq!(output.stats.mean_tokens_per_utterance, 2.0);
        // P01_01: door x2, cup x1; P02_01: cup x1
        assert_eq!(output.stats.mean_unique_entities_per_file, 1.5);
        assert_eq!(output.stats.mean_entity_chain_length_per_file, 1.25);
        assert_eq!(output.stats.pooled_entity_chain_length, 4.0 / 3.0);
        assert_eq!(output.stats.unique_verbs, 4);
        assert_eq!(output.stats.unique_nouns, 2);
    }
}
