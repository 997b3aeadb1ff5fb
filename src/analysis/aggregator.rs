//! Corpus reduction.
//!
//! Per-record results are folded into a [`CorpusAccumulator`]; partial
//! accumulators from different workers are combined with
//! [`CorpusAccumulator::merge`], and [`CorpusAccumulator::finish`] performs
//! the final divisions. Every field of the result is independent of the order
//! in which records were pushed or accumulators merged: counts are integers,
//! vocabularies are set unions, and the per-record chain lengths are summed in
//! sorted order.

use crate::models::{CorpusStats, PerRecordStats, Rejection, Vocabulary};
use std::collections::BTreeMap;

/// Running sums over accepted records, plus the rejections seen so far.
#[derive(Debug, Clone, Default)]
pub struct CorpusAccumulator {
    files: usize,
    tokens: u64,
    chars: u64,
    utterances: u64,
    unique_entities: u64,
    mentions: u64,
    /// One entry per record with at least one entity.
    chain_lengths: Vec<f64>,
    vocabulary: Vocabulary,
    splits: BTreeMap<String, usize>,
    rejected: Vec<Rejection>,
}

fn mean(total: f64, count: usize) -> f64 {
    if count == 0 {
        f64::NAN
    } else {
        total / count as f64
    }
}

impl CorpusAccumulator {
    /// Fold one accepted record in.
    pub fn push(&mut self, stats: PerRecordStats) {
        self.files += 1;
        self.tokens += stats.token_count as u64;
        self.chars += stats.char_count as u64;
        self.utterances += stats.utterance_count as u64;
        self.unique_entities += stats.unique_entities() as u64;
        self.mentions += stats.total_mentions() as u64;

        if let Some(chain) = stats.chain_length() {
            self.chain_lengths.push(chain);
        }
        if let Some(split) = stats.split {
            *self.splits.entry(split).or_insert(0) += 1;
        }
        self.vocabulary.absorb(stats.vocabulary);
    }

    /// Record a rejected record.
    pub fn reject(&mut self, rejection: Rejection) {
        self.rejected.push(rejection);
    }

    /// Combine two partial accumulators.
    pub fn merge(mut self, other: CorpusAccumulator) -> CorpusAccumulator {
        self.files += other.files;
        self.tokens += other.tokens;
        self.chars += other.chars;
        self.utterances += other.utterances;
        self.unique_entities += other.unique_entities;
        self.mentions += other.mentions;
        self.chain_lengths.extend(other.chain_lengths);
        self.vocabulary.absorb(other.vocabulary);
        for (split, count) in other.splits {
            *self.splits.entry(split).or_insert(0) += count;
        }
        self.rejected.extend(other.rejected);
        self
    }

    /// Number of records accepted so far.
    pub fn accepted(&self) -> usize {
        self.files
    }

    /// Compute the corpus statistics. Rejections are returned sorted by source.
    pub fn finish(mut self) -> (CorpusStats, Vec<Rejection>) {
        self.chain_lengths.sort_by(f64::total_cmp);
        let chain_sum: f64 = self.chain_lengths.iter().sum();
        self.rejected.sort();

        let stats = CorpusStats {
            file_count: self.files,
            rejected_count: self.rejected.len(),
            mean_tokens_per_file: mean(self.tokens as f64, self.files),
            mean_characters_per_file: mean(self.chars as f64, self.files),
            mean_utterances_per_file: mean(self.utterances as f64, self.files),
            mean_tokens_per_utterance: mean(self.tokens as f64, self.utterances as usize),
            mean_unique_entities_per_file: mean(self.unique_entities as f64, self.files),
            mean_total_entity_mentions_per_file: mean(self.mentions as f64, self.files),
            mean_entity_chain_length_per_file: mean(chain_sum, self.chain_lengths.len()),
            pooled_entity_chain_length: mean(self.mentions as f64, self.unique_entities as usize),
            unique_verbs: self.vocabulary.verbs.len(),
            unique_nouns: self.vocabulary.nouns.len(),
            files_by_split: self.splits,
        };

        (stats, self.rejected)
    }
}
