//! Data models for the corpus statistics pipeline.
//!
//! This module contains the core data structures shared by the source
//! adapters, the extractor, the reducer and the report renderers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// Which dataset a run analyzed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorpusKind {
    /// Directory of per-recipe JSON files
    Recipes,
    /// CSV of video-narration action labels
    Narration,
}

impl fmt::Display for CorpusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorpusKind::Recipes => write!(f, "recipes"),
            CorpusKind::Narration => write!(f, "narration"),
        }
    }
}

impl CorpusKind {
    /// Noun used for one record in report labels.
    pub fn unit(&self) -> &'static str {
        match self {
            CorpusKind::Recipes => "recipe files",
            CorpusKind::Narration => "video files",
        }
    }
}

/// A reference to a real-world object mentioned in a step.
///
/// Recipe files reference ingredients by their index in `ingredient_list`;
/// narration rows carry the noun itself.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityRef {
    Index(u64),
    Noun(String),
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Index(i) => write!(f, "#{}", i),
            EntityRef::Noun(noun) => write!(f, "{}", noun),
        }
    }
}

/// One analyzable unit: a recipe file or the narration rows of one video.
///
/// Records are transient. They are built by a source adapter, handed to the
/// extractor and dropped once their [`PerRecordStats`] exist.
#[derive(Debug, Clone, Default)]
pub struct Record {
    /// Recipe id (or file stem) / video id.
    pub id: String,
    /// Dataset split the record belongs to, when the source carries one.
    pub split: Option<String>,
    /// Steps in index order, each with its token sequence.
    pub step_texts: Vec<(String, Vec<String>)>,
    /// Entity references per step. Steps without entities have no key.
    pub step_entities: BTreeMap<String, Vec<EntityRef>>,
    /// Verbs observed in the record.
    pub verbs: Vec<String>,
    /// Nouns observed in the record.
    pub nouns: Vec<String>,
}

/// Distinct verbs and nouns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    pub verbs: BTreeSet<String>,
    pub nouns: BTreeSet<String>,
}

impl Vocabulary {
    /// Union `other` into `self`.
    pub fn absorb(&mut self, other: Vocabulary) {
        self.verbs.extend(other.verbs);
        self.nouns.extend(other.nouns);
    }
}

/// Scalar features derived from a single record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerRecordStats {
    /// Key of the record the features were derived from.
    pub id: String,
    /// Dataset split, if known.
    pub split: Option<String>,
    /// Number of steps in the record's text.
    pub utterance_count: usize,
    /// Sum of the token-list lengths of every step.
    pub token_count: usize,
    /// Character length of every step's tokens joined by single spaces.
    pub char_count: usize,
    /// Occurrences of each distinct entity reference.
    pub entity_frequency: HashMap<EntityRef, usize>,
    /// Verbs and nouns seen in the record.
    pub vocabulary: Vocabulary,
}

impl PerRecordStats {
    /// Number of distinct entities mentioned.
    pub fn unique_entities(&self) -> usize {
        self.entity_frequency.len()
    }

    /// Total number of entity mentions.
    pub fn total_mentions(&self) -> usize {
        self.entity_frequency.values().sum()
    }

    /// Mean occurrence count per entity, or `None` for records without entities.
    pub fn chain_length(&self) -> Option<f64> {
        if self.entity_frequency.is_empty() {
            None
        } else {
            Some(self.total_mentions() as f64 / self.unique_entities() as f64)
        }
    }
}

/// A record excluded from the statistics.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Rejection {
    /// File path or video id identifying the record.
    pub source: String,
    /// Why the record was rejected.
    pub reason: String,
}

/// Corpus-level summary statistics.
///
/// Means over an empty population are `NaN`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusStats {
    /// Number of accepted records.
    pub file_count: usize,
    /// Number of rejected records.
    pub rejected_count: usize,
    pub mean_tokens_per_file: f64,
    pub mean_characters_per_file: f64,
    pub mean_utterances_per_file: f64,
    /// Total tokens divided by total utterances.
    pub mean_tokens_per_utterance: f64,
    pub mean_unique_entities_per_file: f64,
    pub mean_total_entity_mentions_per_file: f64,
    /// Mean of per-record chain lengths, over records with at least one entity.
    pub mean_entity_chain_length_per_file: f64,
    /// Total mentions divided by total (record, entity) pairs.
    pub pooled_entity_chain_length: f64,
    /// Distinct verbs across the corpus.
    pub unique_verbs: usize,
    /// Distinct nouns across the corpus.
    pub unique_nouns: usize,
    /// Accepted records per dataset split.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub files_by_split: BTreeMap<String, usize>,
}

/// Results of the optional annotation-server probe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationSummary {
    /// Server the sample was sent to.
    pub server_url: String,
    pub sentences_requested: usize,
    pub sentences_annotated: usize,
    pub tokens: usize,
    /// Tokens tagged as nouns (`NN*`).
    pub nouns: usize,
    /// Tokens with a named-entity tag other than `O`.
    pub named_entities: usize,
    /// Noun phrases in the constituency parses.
    pub noun_phrases: usize,
    pub dependency_arcs: usize,
    /// First failure message, if any request failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_error: Option<String>,
}

impl AnnotationSummary {
    /// Number of sentences whose annotation failed.
    pub fn failures(&self) -> usize {
        self.sentences_requested - self.sentences_annotated
    }
}

/// Metadata about the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub corpus_kind: CorpusKind,
    /// Input path as given on the command line.
    pub input_path: String,
    pub analysis_date: DateTime<Utc>,
    /// Extraction worker threads.
    pub concurrency: usize,
    pub duration_seconds: f64,
}

/// The complete statistics report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub stats: CorpusStats,
    /// Rejected records, sorted by source.
    pub rejected: Vec<Rejection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<AnnotationSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_ref_deserializes_index_and_noun() {
        let refs: Vec<EntityRef> = serde_json::from_str(r#"[3, "onion"]"#).unwrap();
        assert_eq!(
            refs,
            vec![EntityRef::Index(3), EntityRef::Noun("onion".to_string())]
        );
    }

    #[test]
    fn test_entity_ref_display() {
        assert_eq!(EntityRef::Index(7).to_string(), "#7");
        assert_eq!(EntityRef::Noun("pan".to_string()).to_string(), "pan");
    }

    #[test]
    fn test_chain_length() {
        let mut stats = PerRecordStats::default();
        assert_eq!(stats.chain_length(), None);

        stats.entity_frequency.insert(EntityRef::Index(0), 3);
        stats.entity_frequency.insert(EntityRef::Index(1), 1);
        assert_eq!(stats.unique_entities(), 2);
        assert_eq!(stats.total_mentions(), 4);
        assert_eq!(stats.chain_length(), Some(2.0));
    }

    #[test]
    fn test_vocabulary_absorb() {
        let mut a = Vocabulary::default();
        a.verbs.insert("cut".to_string());
        let mut b = Vocabulary::default();
        b.verbs.insert("cut".to_string());
        b.nouns.insert("knife".to_string());

        a.absorb(b);
        assert_eq!(a.verbs.len(), 1);
        assert_eq!(a.nouns.len(), 1);
    }

    #[test]
    fn test_corpus_kind_display() {
        assert_eq!(CorpusKind::Recipes.to_string(), "recipes");
        assert_eq!(CorpusKind::Narration.unit(), "video files");
    }
}
