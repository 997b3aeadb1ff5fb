//! NLP annotation service interface.
//!
//! The statistics never depend on an annotation server. This module defines
//! the interface the optional sample probe talks to, so a CoreNLP server (or
//! a test double) can be injected.

pub mod corenlp;

pub use corenlp::{CoreNlpClient, CoreNlpConfig};

use crate::models::AnnotationSummary;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Failure talking to an annotation server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnnotationServiceError {
    #[error("annotation request timed out after {0}s")]
    Timeout(u64),
    #[error("cannot connect to annotation server at {0}")]
    Connection(String),
    #[error("annotation server error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode annotation response: {0}")]
    Decode(String),
    #[error("annotation request failed: {0}")]
    Request(String),
}

/// A token with a tag (part of speech or named-entity class).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedToken {
    pub word: String,
    pub tag: String,
}

/// One arc of a dependency parse. Token positions are 1-based; 0 is the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub relation: String,
    pub governor: usize,
    pub governor_word: String,
    pub dependent: usize,
    pub dependent_word: String,
}

/// Sentence-level annotation operations.
#[allow(async_fn_in_trait)]
pub trait AnnotationService {
    async fn tokenize(&self, sentence: &str) -> Result<Vec<String>, AnnotationServiceError>;

    async fn tag_part_of_speech(
        &self,
        sentence: &str,
    ) -> Result<Vec<TaggedToken>, AnnotationServiceError>;

    async fn tag_named_entities(
        &self,
        sentence: &str,
    ) -> Result<Vec<TaggedToken>, AnnotationServiceError>;

    /// Bracketed constituency tree, e.g. `(ROOT (S (VP (VB mix) (NP (NN flour)))))`.
    async fn parse_constituency(&self, sentence: &str) -> Result<String, AnnotationServiceError>;

    async fn parse_dependency(
        &self,
        sentence: &str,
    ) -> Result<Vec<Dependency>, AnnotationServiceError>;
}

/// Counts gathered from one sentence.
#[derive(Debug, Default)]
struct SentenceCounts {
    tokens: usize,
    nouns: usize,
    named_entities: usize,
    noun_phrases: usize,
    dependency_arcs: usize,
}

async fn annotate_sentence<S: AnnotationService>(
    service: &S,
    sentence: &str,
) -> Result<SentenceCounts, AnnotationServiceError> {
    let tokens = service.tokenize(sentence).await?;
    let pos = service.tag_part_of_speech(sentence).await?;
    let ner = service.tag_named_entities(sentence).await?;
    let tree = service.parse_constituency(sentence).await?;
    let arcs = service.parse_dependency(sentence).await?;

    Ok(SentenceCounts {
        tokens: tokens.len(),
        nouns: pos.iter().filter(|t| t.tag.starts_with("NN")).count(),
        named_entities: ner.iter().filter(|t| t.tag != "O").count(),
        noun_phrases: tree.matches("(NP ").count(),
        dependency_arcs: arcs.len(),
    })
}

/// Annotate a sample of sentences and summarize the results.
///
/// At most `concurrency` requests are in flight. Failed sentences are counted
/// but never abort the probe.
pub async fn probe<S: AnnotationService>(
    service: &S,
    server_url: &str,
    sentences: &[String],
    concurrency: usize,
) -> AnnotationSummary {
    info!(
        "Annotating {} sentences via {}",
        sentences.len(),
        server_url
    );

    let results: Vec<_> = stream::iter(sentences)
        .map(|sentence| annotate_sentence(service, sentence))
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut summary = AnnotationSummary {
        server_url: server_url.to_string(),
        sentences_requested: sentences.len(),
        ..AnnotationSummary::default()
    };

    for result in results {
        match result {
            Ok(counts) => {
                summary.sentences_annotated += 1;
                summary.tokens += counts.tokens;
                summary.nouns += counts.nouns;
                summary.named_entities += counts.named_entities;
                summary.noun_phrases += counts.noun_phrases;
                summary.dependency_arcs += counts.dependency_arcs;
            }
            Err(e) => {
                debug!("Annotation failed: {}", e);
                if summary.first_error.is_none() {
                    summary.first_error = Some(e.to_string());
                }
            }
        }
    }

    if summary.failures() > 0 {
        warn!(
            "{} of {} sentences could not be annotated",
            summary.failures(),
            summary.sentences_requested
        );
    }
    summary
}
