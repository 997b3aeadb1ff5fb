//! Stanford CoreNLP server client.
//!
//! Each operation is a single `POST /?properties=...` with the sentence as the
//! request body and `outputFormat=json`. Requests time out after the
//! configured number of seconds; there is no retry.

use super::{AnnotationService, AnnotationServiceError, Dependency, TaggedToken};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Configuration for the CoreNLP client.
#[derive(Debug, Clone)]
pub struct CoreNlpConfig {
    pub url: String,
    pub timeout_seconds: u64,
}

impl From<&crate::config::AnnotationConfig> for CoreNlpConfig {
    fn from(config: &crate::config::AnnotationConfig) -> Self {
        Self {
            url: config.url.clone(),
            timeout_seconds: config.timeout_seconds,
        }
    }
}

/// CoreNLP JSON document.
#[derive(Debug, Deserialize)]
struct Document {
    #[serde(default)]
    sentences: Vec<Sentence>,
}

#[derive(Debug, Deserialize)]
struct Sentence {
    #[serde(default)]
    tokens: Vec<Token>,
    #[serde(default)]
    parse: Option<String>,
    #[serde(default, rename = "basicDependencies")]
    basic_dependencies: Vec<DependencyArc>,
}

#[derive(Debug, Deserialize)]
struct Token {
    word: String,
    #[serde(default)]
    pos: Option<String>,
    #[serde(default)]
    ner: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DependencyArc {
    dep: String,
    governor: usize,
    #[serde(rename = "governorGloss")]
    governor_gloss: String,
    dependent: usize,
    #[serde(rename = "dependentGloss")]
    dependent_gloss: String,
}

fn decode_document(body: &str) -> Result<Document, AnnotationServiceError> {
    serde_json::from_str(body).map_err(|e| AnnotationServiceError::Decode(e.to_string()))
}

fn tagged(document: &Document, tag: impl Fn(&Token) -> Option<&String>) -> Vec<TaggedToken> {
    document
        .sentences
        .iter()
        .flat_map(|s| &s.tokens)
        .map(|t| TaggedToken {
            word: t.word.clone(),
            tag: tag(t).cloned().unwrap_or_else(|| "O".to_string()),
        })
        .collect()
}

/// HTTP client for a running CoreNLP server.
pub struct CoreNlpClient {
    config: CoreNlpConfig,
    http_client: reqwest::Client,
}

impl CoreNlpClient {
    pub fn new(config: CoreNlpConfig) -> Result<Self, AnnotationServiceError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AnnotationServiceError::Request(e.to_string()))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Run `annotators` over one sentence.
    async fn annotate(
        &self,
        sentence: &str,
        annotators: &str,
    ) -> Result<Document, AnnotationServiceError> {
        let properties = serde_json::json!({
            "annotators": annotators,
            "outputFormat": "json",
            "ssplit.isOneSentence": "true",
        })
        .to_string();

        debug!("CoreNLP [{}] {:?}", annotators, sentence);

        let response = self
            .http_client
            .post(&self.config.url)
            .query(&[("properties", properties)])
            .body(sentence.to_string())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AnnotationServiceError::Timeout(self.config.timeout_seconds)
                } else if e.is_connect() {
                    AnnotationServiceError::Connection(self.config.url.clone())
                } else {
                    AnnotationServiceError::Request(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AnnotationServiceError::Status { status, body });
        }

        let body = response
            .text()
            .await
            .map_err(|e| AnnotationServiceError::Decode(e.to_string()))?;
        decode_document(&body)
    }
}

impl AnnotationService for CoreNlpClient {
    async fn tokenize(&self, sentence: &str) -> Result<Vec<String>, AnnotationServiceError> {
        let document = self.annotate(sentence, "tokenize,ssplit").await?;
        Ok(document
            .sentences
            .into_iter()
            .flat_map(|s| s.tokens)
            .map(|t| t.word)
            .collect())
    }

    async fn tag_part_of_speech(
        &self,
        sentence: &str,
    ) -> Result<Vec<TaggedToken>, AnnotationServiceError> {
        let document = self.annotate(sentence, "tokenize,ssplit,pos").await?;
        Ok(tagged(&document, |t| t.pos.as_ref()))
    }

    async fn tag_named_entities(
        &self,
        sentence: &str,
    ) -> Result<Vec<TaggedToken>, AnnotationServiceError> {
        let document = self
            .annotate(sentence, "tokenize,ssplit,pos,lemma,ner")
            .await?;
        Ok(tagged(&document, |t| t.ner.as_ref()))
    }

    async fn parse_constituency(&self, sentence: &str) -> Result<String, AnnotationServiceError> {
        let document = self.annotate(sentence, "tokenize,ssplit,pos,parse").await?;
        document
            .sentences
            .into_iter()
            .find_map(|s| s.parse)
            .ok_or_else(|| AnnotationServiceError::Decode("response has no parse tree".to_string()))
    }

    async fn parse_dependency(
        &self,
        sentence: &str,
    ) -> Result<Vec<Dependency>, AnnotationServiceError> {
        let document = self
            .annotate(sentence, "tokenize,ssplit,pos,depparse")
            .await?;
        Ok(document
            .sentences
            .into_iter()
            .flat_map(|s| s.basic_dependencies)
            .map(|arc| Dependency {
                relation: arc.dep,
                governor: arc.governor,
                governor_word: arc.governor_gloss,
                dependent: arc.dependent,
                dependent_word: arc.dependent_gloss,
            })
            .collect())
    }
}
