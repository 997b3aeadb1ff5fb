//! Narration CSV records.
//!
//! One row is one narrated action. Rows are grouped by `video_id` into a
//! [`Record`] whose steps are the rows in file order; the row's `noun` is the
//! step's single entity reference.

use crate::error::RecordError;
use crate::models::{EntityRef, Record, Rejection};
use anyhow::{Context, Result};
use csv::StringRecord;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

const VIDEO_ID: &str = "video_id";
const NARRATION: &str = "narration";
const NOUN: &str = "noun";
const VERB: &str = "verb";

/// Records grouped from a narration file plus the rejected ones.
#[derive(Debug, Default)]
pub struct NarrationCorpus {
    /// One record per valid video, ordered by video id.
    pub records: Vec<Record>,
    /// Videos (or orphan rows) that could not be used.
    pub rejected: Vec<Rejection>,
    /// Data rows read, excluding the header.
    pub rows: usize,
}

/// Column positions resolved from the header.
struct Columns {
    video_id: usize,
    narration: usize,
    noun: usize,
    verb: Option<usize>,
}

impl Columns {
    fn resolve(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        let require = |name: &str| {
            find(name).with_context(|| format!("Narration file lacks required column `{}`", name))
        };

        Ok(Self {
            video_id: require(VIDEO_ID)?,
            narration: require(NARRATION)?,
            noun: require(NOUN)?,
            verb: find(VERB),
        })
    }
}

/// Rows of one video, or the first error that poisoned it.
#[derive(Default)]
struct VideoGroup {
    record: Record,
    error: Option<RecordError>,
}

fn value<'r>(row: &'r StringRecord, idx: usize, name: &str) -> Result<&'r str, RecordError> {
    row.get(idx)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| RecordError::missing(name))
}

/// Load and group a narration CSV file.
pub fn load_narrations(path: &Path) -> Result<NarrationCorpus> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open narration file: {}", path.display()))?;
    group_narrations(file)
        .with_context(|| format!("Failed to read narration file: {}", path.display()))
}

/// Group narration rows read from `reader` by video.
///
/// A missing header column or an IO failure is fatal. A row with an empty
/// required value or the wrong number of fields rejects its whole video; a
/// row whose `video_id` cannot be read is rejected on its own.
pub fn group_narrations<R: Read>(reader: R) -> Result<NarrationCorpus> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let headers = csv_reader.headers().context("Failed to read CSV header")?.clone();
    let columns = Columns::resolve(&headers)?;

    let mut groups: BTreeMap<String, VideoGroup> = BTreeMap::new();
    let mut corpus = NarrationCorpus::default();

    for (idx, row) in csv_reader.records().enumerate() {
        // Header is line 1
        let line = idx + 2;
        corpus.rows += 1;

        let row = match row {
            Ok(row) => row,
            Err(e) if e.is_io_error() => return Err(e).context("Failed to read CSV row"),
            Err(e) => {
                warn!("Rejecting malformed row at line {}: {}", line, e);
                corpus.rejected.push(Rejection {
                    source: format!("row {}", line),
                    reason: RecordError::from(e).to_string(),
                });
                continue;
            }
        };

        let video_id = match value(&row, columns.video_id, VIDEO_ID) {
            Ok(id) => id.to_string(),
            Err(e) => {
                corpus.rejected.push(Rejection {
                    source: format!("row {}", line),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let group = groups.entry(video_id.clone()).or_insert_with(|| VideoGroup {
            record: Record {
                id: video_id,
                ..Record::default()
            },
            error: None,
        });
        if group.error.is_some() {
            continue;
        }

        if row.len() != headers.len() {
            let e = RecordError::Parse(format!(
                "line {} has {} fields, expected {}",
                line,
                row.len(),
                headers.len()
            ));
            warn!("Video {} poisoned by malformed row: {}", group.record.id, e);
            group.error = Some(e);
            continue;
        }

        let fields = value(&row, columns.narration, NARRATION)
            .and_then(|narration| Ok((narration, value(&row, columns.noun, NOUN)?)));
        let (narration, noun) = match fields {
            Ok(fields) => fields,
            Err(e) => {
                debug!("Video {} poisoned at line {}: {}", group.record.id, line, e);
                group.error = Some(e);
                continue;
            }
        };

        let record = &mut group.record;
        let step = record.step_texts.len().to_string();
        record.step_texts.push((
            step.clone(),
            narration.split_whitespace().map(String::from).collect(),
        ));
        record
            .step_entities
            .insert(step, vec![EntityRef::Noun(noun.to_string())]);
        record.nouns.push(noun.to_string());
        if let Some(verb) = columns.verb.and_then(|idx| row.get(idx)) {
            let verb = verb.trim();
            if !verb.is_empty() {
                record.verbs.push(verb.to_string());
            }
        }
    }

    for (video_id, group) in groups {
        match group.error {
            None => corpus.records.push(group.record),
            Some(e) => corpus.rejected.push(Rejection {
                source: format!("video {}", video_id),
                reason: e.to_string(),
            }),
        }
    }

    debug!(
        "Grouped {} rows into {} videos ({} rejected)",
        corpus.rows,
        corpus.records.len(),
        corpus.rejected.len()
    );
    Ok(corpus)
}
