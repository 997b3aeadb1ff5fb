//! Report generation.
//!
//! Renders a [`Report`] as labeled text lines, Markdown tables or JSON.

use crate::cli::OutputFormat;
use crate::models::{AnnotationSummary, CorpusStats, Rejection, Report, ReportMetadata};
use anyhow::Result;

/// How rejected records are listed.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub show_rejected: bool,
    pub max_rejected_listed: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            show_rejected: true,
            max_rejected_listed: 20,
        }
    }
}

impl From<&crate::config::ReportConfig> for RenderOptions {
    fn from(config: &crate::config::ReportConfig) -> Self {
        Self {
            show_rejected: config.show_rejected,
            max_rejected_listed: config.max_rejected_listed,
        }
    }
}

/// Render the report in the requested format.
pub fn render(report: &Report, format: OutputFormat, options: RenderOptions) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(generate_text_report(report, options)),
        OutputFormat::Markdown => Ok(generate_markdown_report(report, options)),
        OutputFormat::Json => generate_json_report(report),
    }
}

/// Format a mean; undefined means print as `NaN`.
fn fmt_mean(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else {
        format!("{:.4}", value)
    }
}

/// Labeled statistic lines shared by the text and Markdown renderers.
fn stat_rows(report: &Report) -> Vec<(String, String)> {
    let stats = &report.stats;
    let unit = report.metadata.corpus_kind.unit();

    vec![
        (format!("Number of {}", unit), stats.file_count.to_string()),
        ("Rejected records".to_string(), stats.rejected_count.to_string()),
        (
            "Mean number of tokens per file".to_string(),
            fmt_mean(stats.mean_tokens_per_file),
        ),
        (
            "Mean number of characters per file".to_string(),
            fmt_mean(stats.mean_characters_per_file),
        ),
        (
            "Mean number of utts per file".to_string(),
            fmt_mean(stats.mean_utterances_per_file),
        ),
        (
            "Mean number of tokens per utt".to_string(),
            fmt_mean(stats.mean_tokens_per_utterance),
        ),
        (
            "Mean number of unique entities per file".to_string(),
            fmt_mean(stats.mean_unique_entities_per_file),
        ),
        (
            "Mean count of all entities per file".to_string(),
            fmt_mean(stats.mean_total_entity_mentions_per_file),
        ),
        (
            "Mean length coref chain per file".to_string(),
            fmt_mean(stats.mean_entity_chain_length_per_file),
        ),
        (
            "Pooled length coref chain".to_string(),
            fmt_mean(stats.pooled_entity_chain_length),
        ),
        ("Number of total verbs".to_string(), stats.unique_verbs.to_string()),
        ("Number of total nouns".to_string(), stats.unique_nouns.to_string()),
    ]
}

fn status_line(stats: &CorpusStats) -> String {
    if stats.rejected_count == 0 {
        "Corpus fully processed".to_string()
    } else {
        format!(
            "Corpus partially processed, {} records rejected",
            stats.rejected_count
        )
    }
}

fn annotation_rows(summary: &AnnotationSummary) -> Vec<(String, String)> {
    let mut rows = vec![
        ("Annotation server".to_string(), summary.server_url.clone()),
        (
            "Sentences annotated".to_string(),
            format!(
                "{} of {}",
                summary.sentences_annotated, summary.sentences_requested
            ),
        ),
        ("Server tokens".to_string(), summary.tokens.to_string()),
        ("Noun tokens".to_string(), summary.nouns.to_string()),
        (
            "Named entity tokens".to_string(),
            summary.named_entities.to_string(),
        ),
        ("Noun phrases".to_string(), summary.noun_phrases.to_string()),
        (
            "Dependency arcs".to_string(),
            summary.dependency_arcs.to_string(),
        ),
    ];
    if let Some(ref err) = summary.first_error {
        rows.push(("First annotation error".to_string(), err.clone()));
    }
    rows
}

/// Rejections to list, and how many were left out.
fn listed_rejections(rejected: &[Rejection], options: RenderOptions) -> (&[Rejection], usize) {
    if !options.show_rejected {
        return (&[], 0);
    }
    let shown = rejected.len().min(options.max_rejected_listed);
    (&rejected[..shown], rejected.len() - shown)
}

fn generate_header(metadata: &ReportMetadata) -> Vec<String> {
    vec![
        format!("Corpus: {} ({})", metadata.corpus_kind, metadata.input_path),
        format!(
            "Analysis date: {}",
            metadata.analysis_date.format("%Y-%m-%d-%H:%M:%S")
        ),
        format!("Workers: {}", metadata.concurrency),
        format!("Duration: {:.1}s", metadata.duration_seconds),
    ]
}

/// Generate the plain-text report: one labeled statistic per line.
pub fn generate_text_report(report: &Report, options: RenderOptions) -> String {
    let mut lines = generate_header(&report.metadata);
    lines.push(String::new());

    for (label, value) in stat_rows(report) {
        lines.push(format!("{}: {}", label, value));
    }
    for (split, count) in &report.stats.files_by_split {
        lines.push(format!("Files in split {}: {}", split, count));
    }

    lines.push(String::new());
    lines.push(status_line(&report.stats));

    let (listed, hidden) = listed_rejections(&report.rejected, options);
    for rejection in listed {
        lines.push(format!("  - {}: {}", rejection.source, rejection.reason));
    }
    if hidden > 0 {
        lines.push(format!("  ... and {} more", hidden));
    }

    if let Some(ref summary) = report.annotation {
        lines.push(String::new());
        for (label, value) in annotation_rows(summary) {
            lines.push(format!("{}: {}", label, value));
        }
    }

    lines.push(String::new());
    lines.join("\n")
}

/// Generate a Markdown report.
pub fn generate_markdown_report(report: &Report, options: RenderOptions) -> String {
    let mut output = String::new();

    output.push_str("# Corpus Statistics Report\n\n");
    for line in generate_header(&report.metadata) {
        output.push_str(&format!("- {}\n", line));
    }
    output.push('\n');

    output.push_str("## Statistics\n\n");
    output.push_str("| Statistic | Value |\n");
    output.push_str("|:---|---:|\n");
    for (label, value) in stat_rows(report) {
        output.push_str(&format!("| {} | {} |\n", label, value));
    }
    output.push('\n');

    if !report.stats.files_by_split.is_empty() {
        output.push_str("### Files by Split\n\n");
        output.push_str("| Split | Files |\n");
        output.push_str("|:---|---:|\n");
        for (split, count) in &report.stats.files_by_split {
            output.push_str(&format!("| {} | {} |\n", split, count));
        }
        output.push('\n');
    }

    output.push_str("## Rejected Records\n\n");
    output.push_str(&format!("{}.\n\n", status_line(&report.stats)));
    let (listed, hidden) = listed_rejections(&report.rejected, options);
    if !listed.is_empty() {
        output.push_str("| Source | Reason |\n");
        output.push_str("|:---|:---|\n");
        for rejection in listed {
            output.push_str(&format!(
                "| `{}` | {} |\n",
                rejection.source,
                rejection.reason.replace('|', "\\|")
            ));
        }
        if hidden > 0 {
            output.push_str(&format!("\n*... and {} more*\n", hidden));
        }
        output.push('\n');
    }

    if let Some(ref summary) = report.annotation {
        output.push_str("## Annotation Sample\n\n");
        output.push_str("| Metric | Value |\n");
        output.push_str("|:---|---:|\n");
        for (label, value) in annotation_rows(summary) {
            output.push_str(&format!("| {} | {} |\n", label, value));
        }
        output.push('\n');
    }

    output
}

/// Generate a JSON report. Undefined means serialize as `null`.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
