//! corpus-stats - descriptive statistics for annotated corpora
//!
//! Reads either a directory of recipe JSON files or a narration CSV,
//! extracts per-record features and reduces them to corpus-level means.
//!
//! Exit codes:
//!   0 - Success (or rejections without --fail-on-rejected)
//!   1 - Runtime error (unreadable input, bad config, missing columns, etc.)
//!   2 - Records were rejected and --fail-on-rejected is set

mod analysis;
mod annotation;
mod cli;
mod config;
mod error;
mod models;
mod report;
mod scanner;
mod source;

use analysis::{PipelineOptions, PipelineOutput};
use annotation::{CoreNlpClient, CoreNlpConfig};
use anyhow::{Context, Result};
use chrono::Utc;
use cli::Args;
use config::{Config, CONFIG_FILE_NAME};
use models::{AnnotationSummary, Report, ReportMetadata};
use source::CorpusSource;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Configuration decides the default verbosity, so load it first
    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(&args, &config);

    info!("corpus-stats v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    debug!("Configuration: {:?}", config);

    match run(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Analysis failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .corpus-stats.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize workers, extensions, excludes, and more.");
    Ok(())
}

/// Initialize logging. Logs go to stderr so stdout carries only the report.
fn init_logging(args: &Args, config: &Config) {
    let level = if config.general.verbose && !args.quiet {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("⚠️  Failed to set tracing subscriber: {}", e);
    }
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is set up, so problems are printed directly.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            eprintln!("⚠️  Ignoring {}: {:#}", CONFIG_FILE_NAME, e);
            Ok(Config::default())
        }
    }
}

/// Build the corpus source from the validated arguments.
fn corpus_source(args: &Args) -> Result<CorpusSource> {
    match (&args.recipes_path, &args.narration_path) {
        (Some(dir), None) => Ok(CorpusSource::Recipes(dir.clone())),
        (None, Some(file)) => Ok(CorpusSource::Narration(file.clone())),
        _ => anyhow::bail!("Exactly one of --recipes-path or --narration-path is required"),
    }
}

/// Run the statistics pass on the blocking pool.
async fn compute_statistics(
    corpus: CorpusSource,
    config: &Config,
    options: PipelineOptions,
) -> Result<PipelineOutput> {
    let scan_config = scanner::ScanConfig::from(&config.scanner);

    tokio::task::spawn_blocking(move || match corpus {
        CorpusSource::Recipes(root) => {
            let files = scanner::FileScanner::new(root, scan_config).scan()?;
            analysis::analyze_recipe_files(&files, &options)
        }
        CorpusSource::Narration(path) => {
            let corpus = source::load_narrations(&path)?;
            analysis::analyze_narrations(corpus, &options)
        }
    })
    .await
    .context("Statistics worker panicked")?
}

/// Send a sample of utterances to the annotation server, if requested.
async fn annotate_sample(
    corpus: &CorpusSource,
    config: &Config,
) -> Result<Option<AnnotationSummary>> {
    let settings = &config.annotation;
    if settings.sample_size == 0 {
        return Ok(None);
    }

    let scan_config = scanner::ScanConfig::from(&config.scanner);
    let sampled = corpus.clone();
    let limit = settings.sample_size;
    let sentences = tokio::task::spawn_blocking(move || {
        source::sample_utterances(&sampled, &scan_config, limit)
    })
    .await
    .context("Sampling worker panicked")??;

    if sentences.is_empty() {
        warn!("No utterances available for the annotation sample");
    }

    let client = CoreNlpClient::new(CoreNlpConfig::from(settings))?;
    let summary =
        annotation::probe(&client, &settings.url, &sentences, settings.concurrency).await;
    Ok(Some(summary))
}

/// Run the complete analysis workflow. Returns exit code (0 or 2).
async fn run(args: Args, config: Config) -> Result<i32> {
    let start_time = Instant::now();
    let corpus = corpus_source(&args)?;
    let quiet = args.quiet;

    if !quiet {
        eprintln!("📂 Reading {}: {}", corpus.kind(), corpus.path().display());
    }

    let options = PipelineOptions {
        concurrency: config.general.concurrency,
        show_progress: !quiet,
    };
    let output = compute_statistics(corpus.clone(), &config, options).await?;

    let annotation = annotate_sample(&corpus, &config).await?;

    let duration = start_time.elapsed().as_secs_f64();
    let report = Report {
        metadata: ReportMetadata {
            corpus_kind: corpus.kind(),
            input_path: corpus.path().display().to_string(),
            analysis_date: Utc::now(),
            concurrency: config.general.concurrency,
            duration_seconds: duration,
        },
        stats: output.stats,
        rejected: output.rejected,
        annotation,
    };

    let rendered = report::render(
        &report,
        config.report.format,
        report::RenderOptions::from(&config.report),
    )?;

    match args.output {
        Some(ref path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            if !quiet {
                eprintln!("📝 Report saved to: {}", path.display());
            }
        }
        None => print!("{}", rendered),
    }

    let rejected = report.stats.rejected_count;
    if !quiet {
        if rejected == 0 {
            eprintln!(
                "✅ Analyzed {} {} in {:.1}s",
                report.stats.file_count,
                corpus.kind().unit(),
                duration
            );
        } else {
            eprintln!(
                "⚠️  Analyzed {} {} in {:.1}s, {} records rejected",
                report.stats.file_count,
                corpus.kind().unit(),
                duration,
                rejected
            );
        }
    }

    if args.fail_on_rejected && rejected > 0 {
        eprintln!("\n⛔ {} records rejected. Failing (exit code 2).", rejected);
        return Ok(2);
    }

    Ok(0)
}
