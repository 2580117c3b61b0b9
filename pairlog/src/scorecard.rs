//! pairlog-scorecard - grade a set of recorded sessions
//!
//! Reads session logs from a directory, assembles sessions, and prints the
//! twelve-category scorecard as Markdown or JSON.

mod setup;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use pairlog_core::ingest::{normalize_file, DirectoryLogSource, LogSource};
use pairlog_core::scorecard::{render_markdown, ScorecardEngine};
use pairlog_core::session::assemble_sessions;
use pairlog_core::Event;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Markdown,
    Json,
}

#[derive(Parser)]
#[command(name = "pairlog-scorecard")]
#[command(about = "Score how disciplined a set of AI pair-programming sessions was")]
#[command(version)]
struct Args {
    /// Directory of session logs (default: ingest.log_root from config)
    #[arg(short, long)]
    logs: Option<PathBuf>,

    /// Only score sessions of this project (name, directory, or its trailing part)
    #[arg(short, long)]
    project: Option<String>,

    /// Only score sessions that started within the last N days
    #[arg(long)]
    days: Option<u32>,

    /// Period label for the report (default derived from --days)
    #[arg(long)]
    period: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "markdown")]
    format: ReportFormat,

    /// List the scoring categories without reading any logs
    #[arg(long)]
    list_categories: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let (config, _log_guard) = setup::init("pairlog-scorecard")?;

    if !config.profile.capabilities().scorecard {
        anyhow::bail!(
            "scorecards are disabled by the '{}' profile",
            config.profile.as_str()
        );
    }

    let engine = ScorecardEngine::standard(&config.scorecard);

    if args.list_categories {
        println!("Scoring categories:");
        for name in engine.category_names() {
            println!("  - {}", name);
        }
        return Ok(());
    }

    let root = args.logs.clone().unwrap_or_else(|| config.ingest.log_root());
    let source = DirectoryLogSource::new(&root, &config.ingest.session_glob);
    let files = source
        .session_files()
        .with_context(|| format!("failed to list session logs under {}", root.display()))?;

    let events = read_events(&files, &config.ingest)?;
    let mut sessions = assemble_sessions(events);

    if let Some(project) = &args.project {
        sessions.retain(|s| s.belongs_to(project));
    }
    if let Some(days) = args.days {
        let cutoff = Utc::now() - Duration::days(days as i64);
        sessions.retain(|s| s.started_at().is_some_and(|t| t >= cutoff));
    }

    if sessions.is_empty() {
        eprintln!(
            "No sessions found under {}; every category uses its default.",
            root.display()
        );
    }

    let project = args.project.as_deref().unwrap_or("all projects");
    let period = match (&args.period, args.days) {
        (Some(label), _) => label.clone(),
        (None, Some(days)) => format!("last {} days", days),
        (None, None) => "all time".to_string(),
    };

    let card = engine.compute(&sessions, project, &period);

    match args.format {
        ReportFormat::Json => setup::print_json(&card)?,
        ReportFormat::Markdown => print!("{}", render_markdown(&card)),
    }

    Ok(())
}

/// Normalize every file, skipping unreadable ones.
fn read_events(
    files: &[PathBuf],
    ingest: &pairlog_core::config::IngestConfig,
) -> Result<Vec<Event>> {
    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("invalid progress template")?
            .progress_chars("#>-"),
    );

    let mut events = Vec::new();
    let mut skipped_lines = 0;
    for path in files {
        pb.set_message(
            path.file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("...")
                .to_string(),
        );
        match normalize_file(path, ingest) {
            Ok(report) => {
                skipped_lines += report.skipped;
                events.extend(report.events);
            }
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable log"),
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    tracing::info!(
        files = files.len(),
        events = events.len(),
        skipped_lines,
        "Read session logs"
    );
    Ok(events)
}
