//! pairlog-learn - maintain the correction log and learned patterns
//!
//! Appends corrections to a project's log, recomputes recurring patterns,
//! and lists what has been learned.

mod setup;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pairlog_core::patterns::{CategorySummary, LogOutcome};
use pairlog_core::{CorrectionCategory, Database, NewCorrection, Pattern, PatternLearner};
use setup::Format;

#[derive(Parser)]
#[command(name = "pairlog-learn")]
#[command(about = "Log corrections and learn recurring mistake patterns")]
#[command(version)]
struct Args {
    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    format: Format,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Append a correction to a project's log
    Log {
        #[arg(short, long)]
        project: String,

        /// What the user said when correcting
        #[arg(long)]
        said: Option<String>,

        /// What the assistant did wrong
        #[arg(long)]
        wrong: Option<String>,

        /// Why it happened
        #[arg(long)]
        cause: Option<String>,

        /// vague_prompt, stale_context, wrong_assumption, wrong_file, wrong_scope or other
        #[arg(long)]
        category: Option<String>,
    },

    /// Recompute patterns from the full correction log
    Refresh {
        #[arg(short, long)]
        project: String,
    },

    /// Show the last learned patterns
    Patterns {
        #[arg(short, long)]
        project: String,
    },

    /// Show correction counts by category
    Summary {
        #[arg(short, long)]
        project: String,
    },

    /// List projects with logged corrections
    Projects,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let (config, _log_guard) = setup::init("pairlog-learn")?;

    if !config.profile.capabilities().learning {
        anyhow::bail!(
            "correction learning is disabled by the '{}' profile",
            config.profile.as_str()
        );
    }

    let db = setup::open_database()?;

    match args.command {
        Command::Log {
            project,
            said,
            wrong,
            cause,
            category,
        } => {
            let entry = NewCorrection {
                what_user_said: said,
                what_you_did_wrong: wrong,
                root_cause: cause,
                category,
            };
            let outcome = PatternLearner::new(db, project)
                .log_correction(entry)
                .context("failed to log correction")?;
            print_outcome(&outcome, args.format)?;
        }
        Command::Refresh { project } => {
            let patterns = PatternLearner::new(db, project)
                .refresh_patterns()
                .context("failed to refresh patterns")?;
            match args.format {
                Format::Json => setup::print_json(&patterns)?,
                Format::Text => {
                    println!("Refreshed: {} pattern(s)", patterns.len());
                    print_patterns(&patterns);
                }
            }
        }
        Command::Patterns { project } => {
            let patterns = PatternLearner::new(db, project)
                .patterns()
                .context("failed to load patterns")?;
            match args.format {
                Format::Json => setup::print_json(&patterns)?,
                Format::Text if patterns.is_empty() => {
                    println!("No patterns learned yet.");
                    println!("Run 'pairlog-learn refresh' after logging corrections.");
                }
                Format::Text => print_patterns(&patterns),
            }
        }
        Command::Summary { project } => {
            let summary = PatternLearner::new(db, project)
                .summary()
                .context("failed to summarize corrections")?;
            match args.format {
                Format::Json => setup::print_json(&summary)?,
                Format::Text => print_summary(&summary),
            }
        }
        Command::Projects => list_projects(&db, args.format)?,
    }

    Ok(())
}

fn print_outcome(outcome: &LogOutcome, format: Format) -> Result<()> {
    if format == Format::Json {
        return setup::print_json(outcome);
    }
    match outcome {
        LogOutcome::Logged {
            correction,
            summary,
        } => {
            println!(
                "Logged correction {} ({})",
                correction.id, correction.category
            );
            print_summary(summary);
        }
        LogOutcome::Skipped { reason } => println!("Skipped: {}", reason),
    }
    Ok(())
}

fn print_summary(summary: &CategorySummary) {
    println!("Corrections: {}", summary.total);
    for category in CorrectionCategory::ALL {
        let count = summary.by_category.get(&category).copied().unwrap_or(0);
        println!("  {:<18} {}", category.as_str(), count);
    }
}

fn print_patterns(patterns: &[Pattern]) {
    for pattern in patterns {
        println!(
            "\n[{}] {} (seen {}x, last {})",
            pattern.id,
            pattern.pattern,
            pattern.frequency,
            pattern.last_seen.format("%Y-%m-%d")
        );
        println!("  keywords: {}", pattern.keywords.join(", "));
        for example in &pattern.examples {
            println!("  - \"{}\"", example);
        }
    }
}

fn list_projects(db: &Database, format: Format) -> Result<()> {
    let projects = db.list_projects().context("failed to list projects")?;
    match format {
        Format::Json => setup::print_json(&projects)?,
        Format::Text => {
            for project in &projects {
                let refreshed = db
                    .patterns_refreshed_at(project)?
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "never".to_string());
                println!("{} (patterns refreshed: {})", project, refreshed);
            }
        }
    }
    Ok(())
}
