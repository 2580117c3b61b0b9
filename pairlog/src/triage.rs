//! pairlog-triage - classify an instruction before acting on it
//!
//! Runs the triage classifier over one instruction and reports its ambiguity
//! level. With `--project`, learned correction patterns for that project can
//! escalate the result.

mod setup;

use anyhow::{Context, Result};
use clap::Parser;
use pairlog_core::{classify, PatternLearner};
use setup::Format;
use std::io::Read;

#[derive(Parser)]
#[command(name = "pairlog-triage")]
#[command(about = "Classify how ambiguous an instruction is")]
#[command(version)]
struct Args {
    /// Instruction to classify; read from stdin when omitted or "-"
    instruction: Option<String>,

    /// Project whose learned patterns may escalate the result
    #[arg(short, long)]
    project: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: Format,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let (config, _log_guard) = setup::init("pairlog-triage")?;

    let capabilities = config.profile.capabilities();
    if !capabilities.triage {
        anyhow::bail!(
            "triage is disabled by the '{}' profile",
            config.profile.as_str()
        );
    }

    let instruction = match args.instruction.as_deref() {
        Some(text) if text != "-" => text.to_string(),
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read instruction from stdin")?;
            buf
        }
    };
    if instruction.trim().is_empty() {
        anyhow::bail!("no instruction given");
    }

    let patterns = match &args.project {
        Some(project) if capabilities.learning => {
            let db = setup::open_database()?;
            PatternLearner::new(db, project.as_str())
                .patterns()
                .context("failed to load learned patterns")?
        }
        Some(_) => {
            tracing::info!("Pattern escalation skipped: learning disabled by profile");
            Vec::new()
        }
        None => Vec::new(),
    };

    let result = classify(&instruction, &config.triage, &patterns);
    tracing::info!(
        level = %result.level,
        rule = result.rule.as_str(),
        escalated = result.escalated_by.is_some(),
        "Classified instruction"
    );

    match args.format {
        Format::Json => setup::print_json(&result)?,
        Format::Text => {
            println!("Level: {}", result.level);
            println!("Rule: {}", result.rule.as_str());
            if let Some(trigger) = &result.trigger {
                println!("Trigger: {}", trigger);
            }
            if let Some(id) = &result.escalated_by {
                if let Some(pattern) = patterns.iter().find(|p| &p.id == id) {
                    println!("Escalated by: {} ({})", pattern.id, pattern.pattern);
                }
            }
            println!("Guidance: {}", result.level.guidance());
        }
    }

    Ok(())
}
