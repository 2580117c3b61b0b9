//! Markdown rendering for scorecards.

use super::{Scorecard, ScoreBasis};

/// Render a scorecard as a Markdown report.
pub fn render_markdown(card: &Scorecard) -> String {
    let mut out = String::new();

    out.push_str(&format!("# Scorecard: {}\n\n", card.project));
    out.push_str(&format!(
        "Period: {} · Date: {} · Sessions: {}\n\n",
        card.period,
        card.date.format("%Y-%m-%d"),
        card.session_count
    ));
    out.push_str(&format!(
        "**Overall: {} ({})**\n\n",
        card.overall, card.overall_grade
    ));

    if let Some(h) = &card.highlights {
        out.push_str(&format!("- Best: {} ({})\n", h.best.name, h.best.score));
        out.push_str(&format!("- Worst: {} ({})\n\n", h.worst.name, h.worst.score));
    }

    out.push_str("| Category | Score | Grade | Evidence |\n");
    out.push_str("|---|---:|:---:|---|\n");
    for c in &card.categories {
        let evidence = match &c.basis {
            ScoreBasis::Measured => escape_cell(&c.evidence),
            ScoreBasis::NeutralDefault { reason } => format!("_default: {}_", escape_cell(reason)),
        };
        out.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            c.name, c.score, c.grade, evidence
        ));
    }

    let examples: Vec<_> = card
        .categories
        .iter()
        .filter(|c| c.good.is_some() || c.bad.is_some())
        .collect();
    if !examples.is_empty() {
        out.push_str("\n## Examples\n");
        for c in examples {
            out.push_str(&format!("\n### {}\n\n", c.name));
            if let Some(good) = &c.good {
                out.push_str(&format!("- Good: {}\n", quote(good)));
            }
            if let Some(bad) = &c.bad {
                out.push_str(&format!("- Needs work: {}\n", quote(bad)));
            }
        }
    }

    out
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

fn quote(text: &str) -> String {
    format!("`{}`", text.replace('`', "'").replace('\n', " "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorecard::{CategoryScore, Grade, Highlight, Highlights};
    use chrono::NaiveDate;

    fn card() -> Scorecard {
        Scorecard {
            project: "shop".to_string(),
            period: "week".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            categories: vec![
                CategoryScore::measured("Plans", 50.0, "1/2 sessions | opened with a plan")
                    .with_examples(Some("plan: src/a.rs".to_string()), None),
                CategoryScore::neutral("Delegation", 75, "No sub-agent spawns"),
            ],
            overall: 63,
            overall_grade: Grade::C,
            highlights: Some(Highlights {
                best: Highlight {
                    name: "Delegation".to_string(),
                    score: 75,
                },
                worst: Highlight {
                    name: "Plans".to_string(),
                    score: 50,
                },
            }),
            session_count: 2,
        }
    }

    #[test]
    fn test_render_markdown() {
        let md = render_markdown(&card());
        assert!(md.starts_with("# Scorecard: shop\n"));
        assert!(md.contains("Date: 2025-03-01"));
        assert!(md.contains("**Overall: 63 (C)**"));
        assert!(md.contains("- Worst: Plans (50)"));
        assert!(md.contains("| Plans | 50 | D | 1/2 sessions \\| opened with a plan |"));
        assert!(md.contains("| Delegation | 75 | B | _default: No sub-agent spawns_ |"));
        assert!(md.contains("### Plans\n\n- Good: `plan: src/a.rs`"));
    }

    #[test]
    fn test_render_without_examples_has_no_examples_section() {
        let mut card = card();
        card.categories[0].good = None;
        assert!(!render_markdown(&card).contains("## Examples"));
    }
}
