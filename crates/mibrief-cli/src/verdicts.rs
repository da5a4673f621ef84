//! Offline validation of card files.

use std::path::Path;

use anyhow::Context;
use serde_json::Value;

use mibrief_core::{validate, RawCard, ValidationReport};

/// Result of validating one entry of a card file.
#[derive(Debug)]
pub(crate) struct Verdict {
    pub index: usize,
    pub title: Option<String>,
    pub report: ValidationReport,
}

/// Validate every card in `text`, which holds a JSON object or an array of them.
///
/// Array entries that are not card objects get an invalid verdict rather than
/// failing the whole file.
///
/// # Errors
///
/// Returns an error if `text` is not JSON, or is JSON but neither an object
/// nor an array.
pub(crate) fn check_cards(text: &str) -> anyhow::Result<Vec<Verdict>> {
    let value: Value = serde_json::from_str(text).context("file is not valid JSON")?;
    let items = match value {
        Value::Array(items) => items,
        obj @ Value::Object(_) => vec![obj],
        _ => anyhow::bail!("expected a card object or an array of cards"),
    };

    Ok(items
        .into_iter()
        .enumerate()
        .map(|(index, item)| check_one(index, item))
        .collect())
}

fn check_one(index: usize, item: Value) -> Verdict {
    let raw = if item.is_object() {
        serde_json::from_value::<RawCard>(item).ok()
    } else {
        None
    };

    match raw {
        Some(raw) => Verdict {
            index,
            title: raw.title_text().map(ToOwned::to_owned),
            report: validate(&raw),
        },
        None => Verdict {
            index,
            title: None,
            report: ValidationReport {
                is_valid: false,
                score: 0,
                issues: vec!["not a card object".to_string()],
                warnings: Vec::new(),
            },
        },
    }
}

pub(crate) fn render(verdict: &Verdict) -> String {
    let title = verdict.title.as_deref().unwrap_or("untitled");
    let status = if verdict.report.is_valid {
        "valid"
    } else {
        "INVALID"
    };
    let mut out = format!(
        "card {} ({title}): {status}, score {}",
        verdict.index, verdict.report.score
    );
    for issue in &verdict.report.issues {
        out.push_str("\n  issue: ");
        out.push_str(issue);
    }
    for warning in &verdict.report.warnings {
        out.push_str("\n  warning: ");
        out.push_str(warning);
    }
    out
}

/// Print a verdict per card. Fails when any card is invalid so scripts can
/// gate on the exit status.
pub(crate) fn run_validate(path: &Path) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let verdicts = check_cards(&text)?;

    for verdict in &verdicts {
        println!("{}", render(verdict));
    }

    let invalid = verdicts.iter().filter(|v| !v.report.is_valid).count();
    if invalid > 0 {
        anyhow::bail!("{invalid} of {} cards failed validation", verdicts.len());
    }
    println!("all {} cards valid", verdicts.len());
    Ok(())
}
