//! Read-only inspection commands: validate a signal file, trace mention
//! resolution, and show the language mix.

use std::path::Path;

use vintel_engine::{ingest, run, Normalizer, Resolution};

use crate::context::EngineContext;
use crate::input::load_signals;

/// Check every record in a signal file and list the rejected ones.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub(crate) fn run_validate(input: &Path) -> anyhow::Result<()> {
    let file = load_signals(input)?;
    let outcome = ingest(&file.signals);
    let mentions: usize = outcome
        .accepted
        .iter()
        .map(|s| s.location_mentions.len())
        .sum();

    println!(
        "{}: {} signals, {} accepted ({} mentions), {} rejected",
        file.video_id,
        file.signals.len(),
        outcome.accepted.len(),
        mentions,
        outcome.rejected.len()
    );

    if !outcome.rejected.is_empty() {
        println!();
        println!("{:<25}REASON", "COMMENT");
        for r in &outcome.rejected {
            println!(
                "{:<25}{}",
                r.comment_id.as_deref().unwrap_or("(no id)"),
                r.reason
            );
        }
    }
    Ok(())
}

/// Resolve each string against the gazetteer and print the outcome.
pub(crate) fn run_resolve(ctx: &EngineContext, texts: &[String]) {
    let normalizer = Normalizer::new(&ctx.gazetteer, &ctx.config);

    println!("{:<30}{:<30}{:<10}SIMILARITY", "INPUT", "RESOLVED", "STRATEGY");
    for text in texts {
        match normalizer.resolve(text) {
            Resolution::Resolved {
                location,
                strategy,
                similarity,
            } => {
                let key = location.key();
                let strategy = strategy.to_string();
                println!("{text:<30}{key:<30}{strategy:<10}{similarity:.3}");
            }
            Resolution::Unresolved(reason) => {
                println!("{text:<30}unresolved: {reason}");
            }
        }
    }
}

/// Print the detected-language distribution of a signal file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub(crate) fn run_languages(ctx: &EngineContext, input: &Path) -> anyhow::Result<()> {
    let file = load_signals(input)?;
    let report = run(&file.signals, &ctx.config, &ctx.gazetteer);

    if report.languages.is_empty() {
        println!("no accepted signals in {}", input.display());
        return Ok(());
    }

    println!("{:<12}{:<10}{:<10}REGION", "LANGUAGE", "COMMENTS", "SHARE");
    for share in &report.languages {
        let region = ctx
            .gazetteer
            .region_for_language(&share.language)
            .unwrap_or("-");
        let percent = format!("{}%", share.percent);
        println!(
            "{:<12}{:<10}{percent:<10}{region}",
            share.language, share.count
        );
    }
    Ok(())
}
