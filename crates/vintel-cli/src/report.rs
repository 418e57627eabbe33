//! Report rendering: aligned table for terminals, markdown for sharing,
//! JSON for downstream tools.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use vintel_engine::AudienceReport;

use crate::OutputFormat;

/// Render `report` in the requested format.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub(crate) fn render(
    report: &AudienceReport,
    video_id: &str,
    generated_at: DateTime<Utc>,
    format: OutputFormat,
) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Table => render_table(report)?,
        OutputFormat::Markdown => render_markdown(report, video_id, generated_at)?,
        OutputFormat::Json => serde_json::to_string_pretty(report)?,
    })
}

fn render_table(report: &AudienceReport) -> Result<String, std::fmt::Error> {
    let mut out = String::new();

    if report.is_empty() {
        writeln!(
            out,
            "no location estimates; {} of {} signals accepted",
            report.audit.signals_accepted, report.audit.signals_received
        )?;
    } else {
        writeln!(
            out,
            "{:<30}{:<10}{:<10}{:<10}{:<10}WEIGHT",
            "LOCATION", "SHARE", "TIER", "COMMENTS", "MENTIONS"
        )?;
        for e in &report.cities {
            let share = format!("{}%", e.share_percent);
            writeln!(
                out,
                "{:<30}{:<10}{:<10}{:<10}{:<10}{:.2}",
                e.location.key(),
                share,
                e.confidence_tier,
                e.contributing_signal_count,
                e.mention_count,
                e.total_weight
            )?;
        }
    }

    if !report.countries.is_empty() {
        writeln!(out)?;
        writeln!(
            out,
            "{:<30}{:<10}{:<10}{:<10}WEIGHT",
            "COUNTRY", "SHARE", "TIER", "COMMENTS"
        )?;
        for e in &report.countries {
            let share = format!("{}%", e.share_percent);
            writeln!(
                out,
                "{:<30}{:<10}{:<10}{:<10}{:.2}",
                e.country,
                share,
                e.confidence_tier,
                e.contributing_signal_count,
                e.total_weight
            )?;
        }
    }

    let audit = &report.audit;
    writeln!(out)?;
    writeln!(
        out,
        "signals: {} received, {} accepted, {} rejected; mentions: {} resolved, {} unresolved",
        audit.signals_received,
        audit.signals_accepted,
        audit.signals_rejected,
        audit.mentions_resolved,
        audit.mentions_unresolved
    )?;
    Ok(out)
}

fn render_markdown(
    report: &AudienceReport,
    video_id: &str,
    generated_at: DateTime<Utc>,
) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    let audit = &report.audit;

    writeln!(out, "# Audience Geography Report")?;
    writeln!(out)?;
    writeln!(out, "**Video**: {video_id}")?;
    writeln!(
        out,
        "**Generated**: {}",
        generated_at.format("%Y-%m-%d %H:%M UTC")
    )?;
    writeln!(
        out,
        "**Signals**: {} received, {} accepted, {} rejected",
        audit.signals_received, audit.signals_accepted, audit.signals_rejected
    )?;
    if let Some(top) = &report.summary.top_city {
        writeln!(out, "**Top city**: {top}")?;
    }
    writeln!(out)?;
    writeln!(out, "---")?;
    writeln!(out)?;

    writeln!(out, "## Cities")?;
    writeln!(out)?;
    if report.cities.is_empty() {
        writeln!(out, "_No city met the minimum signal count._")?;
    } else {
        writeln!(out, "| Location | Share | Tier | Comments | Mentions |")?;
        writeln!(out, "|----------|-------|------|----------|----------|")?;
        for e in &report.cities {
            writeln!(
                out,
                "| {} | {}% | {} | {} | {} |",
                e.location,
                e.share_percent,
                e.confidence_tier,
                e.contributing_signal_count,
                e.mention_count
            )?;
        }
    }

    if !report.countries.is_empty() {
        writeln!(out)?;
        writeln!(out, "## Countries")?;
        writeln!(out)?;
        writeln!(out, "| Country | Share | Tier | Comments |")?;
        writeln!(out, "|---------|-------|------|----------|")?;
        for e in &report.countries {
            writeln!(
                out,
                "| {} | {}% | {} | {} |",
                e.country, e.share_percent, e.confidence_tier, e.contributing_signal_count
            )?;
        }
    }

    if !report.languages.is_empty() {
        writeln!(out)?;
        writeln!(out, "## Languages")?;
        writeln!(out)?;
        writeln!(out, "| Language | Comments | Share |")?;
        writeln!(out, "|----------|----------|-------|")?;
        for l in &report.languages {
            writeln!(out, "| {} | {} | {}% |", l.language, l.count, l.percent)?;
        }
    }

    if !report.rejections.is_empty() {
        writeln!(out)?;
        writeln!(out, "## Rejected Signals")?;
        writeln!(out)?;
        for r in &report.rejections {
            writeln!(
                out,
                "- `{}`: {}",
                r.comment_id.as_deref().unwrap_or("(no id)"),
                r.reason
            )?;
        }
    }

    Ok(out)
}
