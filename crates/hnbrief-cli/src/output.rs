//! Human and machine renderings of a run.

use std::io::{self, Write};
use std::time::Duration;

use hnbrief_core::{EnrichedRecord, EnrichmentReport, Outcome, Summary};
use serde::Serialize;

const RULE_WIDTH: usize = 70;
const PREVIEW_CHARS: usize = 240;

/// One summarized story in the `--json` output.
#[derive(Debug, Serialize)]
pub struct JsonSummary<'a> {
    pub title: Option<&'a str>,
    pub url: &'a str,
    pub score: Option<u32>,
    pub comments: Option<u32>,
    pub summary: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
    pub time_iso: Option<&'a str>,
    pub by: Option<&'a str>,
}

impl<'a> From<&'a Summary> for JsonSummary<'a> {
    fn from(s: &'a Summary) -> Self {
        let record = &s.record;
        Self {
            title: record.title.as_deref(),
            url: &record.url,
            score: record.score,
            comments: record.descendant_count,
            summary: s.summary.as_deref(),
            error: s.error.as_deref(),
            time_iso: record.time_iso.as_deref(),
            by: record.author.as_deref(),
        }
    }
}

pub fn write_summaries_json(out: &mut impl Write, summaries: &[Summary]) -> anyhow::Result<()> {
    let rows: Vec<JsonSummary<'_>> = summaries.iter().map(JsonSummary::from).collect();
    serde_json::to_writer_pretty(&mut *out, &rows)?;
    writeln!(out)?;
    Ok(())
}

pub fn write_summaries_pretty(out: &mut impl Write, summaries: &[Summary]) -> io::Result<()> {
    if summaries.is_empty() {
        writeln!(
            out,
            "No summaries generated. Try increasing --last-k or check --verbose output for skipped articles."
        )?;
        return Ok(());
    }

    writeln!(out)?;
    writeln!(out, "━━━ Hacker News Summaries ━━━")?;
    writeln!(out)?;

    for (i, s) in summaries.iter().enumerate() {
        let record = &s.record;
        writeln!(out, "{}. {}", i + 1, title(record))?;
        writeln!(
            out,
            "   ({} points, {} comments)",
            or_unknown(record.score),
            or_unknown(record.descendant_count)
        )?;
        match (&s.summary, &s.error) {
            (Some(summary), _) => writeln!(out, "   {summary}")?,
            (None, Some(error)) => writeln!(out, "   (no summary: {error})")?,
            (None, None) => writeln!(out, "   (no summary)")?,
        }
        writeln!(out, "   {}", record.url)?;

        if i + 1 < summaries.len() {
            writeln!(out)?;
            writeln!(out, "{}", "─".repeat(RULE_WIDTH))?;
            writeln!(out)?;
        }
    }

    writeln!(out)?;
    writeln!(out, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
    Ok(())
}

/// `enrich` subcommand, JSON: one tagged object per requested id.
pub fn write_outcomes_json(out: &mut impl Write, results: &[Outcome]) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, results)?;
    writeln!(out)?;
    Ok(())
}

/// `enrich` subcommand, text: records with a content preview, skips inline.
pub fn write_outcomes_pretty(out: &mut impl Write, results: &[Outcome]) -> io::Result<()> {
    for (i, outcome) in results.iter().enumerate() {
        match outcome {
            Outcome::Enriched(record) => {
                writeln!(out, "{}. [{}] {}", i + 1, record.id, title(record))?;
                writeln!(out, "   {}", record.url)?;
                writeln!(
                    out,
                    "   {} chars: {}",
                    record.content.chars().count(),
                    preview(&record.content)
                )?;
            }
            Outcome::Skipped(skip) => {
                writeln!(out, "{}. [{}] skipped: {} ({})", i + 1, skip.id, skip.kind, skip.detail)?;
            }
        }
    }
    Ok(())
}

/// Skips with reasons and per-item timings, for `--verbose`.
pub fn write_run_report(out: &mut impl Write, report: &EnrichmentReport) -> io::Result<()> {
    let skipped: Vec<_> = report.skipped().collect();
    writeln!(
        out,
        "Enriched {} of {} items ({} skipped) in {:.2}s",
        report.records().count(),
        report.results.len(),
        skipped.len(),
        report.elapsed.as_secs_f64()
    )?;

    for skip in &skipped {
        writeln!(out, "  skipped {}: {} ({})", skip.id, skip.kind, skip.detail)?;
    }
    for timing in &report.timings {
        writeln!(
            out,
            "  {:>10} {:<28} {:>7} ms",
            timing.id,
            timing.outcome.to_string(),
            timing.duration.as_millis()
        )?;
    }
    Ok(())
}

pub fn write_total(out: &mut impl Write, total: Duration) -> io::Result<()> {
    writeln!(out, "Total execution time: {:.2} seconds", total.as_secs_f64())
}

fn title(record: &EnrichedRecord) -> &str {
    record.title.as_deref().unwrap_or("(untitled)")
}

fn or_unknown(value: Option<u32>) -> String {
    value.map_or_else(|| "?".to_string(), |v| v.to_string())
}

fn preview(content: &str) -> String {
    let flat = content.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &flat[..idx]),
        None => flat,
    }
}
