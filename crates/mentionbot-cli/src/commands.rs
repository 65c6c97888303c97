//! Command handlers. Each builds what it needs from the loaded config.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use mentionbot_core::{AppConfig, Mention, Report};
use mentionbot_monitor::{
    fetch_mentions, report_summary_line, report_title, FetchOutcome, FetchProfile,
    MonitoringService, UrgentOutcome,
};

const CHECK_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);
const RECENT_SHOWN: usize = 5;

pub(crate) async fn run_once(config: &AppConfig) -> anyhow::Result<()> {
    let service = MonitoringService::from_config(config)?;
    let outcome = service.run_monitoring().await?;

    println!(
        "run complete: {} mentions, {} failed sources, stored as {}",
        outcome.total_mentions, outcome.error_count, outcome.stored_as
    );
    if !outcome.timed_out.is_empty() {
        println!("timed out: {}", outcome.timed_out.join(", "));
    }
    Ok(())
}

pub(crate) async fn urgent_once(config: &AppConfig) -> anyhow::Result<()> {
    let service = MonitoringService::from_config(config)?;
    match service.run_urgent_check().await? {
        UrgentOutcome::Quiet => println!("urgent check: nothing urgent"),
        UrgentOutcome::Alerted(count) => println!("urgent check: alerted on {count} mentions"),
    }
    Ok(())
}

pub(crate) async fn list_sources(
    config: &AppConfig,
    check: bool,
    timeout_secs: u64,
) -> anyhow::Result<()> {
    let sources = mentionbot_sources::build_sources(config)?;

    let outcome = if check {
        Some(
            fetch_mentions(
                &sources,
                &config.keywords,
                CHECK_WINDOW,
                FetchProfile::full(Duration::from_secs(timeout_secs)),
            )
            .await,
        )
    } else {
        None
    };

    for source in &sources {
        let name = source.name();
        let status = if !source.is_enabled() {
            "disabled (missing credentials)".to_string()
        } else if let Some(outcome) = &outcome {
            check_status(outcome, name)
        } else {
            "enabled".to_string()
        };
        println!("{name:<15} {status}");
    }
    Ok(())
}

fn check_status(outcome: &FetchOutcome, name: &str) -> String {
    if outcome.failed.iter().any(|f| *f == name) {
        return "FAILED (see log)".to_string();
    }
    if outcome.timed_out.iter().any(|t| *t == name) {
        return "TIMED OUT".to_string();
    }
    let count = outcome.mentions.iter().filter(|m| m.source == name).count();
    format!("ok, {count} mentions in the last 24h")
}

pub(crate) async fn sample_report(
    config: &AppConfig,
    input: Option<&Path>,
    json: bool,
    send: bool,
) -> anyhow::Result<()> {
    let mentions = match input {
        Some(path) => read_mentions(path)?,
        None => crate::samples::sample_mentions(),
    };

    let service = MonitoringService::from_config(config)?;
    let report = service.sample_report(mentions);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_summary(&report, &config.report_subject));
    }

    if send {
        service.send_report(&report).await?;
        println!("report delivered");
    }
    Ok(())
}

fn read_mentions(path: &Path) -> anyhow::Result<Vec<Mention>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let mentions = serde_json::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("{} is not a JSON array of mentions: {e}", path.display()))?;
    Ok(mentions)
}

/// Plain-text digest for the terminal.
pub(crate) fn render_summary(report: &Report, subject: &str) -> String {
    use std::fmt::Write as _;

    let mut out = String::new();
    let _ = writeln!(out, "{}", report_title(report, subject));
    let _ = writeln!(out, "{}", report_summary_line(report));
    let _ = writeln!(
        out,
        "generated {}",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    write_counts(&mut out, "sources", &report.summary.sources);
    write_counts(&mut out, "sentiment", &report.summary.sentiment);

    if !report.summary.top_sources.is_empty() {
        let _ = writeln!(out, "top sources: {}", report.summary.top_sources.join(", "));
    }

    for (i, mention) in report.mentions.iter().take(RECENT_SHOWN).enumerate() {
        let _ = writeln!(
            out,
            "{:>2}. [{}] {} ({}, score {})",
            i + 1,
            mention.platform,
            mention.title,
            mention.sentiment_label(),
            mention.score
        );
        let _ = writeln!(out, "    {}", mention.url);
    }
    if report.mentions.len() > RECENT_SHOWN {
        let _ = writeln!(
            out,
            "    ... and {} more",
            report.mentions.len() - RECENT_SHOWN
        );
    }
    out
}

fn write_counts(out: &mut String, label: &str, counts: &BTreeMap<String, usize>) {
    use std::fmt::Write as _;

    let _ = writeln!(out, "{label}:");
    for (name, count) in counts {
        let _ = writeln!(out, "  {name:<15} {count}");
    }
}
