//! Reporting and export: JSON, CSV, and Markdown artifact generation.
//!
//! - **JSON**: full round-trip serialization of an `AssetReport`
//! - **CSV**: the enriched series, one row per merged day
//! - **Markdown**: a human-readable single-asset report
//!
//! Persisted JSON carries a `schema_version`; newer versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use sentilab_core::domain::EnrichedSeries;

use crate::metrics::PerformanceMetrics;
use crate::runner::{AssetReport, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize an `AssetReport` to pretty JSON.
pub fn export_json(report: &AssetReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize AssetReport to JSON")
}

/// Deserialize an `AssetReport` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<AssetReport> {
    let report: AssetReport =
        serde_json::from_str(json).context("failed to deserialize AssetReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export the enriched series as CSV.
///
/// Columns: date, avg_sentiment, close, return, sentiment_change, target,
/// anomaly, alert, proba, position, strategy_return, cum_strategy,
/// cum_buy_hold, in_sample
pub fn export_series_csv(series: &EnrichedSeries) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "date",
        "avg_sentiment",
        "close",
        "return",
        "sentiment_change",
        "target",
        "anomaly",
        "alert",
        "proba",
        "position",
        "strategy_return",
        "cum_strategy",
        "cum_buy_hold",
        "in_sample",
    ])?;

    for r in &series.rows {
        wtr.write_record([
            &r.date.to_string(),
            &format!("{:.6}", r.avg_sentiment),
            &format!("{:.4}", r.close),
            &format!("{:.8}", r.ret),
            &format!("{:.6}", r.sentiment_change),
            &u8::from(r.target).to_string(),
            &r.anomaly.as_i8().to_string(),
            &r.alert.to_string(),
            &format!("{:.4}", r.proba),
            &r.position.as_i8().to_string(),
            &format!("{:.8}", r.strategy_return),
            &format!("{:.8}", r.cum_strategy),
            &format!("{:.8}", r.cum_buy_hold),
            &r.in_sample.to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for one asset run.
///
/// Creates `{asset}_{run_hash_prefix}/` under `output_dir` containing:
/// - `report.json`: the full `AssetReport`
/// - `series.csv`: the enriched series
/// - `report.md`: the Markdown summary
///
/// The directory name is derived from the run fingerprint, so re-running the
/// same inputs and configuration overwrites the same artifacts.
pub fn save_artifacts(report: &AssetReport, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = output_dir.join(format!("{}_{}", report.asset, report.fingerprint.short()));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("report.json"), export_json(report)?)
        .context("failed to write report.json")?;
    std::fs::write(run_dir.join("series.csv"), export_series_csv(&report.series)?)
        .context("failed to write series.csv")?;
    std::fs::write(run_dir.join("report.md"), generate_report(report))
        .context("failed to write report.md")?;

    Ok(run_dir)
}

/// Load an `AssetReport` from an artifact directory's report.json.
pub fn load_artifacts(dir: &Path) -> Result<AssetReport> {
    let path = dir.join("report.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

// ─── Markdown reports ───────────────────────────────────────────────

/// Generate a Markdown report for one asset run.
pub fn generate_report(report: &AssetReport) -> String {
    let mut md = String::with_capacity(2048);

    md.push_str(&format!("# Sentiment Strategy Report: {}\n\n", report.asset));

    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    if let (Some(first), Some(last)) = (report.series.rows.first(), report.series.rows.last()) {
        md.push_str(&format!("| Period | {} to {} |\n", first.date, last.date));
    }
    md.push_str(&format!("| Days | {} |\n", report.diagnostics.rows));
    md.push_str(&format!("| Policy | {} |\n", report.policy.label()));
    md.push_str(&format!("| Seed | {} |\n", report.fingerprint.seed));
    md.push_str(&format!("| Dataset Hash | {} |\n", report.fingerprint.dataset_hash));
    md.push_str(&format!("| Run Hash | {} |\n", report.fingerprint.run_hash));
    if report.diagnostics.holdout_rows == 0 {
        md.push_str("| Classifier Fit | in-sample (metrics reflect fit, not prediction) |\n");
    } else {
        md.push_str(&format!(
            "| Classifier Fit | {} training days, {} held out |\n",
            report.diagnostics.train_rows, report.diagnostics.holdout_rows
        ));
    }
    md.push('\n');

    md.push_str("## Thresholds\n\n");
    md.push_str("| Parameter | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!(
        "| Sentiment alert threshold | {:.2} |\n",
        report.config.alerts.sentiment_threshold
    ));
    md.push_str(&format!(
        "| Probability threshold | {:.2} |\n",
        report.config.policy.probability_threshold
    ));
    if report.config.policy.enable_short {
        md.push_str(&format!(
            "| Short threshold | {:.2} |\n",
            report.config.policy.short_threshold
        ));
    }
    md.push('\n');

    md.push_str("## Performance\n\n");
    md.push_str(&format_metrics_table(&report.metrics, report.out_of_sample.as_ref()));
    md.push('\n');

    md.push_str("## Signals\n\n");
    md.push_str(&format!("- Anomalies flagged: {}\n", report.diagnostics.outliers));
    md.push_str(&format!("- Alert days: {}\n", report.diagnostics.alerts));
    md.push_str(&format!(
        "- Long days: {}, short days: {}\n",
        report.metrics.long_days, report.metrics.short_days
    ));
    md.push('\n');

    if !report.diagnostics.feature_importances.is_empty() {
        md.push_str("## Feature Importances\n\n");
        md.push_str("| Feature | Importance |\n");
        md.push_str("| --- | --- |\n");
        for f in &report.diagnostics.feature_importances {
            md.push_str(&format!("| {} | {:.3} |\n", f.feature, f.importance));
        }
        md.push('\n');
    }

    md
}

fn format_metrics_table(all: &PerformanceMetrics, oos: Option<&PerformanceMetrics>) -> String {
    let mut md = String::new();
    let rows: [(&str, fn(&PerformanceMetrics) -> String); 7] = [
        ("Strategy Return", |m| format!("{:.2}%", m.cum_return * 100.0)),
        ("Buy & Hold Return", |m| format!("{:.2}%", m.buy_hold_return * 100.0)),
        ("Volatility", |m| format!("{:.2}%", m.volatility * 100.0)),
        ("Sharpe", |m| format!("{:.3}", m.sharpe)),
        ("Max Drawdown", |m| format!("{:.4}", m.max_drawdown)),
        ("Exposure", |m| format!("{:.1}%", m.exposure * 100.0)),
        ("Net Exposure", |m| format!("{:.1}%", m.net_exposure * 100.0)),
    ];

    match oos {
        None => {
            md.push_str("| Metric | Value |\n");
            md.push_str("| --- | --- |\n");
            for (name, fmt) in rows {
                md.push_str(&format!("| {} | {} |\n", name, fmt(all)));
            }
        }
        Some(oos) => {
            md.push_str("| Metric | Full Series | Out-of-Sample |\n");
            md.push_str("| --- | --- | --- |\n");
            for (name, fmt) in rows {
                md.push_str(&format!("| {} | {} | {} |\n", name, fmt(all), fmt(oos)));
            }
        }
    }
    md
}
