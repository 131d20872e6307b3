//! SentiLab CLI: run sentiment strategies and manage sentiment tables.
//!
//! Commands:
//! - `run`: execute the pipeline for one or more assets from a TOML config
//!   and/or flags
//! - `assets`: list assets with a sentiment table in the data directory
//! - `correlate`: sentiment vs price and return correlations
//! - `sentiment aggregate`: scored posts → daily sentiment table
//! - `sentiment merge-periods`: combine several daily sentiment tables

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use sentilab_core::data::{aggregate_daily, combine_periods, merge_series};
use sentilab_runner::data_loader::{load_scored_posts, write_sentiment};
use sentilab_runner::{
    load_sentiment, resolve_assets, run_assets, save_artifacts, AssetOutcome, AssetReport,
    CorrelationReport, InputLayout, RunConfig,
};

#[derive(Parser)]
#[command(
    name = "sentilab",
    about = "SentiLab CLI: sentiment-driven strategy backtesting"
)]
struct Cli {
    /// Debug-level logging (RUST_LOG takes precedence).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline for one or more assets.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Assets to run (e.g., SPY BTC). Defaults to the config, then discovery.
        #[arg(long = "asset")]
        assets: Vec<String>,

        /// Data directory holding the sentiment and price tables.
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Sentiment alert threshold in [-1, 1].
        #[arg(long, allow_hyphen_values = true)]
        sentiment_threshold: Option<f64>,

        /// Probability threshold in (0, 1).
        #[arg(long)]
        probability_threshold: Option<f64>,

        /// Ignore alerts when deciding long positions.
        #[arg(long, default_value_t = false)]
        no_alerts: bool,

        /// Enable the short leg.
        #[arg(long, default_value_t = false)]
        short: bool,

        /// Short when sentiment falls below this, in [-1, 0].
        #[arg(long, allow_hyphen_values = true)]
        short_threshold: Option<f64>,

        /// Hold out this many trailing days from classifier training.
        #[arg(long)]
        holdout_days: Option<usize>,

        /// Master random seed.
        #[arg(long)]
        seed: Option<u64>,

        /// First day of the study window (YYYY-MM-DD).
        #[arg(long)]
        start: Option<String>,

        /// Last day of the study window (YYYY-MM-DD).
        #[arg(long)]
        end: Option<String>,

        /// Write report.json, series.csv and report.md under this directory.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Print each report as JSON instead of a summary.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List assets that have a sentiment table in the data directory.
    Assets {
        /// Data directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },
    /// Correlation of sentiment with close price and daily return.
    Correlate {
        /// Asset to analyze.
        #[arg(long)]
        asset: String,

        /// Data directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },
    /// Daily sentiment table utilities.
    Sentiment {
        #[command(subcommand)]
        action: SentimentAction,
    },
}

#[derive(Subcommand)]
enum SentimentAction {
    /// Average scored posts (created_utc, sentiment) into one row per day.
    Aggregate {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
    /// Combine daily tables; earlier inputs win on overlapping dates.
    MergePeriods {
        /// Daily sentiment tables, in priority order.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        #[arg(long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            assets,
            data_dir,
            sentiment_threshold,
            probability_threshold,
            no_alerts,
            short,
            short_threshold,
            holdout_days,
            seed,
            start,
            end,
            output_dir,
            json,
        } => {
            let mut run_config = match &config {
                Some(path) => RunConfig::from_file(path)?,
                None => RunConfig::default(),
            };
            let overrides = Overrides {
                assets,
                data_dir,
                sentiment_threshold,
                probability_threshold,
                no_alerts,
                short,
                short_threshold,
                holdout_days,
                seed,
                start,
                end,
                output_dir,
            };
            overrides.apply(&mut run_config)?;
            run_cmd(&run_config, json)
        }
        Commands::Assets { data_dir } => run_assets_cmd(&data_dir),
        Commands::Correlate { asset, data_dir } => run_correlate_cmd(&asset, &data_dir),
        Commands::Sentiment { action } => match action {
            SentimentAction::Aggregate { input, output } => run_aggregate_cmd(&input, &output),
            SentimentAction::MergePeriods { inputs, output } => {
                run_merge_periods_cmd(&inputs, &output)
            }
        },
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// CLI flags that take precedence over the config file.
struct Overrides {
    assets: Vec<String>,
    data_dir: Option<PathBuf>,
    sentiment_threshold: Option<f64>,
    probability_threshold: Option<f64>,
    no_alerts: bool,
    short: bool,
    short_threshold: Option<f64>,
    holdout_days: Option<usize>,
    seed: Option<u64>,
    start: Option<String>,
    end: Option<String>,
    output_dir: Option<PathBuf>,
}

impl Overrides {
    fn apply(self, config: &mut RunConfig) -> Result<()> {
        if !self.assets.is_empty() {
            config.data.assets = self.assets;
        }
        if let Some(dir) = self.data_dir {
            config.data.dir = dir;
        }
        let pipeline = &mut config.pipeline;
        if let Some(v) = self.sentiment_threshold {
            pipeline.alerts.sentiment_threshold = v;
        }
        if let Some(v) = self.probability_threshold {
            pipeline.policy.probability_threshold = v;
        }
        if self.no_alerts {
            pipeline.policy.use_alerts = false;
        }
        if self.short {
            pipeline.policy.enable_short = true;
        }
        if let Some(v) = self.short_threshold {
            pipeline.policy.short_threshold = v;
        }
        if let Some(v) = self.holdout_days {
            pipeline.model.holdout_days = v;
        }
        if let Some(v) = self.seed {
            pipeline.model.seed = v;
        }
        if let Some(s) = self.start {
            pipeline.window.start = Some(parse_date_arg("--start", &s)?);
        }
        if let Some(s) = self.end {
            pipeline.window.end = Some(parse_date_arg("--end", &s)?);
        }
        if let Some(dir) = self.output_dir {
            config.output.dir = Some(dir);
        }
        config.validate()?;
        Ok(())
    }
}

fn parse_date_arg(flag: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("{flag} expects YYYY-MM-DD, got '{value}'"))
}

fn run_cmd(config: &RunConfig, json: bool) -> Result<()> {
    let assets = resolve_assets(config)?;
    debug!(count = assets.len(), dir = %config.data.dir.display(), "running assets");
    let outcomes = run_assets(config, &assets);

    let tally = present_outcomes(&outcomes, config.output.dir.as_deref(), json)?;
    if tally.run_failures == outcomes.len() {
        bail!("all {} asset run(s) failed", tally.run_failures);
    }
    if tally.artifact_failures > 0 {
        bail!("failed to save artifacts for {} asset(s)", tally.artifact_failures);
    }
    Ok(())
}

/// Failure counts from presenting a batch of outcomes.
#[derive(Debug, Default, PartialEq)]
struct BatchTally {
    run_failures: usize,
    artifact_failures: usize,
}

/// Print every outcome and save artifacts for the successful ones.
///
/// A failed run or artifact write is reported and the next asset still gets
/// its summary and artifacts.
fn present_outcomes(
    outcomes: &[AssetOutcome],
    output_dir: Option<&Path>,
    json: bool,
) -> Result<BatchTally> {
    let mut tally = BatchTally::default();
    for outcome in outcomes {
        match &outcome.result {
            Ok(report) => {
                if json {
                    println!("{}", serde_json::to_string_pretty(report)?);
                } else {
                    print_summary(report);
                }
                if let Some(dir) = output_dir {
                    match save_artifacts(report, dir) {
                        Ok(run_dir) => println!("Artifacts saved to: {}", run_dir.display()),
                        Err(err) => {
                            tally.artifact_failures += 1;
                            eprintln!("Failed to save artifacts for {}: {err:#}", outcome.asset);
                        }
                    }
                }
            }
            Err(err) => {
                tally.run_failures += 1;
                eprintln!("Error for {}: {err}", outcome.asset);
            }
        }
    }
    Ok(tally)
}

fn run_assets_cmd(data_dir: &Path) -> Result<()> {
    let config = RunConfig {
        data: sentilab_runner::DataConfig {
            dir: data_dir.to_path_buf(),
            ..Default::default()
        },
        ..Default::default()
    };
    let layout = InputLayout::from_config(&config.data);
    let assets = layout.discover_assets()?;
    if assets.is_empty() {
        println!("No sentiment tables found in {}", data_dir.display());
        return Ok(());
    }
    println!("{:<8} {:<8}", "Asset", "Prices");
    println!("{}", "-".repeat(17));
    for asset in &assets {
        let has_prices = layout.price_path(asset).is_file();
        println!("{:<8} {:<8}", asset, if has_prices { "yes" } else { "missing" });
    }
    Ok(())
}

fn run_correlate_cmd(asset: &str, data_dir: &Path) -> Result<()> {
    let config = RunConfig {
        data: sentilab_runner::DataConfig {
            dir: data_dir.to_path_buf(),
            ..Default::default()
        },
        ..Default::default()
    };
    let inputs = InputLayout::from_config(&config.data).load(asset)?;
    let merged = merge_series(
        asset,
        &inputs.sentiment.rows,
        &inputs.prices.rows,
        &config.pipeline.window,
    )?;
    let report = CorrelationReport::compute(&merged);

    println!();
    println!("=== Correlation: {} ({} days) ===", asset, merged.len());
    println!("{:<22} {:>10} {:>10}", "Pair", "r", "p-value");
    println!("{}", "-".repeat(44));
    for (name, pair) in [
        ("sentiment ~ close", &report.sentiment_vs_close),
        ("sentiment ~ return", &report.sentiment_vs_return),
    ] {
        println!(
            "{:<22} {:>10.4} {:>10.4}   (Pearson)",
            name, pair.pearson.coefficient, pair.pearson.p_value
        );
        println!(
            "{:<22} {:>10.4} {:>10.4}   (Spearman)",
            "", pair.spearman.coefficient, pair.spearman.p_value
        );
    }
    Ok(())
}

fn run_aggregate_cmd(input: &Path, output: &Path) -> Result<()> {
    let posts = load_scored_posts(input)?;
    let daily = aggregate_daily(&posts.rows);
    write_sentiment(output, &daily)?;
    println!(
        "{} days of sentiment from {} posts saved to {}",
        daily.len(),
        posts.rows.len(),
        output.display()
    );
    Ok(())
}

fn run_merge_periods_cmd(inputs: &[PathBuf], output: &Path) -> Result<()> {
    let mut tables = Vec::with_capacity(inputs.len());
    for path in inputs {
        tables.push(load_sentiment(path)?.rows);
    }
    let combined = combine_periods(&tables);
    if combined.is_empty() {
        bail!("no sentiment rows in {} input file(s)", inputs.len());
    }
    write_sentiment(output, &combined)?;
    println!(
        "{} days ({} to {}) saved to {}",
        combined.len(),
        combined[0].date,
        combined[combined.len() - 1].date,
        output.display()
    );
    Ok(())
}

fn print_summary(report: &AssetReport) {
    let m = &report.metrics;
    println!();
    println!("=== Sentiment Strategy: {} ===", report.asset);
    if let (Some(first), Some(last)) = (report.series.rows.first(), report.series.rows.last()) {
        println!("Period:         {} to {}", first.date, last.date);
    }
    println!("Days:           {}", m.days);
    println!("Policy:         {}", report.policy.label());
    println!("Run:            {}", report.fingerprint.short());
    println!();
    println!("--- Performance ---");
    println!("Strategy:       {:.2}%", m.cum_return * 100.0);
    println!("Buy & Hold:     {:.2}%", m.buy_hold_return * 100.0);
    println!("Volatility:     {:.2}%", m.volatility * 100.0);
    println!("Sharpe:         {:.3}", m.sharpe);
    println!("Max Drawdown:   {:.4}", m.max_drawdown);
    println!("Exposure:       {:.1}%", m.exposure * 100.0);
    println!("Net Exposure:   {:.1}%", m.net_exposure * 100.0);
    println!("Long/Short:     {} / {}", m.long_days, m.short_days);
    println!(
        "Alerts:         {} ({} anomalies)",
        report.diagnostics.alerts, report.diagnostics.outliers
    );
    match &report.out_of_sample {
        Some(oos) => {
            println!();
            println!("--- Out-of-Sample ({} days) ---", oos.days);
            println!("Strategy:       {:.2}%", oos.cum_return * 100.0);
            println!("Buy & Hold:     {:.2}%", oos.buy_hold_return * 100.0);
            println!("Sharpe:         {:.3}", oos.sharpe);
        }
        None => {
            println!();
            println!("NOTE: classifier fit in-sample; metrics reflect fit, not prediction");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentilab_core::domain::{PriceRow, SentimentRow};
    use sentilab_core::PipelineConfig;
    use sentilab_runner::{run_asset_from_data, RunError};
    use tempfile::TempDir;

    fn report(asset: &str) -> AssetReport {
        let start = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();
        let mut close = 80.0;
        let mut sentiment = Vec::new();
        let mut prices = Vec::new();
        for i in 0..40 {
            let date = start + chrono::Days::new(i);
            close *= 1.0 + (((i * 5) % 9) as f64 - 4.0) / 250.0;
            sentiment.push(SentimentRow {
                date,
                avg_sentiment: ((i * 7) % 13) as f64 / 6.5 - 1.0,
            });
            prices.push(PriceRow { date, close });
        }
        run_asset_from_data(asset, &sentiment, &prices, &PipelineConfig::default()).unwrap()
    }

    #[test]
    fn artifact_failure_does_not_stop_later_assets() {
        let out = TempDir::new().unwrap();
        let blocked = report("AAA");
        let ok = report("BBB");
        // A plain file where the first asset's artifact directory would go
        let blocked_dir = out
            .path()
            .join(format!("AAA_{}", blocked.fingerprint.short()));
        std::fs::write(&blocked_dir, "not a directory").unwrap();

        let outcomes = vec![
            AssetOutcome {
                asset: "AAA".into(),
                result: Ok(blocked),
            },
            AssetOutcome {
                asset: "ZZZ".into(),
                result: Err(RunError::NoAssets("data".into())),
            },
            AssetOutcome {
                asset: "BBB".into(),
                result: Ok(ok.clone()),
            },
        ];

        let tally = present_outcomes(&outcomes, Some(out.path()), true).unwrap();
        assert_eq!(
            tally,
            BatchTally {
                run_failures: 1,
                artifact_failures: 1,
            }
        );
        let saved = out.path().join(format!("BBB_{}", ok.fingerprint.short()));
        assert!(saved.join("report.json").is_file());
        assert!(saved.join("report.md").is_file());
    }

    #[test]
    fn without_output_dir_nothing_is_written() {
        let outcomes = vec![AssetOutcome {
            asset: "BBB".into(),
            result: Ok(report("BBB")),
        }];
        let tally = present_outcomes(&outcomes, None, true).unwrap();
        assert_eq!(tally, BatchTally::default());
    }
}
