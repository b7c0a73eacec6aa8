use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, error::ErrorKind};

use crate::config::{NegativeStrategy, PipelineConfig, WindowSpec};
use crate::constants::candidates::DEFAULT_MAX_CANDIDATES;
use crate::constants::catalog::DEFAULT_MIN_FEATURE_SHARE;
use crate::constants::paths::DEFAULT_OUTPUT;
use crate::heuristics::format_u128_with_commas;
use crate::ingestion::InputPaths;
use crate::metrics::PipelineReport;
use crate::pipeline::{run_from_paths, write_report};

const DEFAULT_WINDOW_DAYS: u32 = 31;

#[derive(Debug, Parser)]
#[command(
    name = "rankprep",
    disable_help_subcommand = true,
    about = "Build a learning-to-rank training set from session logs",
    long_about = "Aggregate session views and purchases into per-window item statistics, filter categorical item metadata, sample negative candidates, and write one sparse ranked-learning line per (session, candidate) pair.",
    after_help = "Set RUST_LOG=rankprep=debug for per-window progress."
)]
/// CLI for `rankprep`.
///
/// Common usage:
/// - `rankprep --sessions train_sessions.csv --purchases train_purchases.csv --item-features item_features.csv`
/// - Add `--report run.json` to keep the run counters
/// - Add `--seed 7` to shuffle negatives instead of keeping the lowest item ids
struct BuildTrainingSetCli {
    #[arg(long, value_name = "PATH", help = "Session view log (session_id,item_id,date)")]
    sessions: PathBuf,
    #[arg(long, value_name = "PATH", help = "Purchase log (session_id,item_id,date)")]
    purchases: PathBuf,
    #[arg(
        long = "item-features",
        value_name = "PATH",
        help = "Item metadata log (item_id,feature_category_id,feature_value_id)"
    )]
    item_features: PathBuf,
    #[arg(
        long,
        value_name = "PATH",
        default_value = DEFAULT_OUTPUT,
        help = "Training output; truncated once at start"
    )]
    output: PathBuf,
    #[arg(long, value_name = "PATH", help = "Optional JSON run report")]
    report: Option<PathBuf>,
    #[arg(
        long = "max-candidates",
        default_value_t = DEFAULT_MAX_CANDIDATES,
        value_parser = parse_positive_usize,
        help = "Max candidates per session, purchased item included"
    )]
    max_candidates: usize,
    #[arg(
        long = "min-feature-share",
        default_value_t = DEFAULT_MIN_FEATURE_SHARE,
        value_parser = parse_share,
        help = "Keep categorical keys seen more often than this share of distinct items"
    )]
    min_feature_share: f64,
    #[arg(
        long = "window-days",
        default_value_t = DEFAULT_WINDOW_DAYS,
        value_parser = parse_positive_u32,
        help = "Window length in days, counted from 2020-01-01"
    )]
    window_days: u32,
    #[arg(long, help = "Shuffle negatives with this seed before capping")]
    seed: Option<u64>,
}

impl BuildTrainingSetCli {
    fn config(&self) -> PipelineConfig {
        PipelineConfig {
            window: WindowSpec::with_days(self.window_days),
            max_candidates: self.max_candidates,
            min_feature_share: self.min_feature_share,
            negative_strategy: self
                .seed
                .map(|seed| NegativeStrategy::SeededShuffle { seed })
                .unwrap_or_default(),
        }
    }
}

/// Parse arguments, run the pipeline, and print a summary.
///
/// Pipeline failures come back as an error naming the failed stage.
pub fn run_build_training_set<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let Some(cli) = parse_cli::<BuildTrainingSetCli, _>(
        std::iter::once("rankprep".to_string()).chain(args_iter),
    )?
    else {
        return Ok(());
    };

    let config = cli.config();
    let paths = InputPaths {
        sessions: cli.sessions.clone(),
        purchases: cli.purchases.clone(),
        item_features: cli.item_features.clone(),
    };

    let report = run_from_paths(&paths, &config, &cli.output)
        .map_err(|err| format!("{} stage failed: {}", err.stage(), err))?;
    if let Some(report_path) = &cli.report {
        write_report(&report, report_path)
            .map_err(|err| format!("{} stage failed: {}", err.stage(), err))?;
    }

    print_report(&report, &cli);
    Ok(())
}

fn print_report(report: &PipelineReport, cli: &BuildTrainingSetCli) {
    let count = |value: usize| format_u128_with_commas(value as u128);
    println!("=== training set ===");
    println!("output: {}", cli.output.display());
    if let Some(path) = &cli.report {
        println!("report: {}", path.display());
    }
    println!();
    println!("[INPUT]");
    println!("  session events    : {}", count(report.session_events));
    println!("  purchases         : {}", count(report.purchases));
    println!("  item feature rows : {}", count(report.item_feature_rows));
    println!();
    println!("[SESSIONS]");
    println!("  joined sessions   : {}", count(report.sessions_joined));
    println!("  windows           : {}", count(report.windows));
    if let Some(skew) = &report.window_skew {
        println!(
            "  sessions/window   : min={} max={} mean={:.1} (max/min {:.2})",
            count(skew.min),
            count(skew.max),
            skew.mean,
            skew.ratio
        );
    }
    println!();
    println!("[CATALOG]");
    println!("  distinct items    : {}", count(report.catalog.distinct_items));
    println!(
        "  keys kept         : {} of {} (threshold {:.2})",
        count(report.catalog.keys_kept),
        count(report.catalog.keys_seen),
        report.catalog.threshold
    );
    println!(
        "  items w/ features : {}",
        count(report.catalog.items_with_features)
    );
    println!();
    println!("[OUTPUT]");
    println!("  groups            : {}", count(report.groups_written));
    println!(
        "  lines             : {} (bound {})",
        count(report.lines_written),
        format_u128_with_commas(report.estimated_max_lines)
    );
    println!("  positives         : {}", count(report.positive_lines));
    println!("  time              : {:.2}s", report.elapsed_secs);
}

fn parse_positive_usize(raw: &str) -> Result<usize, String> {
    let parsed = raw
        .parse::<usize>()
        .map_err(|_| format!("Could not parse '{}' as a positive integer", raw))?;
    if parsed == 0 {
        return Err("value must be greater than zero".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u32(raw: &str) -> Result<u32, String> {
    let parsed = raw
        .parse::<u32>()
        .map_err(|_| format!("Could not parse '{}' as a positive integer", raw))?;
    if parsed == 0 {
        return Err("value must be greater than zero".to_string());
    }
    Ok(parsed)
}

fn parse_share(raw: &str) -> Result<f64, String> {
    let parsed = raw
        .parse::<f64>()
        .map_err(|_| format!("Could not parse '{}' as a number", raw))?;
    if !(0.0..=1.0).contains(&parsed) {
        return Err(format!("share must be within [0, 1], got {}", parsed));
    }
    Ok(parsed)
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}
