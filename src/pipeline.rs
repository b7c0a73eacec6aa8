use std::path::Path;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::candidates::CandidatePool;
use crate::catalog::FeatureCatalog;
use crate::config::PipelineConfig;
use crate::data::SessionSummary;
use crate::encoder::WindowEncoder;
use crate::errors::PipelineError;
use crate::heuristics::{window_item_count, window_line_upper_bound};
use crate::ingestion::{InputPaths, RawInputs, load_inputs};
use crate::item_stats::ItemStatsTable;
use crate::metrics::{PipelineReport, window_skew};
use crate::sessions::{SessionWindows, aggregate_sessions};
use crate::transport::{FileLineSink, LineSink};
use crate::types::{EncodedLine, WindowKey};

/// Everything needed to encode one window, built before any line is written.
#[derive(Clone, Debug)]
pub struct WindowPlan {
    pub key: WindowKey,
    /// Sessions in ascending session id.
    pub sessions: Vec<SessionSummary>,
    pub stats: ItemStatsTable,
    pub pool: CandidatePool,
}

/// Build item statistics and candidate pools for every window in parallel.
///
/// Plans are returned in ascending window order.
pub fn plan_windows(windows: SessionWindows) -> Vec<WindowPlan> {
    windows
        .into_windows()
        .into_par_iter()
        .map(|(key, sessions)| {
            let stats = ItemStatsTable::build(key, &sessions);
            let pool = CandidatePool::from_sessions(&sessions);
            WindowPlan {
                key,
                sessions,
                stats,
                pool,
            }
        })
        .collect()
}

/// Encode one window. Sessions are encoded in parallel, each into its own
/// buffer, and concatenated in session order.
pub fn encode_window(
    plan: &WindowPlan,
    catalog: &FeatureCatalog,
    config: &PipelineConfig,
) -> Result<Vec<EncodedLine>, PipelineError> {
    let encoder = WindowEncoder {
        stats: &plan.stats,
        pool: &plan.pool,
        catalog,
        max_candidates: config.max_candidates,
        negative_strategy: config.negative_strategy,
    };
    let per_session: Vec<Vec<EncodedLine>> = plan
        .sessions
        .par_iter()
        .map(|session| {
            encoder.encode_session(session).map(|lines| {
                lines
                    .into_iter()
                    .map(|line| line.to_string())
                    .collect::<Vec<_>>()
            })
        })
        .collect::<Result<_, _>>()?;
    Ok(per_session.into_iter().flatten().collect())
}

/// Run the whole transform over decoded inputs, writing windows to `sink` in
/// ascending window order.
pub fn run_pipeline<S>(
    inputs: &RawInputs,
    config: &PipelineConfig,
    sink: &mut S,
) -> Result<PipelineReport, PipelineError>
where
    S: LineSink + ?Sized,
{
    config.validate()?;
    let started = Instant::now();

    let (windows, catalog) = rayon::join(
        || aggregate_sessions(&inputs.sessions, &inputs.purchases, &config.window),
        || FeatureCatalog::build(&inputs.item_features, config.min_feature_share),
    );
    let windows = windows?;

    let mut report = PipelineReport {
        session_events: inputs.sessions.len(),
        purchases: inputs.purchases.len(),
        item_feature_rows: inputs.item_features.len(),
        sessions_joined: windows.session_count(),
        windows: windows.window_count(),
        catalog: catalog.stats(),
        ..PipelineReport::default()
    };

    let plans = plan_windows(windows);
    let counts: Vec<(WindowKey, usize)> = plans
        .iter()
        .map(|plan| (plan.key, plan.sessions.len()))
        .collect();
    report.window_skew = window_skew(&counts);
    report.estimated_max_lines = plans
        .iter()
        .map(|plan| window_line_upper_bound(&plan.sessions, &plan.pool, config.max_candidates))
        .sum();
    info!(
        "[rankprep:pipeline] planned {} windows ({} item caches, {} candidate pools)",
        plans.len(),
        plans.iter().map(|plan| plan.stats.len()).sum::<usize>(),
        plans.iter().map(|plan| plan.pool.len()).sum::<usize>()
    );

    for plan in &plans {
        let window_started = Instant::now();
        let lines = encode_window(plan, &catalog, config)?;
        sink.write_window(&lines)?;
        report.groups_written += plan.sessions.len();
        report.lines_written += lines.len();
        report.positive_lines += plan.sessions.len();
        debug!(
            "[rankprep:pipeline] window {}: {} sessions, {} items, {} pool, {} lines in {:.2}s",
            plan.key,
            plan.sessions.len(),
            window_item_count(&plan.sessions),
            plan.pool.len(),
            lines.len(),
            window_started.elapsed().as_secs_f64()
        );
    }
    sink.finish()?;

    report.elapsed_secs = started.elapsed().as_secs_f64();
    info!(
        "[rankprep:pipeline] wrote {} lines for {} groups in {:.2}s",
        report.lines_written, report.groups_written, report.elapsed_secs
    );
    Ok(report)
}

/// Load the three logs, then run the pipeline into a freshly truncated file.
pub fn run_from_paths(
    paths: &InputPaths,
    config: &PipelineConfig,
    output: &Path,
) -> Result<PipelineReport, PipelineError> {
    config.validate()?;
    let inputs = load_inputs(paths)?;
    let mut sink = FileLineSink::create(output)?;
    info!("[rankprep:pipeline] writing training lines to {}", output.display());
    run_pipeline(&inputs, config, &mut sink)
}

/// Write `report` as pretty JSON.
pub fn write_report(report: &PipelineReport, path: &Path) -> Result<(), PipelineError> {
    let payload = serde_json::to_string_pretty(report)?;
    std::fs::write(path, payload)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::windows::{DEFAULT_EPOCH_MS, DEFAULT_WINDOW_LENGTH_MS};
    use crate::data::{ItemFeatureRow, RawEvent};

    fn event(session_id: i64, item_id: i64, offset_ms: i64) -> RawEvent {
        RawEvent {
            session_id,
            item_id,
            timestamp: DEFAULT_EPOCH_MS + offset_ms,
        }
    }

    fn two_window_inputs() -> RawInputs {
        let later = DEFAULT_WINDOW_LENGTH_MS + 1_000;
        RawInputs {
            sessions: vec![
                event(1, 10, 0),
                event(1, 11, 60_000),
                event(2, 12, 0),
                event(3, 10, later),
                event(4, 13, later),
            ],
            purchases: vec![
                event(1, 20, 120_000),
                event(2, 21, 1_000),
                event(3, 22, later + 10),
                event(4, 23, later + 10),
            ],
            item_features: vec![ItemFeatureRow {
                item_id: 20,
                category: 1,
                value: 1,
            }],
        }
    }

    #[test]
    fn every_window_reaches_the_sink() {
        let mut sink: Vec<EncodedLine> = Vec::new();
        let report = run_pipeline(&two_window_inputs(), &PipelineConfig::default(), &mut sink).unwrap();

        assert_eq!(report.windows, 2);
        assert_eq!(report.sessions_joined, 4);
        assert_eq!(report.groups_written, 4);
        // Each window pool has two targets, so every session gets one negative.
        assert_eq!(report.lines_written, 8);
        assert_eq!(sink.len(), 8);
        assert_eq!(report.positive_lines, 4);
        assert_eq!(report.estimated_max_lines, 8);

        let groups: Vec<&str> = sink
            .iter()
            .map(|line| line.split_whitespace().nth(1).unwrap())
            .collect();
        assert_eq!(
            groups,
            vec![
                "qid:1", "qid:1", "qid:2", "qid:2", "qid:3", "qid:3", "qid:4", "qid:4"
            ]
        );
    }

    #[test]
    fn rerun_is_identical() {
        let inputs = two_window_inputs();
        let mut first: Vec<EncodedLine> = Vec::new();
        let mut second: Vec<EncodedLine> = Vec::new();
        run_pipeline(&inputs, &PipelineConfig::default(), &mut first).unwrap();
        run_pipeline(&inputs, &PipelineConfig::default(), &mut second).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn invalid_config_fails_before_work() {
        let config = PipelineConfig {
            max_candidates: 0,
            ..PipelineConfig::default()
        };
        let mut sink: Vec<EncodedLine> = Vec::new();
        let err = run_pipeline(&two_window_inputs(), &config, &mut sink).unwrap_err();
        assert_eq!(err.stage(), "configuration");
        assert!(sink.is_empty());
    }
}
