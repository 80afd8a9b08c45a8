//! streamwatch -- sliding-window Z-score anomaly flags for numeric streams.
//!
//! This crate provides the detector, a synthetic seasonal data source, output
//! sinks, and the loop that drives a stream through them.

pub mod config;
pub mod detect;
pub mod logging;
pub mod pipeline;
pub mod sink;
pub mod stream;

use std::io::{BufRead, Write};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::config::AppConfig;
use crate::detect::ZScoreDetector;
use crate::pipeline::{NonFinitePolicy, RunOptions, RunSummary};
use crate::sink::{Classified, ConsoleSink, HistorySink, Tee};
use crate::stream::{DataPoint, StreamSource};

/// Summary of a synthetic run plus the most recent points it produced.
#[derive(Debug)]
pub struct RunReport {
    pub summary: RunSummary,
    pub recent: Vec<Classified>,
}

fn run_options(config: &AppConfig) -> RunOptions {
    let interval_ms = config.sink.interval_ms;
    RunOptions {
        pacing: (interval_ms > 0).then(|| Duration::from_millis(interval_ms)),
        non_finite: if config.detector.reject_non_finite {
            NonFinitePolicy::Reject
        } else {
            NonFinitePolicy::PassThrough
        },
    }
}

/// Run the synthetic stream described by `config`, writing each classified
/// point to `out`.
pub async fn run<W: Write>(config: &AppConfig, out: W) -> Result<RunReport> {
    config.validate().context("invalid configuration")?;

    let source = StreamSource::new(config.source.clone())?;
    let mut detector = ZScoreDetector::from_config(&config.detector)?;
    let console = ConsoleSink::new(out, config.sink.format, config.sink.max_time);
    let history = HistorySink::new(config.sink.history, config.sink.max_time);
    let mut sink = Tee::new(console, history);

    tracing::info!(seed = ?config.source.seed, "starting synthetic stream");
    let summary =
        pipeline::run_stream(source, &mut detector, &mut sink, run_options(config)).await?;

    let (_, history) = sink.into_parts();
    Ok(RunReport {
        summary,
        recent: history.points().copied().collect(),
    })
}

/// Lazily parse one number per line, skipping blank lines and `#` comments.
///
/// Points are numbered in order of the values, not of the lines. A read or
/// parse failure is yielded in place, after every earlier value.
pub fn read_points<R: BufRead>(reader: R) -> impl Iterator<Item = Result<DataPoint>> {
    let mut time = 0u64;
    reader
        .lines()
        .enumerate()
        .filter_map(move |(idx, line)| {
            let line = match line.context("failed to read input") {
                Ok(line) => line,
                Err(e) => return Some(Err(e)),
            };
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                return None;
            }
            let parsed = trimmed
                .parse::<f64>()
                .with_context(|| format!("line {}: not a number: {:?}", idx + 1, trimmed));
            Some(parsed.map(|value| {
                let point = DataPoint { time, value };
                time += 1;
                point
            }))
        })
}

/// Classify every value read from `input`, writing one line per value to `out`.
pub async fn score<R: BufRead, W: Write>(
    input: R,
    out: W,
    config: &AppConfig,
) -> Result<RunSummary> {
    config.detector.validate().context("invalid detector configuration")?;

    let mut detector = ZScoreDetector::from_config(&config.detector)?;
    let mut sink = ConsoleSink::new(out, config.sink.format, u64::MAX);
    let options = RunOptions {
        pacing: None,
        ..run_options(config)
    };

    pipeline::try_run_stream(read_points(input), &mut detector, &mut sink, options).await
}
