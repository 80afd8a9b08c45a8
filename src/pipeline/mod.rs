//! Drives a stream through a detector into a sink.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use crate::detect::ZScoreDetector;
use crate::sink::{Classified, Sink, SinkControl};
use crate::stream::DataPoint;

/// How the detector treats NaN / infinite input during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NonFinitePolicy {
    /// Feed it to the detector; it is never flagged.
    #[default]
    PassThrough,
    /// Abort the run with an error.
    Reject,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Pause between points. `None` runs flat out.
    pub pacing: Option<Duration>,
    pub non_finite: NonFinitePolicy,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub points: u64,
    pub anomalies: u64,
    pub warmup_points: u64,
    pub last_time: Option<u64>,
}

impl RunSummary {
    /// Share of scored points (outside warm-up) that were flagged.
    pub fn anomaly_rate(&self) -> f64 {
        let scored = self.points.saturating_sub(self.warmup_points);
        if scored == 0 {
            return 0.0;
        }
        self.anomalies as f64 / scored as f64
    }
}

/// Pull points from `source`, classify each with `detector`, hand them to
/// `sink` until it says stop or the source runs dry.
pub async fn run_stream<I, S>(
    source: I,
    detector: &mut ZScoreDetector,
    sink: &mut S,
    options: RunOptions,
) -> Result<RunSummary>
where
    I: IntoIterator<Item = DataPoint>,
    S: Sink + ?Sized,
{
    try_run_stream(source.into_iter().map(Ok), detector, sink, options).await
}

/// Like [`run_stream`] for sources that can fail mid-stream. Points before
/// the failing item have already reached the sink when the error returns.
pub async fn try_run_stream<I, S>(
    source: I,
    detector: &mut ZScoreDetector,
    sink: &mut S,
    options: RunOptions,
) -> Result<RunSummary>
where
    I: IntoIterator<Item = Result<DataPoint>>,
    S: Sink + ?Sized,
{
    let run_id = Uuid::new_v4();
    let span = info_span!("run", %run_id);

    async move {
        let started_at = Utc::now();
        info!(
            window_size = detector.window_size(),
            threshold = detector.threshold(),
            "stream run started"
        );

        let mut ticker = options.pacing.map(tokio::time::interval);
        let mut summary = RunSummary {
            run_id,
            started_at,
            finished_at: started_at,
            points: 0,
            anomalies: 0,
            warmup_points: 0,
            last_time: None,
        };

        for item in source {
            let point = item?;
            if let Some(ticker) = ticker.as_mut() {
                ticker.tick().await;
            }

            let warming_up = detector.len() + 1 < detector.window_size();
            let verdict = match options.non_finite {
                NonFinitePolicy::PassThrough => detector.update(point.value),
                NonFinitePolicy::Reject => detector
                    .checked_update(point.value)
                    .with_context(|| format!("rejected input at time {}", point.time))?,
            };

            summary.points += 1;
            summary.last_time = Some(point.time);
            if warming_up {
                summary.warmup_points += 1;
            }
            if verdict.is_anomaly {
                summary.anomalies += 1;
            }

            let classified = Classified::new(point, verdict);
            if sink.consume(&classified)? == SinkControl::Stop {
                debug!(time = point.time, "sink requested stop");
                break;
            }
        }

        summary.finished_at = Utc::now();
        info!(
            points = summary.points,
            anomalies = summary.anomalies,
            "stream run finished"
        );
        Ok::<_, anyhow::Error>(summary)
    }
    .instrument(span)
    .await
}
