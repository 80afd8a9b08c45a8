//! Consumers of classified points.
//!
//! A sink renders or records each point and owns the decision to end the run.

use std::collections::VecDeque;
use std::io::Write;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::OutputFormat;
use crate::detect::Verdict;
use crate::stream::DataPoint;

/// A stream point together with its classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classified {
    pub time: u64,
    pub value: f64,
    pub is_anomaly: bool,
    pub z_score: f64,
}

impl Classified {
    pub fn new(point: DataPoint, verdict: Verdict) -> Self {
        Self {
            time: point.time,
            value: point.value,
            is_anomaly: verdict.is_anomaly,
            z_score: verdict.z_score,
        }
    }
}

/// What the driver should do after a sink consumed a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkControl {
    Continue,
    Stop,
}

pub trait Sink {
    fn consume(&mut self, point: &Classified) -> Result<SinkControl>;
}

/// The point is consumed first; the run ends once its time exceeds `max_time`.
fn control_for(time: u64, max_time: u64) -> SinkControl {
    if time > max_time {
        SinkControl::Stop
    } else {
        SinkControl::Continue
    }
}

// ---------------------------------------------------------------------------
// Console
// ---------------------------------------------------------------------------

/// Writes one line per point, as plain text or JSON.
///
/// Values are printed at full precision (shortest round-trip form).
pub struct ConsoleSink<W: Write> {
    out: W,
    format: OutputFormat,
    max_time: u64,
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W, format: OutputFormat, max_time: u64) -> Self {
        Self {
            out,
            format,
            max_time,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Sink for ConsoleSink<W> {
    fn consume(&mut self, point: &Classified) -> Result<SinkControl> {
        let written = match self.format {
            OutputFormat::Text => writeln!(
                self.out,
                "Time: {}, Value: {:?}, Is Anomaly: {}",
                point.time, point.value, point.is_anomaly
            ),
            OutputFormat::Json => {
                let line = serde_json::to_string(point)?;
                writeln!(self.out, "{}", line)
            }
        };
        written.context("failed to write classified point")?;

        if point.is_anomaly {
            warn!(
                time = point.time,
                value = point.value,
                z_score = point.z_score,
                "anomaly detected"
            );
        }

        Ok(control_for(point.time, self.max_time))
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// Keeps the most recent points for rendering a scrolling view.
#[derive(Debug, Clone)]
pub struct HistorySink {
    points: VecDeque<Classified>,
    max_points: usize,
    max_time: u64,
}

impl HistorySink {
    pub fn new(max_points: usize, max_time: u64) -> Self {
        Self {
            points: VecDeque::with_capacity(max_points),
            max_points,
            max_time,
        }
    }

    pub fn points(&self) -> impl Iterator<Item = &Classified> + '_ {
        self.points.iter()
    }

    pub fn anomalies(&self) -> impl Iterator<Item = &Classified> + '_ {
        self.points.iter().filter(|p| p.is_anomaly)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl Sink for HistorySink {
    fn consume(&mut self, point: &Classified) -> Result<SinkControl> {
        if self.max_points > 0 {
            if self.points.len() == self.max_points {
                self.points.pop_front();
            }
            self.points.push_back(*point);
        }
        Ok(control_for(point.time, self.max_time))
    }
}

/// Fans each point out to two sinks; stops when either asks to.
pub struct Tee<A, B> {
    first: A,
    second: B,
}

impl<A: Sink, B: Sink> Tee<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }

    pub fn into_parts(self) -> (A, B) {
        (self.first, self.second)
    }
}

impl<A: Sink, B: Sink> Sink for Tee<A, B> {
    fn consume(&mut self, point: &Classified) -> Result<SinkControl> {
        let a = self.first.consume(point)?;
        let b = self.second.consume(point)?;
        if a == SinkControl::Stop || b == SinkControl::Stop {
            Ok(SinkControl::Stop)
        } else {
            Ok(SinkControl::Continue)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(time: u64, value: f64, is_anomaly: bool) -> Classified {
        Classified {
            time,
            value,
            is_anomaly,
            z_score: if is_anomaly { 3.0 } else { 0.5 },
        }
    }

    #[test]
    fn test_console_text_line() {
        let mut sink = ConsoleSink::new(Vec::new(), OutputFormat::Text, 10);
        sink.consume(&point(3, 101.5, true)).unwrap();
        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(out, "Time: 3, Value: 101.5, Is Anomaly: true\n");
    }

    #[test]
    fn test_console_text_keeps_full_precision() {
        let mut sink = ConsoleSink::new(Vec::new(), OutputFormat::Text, 10);
        sink.consume(&point(0, 97.123456789012, false)).unwrap();
        sink.consume(&point(1, 100.0, false)).unwrap();
        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert!(out.contains("Value: 97.123456789012,"));
        assert!(out.contains("Value: 100.0,"));
    }

    #[test]
    fn test_console_json_line() {
        let mut sink = ConsoleSink::new(Vec::new(), OutputFormat::Json, 10);
        sink.consume(&point(4, 99.0, false)).unwrap();
        let out = String::from_utf8(sink.into_inner()).unwrap();
        let parsed: Classified = serde_json::from_str(out.trim()).unwrap();
        assert_eq!(parsed, point(4, 99.0, false));
    }

    #[test]
    fn test_stops_only_after_max_time_exceeded() {
        let mut sink = HistorySink::new(10, 5);
        assert_eq!(sink.consume(&point(5, 1.0, false)).unwrap(), SinkControl::Continue);
        assert_eq!(sink.consume(&point(6, 1.0, false)).unwrap(), SinkControl::Stop);
        // The stopping point itself was consumed.
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut sink = HistorySink::new(3, 100);
        for t in 0..10 {
            sink.consume(&point(t, t as f64, t == 8)).unwrap();
        }
        let times: Vec<u64> = sink.points().map(|p| p.time).collect();
        assert_eq!(times, vec![7, 8, 9]);
        assert_eq!(sink.anomalies().count(), 1);
    }

    #[test]
    fn test_tee_stops_when_either_stops() {
        let mut tee = Tee::new(HistorySink::new(5, 2), HistorySink::new(5, 100));
        assert_eq!(tee.consume(&point(2, 0.0, false)).unwrap(), SinkControl::Continue);
        assert_eq!(tee.consume(&point(3, 0.0, false)).unwrap(), SinkControl::Stop);
        let (a, b) = tee.into_parts();
        assert_eq!(a.len(), 2);
        assert_eq!(b.len(), 2);
    }
}
