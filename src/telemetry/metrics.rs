//! Frame processing metrics
//!
//! `FrameProfiler` keeps the last few hundred composited frames: when each
//! finished and how long detection plus composition took. Status endpoints
//! read summary statistics from it.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::Serialize;

/// Ten seconds of samples at 30fps
const DEFAULT_WINDOW: usize = 300;

/// Processing-time summary in milliseconds
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameStats {
    pub avg_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub p95_ms: f64,
    /// Frames the figures are computed from
    pub sample_count: usize,
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    finished: Instant,
    elapsed: Duration,
}

/// Rolling frame-time window shared by all connections
#[derive(Debug)]
pub struct FrameProfiler {
    window: VecDeque<Sample>,
    window_size: usize,
    composited: u64,
    undecodable: u64,
}

impl Default for FrameProfiler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameProfiler {
    pub fn new() -> Self {
        Self::with_window(DEFAULT_WINDOW)
    }

    pub fn with_window(window_size: usize) -> Self {
        let window_size = window_size.max(1);
        Self {
            window: VecDeque::with_capacity(window_size),
            window_size,
            composited: 0,
            undecodable: 0,
        }
    }

    /// Record one composited frame
    pub fn record(&mut self, elapsed: Duration) {
        if self.window.len() == self.window_size {
            self.window.pop_front();
        }
        self.window.push_back(Sample {
            finished: Instant::now(),
            elapsed,
        });
        self.composited += 1;
    }

    /// Count a payload that could not be decoded
    pub fn record_undecodable(&mut self) {
        self.undecodable += 1;
    }

    /// Frames composited since startup
    pub fn total_frames(&self) -> u64 {
        self.composited
    }

    pub fn undecodable_frames(&self) -> u64 {
        self.undecodable
    }

    pub fn stats(&self) -> FrameStats {
        let mut millis: Vec<f64> = self
            .window
            .iter()
            .map(|s| s.elapsed.as_secs_f64() * 1000.0)
            .collect();
        if millis.is_empty() {
            return FrameStats::default();
        }

        let (min_ms, max_ms, sum) = millis.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, 0.0),
            |(lo, hi, sum), &ms| (lo.min(ms), hi.max(ms), sum + ms),
        );
        let count = millis.len();
        let rank = nearest_rank(count, 0.95);
        let (_, p95_ms, _) = millis.select_nth_unstable_by(rank, f64::total_cmp);

        FrameStats {
            avg_ms: sum / count as f64,
            min_ms,
            max_ms,
            p95_ms: *p95_ms,
            sample_count: count,
        }
    }

    /// Completed frames per second across the window
    pub fn fps(&self) -> f64 {
        match (self.window.front(), self.window.back()) {
            (Some(first), Some(last)) if self.window.len() > 1 => {
                let span = last.finished.duration_since(first.finished).as_secs_f64();
                if span > 0.0 {
                    (self.window.len() - 1) as f64 / span
                } else {
                    0.0
                }
            }
            _ => 0.0,
        }
    }
}

/// Zero-based index of the `p` quantile among `count` ordered values
fn nearest_rank(count: usize, p: f64) -> usize {
    (((count - 1) as f64) * p) as usize
}
