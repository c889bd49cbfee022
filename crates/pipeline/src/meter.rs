use std::time::Instant;

use tracing::info;

/// Counts loop ticks and logs the rate every `report_every` ticks.
#[derive(Debug)]
pub struct TickMeter {
    stage: &'static str,
    report_every: u64,
    ticks: u64,
    window_start: Instant,
}

impl TickMeter {
    pub fn new(stage: &'static str, report_every: u64, now: Instant) -> Self {
        Self {
            stage,
            report_every,
            ticks: 0,
            window_start: now,
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Records one tick; returns the measured rate when a report is due.
    pub fn tick(&mut self, now: Instant) -> Option<f64> {
        self.ticks = self.ticks.saturating_add(1);
        if self.report_every == 0 || self.ticks % self.report_every != 0 {
            return None;
        }

        let elapsed = now
            .saturating_duration_since(self.window_start)
            .as_secs_f64();
        self.window_start = now;
        let rate = if elapsed > 0.0 {
            self.report_every as f64 / elapsed
        } else {
            f64::INFINITY
        };
        info!(
            stage = self.stage,
            fps = format_args!("{rate:.1}"),
            ticks = self.ticks,
            "loop throughput"
        );
        Some(rate)
    }
}
