//! Channel-usage heatmap and collision graph collection
//!
//! Counts are bucketed into fixed windows of steps so long runs stay small.

use marl_core::{RunSummary, StatisticsSink, StepReport};
use serde::{Deserialize, Serialize};

/// Default bucket width in steps
pub const DEFAULT_WINDOW: u64 = 100;

/// Per-window channel histogram and per-agent collision counts
#[derive(Debug, Clone)]
pub struct HeatmapRecorder {
    num_channels: usize,
    window: u64,
    /// One row per finished window, one column per channel
    pub channel_histogram: Vec<Vec<u32>>,
    /// One row per finished window, one column per agent
    pub collisions: Vec<Vec<u32>>,
    current_channels: Vec<u32>,
    current_collisions: Vec<u32>,
    steps_in_window: u64,
    summary: Option<RunSummary>,
}

/// Full heatmap export format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeatmapExport {
    pub scenario: String,
    pub window: u64,
    pub channel_histogram: Vec<Vec<u32>>,
    pub collisions: Vec<Vec<u32>>,
    pub summary: Option<RunSummary>,
}

impl HeatmapRecorder {
    pub fn new(num_channels: usize, window: u64) -> Self {
        Self {
            num_channels,
            window: window.max(1),
            channel_histogram: Vec::new(),
            collisions: Vec::new(),
            current_channels: vec![0; num_channels],
            current_collisions: Vec::new(),
            steps_in_window: 0,
            summary: None,
        }
    }

    fn flush(&mut self) {
        if self.steps_in_window == 0 {
            return;
        }
        self.channel_histogram.push(std::mem::replace(
            &mut self.current_channels,
            vec![0; self.num_channels],
        ));
        let agents = self.current_collisions.len();
        self.collisions.push(std::mem::replace(
            &mut self.current_collisions,
            vec![0; agents],
        ));
        self.steps_in_window = 0;
    }

    /// Export as JSON string
    pub fn export_json(&self, scenario: &str) -> String {
        let export = HeatmapExport {
            scenario: scenario.to_string(),
            window: self.window,
            channel_histogram: self.channel_histogram.clone(),
            collisions: self.collisions.clone(),
            summary: self.summary.clone(),
        };
        serde_json::to_string_pretty(&export).unwrap_or_else(|_| "{}".to_string())
    }

    /// Export the channel histogram as CSV, one row per window
    pub fn export_csv(&self) -> String {
        let mut csv = String::from("window");
        for ch in 1..=self.num_channels {
            csv.push_str(&format!(",ch{}", ch));
        }
        csv.push('\n');
        for (i, row) in self.channel_histogram.iter().enumerate() {
            csv.push_str(&i.to_string());
            for count in row {
                csv.push_str(&format!(",{}", count));
            }
            csv.push('\n');
        }
        csv
    }
}

impl StatisticsSink for HeatmapRecorder {
    fn on_step(&mut self, report: &StepReport<'_>) {
        if self.current_collisions.len() != report.hits.len() {
            self.current_collisions = vec![0; report.hits.len()];
        }
        for &ch in report.channels {
            let slot = (ch as usize)
                .checked_sub(1)
                .and_then(|i| self.current_channels.get_mut(i));
            if let Some(slot) = slot {
                *slot += 1;
            }
        }
        for (agent, &hits) in report.hits.iter().enumerate() {
            if hits > 0 {
                self.current_collisions[agent] += 1;
            }
        }

        self.steps_in_window += 1;
        if report.step % self.window == 0 {
            self.flush();
        }
    }

    fn on_finish(&mut self, summary: &RunSummary) {
        self.flush();
        self.summary = Some(summary.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report<'a>(step: u64, channels: &'a [u8], hits: &'a [u32]) -> StepReport<'a> {
        StepReport {
            step,
            channels,
            hits,
            totals: &[],
            wifi_window: false,
        }
    }

    #[test]
    fn test_windows() {
        let mut rec = HeatmapRecorder::new(5, 2);
        rec.on_step(&report(1, &[1, 1], &[1, 1]));
        rec.on_step(&report(2, &[2, 5], &[0, 0]));
        rec.on_step(&report(3, &[3, 4], &[0, 2]));
        assert_eq!(rec.channel_histogram, vec![vec![2, 1, 0, 0, 1]]);
        assert_eq!(rec.collisions, vec![vec![1, 1]]);

        let summary = marl_core::CollisionStats::new(2).summarize(3);
        rec.on_finish(&summary);
        assert_eq!(rec.channel_histogram.len(), 2);
        assert_eq!(rec.collisions[1], vec![0, 1]);
    }

    #[test]
    fn test_export() {
        let mut rec = HeatmapRecorder::new(3, DEFAULT_WINDOW);
        rec.on_step(&report(1, &[3], &[0]));
        rec.on_finish(&marl_core::CollisionStats::new(1).summarize(1));

        let csv = rec.export_csv();
        assert!(csv.starts_with("window,ch1,ch2,ch3\n"));
        assert!(csv.contains("0,0,0,1"));

        let json = rec.export_json("legacy");
        let parsed: HeatmapExport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.scenario, "legacy");
        assert_eq!(parsed.channel_histogram, vec![vec![0, 0, 1]]);
        assert!(parsed.summary.is_some());
    }
}
