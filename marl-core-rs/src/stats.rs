//! Collision counters exposed to external aggregation

use crate::types::{AgentId, Channel};
use serde::{Deserialize, Serialize};

/// Snapshot handed to a [`StatisticsSink`] after every step
#[derive(Debug, Clone, Copy)]
pub struct StepReport<'a> {
    pub step: u64,
    /// Channel each agent ended the step on
    pub channels: &'a [Channel],
    /// Collisions counted per agent during this step
    pub hits: &'a [u32],
    /// Running totals after this step
    pub totals: &'a [u64],
    pub wifi_window: bool,
}

/// Receives per-step counts. Formatting and aggregation live outside the core.
pub trait StatisticsSink {
    fn on_step(&mut self, report: &StepReport<'_>);

    fn on_finish(&mut self, _summary: &RunSummary) {}
}

/// Sink that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl StatisticsSink for NullSink {
    fn on_step(&mut self, _report: &StepReport<'_>) {}
}

/// Steps with at least one counted collision, per agent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollisionStats {
    totals: Vec<u64>,
    wifi_totals: Vec<u64>,
    wifi_window_steps: u64,
}

impl CollisionStats {
    pub fn new(agents: usize) -> Self {
        Self {
            totals: vec![0; agents],
            wifi_totals: vec![0; agents],
            wifi_window_steps: 0,
        }
    }

    /// Drop everything counted so far (used while the run warms up)
    pub fn reset(&mut self) {
        self.totals.iter_mut().for_each(|t| *t = 0);
        self.wifi_totals.iter_mut().for_each(|t| *t = 0);
        self.wifi_window_steps = 0;
    }

    pub fn record_step(&mut self, hits: &[u32], wifi_window: bool) {
        for (agent, &h) in hits.iter().enumerate() {
            if h > 0 {
                self.totals[agent] += 1;
                if wifi_window {
                    self.wifi_totals[agent] += 1;
                }
            }
        }
        if wifi_window {
            self.wifi_window_steps += 1;
        }
    }

    pub fn totals(&self) -> &[u64] {
        &self.totals
    }

    pub fn total(&self, agent: AgentId) -> u64 {
        self.totals.get(agent).copied().unwrap_or(0)
    }

    pub fn wifi_totals(&self) -> &[u64] {
        &self.wifi_totals
    }

    pub fn summarize(&self, measured_steps: u64) -> RunSummary {
        let per_agent_pcol: Vec<f64> = self
            .totals
            .iter()
            .map(|&t| ratio(t, measured_steps))
            .collect();
        let agents = self.totals.len() as u64;
        let mean_pcol = ratio(self.totals.iter().sum(), measured_steps * agents);
        let wifi_pcol = ratio(
            self.wifi_totals.iter().sum(),
            self.wifi_window_steps * agents,
        );

        RunSummary {
            totals: self.totals.clone(),
            wifi_totals: self.wifi_totals.clone(),
            per_agent_pcol,
            mean_pcol,
            wifi_pcol,
            measured_steps,
        }
    }
}

fn ratio(count: u64, over: u64) -> f64 {
    if over == 0 {
        0.0
    } else {
        count as f64 / over as f64
    }
}

/// Collision probabilities of a finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub totals: Vec<u64>,
    pub wifi_totals: Vec<u64>,
    pub per_agent_pcol: Vec<f64>,
    pub mean_pcol: f64,
    /// Collision probability while any WiFi band was on
    pub wifi_pcol: f64,
    pub measured_steps: u64,
}

impl RunSummary {
    /// Mean collision probability over a subset of agents
    pub fn group_pcol(&self, agents: std::ops::Range<usize>) -> f64 {
        let selected: Vec<f64> = self
            .per_agent_pcol
            .get(agents)
            .map(|s| s.to_vec())
            .unwrap_or_default();
        if selected.is_empty() {
            0.0
        } else {
            selected.iter().sum::<f64>() / selected.len() as f64
        }
    }
}
