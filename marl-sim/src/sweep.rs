//! Parameter sweeps over band size, hopping mode and map size
//!
//! The grid is generated up front, then every point runs as an independent
//! simulation. Results go to a timestamped text file with one line per point
//! and a JSON file with the full summaries.

use chrono::{DateTime, Utc};
use marl_core::{
    AgentConfig, HoppingMode, NullSink, PiconetConfig, RunSummary, Simulation, SimulationConfig,
    WifiBand,
};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Smallest AFH map in a map-size sweep
pub const MAP_SWEEP_MIN: usize = 20;
pub const MAP_SWEEP_STEP: usize = 10;

/// Errors from sweep execution
#[derive(Error, Debug)]
pub enum SweepError {
    #[error("Empty sweep: {0}")]
    Empty(String),

    #[error("Simulation failed: {0}")]
    Simulation(#[from] marl_core::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// What to sweep
#[derive(Debug, Clone, PartialEq)]
pub struct SweepOptions {
    pub channels: Vec<usize>,
    pub modes: Vec<HoppingMode>,
    pub agents: usize,
    pub steps: u64,
    pub warmup: u64,
    pub seed: u64,
    /// DFH-RL runs once per offset bound
    pub dfh_offsets: Vec<u8>,
    /// Sweep the AFH target from `MAP_SWEEP_MIN` up to the band size
    pub map_sweep: bool,
    /// First n piconets run DFH-RL, the rest the swept mode
    pub coexist: Option<usize>,
    pub wifi: bool,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            channels: (20..=79).step_by(10).collect(),
            modes: HoppingMode::ALL.to_vec(),
            agents: 10,
            steps: 100_000,
            warmup: 2_000,
            seed: 0,
            dfh_offsets: vec![5, 3, 2],
            map_sweep: false,
            coexist: None,
            wifi: false,
        }
    }
}

/// One run of the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SweepPoint {
    pub mode: HoppingMode,
    pub num_channels: usize,
    pub num_agents: usize,
    pub usable_target: usize,
    pub max_offset: u8,
    pub diffusive_agents: usize,
}

impl SweepPoint {
    pub fn config(&self, opts: &SweepOptions) -> SimulationConfig {
        let swept = AgentConfig::new(self.mode)
            .with_usable_target(self.usable_target)
            .with_max_offset(self.max_offset);
        let diffusive = AgentConfig::new(HoppingMode::DfhRl).with_max_offset(self.max_offset);

        let piconets = (0..self.num_agents)
            .map(|i| {
                let agent = if i < self.diffusive_agents {
                    diffusive.clone()
                } else {
                    swept.clone()
                };
                PiconetConfig::new(agent)
            })
            .collect();

        let config = SimulationConfig {
            num_channels: self.num_channels,
            steps: opts.steps,
            warmup_steps: opts.warmup,
            seed: opts.seed,
            piconets,
            ..SimulationConfig::default()
        };
        if opts.wifi {
            config.with_wifi(WifiBand::standard_set(opts.steps))
        } else {
            config
        }
    }

    /// Result line: `M<mode> <nc> <na> <target> <pcol> <wifi_pcol> hmax<H> <per-agent...>`
    pub fn format_line(&self, summary: &RunSummary) -> String {
        let mut line = format!(
            "M{} {} {} {} {:.6} {:.6} hmax{}",
            self.mode.index(),
            self.num_channels,
            self.num_agents,
            self.usable_target,
            summary.mean_pcol,
            summary.wifi_pcol,
            self.max_offset
        );
        for p in &summary.per_agent_pcol {
            line.push_str(&format!(" {:.6}", p));
        }
        line
    }
}

/// Expand the options into the full list of runs.
pub fn build_grid(opts: &SweepOptions) -> Result<Vec<SweepPoint>, SweepError> {
    if opts.agents == 0 {
        return Err(SweepError::Empty("no piconets".into()));
    }

    let mut points = Vec::new();
    for &nc in &opts.channels {
        for &mode in &opts.modes {
            // DFH-RL against itself is the plain DFH-RL sweep
            if opts.coexist.is_some() && mode == HoppingMode::DfhRl {
                continue;
            }

            let offsets: Vec<u8> = if mode == HoppingMode::DfhRl || opts.coexist.is_some() {
                opts.dfh_offsets
                    .iter()
                    .copied()
                    .filter(|&h| h >= 1 && (h as usize) < nc)
                    .collect()
            } else {
                vec![marl_core::config::DEFAULT_MAX_OFFSET]
            };

            let targets: Vec<usize> = if opts.map_sweep && mode.is_adaptive() && nc > MAP_SWEEP_MIN {
                (MAP_SWEEP_MIN..=nc).step_by(MAP_SWEEP_STEP).collect()
            } else if mode.is_adaptive() {
                vec![MAP_SWEEP_MIN.min(nc)]
            } else {
                vec![nc]
            };

            for &max_offset in &offsets {
                for &usable_target in &targets {
                    points.push(SweepPoint {
                        mode,
                        num_channels: nc,
                        num_agents: opts.agents,
                        usable_target,
                        max_offset,
                        diffusive_agents: opts.coexist.map_or(0, |n| n.min(opts.agents)),
                    });
                }
            }
        }
    }

    if points.is_empty() {
        return Err(SweepError::Empty("parameter grid has no points".into()));
    }
    Ok(points)
}

/// Result file name for a sweep started at `at`
pub fn result_file_name(at: DateTime<Utc>) -> String {
    format!("pcol_{}.txt", at.format("%Y%m%d_%H%M%S"))
}

/// One finished point
#[derive(Debug, Clone, Serialize)]
pub struct SweepResult {
    pub point: SweepPoint,
    pub summary: RunSummary,
}

#[derive(Debug, Clone)]
pub struct SweepOutcome {
    pub results: Vec<SweepResult>,
    pub text_path: PathBuf,
    pub json_path: PathBuf,
}

/// Run every point, appending each result line as soon as it is known.
pub fn run_sweep(
    points: &[SweepPoint],
    opts: &SweepOptions,
    output_dir: &Path,
    started: DateTime<Utc>,
) -> Result<SweepOutcome, SweepError> {
    std::fs::create_dir_all(output_dir)?;
    let text_path = output_dir.join(result_file_name(started));
    let json_path = text_path.with_extension("json");
    let mut text = File::create(&text_path)?;

    let mut results = Vec::with_capacity(points.len());
    for (i, point) in points.iter().enumerate() {
        debug!("Sweep: point {}/{} {:?}", i + 1, points.len(), point);
        let mut sim = Simulation::new(point.config(opts))?;
        let summary = sim.run(&mut NullSink)?;

        let line = point.format_line(&summary);
        writeln!(text, "{}", line)?;
        text.flush()?;
        info!("{}", line);

        results.push(SweepResult {
            point: *point,
            summary,
        });
    }

    let export = serde_json::json!({
        "started": started.to_rfc3339(),
        "steps": opts.steps,
        "warmup": opts.warmup,
        "seed": opts.seed,
        "wifi": opts.wifi,
        "results": results,
    });
    std::fs::write(&json_path, serde_json::to_string_pretty(&export)?)?;

    Ok(SweepOutcome {
        results,
        text_path,
        json_path,
    })
}
