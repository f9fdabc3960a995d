//! Named simulation scenarios
//!
//! Each scenario fixes the hopping modes and environment; the population size,
//! band and run length come from the command line.

use marl_core::{
    AgentConfig, HoppingMode, LinkModelKind, PiconetConfig, RunSummary, Simulation,
    SimulationConfig, StatisticsSink, WifiBand,
};
use std::path::Path;
use std::time::Instant;
use thiserror::Error;
use tracing::info;

/// Errors from scenario execution
#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),

    #[error("Simulation failed: {0}")]
    Simulation(#[from] marl_core::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Scenario configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioConfig {
    pub name: String,
    pub description: String,
    pub mode: HoppingMode,
    /// Piconets beyond the first `diffusive_agents` use this mode instead
    pub coexisting_mode: Option<HoppingMode>,
    pub diffusive_agents: usize,
    pub wifi: bool,
    pub link_model: LinkModelKind,
}

impl ScenarioConfig {
    fn single(name: &str, description: &str, mode: HoppingMode) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            mode,
            coexisting_mode: None,
            diffusive_agents: 0,
            wifi: false,
            link_model: LinkModelKind::SameChannel,
        }
    }
}

/// Population and run parameters shared by all scenarios
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunParams {
    pub agents: usize,
    pub channels: usize,
    pub steps: u64,
    pub warmup: u64,
    pub seed: u64,
    pub max_offset: u8,
    pub usable_target: usize,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            agents: 10,
            channels: 79,
            steps: 100_000,
            warmup: 2_000,
            seed: 0,
            max_offset: 2,
            usable_target: 20,
        }
    }
}

/// Get scenario by name
pub fn get_scenario(name: &str) -> Result<ScenarioConfig, ScenarioError> {
    match name.to_lowercase().as_str() {
        "legacy" | "lfh" => Ok(ScenarioConfig::single(
            "legacy",
            "Classical hopping over the whole band",
            HoppingMode::Legacy,
        )),

        "legacy-rl" | "legacy_rl" | "lfh-rl" => Ok(ScenarioConfig::single(
            "legacy-rl",
            "Q-learning best channel, classical exploration",
            HoppingMode::LegacyRl,
        )),

        "afh" => Ok(ScenarioConfig::single(
            "afh",
            "Adaptive hopping over the top channels",
            HoppingMode::Afh,
        )),

        "afh-rl" | "afh_rl" => Ok(ScenarioConfig::single(
            "afh-rl",
            "Adaptive hopping with a learned best channel",
            HoppingMode::AfhRl,
        )),

        "dfh-rl" | "dfh_rl" | "dfh" => Ok(ScenarioConfig::single(
            "dfh-rl",
            "Diffusive exploration around a learned best channel",
            HoppingMode::DfhRl,
        )),

        "wifi" => Ok(ScenarioConfig {
            wifi: true,
            ..ScenarioConfig::single(
                "wifi",
                "AFH-RL against WiFi channels 1, 6 and 11 mid-run",
                HoppingMode::AfhRl,
            )
        }),

        "coexist" => Ok(ScenarioConfig {
            coexisting_mode: Some(HoppingMode::Afh),
            ..ScenarioConfig::single(
                "coexist",
                "Half DFH-RL, half AFH sharing the band",
                HoppingMode::DfhRl,
            )
        }),

        "fading" => Ok(ScenarioConfig {
            link_model: LinkModelKind::RayleighFading,
            ..ScenarioConfig::single(
                "fading",
                "LFH-RL with SINR-based collisions in a crowded car",
                HoppingMode::LegacyRl,
            )
        }),

        _ => Err(ScenarioError::UnknownScenario(name.to_string())),
    }
}

/// List all available scenarios
pub fn all_scenarios() -> Vec<&'static str> {
    vec![
        "legacy",
        "legacy-rl",
        "afh",
        "afh-rl",
        "dfh-rl",
        "wifi",
        "coexist",
        "fading",
    ]
}

fn agent_config(mode: HoppingMode, params: &RunParams) -> AgentConfig {
    AgentConfig::new(mode)
        .with_max_offset(params.max_offset)
        .with_usable_target(params.usable_target)
}

/// Simulation configuration for a scenario
pub fn build_config(scenario: &ScenarioConfig, params: &RunParams) -> SimulationConfig {
    let diffusive = match scenario.coexisting_mode {
        Some(_) if scenario.diffusive_agents == 0 => params.agents / 2,
        Some(_) => scenario.diffusive_agents.min(params.agents),
        None => params.agents,
    };

    let piconets = (0..params.agents)
        .map(|i| {
            let mode = match scenario.coexisting_mode {
                Some(other) if i >= diffusive => other,
                _ => scenario.mode,
            };
            PiconetConfig::new(agent_config(mode, params))
        })
        .collect();

    let config = SimulationConfig {
        num_channels: params.channels,
        steps: params.steps,
        warmup_steps: params.warmup,
        seed: params.seed,
        link_model: scenario.link_model,
        wifi_bands: Vec::new(),
        piconets,
    };

    if scenario.wifi {
        config.with_wifi(WifiBand::standard_set(params.steps))
    } else {
        config
    }
}

/// Scenario execution results
#[derive(Debug, Clone)]
pub struct ScenarioResults {
    pub scenario: String,
    pub summary: RunSummary,
    pub duration_ms: u64,
}

/// Run a prepared configuration
pub fn run_scenario(
    name: &str,
    config: SimulationConfig,
    sink: &mut dyn StatisticsSink,
) -> Result<ScenarioResults, ScenarioError> {
    info!(
        "Running scenario {}: {} piconets over {} channels",
        name,
        config.piconets.len(),
        config.num_channels
    );
    let start = Instant::now();
    let mut sim = Simulation::new(config)?;
    let summary = sim.run(sink)?;

    Ok(ScenarioResults {
        scenario: name.to_string(),
        summary,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

/// Load a configuration written by `SimulationConfig::to_json`
pub fn load_config(path: &Path) -> Result<SimulationConfig, ScenarioError> {
    let text = std::fs::read_to_string(path)?;
    Ok(SimulationConfig::from_json(&text)?)
}
