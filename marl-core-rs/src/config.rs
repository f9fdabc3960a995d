//! Agent and simulation configuration

use crate::error::{Error, Result};
use crate::types::{Channel, HoppingMode, NUM_CHANNELS};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Learning rate
pub const DEFAULT_ALPHA: f64 = 0.1;
/// Discount factor
pub const DEFAULT_GAMMA: f64 = 0.9;
/// Exploration probability
pub const DEFAULT_EPSILON: f64 = 0.1;
/// Largest diffusive offset
pub const DEFAULT_MAX_OFFSET: u8 = 2;
/// Usable channels kept by the adaptive map
pub const DEFAULT_USABLE_TARGET: usize = 20;
/// Slots between an update announcement and its activation check
pub const DEFAULT_INSTANCE_TIMEOUT: u64 = 240;
/// Slots a committed update stays in force
pub const DEFAULT_UPDATE_TIMEOUT: u64 = 3200;
/// Slots without a clean hop before falling back to classical hopping
pub const DEFAULT_DOWNGRADE_TIMEOUT: u64 = 80;
/// Multiplier applied to negative values of channels off the map
pub const DEFAULT_DECAY_FACTOR: f64 = 0.98;
/// Slots between adaptive map rebuilds (aligned to the piconet clock)
pub const DEFAULT_MAP_REBUILD_PERIOD: u64 = 3200;
/// Base of the first timer deadline of a learning agent
pub const INITIAL_INSTANCE_OFFSET: u64 = 1600;
/// Q-value used to push a WiFi band out of the map
pub const WIFI_SENTINEL: f64 = -2_147_483_647.0;
/// Most WiFi bands an agent can track
pub const MAX_WIFI_BANDS: usize = 3;

/// A WiFi transmitter occupying a contiguous channel band for a step window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiBand {
    /// First occupied channel (1-based)
    pub start_channel: Channel,
    /// Last occupied channel (1-based, inclusive)
    pub end_channel: Channel,
    /// First step the band is on
    pub on_time: u64,
    /// Last step the band is on
    pub off_time: u64,
}

impl WifiBand {
    pub fn new(start_channel: Channel, end_channel: Channel, on_time: u64, off_time: u64) -> Self {
        Self {
            start_channel,
            end_channel,
            on_time,
            off_time,
        }
    }

    pub fn contains(&self, channel: Channel) -> bool {
        (self.start_channel..=self.end_channel).contains(&channel)
    }

    pub fn is_active(&self, step: u64) -> bool {
        (self.on_time..=self.off_time).contains(&step)
    }

    /// WiFi channels 6, 11 and 1, on between 30% and 70% of a run of `steps`
    pub fn standard_set(steps: u64) -> Vec<WifiBand> {
        let on = steps * 3 / 10;
        let off = steps * 7 / 10;
        vec![
            WifiBand::new(25, 47, on, off),
            WifiBand::new(50, 72, on, off),
            WifiBand::new(1, 21, on, off),
        ]
    }
}

/// When the adaptive map reacts to WiFi bands, in steps relative to the band window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiPolicy {
    /// Steps after `on_time` before the band is excluded
    pub exclusion_delay: u64,
    /// Steps after `off_time` before the band is re-enabled
    pub release_delay: u64,
}

impl Default for WifiPolicy {
    fn default() -> Self {
        Self {
            exclusion_delay: 1600,
            release_delay: 24_000,
        }
    }
}

/// Per-agent hopping and learning parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub hopping_mode: HoppingMode,
    /// Channels kept in the adaptive map
    pub usable_channel_target: usize,
    /// Diffusive offset bound H
    pub diffusion_max_offset: u8,
    pub alpha: f64,
    pub gamma: f64,
    pub epsilon: f64,
    pub instance_timeout: u64,
    pub update_timeout: u64,
    pub downgrade_timeout: u64,
    pub decay_factor: f64,
    pub map_rebuild_period: u64,
    pub wifi_bands: Vec<WifiBand>,
    pub wifi_policy: WifiPolicy,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            hopping_mode: HoppingMode::Legacy,
            usable_channel_target: DEFAULT_USABLE_TARGET,
            diffusion_max_offset: DEFAULT_MAX_OFFSET,
            alpha: DEFAULT_ALPHA,
            gamma: DEFAULT_GAMMA,
            epsilon: DEFAULT_EPSILON,
            instance_timeout: DEFAULT_INSTANCE_TIMEOUT,
            update_timeout: DEFAULT_UPDATE_TIMEOUT,
            downgrade_timeout: DEFAULT_DOWNGRADE_TIMEOUT,
            decay_factor: DEFAULT_DECAY_FACTOR,
            map_rebuild_period: DEFAULT_MAP_REBUILD_PERIOD,
            wifi_bands: Vec::new(),
            wifi_policy: WifiPolicy::default(),
        }
    }
}

impl AgentConfig {
    pub fn new(hopping_mode: HoppingMode) -> Self {
        Self {
            hopping_mode,
            ..Self::default()
        }
    }

    pub fn with_usable_target(mut self, target: usize) -> Self {
        self.usable_channel_target = target;
        self
    }

    pub fn with_max_offset(mut self, h: u8) -> Self {
        self.diffusion_max_offset = h;
        self
    }

    pub fn with_learning(mut self, alpha: f64, gamma: f64, epsilon: f64) -> Self {
        self.alpha = alpha;
        self.gamma = gamma;
        self.epsilon = epsilon;
        self
    }

    pub fn with_timeouts(mut self, instance: u64, update: u64, downgrade: u64) -> Self {
        self.instance_timeout = instance;
        self.update_timeout = update;
        self.downgrade_timeout = downgrade;
        self
    }

    pub fn with_wifi_bands(mut self, bands: Vec<WifiBand>) -> Self {
        self.wifi_bands = bands;
        self
    }

    /// Channels the adaptive map keeps in a band of `num_channels`
    pub fn effective_usable_count(&self, num_channels: usize) -> usize {
        if self.hopping_mode.is_adaptive() {
            self.usable_channel_target.min(num_channels)
        } else {
            num_channels
        }
    }

    pub fn validate(&self, num_channels: usize) -> Result<()> {
        for (name, value) in [
            ("alpha", self.alpha),
            ("gamma", self.gamma),
            ("epsilon", self.epsilon),
            ("decay_factor", self.decay_factor),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::InvalidConfig(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        if self.hopping_mode == HoppingMode::DfhRl {
            let h = self.diffusion_max_offset as usize;
            if h == 0 || h >= num_channels {
                return Err(Error::InvalidConfig(format!(
                    "diffusion offset {} must be within 1..{}",
                    h, num_channels
                )));
            }
        }
        if self.hopping_mode.is_adaptive() && self.usable_channel_target == 0 {
            return Err(Error::NoUsableChannels);
        }
        if self.instance_timeout >= self.update_timeout {
            return Err(Error::InvalidConfig(format!(
                "instance timeout {} must be shorter than update timeout {}",
                self.instance_timeout, self.update_timeout
            )));
        }
        if self.map_rebuild_period == 0 {
            return Err(Error::InvalidConfig("map rebuild period must be nonzero".into()));
        }
        if self.wifi_bands.len() > MAX_WIFI_BANDS {
            return Err(Error::InvalidConfig(format!(
                "at most {} WiFi bands, got {}",
                MAX_WIFI_BANDS,
                self.wifi_bands.len()
            )));
        }
        for band in &self.wifi_bands {
            validate_band(band)?;
        }
        Ok(())
    }
}

fn validate_band(band: &WifiBand) -> Result<()> {
    if band.start_channel == 0 {
        return Err(Error::ChannelOutOfRange(0));
    }
    if band.end_channel as usize > NUM_CHANNELS {
        return Err(Error::ChannelOutOfRange(band.end_channel as i64));
    }
    if band.start_channel > band.end_channel || band.on_time > band.off_time {
        return Err(Error::InvalidConfig(format!("malformed WiFi band {:?}", band)));
    }
    Ok(())
}

/// Which link model decides same-channel outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkModelKind {
    /// Any same-channel contact is a collision
    SameChannel,
    /// SINR under Rayleigh fading decides
    RayleighFading,
}

/// One piconet taking part in a run. Unset fields are drawn from the run seed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PiconetConfig {
    pub agent: AgentConfig,
    pub address: Option<u64>,
    /// Piconet clock offset in slots (kept even)
    pub base_clock: Option<u32>,
    /// Per-piconet start value; sets the first channel and first deadline
    pub start_offset: Option<u32>,
}

impl PiconetConfig {
    pub fn new(agent: AgentConfig) -> Self {
        Self {
            agent,
            ..Self::default()
        }
    }

    pub fn with_address(mut self, address: u64) -> Self {
        self.address = Some(address);
        self
    }

    pub fn with_base_clock(mut self, base_clock: u32) -> Self {
        self.base_clock = Some(base_clock);
        self
    }

    pub fn with_start_offset(mut self, start_offset: u32) -> Self {
        self.start_offset = Some(start_offset);
        self
    }
}

/// A full run: band size, length, environment and piconets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Band size; channels `1..=num_channels` are in use
    pub num_channels: usize,
    pub steps: u64,
    /// Totals are reset at every step up to and including this one
    pub warmup_steps: u64,
    pub seed: u64,
    pub link_model: LinkModelKind,
    /// WiFi interference present in the environment
    pub wifi_bands: Vec<WifiBand>,
    pub piconets: Vec<PiconetConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_channels: NUM_CHANNELS,
            steps: 100_000,
            warmup_steps: 2000,
            seed: 0,
            link_model: LinkModelKind::SameChannel,
            wifi_bands: Vec::new(),
            piconets: Vec::new(),
        }
    }
}

impl SimulationConfig {
    /// `count` piconets sharing one agent configuration
    pub fn uniform(count: usize, agent: AgentConfig) -> Self {
        Self {
            piconets: (0..count).map(|_| PiconetConfig::new(agent.clone())).collect(),
            ..Self::default()
        }
    }

    pub fn with_channels(mut self, num_channels: usize) -> Self {
        self.num_channels = num_channels;
        self
    }

    pub fn with_steps(mut self, steps: u64, warmup_steps: u64) -> Self {
        self.steps = steps;
        self.warmup_steps = warmup_steps;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_link_model(mut self, link_model: LinkModelKind) -> Self {
        self.link_model = link_model;
        self
    }

    /// Put the bands in the environment and let every agent track them
    pub fn with_wifi(mut self, bands: Vec<WifiBand>) -> Self {
        for piconet in &mut self.piconets {
            piconet.agent.wifi_bands = bands.clone();
        }
        self.wifi_bands = bands;
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: SimulationConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_channels == 0 {
            return Err(Error::NoUsableChannels);
        }
        if self.num_channels > NUM_CHANNELS {
            return Err(Error::ChannelOutOfRange(self.num_channels as i64));
        }
        if self.steps == 0 || self.warmup_steps >= self.steps {
            return Err(Error::InvalidConfig(format!(
                "warmup {} must be shorter than run length {}",
                self.warmup_steps, self.steps
            )));
        }
        if self.piconets.is_empty() {
            return Err(Error::InvalidConfig("no piconets configured".into()));
        }
        for band in &self.wifi_bands {
            validate_band(band)?;
        }
        for piconet in &self.piconets {
            piconet.agent.validate(self.num_channels)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.alpha, 0.1);
        assert_eq!(config.gamma, 0.9);
        assert_eq!(config.instance_timeout, 240);
        assert_eq!(config.update_timeout, 3200);
        assert_eq!(config.downgrade_timeout, 80);
        assert!(config.validate(79).is_ok());
    }

    #[test]
    fn test_effective_usable_count() {
        let afh = AgentConfig::new(HoppingMode::Afh);
        assert_eq!(afh.effective_usable_count(79), 20);
        assert_eq!(afh.with_usable_target(60).effective_usable_count(40), 40);
        assert_eq!(AgentConfig::new(HoppingMode::DfhRl).effective_usable_count(50), 50);
    }

    #[test]
    fn test_validate_rejects() {
        let bad_alpha = AgentConfig::default().with_learning(1.5, 0.9, 0.1);
        assert!(matches!(bad_alpha.validate(79), Err(Error::InvalidConfig(_))));

        let bad_h = AgentConfig::new(HoppingMode::DfhRl).with_max_offset(0);
        assert!(bad_h.validate(79).is_err());
        let wide_h = AgentConfig::new(HoppingMode::DfhRl).with_max_offset(20);
        assert!(wide_h.validate(20).is_err());

        let bad_timers = AgentConfig::default().with_timeouts(3200, 3200, 80);
        assert!(bad_timers.validate(79).is_err());

        let too_many = AgentConfig::default().with_wifi_bands(vec![
            WifiBand::new(1, 2, 0, 1),
            WifiBand::new(3, 4, 0, 1),
            WifiBand::new(5, 6, 0, 1),
            WifiBand::new(7, 8, 0, 1),
        ]);
        assert!(too_many.validate(79).is_err());

        let zero_band = AgentConfig::default().with_wifi_bands(vec![WifiBand::new(0, 2, 0, 1)]);
        assert_eq!(zero_band.validate(79), Err(Error::ChannelOutOfRange(0)));

        let no_map = AgentConfig::new(HoppingMode::AfhRl).with_usable_target(0);
        assert_eq!(no_map.validate(79), Err(Error::NoUsableChannels));
    }

    #[test]
    fn test_standard_wifi_set() {
        let bands = WifiBand::standard_set(100_000);
        assert_eq!(bands.len(), 3);
        assert_eq!(bands[0].on_time, 30_000);
        assert_eq!(bands[0].off_time, 70_000);
        assert!(bands[0].contains(25) && bands[0].contains(47));
        assert!(!bands[0].contains(48));
        assert!(bands[2].is_active(30_000) && !bands[2].is_active(70_001));
    }

    #[test]
    fn test_simulation_validate() {
        let config = SimulationConfig::uniform(3, AgentConfig::default());
        assert!(config.validate().is_ok());

        assert!(SimulationConfig::default().validate().is_err());
        assert_eq!(
            SimulationConfig::uniform(3, AgentConfig::default())
                .with_channels(80)
                .validate(),
            Err(Error::ChannelOutOfRange(80))
        );
        assert!(SimulationConfig::uniform(3, AgentConfig::default())
            .with_steps(100, 100)
            .validate()
            .is_err());
    }

    #[test]
    fn test_json_roundtrip_from_file() {
        let config = SimulationConfig::uniform(2, AgentConfig::new(HoppingMode::AfhRl))
            .with_steps(5000, 100)
            .with_seed(7)
            .with_wifi(WifiBand::standard_set(5000));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config.to_json().unwrap().as_bytes()).unwrap();

        let loaded = SimulationConfig::load(file.path()).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.piconets[1].agent.wifi_bands.len(), 3);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "num_channels": 40,
            "steps": 1000,
            "warmup_steps": 0,
            "piconets": [
                { "agent": { "hopping_mode": "dfh-rl", "diffusion_max_offset": 3 } },
                { "address": 207339665907056 }
            ]
        }"#;
        let config = SimulationConfig::from_json(json).unwrap();
        assert_eq!(config.piconets[0].agent.hopping_mode, HoppingMode::DfhRl);
        assert_eq!(config.piconets[0].agent.alpha, 0.1);
        assert_eq!(config.piconets[1].address, Some(0xbc93_0722_5d70));
        assert_eq!(config.link_model, LinkModelKind::SameChannel);
    }
}
