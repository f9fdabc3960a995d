//! Discrete-time scheduler driving all piconets in lockstep

use crate::agent::{AgentController, PiconetSetup};
use crate::config::{LinkModelKind, SimulationConfig};
use crate::error::{Error, Result};
use crate::physical::{Placement, PlacementArea, RayleighFadingModel};
use crate::reward::{reward_for, CollisionState, LinkModel, RewardEvaluator, SameChannelModel};
use crate::stats::{CollisionStats, RunSummary, StatisticsSink, StepReport};
use crate::types::{AgentId, Channel, DeviceAddress, SimClock};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

/// Recorded central addresses. Piconet `i` (0-based) uses entry `i + 1`.
pub const DEFAULT_ADDRESSES: [u64; 56] = [
    0x28022e9d20d4, 0xbc9307225d70, 0xf0d7932fc094, 0xbc9307182750,
    0xe0bda04b3b44, 0xbc9307430cbc, 0x6cacc2f35447, 0xbc93072f3d22,
    0x6cacc2e95d6d, 0xbc9307356bb0, 0xbc93072e3dca, 0xbc9307356eb8,
    0x20022e9262aa, 0xbc9307345996, 0xdc1a40c8fd81, 0xcfce92910705,
    0x4d2c4780b90b, 0x440290a03c8f, 0x0c09e27de10f, 0xd77ef1c66e12,
    0xc38df82ce718, 0xc709518f9ea1, 0xb7a3147a1d22, 0xc7c3139cb723,
    0x4995f5649223, 0x87fff04c85a3, 0x1800ef32ba26, 0xb12129e681ab,
    0xf4fdff703cae, 0xfbe1fc960d2f, 0x9309ff90a333, 0x40711c56aeb4,
    0x27b3ed8e5335, 0xb7c962e94a34, 0x2fd5436fa937, 0x101de013793b,
    0xbda2da2a5d3d, 0x3fa7f5f0a5bf, 0x9a05c36458bf, 0x15527b931945,
    0xa0e6c15ab04b, 0xeee2129159cd, 0xd56b206f4cd0, 0xa45c8b1d7f50,
    0x4ce49878e0d1, 0x4f1612d86557, 0xbecc1aa68ade, 0x0d74a3843de2,
    0x3d68594de6e5, 0x49b827634566, 0x6b9cb5d98a67, 0xd920873a6dea,
    0xaec5fcf520ee, 0x2b4c25523770, 0x04f90b5742f2, 0x893039c73474,
];

/// Upper bound (exclusive) of a drawn piconet clock offset, in slots
const BASE_CLOCK_RANGE: u32 = 160_000;
const LINK_SEED_SALT: u64 = 0x5EED_11AC;

fn agent_seed(seed: u64, id: AgentId) -> u64 {
    seed ^ (id as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// One simulation run
pub struct Simulation {
    config: SimulationConfig,
    agents: Vec<AgentController>,
    /// Each agent's current channel as seen by the others
    published: Vec<Channel>,
    collisions: CollisionState,
    evaluator: RewardEvaluator,
    placements: Vec<Placement>,
    stats: CollisionStats,
    /// Last completed step
    step: u64,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let count = config.piconets.len();
        let mut setup_rng = StdRng::seed_from_u64(config.seed);

        let mut agents = Vec::with_capacity(count);
        for (id, piconet) in config.piconets.iter().enumerate() {
            // always draw so explicit overrides leave the other piconets unchanged
            let drawn_offset: u32 = setup_rng.gen_range(0..i32::MAX as u32);
            let drawn_base: u32 = setup_rng.gen_range(0..BASE_CLOCK_RANGE) & !1;

            let address = match piconet.address {
                Some(raw) => DeviceAddress::new(raw),
                None => DEFAULT_ADDRESSES
                    .get(id + 1)
                    .copied()
                    .map(DeviceAddress::new)
                    .ok_or_else(|| {
                        Error::InvalidConfig(format!(
                            "piconet {} has no address and the built-in table holds {}",
                            id,
                            DEFAULT_ADDRESSES.len() - 1
                        ))
                    })?,
            };
            let setup = PiconetSetup::new(
                address,
                piconet.base_clock.unwrap_or(drawn_base),
                piconet.start_offset.unwrap_or(drawn_offset),
            );
            debug!(
                "Simulation: piconet {} addr={} base_clock={} mode={}",
                id, setup.address, setup.base_clock, piconet.agent.hopping_mode
            );
            agents.push(AgentController::new(
                id,
                piconet.agent.clone(),
                config.num_channels,
                setup,
                agent_seed(config.seed, id),
            )?);
        }

        let (link_model, placements): (Box<dyn LinkModel>, Vec<Placement>) = match config.link_model {
            LinkModelKind::SameChannel => (Box::new(SameChannelModel) as Box<dyn LinkModel>, Vec::new()),
            LinkModelKind::RayleighFading => {
                let placements = PlacementArea::default().generate(count, &mut setup_rng);
                let model = RayleighFadingModel::new(placements.clone(), config.seed ^ LINK_SEED_SALT);
                (Box::new(model) as Box<dyn LinkModel>, placements)
            }
        };

        info!(
            "Simulation: {} piconets, {} channels, {} steps (seed={})",
            count, config.num_channels, config.steps, config.seed
        );

        Ok(Self {
            published: agents.iter().map(|a| a.current_channel()).collect(),
            collisions: CollisionState::new(count),
            evaluator: RewardEvaluator::new(link_model, config.wifi_bands.clone()),
            stats: CollisionStats::new(count),
            placements,
            agents,
            config,
            step: 0,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn agents(&self) -> &[AgentController] {
        &self.agents
    }

    pub fn agent(&self, id: AgentId) -> Option<&AgentController> {
        self.agents.get(id)
    }

    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub fn stats(&self) -> &CollisionStats {
        &self.stats
    }

    pub fn channels(&self) -> &[Channel] {
        &self.published
    }

    pub fn collided(&self) -> &[bool] {
        &self.collisions.collided
    }

    pub fn current_step(&self) -> u64 {
        self.step
    }

    pub fn is_finished(&self) -> bool {
        self.step >= self.config.steps
    }

    /// Advance one step: every agent learns from its previous outcome,
    /// picks a channel and is checked for collisions, in ascending id order.
    pub fn step(&mut self, sink: &mut dyn StatisticsSink) -> Result<()> {
        let clock = SimClock::new(self.step + 1);
        if clock.step <= self.config.warmup_steps {
            self.stats.reset();
        }
        self.collisions.begin_step();

        for id in 0..self.agents.len() {
            if clock.step > 1 {
                let collided = self.evaluator.confirm(id, &mut self.collisions);
                self.agents[id].learn(reward_for(collided), clock)?;
            }

            let collided = self.collisions.collided[id];
            let channel = self.agents[id].select_channel(clock, collided)?;
            if channel == 0 || channel as usize > self.config.num_channels {
                return Err(Error::ChannelOutOfRange(channel as i64));
            }

            self.evaluator
                .evaluate(id, channel, clock.step, &self.published, &mut self.collisions);
            self.agents[id].commit_channel(channel);
            self.published[id] = channel;
        }

        let wifi_window = self.evaluator.wifi_window(clock.step);
        self.stats.record_step(&self.collisions.hits, wifi_window);
        self.step = clock.step;

        sink.on_step(&StepReport {
            step: clock.step,
            channels: &self.published,
            hits: &self.collisions.hits,
            totals: self.stats.totals(),
            wifi_window,
        });
        Ok(())
    }

    /// Run the remaining steps and summarize.
    pub fn run(&mut self, sink: &mut dyn StatisticsSink) -> Result<RunSummary> {
        while !self.is_finished() {
            self.step(sink)?;
        }
        let summary = self.summary();
        info!(
            "Simulation: finished {} steps, mean pcol {:.6}, wifi pcol {:.6}",
            self.step, summary.mean_pcol, summary.wifi_pcol
        );
        sink.on_finish(&summary);
        Ok(summary)
    }

    pub fn summary(&self) -> RunSummary {
        let measured = self.config.steps.saturating_sub(self.config.warmup_steps);
        self.stats.summarize(measured)
    }
}
