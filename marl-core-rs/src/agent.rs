//! Per-piconet hopping controller
//!
//! Each agent owns its Q-table, timer state machine and two channel-map
//! buffers. The candidate buffer is prepared while the update is announced
//! and only becomes the active buffer at the WaitActivation -> Run switch.

use crate::channel_map::{select_top_k, ChannelMap};
use crate::config::{AgentConfig, INITIAL_INSTANCE_OFFSET, WIFI_SENTINEL};
use crate::error::{Error, Result};
use crate::hopping::compute_frequency;
use crate::qtable::QTable;
use crate::types::{
    ActionKind, AgentId, Channel, DeviceAddress, HoppingMode, SimClock, SubMode, TimerState,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

/// Per-piconet constants drawn once per run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PiconetSetup {
    pub address: DeviceAddress,
    /// Clock offset in slots, even
    pub base_clock: u32,
    pub start_offset: u32,
}

impl PiconetSetup {
    pub fn new(address: DeviceAddress, base_clock: u32, start_offset: u32) -> Self {
        Self {
            address,
            base_clock: base_clock & !1,
            start_offset,
        }
    }

    /// First channel the piconet sits on, `1..=num_channels`
    pub fn initial_channel(&self, num_channels: usize) -> Channel {
        (self.start_offset as usize % num_channels.max(1) + 1) as Channel
    }
}

/// A channel map together with the count handed to the hop kernel and the
/// best channel chosen alongside it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapBuffer {
    pub map: ChannelMap,
    pub usable_count: usize,
    pub best_channel: Option<Channel>,
}

impl MapBuffer {
    fn full_band(num_channels: usize) -> Self {
        Self {
            map: ChannelMap::first(num_channels),
            usable_count: num_channels,
            best_channel: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct WifiBandState {
    excluded: bool,
    released: bool,
}

/// Hopping-mode state machine and Q-learning for one piconet
#[derive(Debug, Clone)]
pub struct AgentController {
    id: AgentId,
    config: AgentConfig,
    num_channels: usize,
    setup: PiconetSetup,
    rng: StdRng,
    q_table: QTable,
    sub_mode: SubMode,
    timer_state: TimerState,
    /// Next timer deadline (slots)
    instance_time: u64,
    last_succeed_time: u64,
    current_channel: Channel,
    last_channel: Option<Channel>,
    /// Map used by the kernel, plus the committed best channel
    active: MapBuffer,
    /// Pending update, applied at activation
    candidate: MapBuffer,
    full_band: ChannelMap,
    wifi_state: Vec<WifiBandState>,
    cumulative_reward: f64,
}

impl AgentController {
    pub fn new(
        id: AgentId,
        config: AgentConfig,
        num_channels: usize,
        setup: PiconetSetup,
        seed: u64,
    ) -> Result<Self> {
        config.validate(num_channels)?;
        if num_channels == 0 {
            return Err(Error::NoUsableChannels);
        }

        let learning = config.hopping_mode.is_learning();
        let (timer_state, instance_time) = if learning {
            (
                TimerState::Run,
                INITIAL_INSTANCE_OFFSET + setup.start_offset as u64 % config.update_timeout,
            )
        } else {
            (TimerState::Init, 0)
        };

        Ok(Self {
            id,
            num_channels,
            current_channel: setup.initial_channel(num_channels),
            last_channel: None,
            rng: StdRng::seed_from_u64(seed),
            q_table: QTable::new(num_channels),
            sub_mode: SubMode::Legacy,
            timer_state,
            instance_time,
            last_succeed_time: 0,
            active: MapBuffer::full_band(num_channels),
            candidate: MapBuffer::full_band(num_channels),
            full_band: ChannelMap::first(num_channels),
            wifi_state: vec![WifiBandState::default(); config.wifi_bands.len()],
            cumulative_reward: 0.0,
            setup,
            config,
        })
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn mode(&self) -> HoppingMode {
        self.config.hopping_mode
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn setup(&self) -> &PiconetSetup {
        &self.setup
    }

    pub fn sub_mode(&self) -> SubMode {
        self.sub_mode
    }

    pub fn timer_state(&self) -> TimerState {
        self.timer_state
    }

    pub fn instance_time(&self) -> u64 {
        self.instance_time
    }

    pub fn last_succeed_time(&self) -> u64 {
        self.last_succeed_time
    }

    pub fn current_channel(&self) -> Channel {
        self.current_channel
    }

    pub fn last_channel(&self) -> Option<Channel> {
        self.last_channel
    }

    pub fn q_table(&self) -> &QTable {
        &self.q_table
    }

    pub fn q_table_mut(&mut self) -> &mut QTable {
        &mut self.q_table
    }

    pub fn active(&self) -> &MapBuffer {
        &self.active
    }

    pub fn candidate(&self) -> &MapBuffer {
        &self.candidate
    }

    /// Discounted reward trace, diagnostic only
    pub fn cumulative_reward(&self) -> f64 {
        self.cumulative_reward
    }

    // ------------------------------------------------------------------------
    // Hops
    // ------------------------------------------------------------------------

    fn hop(&self, clock: SimClock, map: &ChannelMap, usable_count: usize) -> Result<Channel> {
        let air = compute_frequency(
            self.setup.address,
            clock.hop_clock(self.setup.base_clock),
            map,
            usable_count,
        )?;
        Ok(air + 1)
    }

    /// Classical hop over the whole band, ignoring any adaptive map
    pub fn full_band_hop(&self, clock: SimClock) -> Result<Channel> {
        self.hop(clock, &self.full_band, self.num_channels)
    }

    /// Hop over the active map
    pub fn adaptive_hop(&self, clock: SimClock) -> Result<Channel> {
        self.hop(clock, &self.active.map, self.active.usable_count)
    }

    // ------------------------------------------------------------------------
    // Step entry points
    // ------------------------------------------------------------------------

    /// Choose the channel for this step. `collided` is the outcome of the
    /// previous action as known at this point of the step.
    pub fn select_channel(&mut self, clock: SimClock, collided: bool) -> Result<Channel> {
        let channel = match self.config.hopping_mode {
            HoppingMode::Legacy | HoppingMode::Afh => self.adaptive_hop(clock)?,
            HoppingMode::LegacyRl | HoppingMode::AfhRl | HoppingMode::DfhRl => {
                self.select_learning(clock, collided)?
            }
        };

        if self.config.hopping_mode.is_adaptive() && self.is_rebuild_instant(clock) {
            self.rebuild_active_map(clock)?;
        }

        Ok(channel)
    }

    /// Apply the Q-learning update for the channel used in the previous step.
    pub fn learn(&mut self, reward: f64, clock: SimClock) -> Result<f64> {
        let next_value = match self.config.hopping_mode {
            HoppingMode::Legacy | HoppingMode::Afh => {
                let pick = self.adaptive_hop(clock)?;
                self.q_table.get(ActionKind::Default, pick)
            }
            _ => self.q_table.bootstrap_value(),
        };

        let q = self.q_table.update(
            self.current_channel,
            reward,
            next_value,
            self.config.alpha,
            self.config.gamma,
        )?;
        self.cumulative_reward = reward + self.config.gamma * self.cumulative_reward;
        Ok(q)
    }

    /// Record the channel chosen this step.
    pub fn commit_channel(&mut self, channel: Channel) {
        self.last_channel = Some(self.current_channel);
        self.current_channel = channel;
    }

    // ------------------------------------------------------------------------
    // Timer state machine
    // ------------------------------------------------------------------------

    fn select_learning(&mut self, clock: SimClock, collided: bool) -> Result<Channel> {
        let now = clock.now();
        let classical = self.full_band_hop(clock)?;

        if collided {
            if self.sub_mode == SubMode::RlActive
                && now.saturating_sub(self.last_succeed_time) > self.config.downgrade_timeout
            {
                info!(
                    "Agent {}: no clean hop since slot {}, falling back to classical hopping at slot {}",
                    self.id, self.last_succeed_time, now
                );
                self.sub_mode = SubMode::Legacy;
                self.timer_state = TimerState::WaitArrival;
                self.prepare_candidate()?;
                self.instance_time = now + self.config.instance_timeout;
                return Ok(classical);
            }
        } else {
            self.last_succeed_time = now;
        }

        if now >= self.instance_time {
            self.on_expiry(now, collided)?;
        }

        if self.sub_mode == SubMode::Legacy {
            return Ok(classical);
        }

        let explore = self.rng.gen::<f64>() < self.config.epsilon;
        match self.config.hopping_mode {
            HoppingMode::DfhRl => {
                if explore {
                    Ok(self.diffusive_step())
                } else {
                    Ok(self.active.best_channel.unwrap_or(classical))
                }
            }
            _ => {
                if explore {
                    self.adaptive_hop(clock)
                } else {
                    match self.active.best_channel {
                        Some(best) => Ok(best),
                        None => self.adaptive_hop(clock),
                    }
                }
            }
        }
    }

    fn on_expiry(&mut self, now: u64, collided: bool) -> Result<()> {
        match self.timer_state {
            TimerState::WaitActivation => {
                self.active = self.candidate;
                self.instance_time = now + self.config.update_timeout;
                self.timer_state = TimerState::Run;
                if self.sub_mode == SubMode::Legacy {
                    self.sub_mode = SubMode::RlActive;
                }
                debug!(
                    "Agent {}: activated best={:?} usable={} until slot {}",
                    self.id, self.active.best_channel, self.active.usable_count, self.instance_time
                );
            }
            TimerState::WaitArrival => {
                // a collided confirmation is lost; retried at the next expiry
                if !collided {
                    self.timer_state = TimerState::WaitActivation;
                    debug!("Agent {}: update confirmed at slot {}", self.id, now);
                }
            }
            TimerState::Run | TimerState::Init => {
                self.q_table
                    .decay_unusable(&self.active.map, self.config.decay_factor);
                self.prepare_candidate()?;
                self.instance_time = now + self.config.instance_timeout;
                self.timer_state = TimerState::WaitArrival;
                debug!(
                    "Agent {}: announced best={:?}, deadline slot {}",
                    self.id, self.candidate.best_channel, self.instance_time
                );
            }
        }
        Ok(())
    }

    fn prepare_candidate(&mut self) -> Result<()> {
        let k = self.config.effective_usable_count(self.num_channels);
        let top = select_top_k(self.q_table.scores(ActionKind::Default), k)?;
        self.candidate = MapBuffer {
            map: top.map,
            usable_count: top.map.usable_count(),
            best_channel: Some(self.q_table.best_channel()),
        };
        Ok(())
    }

    /// Nonzero offset of at most H from the current channel, wrapped into the band.
    /// With H = 1 only the direction is random.
    fn diffusive_step(&mut self) -> Channel {
        let h = self.config.diffusion_max_offset.max(1) as i64;
        let sign = if self.rng.gen_range(0..2) == 0 { -1 } else { 1 };
        let magnitude = if h == 1 { 1 } else { self.rng.gen_range(1..=h) };
        let target = self.current_channel as i64 + sign * magnitude;
        ((target - 1).rem_euclid(self.num_channels as i64) + 1) as Channel
    }

    // ------------------------------------------------------------------------
    // Adaptive map rebuild
    // ------------------------------------------------------------------------

    fn is_rebuild_instant(&self, clock: SimClock) -> bool {
        (clock.now() + self.setup.base_clock as u64) % self.config.map_rebuild_period == 0
    }

    fn rebuild_active_map(&mut self, clock: SimClock) -> Result<()> {
        let decays = self.config.hopping_mode == HoppingMode::AfhRl
            || !self.config.wifi_bands.is_empty();
        if decays {
            self.q_table
                .decay_unusable(&self.active.map, self.config.decay_factor);
        }

        self.exclude_wifi_bands(clock.step)?;

        let k = self.config.effective_usable_count(self.num_channels);
        let top = select_top_k(self.q_table.scores(ActionKind::Default), k)?;
        self.active.map = top.map;
        if self.config.hopping_mode == HoppingMode::AfhRl {
            self.active.best_channel = Some(self.q_table.best_channel());
        }

        self.release_wifi_bands(clock.step, top.average)?;
        self.active.usable_count = self.active.map.usable_count();

        debug!(
            "Agent {}: map rebuilt at step {} usable={} avg={:.5}",
            self.id, clock.step, self.active.usable_count, top.average
        );
        Ok(())
    }

    fn band_channels(&self, index: usize) -> impl Iterator<Item = Channel> {
        let band = self.config.wifi_bands[index];
        let last = (band.end_channel as usize).min(self.num_channels) as Channel;
        band.start_channel..=last
    }

    fn exclude_wifi_bands(&mut self, step: u64) -> Result<()> {
        for index in 0..self.config.wifi_bands.len() {
            let band = self.config.wifi_bands[index];
            if self.wifi_state[index].excluded
                || step < band.on_time + self.config.wifi_policy.exclusion_delay
            {
                continue;
            }
            self.wifi_state[index].excluded = true;
            for ch in self.band_channels(index) {
                self.q_table.set(ActionKind::Default, ch, WIFI_SENTINEL)?;
            }
            info!(
                "Agent {}: excluding WiFi channels {}-{} at step {}",
                self.id, band.start_channel, band.end_channel, step
            );
        }
        Ok(())
    }

    fn release_wifi_bands(&mut self, step: u64, average: f64) -> Result<()> {
        for index in 0..self.config.wifi_bands.len() {
            let band = self.config.wifi_bands[index];
            let state = self.wifi_state[index];
            if !state.excluded
                || state.released
                || step < band.off_time + self.config.wifi_policy.release_delay
            {
                continue;
            }
            self.wifi_state[index].released = true;
            let channels: Vec<Channel> = self.band_channels(index).collect();
            for ch in channels {
                self.active.map.set(ch - 1, true)?;
                let jitter = self.rng.gen_range(0..100) as f64 * 0.00001;
                self.q_table.set(ActionKind::Default, ch, average + jitter)?;
            }
            info!(
                "Agent {}: releasing WiFi channels {}-{} at step {}",
                self.id, band.start_channel, band.end_channel, step
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WifiBand;

    const ADDRESS: DeviceAddress = DeviceAddress(0xbc93_0722_5d70);

    fn agent(config: AgentConfig, num_channels: usize, start_offset: u32) -> AgentController {
        let setup = PiconetSetup::new(ADDRESS, 1000, start_offset);
        AgentController::new(0, config, num_channels, setup, 42).unwrap()
    }

    /// Learn-select-commit for `steps` steps with a fixed collision outcome
    fn drive(agent: &mut AgentController, from: u64, to: u64, collided: bool) {
        for step in from..=to {
            let clock = SimClock::new(step);
            if step > 1 {
                agent.learn(if collided { -1.0 } else { 0.0 }, clock).unwrap();
            }
            let ch = agent.select_channel(clock, collided).unwrap();
            agent.commit_channel(ch);
        }
    }

    #[test]
    fn test_initial_state() {
        let a = agent(AgentConfig::new(HoppingMode::LegacyRl), 79, 5000);
        assert_eq!(a.current_channel(), (5000 % 79 + 1) as Channel);
        assert_eq!(a.last_channel(), None);
        assert_eq!(a.sub_mode(), SubMode::Legacy);
        assert_eq!(a.timer_state(), TimerState::Run);
        assert_eq!(a.instance_time(), 1600 + 5000 % 3200);
        assert_eq!(a.active().usable_count, 79);

        let legacy = agent(AgentConfig::new(HoppingMode::Legacy), 40, 5000);
        assert_eq!(legacy.timer_state(), TimerState::Init);
        assert_eq!(legacy.active().map, ChannelMap::first(40));
    }

    #[test]
    fn test_legacy_follows_kernel() {
        let mut a = agent(AgentConfig::new(HoppingMode::Legacy), 79, 0);
        for step in 1..200 {
            let clock = SimClock::new(step);
            let expected =
                compute_frequency(ADDRESS, clock.hop_clock(1000), &ChannelMap::full(), 79).unwrap() + 1;
            assert_eq!(a.select_channel(clock, false).unwrap(), expected);
        }
    }

    #[test]
    fn test_legacy_target_uses_classical_pick() {
        let mut a = agent(AgentConfig::new(HoppingMode::Legacy), 79, 0);
        let clock = SimClock::new(2);
        let pick = a.full_band_hop(clock).unwrap();
        a.q_table_mut().set(ActionKind::Default, pick, 1.0).unwrap();
        let current = a.current_channel();

        let q = a.learn(0.0, clock).unwrap();
        let expected = if current == pick { 1.0 + 0.1 * (0.9 - 1.0) } else { 0.1 * 0.9 };
        assert!((q - expected).abs() < 1e-12);
    }

    #[test]
    fn test_update_sign_and_cumulative() {
        let mut a = agent(AgentConfig::new(HoppingMode::DfhRl), 79, 0);
        let ch = a.current_channel();
        let before = a.q_table().get(ActionKind::Default, ch);
        a.learn(-1.0, SimClock::new(2)).unwrap();
        assert!(a.q_table().get(ActionKind::Default, ch) < before);
        assert_eq!(a.cumulative_reward(), -1.0);

        a.learn(0.0, SimClock::new(3)).unwrap();
        assert!((a.cumulative_reward() + 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_state_machine_cycle() {
        let config = AgentConfig::new(HoppingMode::LegacyRl).with_learning(0.1, 0.9, 0.0);
        let mut a = agent(config, 79, 0);
        assert_eq!(a.instance_time(), 1600);

        let mut transitions = vec![(a.timer_state(), a.instance_time())];
        for step in 1..=6000 {
            drive(&mut a, step, step, false);
            let state = (a.timer_state(), a.instance_time());
            if transitions.last().map(|t| t.0) != Some(state.0) {
                transitions.push(state);
            }
        }

        let states: Vec<TimerState> = transitions.iter().map(|t| t.0).collect();
        assert_eq!(
            &states[..5],
            &[
                TimerState::Run,
                TimerState::WaitArrival,
                TimerState::WaitActivation,
                TimerState::Run,
                TimerState::WaitArrival,
            ]
        );
        // first expiry at slot 1600, arrival deadline 240 slots later
        assert_eq!(transitions[1].1, 1600 + 240);
        assert_eq!(transitions[3].1, 1842 + 3200);
        for pair in transitions.windows(2) {
            assert!(pair[1].1 >= pair[0].1);
        }
        assert!(transitions[3].1 > transitions[1].1);
        assert!(transitions[4].1 > transitions[3].1);
        assert_eq!(a.sub_mode(), SubMode::RlActive);
    }

    #[test]
    fn test_commit_is_atomic() {
        let config = AgentConfig::new(HoppingMode::AfhRl).with_learning(0.1, 0.9, 0.0);
        let mut a = agent(config, 79, 0);
        // stop short of the first expiry at slot 1600 (step 801)
        drive(&mut a, 1, 800, false);
        a.q_table_mut().set(ActionKind::Default, 33, 5.0).unwrap();

        drive(&mut a, 801, 801, false);
        assert_eq!(a.timer_state(), TimerState::WaitArrival);
        assert_eq!(a.candidate().best_channel, Some(33));
        assert_eq!(a.candidate().usable_count, 20);
        // not visible before activation
        assert_ne!(a.active().best_channel, Some(33));

        drive(&mut a, 802, 922, false);
        assert_eq!(a.timer_state(), TimerState::Run);
        assert_eq!(a.active().best_channel, Some(33));
        assert_eq!(a.active().map, a.candidate().map);
        assert_eq!(a.sub_mode(), SubMode::RlActive);
    }

    #[test]
    fn test_forced_downgrade() {
        let config = AgentConfig::new(HoppingMode::LegacyRl).with_learning(0.1, 0.9, 0.0);
        let mut a = agent(config, 79, 0);
        drive(&mut a, 1, 1000, false);
        assert_eq!(a.sub_mode(), SubMode::RlActive);
        let last_ok = a.last_succeed_time();

        // collisions within the timeout keep the learned policy
        let mut step = 1001;
        while SimClock::new(step).now() - last_ok <= 80 {
            drive(&mut a, step, step, true);
            assert_eq!(a.sub_mode(), SubMode::RlActive);
            step += 1;
        }

        let clock = SimClock::new(step);
        a.learn(-1.0, clock).unwrap();
        let ch = a.select_channel(clock, true).unwrap();
        assert_eq!(a.sub_mode(), SubMode::Legacy);
        assert_eq!(a.timer_state(), TimerState::WaitArrival);
        assert_eq!(a.instance_time(), clock.now() + 240);
        assert_eq!(ch, a.full_band_hop(clock).unwrap());
    }

    #[test]
    fn test_wait_arrival_stalls_on_collisions() {
        let mut a = agent(AgentConfig::new(HoppingMode::DfhRl), 79, 0);
        drive(&mut a, 1, 801, false);
        assert_eq!(a.timer_state(), TimerState::WaitArrival);

        // sub-mode is still Legacy, so the downgrade rule never fires
        drive(&mut a, 802, 3000, true);
        assert_eq!(a.timer_state(), TimerState::WaitArrival);
        assert_eq!(a.sub_mode(), SubMode::Legacy);
    }

    #[test]
    fn test_diffusive_exploration_bounds() {
        let config = AgentConfig::new(HoppingMode::DfhRl)
            .with_learning(0.1, 0.9, 1.0)
            .with_max_offset(3);
        let mut a = agent(config, 20, 0);
        drive(&mut a, 1, 922, false);
        assert_eq!(a.sub_mode(), SubMode::RlActive);

        for step in 923..1500 {
            let clock = SimClock::new(step);
            let from = a.current_channel() as i64;
            let ch = a.select_channel(clock, false).unwrap();
            assert!((1..=20).contains(&ch));
            let diff = (ch as i64 - from).rem_euclid(20);
            let offset = diff.min(20 - diff);
            assert!((1..=3).contains(&offset), "moved {} -> {}", from, ch);
            a.commit_channel(ch);
        }
    }

    #[test]
    fn test_single_offset_diffusion() {
        let config = AgentConfig::new(HoppingMode::DfhRl)
            .with_learning(0.1, 0.9, 1.0)
            .with_max_offset(1);
        let mut a = agent(config, 10, 0);
        drive(&mut a, 1, 922, false);
        for step in 923..1000 {
            let from = a.current_channel() as i64;
            let ch = a.select_channel(SimClock::new(step), false).unwrap() as i64;
            assert!(ch == from % 10 + 1 || ch == (from + 8) % 10 + 1);
            a.commit_channel(ch as Channel);
        }
    }

    #[test]
    fn test_afh_rebuild_keeps_target() {
        let mut a = agent(AgentConfig::new(HoppingMode::Afh), 79, 0);
        for ch in 1..=40u8 {
            a.q_table_mut().set(ActionKind::Default, ch, -0.5).unwrap();
        }
        let hop = |a: &mut AgentController, steps: std::ops::RangeInclusive<u64>| {
            for step in steps {
                let ch = a.select_channel(SimClock::new(step), false).unwrap();
                a.commit_channel(ch);
            }
        };
        // base clock 1000: rebuild when now + 1000 is a multiple of 3200, step 1101
        hop(&mut a, 1..=1100);
        assert_eq!(a.active().usable_count, 79);

        hop(&mut a, 1101..=1101);
        assert_eq!(a.active().usable_count, 20);
        assert_eq!(a.active().map.usable_count(), 20);
        assert!((0..40).all(|air| !a.active().map.is_usable(air)));

        for step in 1102..1300 {
            let clock = SimClock::new(step);
            let ch = a.select_channel(clock, false).unwrap();
            assert!(a.active().map.is_usable(ch - 1));
        }
    }

    #[test]
    fn test_wifi_exclusion_and_release() {
        let mut config = AgentConfig::new(HoppingMode::Afh)
            .with_wifi_bands(vec![WifiBand::new(25, 47, 1, 2000)]);
        config.wifi_policy.exclusion_delay = 0;
        config.wifi_policy.release_delay = 0;
        let setup = PiconetSetup::new(ADDRESS, 0, 0);
        let mut a = AgentController::new(1, config, 79, setup, 7).unwrap();

        drive(&mut a, 1, 1, false);
        assert_eq!(a.q_table().get(ActionKind::Default, 30), WIFI_SENTINEL);
        assert_eq!(a.active().usable_count, 20);
        assert!((24..=46).all(|air| !a.active().map.is_usable(air)));

        // step 1601 rebuilds before the band goes off
        drive(&mut a, 2, 1601, false);
        assert!((24..=46).all(|air| !a.active().map.is_usable(air)));

        drive(&mut a, 1602, 3201, false);
        assert_eq!(a.active().usable_count, 20 + 23);
        assert!((24..=46).all(|air| a.active().map.is_usable(air)));
        let q = a.q_table().get(ActionKind::Default, 30);
        assert!(q > -0.01 && q < 0.01);
    }

    #[test]
    fn test_afh_rl_falls_back_without_best() {
        let config = AgentConfig::new(HoppingMode::AfhRl).with_learning(0.1, 0.9, 0.0);
        let mut a = agent(config, 79, 0);
        assert_eq!(a.active().best_channel, None);
        let clock = SimClock::new(1);
        let ch = a.select_channel(clock, false).unwrap();
        // still in the Legacy sub-mode before the first activation
        assert_eq!(ch, a.full_band_hop(clock).unwrap());
    }
}
