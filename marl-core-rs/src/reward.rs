//! Collision outcome of each agent's chosen channel
//!
//! Checks run in agent order inside a step. An agent's new channel is
//! compared with every other agent's published channel, which for agents
//! earlier in the order is already this step's choice and for later agents
//! is still the previous one. A contact marks both sides.

use crate::config::WifiBand;
use crate::types::{AgentId, Channel};

/// Decides whether a receiver got its packet despite interference.
pub trait LinkModel {
    /// Whether a same-channel contact is a collision without further checks
    fn contact_is_collision(&self) -> bool {
        true
    }

    /// Packet outcome at `receiver` from `transmitter` while `interferers` transmit
    fn outcome(&mut self, receiver: AgentId, transmitter: AgentId, interferers: &[AgentId]) -> bool;
}

/// Same channel means collision
#[derive(Debug, Clone, Copy, Default)]
pub struct SameChannelModel;

impl LinkModel for SameChannelModel {
    fn outcome(&mut self, _receiver: AgentId, _transmitter: AgentId, interferers: &[AgentId]) -> bool {
        interferers.is_empty()
    }
}

/// Per-agent collision flags and this step's counters
#[derive(Debug, Clone, Default)]
pub struct CollisionState {
    pub collided: Vec<bool>,
    /// Collisions counted for each agent during the current step
    pub hits: Vec<u32>,
    pub interferers: Vec<Vec<AgentId>>,
    /// Collision came from WiFi, the link model is not consulted
    pub wifi_hit: Vec<bool>,
}

impl CollisionState {
    pub fn new(agents: usize) -> Self {
        Self {
            collided: vec![false; agents],
            hits: vec![0; agents],
            interferers: vec![Vec::new(); agents],
            wifi_hit: vec![false; agents],
        }
    }

    pub fn begin_step(&mut self) {
        self.hits.iter_mut().for_each(|h| *h = 0);
    }
}

/// Reward for the previous action
pub fn reward_for(collided: bool) -> f64 {
    if collided {
        -1.0
    } else {
        0.0
    }
}

pub struct RewardEvaluator {
    link_model: Box<dyn LinkModel>,
    wifi_bands: Vec<WifiBand>,
}

impl RewardEvaluator {
    pub fn new(link_model: Box<dyn LinkModel>, wifi_bands: Vec<WifiBand>) -> Self {
        Self {
            link_model,
            wifi_bands,
        }
    }

    pub fn same_channel(wifi_bands: Vec<WifiBand>) -> Self {
        Self::new(Box::new(SameChannelModel), wifi_bands)
    }

    /// Whether a WiFi band occupies `channel` at `step`
    pub fn wifi_active(&self, channel: Channel, step: u64) -> bool {
        self.wifi_bands
            .iter()
            .any(|band| band.is_active(step) && band.contains(channel))
    }

    /// Whether any WiFi band is on at `step`
    pub fn wifi_window(&self, step: u64) -> bool {
        self.wifi_bands.iter().any(|band| band.is_active(step))
    }

    /// Check `agent`'s new `channel` and return its reward.
    pub fn evaluate(
        &self,
        agent: AgentId,
        channel: Channel,
        step: u64,
        published: &[Channel],
        state: &mut CollisionState,
    ) -> f64 {
        state.collided[agent] = false;
        state.wifi_hit[agent] = false;
        state.interferers[agent].clear();

        if self.wifi_active(channel, step) {
            state.hits[agent] += 1;
            state.collided[agent] = true;
            state.wifi_hit[agent] = true;
            return reward_for(true);
        }

        let counts = self.link_model.contact_is_collision();
        let mut hit = false;
        for (other, &other_channel) in published.iter().enumerate() {
            if other == agent || other_channel != channel {
                continue;
            }
            hit = true;

            for (id, peer) in [(agent, other), (other, agent)] {
                if !state.collided[id] {
                    if counts {
                        state.hits[id] += 1;
                    }
                    state.collided[id] = true;
                }
                if !state.interferers[id].contains(&peer) {
                    state.interferers[id].push(peer);
                }
            }
        }

        reward_for(hit)
    }

    /// Run the link model on a pending contact collision of `agent`.
    /// Returns whether the agent still counts as collided.
    pub fn confirm(&mut self, agent: AgentId, state: &mut CollisionState) -> bool {
        if !state.collided[agent] || state.wifi_hit[agent] || self.link_model.contact_is_collision() {
            return state.collided[agent];
        }

        if self
            .link_model
            .outcome(agent, agent, &state.interferers[agent])
        {
            state.collided[agent] = false;
            false
        } else {
            state.hits[agent] += 1;
            true
        }
    }
}
