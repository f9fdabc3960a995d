//! Tabular action values per (action kind, channel)
//!
//! Channels are 1-based. Column 0 is kept as a reserved entry that is never
//! updated; it stays at 0.0 and acts as a floor for the bootstrap target.

use crate::channel_map::ChannelMap;
use crate::error::{Error, Result};
use crate::types::{ActionKind, Channel, NUM_CHANNELS};

const KINDS: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct QTable {
    num_channels: usize,
    values: [[f64; NUM_CHANNELS + 1]; KINDS],
}

impl QTable {
    /// Zeroed table over channels `1..=num_channels`
    pub fn new(num_channels: usize) -> Self {
        Self {
            num_channels: num_channels.min(NUM_CHANNELS),
            values: [[0.0; NUM_CHANNELS + 1]; KINDS],
        }
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    fn check(&self, channel: Channel) -> Result<usize> {
        let index = channel as usize;
        if index == 0 || index > self.num_channels {
            return Err(Error::ChannelOutOfRange(channel as i64));
        }
        Ok(index)
    }

    pub fn get(&self, kind: ActionKind, channel: Channel) -> f64 {
        self.values[kind as usize]
            .get(channel as usize)
            .copied()
            .unwrap_or(0.0)
    }

    pub fn set(&mut self, kind: ActionKind, channel: Channel, value: f64) -> Result<()> {
        let index = self.check(channel)?;
        self.values[kind as usize][index] = value;
        Ok(())
    }

    /// Scores of channels `1..=num_channels`, position `p` holding channel `p + 1`
    pub fn scores(&self, kind: ActionKind) -> &[f64] {
        &self.values[kind as usize][1..=self.num_channels]
    }

    /// Highest-valued channel, the lowest channel winning ties
    pub fn best_channel(&self) -> Channel {
        let row = &self.values[ActionKind::Default as usize];
        let mut best = 1;
        for ch in 1..=self.num_channels {
            if row[ch] > row[best] {
                best = ch;
            }
        }
        best as Channel
    }

    /// Bootstrap column for the update target.
    ///
    /// The scan starts at the reserved column, so a table whose values are all
    /// negative bootstraps off 0.0 rather than its best channel.
    pub fn bootstrap_index(&self) -> usize {
        let row = &self.values[ActionKind::Default as usize];
        let mut best = 0;
        for ch in 1..=self.num_channels {
            if row[ch] > row[best] {
                best = ch;
            }
        }
        best
    }

    /// Value at the bootstrap column
    pub fn bootstrap_value(&self) -> f64 {
        self.values[ActionKind::Default as usize][self.bootstrap_index()]
    }

    /// One Q-learning step on `channel`, returning the new value.
    pub fn update(
        &mut self,
        channel: Channel,
        reward: f64,
        next_value: f64,
        alpha: f64,
        gamma: f64,
    ) -> Result<f64> {
        let index = self.check(channel)?;
        let q = &mut self.values[ActionKind::Default as usize][index];
        *q += alpha * (reward + gamma * next_value - *q);
        Ok(*q)
    }

    /// Shrink negative values of channels currently off the map.
    pub fn decay_unusable(&mut self, map: &ChannelMap, factor: f64) {
        let row = &mut self.values[ActionKind::Default as usize];
        for ch in 1..=self.num_channels {
            if !map.is_usable((ch - 1) as u8) && row[ch] < 0.0 {
                row[ch] *= factor;
            }
        }
    }
}
