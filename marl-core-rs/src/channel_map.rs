//! Usable-channel maps and top-K map construction

use crate::error::{Error, Result};
use crate::types::NUM_CHANNELS;
use std::cmp::Ordering;
use std::fmt;

/// Boolean usable flag per air channel (0..=78).
///
/// The map does not check itself against the usable count handed to the
/// hop kernel; the kernel does that on every hop.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ChannelMap {
    usable: [bool; NUM_CHANNELS],
}

impl ChannelMap {
    /// Map with no usable channel
    pub fn empty() -> Self {
        Self {
            usable: [false; NUM_CHANNELS],
        }
    }

    /// All 79 channels usable
    pub fn full() -> Self {
        Self {
            usable: [true; NUM_CHANNELS],
        }
    }

    /// The lowest `n` air channels usable (a band of `n` channels)
    pub fn first(n: usize) -> Self {
        let mut map = Self::empty();
        for flag in map.usable.iter_mut().take(n) {
            *flag = true;
        }
        map
    }

    pub fn from_flags(flags: [bool; NUM_CHANNELS]) -> Self {
        Self { usable: flags }
    }

    pub fn is_usable(&self, channel: u8) -> bool {
        self.usable
            .get(channel as usize)
            .copied()
            .unwrap_or(false)
    }

    pub fn set(&mut self, channel: u8, usable: bool) -> Result<()> {
        let slot = self
            .usable
            .get_mut(channel as usize)
            .ok_or(Error::ChannelOutOfRange(channel as i64))?;
        *slot = usable;
        Ok(())
    }

    pub fn usable_count(&self) -> usize {
        self.usable.iter().filter(|u| **u).count()
    }

    /// Usable air channels in ascending order
    pub fn usable_channels(&self) -> impl Iterator<Item = u8> + '_ {
        self.usable
            .iter()
            .enumerate()
            .filter(|(_, u)| **u)
            .map(|(i, _)| i as u8)
    }

    pub fn as_flags(&self) -> &[bool; NUM_CHANNELS] {
        &self.usable
    }
}

impl Default for ChannelMap {
    fn default() -> Self {
        Self::full()
    }
}

impl fmt::Display for ChannelMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for usable in self.usable.iter() {
            write!(f, "{}", if *usable { '1' } else { '0' })?;
        }
        Ok(())
    }
}

impl fmt::Debug for ChannelMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChannelMap({}, n={})", self, self.usable_count())
    }
}

/// Result of a top-K selection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TopK {
    pub map: ChannelMap,
    /// Mean score of the kept channels
    pub average: f64,
}

/// Keep the `k` highest-scored channels.
///
/// `scores[p]` is the score of air channel `p`; only the first
/// `scores.len()` channels take part. Channels are stable-sorted ascending
/// by score, so among equal scores the higher channel index ranks higher.
pub fn select_top_k(scores: &[f64], k: usize) -> Result<TopK> {
    if k == 0 || scores.is_empty() {
        return Err(Error::NoUsableChannels);
    }
    if scores.len() > NUM_CHANNELS || k > scores.len() {
        return Err(Error::InvalidConfig(format!(
            "cannot keep {} of {} channels",
            k,
            scores.len()
        )));
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|a, b| {
        scores[*a]
            .partial_cmp(&scores[*b])
            .unwrap_or(Ordering::Equal)
    });

    let mut map = ChannelMap::empty();
    let mut sum = 0.0;
    for &index in &order[order.len() - k..] {
        map.usable[index] = true;
        sum += scores[index];
    }

    Ok(TopK {
        map,
        average: sum / k as f64,
    })
}
