//! AFH remapping onto the usable channel set

use crate::channel_map::ChannelMap;
use crate::error::{Error, Result};
use crate::types::NUM_CHANNELS;

/// Inputs to the remap stage, taken from the basic hop computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemapInputs {
    /// Butterfly output, before E/F/Y2 are added
    pub permuted: u8,
    pub e: u8,
    /// `16 * CLK[27:7] mod usable_count`
    pub f_prime: u32,
    pub y2: u8,
}

/// Usable channels in remap order: even channels ascending, then odd ones.
pub fn remap_sequence(map: &ChannelMap) -> Vec<u8> {
    let evens = (0..NUM_CHANNELS as u8).step_by(2);
    let odds = (1..NUM_CHANNELS as u8).step_by(2);
    evens
        .chain(odds)
        .filter(|ch| map.is_usable(*ch))
        .collect()
}

/// Pick the replacement channel for a hop that landed on an unusable one.
pub fn remap(inputs: RemapInputs, map: &ChannelMap, usable_count: usize) -> Result<u8> {
    let sequence = remap_sequence(map);
    if sequence.len() != usable_count {
        return Err(Error::UsableCountMismatch {
            declared: usable_count,
            actual: sequence.len(),
        });
    }
    if sequence.is_empty() {
        return Err(Error::NoUsableChannels);
    }

    let k = (inputs.permuted as u32 + inputs.e as u32 + inputs.f_prime + inputs.y2 as u32)
        % usable_count as u32;
    Ok(sequence[k as usize])
}
