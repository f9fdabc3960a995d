//! Core types for the hopping simulation

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Constants
// ============================================================================

/// Channels in the standard Bluetooth band (0..=78 on air)
pub const NUM_CHANNELS: usize = 79;

/// Channels below this index on the permuted sequence land on even frequencies
pub const EVEN_HALF: u32 = 40;

/// Address bits used by hop selection (UAP/LAP)
pub const ADDRESS_HOP_MASK: u64 = 0xFFFF_FFFF;

/// Slots advanced per simulation step (one TX/RX pair)
pub const SLOTS_PER_STEP: u64 = 2;

/// Agent-facing channel number, 1-based (channel `c` is air channel `c - 1`)
pub type Channel = u8;

/// Agent identifier, 0-based index into the scheduler's agent list
pub type AgentId = usize;

// ============================================================================
// Device address
// ============================================================================

/// 48-bit Bluetooth device address of a piconet's central.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceAddress(pub u64);

impl DeviceAddress {
    pub fn new(raw: u64) -> Self {
        Self(raw & 0xFFFF_FFFF_FFFF)
    }

    /// The part of the address fed into hop selection
    pub fn hop_bits(self) -> u32 {
        (self.0 & ADDRESS_HOP_MASK) as u32
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:012x}", self.0)
    }
}

impl FromStr for DeviceAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed)
            .replace(':', "");
        u64::from_str_radix(&digits, 16)
            .map(DeviceAddress::new)
            .map_err(|_| Error::InvalidConfig(format!("bad device address: {}", s)))
    }
}

// ============================================================================
// Simulation clock
// ============================================================================

/// Global step counter, 1-based. Shared read-only by all agents in a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SimClock {
    pub step: u64,
}

impl SimClock {
    pub fn new(step: u64) -> Self {
        Self { step }
    }

    /// Slot time at the start of this step
    pub fn now(self) -> u64 {
        self.step.saturating_sub(1) * SLOTS_PER_STEP
    }

    /// Native clock handed to the hop kernel for a piconet with `base_clock`.
    ///
    /// The kernel reads CLK in half-slot units, hence the shift.
    pub fn hop_clock(self, base_clock: u32) -> u32 {
        (self.now().wrapping_add(base_clock as u64) << 1) as u32
    }
}

// ============================================================================
// Modes and states
// ============================================================================

/// Configured hopping strategy of a piconet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HoppingMode {
    /// Classical 79-channel hopping, Q-table learned but never consulted
    Legacy,
    /// Classical hopping blended with the table's best channel
    LegacyRl,
    /// Adaptive hopping over a periodically rebuilt top-K map
    Afh,
    /// Adaptive map plus table-driven best channel
    AfhRl,
    /// Diffusive moves around the previous channel
    DfhRl,
}

impl HoppingMode {
    pub const ALL: [HoppingMode; 5] = [
        HoppingMode::Legacy,
        HoppingMode::LegacyRl,
        HoppingMode::Afh,
        HoppingMode::AfhRl,
        HoppingMode::DfhRl,
    ];

    /// Modes driven by the timer state machine
    pub fn is_learning(self) -> bool {
        matches!(
            self,
            HoppingMode::LegacyRl | HoppingMode::AfhRl | HoppingMode::DfhRl
        )
    }

    /// Modes that hop over a rebuilt channel map
    pub fn is_adaptive(self) -> bool {
        matches!(self, HoppingMode::Afh | HoppingMode::AfhRl)
    }

    pub fn index(self) -> u8 {
        match self {
            HoppingMode::Legacy => 0,
            HoppingMode::LegacyRl => 1,
            HoppingMode::Afh => 2,
            HoppingMode::AfhRl => 3,
            HoppingMode::DfhRl => 4,
        }
    }
}

impl TryFrom<u8> for HoppingMode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(HoppingMode::Legacy),
            1 => Ok(HoppingMode::LegacyRl),
            2 => Ok(HoppingMode::Afh),
            3 => Ok(HoppingMode::AfhRl),
            4 => Ok(HoppingMode::DfhRl),
            other => Err(Error::InvalidHoppingMode(other.to_string())),
        }
    }
}

impl FromStr for HoppingMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "legacy" | "lfh" | "0" => Ok(HoppingMode::Legacy),
            "legacy-rl" | "lfh-rl" | "1" => Ok(HoppingMode::LegacyRl),
            "afh" | "2" => Ok(HoppingMode::Afh),
            "afh-rl" | "3" => Ok(HoppingMode::AfhRl),
            "dfh-rl" | "dfh" | "4" => Ok(HoppingMode::DfhRl),
            _ => Err(Error::InvalidHoppingMode(s.to_string())),
        }
    }
}

impl fmt::Display for HoppingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HoppingMode::Legacy => write!(f, "LFH"),
            HoppingMode::LegacyRl => write!(f, "LFH-RL"),
            HoppingMode::Afh => write!(f, "AFH"),
            HoppingMode::AfhRl => write!(f, "AFH-RL"),
            HoppingMode::DfhRl => write!(f, "DFH-RL"),
        }
    }
}

/// Behavior the agent currently follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubMode {
    Legacy,
    RlActive,
}

/// Timer state of the learned-policy update cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerState {
    Init,
    /// Update announced, waiting for the peer to confirm delivery
    WaitArrival,
    /// Delivery confirmed, switch happens at the next expiry
    WaitActivation,
    Run,
}

impl fmt::Display for TimerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerState::Init => write!(f, "INIT"),
            TimerState::WaitArrival => write!(f, "WAIT_ARRIVAL"),
            TimerState::WaitActivation => write!(f, "WAIT_ACTIVATION"),
            TimerState::Run => write!(f, "RUN"),
        }
    }
}

/// Row selector of the Q-table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Table-driven action (also used by the adaptive map)
    Default = 0,
    Diffusive = 1,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hop_clock() {
        let clock = SimClock::new(1);
        assert_eq!(clock.now(), 0);
        assert_eq!(clock.hop_clock(1000), 2000);

        let clock = SimClock::new(3);
        assert_eq!(clock.now(), 4);
        assert_eq!(clock.hop_clock(1000), 2008);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("afh-rl".parse::<HoppingMode>().unwrap(), HoppingMode::AfhRl);
        assert_eq!("DFH-RL".parse::<HoppingMode>().unwrap(), HoppingMode::DfhRl);
        assert_eq!("0".parse::<HoppingMode>().unwrap(), HoppingMode::Legacy);
        assert!("shuffle".parse::<HoppingMode>().is_err());
        assert!(HoppingMode::try_from(5).is_err());

        for mode in HoppingMode::ALL {
            assert_eq!(HoppingMode::try_from(mode.index()).unwrap(), mode);
        }
    }

    #[test]
    fn test_mode_serialization() {
        let json = serde_json::to_string(&HoppingMode::LegacyRl).unwrap();
        assert_eq!(json, "\"legacy-rl\"");
        let parsed: HoppingMode = serde_json::from_str("\"afh\"").unwrap();
        assert_eq!(parsed, HoppingMode::Afh);
    }

    #[test]
    fn test_device_address() {
        let addr: DeviceAddress = "0xbc9307225d70".parse().unwrap();
        assert_eq!(addr.0, 0xbc93_0722_5d70);
        assert_eq!(addr.hop_bits(), 0x0722_5d70);
        assert_eq!(addr.to_string(), "bc9307225d70");

        let colon: DeviceAddress = "bc:93:07:22:5d:70".parse().unwrap();
        assert_eq!(colon, addr);
    }
}
