//! MARL Core Library
//!
//! Bit-exact Bluetooth basic/adaptive hop selection plus a per-piconet
//! Q-learning controller that decides which channels a piconet should use.
//! The simulation scheduler drives many piconets in lockstep so their
//! coexistence under mutual and WiFi interference can be measured.
//!
//! Layering, leaves first:
//! - `hopping` / `remap`: hop kernel and AFH remapping
//! - `channel_map`: usable-channel maps and top-K selection
//! - `qtable` / `agent`: learning state and the hopping-mode state machine
//! - `reward` / `physical`: collision outcome and link models
//! - `stats` / `simulation`: step scheduler and collision counters

pub mod types;
pub mod error;
pub mod hopping;
pub mod remap;
pub mod channel_map;
pub mod qtable;
pub mod config;
pub mod agent;
pub mod physical;
pub mod reward;
pub mod stats;
pub mod simulation;

pub use types::*;
pub use error::{Error, ErrorKind, Result};
pub use hopping::{compute_frequency, compute_hop, Hop};
pub use channel_map::{select_top_k, ChannelMap, TopK};
pub use qtable::QTable;
pub use config::{AgentConfig, LinkModelKind, PiconetConfig, SimulationConfig, WifiBand, WifiPolicy};
pub use agent::{AgentController, MapBuffer, PiconetSetup};
pub use reward::{CollisionState, LinkModel, RewardEvaluator, SameChannelModel};
pub use physical::{Placement, PlacementArea, RayleighFadingModel};
pub use stats::{CollisionStats, NullSink, RunSummary, StatisticsSink, StepReport};
pub use simulation::{Simulation, DEFAULT_ADDRESSES};
