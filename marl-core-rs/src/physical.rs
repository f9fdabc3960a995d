//! Physical-layer link model: log-distance path loss with Rayleigh fading
//!
//! Used to decide whether a same-channel contact actually destroyed a packet.
//! Geometry models a crowded train car: piconets are placed with a minimum
//! separation and each receiver hears its own device at pocket distance.

use crate::reward::LinkModel;
use crate::types::AgentId;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Path loss exponent for a crowded indoor space
pub const PATH_LOSS_EXPONENT: f64 = 4.5;
/// Path loss at the 1 m reference distance (dB)
pub const REFERENCE_PATH_LOSS_DB: f64 = 40.0;
/// Background noise (dBm)
pub const THERMAL_NOISE_DBM: f64 = -95.0;
/// Minimum SINR for a successful packet (dB)
pub const SINR_THRESHOLD_DB: f64 = 7.0;
/// Distance between a receiver and its own device (m)
pub const OWN_DEVICE_DISTANCE_M: f64 = 1.0;
/// Extra loss on the own-device link through the body (dB)
pub const BODY_ATTENUATION_DB: f64 = 15.0;
/// Class 2 transmit power (dBm)
pub const DEFAULT_TX_POWER_DBM: f64 = 4.0;
/// Distances are clamped to this before computing path loss (m)
const MIN_PATH_DISTANCE_M: f64 = 0.1;
const MAX_PLACEMENT_RETRIES: usize = 1000;

/// Position and power of one piconet
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub tx_power_dbm: f64,
}

impl Placement {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            tx_power_dbm: DEFAULT_TX_POWER_DBM,
        }
    }

    pub fn distance(&self, other: &Placement) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Rectangle piconets are placed in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacementArea {
    pub length_m: f64,
    pub width_m: f64,
    pub min_separation_m: f64,
}

impl Default for PlacementArea {
    /// One door section of a subway car
    fn default() -> Self {
        Self {
            length_m: 16.5 / 4.8,
            width_m: 3.1,
            min_separation_m: 0.46,
        }
    }
}

impl PlacementArea {
    /// Place `count` piconets uniformly, keeping the minimum separation when
    /// possible. After too many rejected draws the last draw is accepted.
    pub fn generate(&self, count: usize, rng: &mut StdRng) -> Vec<Placement> {
        let mut placed: Vec<Placement> = Vec::with_capacity(count);
        for index in 0..count {
            let mut candidate = self.draw(rng);
            let mut retries = 0;
            while placed
                .iter()
                .any(|p| p.distance(&candidate) < self.min_separation_m)
            {
                retries += 1;
                if retries > MAX_PLACEMENT_RETRIES {
                    warn!(
                        "Placement: no valid position for piconet {} after {} retries, placing anyway",
                        index, MAX_PLACEMENT_RETRIES
                    );
                    break;
                }
                candidate = self.draw(rng);
            }
            placed.push(candidate);
        }
        placed
    }

    fn draw(&self, rng: &mut StdRng) -> Placement {
        Placement::new(
            rng.gen::<f64>() * self.length_m,
            rng.gen::<f64>() * self.width_m,
        )
    }
}

pub fn path_loss_db(distance_m: f64) -> f64 {
    let d = distance_m.max(MIN_PATH_DISTANCE_M);
    REFERENCE_PATH_LOSS_DB + 10.0 * PATH_LOSS_EXPONENT * d.log10()
}

pub fn dbm_to_mw(dbm: f64) -> f64 {
    10f64.powf(dbm / 10.0)
}

/// SINR-based packet outcome under Rayleigh fading
#[derive(Debug, Clone)]
pub struct RayleighFadingModel {
    rng: StdRng,
    placements: Vec<Placement>,
}

impl RayleighFadingModel {
    pub fn new(placements: Vec<Placement>, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            placements,
        }
    }

    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    /// Fading gain in dB, exponential power distribution
    fn fading_db(&mut self) -> f64 {
        // open interval (0, 1) keeps the logarithm finite
        let u: f64 = self.rng.gen_range(f64::EPSILON..1.0);
        10.0 * (-u.ln()).log10()
    }

    fn signal_dbm(&mut self, receiver: AgentId, transmitter: AgentId) -> Option<f64> {
        let rx = *self.placements.get(receiver)?;
        let tx = *self.placements.get(transmitter)?;
        let fading = self.fading_db();
        if receiver == transmitter {
            Some(
                tx.tx_power_dbm - path_loss_db(OWN_DEVICE_DISTANCE_M) - BODY_ATTENUATION_DB
                    + fading,
            )
        } else {
            Some(tx.tx_power_dbm - path_loss_db(rx.distance(&tx)) + fading)
        }
    }
}

impl LinkModel for RayleighFadingModel {
    fn contact_is_collision(&self) -> bool {
        false
    }

    fn outcome(&mut self, receiver: AgentId, transmitter: AgentId, interferers: &[AgentId]) -> bool {
        let signal_dbm = match self.signal_dbm(receiver, transmitter) {
            Some(s) => s,
            None => return false,
        };
        let rx = match self.placements.get(receiver) {
            Some(p) => *p,
            None => return false,
        };

        let mut interference_mw = 0.0;
        for &id in interferers {
            if let Some(other) = self.placements.get(id).copied() {
                let power = other.tx_power_dbm - path_loss_db(other.distance(&rx)) + self.fading_db();
                interference_mw += dbm_to_mw(power);
            }
        }

        let sinr = dbm_to_mw(signal_dbm) / (interference_mw + dbm_to_mw(THERMAL_NOISE_DBM));
        sinr >= dbm_to_mw(SINR_THRESHOLD_DB)
    }
}
