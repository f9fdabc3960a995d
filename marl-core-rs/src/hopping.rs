//! Bluetooth connection-state hop selection
//!
//! Pure functions: the same address, clock, map and usable count always give
//! the same air channel. Clock bits above 27 are ignored.

use crate::channel_map::ChannelMap;
use crate::error::{Error, Result};
use crate::remap::{remap, RemapInputs};
use crate::types::{DeviceAddress, EVEN_HALF, NUM_CHANNELS};

/// Butterfly stages as (control bit of P, wire a, wire b), in application order
const BUTTERFLY: [(u8, u8, u8); 14] = [
    (12, 0, 3),
    (13, 1, 2),
    (10, 2, 4),
    (11, 1, 3),
    (8, 1, 4),
    (9, 0, 3),
    (6, 0, 2),
    (7, 3, 4),
    (4, 0, 4),
    (5, 1, 3),
    (2, 1, 2),
    (3, 3, 4),
    (0, 0, 1),
    (1, 2, 3),
];

#[inline]
fn gather(value: u32, from: u32, to: u32) -> u32 {
    ((value >> from) & 1) << to
}

/// Intermediate terms of the hop selection kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HopInputs {
    pub x: u32,
    pub y1: u32,
    pub y2: u32,
    pub a: u32,
    pub b: u32,
    pub c: u32,
    pub d: u32,
    pub e: u32,
    pub f: u32,
    pub f_prime: u32,
}

impl HopInputs {
    /// Derive the kernel terms. `usable_count` must be nonzero.
    pub fn derive(address: DeviceAddress, clock: u32, usable_count: usize) -> Self {
        let addr = address.hop_bits();

        let x = (clock >> 2) & 0x1F;
        let y1 = (clock >> 1) & 1;
        let y2 = 32 * y1;
        let a = ((addr >> 23) & 0x1F) ^ ((clock >> 21) & 0x1F);
        let b = (addr >> 19) & 0x0F;
        let c = (gather(addr, 8, 4)
            | gather(addr, 6, 3)
            | gather(addr, 4, 2)
            | gather(addr, 2, 1)
            | gather(addr, 0, 0))
            ^ ((clock >> 16) & 0x1F);
        let d = ((addr >> 10) & 0x1FF) ^ ((clock >> 7) & 0x1FF);
        let e = gather(addr, 13, 6)
            | gather(addr, 11, 5)
            | gather(addr, 9, 4)
            | gather(addr, 7, 3)
            | gather(addr, 5, 2)
            | gather(addr, 3, 1)
            | gather(addr, 1, 0);

        let clk_27_7 = (clock >> 7) & 0x1F_FFFF;
        let f = (16 * clk_27_7) % NUM_CHANNELS as u32;
        let f_prime = (16 * clk_27_7) % usable_count.max(1) as u32;

        Self {
            x,
            y1,
            y2,
            a,
            b,
            c,
            d,
            e,
            f,
            f_prime,
        }
    }

    /// Butterfly input `Z'`
    pub fn z(&self) -> u8 {
        (((self.x + self.a) % 32) ^ self.b) as u8
    }

    /// Butterfly control word `P`
    pub fn control_word(&self) -> u16 {
        ((((self.c ^ self.y1) << 9) & 0x3E00) | (self.d & 0x1FF)) as u16
    }
}

/// Run the 5-wire butterfly on `z` under control word `p`.
pub fn permute(z: u8, p: u16) -> u8 {
    let mut wires = [0u8; 5];
    for (i, wire) in wires.iter_mut().enumerate() {
        *wire = (z >> i) & 1;
    }
    for &(bit, a, b) in BUTTERFLY.iter() {
        if p & (1 << bit) != 0 {
            wires.swap(a as usize, b as usize);
        }
    }
    wires
        .iter()
        .enumerate()
        .fold(0u8, |acc, (i, w)| acc | (w << i))
}

/// Map a position in the 79-hop sequence onto the air channel
/// (first half on even channels, second half on odd channels).
pub fn to_air_channel(index: u32) -> u8 {
    if index < EVEN_HALF {
        (index * 2) as u8
    } else {
        ((index - EVEN_HALF) * 2 + 1) as u8
    }
}

/// Hop decision with a flag telling whether the remap stage ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hop {
    pub channel: u8,
    /// Unmapped basic hop
    pub basic: u8,
    pub remapped: bool,
}

/// Basic (non-adaptive) hop over all 79 channels.
pub fn basic_hop(address: DeviceAddress, clock: u32) -> u8 {
    let inputs = HopInputs::derive(address, clock, NUM_CHANNELS);
    let permuted = permute(inputs.z(), inputs.control_word()) as u32;
    to_air_channel((permuted + inputs.e + inputs.f + inputs.y2) % NUM_CHANNELS as u32)
}

/// Full hop computation, remapping onto `map` when the basic hop is unusable.
pub fn compute_hop(
    address: DeviceAddress,
    clock: u32,
    map: &ChannelMap,
    usable_count: usize,
) -> Result<Hop> {
    if usable_count == 0 {
        return Err(Error::NoUsableChannels);
    }
    let actual = map.usable_count();
    if actual != usable_count {
        return Err(Error::UsableCountMismatch {
            declared: usable_count,
            actual,
        });
    }

    let inputs = HopInputs::derive(address, clock, usable_count);
    let permuted = permute(inputs.z(), inputs.control_word());
    let basic = to_air_channel(
        (permuted as u32 + inputs.e + inputs.f + inputs.y2) % NUM_CHANNELS as u32,
    );

    if map.is_usable(basic) {
        return Ok(Hop {
            channel: basic,
            basic,
            remapped: false,
        });
    }

    let channel = remap(
        RemapInputs {
            permuted,
            e: inputs.e as u8,
            f_prime: inputs.f_prime,
            y2: inputs.y2 as u8,
        },
        map,
        usable_count,
    )?;

    Ok(Hop {
        channel,
        basic,
        remapped: true,
    })
}

/// Next air channel (0..=78) for `address` at `clock`.
///
/// `usable_count` must equal the number of usable channels in `map`;
/// a disagreement is reported as [`Error::UsableCountMismatch`].
pub fn compute_frequency(
    address: DeviceAddress,
    clock: u32,
    map: &ChannelMap,
    usable_count: usize,
) -> Result<u8> {
    compute_hop(address, clock, map, usable_count).map(|hop| hop.channel)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: DeviceAddress = DeviceAddress(0x2a96ef25);

    fn even_map() -> ChannelMap {
        let mut map = ChannelMap::empty();
        for ch in (0..79).step_by(2) {
            map.set(ch, true).unwrap();
        }
        map
    }

    #[test]
    fn test_zero_address_zero_clock() {
        let full = ChannelMap::full();
        assert_eq!(compute_frequency(DeviceAddress(0), 0, &full, 79).unwrap(), 0);
    }

    #[test]
    fn test_golden_full_map() {
        let full = ChannelMap::full();
        assert_eq!(compute_frequency(SAMPLE, 0, &full, 79).unwrap(), 49);
        assert_eq!(compute_frequency(SAMPLE, 0x10, &full, 79).unwrap(), 55);
        assert_eq!(compute_frequency(SAMPLE, 0x123_4567, &full, 79).unwrap(), 17);
        assert_eq!(
            compute_frequency(DeviceAddress(0xbc93_0722_5d70), 0x3fc, &full, 79).unwrap(),
            16
        );
        assert_eq!(
            compute_frequency(DeviceAddress(0x2802_2e9d_20d4), 12345, &full, 79).unwrap(),
            58
        );
    }

    #[test]
    fn test_golden_sequences() {
        let full: Vec<u8> = vec![49, 13, 17, 51, 55, 19, 23, 53, 57, 21, 25, 27, 31, 74, 78, 29];
        let even: Vec<u8> = vec![46, 10, 14, 48, 52, 16, 20, 50, 54, 18, 22, 24, 28, 74, 78, 26];
        let first20: Vec<u8> = vec![6, 13, 17, 8, 12, 19, 1, 10, 14, 18, 3, 5, 9, 13, 17, 7];

        let maps = [
            (ChannelMap::full(), 79, full),
            (even_map(), 40, even),
            (ChannelMap::first(20), 20, first20),
        ];
        for (map, n, expected) in maps.iter() {
            let got: Vec<u8> = (0..16)
                .map(|i| compute_frequency(SAMPLE, i * 4, map, *n).unwrap())
                .collect();
            assert_eq!(&got, expected, "map with {} channels", n);
        }
    }

    #[test]
    fn test_basic_hop_matches_full_map() {
        let full = ChannelMap::full();
        for clk in (0..4096u32).step_by(4) {
            assert_eq!(
                basic_hop(SAMPLE, clk),
                compute_frequency(SAMPLE, clk, &full, 79).unwrap()
            );
        }
    }

    #[test]
    fn test_pass_through_skips_remap() {
        let full = ChannelMap::full();
        let hop = compute_hop(SAMPLE, 0, &full, 79).unwrap();
        assert!(!hop.remapped);
        assert_eq!(hop.channel, hop.basic);

        // basic hop 49 is odd, the even-only map must remap it
        let hop = compute_hop(SAMPLE, 0, &even_map(), 40).unwrap();
        assert!(hop.remapped);
        assert_eq!(hop.basic, 49);
        assert_eq!(hop.channel, 46);
    }

    #[test]
    fn test_permute_identity_and_swap() {
        for z in 0..32u8 {
            assert_eq!(permute(z, 0), z);
        }
        // P0 swaps wires 0 and 1
        assert_eq!(permute(0b00001, 1), 0b00010);
        // P12 swaps wires 0 and 3
        assert_eq!(permute(0b00001, 1 << 12), 0b01000);
    }

    #[test]
    fn test_permute_is_bijection() {
        for p in [0u16, 0x3FFF, 0x1555, 0x2AAA, 0x0F0F] {
            let mut seen = [false; 32];
            for z in 0..32u8 {
                seen[permute(z, p) as usize] = true;
            }
            assert!(seen.iter().all(|s| *s));
        }
    }

    #[test]
    fn test_count_mismatch_rejected() {
        let map = ChannelMap::first(20);
        assert_eq!(
            compute_frequency(SAMPLE, 0, &map, 21),
            Err(Error::UsableCountMismatch {
                declared: 21,
                actual: 20
            })
        );
        assert_eq!(
            compute_frequency(SAMPLE, 0, &ChannelMap::empty(), 0),
            Err(Error::NoUsableChannels)
        );
    }

    #[test]
    fn test_air_channel_halves() {
        assert_eq!(to_air_channel(0), 0);
        assert_eq!(to_air_channel(39), 78);
        assert_eq!(to_air_channel(40), 1);
        assert_eq!(to_air_channel(78), 77);
    }
}
