//! Property tests for the Q-table and the agent controller
//!
//! Tests invariants for:
//! - Update sign: a collision never raises Q, a clean step never lowers it
//! - Channel range: every selected channel lies in 1..=num_channels
//! - Map consistency: the active map always agrees with its usable count

use marl_core::*;
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn mode() -> impl Strategy<Value = HoppingMode> {
    prop::sample::select(HoppingMode::ALL.to_vec())
}

fn q_values(n: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-1.0f64..=0.0f64, n)
}

fn outcomes() -> impl Strategy<Value = Vec<bool>> {
    prop::collection::vec(prop::bool::weighted(0.2), 64)
}

// ============================================================================
// Q-table Property Tests
// ============================================================================

proptest! {
    /// CORE INVARIANT: reward -1 never increases Q, reward 0 never decreases it
    #[test]
    fn update_sign(
        values in q_values(NUM_CHANNELS),
        pick in 1u8..=79u8,
        alpha in 0.0f64..=1.0f64,
        gamma in 0.0f64..=1.0f64,
        collided in any::<bool>()
    ) {
        let mut table = QTable::new(NUM_CHANNELS);
        for (i, v) in values.iter().enumerate() {
            table.set(ActionKind::Default, (i + 1) as u8, *v).unwrap();
        }
        let before = table.get(ActionKind::Default, pick);
        let next = table.bootstrap_value();
        let reward = if collided { -1.0 } else { 0.0 };
        let after = table.update(pick, reward, next, alpha, gamma).unwrap();

        if collided {
            prop_assert!(after <= before + 1e-12, "{} -> {}", before, after);
        } else {
            prop_assert!(after >= before - 1e-12, "{} -> {}", before, after);
        }
    }

    /// Bootstrap never goes below the reserved 0.0 column
    #[test]
    fn bootstrap_floor(values in q_values(NUM_CHANNELS)) {
        let mut table = QTable::new(NUM_CHANNELS);
        for (i, v) in values.iter().enumerate() {
            table.set(ActionKind::Default, (i + 1) as u8, *v).unwrap();
        }
        prop_assert_eq!(table.bootstrap_value(), 0.0);
    }
}

// ============================================================================
// Agent Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// CORE INVARIANT: selected channels stay in the band for every mode
    #[test]
    fn agent_channels_in_band(
        mode in mode(),
        num_channels in 10usize..=79usize,
        start_offset in any::<u32>(),
        base_clock in 0u32..160_000u32,
        seed in any::<u64>(),
        pattern in outcomes()
    ) {
        let mut config = AgentConfig::new(mode)
            .with_timeouts(4, 40, 8)
            .with_usable_target(8);
        config.map_rebuild_period = 40;
        let setup = PiconetSetup::new(
            DeviceAddress::new(DEFAULT_ADDRESSES[1]),
            base_clock,
            start_offset,
        );
        let mut agent = AgentController::new(0, config, num_channels, setup, seed).unwrap();

        for step in 1..=1200u64 {
            let clock = SimClock::new(step);
            let collided = pattern[(step as usize) % pattern.len()];
            if step > 1 {
                agent.learn(if collided { -1.0 } else { 0.0 }, clock).unwrap();
            }
            let ch = agent.select_channel(clock, collided).unwrap();
            prop_assert!(
                ch >= 1 && ch as usize <= num_channels,
                "step {}: channel {} outside 1..={}", step, ch, num_channels
            );
            agent.commit_channel(ch);

            let active = agent.active();
            prop_assert_eq!(active.map.usable_count(), active.usable_count);
        }
    }
}
