//! MARL Property-Based Tests
//!
//! Standalone test suite using proptest for invariant verification of the
//! hopping core. Nothing here is linked into the marl-core crate.
//!
//! # Usage
//!
//! ```bash
//! cargo test -p marl-property-tests            # Run all property tests
//! cargo test -p marl-property-tests hopping    # Run only hop kernel tests
//! cargo test -p marl-property-tests -- --nocapture
//! PROPTEST_CASES=1000 cargo test -p marl-property-tests
//! ```
//!
//! # Test Modules
//!
//! - `hopping`: determinism, channel range, remap pass-through
//! - `channel_map`: top-K size and idempotence
//! - `agent`: update sign, selected channels stay in the band

// Re-export for convenience in tests
pub use marl_core::*;
