//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::Once;

use noisy_rank::{GenerationSpec, PartitionSet};

static INIT: Once = Once::new();

/// Install a test-friendly tracing subscriber once per test binary.
///
/// Honors `RUST_LOG`; defaults to warnings only.
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "warn,noisy_rank::search=error".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Seed used by the end-to-end scenarios.
pub const SCENARIO_SEED: u64 = 2024;

/// Three partitions of 100 integers drawn uniformly from `[1, 100]`.
pub fn three_parties() -> PartitionSet {
    PartitionSet::generate(&GenerationSpec::default(), SCENARIO_SEED)
        .expect("default generation spec is valid")
}
