use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::engine::Engine;
use crate::model::*;
use crate::sim::{RunConfig, SweepReport, default_sweeps, run};

// ---------------------------------------------------------------------------
// Formation helpers
// ---------------------------------------------------------------------------

/// Build stacks from `(type, count, level)` tuples.
pub fn stacks(entries: &[(TroopType, u32, u32)]) -> Vec<TroopStack> {
    entries
        .iter()
        .map(|&(troop_type, count, level)| TroopStack::new(troop_type, count, level))
        .collect()
}

pub fn formation(
    catalog: &TroopCatalog,
    entries: &[(TroopType, u32, u32)],
    strategy: Strategy,
) -> Formation {
    Formation::new(catalog, stacks(entries), strategy)
}

pub fn seeded_rng(seed: u64) -> SmallRng {
    SmallRng::seed_from_u64(seed)
}

/// A random non-empty formation: 1 to `max_stacks` stacks of random types,
/// each with 1 to `max_count` troops at level 1 to 5.
pub fn random_formation(
    rng: &mut impl Rng,
    catalog: &TroopCatalog,
    max_stacks: usize,
    max_count: u32,
) -> Formation {
    let n = rng.random_range(1..=max_stacks.max(1));
    let troops = (0..n)
        .map(|_| {
            let troop_type = TroopType::ALL[rng.random_range(0..TroopType::ALL.len())];
            TroopStack::new(
                troop_type,
                rng.random_range(1..=max_count.max(1)),
                rng.random_range(1..=5),
            )
        })
        .collect();
    let strategy = Strategy::ALL[rng.random_range(0..Strategy::ALL.len())];
    Formation::new(catalog, troops, strategy)
}

// ---------------------------------------------------------------------------
// Sweep helpers
// ---------------------------------------------------------------------------

/// Drive the default sweeps from `from` through `until` (inclusive).
pub fn sweep_until(engine: &Engine, from: GameTime, until: GameTime) -> Vec<SweepReport> {
    let mut systems = default_sweeps(&engine.config().sweep);
    // No checkpoint directory configured, so the flush path never runs.
    run(engine, &mut systems, &RunConfig::new(from, until)).unwrap_or_default()
}

/// Battle IDs executed across a set of sweep reports.
pub fn executed_battles(reports: &[SweepReport]) -> Vec<u64> {
    reports
        .iter()
        .flat_map(|r| match r {
            SweepReport::Battles { report, .. } => report.executed.clone(),
            SweepReport::Wars { .. } => Vec::new(),
        })
        .collect()
}
