use super::context::{SweepContext, SweepReport};
use super::system::SweepSystem;
use crate::config::SweepConfig;

/// Resolves battles whose start time has passed.
#[derive(Debug, Clone)]
pub struct BattleSweep {
    interval_minutes: u64,
}

impl BattleSweep {
    pub fn new(config: &SweepConfig) -> Self {
        Self {
            interval_minutes: config.interval_minutes,
        }
    }
}

impl SweepSystem for BattleSweep {
    fn name(&self) -> &str {
        "pending_battles"
    }

    fn interval_minutes(&self) -> u64 {
        self.interval_minutes
    }

    fn tick(&mut self, ctx: &mut SweepContext) {
        let report = ctx.engine.process_pending_battles(ctx.now);
        ctx.reports.push(SweepReport::Battles {
            at: ctx.now,
            report,
        });
    }
}

/// Advances wars across warning, active and treaty boundaries.
#[derive(Debug, Clone)]
pub struct WarPhaseSweep {
    interval_minutes: u64,
}

impl WarPhaseSweep {
    pub fn new(config: &SweepConfig) -> Self {
        Self {
            interval_minutes: config.interval_minutes,
        }
    }
}

impl SweepSystem for WarPhaseSweep {
    fn name(&self) -> &str {
        "war_phases"
    }

    fn interval_minutes(&self) -> u64 {
        self.interval_minutes
    }

    fn tick(&mut self, ctx: &mut SweepContext) {
        let report = ctx.engine.process_war_phases(ctx.now);
        ctx.reports.push(SweepReport::Wars {
            at: ctx.now,
            report,
        });
    }
}

/// War phases run before battles so a battle resolved at a boundary sees
/// the war in its new phase.
pub fn default_sweeps(config: &SweepConfig) -> Vec<Box<dyn SweepSystem>> {
    vec![
        Box::new(WarPhaseSweep::new(config)),
        Box::new(BattleSweep::new(config)),
    ]
}
