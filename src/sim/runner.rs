use std::io;
use std::path::PathBuf;

use tracing::debug;

use super::context::{SweepContext, SweepReport};
use super::system::SweepSystem;
use crate::engine::Engine;
use crate::flush::flush_to_jsonl;
use crate::model::GameTime;

/// Configuration for driving sweeps over a span of game time.
pub struct RunConfig {
    pub start: GameTime,
    /// Inclusive.
    pub end: GameTime,
    /// If set, flush engine state every N minutes and at the end.
    pub checkpoint_every_minutes: Option<u64>,
    /// Directory to write flush checkpoints into.
    pub output_dir: Option<PathBuf>,
}

impl RunConfig {
    pub fn new(start: GameTime, end: GameTime) -> Self {
        Self {
            start,
            end,
            checkpoint_every_minutes: None,
            output_dir: None,
        }
    }
}

/// Returns true if a sweep with the given interval should fire at `now`.
pub fn should_fire(interval_minutes: u64, now: GameTime) -> bool {
    interval_minutes > 0 && now.as_minutes() % interval_minutes == 0
}

/// Call each sweep whose interval matches `now`, in registration order.
pub fn dispatch_sweeps(
    engine: &Engine,
    systems: &mut [Box<dyn SweepSystem>],
    now: GameTime,
) -> Vec<SweepReport> {
    let mut reports = Vec::new();
    for system in systems.iter_mut() {
        if should_fire(system.interval_minutes(), now) {
            debug!(sweep = system.name(), %now, "sweep");
            let mut ctx = SweepContext {
                engine,
                now,
                reports: &mut reports,
            };
            system.tick(&mut ctx);
        }
    }
    reports
}

/// Step the clock from `config.start` to `config.end` at the finest interval
/// any sweep needs, dispatching sweeps at each step.
///
/// The clock is synthetic, so the same engine state and range always
/// produce the same reports.
pub fn run(
    engine: &Engine,
    systems: &mut [Box<dyn SweepSystem>],
    config: &RunConfig,
) -> io::Result<Vec<SweepReport>> {
    let Some(step) = systems
        .iter()
        .map(|s| s.interval_minutes())
        .filter(|&i| i > 0)
        .min()
    else {
        return Ok(Vec::new());
    };

    let mut reports = Vec::new();
    let mut minutes = config.start.as_minutes().div_ceil(step) * step;
    let mut last_checkpoint = None;
    while minutes <= config.end.as_minutes() {
        let now = GameTime::from_minutes(minutes);
        reports.extend(dispatch_sweeps(engine, systems, now));

        if let (Some(every), Some(dir)) = (config.checkpoint_every_minutes, &config.output_dir) {
            if every > 0 && minutes % every == 0 {
                flush_to_jsonl(engine.store(), &dir.join(format!("t_{minutes:08}")))?;
                last_checkpoint = Some(minutes);
            }
        }
        minutes += step;
    }

    if let (Some(_), Some(dir)) = (config.checkpoint_every_minutes, &config.output_dir) {
        let end = config.end.as_minutes();
        if last_checkpoint != Some(end) {
            flush_to_jsonl(engine.store(), &dir.join(format!("t_{end:08}")))?;
        }
    }
    Ok(reports)
}
