use serde::Serialize;

use crate::engine::{BattleSweepReport, Engine, WarSweepReport};
use crate::model::GameTime;

/// What a single sweep tick did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "sweep", rename_all = "snake_case")]
pub enum SweepReport {
    Battles { at: GameTime, report: BattleSweepReport },
    Wars { at: GameTime, report: WarSweepReport },
}

/// Context passed to each sweep on every tick.
///
/// Bundled so fields can be added later without changing the
/// `SweepSystem` trait signature.
pub struct SweepContext<'a> {
    pub engine: &'a Engine,
    pub now: GameTime,
    pub reports: &'a mut Vec<SweepReport>,
}
