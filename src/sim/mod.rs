mod context;
mod runner;
mod sweeps;
mod system;

pub use context::{SweepContext, SweepReport};
pub use runner::{RunConfig, dispatch_sweeps, run, should_fire};
pub use sweeps::{BattleSweep, WarPhaseSweep, default_sweeps};
pub use system::SweepSystem;
