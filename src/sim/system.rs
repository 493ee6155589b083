use super::context::SweepContext;

/// A periodic, unauthenticated job that advances time-driven state.
///
/// Object-safe so sweeps can be stored as `Box<dyn SweepSystem>`.
pub trait SweepSystem: Send {
    fn name(&self) -> &str;
    /// Fires whenever the clock is a whole multiple of this many minutes.
    fn interval_minutes(&self) -> u64;
    fn tick(&mut self, ctx: &mut SweepContext);
}
