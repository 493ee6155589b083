use std::fmt;

use serde::{Deserialize, Serialize};

pub const MINUTES_PER_HOUR: u64 = 60;
pub const HOURS_PER_DAY: u64 = 24;
pub const MINUTES_PER_DAY: u64 = MINUTES_PER_HOUR * HOURS_PER_DAY; // 1,440

/// Game time as total elapsed minutes since the game epoch.
///
/// A plain `u64` wrapper. Natural ordering equals chronological ordering,
/// and every handler receives `now` explicitly so tests can use synthetic
/// clocks.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct GameTime(u64);

impl GameTime {
    pub const EPOCH: GameTime = GameTime(0);

    pub fn from_minutes(minutes: u64) -> Self {
        Self(minutes)
    }

    pub fn from_hours(hours: u64) -> Self {
        Self(hours * MINUTES_PER_HOUR)
    }

    pub fn from_days(days: u64) -> Self {
        Self(days * MINUTES_PER_DAY)
    }

    pub fn as_minutes(self) -> u64 {
        self.0
    }

    pub fn plus_minutes(self, minutes: u64) -> Self {
        Self(self.0.saturating_add(minutes))
    }

    pub fn plus_hours(self, hours: u64) -> Self {
        self.plus_minutes(hours * MINUTES_PER_HOUR)
    }

    pub fn plus_days(self, days: u64) -> Self {
        self.plus_minutes(days * MINUTES_PER_DAY)
    }

    /// Minutes elapsed between `earlier` and `self` (saturating at zero).
    pub fn minutes_since(self, earlier: GameTime) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// Minutes from `self` until `later` (zero if `later` already passed).
    pub fn minutes_until(self, later: GameTime) -> u64 {
        later.0.saturating_sub(self.0)
    }

    /// Day number since the epoch (0-based).
    pub fn day(self) -> u64 {
        self.0 / MINUTES_PER_DAY
    }

    /// Hour of day (0–23).
    pub fn hour(self) -> u64 {
        (self.0 % MINUTES_PER_DAY) / MINUTES_PER_HOUR
    }

    /// Minute of hour (0–59).
    pub fn minute(self) -> u64 {
        self.0 % MINUTES_PER_HOUR
    }
}

impl fmt::Display for GameTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "D{} {:02}:{:02}", self.day(), self.hour(), self.minute())
    }
}
