use serde::{Deserialize, Serialize};

use super::time::GameTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum WarStatus {
    Pending,
    Active,
    Completed,
    Cancelled,
}

string_enum!(WarStatus {
    Pending => "pending",
    Active => "active",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl WarStatus {
    pub fn is_open(self) -> bool {
        matches!(self, WarStatus::Pending | WarStatus::Active)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum WarPhase {
    Warning,
    Active,
    Ended,
    PeaceTreaty,
    Cancelled,
}

string_enum!(WarPhase {
    Warning => "warning",
    Active => "active",
    Ended => "ended",
    PeaceTreaty => "peace_treaty",
    Cancelled => "cancelled",
});

/// The four boundaries of a war, all derived from the declaration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarTimeline {
    pub declared_at: GameTime,
    pub warning_ends_at: GameTime,
    pub ends_at: GameTime,
    pub peace_treaty_ends_at: GameTime,
}

impl WarTimeline {
    pub fn starting_at(
        declared_at: GameTime,
        warning_hours: u64,
        active_hours: u64,
        peace_treaty_hours: u64,
    ) -> Self {
        let warning_ends_at = declared_at.plus_hours(warning_hours);
        let ends_at = warning_ends_at.plus_hours(active_hours);
        let peace_treaty_ends_at = ends_at.plus_hours(peace_treaty_hours);
        Self {
            declared_at,
            warning_ends_at,
            ends_at,
            peace_treaty_ends_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarRewards {
    /// Total pool before splitting.
    pub pool: u64,
    pub per_member: u64,
    pub recipients: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllianceWar {
    pub id: u64,
    pub challenger_alliance_id: u64,
    pub defender_alliance_id: u64,
    pub declared_by: u64,
    pub status: WarStatus,
    pub phase: WarPhase,
    pub timeline: WarTimeline,
    pub challenger_score: u32,
    pub defender_score: u32,
    pub challenger_battles_won: u32,
    pub defender_battles_won: u32,
    pub winner_id: Option<u64>,
    pub rewards: Option<WarRewards>,
    /// Why the war sweep gave up on this war, if it did.
    pub error: Option<String>,
}

impl AllianceWar {
    /// True if this war is between `a` and `b` in either direction.
    pub fn involves_pair(&self, a: u64, b: u64) -> bool {
        (self.challenger_alliance_id == a && self.defender_alliance_id == b)
            || (self.challenger_alliance_id == b && self.defender_alliance_id == a)
    }

    pub fn involves(&self, alliance_id: u64) -> bool {
        self.challenger_alliance_id == alliance_id || self.defender_alliance_id == alliance_id
    }

    pub fn opponent_of(&self, alliance_id: u64) -> Option<u64> {
        if self.challenger_alliance_id == alliance_id {
            Some(self.defender_alliance_id)
        } else if self.defender_alliance_id == alliance_id {
            Some(self.challenger_alliance_id)
        } else {
            None
        }
    }

    pub fn score_of(&self, alliance_id: u64) -> u32 {
        if alliance_id == self.challenger_alliance_id {
            self.challenger_score
        } else if alliance_id == self.defender_alliance_id {
            self.defender_score
        } else {
            0
        }
    }

    pub fn total_battles(&self) -> u32 {
        self.challenger_battles_won + self.defender_battles_won
    }

    /// A completed war whose treaty window has not yet closed.
    pub fn peace_treaty_running(&self, now: GameTime) -> bool {
        self.status == WarStatus::Completed && now < self.timeline.peace_treaty_ends_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeline_boundaries_are_cumulative() {
        let t0 = GameTime::from_hours(100);
        let tl = WarTimeline::starting_at(t0, 24, 48, 72);
        assert_eq!(tl.warning_ends_at, GameTime::from_hours(124));
        assert_eq!(tl.ends_at, GameTime::from_hours(172));
        assert_eq!(tl.peace_treaty_ends_at, GameTime::from_hours(244));
    }

    #[test]
    fn phase_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&WarPhase::PeaceTreaty).unwrap(),
            "\"peace_treaty\""
        );
        assert!(WarStatus::Pending.is_open());
        assert!(!WarStatus::Completed.is_open());
    }
}
