use serde::{Deserialize, Serialize};

use super::formation::{Formation, TroopStack};
use super::territory::TerritoryState;
use super::time::GameTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum BattleStatus {
    Scheduled,
    Preparing,
    Active,
    Completed,
    Cancelled,
}

string_enum!(BattleStatus {
    Scheduled => "scheduled",
    Preparing => "preparing",
    Active => "active",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl BattleStatus {
    /// Scheduled, preparing and active battles all hold the territory.
    pub fn is_open(self) -> bool {
        matches!(
            self,
            BattleStatus::Scheduled | BattleStatus::Preparing | BattleStatus::Active
        )
    }

    /// Formations and participation may only change before execution starts.
    pub fn accepts_orders(self) -> bool {
        matches!(self, BattleStatus::Scheduled | BattleStatus::Preparing)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Side {
    Attacker,
    Defender,
}

string_enum!(Side {
    Attacker => "attacker",
    Defender => "defender",
});

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::Attacker => Side::Defender,
            Side::Defender => Side::Attacker,
        }
    }
}

/// How close a player was to the territory when reporting in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ParticipationType {
    Physical,
    Nearby,
    #[default]
    Remote,
}

string_enum!(ParticipationType {
    Physical => "physical",
    Nearby => "nearby",
    Remote => "remote",
});

/// Casualty bookkeeping for one side of a resolved battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideOutcome {
    pub starting_troops: u32,
    pub troops_lost: u32,
    pub survivors: Vec<TroopStack>,
    /// Per-stack losses, same order as the submitted formation.
    pub losses: Vec<TroopStack>,
}

impl SideOutcome {
    pub fn remaining(&self) -> u32 {
        self.starting_troops - self.troops_lost
    }

    pub fn surviving_fraction(&self) -> f64 {
        if self.starting_troops == 0 {
            return 0.0;
        }
        f64::from(self.remaining()) / f64::from(self.starting_troops)
    }

    pub fn loss_fraction(&self) -> f64 {
        1.0 - self.surviving_fraction()
    }
}

/// One simulated exchange. Both sides strike from the round-start state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub number: u32,
    pub attacker_damage: f64,
    pub defender_damage: f64,
    pub attacker_casualties: u32,
    pub defender_casualties: u32,
    pub attacker_remaining: u32,
    pub defender_remaining: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleResult {
    pub winner: Side,
    pub winner_id: u64,
    pub is_decisive: bool,
    pub rounds: Vec<Round>,
    pub attacker: SideOutcome,
    pub defender: SideOutcome,
    pub previous_territory_state: TerritoryState,
    pub new_territory_state: TerritoryState,
    pub territory_fallen: bool,
    pub attacker_xp: u32,
    pub defender_xp: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledBattle {
    pub id: u64,
    pub attacker_id: u64,
    pub defender_id: u64,
    pub attacker_alliance_id: Option<u64>,
    pub defender_alliance_id: Option<u64>,
    pub territory_id: u64,
    /// Open war between the two alliances when the battle was scheduled.
    pub war_id: Option<u64>,
    pub status: BattleStatus,
    pub scheduled_at: GameTime,
    pub battle_starts_at: GameTime,
    pub attacker_formation: Option<Formation>,
    pub defender_formation: Option<Formation>,
    pub attacker_participation: Option<ParticipationType>,
    pub defender_participation: Option<ParticipationType>,
    /// Defender activity bonus captured at scheduling time.
    pub defense_bonus: f64,
    pub completed_at: Option<GameTime>,
    pub result: Option<BattleResult>,
    pub error: Option<String>,
}

impl ScheduledBattle {
    /// Which side the given player fights on, if any.
    pub fn side_of(&self, player_id: u64) -> Option<Side> {
        if player_id == self.attacker_id {
            Some(Side::Attacker)
        } else if player_id == self.defender_id {
            Some(Side::Defender)
        } else {
            None
        }
    }

    pub fn player_on(&self, side: Side) -> u64 {
        match side {
            Side::Attacker => self.attacker_id,
            Side::Defender => self.defender_id,
        }
    }

    pub fn alliance_on(&self, side: Side) -> Option<u64> {
        match side {
            Side::Attacker => self.attacker_alliance_id,
            Side::Defender => self.defender_alliance_id,
        }
    }

    pub fn formation_mut(&mut self, side: Side) -> &mut Option<Formation> {
        match side {
            Side::Attacker => &mut self.attacker_formation,
            Side::Defender => &mut self.defender_formation,
        }
    }

    pub fn participation_mut(&mut self, side: Side) -> &mut Option<ParticipationType> {
        match side {
            Side::Attacker => &mut self.attacker_participation,
            Side::Defender => &mut self.defender_participation,
        }
    }

    pub fn is_due(&self, now: GameTime) -> bool {
        self.status.accepts_orders() && now >= self.battle_starts_at
    }
}
