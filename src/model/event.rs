use serde::{Deserialize, Serialize};

use super::time::GameTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum EventKind {
    BattleScheduled,
    BattleResolved,
    BattleCancelled,
    TerritoryFallen,
    TerritoryReclaimed,
    WarDeclared,
    WarStarted,
    WarEnded,
    WarCancelled,
    PeaceEnded,
}

string_enum!(EventKind {
    BattleScheduled => "battle_scheduled",
    BattleResolved => "battle_resolved",
    BattleCancelled => "battle_cancelled",
    TerritoryFallen => "territory_fallen",
    TerritoryReclaimed => "territory_reclaimed",
    WarDeclared => "war_declared",
    WarStarted => "war_started",
    WarEnded => "war_ended",
    WarCancelled => "war_cancelled",
    PeaceEnded => "peace_ended",
});

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub id: u64,
    pub kind: EventKind,
    pub timestamp: GameTime,
    pub description: String,
    pub caused_by: Option<u64>,
    /// Structured payload (battle result summary, war scores, ...).
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ParticipantRole {
    Attacker,
    Defender,
    Territory,
    Battle,
    War,
    Challenger,
    Winner,
    Claimant,
}

string_enum!(ParticipantRole {
    Attacker => "attacker",
    Defender => "defender",
    Territory => "territory",
    Battle => "battle",
    War => "war",
    Challenger => "challenger",
    Winner => "winner",
    Claimant => "claimant",
});

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventParticipant {
    pub event_id: u64,
    pub entity_id: u64,
    pub role: ParticipantRole,
}
