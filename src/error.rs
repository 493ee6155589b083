use thiserror::Error;

use crate::collab::CollabError;
use crate::model::{BattleStatus, GameTime, TroopType, WarPhase};

/// Failures raised by the in-memory store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{collection} {id} not found")]
    NotFound { collection: &'static str, id: u64 },
    #[error("{collection} {id} changed concurrently (expected version {expected}, found {found})")]
    VersionConflict {
        collection: &'static str,
        id: u64,
        expected: u64,
        found: u64,
    },
    #[error("{collection} already holds conflicting record {existing_id}")]
    Conflict {
        collection: &'static str,
        existing_id: u64,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Every reason a request or sweep item can be rejected.
///
/// Validation variants never leave partial state behind.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("territory {0} not found")]
    TerritoryNotFound(u64),
    #[error("battle {0} not found")]
    BattleNotFound(u64),
    #[error("war {0} not found")]
    WarNotFound(u64),
    #[error("player {0} not found")]
    PlayerNotFound(u64),
    #[error("alliance {0} not found")]
    AllianceNotFound(u64),

    #[error("cannot attack your own territory")]
    SelfAttack,
    #[error("territory has already fallen and can only be reclaimed")]
    AlreadyFallen,
    #[error("territory is shielded until {until}")]
    TerritoryShielded { until: GameTime },
    #[error("defender is under newcomer protection until {until}")]
    NewcomerShield { until: GameTime },
    #[error("you attacked this territory recently; try again after {until}")]
    AttackCooldown { until: GameTime },
    #[error("cannot attack territory owned by an alliance member")]
    AllyTerritory,
    #[error("territory already has an open battle ({battle_id})")]
    BattleAlreadyPending { battle_id: u64 },

    #[error("player is not a participant in this battle")]
    NotParticipant,
    #[error("battle is {status} and no longer accepts orders")]
    BattleLocked { status: BattleStatus },
    #[error("invalid formation: {0}")]
    InvalidFormation(String),
    #[error("not enough {troop_type}: requested {requested}, available {available}")]
    InsufficientTroops {
        troop_type: TroopType,
        requested: u32,
        available: u32,
    },
    #[error("battle starts at {starts_at}")]
    BattleNotReady { starts_at: GameTime },
    #[error("territory changed while the battle was pending: {0}")]
    BattleInvalidated(String),

    #[error("only the previous owner may reclaim this territory")]
    NotPreviousOwner,
    #[error("territory has not fallen")]
    TerritoryNotFallen,
    #[error("territory can be reclaimed after {until}")]
    ReclaimCooldown { until: GameTime },
    #[error("not enough {resource}: required {required}, available {available}")]
    InsufficientResources {
        resource: String,
        required: u64,
        available: u64,
    },

    #[error("player is not in an alliance")]
    NotInAlliance,
    #[error("only the alliance leader may do this")]
    NotAllianceLeader,
    #[error("an alliance cannot declare war on itself")]
    SelfWar,
    #[error("alliance has {members} members, {required} required")]
    AllianceTooSmall { members: usize, required: usize },
    #[error("a war between these alliances is already open ({war_id})")]
    WarAlreadyOpen { war_id: u64 },
    #[error("peace treaty in force until {until}")]
    PeaceTreatyActive { until: GameTime },
    #[error("war is in the {phase} phase")]
    WrongWarPhase { phase: WarPhase },
    #[error("only the declaring alliance may cancel a war")]
    NotChallenger,
    #[error("alliance {alliance_id} is not a party to this war")]
    NotWarParticipant { alliance_id: u64 },

    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("collaborator failure: {0}")]
    Collaborator(String),
}

impl EngineError {
    /// Stable machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::TerritoryNotFound(_) => "territory_not_found",
            EngineError::BattleNotFound(_) => "battle_not_found",
            EngineError::WarNotFound(_) => "war_not_found",
            EngineError::PlayerNotFound(_) => "player_not_found",
            EngineError::AllianceNotFound(_) => "alliance_not_found",
            EngineError::SelfAttack => "self_attack",
            EngineError::AlreadyFallen => "already_fallen",
            EngineError::TerritoryShielded { .. } => "territory_shielded",
            EngineError::NewcomerShield { .. } => "newcomer_shield",
            EngineError::AttackCooldown { .. } => "attack_cooldown",
            EngineError::AllyTerritory => "ally_territory",
            EngineError::BattleAlreadyPending { .. } => "battle_already_pending",
            EngineError::NotParticipant => "not_participant",
            EngineError::BattleLocked { .. } => "battle_locked",
            EngineError::InvalidFormation(_) => "invalid_formation",
            EngineError::InsufficientTroops { .. } => "insufficient_troops",
            EngineError::BattleNotReady { .. } => "battle_not_ready",
            EngineError::BattleInvalidated(_) => "battle_invalidated",
            EngineError::NotPreviousOwner => "not_previous_owner",
            EngineError::TerritoryNotFallen => "territory_not_fallen",
            EngineError::ReclaimCooldown { .. } => "reclaim_cooldown",
            EngineError::InsufficientResources { .. } => "insufficient_resources",
            EngineError::NotInAlliance => "not_in_alliance",
            EngineError::NotAllianceLeader => "not_alliance_leader",
            EngineError::SelfWar => "self_war",
            EngineError::AllianceTooSmall { .. } => "alliance_too_small",
            EngineError::WarAlreadyOpen { .. } => "war_already_open",
            EngineError::PeaceTreatyActive { .. } => "peace_treaty_active",
            EngineError::WrongWarPhase { .. } => "wrong_war_phase",
            EngineError::NotChallenger => "not_challenger",
            EngineError::NotWarParticipant { .. } => "not_war_participant",
            EngineError::Store(_) => "store_error",
            EngineError::Collaborator(_) => "collaborator_error",
        }
    }
}

impl From<CollabError> for EngineError {
    fn from(err: CollabError) -> Self {
        match err {
            CollabError::InsufficientResources {
                resource,
                required,
                available,
            } => EngineError::InsufficientResources {
                resource,
                required,
                available,
            },
            other => EngineError::Collaborator(other.to_string()),
        }
    }
}
