//! Interfaces to systems outside the engine: resources, troops, blueprints,
//! notifications and progression. The engine only ever talks to them through
//! these traits.

mod memory;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Building, TroopType};

pub use memory::{
    InMemoryBlueprints, InMemoryInventory, InMemoryLedger, InMemoryProgression, InMemoryServices,
    Recipient, RecordingNotifier,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollabError {
    #[error("not enough {resource}: required {required}, available {available}")]
    InsufficientResources {
        resource: String,
        required: u64,
        available: u64,
    },
    #[error("not enough {troop_type}: requested {requested}, available {available}")]
    InsufficientTroops {
        troop_type: TroopType,
        requested: u32,
        available: u32,
    },
    #[error("{0}")]
    Unavailable(String),
}

/// Per-player resource balances.
pub trait ResourceLedger: Send + Sync {
    fn balance(&self, player_id: u64, resource: &str) -> u64;
    /// Debit all amounts or none of them.
    fn debit(&self, player_id: u64, amounts: &BTreeMap<String, u64>) -> Result<(), CollabError>;
    fn credit(&self, player_id: u64, amounts: &BTreeMap<String, u64>) -> Result<(), CollabError>;
}

/// Per-player troop counts.
pub trait TroopInventory: Send + Sync {
    fn counts(&self, player_id: u64) -> Result<BTreeMap<TroopType, u32>, CollabError>;
    /// Remove troops lost in battle; removing more than owned clamps at zero.
    fn remove(&self, player_id: u64, losses: &BTreeMap<TroopType, u32>) -> Result<(), CollabError>;
}

pub trait BlueprintService: Send + Sync {
    /// Snapshot a fallen territory's buildings; returns the blueprint ID.
    fn save_snapshot(&self, owner_id: u64, buildings: &[Building]) -> Result<u64, CollabError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum NotificationKind {
    BattleScheduled,
    BattleResult,
    TerritoryFallen,
    TerritoryReclaimed,
    WarDeclared,
    WarStarted,
    WarEnded,
    WarCancelled,
}

string_enum!(NotificationKind {
    BattleScheduled => "battle_scheduled",
    BattleResult => "battle_result",
    TerritoryFallen => "territory_fallen",
    TerritoryReclaimed => "territory_reclaimed",
    WarDeclared => "war_declared",
    WarStarted => "war_started",
    WarEnded => "war_ended",
    WarCancelled => "war_cancelled",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
}

/// Fire-and-forget delivery; failures are the dispatcher's problem.
pub trait Notifier: Send + Sync {
    fn notify(&self, user_id: u64, notification: &Notification);
    fn notify_alliance_members(&self, alliance_id: u64, notification: &Notification);
}

pub trait ProgressionHook: Send + Sync {
    fn award_xp(&self, user_id: u64, amount: u32);
    fn check_achievements(&self, user_id: u64, category: &str);
}

/// The full set of collaborators an engine is wired with.
#[derive(Clone)]
pub struct Services {
    pub ledger: Arc<dyn ResourceLedger>,
    pub inventory: Arc<dyn TroopInventory>,
    pub blueprints: Arc<dyn BlueprintService>,
    pub notifier: Arc<dyn Notifier>,
    pub progression: Arc<dyn ProgressionHook>,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}
