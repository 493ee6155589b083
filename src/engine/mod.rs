//! Request handlers and time-driven transitions for territories, battles and
//! alliance wars.
//!
//! Every handler takes the acting player and `now` explicitly, validates
//! against the current stored state and writes back through the store's
//! atomic update, so handlers can be driven by tests with synthetic clocks.

pub mod combat;
pub mod eligibility;
mod execution;
mod scheduler;
pub mod siege;
pub mod war;

use std::sync::Arc;

use crate::collab::{Notification, NotificationKind, Services};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::model::{Alliance, AllianceWar, Player, ScheduledBattle, Territory, TroopCatalog};
use crate::store::Store;

pub use combat::{CombatInput, CombatOutcome};
pub use eligibility::{ActivityTier, AttackEligibility, ProtectionStatus};
pub use execution::BattleSweepReport;
pub use scheduler::{BattleTicket, ParticipationReport};
pub use siege::{ReclaimReceipt, SiegeTransition};
pub use war::{WarDeclaration, WarStatusView, WarSweepReport};

#[derive(Debug)]
pub struct Engine {
    config: Arc<EngineConfig>,
    catalog: Arc<TroopCatalog>,
    store: Store,
    services: Services,
}

impl Engine {
    pub fn new(config: Arc<EngineConfig>, catalog: Arc<TroopCatalog>, services: Services) -> Self {
        Self::with_store(config, catalog, services, Store::new())
    }

    pub fn with_store(
        config: Arc<EngineConfig>,
        catalog: Arc<TroopCatalog>,
        services: Services,
        store: Store,
    ) -> Self {
        Self {
            config,
            catalog,
            store,
            services,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &TroopCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    fn player(&self, id: u64) -> Result<Player, EngineError> {
        self.store
            .players
            .get(id)
            .ok_or(EngineError::PlayerNotFound(id))
    }

    fn alliance(&self, id: u64) -> Result<Alliance, EngineError> {
        self.store
            .alliances
            .get(id)
            .ok_or(EngineError::AllianceNotFound(id))
    }

    fn territory(&self, id: u64) -> Result<Territory, EngineError> {
        self.store
            .territories
            .get(id)
            .ok_or(EngineError::TerritoryNotFound(id))
    }

    fn battle(&self, id: u64) -> Result<ScheduledBattle, EngineError> {
        self.store
            .battles
            .get(id)
            .ok_or(EngineError::BattleNotFound(id))
    }

    fn war(&self, id: u64) -> Result<AllianceWar, EngineError> {
        self.store.wars.get(id).ok_or(EngineError::WarNotFound(id))
    }

    fn notify(
        &self,
        user_id: u64,
        kind: NotificationKind,
        title: impl Into<String>,
        body: impl Into<String>,
        data: serde_json::Value,
    ) {
        self.services.notifier.notify(
            user_id,
            &Notification {
                kind,
                title: title.into(),
                body: body.into(),
                data,
            },
        );
    }

    fn notify_alliance(
        &self,
        alliance_id: u64,
        kind: NotificationKind,
        title: impl Into<String>,
        body: impl Into<String>,
        data: serde_json::Value,
    ) {
        self.services.notifier.notify_alliance_members(
            alliance_id,
            &Notification {
                kind,
                title: title.into(),
                body: body.into(),
                data,
            },
        );
    }
}
