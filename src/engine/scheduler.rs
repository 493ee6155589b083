use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use super::{combat, Engine};
use crate::collab::NotificationKind;
use crate::error::{EngineError, StoreError};
use crate::model::{
    BattleStatus, EventKind, Formation, GameTime, GeoPoint, ParticipantRole, ParticipationType,
    ScheduledBattle, Strategy, TroopStack, TroopType,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BattleTicket {
    pub battle_id: u64,
    pub battle_starts_at: GameTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParticipationReport {
    pub participation_type: ParticipationType,
    pub effectiveness: f64,
    pub distance_meters: f64,
}

impl Engine {
    /// Open a battle against a territory, starting after the fixed lead time.
    ///
    /// Eligibility is re-checked against current state. The "one open battle
    /// per territory" rule is enforced by the insert itself, so two racing
    /// requests cannot both succeed.
    pub fn schedule_battle(
        &self,
        attacker_id: u64,
        territory_id: u64,
        now: GameTime,
    ) -> Result<BattleTicket, EngineError> {
        let eligibility = self.check_attack(attacker_id, territory_id, now).into_result()?;
        let attacker = self.player(attacker_id)?;
        let territory = self.territory(territory_id)?;
        let defender = self.player(territory.owner_id)?;

        if attacker.alliance_id.is_some() && attacker.alliance_id == defender.alliance_id {
            return Err(EngineError::AllyTerritory);
        }

        let war_id = match (attacker.alliance_id, defender.alliance_id) {
            (Some(a), Some(b)) => self
                .store
                .wars
                .find(|w| w.status.is_open() && w.involves_pair(a, b))
                .map(|w| w.id),
            _ => None,
        };

        let battle_id = self.store.next_id();
        let battle_starts_at = now.plus_hours(self.config.battle.lead_time_hours);
        let battle = ScheduledBattle {
            id: battle_id,
            attacker_id,
            defender_id: defender.id,
            attacker_alliance_id: attacker.alliance_id,
            defender_alliance_id: defender.alliance_id,
            territory_id,
            war_id,
            status: BattleStatus::Scheduled,
            scheduled_at: now,
            battle_starts_at,
            attacker_formation: None,
            defender_formation: None,
            attacker_participation: None,
            defender_participation: None,
            defense_bonus: eligibility.defense_bonus,
            completed_at: None,
            result: None,
            error: None,
        };

        self.store
            .battles
            .insert_unless(battle_id, battle, |b| {
                b.territory_id == territory_id && b.status.is_open()
            })
            .map_err(|err| match err {
                StoreError::Conflict { existing_id, .. } => EngineError::BattleAlreadyPending {
                    battle_id: existing_id,
                },
                other => other.into(),
            })?;

        info!(
            battle_id,
            attacker_id,
            territory_id,
            starts_at = %battle_starts_at,
            "battle scheduled"
        );
        self.store.record_event(
            EventKind::BattleScheduled,
            now,
            format!("{} declared an attack on {}", attacker.name, territory.name),
            None,
            json!({ "battle_starts_at": battle_starts_at, "war_id": war_id }),
            &[
                (attacker_id, ParticipantRole::Attacker),
                (defender.id, ParticipantRole::Defender),
                (territory_id, ParticipantRole::Territory),
                (battle_id, ParticipantRole::Battle),
            ],
        );
        self.notify(
            defender.id,
            NotificationKind::BattleScheduled,
            "Your territory is under attack",
            format!(
                "{} will attack {} at {}",
                attacker.name, territory.name, battle_starts_at
            ),
            json!({ "battle_id": battle_id, "territory_id": territory_id }),
        );

        Ok(BattleTicket {
            battle_id,
            battle_starts_at,
        })
    }

    /// Submit (or replace) the caller's formation for a battle.
    pub fn set_battle_formation(
        &self,
        caller_id: u64,
        battle_id: u64,
        troops: Vec<TroopStack>,
        strategy: Strategy,
    ) -> Result<Formation, EngineError> {
        let battle = self.battle(battle_id)?;
        let side = battle.side_of(caller_id).ok_or(EngineError::NotParticipant)?;
        if !battle.status.accepts_orders() {
            return Err(EngineError::BattleLocked {
                status: battle.status,
            });
        }

        self.validate_troops(caller_id, &troops)?;
        let formation = Formation::new(&self.catalog, troops, strategy);

        let stored = formation.clone();
        self.store.battles.update(battle_id, |b| {
            if !b.status.accepts_orders() {
                return Err(EngineError::BattleLocked { status: b.status });
            }
            *b.formation_mut(side) = Some(stored);
            b.status = BattleStatus::Preparing;
            Ok(())
        })?;

        debug!(battle_id, caller_id, side = %side, power = formation.total_power, "formation set");
        Ok(formation)
    }

    fn validate_troops(&self, player_id: u64, troops: &[TroopStack]) -> Result<(), EngineError> {
        if troops.is_empty() {
            return Err(EngineError::InvalidFormation(
                "at least one troop stack is required".to_string(),
            ));
        }
        let max_level = self.config.battle.max_troop_level;
        let mut requested: BTreeMap<TroopType, u32> = BTreeMap::new();
        for stack in troops {
            if stack.count == 0 {
                return Err(EngineError::InvalidFormation(format!(
                    "{} stack has no troops",
                    stack.troop_type
                )));
            }
            if stack.level == 0 || stack.level > max_level {
                return Err(EngineError::InvalidFormation(format!(
                    "{} level {} outside 1..={max_level}",
                    stack.troop_type, stack.level
                )));
            }
            let total = requested.entry(stack.troop_type).or_insert(0);
            *total = total.saturating_add(stack.count);
        }

        let owned = self.services.inventory.counts(player_id)?;
        for (troop_type, requested) in requested {
            let available = owned.get(&troop_type).copied().unwrap_or(0);
            if requested > available {
                return Err(EngineError::InsufficientTroops {
                    troop_type,
                    requested,
                    available,
                });
            }
        }
        Ok(())
    }

    /// Record how close the caller is to the contested territory.
    pub fn report_battle_participation(
        &self,
        caller_id: u64,
        battle_id: u64,
        location: GeoPoint,
    ) -> Result<ParticipationReport, EngineError> {
        let battle = self.battle(battle_id)?;
        let side = battle.side_of(caller_id).ok_or(EngineError::NotParticipant)?;
        if !battle.status.accepts_orders() {
            return Err(EngineError::BattleLocked {
                status: battle.status,
            });
        }
        let territory = self.territory(battle.territory_id)?;

        let config = &self.config.battle;
        let distance_meters = territory.center.distance_meters(&location);
        let participation_type = combat::classify_distance(config, distance_meters);
        let effectiveness =
            combat::effectiveness(config, participation_type, side, battle.defense_bonus);

        self.store.battles.update(battle_id, |b| {
            if !b.status.accepts_orders() {
                return Err(EngineError::BattleLocked { status: b.status });
            }
            *b.participation_mut(side) = Some(participation_type);
            Ok(())
        })?;

        debug!(
            battle_id,
            caller_id,
            participation = %participation_type,
            distance_meters,
            "participation reported"
        );
        Ok(ParticipationReport {
            participation_type,
            effectiveness,
            distance_meters,
        })
    }
}
