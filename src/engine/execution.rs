use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use super::combat::{self, CombatInput, CombatOutcome};
use super::{siege, Engine};
use crate::collab::NotificationKind;
use crate::error::EngineError;
use crate::model::{
    BattleResult, BattleStatus, EventKind, GameTime, ParticipantRole, ScheduledBattle, Side,
    SideOutcome, Territory, TroopType,
};

/// What one pass of the pending-battle sweep did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BattleSweepReport {
    pub executed: Vec<u64>,
    /// Battles cancelled because execution failed, with the reason.
    pub failed: Vec<(u64, String)>,
    /// Due battles already claimed by another caller.
    pub skipped: Vec<u64>,
}

fn check_still_defended(
    territory: &Territory,
    battle: &ScheduledBattle,
) -> Result<(), EngineError> {
    if territory.owner_id != battle.defender_id {
        return Err(EngineError::BattleInvalidated(
            "territory changed owner".to_string(),
        ));
    }
    if territory.is_fallen() {
        return Err(EngineError::BattleInvalidated(
            "territory has already fallen".to_string(),
        ));
    }
    Ok(())
}

fn losses_by_type(outcome: &SideOutcome) -> BTreeMap<TroopType, u32> {
    let mut losses = BTreeMap::new();
    for stack in &outcome.losses {
        *losses.entry(stack.troop_type).or_insert(0) += stack.count;
    }
    losses
}

impl Engine {
    /// Run a battle on behalf of one of its participants.
    pub fn execute_battle(
        &self,
        caller_id: u64,
        battle_id: u64,
        now: GameTime,
    ) -> Result<BattleResult, EngineError> {
        let battle = self.battle(battle_id)?;
        if battle.side_of(caller_id).is_none() {
            return Err(EngineError::NotParticipant);
        }
        if now < battle.battle_starts_at {
            return Err(EngineError::BattleNotReady {
                starts_at: battle.battle_starts_at,
            });
        }
        self.run_battle(battle_id, now)
    }

    /// Resolve every due battle, oldest first, up to the configured batch
    /// size. One battle failing never stops the rest.
    pub fn process_pending_battles(&self, now: GameTime) -> BattleSweepReport {
        let mut due = self.store.battles.filter(|b| b.is_due(now));
        due.sort_by_key(|b| (b.battle_starts_at, b.id));
        due.truncate(self.config.sweep.batch_size);

        let mut report = BattleSweepReport::default();
        for battle in due {
            match self.run_battle(battle.id, now) {
                Ok(_) => report.executed.push(battle.id),
                Err(EngineError::BattleLocked { .. }) => {
                    debug!(battle_id = battle.id, "battle already claimed");
                    report.skipped.push(battle.id);
                }
                Err(err) => {
                    warn!(battle_id = battle.id, error = %err, "failed to process battle");
                    report.failed.push((battle.id, err.to_string()));
                }
            }
        }
        if !report.executed.is_empty() || !report.failed.is_empty() {
            info!(
                executed = report.executed.len(),
                failed = report.failed.len(),
                "pending battles processed"
            );
        }
        report
    }

    /// Claim the battle, then fight it. Exactly one caller can claim a given
    /// battle; any failure after the claim cancels it with the reason.
    fn run_battle(&self, battle_id: u64, now: GameTime) -> Result<BattleResult, EngineError> {
        let battle = self.store.battles.update(battle_id, |b| {
            if !b.status.accepts_orders() {
                return Err(EngineError::BattleLocked { status: b.status });
            }
            if now < b.battle_starts_at {
                return Err(EngineError::BattleNotReady {
                    starts_at: b.battle_starts_at,
                });
            }
            b.status = BattleStatus::Active;
            Ok(b.clone())
        })?;

        match self.fight(&battle, now) {
            Ok(result) => Ok(result),
            Err(err) => {
                self.cancel_battle(&battle, &err, now);
                Err(err)
            }
        }
    }

    fn fight(&self, battle: &ScheduledBattle, now: GameTime) -> Result<BattleResult, EngineError> {
        let territory = self.territory(battle.territory_id)?;
        check_still_defended(&territory, battle)?;

        let outcome = combat::resolve(
            &self.catalog,
            &self.config.battle,
            &CombatInput {
                attacker: battle.attacker_formation.as_ref(),
                defender: battle.defender_formation.as_ref(),
                attacker_participation: battle.attacker_participation.unwrap_or_default(),
                defender_participation: battle.defender_participation.unwrap_or_default(),
                defense_bonus: battle.defense_bonus,
            },
        );

        let transition = self.store.territories.update(battle.territory_id, |t| {
            check_still_defended(t, battle)?;
            Ok::<_, EngineError>(siege::apply_battle(
                t,
                outcome.winner,
                now,
                &self.config.siege,
            ))
        })?;

        let result = BattleResult {
            winner: outcome.winner,
            winner_id: battle.player_on(outcome.winner),
            is_decisive: outcome.is_decisive,
            rounds: outcome.rounds.clone(),
            attacker: outcome.attacker.clone(),
            defender: outcome.defender.clone(),
            previous_territory_state: transition.previous_state,
            new_territory_state: transition.new_state,
            territory_fallen: transition.fallen,
            attacker_xp: outcome.attacker_xp,
            defender_xp: outcome.defender_xp,
        };

        let stored = result.clone();
        self.store.battles.update(battle.id, |b| {
            b.status = BattleStatus::Completed;
            b.completed_at = Some(now);
            b.result = Some(stored);
            Ok::<_, EngineError>(())
        })?;

        info!(
            battle_id = battle.id,
            territory_id = battle.territory_id,
            winner = %result.winner,
            decisive = result.is_decisive,
            rounds = result.rounds.len(),
            new_state = %result.new_territory_state,
            "battle resolved"
        );

        // The outcome is committed; everything below is best effort.
        if transition.fallen {
            self.snapshot_blueprint(&territory);
        }
        self.apply_casualties(battle, &outcome);
        self.award_progression(battle, &outcome);
        if let Some(war_id) = battle.war_id {
            self.score_war_battle(war_id, battle, &result, now);
        }
        self.record_battle(battle, &territory, &result, now);
        Ok(result)
    }

    fn cancel_battle(&self, battle: &ScheduledBattle, err: &EngineError, now: GameTime) {
        let reason = err.to_string();
        let stored = reason.clone();
        let cancelled = self.store.battles.update(battle.id, |b| {
            b.status = BattleStatus::Cancelled;
            b.error = Some(stored);
            Ok::<_, EngineError>(())
        });
        if let Err(update_err) = cancelled {
            warn!(battle_id = battle.id, error = %update_err, "could not cancel battle");
            return;
        }
        warn!(battle_id = battle.id, reason = %reason, "battle cancelled");
        self.store.record_event(
            EventKind::BattleCancelled,
            now,
            format!("Battle {} cancelled: {reason}", battle.id),
            None,
            json!({ "reason": reason, "code": err.code() }),
            &[
                (battle.id, ParticipantRole::Battle),
                (battle.territory_id, ParticipantRole::Territory),
            ],
        );
    }

    fn snapshot_blueprint(&self, territory: &Territory) {
        let blueprint_id = match self
            .services
            .blueprints
            .save_snapshot(territory.owner_id, &territory.buildings)
        {
            Ok(id) => id,
            Err(err) => {
                warn!(territory_id = territory.id, error = %err, "blueprint snapshot failed");
                return;
            }
        };
        let saved = self.store.territories.update(territory.id, |t| {
            t.blueprint_id = Some(blueprint_id);
            Ok::<_, EngineError>(())
        });
        if let Err(err) = saved {
            warn!(territory_id = territory.id, error = %err, "could not record blueprint");
        }
    }

    /// Only troops drawn from the inventory are removed; fallback troops
    /// were never owned.
    fn apply_casualties(&self, battle: &ScheduledBattle, outcome: &CombatOutcome) {
        for side in [Side::Attacker, Side::Defender] {
            let used_fallback = match side {
                Side::Attacker => outcome.attacker_used_fallback,
                Side::Defender => outcome.defender_used_fallback,
            };
            if used_fallback {
                continue;
            }
            let losses = losses_by_type(outcome.side(side));
            if losses.is_empty() {
                continue;
            }
            let player_id = battle.player_on(side);
            if let Err(err) = self.services.inventory.remove(player_id, &losses) {
                warn!(
                    battle_id = battle.id,
                    player_id,
                    error = %err,
                    "could not remove lost troops"
                );
            }
        }
    }

    fn award_progression(&self, battle: &ScheduledBattle, outcome: &CombatOutcome) {
        for side in [Side::Attacker, Side::Defender] {
            let player_id = battle.player_on(side);
            self.services.progression.award_xp(player_id, outcome.xp(side));
            self.services.progression.check_achievements(player_id, "battle");
        }
    }

    fn score_war_battle(
        &self,
        war_id: u64,
        battle: &ScheduledBattle,
        result: &BattleResult,
        now: GameTime,
    ) {
        let Some(alliance_id) = battle.alliance_on(result.winner) else {
            return;
        };
        let war = &self.config.war;
        let mut points = war.points_per_win;
        if result.is_decisive {
            points += war.decisive_bonus_points;
        }
        if result.territory_fallen {
            points += war.territory_fallen_bonus_points;
        }
        if let Err(err) = self.record_war_battle(war_id, alliance_id, points, now) {
            debug!(war_id, battle_id = battle.id, error = %err, "battle not scored for war");
        }
    }

    fn record_battle(
        &self,
        battle: &ScheduledBattle,
        territory: &Territory,
        result: &BattleResult,
        now: GameTime,
    ) {
        let loser_id = battle.player_on(result.winner.opponent());
        let resolved = self.store.record_event(
            EventKind::BattleResolved,
            now,
            format!("Battle for {} won by the {}", territory.name, result.winner),
            None,
            json!({
                "winner": result.winner,
                "decisive": result.is_decisive,
                "rounds": result.rounds.len(),
                "attacker_lost": result.attacker.troops_lost,
                "defender_lost": result.defender.troops_lost,
                "new_state": result.new_territory_state,
            }),
            &[
                (battle.attacker_id, ParticipantRole::Attacker),
                (battle.defender_id, ParticipantRole::Defender),
                (result.winner_id, ParticipantRole::Winner),
                (battle.territory_id, ParticipantRole::Territory),
                (battle.id, ParticipantRole::Battle),
            ],
        );
        if result.territory_fallen {
            self.store.record_event(
                EventKind::TerritoryFallen,
                now,
                format!("{} has fallen", territory.name),
                Some(resolved),
                serde_json::Value::Null,
                &[
                    (battle.territory_id, ParticipantRole::Territory),
                    (battle.attacker_id, ParticipantRole::Attacker),
                    (battle.defender_id, ParticipantRole::Defender),
                ],
            );
        }

        let data = json!({ "battle_id": battle.id, "territory_id": battle.territory_id });
        self.notify(
            result.winner_id,
            NotificationKind::BattleResult,
            "Victory",
            format!("You won the battle for {}", territory.name),
            data.clone(),
        );
        self.notify(
            loser_id,
            NotificationKind::BattleResult,
            "Defeat",
            format!("You lost the battle for {}", territory.name),
            data.clone(),
        );
        if result.territory_fallen {
            self.notify(
                battle.defender_id,
                NotificationKind::TerritoryFallen,
                "Territory fallen",
                format!("{} has fallen and can be reclaimed later", territory.name),
                data,
            );
        }
    }
}
