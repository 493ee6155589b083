mod common;

use common::{archers, duel, duel_with, infantry, Duel};
use territory_wars::collab::NotificationKind;
use territory_wars::engine::BattleTicket;
use territory_wars::model::*;
use territory_wars::scenario::Scenario;
use territory_wars::EngineError;

fn scheduled(d: &Duel) -> BattleTicket {
    d.built
        .engine
        .schedule_battle(d.attacker, d.territory, d.built.now)
        .unwrap()
}

#[test]
fn infantry_overruns_archers_end_to_end() {
    let d = duel();
    let engine = &d.built.engine;
    let ticket = scheduled(&d);
    assert_eq!(ticket.battle_starts_at, d.built.now.plus_hours(24));

    engine
        .set_battle_formation(d.attacker, ticket.battle_id, infantry(100), Strategy::Balanced)
        .unwrap();
    engine
        .set_battle_formation(d.defender, ticket.battle_id, archers(50), Strategy::Balanced)
        .unwrap();
    let battle = engine.store().battles.get(ticket.battle_id).unwrap();
    assert_eq!(battle.status, BattleStatus::Preparing);
    assert_eq!(battle.war_id, None);

    let early = engine
        .execute_battle(d.attacker, ticket.battle_id, d.built.now.plus_hours(23))
        .unwrap_err();
    assert_eq!(
        early,
        EngineError::BattleNotReady {
            starts_at: ticket.battle_starts_at
        }
    );

    let result = engine
        .execute_battle(d.defender, ticket.battle_id, ticket.battle_starts_at)
        .unwrap();
    assert_eq!(result.winner, Side::Attacker);
    assert_eq!(result.winner_id, d.attacker);
    assert!(result.is_decisive);
    assert_eq!(result.defender.remaining(), 0);
    assert!(result.rounds.len() <= 10);
    assert_eq!(result.previous_territory_state, TerritoryState::Secure);
    assert_eq!(result.new_territory_state, TerritoryState::Contested);
    assert!(!result.territory_fallen);
    assert_eq!(result.attacker_xp, 200);
    assert_eq!(result.defender_xp, 50);

    let territory = engine.store().territories.get(d.territory).unwrap();
    assert_eq!(territory.state, TerritoryState::Contested);
    assert_eq!(territory.battle_losses, 1);
    assert_eq!(
        territory.shield_expires_at,
        Some(ticket.battle_starts_at.plus_hours(6))
    );

    let battle = engine.store().battles.get(ticket.battle_id).unwrap();
    assert_eq!(battle.status, BattleStatus::Completed);
    assert_eq!(battle.completed_at, Some(ticket.battle_starts_at));
    assert_eq!(battle.result.as_ref(), Some(&result));
}

#[test]
fn casualties_and_progression_reach_collaborators() {
    let d = duel();
    let engine = &d.built.engine;
    let services = &d.built.services;
    let ticket = scheduled(&d);
    engine
        .set_battle_formation(d.attacker, ticket.battle_id, infantry(100), Strategy::Balanced)
        .unwrap();
    engine
        .set_battle_formation(d.defender, ticket.battle_id, archers(50), Strategy::Balanced)
        .unwrap();
    let result = engine
        .execute_battle(d.attacker, ticket.battle_id, ticket.battle_starts_at)
        .unwrap();

    assert_eq!(
        services.inventory.count(d.attacker, TroopType::Infantry),
        100 - result.attacker.troops_lost
    );
    assert_eq!(services.inventory.count(d.defender, TroopType::Archer), 0);

    assert_eq!(services.progression.xp(d.attacker), 200);
    assert_eq!(services.progression.xp(d.defender), 50);
    let checks = services.progression.achievement_checks();
    assert!(checks.contains(&(d.attacker, "battle".to_string())));
    assert!(checks.contains(&(d.defender, "battle".to_string())));

    let to_defender: Vec<_> = services
        .notifier
        .sent_to_user(d.defender)
        .into_iter()
        .map(|n| n.kind)
        .collect();
    assert_eq!(
        to_defender,
        vec![NotificationKind::BattleScheduled, NotificationKind::BattleResult]
    );
    let to_attacker = services.notifier.sent_to_user(d.attacker);
    assert_eq!(to_attacker.len(), 1);
    assert_eq!(to_attacker[0].title, "Victory");

    let events = engine.store().events.of_kind(EventKind::BattleResolved);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].timestamp, ticket.battle_starts_at);
    assert_eq!(events[0].data["winner"], "attacker");
}

#[test]
fn a_battle_runs_only_once() {
    let d = duel();
    let engine = &d.built.engine;
    let ticket = scheduled(&d);
    engine
        .execute_battle(d.attacker, ticket.battle_id, ticket.battle_starts_at)
        .unwrap();
    let again = engine
        .execute_battle(d.attacker, ticket.battle_id, ticket.battle_starts_at)
        .unwrap_err();
    assert_eq!(
        again,
        EngineError::BattleLocked {
            status: BattleStatus::Completed
        }
    );
    let report = engine.process_pending_battles(ticket.battle_starts_at.plus_hours(1));
    assert!(report.executed.is_empty());
    assert_eq!(engine.store().events.of_kind(EventKind::BattleResolved).len(), 1);
}

#[test]
fn only_participants_may_act_on_a_battle() {
    let mut bystander = 0;
    let d = duel_with(|s| bystander = s.add_player("Bystander"));
    let engine = &d.built.engine;
    let ticket = scheduled(&d);

    let err = engine
        .set_battle_formation(bystander, ticket.battle_id, infantry(1), Strategy::Balanced)
        .unwrap_err();
    assert_eq!(err, EngineError::NotParticipant);
    let err = engine
        .report_battle_participation(bystander, ticket.battle_id, GeoPoint::new(52.52, 13.405))
        .unwrap_err();
    assert_eq!(err, EngineError::NotParticipant);
    let err = engine
        .execute_battle(bystander, ticket.battle_id, ticket.battle_starts_at)
        .unwrap_err();
    assert_eq!(err, EngineError::NotParticipant);

    let missing = engine
        .execute_battle(d.attacker, 9_999, ticket.battle_starts_at)
        .unwrap_err();
    assert_eq!(missing, EngineError::BattleNotFound(9_999));
}

#[test]
fn formations_are_validated_against_inventory() {
    let d = duel();
    let engine = &d.built.engine;
    let id = scheduled(&d).battle_id;

    let empty = engine
        .set_battle_formation(d.attacker, id, Vec::new(), Strategy::Balanced)
        .unwrap_err();
    assert!(matches!(empty, EngineError::InvalidFormation(_)));

    let zero = engine
        .set_battle_formation(d.attacker, id, infantry(0), Strategy::Balanced)
        .unwrap_err();
    assert!(matches!(zero, EngineError::InvalidFormation(_)));

    let too_high = vec![TroopStack::new(TroopType::Infantry, 10, 11)];
    let err = engine
        .set_battle_formation(d.attacker, id, too_high, Strategy::Balanced)
        .unwrap_err();
    assert_eq!(err.code(), "invalid_formation");

    // Stacks of the same type are summed before checking the inventory.
    let split = vec![
        TroopStack::new(TroopType::Infantry, 60, 1),
        TroopStack::new(TroopType::Infantry, 60, 2),
    ];
    let err = engine
        .set_battle_formation(d.attacker, id, split, Strategy::Aggressive)
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InsufficientTroops {
            troop_type: TroopType::Infantry,
            requested: 120,
            available: 100,
        }
    );

    let unowned = vec![TroopStack::new(TroopType::Cavalry, 1, 1)];
    let err = engine
        .set_battle_formation(d.attacker, id, unowned, Strategy::Aggressive)
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InsufficientTroops {
            troop_type: TroopType::Cavalry,
            requested: 1,
            available: 0,
        }
    );

    // Nothing was stored by the rejected submissions.
    let battle = engine.store().battles.get(id).unwrap();
    assert_eq!(battle.status, BattleStatus::Scheduled);
    assert!(battle.attacker_formation.is_none());
}

#[test]
fn resubmitting_a_formation_replaces_it() {
    let d = duel();
    let engine = &d.built.engine;
    let id = scheduled(&d).battle_id;

    engine
        .set_battle_formation(d.attacker, id, infantry(40), Strategy::Aggressive)
        .unwrap();
    let second = engine
        .set_battle_formation(d.attacker, id, infantry(90), Strategy::Defensive)
        .unwrap();
    assert_eq!(second.troop_count(), 90);
    assert!(second.total_power > 0.0);

    let stored = engine.store().battles.get(id).unwrap().attacker_formation.unwrap();
    assert_eq!(stored, second);
    assert_eq!(stored.strategy, Strategy::Defensive);
}

#[test]
fn orders_are_rejected_once_the_battle_is_over() {
    let d = duel();
    let engine = &d.built.engine;
    let ticket = scheduled(&d);
    engine
        .execute_battle(d.attacker, ticket.battle_id, ticket.battle_starts_at)
        .unwrap();

    let err = engine
        .set_battle_formation(d.attacker, ticket.battle_id, infantry(10), Strategy::Balanced)
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::BattleLocked {
            status: BattleStatus::Completed
        }
    );
    let err = engine
        .report_battle_participation(d.defender, ticket.battle_id, GeoPoint::new(52.52, 13.405))
        .unwrap_err();
    assert_eq!(err.code(), "battle_locked");
}

#[test]
fn participation_is_classified_by_distance() {
    let d = duel();
    let engine = &d.built.engine;
    let id = scheduled(&d).battle_id;

    let on_site = engine
        .report_battle_participation(d.attacker, id, GeoPoint::new(52.52, 13.405))
        .unwrap();
    assert_eq!(on_site.participation_type, ParticipationType::Physical);
    assert!(on_site.distance_meters < 1.0);
    assert_eq!(on_site.effectiveness, 1.0);

    // 0.005 degrees of latitude is roughly 556 m.
    let close = engine
        .report_battle_participation(d.defender, id, GeoPoint::new(52.525, 13.405))
        .unwrap();
    assert_eq!(close.participation_type, ParticipationType::Nearby);
    assert!((close.distance_meters - 556.0).abs() < 5.0);
    assert_eq!(close.effectiveness, 0.75);

    // Roughly 2.2 km; the later report wins.
    let far = engine
        .report_battle_participation(d.attacker, id, GeoPoint::new(52.54, 13.405))
        .unwrap();
    assert_eq!(far.participation_type, ParticipationType::Remote);
    assert_eq!(far.effectiveness, 0.5);

    let battle = engine.store().battles.get(id).unwrap();
    assert_eq!(battle.attacker_participation, Some(ParticipationType::Remote));
    assert_eq!(battle.defender_participation, Some(ParticipationType::Nearby));
}

#[test]
fn missing_formations_fall_back_without_touching_inventory() {
    let d = duel();
    let engine = &d.built.engine;
    let ticket = scheduled(&d);
    engine
        .set_battle_formation(d.attacker, ticket.battle_id, infantry(30), Strategy::Balanced)
        .unwrap();

    let result = engine
        .execute_battle(d.attacker, ticket.battle_id, ticket.battle_starts_at)
        .unwrap();
    assert_eq!(result.winner, Side::Attacker);
    assert_eq!(result.defender.starting_troops, 1);
    assert_eq!(result.defender.remaining(), 0);

    // The defender's 50 archers never took the field.
    assert_eq!(d.built.services.inventory.count(d.defender, TroopType::Archer), 50);
    assert_eq!(
        d.built.services.inventory.count(d.attacker, TroopType::Infantry),
        100 - result.attacker.troops_lost
    );
}

#[test]
fn one_open_battle_per_territory() {
    let mut rival = 0;
    let d = duel_with(|s| rival = s.add_player("Rival"));
    let engine = &d.built.engine;
    let first = scheduled(&d);

    let err = engine
        .schedule_battle(rival, d.territory, d.built.now.plus_hours(1))
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::BattleAlreadyPending {
            battle_id: first.battle_id
        }
    );
    assert_eq!(engine.store().battles.len(), 1);
}

#[test]
fn repeat_attacks_wait_out_the_cooldown() {
    let d = duel();
    let engine = &d.built.engine;
    let ticket = scheduled(&d);
    let fought_at = ticket.battle_starts_at;
    engine
        .execute_battle(d.attacker, ticket.battle_id, fought_at)
        .unwrap();

    let shielded = engine
        .schedule_battle(d.attacker, d.territory, fought_at.plus_hours(1))
        .unwrap_err();
    assert_eq!(
        shielded,
        EngineError::TerritoryShielded {
            until: fought_at.plus_hours(6)
        }
    );

    let cooling = engine
        .schedule_battle(d.attacker, d.territory, fought_at.plus_hours(7))
        .unwrap_err();
    assert_eq!(
        cooling,
        EngineError::AttackCooldown {
            until: fought_at.plus_hours(48)
        }
    );

    engine
        .schedule_battle(d.attacker, d.territory, fought_at.plus_hours(48))
        .unwrap();
}

#[test]
fn alliance_members_cannot_attack_each_other() {
    let mut s = Scenario::new();
    let a = s.add_player("A");
    let b = s.add_player("B");
    let territory = s.add_territory("Shared border", b);
    s.add_alliance("Pact", a, &[b]);
    let built = s.build();

    let err = built
        .engine
        .schedule_battle(a, territory, built.now)
        .unwrap_err();
    assert_eq!(err, EngineError::AllyTerritory);
    assert!(built.engine.store().battles.is_empty());
}

#[test]
fn ownership_change_cancels_the_battle() {
    let mut newcomer = 0;
    let d = duel_with(|s| newcomer = s.add_player("New owner"));
    let engine = &d.built.engine;
    let ticket = scheduled(&d);

    engine
        .store()
        .territories
        .update(d.territory, |t| {
            t.owner_id = newcomer;
            Ok::<_, EngineError>(())
        })
        .unwrap();

    let report = engine.process_pending_battles(ticket.battle_starts_at);
    assert!(report.executed.is_empty());
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, ticket.battle_id);

    let battle = engine.store().battles.get(ticket.battle_id).unwrap();
    assert_eq!(battle.status, BattleStatus::Cancelled);
    assert!(battle.error.unwrap().contains("changed owner"));
    assert_eq!(engine.store().events.of_kind(EventKind::BattleCancelled).len(), 1);

    // The territory itself was not touched.
    let territory = engine.store().territories.get(d.territory).unwrap();
    assert_eq!(territory.state, TerritoryState::Secure);
    assert_eq!(territory.shield_expires_at, None);
}

#[test]
fn sweep_runs_due_battles_oldest_first() {
    let mut second_territory = 0;
    let d = duel_with(|s| {
        let owner = s.add_player("Far owner");
        second_territory = s.add_territory("Far hill", owner);
    });
    let engine = &d.built.engine;
    let early = scheduled(&d);
    let late = engine
        .schedule_battle(d.attacker, second_territory, d.built.now.plus_hours(2))
        .unwrap();

    let first_pass = engine.process_pending_battles(early.battle_starts_at);
    assert_eq!(first_pass.executed, vec![early.battle_id]);
    assert_eq!(
        engine.store().battles.get(late.battle_id).unwrap().status,
        BattleStatus::Scheduled
    );

    let second_pass = engine.process_pending_battles(late.battle_starts_at);
    assert_eq!(second_pass.executed, vec![late.battle_id]);
}
