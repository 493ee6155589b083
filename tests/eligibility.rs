use territory_wars::engine::ActivityTier;
use territory_wars::model::*;
use territory_wars::scenario::Scenario;
use territory_wars::EngineError;

#[test]
fn abandoned_defender_with_stale_shield_is_fair_game() {
    let mut s = Scenario::new();
    let now = s.now();
    let attacker = s.add_player("Raider");
    let defender = s
        .player("Ghost")
        .idle_hours(240)
        .shield_expires_at(Some(GameTime::from_minutes(now.as_minutes() - 5 * 24 * 60)))
        .id();
    let territory = s.add_territory("Empty manor", defender);
    let built = s.build();

    let check = built.engine.check_attack(attacker, territory, now);
    assert!(check.can_attack);
    assert_eq!(check.reason, None);
    assert_eq!(check.defense_bonus, 0.0);
    let protection = check.protection.unwrap();
    assert_eq!(protection.activity_tier, ActivityTier::Abandoned);
    assert!(!protection.newcomer_shield_active);
    assert!(protection.can_be_attacked);

    let ticket = built.engine.schedule_battle(attacker, territory, now).unwrap();
    let battle = built.engine.store().battles.get(ticket.battle_id).unwrap();
    assert_eq!(battle.defense_bonus, 0.0);
}

#[test]
fn newcomers_are_shielded_for_a_week() {
    let mut s = Scenario::new();
    let now = s.now();
    let attacker = s.add_player("Raider");
    let rookie = s.player("Rookie").created_days_ago(2).id();
    let territory = s.add_territory("Fresh farm", rookie);
    let built = s.build();

    let until = now.plus_days(5);
    let check = built.engine.check_attack(attacker, territory, now);
    assert!(!check.can_attack);
    assert_eq!(check.reason, Some(EngineError::NewcomerShield { until }));
    assert!(!check.protection.unwrap().can_be_attacked);

    let err = built
        .engine
        .schedule_battle(attacker, territory, now)
        .unwrap_err();
    assert_eq!(err, EngineError::NewcomerShield { until });

    assert!(built.engine.check_attack(attacker, territory, until).can_attack);
}

#[test]
fn explicit_shield_extends_newcomer_protection() {
    let mut s = Scenario::new();
    let now = s.now();
    let attacker = s.add_player("Raider");
    let rookie = s
        .player("Rookie")
        .created_days_ago(2)
        .shield_expires_at(Some(now.plus_days(10)))
        .id();
    let territory = s.add_territory("Fresh farm", rookie);
    let built = s.build();

    let check = built.engine.check_attack(attacker, territory, now.plus_days(6));
    assert_eq!(
        check.reason,
        Some(EngineError::NewcomerShield {
            until: now.plus_days(10)
        })
    );
}

#[test]
fn away_bonus_is_snapshotted_at_scheduling() {
    let mut s = Scenario::new();
    let now = s.now();
    let attacker = s.add_player("Raider");
    let sleeper = s.player("Sleeper").idle_hours(30).id();
    let territory = s
        .territory("Quiet mill", sleeper)
        .center(48.85, 2.35)
        .id();
    let built = s.build();
    let engine = &built.engine;

    let check = engine.check_attack(attacker, territory, now);
    assert_eq!(check.protection.unwrap().activity_tier, ActivityTier::Away);
    assert_eq!(check.defense_bonus, 0.25);

    let ticket = engine.schedule_battle(attacker, territory, now).unwrap();
    assert_eq!(
        engine.store().battles.get(ticket.battle_id).unwrap().defense_bonus,
        0.25
    );

    // Logging in after scheduling does not remove the bonus.
    engine
        .store()
        .players
        .update(sleeper, |p| {
            p.last_active_at = now.plus_hours(1);
            Ok::<_, EngineError>(())
        })
        .unwrap();
    let report = engine
        .report_battle_participation(sleeper, ticket.battle_id, GeoPoint::new(40.0, -3.7))
        .unwrap();
    assert_eq!(report.participation_type, ParticipationType::Remote);
    assert_eq!(report.effectiveness, 0.75);
}

#[test]
fn shields_raised_after_scheduling_do_not_stop_the_battle() {
    let mut s = Scenario::new();
    let now = s.now();
    let attacker = s.add_player("Raider");
    let defender = s.add_player("Holder");
    let territory = s.add_territory("Border keep", defender);
    let built = s.build();
    let engine = &built.engine;

    let ticket = engine.schedule_battle(attacker, territory, now).unwrap();
    engine
        .store()
        .players
        .update(defender, |p| {
            p.shield_expires_at = Some(now.plus_days(30));
            Ok::<_, EngineError>(())
        })
        .unwrap();
    assert_eq!(
        engine.check_attack(attacker, territory, now.plus_hours(1)).reason,
        Some(EngineError::NewcomerShield {
            until: now.plus_days(30)
        })
    );

    engine
        .execute_battle(attacker, ticket.battle_id, ticket.battle_starts_at)
        .unwrap();
    let battle = engine.store().battles.get(ticket.battle_id).unwrap();
    assert_eq!(battle.status, BattleStatus::Completed);
    assert!(battle.result.is_some());
}

#[test]
fn inactive_defender_on_site_hits_the_effectiveness_cap() {
    let mut s = Scenario::new();
    let now = s.now();
    let attacker = s.add_player("Raider");
    let absent = s.player("Absent").idle_hours(100).id();
    let territory = s.territory("Hill fort", absent).center(52.52, 13.405).id();
    let built = s.build();

    let check = built.engine.check_attack(attacker, territory, now);
    assert_eq!(check.protection.unwrap().activity_tier, ActivityTier::Inactive);
    assert_eq!(check.defense_bonus, 0.5);

    let ticket = built.engine.schedule_battle(attacker, territory, now).unwrap();
    let report = built
        .engine
        .report_battle_participation(absent, ticket.battle_id, GeoPoint::new(52.52, 13.405))
        .unwrap();
    assert_eq!(report.participation_type, ParticipationType::Physical);
    assert_eq!(report.effectiveness, 1.5);
}

#[test]
fn checks_stop_at_the_first_failure() {
    let mut s = Scenario::new();
    let now = s.now();
    let attacker = s.add_player("Raider");
    let owner = s.add_player("Owner");
    let own = s.add_territory("Home", attacker);
    let shielded = s
        .territory("Walled town", owner)
        .shield_expires_at(Some(now.plus_hours(2)))
        .id();
    let ruined = s.territory("Ruin", owner).fallen_at(now).id();
    let built = s.build();
    let engine = &built.engine;

    let reason = |territory| engine.check_attack(attacker, territory, now).reason;
    assert_eq!(reason(own), Some(EngineError::SelfAttack));
    assert_eq!(
        reason(shielded),
        Some(EngineError::TerritoryShielded {
            until: now.plus_hours(2)
        })
    );
    assert_eq!(reason(ruined), Some(EngineError::AlreadyFallen));
    assert_eq!(reason(4_242), Some(EngineError::TerritoryNotFound(4_242)));

    assert!(engine.check_attack(attacker, shielded, now.plus_hours(2)).can_attack);
}

#[test]
fn checking_leaves_no_trace() {
    let mut s = Scenario::new();
    let now = s.now();
    let attacker = s.add_player("Raider");
    let owner = s.add_player("Owner");
    let territory = s.add_territory("Orchard", owner);
    let built = s.build();
    let engine = &built.engine;

    let versioned = engine.store().territories.get_versioned(territory).unwrap();
    for _ in 0..3 {
        assert!(engine.check_attack(attacker, territory, now).can_attack);
    }
    assert!(engine.store().battles.is_empty());
    assert!(engine.store().events.is_empty());
    assert_eq!(
        engine.store().territories.get_versioned(territory).unwrap().version,
        versioned.version
    );
    assert!(built.services.notifier.sent().is_empty());
}
