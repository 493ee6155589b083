use territory_wars::model::{EventKind, Strategy, TroopStack, TroopType};
use territory_wars::scenario::Scenario;
use territory_wars::sim::SweepReport;
use territory_wars::testutil::{executed_battles, sweep_until};

fn main() {
    let mut s = Scenario::new();
    let red = s.add_alliance_with_members("Red Banner", 4);
    let blue = s.add_alliance_with_members("Blue Tide", 3);
    let mut blue_holds = Vec::new();
    for &member in &red.members {
        s.services().inventory.set_troops(member, TroopType::Cavalry, 120);
        s.services().inventory.set_troops(member, TroopType::Infantry, 200);
        s.add_territory("Red hold", member);
    }
    for &member in &blue.members {
        s.services().inventory.set_troops(member, TroopType::Pikeman, 150);
        let hold = s
            .territory("Blue hold", member)
            .building("wall", 3, &[("stone", 80)])
            .id();
        blue_holds.push(hold);
    }
    let built = s.build();
    let engine = &built.engine;
    let t0 = built.now;

    let war = match engine.declare_alliance_war(red.leader, blue.alliance, t0) {
        Ok(declaration) => declaration,
        Err(err) => {
            eprintln!("declaration rejected: {err}");
            return;
        }
    };
    eprintln!(
        "War {} declared at {}; fighting {} .. {}",
        war.war_id, t0, war.timeline.warning_ends_at, war.timeline.ends_at
    );

    // Red raids every Blue hold once the war is live.
    let mut raid_time = war.timeline.warning_ends_at;
    for (&attacker, &target) in red.members.iter().zip(&blue_holds) {
        match engine.schedule_battle(attacker, target, raid_time) {
            Ok(ticket) => {
                let troops = vec![
                    TroopStack::new(TroopType::Cavalry, 60, 2),
                    TroopStack::new(TroopType::Infantry, 100, 1),
                ];
                let formation = engine.set_battle_formation(
                    attacker,
                    ticket.battle_id,
                    troops,
                    Strategy::Aggressive,
                );
                if let Err(err) = formation {
                    eprintln!("formation for battle {} rejected: {err}", ticket.battle_id);
                }
                eprintln!("Battle {} starts at {}", ticket.battle_id, ticket.battle_starts_at);
            }
            Err(err) => eprintln!("raid by {attacker} on {target} rejected: {err}"),
        }
        raid_time = raid_time.plus_hours(1);
    }

    let reports = sweep_until(engine, t0, war.timeline.peace_treaty_ends_at);
    eprintln!("Battles executed: {:?}", executed_battles(&reports));
    for report in &reports {
        if let SweepReport::Wars { at, report } = report {
            if !report.is_empty() {
                eprintln!(
                    "{at}: started={:?} finalized={:?} peace_ended={:?}",
                    report.started, report.finalized, report.peace_ended
                );
            }
        }
    }

    for id in &blue_holds {
        if let Some(t) = engine.store().territories.get(*id) {
            eprintln!("{} #{}: {} ({} losses)", t.name, t.id, t.state, t.battle_losses);
        }
    }
    if let Some(w) = engine.store().wars.get(war.war_id) {
        eprintln!(
            "Final score {}-{}, winner {:?}, rewards {:?}",
            w.challenger_score, w.defender_score, w.winner_id, w.rewards
        );
    }
    let fallen = engine.store().events.of_kind(EventKind::TerritoryFallen).len();
    eprintln!("Events: {} total, {} territories fallen", engine.store().events.len(), fallen);
}
