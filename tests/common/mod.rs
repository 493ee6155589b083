#![allow(dead_code)]

use territory_wars::model::*;
use territory_wars::scenario::{AllianceIds, Built, Scenario};

/// Two unaligned players and one territory owned by the defender.
pub struct Duel {
    pub built: Built,
    pub attacker: u64,
    pub defender: u64,
    pub territory: u64,
}

/// Attacker holds 100 infantry, defender 50 archers; the territory sits at
/// (52.52, 13.405) with a level-2 wall.
pub fn duel() -> Duel {
    duel_with(|_| {})
}

pub fn duel_with(setup: impl FnOnce(&mut Scenario)) -> Duel {
    let mut s = Scenario::new();
    let attacker = s.player("Attacker").troops(TroopType::Infantry, 100).id();
    let defender = s
        .player("Defender")
        .troops(TroopType::Archer, 50)
        .resource("stone", 100)
        .id();
    let territory = s
        .territory("Riverside", defender)
        .center(52.52, 13.405)
        .building("wall", 2, &[("stone", 100)])
        .id();
    setup(&mut s);
    Duel {
        built: s.build(),
        attacker,
        defender,
        territory,
    }
}

pub fn infantry(count: u32) -> Vec<TroopStack> {
    vec![TroopStack::new(TroopType::Infantry, count, 1)]
}

pub fn archers(count: u32) -> Vec<TroopStack> {
    vec![TroopStack::new(TroopType::Archer, count, 1)]
}

/// Two three-member alliances, each member owning one territory and a
/// stock of cavalry.
pub struct Rivals {
    pub built: Built,
    pub red: AllianceIds,
    pub blue: AllianceIds,
    /// Territory per member, in member order.
    pub red_territories: Vec<u64>,
    pub blue_territories: Vec<u64>,
}

pub fn rivals() -> Rivals {
    let mut s = Scenario::new();
    let red = s.add_alliance_with_members("Red", 3);
    let blue = s.add_alliance_with_members("Blue", 3);
    let mut red_territories = Vec::new();
    let mut blue_territories = Vec::new();
    for (i, &member) in red.members.iter().enumerate() {
        s.services().inventory.set_troops(member, TroopType::Cavalry, 200);
        red_territories.push(s.add_territory(&format!("Red hold {i}"), member));
    }
    for (i, &member) in blue.members.iter().enumerate() {
        s.services().inventory.set_troops(member, TroopType::Cavalry, 200);
        blue_territories.push(s.add_territory(&format!("Blue hold {i}"), member));
    }
    Rivals {
        built: s.build(),
        red,
        blue,
        red_territories,
        blue_territories,
    }
}

pub fn read_lines(path: &std::path::Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}
