use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum TroopType {
    Infantry,
    Archer,
    Cavalry,
    Pikeman,
    Siege,
    Scout,
}

string_enum!(TroopType {
    Infantry => "infantry",
    Archer => "archer",
    Cavalry => "cavalry",
    Pikeman => "pikeman",
    Siege => "siege",
    Scout => "scout",
});

/// Static combat profile of one troop type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TroopStats {
    pub base_attack: u32,
    pub base_defense: u32,
    pub base_health: u32,
    /// Resource cost to train one unit, keyed by resource name.
    pub training_cost: BTreeMap<String, u64>,
    /// Opposing types this type deals amplified damage to.
    pub strong_against: Vec<TroopType>,
    /// Opposing types this type deals reduced damage to.
    pub weak_against: Vec<TroopType>,
}

impl TroopStats {
    /// Power contributed by one unit at level 1:
    /// `attack + defense + health / 10`.
    pub fn unit_power(&self) -> f64 {
        f64::from(self.base_attack)
            + f64::from(self.base_defense)
            + f64::from(self.base_health) / 10.0
    }
}

/// Immutable troop definition table.
///
/// Built once at process start and shared by reference; counters are
/// directed, so `a` countering `b` says nothing about `b` versus `a`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TroopCatalog {
    stats: BTreeMap<TroopType, TroopStats>,
}

fn cost(gold: u64, food: u64) -> BTreeMap<String, u64> {
    BTreeMap::from([("gold".to_string(), gold), ("food".to_string(), food)])
}

impl TroopCatalog {
    /// The standard six-type roster.
    pub fn standard() -> Self {
        use TroopType::*;
        let mut stats = BTreeMap::new();
        stats.insert(
            Infantry,
            TroopStats {
                base_attack: 10,
                base_defense: 10,
                base_health: 100,
                training_cost: cost(50, 10),
                strong_against: vec![Archer],
                weak_against: vec![Cavalry],
            },
        );
        stats.insert(
            Archer,
            TroopStats {
                base_attack: 12,
                base_defense: 5,
                base_health: 60,
                training_cost: cost(60, 8),
                strong_against: vec![Pikeman],
                weak_against: vec![Cavalry, Infantry],
            },
        );
        stats.insert(
            Cavalry,
            TroopStats {
                base_attack: 15,
                base_defense: 8,
                base_health: 120,
                training_cost: cost(100, 20),
                strong_against: vec![Archer, Siege],
                weak_against: vec![Pikeman],
            },
        );
        stats.insert(
            Pikeman,
            TroopStats {
                base_attack: 8,
                base_defense: 14,
                base_health: 90,
                training_cost: cost(70, 12),
                strong_against: vec![Cavalry],
                weak_against: vec![Archer, Siege],
            },
        );
        stats.insert(
            Siege,
            TroopStats {
                base_attack: 25,
                base_defense: 3,
                base_health: 80,
                training_cost: cost(150, 5),
                strong_against: vec![Pikeman, Infantry],
                weak_against: vec![Cavalry, Scout],
            },
        );
        stats.insert(
            Scout,
            TroopStats {
                base_attack: 4,
                base_defense: 3,
                base_health: 40,
                training_cost: cost(20, 4),
                strong_against: vec![Siege],
                weak_against: vec![Infantry, Cavalry],
            },
        );
        Self { stats }
    }

    pub fn stats(&self, troop_type: TroopType) -> &TroopStats {
        // Every variant is inserted by the constructors.
        &self.stats[&troop_type]
    }

    pub fn is_strong_against(&self, attacker: TroopType, target: TroopType) -> bool {
        self.stats(attacker).strong_against.contains(&target)
    }

    pub fn is_weak_against(&self, attacker: TroopType, target: TroopType) -> bool {
        self.stats(attacker).weak_against.contains(&target)
    }
}

impl Default for TroopCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
