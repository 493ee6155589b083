use serde::{Deserialize, Serialize};

use super::troop::{TroopCatalog, TroopType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Strategy {
    Aggressive,
    Defensive,
    #[default]
    Balanced,
}

string_enum!(Strategy {
    Aggressive => "aggressive",
    Defensive => "defensive",
    Balanced => "balanced",
});

/// One troop stack within a formation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TroopStack {
    pub troop_type: TroopType,
    pub count: u32,
    pub level: u32,
}

impl TroopStack {
    pub fn new(troop_type: TroopType, count: u32, level: u32) -> Self {
        Self {
            troop_type,
            count,
            level,
        }
    }
}

/// A side's declared troops and strategy for one battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Formation {
    pub troops: Vec<TroopStack>,
    pub total_power: f64,
    pub strategy: Strategy,
}

impl Formation {
    /// Build a formation, deriving `total_power` as
    /// `Σ (attack + defense + health / 10) × count × level`.
    pub fn new(catalog: &TroopCatalog, troops: Vec<TroopStack>, strategy: Strategy) -> Self {
        let total_power = troops
            .iter()
            .map(|s| {
                catalog.stats(s.troop_type).unit_power() * f64::from(s.count) * f64::from(s.level)
            })
            .sum();
        Self {
            troops,
            total_power,
            strategy,
        }
    }

    pub fn troop_count(&self) -> u32 {
        self.troops.iter().map(|s| s.count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_power_sums_stacks() {
        let catalog = TroopCatalog::standard();
        let formation = Formation::new(
            &catalog,
            vec![
                TroopStack::new(TroopType::Infantry, 10, 2),
                TroopStack::new(TroopType::Scout, 5, 1),
            ],
            Strategy::Aggressive,
        );
        // infantry 30 * 10 * 2 = 600, scout (4 + 3 + 4) * 5 = 55
        assert_eq!(formation.total_power, 655.0);
        assert_eq!(formation.troop_count(), 15);
    }

    #[test]
    fn strategy_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&Strategy::Defensive).unwrap(),
            "\"defensive\""
        );
        assert_eq!(Strategy::default(), Strategy::Balanced);
    }
}
