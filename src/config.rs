use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::{Strategy, TroopStack, TroopType};

/// Immutable engine configuration.
///
/// Built once at startup and shared via `Arc`; nothing mutates it at runtime.
/// Every section falls back to its defaults when absent from a config file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub eligibility: EligibilityConfig,
    pub battle: BattleConfig,
    pub siege: SiegeConfig,
    pub war: WarConfig,
    pub sweep: SweepConfig,
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EligibilityConfig {
    /// Implicit newcomer shield measured from account creation.
    pub newcomer_shield_days: u64,
    /// Below this idle time the defender is `active`.
    pub away_after_hours: u64,
    /// Below this idle time the defender is `away`.
    pub inactive_after_hours: u64,
    /// At or past this idle time the defender is `abandoned`.
    pub abandoned_after_hours: u64,
    pub away_bonus: f64,
    pub inactive_bonus: f64,
    /// Same attacker vs same territory, measured from the last completed battle.
    pub attack_cooldown_hours: u64,
}

impl Default for EligibilityConfig {
    fn default() -> Self {
        Self {
            newcomer_shield_days: 7,
            away_after_hours: 24,
            inactive_after_hours: 72,
            abandoned_after_hours: 168,
            away_bonus: 0.25,
            inactive_bonus: 0.50,
            attack_cooldown_hours: 48,
        }
    }
}

/// Formation used for a side that never submitted one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackPolicy {
    pub troop_type: TroopType,
    pub count: u32,
    pub level: u32,
    pub strategy: Strategy,
}

impl FallbackPolicy {
    pub fn stack(&self) -> TroopStack {
        TroopStack::new(self.troop_type, self.count, self.level)
    }
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            troop_type: TroopType::Scout,
            count: 1,
            level: 1,
            strategy: Strategy::Balanced,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    /// Mandatory lead time between scheduling and execution.
    pub lead_time_hours: u64,
    pub max_rounds: u32,
    pub max_troop_level: u32,
    pub physical_radius_meters: f64,
    pub nearby_radius_meters: f64,
    pub physical_effectiveness: f64,
    pub nearby_effectiveness: f64,
    pub remote_effectiveness: f64,
    /// Cap on defender effectiveness after adding the activity bonus.
    pub max_defender_effectiveness: f64,
    pub aggressive_multiplier: f64,
    pub defensive_multiplier: f64,
    pub balanced_multiplier: f64,
    pub defender_multiplier: f64,
    pub counter_multiplier: f64,
    pub weakness_multiplier: f64,
    /// Loser loss fraction at or above which a win is decisive.
    pub decisive_loss_fraction: f64,
    pub base_xp: u32,
    pub winner_xp: u32,
    pub decisive_xp: u32,
    pub fallback: FallbackPolicy,
}

impl BattleConfig {
    pub fn strategy_multiplier(&self, strategy: Strategy) -> f64 {
        match strategy {
            Strategy::Aggressive => self.aggressive_multiplier,
            Strategy::Defensive => self.defensive_multiplier,
            Strategy::Balanced => self.balanced_multiplier,
        }
    }
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            lead_time_hours: 24,
            max_rounds: 10,
            max_troop_level: 10,
            physical_radius_meters: 100.0,
            nearby_radius_meters: 1_000.0,
            physical_effectiveness: 1.0,
            nearby_effectiveness: 0.75,
            remote_effectiveness: 0.5,
            max_defender_effectiveness: 1.5,
            aggressive_multiplier: 1.2,
            defensive_multiplier: 0.8,
            balanced_multiplier: 1.0,
            defender_multiplier: 1.1,
            counter_multiplier: 1.5,
            weakness_multiplier: 0.6,
            decisive_loss_fraction: 0.7,
            base_xp: 50,
            winner_xp: 100,
            decisive_xp: 50,
            fallback: FallbackPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiegeConfig {
    pub losses_to_fall: u8,
    pub post_battle_shield_hours: u64,
    pub reclaim_cooldown_hours: u64,
    /// Share of the estimated rebuild cost charged on reclaim.
    pub reclaim_cost_fraction: f64,
}

impl Default for SiegeConfig {
    fn default() -> Self {
        Self {
            losses_to_fall: 3,
            post_battle_shield_hours: 6,
            reclaim_cooldown_hours: 24,
            reclaim_cost_fraction: 0.30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarConfig {
    pub warning_hours: u64,
    pub active_hours: u64,
    pub peace_treaty_hours: u64,
    pub min_alliance_members: usize,
    pub base_reward: u64,
    pub reward_per_battle: u64,
    /// Ledger resource the reward pool is paid in.
    pub reward_resource: String,
    pub points_per_win: u32,
    pub decisive_bonus_points: u32,
    pub territory_fallen_bonus_points: u32,
}

impl Default for WarConfig {
    fn default() -> Self {
        Self {
            warning_hours: 24,
            active_hours: 48,
            peace_treaty_hours: 72,
            min_alliance_members: 3,
            base_reward: 1_000,
            reward_per_battle: 100,
            reward_resource: "gold".to_string(),
            points_per_win: 10,
            decisive_bonus_points: 5,
            territory_fallen_bonus_points: 25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub interval_minutes: u64,
    /// Maximum due items handled per sweep pass.
    pub batch_size: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 5,
            batch_size: 50,
        }
    }
}
