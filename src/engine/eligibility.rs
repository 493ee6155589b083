use serde::{Deserialize, Serialize};

use super::Engine;
use crate::config::EligibilityConfig;
use crate::error::EngineError;
use crate::model::time::MINUTES_PER_HOUR;
use crate::model::{BattleStatus, GameTime, Player};

/// Defender activity bucket derived from time since last login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ActivityTier {
    Active,
    Away,
    Inactive,
    Abandoned,
}

string_enum!(ActivityTier {
    Active => "active",
    Away => "away",
    Inactive => "inactive",
    Abandoned => "abandoned",
});

impl ActivityTier {
    /// Bucket by minutes since last login, compared against hour thresholds.
    pub fn from_idle_minutes(idle_minutes: u64, config: &EligibilityConfig) -> Self {
        let hours = |h: u64| h * MINUTES_PER_HOUR;
        if idle_minutes < hours(config.away_after_hours) {
            ActivityTier::Active
        } else if idle_minutes < hours(config.inactive_after_hours) {
            ActivityTier::Away
        } else if idle_minutes < hours(config.abandoned_after_hours) {
            ActivityTier::Inactive
        } else {
            ActivityTier::Abandoned
        }
    }

    /// Defensive bonus carried into combat. Abandoned accounts get nothing.
    pub fn defense_bonus(self, config: &EligibilityConfig) -> f64 {
        match self {
            ActivityTier::Active | ActivityTier::Abandoned => 0.0,
            ActivityTier::Away => config.away_bonus,
            ActivityTier::Inactive => config.inactive_bonus,
        }
    }
}

/// Derived on every check from the defender's stored timestamps; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProtectionStatus {
    pub newcomer_shield_until: GameTime,
    pub newcomer_shield_active: bool,
    pub activity_tier: ActivityTier,
    pub defense_bonus: f64,
    pub can_be_attacked: bool,
}

impl ProtectionStatus {
    pub fn of(player: &Player, now: GameTime, config: &EligibilityConfig) -> Self {
        let implicit = player.created_at.plus_days(config.newcomer_shield_days);
        let newcomer_shield_until = player
            .shield_expires_at
            .map_or(implicit, |explicit| explicit.max(implicit));
        let newcomer_shield_active = now < newcomer_shield_until;
        let activity_tier =
            ActivityTier::from_idle_minutes(now.minutes_since(player.last_active_at), config);
        Self {
            newcomer_shield_until,
            newcomer_shield_active,
            activity_tier,
            defense_bonus: activity_tier.defense_bonus(config),
            can_be_attacked: !newcomer_shield_active,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttackEligibility {
    pub can_attack: bool,
    pub reason: Option<EngineError>,
    pub defense_bonus: f64,
    pub protection: Option<ProtectionStatus>,
}

impl AttackEligibility {
    fn blocked(reason: EngineError, protection: Option<ProtectionStatus>) -> Self {
        Self {
            can_attack: false,
            reason: Some(reason),
            defense_bonus: protection.map_or(0.0, |p| p.defense_bonus),
            protection,
        }
    }

    /// Turn a blocked check into its rejection reason.
    pub fn into_result(self) -> Result<Self, EngineError> {
        match self.reason.clone() {
            Some(reason) => Err(reason),
            None => Ok(self),
        }
    }
}

impl Engine {
    /// Whether `attacker_id` may attack `territory_id` right now.
    ///
    /// Checks run in a fixed order and stop at the first failure. Read-only:
    /// calling it any number of times has no effect on stored state.
    pub fn check_attack(
        &self,
        attacker_id: u64,
        territory_id: u64,
        now: GameTime,
    ) -> AttackEligibility {
        let config = &self.config.eligibility;

        let Some(territory) = self.store.territories.get(territory_id) else {
            return AttackEligibility::blocked(EngineError::TerritoryNotFound(territory_id), None);
        };
        if territory.owner_id == attacker_id {
            return AttackEligibility::blocked(EngineError::SelfAttack, None);
        }
        if territory.is_fallen() {
            return AttackEligibility::blocked(EngineError::AlreadyFallen, None);
        }
        if let Some(until) = territory.shield_expires_at.filter(|&t| t > now) {
            return AttackEligibility::blocked(EngineError::TerritoryShielded { until }, None);
        }

        let Some(defender) = self.store.players.get(territory.owner_id) else {
            return AttackEligibility::blocked(
                EngineError::PlayerNotFound(territory.owner_id),
                None,
            );
        };
        let protection = ProtectionStatus::of(&defender, now, config);
        if protection.newcomer_shield_active {
            return AttackEligibility::blocked(
                EngineError::NewcomerShield {
                    until: protection.newcomer_shield_until,
                },
                Some(protection),
            );
        }

        let last_completed = self
            .store
            .battles
            .filter(|b| {
                b.status == BattleStatus::Completed
                    && b.attacker_id == attacker_id
                    && b.territory_id == territory_id
            })
            .into_iter()
            .filter_map(|b| b.completed_at)
            .max();
        if let Some(last) = last_completed {
            let until = last.plus_hours(config.attack_cooldown_hours);
            if now < until {
                return AttackEligibility::blocked(
                    EngineError::AttackCooldown { until },
                    Some(protection),
                );
            }
        }

        AttackEligibility {
            can_attack: true,
            reason: None,
            defense_bonus: protection.defense_bonus,
            protection: Some(protection),
        }
    }
}
