//! Territory siege track and reclaim.
//!
//! A territory walks `secure -> contested -> vulnerable -> fallen` as
//! attackers win and back down one step per successful defense. Fallen is
//! terminal until the previous owner pays to reclaim it.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use super::Engine;
use crate::collab::NotificationKind;
use crate::config::SiegeConfig;
use crate::error::EngineError;
use crate::model::{EventKind, GameTime, ParticipantRole, Side, Territory, TerritoryState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SiegeTransition {
    pub previous_state: TerritoryState,
    pub new_state: TerritoryState,
    pub previous_losses: u8,
    pub new_losses: u8,
    pub fallen: bool,
}

fn state_for_losses(losses: u8, losses_to_fall: u8) -> TerritoryState {
    match losses {
        l if l >= losses_to_fall => TerritoryState::Fallen,
        0 => TerritoryState::Secure,
        1 => TerritoryState::Contested,
        _ => TerritoryState::Vulnerable,
    }
}

/// Next siege state after a battle won by `winner`. Pure.
pub fn transition(
    state: TerritoryState,
    losses: u8,
    winner: Side,
    losses_to_fall: u8,
) -> SiegeTransition {
    let unchanged = SiegeTransition {
        previous_state: state,
        new_state: state,
        previous_losses: losses,
        new_losses: losses,
        fallen: false,
    };
    if state == TerritoryState::Fallen {
        return unchanged;
    }
    let new_losses = match winner {
        Side::Attacker => losses.saturating_add(1).min(losses_to_fall),
        Side::Defender => losses.saturating_sub(1),
    };
    let new_state = state_for_losses(new_losses, losses_to_fall);
    SiegeTransition {
        new_state,
        new_losses,
        fallen: new_state == TerritoryState::Fallen,
        ..unchanged
    }
}

/// Apply a battle outcome to a territory record and raise the post-battle
/// shield. On a fall, records the prior owner so they can reclaim it.
pub fn apply_battle(
    territory: &mut Territory,
    winner: Side,
    now: GameTime,
    config: &SiegeConfig,
) -> SiegeTransition {
    let t = transition(
        territory.state,
        territory.battle_losses,
        winner,
        config.losses_to_fall,
    );
    territory.state = t.new_state;
    territory.battle_losses = t.new_losses;
    territory.shield_expires_at = Some(now.plus_hours(config.post_battle_shield_hours));
    if t.fallen {
        territory.fallen_at = Some(now);
        territory.previous_owner_id = Some(territory.owner_id);
    }
    t
}

/// Share of the territory's rebuild cost charged for reclaiming it,
/// rounded up per resource.
pub fn reclaim_cost(territory: &Territory, fraction: f64) -> BTreeMap<String, u64> {
    territory
        .rebuild_cost()
        .into_iter()
        .map(|(resource, amount)| (resource, (amount as f64 * fraction).ceil() as u64))
        .filter(|(_, amount)| *amount > 0)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReclaimReceipt {
    pub territory_id: u64,
    pub cost_paid: BTreeMap<String, u64>,
    pub shield_expires_at: GameTime,
}

impl Engine {
    /// Restore a fallen territory to its previous owner for a share of the
    /// rebuild cost.
    ///
    /// The debit happens between reading and writing the territory, so the
    /// write is a version-checked swap. If the territory changed in between,
    /// the debit is refunded and the request fails.
    pub fn reclaim_territory(
        &self,
        caller_id: u64,
        territory_id: u64,
        now: GameTime,
    ) -> Result<ReclaimReceipt, EngineError> {
        let config = &self.config.siege;
        let snapshot = self
            .store
            .territories
            .get_versioned(territory_id)
            .ok_or(EngineError::TerritoryNotFound(territory_id))?;
        let territory = &snapshot.value;

        if !territory.is_fallen() {
            return Err(EngineError::TerritoryNotFallen);
        }
        if territory.previous_owner_id != Some(caller_id) {
            return Err(EngineError::NotPreviousOwner);
        }
        let fallen_at = territory.fallen_at.unwrap_or(GameTime::EPOCH);
        let until = fallen_at.plus_hours(config.reclaim_cooldown_hours);
        if now < until {
            return Err(EngineError::ReclaimCooldown { until });
        }

        let cost = reclaim_cost(territory, config.reclaim_cost_fraction);
        self.services.ledger.debit(caller_id, &cost)?;

        let shield_expires_at = now.plus_hours(config.post_battle_shield_hours);
        let mut restored = territory.clone();
        restored.owner_id = caller_id;
        restored.state = TerritoryState::Secure;
        restored.battle_losses = 0;
        restored.fallen_at = None;
        restored.previous_owner_id = None;
        restored.shield_expires_at = Some(shield_expires_at);

        if let Err(err) =
            self.store
                .territories
                .compare_and_swap(territory_id, snapshot.version, restored)
        {
            if let Err(refund_err) = self.services.ledger.credit(caller_id, &cost) {
                warn!(
                    territory_id,
                    caller_id,
                    error = %refund_err,
                    "refund after failed reclaim did not go through"
                );
            }
            return Err(err.into());
        }

        info!(territory_id, caller_id, "territory reclaimed");
        self.store.record_event(
            EventKind::TerritoryReclaimed,
            now,
            format!("{} reclaimed by its previous owner", territory.name),
            None,
            json!({ "cost_paid": &cost }),
            &[
                (caller_id, ParticipantRole::Claimant),
                (territory_id, ParticipantRole::Territory),
            ],
        );
        self.notify(
            caller_id,
            NotificationKind::TerritoryReclaimed,
            "Territory reclaimed",
            format!("{} is yours again", territory.name),
            json!({ "territory_id": territory_id }),
        );

        Ok(ReclaimReceipt {
            territory_id,
            cost_paid: cost,
            shield_expires_at,
        })
    }
}
