use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{
    BlueprintService, CollabError, Notification, Notifier, ProgressionHook, ResourceLedger,
    Services, TroopInventory,
};
use crate::model::{Building, TroopType};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
pub struct InMemoryLedger {
    balances: Mutex<BTreeMap<(u64, String), u64>>,
}

impl InMemoryLedger {
    pub fn set_balance(&self, player_id: u64, resource: &str, amount: u64) {
        lock(&self.balances).insert((player_id, resource.to_string()), amount);
    }
}

impl ResourceLedger for InMemoryLedger {
    fn balance(&self, player_id: u64, resource: &str) -> u64 {
        lock(&self.balances)
            .get(&(player_id, resource.to_string()))
            .copied()
            .unwrap_or(0)
    }

    fn debit(&self, player_id: u64, amounts: &BTreeMap<String, u64>) -> Result<(), CollabError> {
        let mut balances = lock(&self.balances);
        for (resource, &required) in amounts {
            let available = balances
                .get(&(player_id, resource.clone()))
                .copied()
                .unwrap_or(0);
            if available < required {
                return Err(CollabError::InsufficientResources {
                    resource: resource.clone(),
                    required,
                    available,
                });
            }
        }
        for (resource, &amount) in amounts {
            *balances.entry((player_id, resource.clone())).or_insert(0) -= amount;
        }
        Ok(())
    }

    fn credit(&self, player_id: u64, amounts: &BTreeMap<String, u64>) -> Result<(), CollabError> {
        let mut balances = lock(&self.balances);
        for (resource, &amount) in amounts {
            *balances.entry((player_id, resource.clone())).or_insert(0) += amount;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryInventory {
    troops: Mutex<BTreeMap<u64, BTreeMap<TroopType, u32>>>,
}

impl InMemoryInventory {
    pub fn set_troops(&self, player_id: u64, troop_type: TroopType, count: u32) {
        lock(&self.troops)
            .entry(player_id)
            .or_default()
            .insert(troop_type, count);
    }

    pub fn count(&self, player_id: u64, troop_type: TroopType) -> u32 {
        lock(&self.troops)
            .get(&player_id)
            .and_then(|t| t.get(&troop_type))
            .copied()
            .unwrap_or(0)
    }
}

impl TroopInventory for InMemoryInventory {
    fn counts(&self, player_id: u64) -> Result<BTreeMap<TroopType, u32>, CollabError> {
        Ok(lock(&self.troops)
            .get(&player_id)
            .cloned()
            .unwrap_or_default())
    }

    fn remove(&self, player_id: u64, losses: &BTreeMap<TroopType, u32>) -> Result<(), CollabError> {
        let mut troops = lock(&self.troops);
        let owned = troops.entry(player_id).or_default();
        for (troop_type, &lost) in losses {
            let count = owned.entry(*troop_type).or_insert(0);
            *count = count.saturating_sub(lost);
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryBlueprints {
    snapshots: Mutex<Vec<(u64, Vec<Building>)>>,
}

impl InMemoryBlueprints {
    /// Saved snapshots as `(owner_id, buildings)`; the blueprint ID is the
    /// 1-based position.
    pub fn snapshots(&self) -> Vec<(u64, Vec<Building>)> {
        lock(&self.snapshots).clone()
    }
}

impl BlueprintService for InMemoryBlueprints {
    fn save_snapshot(&self, owner_id: u64, buildings: &[Building]) -> Result<u64, CollabError> {
        let mut snapshots = lock(&self.snapshots);
        snapshots.push((owner_id, buildings.to_vec()));
        Ok(snapshots.len() as u64)
    }
}

/// Where a recorded notification was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    User(u64),
    Alliance(u64),
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(Recipient, Notification)>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(Recipient, Notification)> {
        lock(&self.sent).clone()
    }

    pub fn sent_to_user(&self, user_id: u64) -> Vec<Notification> {
        lock(&self.sent)
            .iter()
            .filter(|(r, _)| *r == Recipient::User(user_id))
            .map(|(_, n)| n.clone())
            .collect()
    }

    pub fn sent_to_alliance(&self, alliance_id: u64) -> Vec<Notification> {
        lock(&self.sent)
            .iter()
            .filter(|(r, _)| *r == Recipient::Alliance(alliance_id))
            .map(|(_, n)| n.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, user_id: u64, notification: &Notification) {
        lock(&self.sent).push((Recipient::User(user_id), notification.clone()));
    }

    fn notify_alliance_members(&self, alliance_id: u64, notification: &Notification) {
        lock(&self.sent).push((Recipient::Alliance(alliance_id), notification.clone()));
    }
}

#[derive(Debug, Default)]
pub struct InMemoryProgression {
    xp: Mutex<BTreeMap<u64, u64>>,
    achievement_checks: Mutex<Vec<(u64, String)>>,
}

impl InMemoryProgression {
    pub fn xp(&self, user_id: u64) -> u64 {
        lock(&self.xp).get(&user_id).copied().unwrap_or(0)
    }

    pub fn achievement_checks(&self) -> Vec<(u64, String)> {
        lock(&self.achievement_checks).clone()
    }
}

impl ProgressionHook for InMemoryProgression {
    fn award_xp(&self, user_id: u64, amount: u32) {
        *lock(&self.xp).entry(user_id).or_insert(0) += u64::from(amount);
    }

    fn check_achievements(&self, user_id: u64, category: &str) {
        lock(&self.achievement_checks).push((user_id, category.to_string()));
    }
}

/// In-memory collaborators with typed handles kept for inspection.
#[derive(Debug, Clone, Default)]
pub struct InMemoryServices {
    pub ledger: Arc<InMemoryLedger>,
    pub inventory: Arc<InMemoryInventory>,
    pub blueprints: Arc<InMemoryBlueprints>,
    pub notifier: Arc<RecordingNotifier>,
    pub progression: Arc<InMemoryProgression>,
}

impl InMemoryServices {
    pub fn services(&self) -> Services {
        Services {
            ledger: self.ledger.clone(),
            inventory: self.inventory.clone(),
            blueprints: self.blueprints.clone(),
            notifier: self.notifier.clone(),
            progression: self.progression.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debit_is_all_or_nothing() {
        let ledger = InMemoryLedger::default();
        ledger.set_balance(1, "gold", 100);
        ledger.set_balance(1, "stone", 5);
        let cost = BTreeMap::from([("gold".to_string(), 50), ("stone".to_string(), 10)]);
        let err = ledger.debit(1, &cost).unwrap_err();
        assert!(matches!(err, CollabError::InsufficientResources { .. }));
        assert_eq!(ledger.balance(1, "gold"), 100);

        ledger.set_balance(1, "stone", 10);
        ledger.debit(1, &cost).unwrap();
        assert_eq!(ledger.balance(1, "gold"), 50);
        assert_eq!(ledger.balance(1, "stone"), 0);
    }

    #[test]
    fn inventory_removal_clamps_at_zero() {
        let inv = InMemoryInventory::default();
        inv.set_troops(1, TroopType::Archer, 5);
        inv.remove(1, &BTreeMap::from([(TroopType::Archer, 9)]))
            .unwrap();
        assert_eq!(inv.count(1, TroopType::Archer), 0);
    }

    #[test]
    fn blueprint_ids_are_sequential() {
        let bp = InMemoryBlueprints::default();
        assert_eq!(bp.save_snapshot(4, &[]).unwrap(), 1);
        assert_eq!(bp.save_snapshot(5, &[]).unwrap(), 2);
        assert_eq!(bp.snapshots()[1].0, 5);
    }
}
