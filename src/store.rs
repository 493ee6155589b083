//! In-memory aggregate store.
//!
//! Each collection is guarded by its own lock. Read-modify-write goes through
//! [`Collection::update`], which applies the change to a copy and commits it
//! only on success, so a status check and the write that depends on it are
//! one atomic step. Every commit bumps the record's version, which callers
//! can use for optimistic [`Collection::compare_and_swap`] when a write has
//! to straddle an external call.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;

use crate::error::StoreError;
use crate::id::IdGenerator;
use crate::model::{
    Alliance, AllianceWar, Event, EventKind, EventParticipant, GameTime, ParticipantRole, Player,
    ScheduledBattle, Territory,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Versioned<T> {
    pub version: u64,
    pub value: T,
}

#[derive(Debug)]
pub struct Collection<T> {
    name: &'static str,
    records: RwLock<BTreeMap<u64, Versioned<T>>>,
}

impl<T: Clone> Collection<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            records: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<u64, Versioned<T>>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<u64, Versioned<T>>> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn not_found(&self, id: u64) -> StoreError {
        StoreError::NotFound {
            collection: self.name,
            id,
        }
    }

    /// Insert (or overwrite) a record at version 1.
    pub fn insert(&self, id: u64, value: T) {
        self.write().insert(id, Versioned { version: 1, value });
    }

    /// Insert unless an existing record matches `conflicts`; the check and
    /// the insert happen under one write lock.
    pub fn insert_unless(
        &self,
        id: u64,
        value: T,
        conflicts: impl Fn(&T) -> bool,
    ) -> Result<(), StoreError> {
        let mut records = self.write();
        if let Some((&existing_id, _)) = records.iter().find(|(_, r)| conflicts(&r.value)) {
            return Err(StoreError::Conflict {
                collection: self.name,
                existing_id,
            });
        }
        records.insert(id, Versioned { version: 1, value });
        Ok(())
    }

    pub fn get(&self, id: u64) -> Option<T> {
        self.read().get(&id).map(|r| r.value.clone())
    }

    pub fn get_versioned(&self, id: u64) -> Option<Versioned<T>> {
        self.read().get(&id).cloned()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.read().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Snapshot of every record, in ID order.
    pub fn values(&self) -> Vec<T> {
        self.read().values().map(|r| r.value.clone()).collect()
    }

    pub fn filter(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        self.read()
            .values()
            .filter(|r| pred(&r.value))
            .map(|r| r.value.clone())
            .collect()
    }

    pub fn find(&self, pred: impl Fn(&T) -> bool) -> Option<T> {
        self.read()
            .values()
            .find(|r| pred(&r.value))
            .map(|r| r.value.clone())
    }

    /// Atomically apply `f` to the record. The change is committed (and the
    /// version bumped) only if `f` returns `Ok`; on `Err` the stored record is
    /// untouched.
    pub fn update<R, E>(&self, id: u64, f: impl FnOnce(&mut T) -> Result<R, E>) -> Result<R, E>
    where
        E: From<StoreError>,
    {
        let mut records = self.write();
        let record = records.get_mut(&id).ok_or_else(|| self.not_found(id))?;
        let mut draft = record.value.clone();
        let out = f(&mut draft)?;
        record.value = draft;
        record.version += 1;
        Ok(out)
    }

    /// Replace the record only if it is still at `expected_version`.
    /// Returns the new version.
    pub fn compare_and_swap(
        &self,
        id: u64,
        expected_version: u64,
        value: T,
    ) -> Result<u64, StoreError> {
        let mut records = self.write();
        let record = records.get_mut(&id).ok_or_else(|| self.not_found(id))?;
        if record.version != expected_version {
            return Err(StoreError::VersionConflict {
                collection: self.name,
                id,
                expected: expected_version,
                found: record.version,
            });
        }
        record.value = value;
        record.version += 1;
        Ok(record.version)
    }
}

#[derive(Debug, Default)]
struct EventLogInner {
    events: Vec<Event>,
    participants: Vec<EventParticipant>,
}

/// Append-only audit trail of every state transition.
#[derive(Debug, Default)]
pub struct EventLog {
    inner: Mutex<EventLogInner>,
}

impl EventLog {
    fn lock(&self) -> MutexGuard<'_, EventLogInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, event: Event, participants: impl IntoIterator<Item = EventParticipant>) {
        let mut inner = self.lock();
        inner.events.push(event);
        inner.participants.extend(participants);
    }

    pub fn events(&self) -> Vec<Event> {
        self.lock().events.clone()
    }

    pub fn participants(&self) -> Vec<EventParticipant> {
        self.lock().participants.clone()
    }

    pub fn of_kind(&self, kind: EventKind) -> Vec<Event> {
        self.lock()
            .events
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().events.is_empty()
    }
}

#[derive(Debug)]
pub struct Store {
    id_gen: Mutex<IdGenerator>,
    pub players: Collection<Player>,
    pub alliances: Collection<Alliance>,
    pub territories: Collection<Territory>,
    pub battles: Collection<ScheduledBattle>,
    pub wars: Collection<AllianceWar>,
    pub events: EventLog,
}

impl Store {
    pub fn new() -> Self {
        Self::with_id_generator(IdGenerator::new())
    }

    pub fn with_id_generator(id_gen: IdGenerator) -> Self {
        Self {
            id_gen: Mutex::new(id_gen),
            players: Collection::new("players"),
            alliances: Collection::new("alliances"),
            territories: Collection::new("territories"),
            battles: Collection::new("battles"),
            wars: Collection::new("wars"),
            events: EventLog::default(),
        }
    }

    pub fn next_id(&self) -> u64 {
        self.id_gen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next_id()
    }

    /// Append an event with its participants. Returns the event ID.
    pub fn record_event(
        &self,
        kind: EventKind,
        timestamp: GameTime,
        description: String,
        caused_by: Option<u64>,
        data: serde_json::Value,
        participants: &[(u64, ParticipantRole)],
    ) -> u64 {
        let id = self.next_id();
        let event = Event {
            id,
            kind,
            timestamp,
            description,
            caused_by,
            data,
        };
        self.events.push(
            event,
            participants.iter().map(|&(entity_id, role)| EventParticipant {
                event_id: id,
                entity_id,
                role,
            }),
        );
        id
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}
