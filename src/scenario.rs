use std::collections::BTreeMap;
use std::sync::Arc;

use crate::collab::InMemoryServices;
use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::id::IdGenerator;
use crate::model::*;
use crate::store::Store;

/// IDs returned by [`Scenario::add_alliance_with_members`].
#[derive(Debug, Clone)]
pub struct AllianceIds {
    pub alliance: u64,
    pub leader: u64,
    /// Every member, leader first.
    pub members: Vec<u64>,
}

/// A built scenario: the engine plus typed handles on its in-memory
/// collaborators.
#[derive(Debug)]
pub struct Built {
    pub engine: Engine,
    pub services: InMemoryServices,
    pub now: GameTime,
}

// -- Builder-style ref types --

/// Typed reference to a player in a [`Scenario`], enabling chained field mutation.
///
/// Created by [`Scenario::player`]. Call [`.id()`](PlayerRef::id) to terminate
/// the chain and extract the player ID.
pub struct PlayerRef<'a> {
    scenario: &'a mut Scenario,
    index: usize,
}

impl<'a> PlayerRef<'a> {
    fn data_mut(&mut self) -> &mut Player {
        &mut self.scenario.players[self.index]
    }

    fn player_id(&self) -> u64 {
        self.scenario.players[self.index].id
    }

    pub fn created_at(mut self, v: GameTime) -> Self { self.data_mut().created_at = v; self }
    pub fn last_active_at(mut self, v: GameTime) -> Self { self.data_mut().last_active_at = v; self }
    pub fn shield_expires_at(mut self, v: Option<GameTime>) -> Self { self.data_mut().shield_expires_at = v; self }

    /// Account age relative to the scenario clock.
    pub fn created_days_ago(mut self, days: u64) -> Self {
        let now = self.scenario.now;
        self.data_mut().created_at = GameTime::from_minutes(
            now.as_minutes().saturating_sub(days * time::MINUTES_PER_DAY),
        );
        self
    }

    /// Time since last login relative to the scenario clock.
    pub fn idle_hours(mut self, hours: u64) -> Self {
        let now = self.scenario.now;
        self.data_mut().last_active_at = GameTime::from_minutes(
            now.as_minutes().saturating_sub(hours * time::MINUTES_PER_HOUR),
        );
        self
    }

    pub fn troops(self, troop_type: TroopType, count: u32) -> Self {
        let id = self.player_id();
        self.scenario.services.inventory.set_troops(id, troop_type, count);
        self
    }

    pub fn resource(self, resource: &str, amount: u64) -> Self {
        let id = self.player_id();
        self.scenario.services.ledger.set_balance(id, resource, amount);
        self
    }

    /// Escape hatch: apply an arbitrary closure to the player.
    pub fn with(mut self, f: impl FnOnce(&mut Player)) -> Self { f(self.data_mut()); self }

    /// Terminate the chain and return the player ID.
    pub fn id(self) -> u64 { self.player_id() }
}

/// Typed reference to a territory in a [`Scenario`], enabling chained field mutation.
///
/// Created by [`Scenario::territory`]. Call [`.id()`](TerritoryRef::id) to
/// terminate the chain and extract the territory ID.
pub struct TerritoryRef<'a> {
    scenario: &'a mut Scenario,
    index: usize,
}

impl<'a> TerritoryRef<'a> {
    fn data_mut(&mut self) -> &mut Territory {
        &mut self.scenario.territories[self.index]
    }

    pub fn center(mut self, lat: f64, lon: f64) -> Self { self.data_mut().center = GeoPoint::new(lat, lon); self }
    pub fn shield_expires_at(mut self, v: Option<GameTime>) -> Self { self.data_mut().shield_expires_at = v; self }

    /// Set the siege track directly; `losses` must match `state`.
    pub fn siege(mut self, state: TerritoryState, losses: u8) -> Self {
        let t = self.data_mut();
        t.state = state;
        t.battle_losses = losses;
        self
    }

    /// Mark the territory fallen at `at`, with its current owner as the
    /// previous owner.
    pub fn fallen_at(mut self, at: GameTime) -> Self {
        let t = self.data_mut();
        t.state = TerritoryState::Fallen;
        t.battle_losses = 3;
        t.fallen_at = Some(at);
        t.previous_owner_id = Some(t.owner_id);
        self
    }

    pub fn building(mut self, kind: &str, level: u32, cost_per_level: &[(&str, u64)]) -> Self {
        let cost: BTreeMap<String, u64> = cost_per_level
            .iter()
            .map(|&(resource, amount)| (resource.to_string(), amount))
            .collect();
        self.data_mut().buildings.push(Building::new(kind, level, cost));
        self
    }

    /// Escape hatch: apply an arbitrary closure to the territory.
    pub fn with(mut self, f: impl FnOnce(&mut Territory)) -> Self { f(self.data_mut()); self }

    /// Terminate the chain and return the territory ID.
    pub fn id(self) -> u64 { self.scenario.territories[self.index].id }
}

/// Declarative setup for engine tests.
///
/// Players default to a month-old account that is active right now, so
/// neither newcomer protection nor activity bonuses apply unless a test
/// asks for them.
pub struct Scenario {
    now: GameTime,
    id_gen: IdGenerator,
    config: EngineConfig,
    catalog: TroopCatalog,
    services: InMemoryServices,
    players: Vec<Player>,
    alliances: Vec<Alliance>,
    territories: Vec<Territory>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self::new()
    }
}

impl Scenario {
    /// Scenario clock at day 100.
    pub fn new() -> Self {
        Self::at(GameTime::from_days(100))
    }

    pub fn at(now: GameTime) -> Self {
        Self {
            now,
            id_gen: IdGenerator::new(),
            config: EngineConfig::default(),
            catalog: TroopCatalog::standard(),
            services: InMemoryServices::default(),
            players: Vec::new(),
            alliances: Vec::new(),
            territories: Vec::new(),
        }
    }

    pub fn now(&self) -> GameTime {
        self.now
    }

    pub fn config_mut(&mut self) -> &mut EngineConfig {
        &mut self.config
    }

    pub fn services(&self) -> &InMemoryServices {
        &self.services
    }

    // -- Players --

    pub fn player(&mut self, name: &str) -> PlayerRef<'_> {
        let id = self.id_gen.next_id();
        let created_at =
            GameTime::from_minutes(self.now.as_minutes().saturating_sub(30 * time::MINUTES_PER_DAY));
        let mut player = Player::new(id, name, created_at);
        player.last_active_at = self.now;
        self.players.push(player);
        PlayerRef {
            index: self.players.len() - 1,
            scenario: self,
        }
    }

    pub fn add_player(&mut self, name: &str) -> u64 {
        self.player(name).id()
    }

    // -- Alliances --

    /// Create an alliance and point every listed player at it.
    pub fn add_alliance(&mut self, name: &str, leader: u64, members: &[u64]) -> u64 {
        let id = self.id_gen.next_id();
        let mut member_ids = vec![leader];
        member_ids.extend(members.iter().copied().filter(|&m| m != leader));
        for player in self.players.iter_mut().filter(|p| member_ids.contains(&p.id)) {
            player.alliance_id = Some(id);
        }
        self.alliances.push(Alliance {
            id,
            name: name.to_string(),
            leader_id: leader,
            member_ids,
        });
        id
    }

    /// Create `count` fresh players and an alliance led by the first of them.
    pub fn add_alliance_with_members(&mut self, name: &str, count: usize) -> AllianceIds {
        let members: Vec<u64> = (1..=count)
            .map(|i| self.add_player(&format!("{name} #{i}")))
            .collect();
        let leader = members[0];
        let alliance = self.add_alliance(name, leader, &members);
        AllianceIds {
            alliance,
            leader,
            members,
        }
    }

    // -- Territories --

    pub fn territory(&mut self, name: &str, owner: u64) -> TerritoryRef<'_> {
        let id = self.id_gen.next_id();
        // Spread default centers about 1.1 km apart along a meridian.
        let offset = self.territories.len() as f64 * 0.01;
        self.territories
            .push(Territory::new(id, name, owner, GeoPoint::new(52.52 + offset, 13.405)));
        TerritoryRef {
            index: self.territories.len() - 1,
            scenario: self,
        }
    }

    pub fn add_territory(&mut self, name: &str, owner: u64) -> u64 {
        self.territory(name, owner).id()
    }

    // -- Build --

    pub fn build(self) -> Built {
        let store = Store::with_id_generator(self.id_gen);
        for p in self.players {
            store.players.insert(p.id, p);
        }
        for a in self.alliances {
            store.alliances.insert(a.id, a);
        }
        for t in self.territories {
            store.territories.insert(t.id, t);
        }
        let engine = Engine::with_store(
            Arc::new(self.config),
            Arc::new(self.catalog),
            self.services.services(),
            store,
        );
        Built {
            engine,
            services: self.services,
            now: self.now,
        }
    }
}
