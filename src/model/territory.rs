use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::time::GameTime;

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Siege health track, ordered from healthiest to fallen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum TerritoryState {
    #[default]
    Secure,
    Contested,
    Vulnerable,
    Fallen,
}

string_enum!(TerritoryState {
    Secure => "secure",
    Contested => "contested",
    Vulnerable => "vulnerable",
    Fallen => "fallen",
});

/// A WGS84 coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle (haversine) distance in meters.
    pub fn distance_meters(&self, other: &GeoPoint) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let dlat = (other.lat - self.lat).to_radians();
        let dlon = (other.lon - self.lon).to_radians();
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_METERS * a.sqrt().atan2((1.0 - a).sqrt())
    }
}

/// A building on a territory; its rebuild cost is the reclaim cost basis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    pub kind: String,
    pub level: u32,
    /// Cost of one level, keyed by resource name.
    pub cost_per_level: BTreeMap<String, u64>,
}

impl Building {
    pub fn new(kind: &str, level: u32, cost_per_level: BTreeMap<String, u64>) -> Self {
        Self {
            kind: kind.to_string(),
            level,
            cost_per_level,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Territory {
    pub id: u64,
    pub name: String,
    pub owner_id: u64,
    pub center: GeoPoint,
    pub state: TerritoryState,
    /// Attacker wins since the territory was last secure; 3 means fallen.
    pub battle_losses: u8,
    pub shield_expires_at: Option<GameTime>,
    pub fallen_at: Option<GameTime>,
    /// The owner at the time of the fall; only set while fallen.
    pub previous_owner_id: Option<u64>,
    pub blueprint_id: Option<u64>,
    pub buildings: Vec<Building>,
}

impl Territory {
    pub fn new(id: u64, name: &str, owner_id: u64, center: GeoPoint) -> Self {
        Self {
            id,
            name: name.to_string(),
            owner_id,
            center,
            state: TerritoryState::Secure,
            battle_losses: 0,
            shield_expires_at: None,
            fallen_at: None,
            previous_owner_id: None,
            blueprint_id: None,
            buildings: Vec::new(),
        }
    }

    pub fn is_fallen(&self) -> bool {
        self.state == TerritoryState::Fallen
    }

    pub fn shield_active(&self, now: GameTime) -> bool {
        self.shield_expires_at.is_some_and(|t| t > now)
    }

    /// Estimated cost to rebuild every building from scratch:
    /// `Σ cost_per_level × level`, per resource.
    pub fn rebuild_cost(&self) -> BTreeMap<String, u64> {
        let mut total = BTreeMap::new();
        for building in &self.buildings {
            for (resource, amount) in &building.cost_per_level {
                *total.entry(resource.clone()).or_insert(0) += amount * u64::from(building.level);
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_order_from_secure_to_fallen() {
        assert!(TerritoryState::Secure < TerritoryState::Contested);
        assert!(TerritoryState::Vulnerable < TerritoryState::Fallen);
    }

    #[test]
    fn distance_of_one_hundredth_degree_latitude() {
        let a = GeoPoint::new(52.0, 13.0);
        let b = GeoPoint::new(52.01, 13.0);
        let d = a.distance_meters(&b);
        assert!((d - 1_112.0).abs() < 5.0, "got {d}");
        assert_eq!(a.distance_meters(&a), 0.0);
    }

    #[test]
    fn rebuild_cost_scales_with_level() {
        let mut t = Territory::new(1, "Harbor", 7, GeoPoint::default());
        t.buildings.push(Building::new(
            "wall",
            3,
            BTreeMap::from([("stone".to_string(), 100)]),
        ));
        t.buildings.push(Building::new(
            "keep",
            1,
            BTreeMap::from([("stone".to_string(), 50), ("gold".to_string(), 20)]),
        ));
        let cost = t.rebuild_cost();
        assert_eq!(cost["stone"], 350);
        assert_eq!(cost["gold"], 20);
    }

    #[test]
    fn shield_is_exclusive_of_expiry() {
        let mut t = Territory::new(1, "Harbor", 7, GeoPoint::default());
        assert!(!t.shield_active(GameTime::from_hours(1)));
        t.shield_expires_at = Some(GameTime::from_hours(2));
        assert!(t.shield_active(GameTime::from_hours(1)));
        assert!(!t.shield_active(GameTime::from_hours(2)));
    }
}
