use serde::{Deserialize, Serialize};

use super::time::GameTime;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: u64,
    pub name: String,
    pub alliance_id: Option<u64>,
    pub created_at: GameTime,
    pub last_active_at: GameTime,
    /// Explicitly granted newcomer shield, if any.
    pub shield_expires_at: Option<GameTime>,
}

impl Player {
    pub fn new(id: u64, name: &str, created_at: GameTime) -> Self {
        Self {
            id,
            name: name.to_string(),
            alliance_id: None,
            created_at,
            last_active_at: created_at,
            shield_expires_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alliance {
    pub id: u64,
    pub name: String,
    pub leader_id: u64,
    pub member_ids: Vec<u64>,
}

impl Alliance {
    pub fn is_leader(&self, player_id: u64) -> bool {
        self.leader_id == player_id
    }

    pub fn member_count(&self) -> usize {
        self.member_ids.len()
    }
}
