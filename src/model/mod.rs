#[macro_use]
mod macros;

pub mod battle;
pub mod event;
pub mod formation;
pub mod player;
pub mod territory;
pub mod time;
pub mod troop;
pub mod war;

pub use battle::{
    BattleResult, BattleStatus, ParticipationType, Round, ScheduledBattle, Side, SideOutcome,
};
pub use event::{Event, EventKind, EventParticipant, ParticipantRole};
pub use formation::{Formation, Strategy, TroopStack};
pub use player::{Alliance, Player};
pub use territory::{Building, GeoPoint, Territory, TerritoryState};
pub use time::GameTime;
pub use troop::{TroopCatalog, TroopStats, TroopType};
pub use war::{AllianceWar, WarPhase, WarRewards, WarStatus, WarTimeline};
