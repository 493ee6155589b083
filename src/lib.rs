#[macro_use]
pub mod model;

pub mod collab;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod flush;
pub mod id;
pub mod scenario;
pub mod sim;
pub mod store;
pub mod testutil;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{EngineError, StoreError};
pub use id::IdGenerator;
pub use model::{
    AllianceWar, BattleResult, BattleStatus, Formation, GameTime, ScheduledBattle, Territory,
    TerritoryState, TroopCatalog, TroopType, WarPhase,
};
pub use store::Store;
