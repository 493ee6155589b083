mod load;
mod migrate;

pub use load::load_store;
pub use migrate::migrate;
