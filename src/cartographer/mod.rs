//! Phase 1: The Cartographer (Pools & Currencies)
//!
//! The map the router walks: currencies, the polymorphic pool model, and the
//! pool-list loader. Reserve state stays with the pool-data provider.

mod currency;
mod loader;
mod pool;

pub use currency::Currency;
pub use loader::PoolList;
pub use pool::{BridgePool, Pool, Protocol, V2Pool, V3Pool, V4Pool};
