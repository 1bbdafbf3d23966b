//! Route Quoter
//!
//! Enumerates swap routes across Uniswap V2/V3/V4 pools and prices them in
//! bulk against the on-chain quoter contracts, batching calls into
//! pinned-block multicalls.
//!
//! - [`cartographer`]: currencies, pools and pool-list loading
//! - [`brain`]: route enumeration
//! - [`quoter`]: planning, dispatch, retries and result assembly

pub mod brain;
pub mod cartographer;
pub mod config;
pub mod quoter;
pub mod tokens;

pub use brain::{Route, RouteProtocol};
pub use config::QuoteConfig;
pub use quoter::{QuoteBatch, QuoteError, RouteQuoter, TradeType};
