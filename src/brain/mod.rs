//! Phase 2: The Brain
//!
//! Responsible for:
//! - Modelling routes (ordered pool paths between two currencies)
//! - Enumerating every simple route under a hop budget, per protocol flavor

mod enumerator;
mod route;

pub use enumerator::{
    compute_all_mixed_routes, compute_all_v2_routes, compute_all_v3_routes, compute_all_v4_routes,
    compute_routes, RouteEnumerator,
};
pub use route::{Route, RouteProtocol};
