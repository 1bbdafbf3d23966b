//! Route Enumerator - bounded DFS over the pool list
//!
//! Step 2.1: The Pathfinder
//!
//! Walks pools outward from currency in, never reusing a pool and never
//! revisiting a token. A route is emitted as soon as its last pool touches
//! currency out. The synthetic native/wrapped bridge hop does not count
//! against the hop budget.

use std::collections::HashSet;
use tracing::{debug, info};

use super::route::{Route, RouteProtocol};
use crate::cartographer::{Currency, Pool, Protocol};

/// Enumerates every simple route between two currencies
pub struct RouteEnumerator<'a> {
    pools: &'a [Pool],
    max_hops: usize,
}

/// Backtracking state for one search
struct SearchState<'p> {
    current: Vec<&'p Pool>,
    pools_used: Vec<bool>,
    visited: HashSet<Currency>,
}

impl<'a> RouteEnumerator<'a> {
    pub fn new(pools: &'a [Pool], max_hops: usize) -> Self {
        Self { pools, max_hops }
    }

    /// Enumerate routes from `input` to `output`, tagging each with `protocol`.
    ///
    /// Order is deterministic: depth-first, pools tried in list order.
    pub fn find_routes(&self, input: &Currency, output: &Currency, protocol: RouteProtocol) -> Vec<Route> {
        let mut routes = Vec::new();
        let mut state = SearchState {
            current: Vec::with_capacity(self.max_hops + 1),
            pools_used: vec![false; self.pools.len()],
            visited: HashSet::from([input.clone()]),
        };

        self.dfs(input, output, input, protocol, &mut state, &mut routes);

        debug!(
            "Enumerated {} {} routes {} -> {} over {} pools (max hops {})",
            routes.len(),
            protocol,
            input,
            output,
            self.pools.len(),
            self.max_hops
        );

        routes
    }

    fn dfs(
        &self,
        input: &Currency,
        output: &Currency,
        frontier: &Currency,
        protocol: RouteProtocol,
        state: &mut SearchState<'a>,
        routes: &mut Vec<Route>,
    ) {
        let budget = if state.current.iter().any(|p| p.is_bridge()) {
            self.max_hops + 1
        } else {
            self.max_hops
        };

        if state.current.len() > budget {
            return;
        }

        if let Some(last) = state.current.last() {
            if last.involves_token(output) {
                routes.push(Route::new(
                    protocol,
                    state.current.iter().map(|p| (*p).clone()).collect(),
                    input.clone(),
                    output.clone(),
                ));
                return;
            }
        }

        for (i, pool) in self.pools.iter().enumerate() {
            if state.pools_used[i] {
                continue;
            }

            let Some(next) = pool.other_token(frontier) else {
                continue;
            };

            if state.visited.contains(next) {
                continue;
            }

            state.visited.insert(next.clone());
            state.pools_used[i] = true;
            state.current.push(pool);

            self.dfs(input, output, next, protocol, state, routes);

            state.current.pop();
            state.pools_used[i] = false;
            state.visited.remove(next);
        }
    }
}

// ============================================
// FLAVORS
// ============================================

fn single_protocol_pools(pools: &[Pool], protocol: Protocol) -> Vec<Pool> {
    pools
        .iter()
        .filter(|p| p.protocol() == protocol && !p.is_bridge())
        .cloned()
        .collect()
}

fn single_protocol_routes(
    input: &Currency,
    output: &Currency,
    pools: &[Pool],
    max_hops: usize,
    protocol: Protocol,
) -> Vec<Route> {
    let pools = single_protocol_pools(pools, protocol);
    let routes = RouteEnumerator::new(&pools, max_hops).find_routes(input, output, protocol.into());
    info!("Computed {} possible routes for type {}", routes.len(), protocol);
    routes
}

pub fn compute_all_v2_routes(input: &Currency, output: &Currency, pools: &[Pool], max_hops: usize) -> Vec<Route> {
    single_protocol_routes(input, output, pools, max_hops, Protocol::V2)
}

pub fn compute_all_v3_routes(input: &Currency, output: &Currency, pools: &[Pool], max_hops: usize) -> Vec<Route> {
    single_protocol_routes(input, output, pools, max_hops, Protocol::V3)
}

pub fn compute_all_v4_routes(input: &Currency, output: &Currency, pools: &[Pool], max_hops: usize) -> Vec<Route> {
    single_protocol_routes(input, output, pools, max_hops, Protocol::V4)
}

/// Routes spanning at least two protocols.
///
/// `bridge` (when given) is appended to the candidate pools so native and
/// wrapped-native liquidity can be joined in the middle of a route.
pub fn compute_all_mixed_routes(
    input: &Currency,
    output: &Currency,
    pools: &[Pool],
    max_hops: usize,
    bridge: Option<Pool>,
) -> Vec<Route> {
    let mut candidates: Vec<Pool> = pools.iter().filter(|p| !p.is_bridge()).cloned().collect();
    candidates.extend(bridge);

    let all = RouteEnumerator::new(&candidates, max_hops).find_routes(input, output, RouteProtocol::Mixed);
    let total = all.len();

    let routes: Vec<Route> = all.into_iter().filter(|r| !r.is_single_protocol()).collect();
    info!(
        "Computed {} possible routes for type {} ({} single-protocol routes dropped)",
        routes.len(),
        RouteProtocol::Mixed,
        total - routes.len()
    );
    routes
}

/// Dispatch on the requested route flavor
pub fn compute_routes(
    flavor: RouteProtocol,
    input: &Currency,
    output: &Currency,
    pools: &[Pool],
    max_hops: usize,
    bridge: Option<Pool>,
) -> Vec<Route> {
    match flavor {
        RouteProtocol::V2 => compute_all_v2_routes(input, output, pools, max_hops),
        RouteProtocol::V3 => compute_all_v3_routes(input, output, pools, max_hops),
        RouteProtocol::V4 => compute_all_v4_routes(input, output, pools, max_hops),
        RouteProtocol::Mixed => compute_all_mixed_routes(input, output, pools, max_hops, bridge),
    }
}
