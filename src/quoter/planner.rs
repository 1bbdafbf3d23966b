//! Quote Batch Planner
//!
//! Step 3.1: flatten (routes × amounts) into quoter calls.
//!
//! Calls are emitted route-major, amount-minor, so the result for route `r`
//! and amount `a` always lives at index `r * amounts.len() + a`.

use alloy_primitives::aliases::U160;
use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use super::errors::QuoteError;
use crate::brain::{Route, RouteProtocol};
use crate::cartographer::{Currency, Pool};

// ============================================
// SOLIDITY INTERFACES
// ============================================

sol! {
    /// Uniswap V3 QuoterV2 (multi-hop)
    #[derive(Debug)]
    interface IQuoterV2 {
        function quoteExactInput(bytes memory path, uint256 amountIn)
            external
            returns (
                uint256 amountOut,
                uint160[] memory sqrtPriceX96AfterList,
                uint32[] memory initializedTicksCrossedList,
                uint256 gasEstimate
            );

        function quoteExactOutput(bytes memory path, uint256 amountOut)
            external
            returns (
                uint256 amountIn,
                uint160[] memory sqrtPriceX96AfterList,
                uint32[] memory initializedTicksCrossedList,
                uint256 gasEstimate
            );
    }

    /// Uniswap V4 Quoter
    #[derive(Debug)]
    interface IV4Quoter {
        struct PathKey {
            address intermediateCurrency;
            uint24 fee;
            int24 tickSpacing;
            address hooks;
            bytes hookData;
        }

        struct QuoteExactParams {
            address exactCurrency;
            PathKey[] path;
            uint128 exactAmount;
        }

        function quoteExactInput(QuoteExactParams memory params)
            external
            returns (uint256 amountOut, uint256 gasEstimate);

        function quoteExactOutput(QuoteExactParams memory params)
            external
            returns (uint256 amountIn, uint256 gasEstimate);
    }

    /// Mixed route quoter (V2/V3/V4 hops in one path, exact input only)
    #[derive(Debug)]
    interface IMixedRouteQuoterV2 {
        struct ExtraQuoteExactInputParams {
            bytes[] nonEncodableData;
        }

        function quoteExactInput(
            bytes memory path,
            ExtraQuoteExactInputParams memory param,
            uint256 amountIn
        ) external returns (uint256 amountOut, uint256 gasEstimate);
    }
}

/// Mixed-path protocol flags, OR-ed into the 3-byte fee slot
const MIXED_V2_FLAG: u32 = 8 << 20;
const MIXED_V3_FLAG: u32 = 3 << 20;
const MIXED_V4_FLAG: u32 = 4 << 20;

// ============================================
// TYPES
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeType {
    ExactInput,
    ExactOutput,
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeType::ExactInput => write!(f, "exact input"),
            TradeType::ExactOutput => write!(f, "exact output"),
        }
    }
}

/// Which quoter a call targets, and so how its return data decodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoterKind {
    V3,
    V4,
    Mixed,
}

/// Per-chain quoter contracts; `None` when the chain has no deployment
#[derive(Debug, Clone, Default)]
pub struct QuoterAddresses {
    pub chain_id: u64,
    pub v3: Option<Address>,
    pub v4: Option<Address>,
    pub mixed: Option<Address>,
}

/// One encoded quoter call
#[derive(Debug, Clone)]
pub struct CallInput {
    pub target: Address,
    pub calldata: Bytes,
    pub kind: QuoterKind,
    pub route_index: usize,
    pub amount_index: usize,
}

/// Decoded quoter return data
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuoteOutput {
    pub amount: U256,
    /// V3 only; empty for V4 and mixed quoters
    pub sqrt_price_x96_after: Vec<U160>,
    /// V3 only; empty for V4 and mixed quoters
    pub initialized_ticks_crossed: Vec<u32>,
    pub gas_estimate: U256,
}

impl QuoterKind {
    /// Exact-output returns share the exact-input layout
    pub fn decode(&self, data: &[u8]) -> Result<QuoteOutput, alloy_sol_types::Error> {
        match self {
            QuoterKind::V3 => {
                let ret = IQuoterV2::quoteExactInputCall::abi_decode_returns(data)?;
                Ok(QuoteOutput {
                    amount: ret.amountOut,
                    sqrt_price_x96_after: ret.sqrtPriceX96AfterList,
                    initialized_ticks_crossed: ret.initializedTicksCrossedList,
                    gas_estimate: ret.gasEstimate,
                })
            }
            QuoterKind::V4 => {
                let ret = IV4Quoter::quoteExactInputCall::abi_decode_returns(data)?;
                Ok(QuoteOutput {
                    amount: ret.amountOut,
                    gas_estimate: ret.gasEstimate,
                    ..Default::default()
                })
            }
            QuoterKind::Mixed => {
                let ret = IMixedRouteQuoterV2::quoteExactInputCall::abi_decode_returns(data)?;
                Ok(QuoteOutput {
                    amount: ret.amountOut,
                    gas_estimate: ret.gasEstimate,
                    ..Default::default()
                })
            }
        }
    }
}

// ============================================
// PLANNING
// ============================================

/// Encode every (route, amount) pair, route-major.
///
/// Fails before encoding anything if a route cannot be quoted for
/// `trade_type` or its quoter is not deployed on this chain.
pub fn plan(
    routes: &[Route],
    amounts: &[U256],
    trade_type: TradeType,
    quoters: &QuoterAddresses,
) -> Result<Vec<CallInput>, QuoteError> {
    for route in routes {
        quoter_for(route.protocol, trade_type, quoters)?;
    }

    let mut calls = Vec::with_capacity(routes.len() * amounts.len());

    for (route_index, route) in routes.iter().enumerate() {
        let (target, kind) = quoter_for(route.protocol, trade_type, quoters)?;

        for (amount_index, amount) in amounts.iter().enumerate() {
            let calldata = match kind {
                QuoterKind::V3 => encode_v3_call(route, *amount, trade_type),
                QuoterKind::V4 => encode_v4_call(route, *amount, trade_type),
                QuoterKind::Mixed => encode_mixed_call(route, *amount),
            };

            calls.push(CallInput {
                target,
                calldata,
                kind,
                route_index,
                amount_index,
            });
        }
    }

    debug!(
        "Planned {} quote calls ({} routes x {} amounts, {})",
        calls.len(),
        routes.len(),
        amounts.len(),
        trade_type
    );

    Ok(calls)
}

fn quoter_for(
    protocol: RouteProtocol,
    trade_type: TradeType,
    quoters: &QuoterAddresses,
) -> Result<(Address, QuoterKind), QuoteError> {
    let (address, kind) = match protocol {
        RouteProtocol::V3 => (quoters.v3, QuoterKind::V3),
        RouteProtocol::V4 => (quoters.v4, QuoterKind::V4),
        RouteProtocol::V2 | RouteProtocol::Mixed => {
            if trade_type == TradeType::ExactOutput {
                return Err(QuoteError::RouteProtocolMismatch { protocol, trade_type });
            }
            (quoters.mixed, QuoterKind::Mixed)
        }
    };

    let address = address.ok_or(QuoteError::MissingQuoter {
        protocol,
        chain_id: quoters.chain_id,
    })?;

    Ok((address, kind))
}

/// Pools and the currency each pool is entered with, in swap order
fn hops(route: &Route, trade_type: TradeType) -> Vec<(&Pool, Currency, Currency)> {
    let path = route.token_path();
    let mut hops: Vec<_> = route
        .pools
        .iter()
        .zip(path.windows(2))
        .map(|(pool, pair)| (pool, pair[0].clone(), pair[1].clone()))
        .collect();

    if trade_type == TradeType::ExactOutput {
        hops.reverse();
        for hop in hops.iter_mut() {
            std::mem::swap(&mut hop.1, &mut hop.2);
        }
    }

    hops
}

fn push_u24(path: &mut Vec<u8>, value: u32) {
    path.extend_from_slice(&value.to_be_bytes()[1..]);
}

fn push_i24(path: &mut Vec<u8>, value: i32) {
    path.extend_from_slice(&value.to_be_bytes()[1..]);
}

/// `token (fee token)*`, from the exact currency onwards
pub fn encode_v3_path(route: &Route, trade_type: TradeType) -> Bytes {
    let hops = hops(route, trade_type);
    let mut path = Vec::with_capacity(20 + hops.len() * 23);

    if let Some((_, first, _)) = hops.first() {
        path.extend_from_slice(first.address.as_slice());
    }
    for (pool, _, to) in &hops {
        push_u24(&mut path, pool.fee());
        path.extend_from_slice(to.address.as_slice());
    }

    path.into()
}

fn encode_v3_call(route: &Route, amount: U256, trade_type: TradeType) -> Bytes {
    let path = encode_v3_path(route, trade_type);
    let calldata = match trade_type {
        TradeType::ExactInput => IQuoterV2::quoteExactInputCall { path, amountIn: amount }.abi_encode(),
        TradeType::ExactOutput => IQuoterV2::quoteExactOutputCall { path, amountOut: amount }.abi_encode(),
    };
    calldata.into()
}

fn encode_v4_call(route: &Route, amount: U256, trade_type: TradeType) -> Bytes {
    let mut path: Vec<IV4Quoter::PathKey> = hops(route, trade_type)
        .into_iter()
        .map(|(pool, _, to)| IV4Quoter::PathKey {
            intermediateCurrency: to.address,
            fee: pool.fee().try_into().unwrap_or_default(),
            tickSpacing: pool.tick_spacing().try_into().unwrap_or_default(),
            hooks: pool.hooks(),
            hookData: Bytes::new(),
        })
        .collect();

    // Exact output keys name each pool's input side, listed input to output
    if trade_type == TradeType::ExactOutput {
        path.reverse();
    }

    let exact_currency = match trade_type {
        TradeType::ExactInput => route.input.address,
        TradeType::ExactOutput => route.output.address,
    };

    let params = IV4Quoter::QuoteExactParams {
        exactCurrency: exact_currency,
        path,
        exactAmount: amount.saturating_to(),
    };

    let calldata = match trade_type {
        TradeType::ExactInput => IV4Quoter::quoteExactInputCall { params }.abi_encode(),
        TradeType::ExactOutput => IV4Quoter::quoteExactOutputCall { params }.abi_encode(),
    };
    calldata.into()
}

/// Mixed path: `token (flag|fee [tickSpacing hooks] token)*`
pub fn encode_mixed_path(route: &Route) -> Bytes {
    let hops = hops(route, TradeType::ExactInput);
    let mut path = Vec::with_capacity(20 + hops.len() * 46);

    path.extend_from_slice(route.input.address.as_slice());
    for (pool, _, to) in &hops {
        match pool {
            Pool::V2(_) => push_u24(&mut path, MIXED_V2_FLAG),
            Pool::V3(p) => push_u24(&mut path, MIXED_V3_FLAG | p.fee),
            Pool::V4(_) | Pool::Bridge(_) => {
                push_u24(&mut path, MIXED_V4_FLAG | pool.fee());
                push_i24(&mut path, pool.tick_spacing());
                path.extend_from_slice(pool.hooks().as_slice());
            }
        }
        path.extend_from_slice(to.address.as_slice());
    }

    path.into()
}

fn encode_mixed_call(route: &Route, amount: U256) -> Bytes {
    let path = encode_mixed_path(route);
    let param = IMixedRouteQuoterV2::ExtraQuoteExactInputParams {
        nonEncodableData: vec![Bytes::new(); route.pools.len()],
    };

    IMixedRouteQuoterV2::quoteExactInputCall { path, param, amountIn: amount }
        .abi_encode()
        .into()
}

// ============================================
// AMOUNT DISTRIBUTION
// ============================================

/// Split `total` into cumulative slices of `distribution_percent`.
///
/// 25 → percents `[25, 50, 75, 100]` and the matching fractions of `total`.
pub fn amount_distribution(total: U256, distribution_percent: u32) -> (Vec<u32>, Vec<U256>) {
    if distribution_percent == 0 || distribution_percent > 100 {
        return (vec![100], vec![total]);
    }

    (1..=100 / distribution_percent)
        .map(|i| {
            let pct = i * distribution_percent;
            (pct, total * U256::from(pct) / U256::from(100))
        })
        .unzip()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartographer::{BridgePool, V2Pool, V3Pool, V4Pool};
    use alloy_primitives::hex;
    use alloy_sol_types::sol_data::{Array, Uint};
    use alloy_sol_types::SolType;

    fn token(byte: u8, symbol: &str) -> Currency {
        Currency::new(1, Address::repeat_byte(byte), 18).with_symbol(symbol)
    }

    fn v3(a: &Currency, b: &Currency, fee: u32) -> Pool {
        Pool::V3(V3Pool {
            address: Address::repeat_byte(0x30),
            token0: a.clone(),
            token1: b.clone(),
            fee,
            tick_spacing: 10,
        })
    }

    fn v2(a: &Currency, b: &Currency) -> Pool {
        Pool::V2(V2Pool { address: Address::repeat_byte(0x20), token0: a.clone(), token1: b.clone() })
    }

    fn quoters() -> QuoterAddresses {
        QuoterAddresses {
            chain_id: 1,
            v3: Some(Address::repeat_byte(0xa3)),
            v4: Some(Address::repeat_byte(0xa4)),
            mixed: Some(Address::repeat_byte(0xaa)),
        }
    }

    fn two_hop_v3() -> Route {
        let (a, b, c) = (token(1, "A"), token(2, "B"), token(3, "C"));
        Route::new(RouteProtocol::V3, vec![v3(&a, &b, 500), v3(&c, &b, 3000)], a, c)
    }

    #[test]
    fn test_plan_is_route_major() {
        let routes = vec![two_hop_v3(), two_hop_v3(), two_hop_v3()];
        let amounts = vec![U256::from(1), U256::from(2)];

        let calls = plan(&routes, &amounts, TradeType::ExactInput, &quoters()).unwrap();

        assert_eq!(calls.len(), 6);
        for (i, call) in calls.iter().enumerate() {
            assert_eq!(call.route_index, i / amounts.len());
            assert_eq!(call.amount_index, i % amounts.len());
            assert_eq!(call.kind, QuoterKind::V3);
            assert_eq!(call.target, Address::repeat_byte(0xa3));
        }
    }

    #[test]
    fn test_v3_path_reverses_for_exact_output() {
        let route = two_hop_v3();

        let forward = encode_v3_path(&route, TradeType::ExactInput);
        let mut expected = Vec::new();
        expected.extend_from_slice(&[0x01; 20]);
        expected.extend_from_slice(&hex!("0001f4"));
        expected.extend_from_slice(&[0x02; 20]);
        expected.extend_from_slice(&hex!("000bb8"));
        expected.extend_from_slice(&[0x03u8; 20]);
        assert_eq!(&forward[..], expected.as_slice());

        let backward = encode_v3_path(&route, TradeType::ExactOutput);
        assert_eq!(&backward[..20], &[0x03u8; 20]);
        assert_eq!(&backward[20..23], &hex!("000bb8"));
        assert_eq!(&backward[43..46], &hex!("0001f4"));
        assert_eq!(&backward[46..], &[0x01u8; 20]);
    }

    fn two_hop_v4() -> Route {
        let (a, b, c) = (token(1, "A"), token(2, "B"), token(3, "C"));
        let v4 = |x: &Currency, y: &Currency, fee: u32| {
            Pool::V4(V4Pool { token0: x.clone(), token1: y.clone(), fee, tick_spacing: 10, hooks: Address::ZERO })
        };
        Route::new(RouteProtocol::V4, vec![v4(&a, &b, 500), v4(&b, &c, 3000)], a, c)
    }

    #[test]
    fn test_v4_exact_output_keys_run_input_to_output() {
        let data = encode_v4_call(&two_hop_v4(), U256::from(100), TradeType::ExactOutput);
        let params = IV4Quoter::quoteExactOutputCall::abi_decode(&data).unwrap().params;

        assert_eq!(params.exactCurrency, Address::repeat_byte(0x03));
        let keys: Vec<(Address, u32)> =
            params.path.iter().map(|k| (k.intermediateCurrency, k.fee.to::<u32>())).collect();
        assert_eq!(keys, vec![(Address::repeat_byte(0x01), 500), (Address::repeat_byte(0x02), 3000)]);
    }

    #[test]
    fn test_v4_exact_input_keys_name_output_side() {
        let data = encode_v4_call(&two_hop_v4(), U256::from(100), TradeType::ExactInput);
        let params = IV4Quoter::quoteExactInputCall::abi_decode(&data).unwrap().params;

        assert_eq!(params.exactCurrency, Address::repeat_byte(0x01));
        let keys: Vec<(Address, u32)> =
            params.path.iter().map(|k| (k.intermediateCurrency, k.fee.to::<u32>())).collect();
        assert_eq!(keys, vec![(Address::repeat_byte(0x02), 500), (Address::repeat_byte(0x03), 3000)]);
    }

    #[test]
    fn test_mixed_path_flags() {
        let (a, b, c) = (token(1, "A"), token(2, "B"), token(3, "C"));
        let v4 = Pool::V4(V4Pool {
            token0: b.clone(),
            token1: c.clone(),
            fee: 500,
            tick_spacing: 10,
            hooks: Address::repeat_byte(0x44),
        });
        let route = Route::new(RouteProtocol::Mixed, vec![v2(&a, &b), v4], a, c);

        let path = encode_mixed_path(&route);

        // A | v2 flag | B | v4 flag+fee | tick spacing | hooks | C
        assert_eq!(path.len(), 20 + 3 + 20 + 3 + 3 + 20 + 20);
        assert_eq!(&path[20..23], &hex!("800000"));
        assert_eq!(&path[43..46], &hex!("4001f4"));
        assert_eq!(&path[46..49], &hex!("00000a"));
        assert_eq!(&path[49..69], &[0x44u8; 20]);
        assert_eq!(&path[69..], &[0x03u8; 20]);
    }

    #[test]
    fn test_bridge_hop_encodes_as_zero_fee_v4() {
        let eth = Currency::native(1);
        let weth = token(0xc0, "WETH");
        let bridge = Pool::Bridge(BridgePool { native: eth.clone(), wrapped: weth.clone() });
        let route = Route::new(RouteProtocol::V4, vec![bridge], eth, weth);

        let path = encode_mixed_path(&route);
        assert_eq!(&path[20..23], &hex!("400000"));
        assert_eq!(&path[23..26], &hex!("000000"));
    }

    #[test]
    fn test_exact_output_rejected_for_v2_and_mixed() {
        let (a, b) = (token(1, "A"), token(2, "B"));
        let route = Route::new(RouteProtocol::V2, vec![v2(&a, &b)], a, b);

        let err = plan(&[route], &[U256::from(1)], TradeType::ExactOutput, &quoters()).unwrap_err();
        assert!(matches!(
            err,
            QuoteError::RouteProtocolMismatch { protocol: RouteProtocol::V2, trade_type: TradeType::ExactOutput }
        ));
    }

    #[test]
    fn test_missing_quoter() {
        let mut addresses = quoters();
        addresses.v3 = None;

        let err = plan(&[two_hop_v3()], &[U256::from(1)], TradeType::ExactInput, &addresses).unwrap_err();
        assert!(matches!(err, QuoteError::MissingQuoter { protocol: RouteProtocol::V3, chain_id: 1 }));
    }

    #[test]
    fn test_decode_v3_return() {
        type Returns = (Uint<256>, Array<Uint<160>>, Array<Uint<32>>, Uint<256>);
        let ret = (
            U256::from(1234),
            vec![U160::from(7)],
            vec![2u32],
            U256::from(90_000),
        );
        let data = Returns::abi_encode_params(&ret);

        let out = QuoterKind::V3.decode(&data).unwrap();
        assert_eq!(out.amount, U256::from(1234));
        assert_eq!(out.sqrt_price_x96_after, vec![U160::from(7)]);
        assert_eq!(out.initialized_ticks_crossed, vec![2]);
        assert_eq!(out.gas_estimate, U256::from(90_000));

        assert!(QuoterKind::V3.decode(&[0u8; 4]).is_err());
    }

    #[test]
    fn test_amount_distribution() {
        let (percents, amounts) = amount_distribution(U256::from(1000), 25);
        assert_eq!(percents, vec![25, 50, 75, 100]);
        assert_eq!(amounts, vec![U256::from(250), U256::from(500), U256::from(750), U256::from(1000)]);

        let (percents, _) = amount_distribution(U256::from(1000), 0);
        assert_eq!(percents, vec![100]);
    }
}
