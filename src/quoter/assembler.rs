//! Result Assembler
//!
//! Step 3.4: regroup flat results into one record per (route, amount).

use alloy_primitives::aliases::U160;
use alloy_primitives::U256;
use serde::Serialize;
use tracing::debug;

use super::dispatcher::QuoteResult;
use super::planner::TradeType;
use crate::brain::Route;

/// Quote for one amount along one route
#[derive(Debug, Clone, Serialize)]
pub struct AmountQuote {
    pub amount: U256,
    /// Output amount (exact input) or required input (exact output); None if the call failed
    pub quote: Option<U256>,
    pub sqrt_price_x96_after: Option<Vec<U160>>,
    pub initialized_ticks_crossed: Option<Vec<u32>>,
    pub gas_estimate: Option<U256>,
    /// Gas the multicall reported for this call, kept for failed calls too
    pub gas_used: u64,
}

#[derive(Debug, Clone)]
pub struct RouteWithQuotes {
    pub route: Route,
    pub quotes: Vec<AmountQuote>,
}

impl RouteWithQuotes {
    pub fn successful(&self) -> usize {
        self.quotes.iter().filter(|q| q.quote.is_some()).count()
    }
}

/// Everything one invocation produced
#[derive(Debug, Clone, Default)]
pub struct QuoteBatch {
    pub routes: Vec<RouteWithQuotes>,
    pub block_number: u64,
    /// Conservative: the max over all chunks
    pub gas_used_per_success: u64,
}

impl QuoteBatch {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Best route for the amount at `amount_index`: highest output for
    /// exact input, lowest required input for exact output
    pub fn best(&self, amount_index: usize, trade_type: TradeType) -> Option<(&RouteWithQuotes, &AmountQuote)> {
        let candidates = self.routes.iter().filter_map(|r| {
            let quote = r.quotes.get(amount_index)?;
            quote.quote.map(|q| (r, quote, q))
        });

        let best = match trade_type {
            TradeType::ExactInput => candidates.max_by_key(|(_, _, q)| *q),
            TradeType::ExactOutput => candidates.min_by_key(|(_, _, q)| *q),
        };

        best.map(|(route, quote, _)| (route, quote))
    }
}

/// Pair results with routes using `amounts.len()` as the stride.
///
/// Results must be in planner order (route-major).
pub fn assemble(routes: &[Route], amounts: &[U256], results: &[QuoteResult]) -> Vec<RouteWithQuotes> {
    let stride = amounts.len();
    let mut succeeded = 0;
    let mut failed = 0;

    let assembled: Vec<RouteWithQuotes> = routes
        .iter()
        .enumerate()
        .map(|(route_index, route)| {
            let start = (route_index * stride).min(results.len());
            let end = (start + stride).min(results.len());

            let quotes = amounts
                .iter()
                .zip(&results[start..end])
                .map(|(amount, result)| match (&result.output, result.success) {
                    (Some(output), true) => {
                        succeeded += 1;
                        AmountQuote {
                            amount: *amount,
                            quote: Some(output.amount),
                            sqrt_price_x96_after: Some(output.sqrt_price_x96_after.clone()),
                            initialized_ticks_crossed: Some(output.initialized_ticks_crossed.clone()),
                            gas_estimate: Some(output.gas_estimate),
                            gas_used: result.gas_used,
                        }
                    }
                    _ => {
                        failed += 1;
                        AmountQuote {
                            amount: *amount,
                            quote: None,
                            sqrt_price_x96_after: None,
                            initialized_ticks_crossed: None,
                            gas_estimate: None,
                            gas_used: result.gas_used,
                        }
                    }
                })
                .collect();

            RouteWithQuotes { route: route.clone(), quotes }
        })
        .collect();

    debug!(
        "Assembled {} routes: {} successful quotes, {} failed",
        assembled.len(),
        succeeded,
        failed
    );

    assembled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::RouteProtocol;
    use crate::cartographer::Currency;
    use crate::quoter::planner::QuoteOutput;
    use alloy_primitives::Bytes;

    fn route() -> Route {
        let eth = Currency::native(1);
        Route::new(RouteProtocol::V4, vec![], eth.clone(), eth)
    }

    fn ok(amount: u64) -> QuoteResult {
        QuoteResult {
            success: true,
            gas_used: 90_000,
            output: Some(QuoteOutput {
                amount: U256::from(amount),
                gas_estimate: U256::from(70_000),
                ..Default::default()
            }),
            revert_data: Bytes::new(),
        }
    }

    fn failed() -> QuoteResult {
        QuoteResult {
            success: false,
            gas_used: 12_345,
            output: None,
            revert_data: Bytes::from(vec![0xde, 0xad]),
        }
    }

    #[test]
    fn test_stride_grouping() {
        let routes = vec![route(), route(), route()];
        let amounts = vec![U256::from(1), U256::from(2)];
        let results = vec![ok(10), ok(20), failed(), ok(40), ok(50), ok(60)];

        let assembled = assemble(&routes, &amounts, &results);

        assert_eq!(assembled.len(), 3);
        assert!(assembled.iter().all(|r| r.quotes.len() == 2));
        assert_eq!(assembled[0].quotes[1].quote, Some(U256::from(20)));
        assert_eq!(assembled[1].quotes[0].quote, None);
        assert_eq!(assembled[1].quotes[0].gas_used, 12_345);
        assert_eq!(assembled[1].quotes[1].amount, U256::from(2));
        assert_eq!(assembled[2].quotes[1].quote, Some(U256::from(60)));
        assert_eq!(assembled[1].successful(), 1);
    }

    #[test]
    fn test_assemble_is_pure() {
        let routes = vec![route(), route()];
        let amounts = vec![U256::from(5)];
        let results = vec![ok(1), failed()];

        let first = assemble(&routes, &amounts, &results);
        let second = assemble(&routes, &amounts, &results);

        let quotes = |v: &[RouteWithQuotes]| v.iter().map(|r| r.quotes[0].quote).collect::<Vec<_>>();
        assert_eq!(quotes(&first), quotes(&second));
    }

    #[test]
    fn test_best_by_trade_type() {
        let routes = vec![route(), route(), route()];
        let amounts = vec![U256::from(1)];
        let batch = QuoteBatch {
            routes: assemble(&routes, &amounts, &[ok(30), failed(), ok(70)]),
            block_number: 1,
            gas_used_per_success: 90_000,
        };

        let (_, best_in) = batch.best(0, TradeType::ExactInput).unwrap();
        assert_eq!(best_in.quote, Some(U256::from(70)));

        let (_, best_out) = batch.best(0, TradeType::ExactOutput).unwrap();
        assert_eq!(best_out.quote, Some(U256::from(30)));

        assert!(QuoteBatch::empty().best(0, TradeType::ExactInput).is_none());
    }
}
