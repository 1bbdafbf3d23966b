//! Phase 3: The Quoter
//!
//! Responsible for:
//! - Encoding (routes × amounts) into quoter calls
//! - Batching calls into pinned-block multicalls
//! - Recovering from partial failures round by round
//! - Regrouping results per route

mod assembler;
mod context;
mod dispatcher;
mod errors;
mod metrics;
mod orchestrator;
mod planner;
mod provider;

pub use assembler::{assemble, AmountQuote, QuoteBatch, RouteWithQuotes};
pub use context::{ChunkState, ChunkStatus, OperationContext};
pub use dispatcher::{chunk_ranges, ChunkDispatcher, DispatchResult, QuoteResult};
pub use errors::{FailureKind, ProviderError, QuoteError, QuoteFetchError};
pub use orchestrator::{min_success_rate, FetchOutcome, FetchedQuotes, RetryOrchestrator};
pub use planner::{
    amount_distribution, encode_mixed_path, encode_v3_path, plan, CallInput, QuoteOutput, QuoterAddresses,
    QuoterKind, TradeType,
};
pub use provider::{AlloyMulticallProvider, MulticallProvider, MulticallResponse, SubCall, SubCallResult};

use alloy_primitives::U256;
use std::sync::Arc;
use tracing::{debug, info};

use crate::brain::{compute_routes, Route, RouteProtocol};
use crate::cartographer::{Currency, Pool};
use crate::config::QuoteConfig;
use crate::tokens;

/// Enumerate-and-quote for one currency pair.
///
/// Shares only the config and the provider handle between invocations, so
/// one instance can serve concurrent callers.
pub struct RouteQuoter {
    config: QuoteConfig,
    provider: Arc<dyn MulticallProvider>,
}

impl RouteQuoter {
    pub fn new(config: QuoteConfig, provider: Arc<dyn MulticallProvider>) -> Self {
        Self { config, provider }
    }

    /// Quoter talking to `config.rpc_url` over HTTP
    pub fn from_config(config: QuoteConfig) -> Self {
        let provider = Arc::new(AlloyMulticallProvider::new(config.rpc_url.clone()));
        Self::new(config, provider)
    }

    pub fn config(&self) -> &QuoteConfig {
        &self.config
    }

    fn quoters(&self) -> QuoterAddresses {
        QuoterAddresses {
            chain_id: self.config.chain_id,
            v3: self.config.v3_quoter,
            v4: self.config.v4_quoter,
            mixed: self.config.mixed_quoter,
        }
    }

    /// Candidate routes of `flavor`; mixed search adds the bridge hop when enabled
    pub fn find_routes(&self, input: &Currency, output: &Currency, pools: &[Pool], flavor: RouteProtocol) -> Vec<Route> {
        let bridge = if self.config.enable_bridge {
            tokens::bridge_pool(self.config.chain_id)
        } else {
            None
        };
        compute_routes(flavor, input, output, pools, self.config.max_hops, bridge)
    }

    /// Quote every route for every amount at one pinned block.
    ///
    /// `block` pins the state; otherwise latest + `base_block_offset` is used.
    pub async fn quote_routes(
        &self,
        routes: &[Route],
        amounts: &[U256],
        trade_type: TradeType,
        block: Option<u64>,
    ) -> Result<QuoteBatch, QuoteError> {
        if routes.is_empty() || amounts.is_empty() {
            debug!("Nothing to quote ({} routes, {} amounts)", routes.len(), amounts.len());
            return Ok(QuoteBatch::empty());
        }

        let calls = plan(routes, amounts, trade_type, &self.quoters())?;

        let block_number = match block {
            Some(block) => block,
            None => {
                let latest = self.provider.block_number().await.map_err(QuoteError::BlockNumber)?;
                latest.saturating_add_signed(self.config.block_number.base_block_offset)
            }
        };

        let protocol = routes[0].protocol;
        let batch = self.config.batch.for_protocol(protocol);
        let min_rate = min_success_rate(&self.config.batch, routes);
        let ctx = OperationContext::new(batch, block_number);

        let orchestrator = RetryOrchestrator::new(self.provider.as_ref(), &self.config, protocol);
        match orchestrator.fetch(&calls, ctx, min_rate).await? {
            FetchOutcome::Degraded => Ok(QuoteBatch::empty()),
            FetchOutcome::Complete(fetched) => {
                let routes = assemble(routes, amounts, &fetched.results);
                info!(
                    "Quoted {} routes x {} amounts at block {} ({} attempts)",
                    routes.len(),
                    amounts.len(),
                    fetched.block_number,
                    fetched.attempts
                );
                Ok(QuoteBatch {
                    routes,
                    block_number: fetched.block_number,
                    gas_used_per_success: fetched.gas_used_per_success,
                })
            }
        }
    }

    pub async fn quote_exact_in(
        &self,
        routes: &[Route],
        amounts_in: &[U256],
        block: Option<u64>,
    ) -> Result<QuoteBatch, QuoteError> {
        self.quote_routes(routes, amounts_in, TradeType::ExactInput, block).await
    }

    pub async fn quote_exact_out(
        &self,
        routes: &[Route],
        amounts_out: &[U256],
        block: Option<u64>,
    ) -> Result<QuoteBatch, QuoteError> {
        self.quote_routes(routes, amounts_out, TradeType::ExactOutput, block).await
    }

    /// Enumerate routes of `flavor` between the pair, then quote them
    #[allow(clippy::too_many_arguments)]
    pub async fn find_and_quote(
        &self,
        input: &Currency,
        output: &Currency,
        pools: &[Pool],
        amounts: &[U256],
        trade_type: TradeType,
        flavor: RouteProtocol,
        block: Option<u64>,
    ) -> Result<QuoteBatch, QuoteError> {
        let routes = self.find_routes(input, output, pools, flavor);
        self.quote_routes(&routes, amounts, trade_type, block).await
    }
}
