//! Retry Orchestrator
//!
//! Step 3.3: drive the chunk dispatcher round by round until every chunk
//! has a consistent answer or the attempt budget runs out.
//!
//! Each round:
//! 1. Dispatch every non-successful chunk concurrently, wait for all
//! 2. Reject successful chunks whose success rate is below the minimum
//! 3. Detect block conflicts between successful chunks (retry all)
//! 4. Escalate per failure kind, each parameter change at most once
//! 5. Re-chunk everything (retry all) or only re-dispatch the failures

use backoff::backoff::Backoff;
use backoff::ExponentialBackoffBuilder;
use futures::future::join_all;
use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::context::{ChunkState, ChunkStatus, OperationContext};
use super::dispatcher::{ChunkDispatcher, DispatchResult, QuoteResult};
use super::errors::{FailureKind, QuoteError, QuoteFetchError};
use super::metrics;
use super::planner::CallInput;
use super::provider::MulticallProvider;
use crate::brain::{Route, RouteProtocol};
use crate::config::{ProtocolBatchParams, QuoteConfig};

/// Flat results, in call order
#[derive(Debug, Clone)]
pub struct FetchedQuotes {
    pub results: Vec<QuoteResult>,
    pub block_number: u64,
    pub gas_used_per_success: u64,
    pub attempts: u32,
    /// Retries scheduled per failure kind before the batch settled
    pub retries: HashMap<FailureKind, u32>,
}

#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Complete(FetchedQuotes),
    /// Final round failed with only out-of-gas errors on a chain that tolerates it
    Degraded,
}

/// Lowest success-rate threshold among the protocols being quoted
pub fn min_success_rate(batch: &ProtocolBatchParams, routes: &[Route]) -> f64 {
    routes
        .iter()
        .map(|r| batch.for_protocol(r.protocol).min_success_rate)
        .fold(None, |min: Option<f64>, rate| Some(min.map_or(rate, |m| m.min(rate))))
        .unwrap_or(0.0)
}

pub struct RetryOrchestrator<'a> {
    dispatcher: ChunkDispatcher<'a>,
    config: &'a QuoteConfig,
    protocol: RouteProtocol,
}

impl<'a> RetryOrchestrator<'a> {
    pub fn new(provider: &'a dyn MulticallProvider, config: &'a QuoteConfig, protocol: RouteProtocol) -> Self {
        let dispatcher = ChunkDispatcher::new(
            provider,
            config.multicall_address,
            Duration::from_millis(config.chunk_timeout_ms),
        );
        Self { dispatcher, config, protocol }
    }

    pub async fn fetch(
        &self,
        calls: &[CallInput],
        mut ctx: OperationContext,
        min_success_rate: f64,
    ) -> Result<FetchOutcome, QuoteError> {
        let started = Instant::now();
        let attempts = self.config.retry.attempts();
        let max_delay = Duration::from_millis(self.config.retry.max_timeout_ms);
        let mut backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(self.config.retry.min_timeout_ms))
            .with_max_interval(max_delay)
            .with_max_elapsed_time(None)
            .build();

        let mut chunks = ChunkState::partition(calls.len(), ctx.multicall_chunk);
        metrics::batch_started(self.protocol, calls.len(), chunks.len(), ctx.gas_limit, ctx.block_number);

        let mut outstanding: Vec<QuoteFetchError> = Vec::new();
        let mut failed_chunks = 0;

        for attempt in 1..=attempts {
            if attempt > 1 {
                let delay = backoff.next_backoff().unwrap_or(max_delay);
                debug!("Retry round {} in {:?}", attempt, delay);
                tokio::time::sleep(delay).await;
            }

            let settled = self
                .run_round(calls, std::mem::take(&mut chunks), &ctx, min_success_rate, attempt)
                .await;

            if let Some(index) = settled.iter().position(ChunkState::is_pending) {
                return Err(QuoteError::PendingChunk { index, attempt });
            }

            outstanding = settled
                .iter()
                .filter_map(|c| match &c.status {
                    ChunkStatus::Failed(e) => Some(e.clone()),
                    _ => None,
                })
                .collect();
            failed_chunks = outstanding.len();

            let blocks: BTreeSet<u64> = settled
                .iter()
                .filter_map(|c| match &c.status {
                    ChunkStatus::Success(r) => Some(r.block_number),
                    _ => None,
                })
                .collect();

            if blocks.len() > 1 {
                let blocks: Vec<u64> = blocks.into_iter().collect();
                metrics::block_conflict(self.protocol, &blocks);
                failed_chunks = settled.len();
                outstanding.push(QuoteFetchError::BlockConflict { blocks });
            }

            if outstanding.is_empty() {
                let fetched = collect(settled, attempt, &ctx);
                metrics::completed(
                    self.protocol,
                    attempt,
                    calls.len(),
                    fetched.results.iter().filter(|r| r.success).count(),
                    fetched.gas_used_per_success,
                    started.elapsed(),
                );
                return Ok(FetchOutcome::Complete(fetched));
            }

            if attempt == attempts {
                break;
            }

            let retry_all = self.escalate(&outstanding, &mut ctx);

            chunks = if retry_all {
                ChunkState::partition(calls.len(), ctx.multicall_chunk)
            } else {
                settled
                    .into_iter()
                    .map(|c| if c.is_success() { c } else { ChunkState::pending(c.range) })
                    .collect()
            };
        }

        self.give_up(outstanding, failed_chunks, attempts)
    }

    async fn run_round(
        &self,
        calls: &[CallInput],
        chunks: Vec<ChunkState>,
        ctx: &OperationContext,
        min_success_rate: f64,
        attempt: u32,
    ) -> Vec<ChunkState> {
        let gas_limit = ctx.gas_limit;
        let block = ctx.block_number;
        let accept_low_rate = ctx.escalations.success_rate;

        let dispatching: usize = chunks.iter().filter(|c| !c.is_success()).map(|c| c.range.len()).sum();
        metrics::round_dispatched(self.protocol, attempt, chunks.iter().filter(|c| !c.is_success()).count(), dispatching);

        let dispatched = join_all(chunks.iter().map(|chunk| async move {
            if chunk.is_success() {
                return None;
            }
            Some(
                self.dispatcher
                    .dispatch(&calls[chunk.range.clone()], gas_limit, block)
                    .await,
            )
        }))
        .await;

        chunks
            .into_iter()
            .zip(dispatched)
            .map(|(chunk, result)| match result {
                None => chunk,
                Some(result) => ChunkState {
                    range: chunk.range,
                    status: self.settle(result, min_success_rate, accept_low_rate),
                },
            })
            .collect()
    }

    fn settle(
        &self,
        result: Result<DispatchResult, QuoteFetchError>,
        min_success_rate: f64,
        accept_low_rate: bool,
    ) -> ChunkStatus {
        let result = match result {
            Ok(result) => result,
            Err(e) => {
                metrics::chunk_failed(self.protocol, e.kind(), &e.to_string());
                return ChunkStatus::Failed(e);
            }
        };

        let rate = result.success_rate();
        if rate >= min_success_rate {
            return ChunkStatus::Success(result);
        }

        if accept_low_rate {
            info!(
                "Chunk success rate {:.3} still below {:.3} after escalation, accepting",
                rate, min_success_rate
            );
            return ChunkStatus::Success(result);
        }

        let e = QuoteFetchError::SuccessRate { rate, min: min_success_rate };
        metrics::chunk_failed(self.protocol, e.kind(), &e.to_string());
        ChunkStatus::Failed(e)
    }

    /// Apply escalations for this round's failures, in order.
    /// Returns whether every chunk must be re-dispatched.
    fn escalate(&self, failures: &[QuoteFetchError], ctx: &mut OperationContext) -> bool {
        let rollback = &self.config.block_number.rollback;
        let mut retry_all = false;
        let mut counted_block_header = false;

        for failure in failures {
            let kind = failure.kind();
            ctx.record_retry(kind);

            match kind {
                FailureKind::BlockConflict => retry_all = true,
                FailureKind::BlockHeader => {
                    if !counted_block_header {
                        ctx.block_header_rounds += 1;
                        counted_block_header = true;
                    }
                    ctx.escalations.block_header = true;

                    if rollback.enabled
                        && !ctx.rolled_back
                        && ctx.block_header_rounds >= rollback.attempts_before_rollback
                    {
                        ctx.roll_back(rollback.rollback_block_offset);
                        retry_all = true;
                    }
                }
                FailureKind::Timeout => ctx.escalations.timeout = true,
                FailureKind::OutOfGas => {
                    if !ctx.escalations.out_of_gas {
                        ctx.escalations.out_of_gas = true;
                        ctx.apply_fallback(&self.config.gas_error_override, kind);
                        retry_all = true;
                    }
                }
                FailureKind::SuccessRate => {
                    if !ctx.escalations.success_rate {
                        ctx.escalations.success_rate = true;
                        ctx.apply_fallback(&self.config.success_rate_override, kind);
                        retry_all = true;
                    }
                }
                FailureKind::Unknown => ctx.escalations.unknown = true,
            }
        }

        for kind in failures.iter().map(QuoteFetchError::kind).collect::<BTreeSet<_>>() {
            metrics::retry(self.protocol, kind, retry_all);
        }

        retry_all
    }

    fn give_up(
        &self,
        outstanding: Vec<QuoteFetchError>,
        failed_chunks: usize,
        attempts: u32,
    ) -> Result<FetchOutcome, QuoteError> {
        let reasons: Vec<FailureKind> = outstanding.iter().map(QuoteFetchError::kind).collect();

        let only_gas = !reasons.is_empty() && reasons.iter().all(|k| *k == FailureKind::OutOfGas);
        if only_gas && self.config.gas_degradation_chains.contains(&self.config.chain_id) {
            metrics::degraded(self.protocol, self.config.chain_id, attempts);
            return Ok(FetchOutcome::Degraded);
        }

        metrics::exhausted(self.protocol, attempts, &reasons);
        Err(QuoteError::Exhausted {
            failed: failed_chunks,
            attempts,
            reasons,
        })
    }
}

/// Concatenate successful chunks in call order
fn collect(settled: Vec<ChunkState>, attempts: u32, ctx: &OperationContext) -> FetchedQuotes {
    let mut results = Vec::new();
    let mut block_number = ctx.block_number;
    let mut gas_used_per_success = 0;

    for chunk in settled {
        if let ChunkStatus::Success(result) = chunk.status {
            block_number = result.block_number;
            gas_used_per_success = gas_used_per_success.max(result.gas_used_per_success);
            results.extend(result.results);
        }
    }

    FetchedQuotes {
        results,
        block_number,
        gas_used_per_success,
        attempts,
        retries: ctx.retries.clone(),
    }
}
