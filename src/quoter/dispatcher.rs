//! Chunk Dispatcher
//!
//! Step 3.2: one chunk of quoter calls = one pinned-block multicall.

use alloy_primitives::{Address, Bytes};
use std::ops::Range;
use std::time::Duration;
use tracing::debug;

use super::errors::{ProviderError, QuoteFetchError};
use super::planner::{CallInput, QuoteOutput};
use super::provider::{MulticallProvider, SubCall};

/// Outcome of a single quoter call inside a multicall
#[derive(Debug, Clone)]
pub struct QuoteResult {
    pub success: bool,
    /// Gas the multicall reported for this sub-call
    pub gas_used: u64,
    pub output: Option<QuoteOutput>,
    /// Revert bytes, or the undecodable return data
    pub revert_data: Bytes,
}

/// A chunk that came back from the node
#[derive(Debug, Clone)]
pub struct DispatchResult {
    pub block_number: u64,
    pub results: Vec<QuoteResult>,
    /// Max gas used among the chunk's successful sub-calls
    pub gas_used_per_success: u64,
}

impl DispatchResult {
    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    /// Successful sub-calls over total; an empty chunk counts as fully successful
    pub fn success_rate(&self) -> f64 {
        if self.results.is_empty() {
            return 1.0;
        }
        self.success_count() as f64 / self.results.len() as f64
    }
}

/// Split `n` calls into the fewest chunks of at most `max_per_chunk`, with
/// sizes differing by at most one.
///
/// 10 calls, max 3 → `[3, 3, 2, 2]`; never a near-empty trailing chunk.
pub fn chunk_ranges(n: usize, max_per_chunk: usize) -> Vec<Range<usize>> {
    if n == 0 {
        return Vec::new();
    }

    let max_per_chunk = max_per_chunk.max(1);
    let count = n.div_ceil(max_per_chunk);
    let base = n / count;
    let larger = n % count;

    let mut ranges = Vec::with_capacity(count);
    let mut start = 0;
    for i in 0..count {
        let size = if i < larger { base + 1 } else { base };
        ranges.push(start..start + size);
        start += size;
    }
    ranges
}

pub struct ChunkDispatcher<'a> {
    provider: &'a dyn MulticallProvider,
    multicall: Address,
    timeout: Duration,
}

impl<'a> ChunkDispatcher<'a> {
    pub fn new(provider: &'a dyn MulticallProvider, multicall: Address, timeout: Duration) -> Self {
        Self { provider, multicall, timeout }
    }

    /// Execute one chunk at `block`, every sub-call capped at `gas_limit`.
    ///
    /// Transport failures come back classified; sub-call reverts and
    /// undecodable outputs are failed results, never an error.
    pub async fn dispatch(
        &self,
        calls: &[CallInput],
        gas_limit: u64,
        block: u64,
    ) -> Result<DispatchResult, QuoteFetchError> {
        let sub_calls = calls
            .iter()
            .map(|c| SubCall {
                target: c.target,
                gas_limit,
                calldata: c.calldata.clone(),
            })
            .collect();

        let response = match tokio::time::timeout(
            self.timeout,
            self.provider.multicall(self.multicall, sub_calls, block),
        )
        .await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(QuoteFetchError::classify(&e)),
            Err(_) => return Err(QuoteFetchError::classify(&ProviderError::Timeout(self.timeout))),
        };

        if response.results.len() != calls.len() {
            let err = ProviderError::Decode(format!(
                "expected {} results, got {}",
                calls.len(),
                response.results.len()
            ));
            return Err(QuoteFetchError::classify(&err));
        }

        let mut gas_used_per_success = 0;
        let results: Vec<QuoteResult> = calls
            .iter()
            .zip(response.results)
            .map(|(call, raw)| {
                if !raw.success {
                    return QuoteResult {
                        success: false,
                        gas_used: raw.gas_used,
                        output: None,
                        revert_data: raw.return_data,
                    };
                }

                match call.kind.decode(&raw.return_data) {
                    Ok(output) => {
                        gas_used_per_success = gas_used_per_success.max(raw.gas_used);
                        QuoteResult {
                            success: true,
                            gas_used: raw.gas_used,
                            output: Some(output),
                            revert_data: Bytes::new(),
                        }
                    }
                    Err(e) => {
                        debug!("Undecodable {:?} quoter output: {}", call.kind, e);
                        QuoteResult {
                            success: false,
                            gas_used: raw.gas_used,
                            output: None,
                            revert_data: raw.return_data,
                        }
                    }
                }
            })
            .collect();

        debug!(
            "Chunk of {} calls at block {}: {} succeeded",
            calls.len(),
            response.block_number,
            results.iter().filter(|r| r.success).count()
        );

        Ok(DispatchResult {
            block_number: response.block_number,
            results,
            gas_used_per_success,
        })
    }
}
