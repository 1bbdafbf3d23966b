//! Per-invocation retry state
//!
//! [`OperationContext`] is owned by one quote invocation and only changes
//! between rounds, after every chunk of the round has settled.

use std::collections::HashMap;
use std::ops::Range;
use tracing::info;

use super::dispatcher::{chunk_ranges, DispatchResult};
use super::errors::{FailureKind, QuoteFetchError};
use crate::config::{BatchParams, FallbackParams};

#[derive(Debug, Clone)]
pub enum ChunkStatus {
    Pending,
    Success(DispatchResult),
    Failed(QuoteFetchError),
}

/// A slice of the call list plus what happened to it this round
#[derive(Debug, Clone)]
pub struct ChunkState {
    pub range: Range<usize>,
    pub status: ChunkStatus,
}

impl ChunkState {
    pub fn pending(range: Range<usize>) -> Self {
        Self { range, status: ChunkStatus::Pending }
    }

    /// Fresh pending chunks over the whole call list
    pub fn partition(calls: usize, max_per_chunk: usize) -> Vec<Self> {
        chunk_ranges(calls, max_per_chunk)
            .into_iter()
            .map(Self::pending)
            .collect()
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, ChunkStatus::Success(_))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.status, ChunkStatus::Pending)
    }
}

/// One-shot escalation flags, one per failure kind
#[derive(Debug, Clone, Copy, Default)]
pub struct Escalations {
    pub block_header: bool,
    pub timeout: bool,
    pub out_of_gas: bool,
    pub success_rate: bool,
    pub unknown: bool,
}

#[derive(Debug, Clone)]
pub struct OperationContext {
    pub gas_limit: u64,
    pub multicall_chunk: usize,
    pub block_number: u64,
    pub escalations: Escalations,
    /// Rounds that hit a missing block header
    pub block_header_rounds: u32,
    pub rolled_back: bool,
    /// Retries scheduled per failure kind
    pub retries: HashMap<FailureKind, u32>,
}

impl OperationContext {
    pub fn new(batch: &BatchParams, block_number: u64) -> Self {
        Self {
            gas_limit: batch.gas_limit_per_call,
            multicall_chunk: batch.multicall_chunk,
            block_number,
            escalations: Escalations::default(),
            block_header_rounds: 0,
            rolled_back: false,
            retries: HashMap::new(),
        }
    }

    pub fn record_retry(&mut self, kind: FailureKind) {
        *self.retries.entry(kind).or_insert(0) += 1;
    }

    /// Overwrites gas and chunk size; a later fallback wins
    pub fn apply_fallback(&mut self, fallback: &FallbackParams, reason: FailureKind) {
        info!(
            "Escalating after {}: gas per call {} -> {}, chunk {} -> {}",
            reason, self.gas_limit, fallback.gas_limit, self.multicall_chunk, fallback.multicall_chunk
        );
        self.gas_limit = fallback.gas_limit;
        self.multicall_chunk = fallback.multicall_chunk;
    }

    /// Shift the pinned block by `offset` (negative = older), at most once
    pub fn roll_back(&mut self, offset: i64) {
        let previous = self.block_number;
        self.block_number = self.block_number.saturating_add_signed(offset);
        self.rolled_back = true;
        info!("Rolling back pinned block {} -> {}", previous, self.block_number);
    }
}
