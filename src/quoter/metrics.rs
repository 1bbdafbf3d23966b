//! Quote pipeline events
//!
//! Each event emits a structured `tracing` record and the matching `metrics`
//! series. Without an installed recorder the metrics calls are no-ops.

use std::time::Duration;

use metrics::{counter, gauge, histogram};
use tracing::{debug, info, warn};

use super::errors::FailureKind;
use crate::brain::RouteProtocol;

pub fn batch_started(protocol: RouteProtocol, calls: usize, chunks: usize, gas_limit: u64, block: u64) {
    info!(
        target: "quoter::batch",
        event = "started",
        protocol = %protocol,
        calls,
        chunks,
        gas_limit,
        block,
        "fetching {} quotes in {} chunks at block {}",
        calls,
        chunks,
        block
    );

    let protocol_label = protocol.to_string();
    histogram!("route_quoter_batch_size", "protocol" => protocol_label.clone()).record(calls as f64);
    histogram!("route_quoter_chunk_count", "protocol" => protocol_label).record(chunks as f64);
}

pub fn round_dispatched(protocol: RouteProtocol, attempt: u32, chunks: usize, calls: usize) {
    debug!(
        target: "quoter::round",
        event = "dispatched",
        protocol = %protocol,
        attempt,
        chunks,
        calls,
        "round dispatched"
    );

    counter!("route_quoter_calls_dispatched_total", "protocol" => protocol.to_string())
        .increment(calls as u64);
}

pub fn chunk_failed(protocol: RouteProtocol, kind: FailureKind, reason: &str) {
    debug!(
        target: "quoter::round",
        event = "chunk_failed",
        protocol = %protocol,
        kind = kind.as_str(),
        reason,
        "chunk failed"
    );

    counter!(
        "route_quoter_chunk_failures_total",
        "protocol" => protocol.to_string(),
        "kind" => kind.as_str()
    )
    .increment(1);
}

pub fn block_conflict(protocol: RouteProtocol, blocks: &[u64]) {
    warn!(
        target: "quoter::round",
        event = "block_conflict",
        protocol = %protocol,
        blocks = ?blocks,
        "successful chunks disagree on block number, retrying all"
    );
}

pub fn retry(protocol: RouteProtocol, kind: FailureKind, retry_all: bool) {
    counter!(
        "route_quoter_retries_total",
        "protocol" => protocol.to_string(),
        "kind" => kind.as_str(),
        "scope" => if retry_all { "all" } else { "failed" }
    )
    .increment(1);
}

pub fn completed(
    protocol: RouteProtocol,
    attempts: u32,
    expected: usize,
    succeeded: usize,
    gas_used_per_success: u64,
    elapsed: Duration,
) {
    let failed = expected.saturating_sub(succeeded);
    info!(
        target: "quoter::batch",
        event = "completed",
        protocol = %protocol,
        attempts,
        succeeded,
        failed,
        gas_used_per_success,
        elapsed_ms = elapsed.as_millis() as u64,
        "quotes fetched: {} ok, {} without quote after {} attempts",
        succeeded,
        failed,
        attempts
    );

    let protocol_label = protocol.to_string();
    histogram!("route_quoter_attempts", "protocol" => protocol_label.clone()).record(attempts as f64);
    histogram!("route_quoter_latency_ms", "protocol" => protocol_label.clone()).record(elapsed.as_millis() as f64);
    histogram!("route_quoter_gas_used_per_call", "protocol" => protocol_label.clone())
        .record(gas_used_per_success as f64);
    counter!("route_quoter_quotes_success_total", "protocol" => protocol_label.clone())
        .increment(succeeded as u64);
    counter!("route_quoter_quotes_failed_total", "protocol" => protocol_label.clone())
        .increment(failed as u64);
    gauge!("route_quoter_calls_expected", "protocol" => protocol_label).set(expected as f64);
}

pub fn degraded(protocol: RouteProtocol, chain_id: u64, attempts: u32) {
    warn!(
        target: "quoter::batch",
        event = "degraded",
        protocol = %protocol,
        chain_id,
        attempts,
        "every remaining chunk ran out of gas; returning no quotes"
    );

    counter!(
        "route_quoter_empty_degradations_total",
        "protocol" => protocol.to_string(),
        "chain_id" => chain_id.to_string()
    )
    .increment(1);
}

pub fn exhausted(protocol: RouteProtocol, attempts: u32, reasons: &[FailureKind]) {
    warn!(
        target: "quoter::batch",
        event = "exhausted",
        protocol = %protocol,
        attempts,
        reasons = ?reasons,
        "quote fetch failed after all attempts"
    );

    counter!("route_quoter_exhausted_total", "protocol" => protocol.to_string()).increment(1);
}
