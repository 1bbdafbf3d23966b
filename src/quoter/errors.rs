//! Quote fetching errors
//!
//! Three layers:
//! - [`ProviderError`]: what the node seam reports for one request
//! - [`QuoteFetchError`]: why a chunk failed in a round (recoverable)
//! - [`QuoteError`]: why a whole invocation failed

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use super::planner::TradeType;
use crate::brain::RouteProtocol;

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("failed to decode multicall response: {0}")]
    Decode(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

/// Failure category driving the retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FailureKind {
    BlockConflict,
    BlockHeader,
    Timeout,
    OutOfGas,
    SuccessRate,
    Unknown,
}

impl FailureKind {
    /// Stable label for metrics and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::BlockConflict => "block_conflict",
            FailureKind::BlockHeader => "block_header",
            FailureKind::Timeout => "timeout",
            FailureKind::OutOfGas => "out_of_gas",
            FailureKind::SuccessRate => "success_rate",
            FailureKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
pub enum QuoteFetchError {
    #[error("chunks observed different blocks: {blocks:?}")]
    BlockConflict { blocks: Vec<u64> },
    #[error("provider could not find the block header: {0}")]
    ProviderBlockHeader(String),
    #[error("provider timed out: {0}")]
    ProviderTimeout(String),
    #[error("quote calls ran out of gas: {0}")]
    ProviderGas(String),
    #[error("success rate {rate:.3} below minimum {min:.3}")]
    SuccessRate { rate: f64, min: f64 },
    #[error("unknown provider error: {0}")]
    UnknownProvider(String),
}

impl QuoteFetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            QuoteFetchError::BlockConflict { .. } => FailureKind::BlockConflict,
            QuoteFetchError::ProviderBlockHeader(_) => FailureKind::BlockHeader,
            QuoteFetchError::ProviderTimeout(_) => FailureKind::Timeout,
            QuoteFetchError::ProviderGas(_) => FailureKind::OutOfGas,
            QuoteFetchError::SuccessRate { .. } => FailureKind::SuccessRate,
            QuoteFetchError::UnknownProvider(_) => FailureKind::Unknown,
        }
    }

    /// Classify a failed batched call by its error text
    pub fn classify(err: &ProviderError) -> Self {
        let message = err.to_string();
        if let ProviderError::Timeout(_) = err {
            return QuoteFetchError::ProviderTimeout(message);
        }

        let lower = message.to_lowercase();
        if lower.contains("header not found") {
            QuoteFetchError::ProviderBlockHeader(message)
        } else if lower.contains("timeout") || lower.contains("timed out") {
            QuoteFetchError::ProviderTimeout(message)
        } else if lower.contains("out of gas") {
            QuoteFetchError::ProviderGas(message)
        } else {
            QuoteFetchError::UnknownProvider(message)
        }
    }
}

#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("{protocol} routes cannot be quoted as {trade_type}")]
    RouteProtocolMismatch {
        protocol: RouteProtocol,
        trade_type: TradeType,
    },
    #[error("no {protocol} quoter configured for chain {chain_id}")]
    MissingQuoter {
        protocol: RouteProtocol,
        chain_id: u64,
    },
    #[error("chunk {index} was still pending after attempt {attempt}")]
    PendingChunk { index: usize, attempt: u32 },
    #[error("failed to get quotes after {attempts} attempts: {failed} chunks failed ({reasons:?})")]
    Exhausted {
        failed: usize,
        attempts: u32,
        reasons: Vec<FailureKind>,
    },
    #[error("failed to fetch block number: {0}")]
    BlockNumber(#[source] ProviderError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_message() {
        let header = ProviderError::Transport("server returned: header not found".into());
        assert_eq!(QuoteFetchError::classify(&header).kind(), FailureKind::BlockHeader);

        let timeout = ProviderError::Transport("request Timed Out".into());
        assert_eq!(QuoteFetchError::classify(&timeout).kind(), FailureKind::Timeout);

        let gas = ProviderError::Transport("execution reverted: out of gas".into());
        assert_eq!(QuoteFetchError::classify(&gas).kind(), FailureKind::OutOfGas);

        let other = ProviderError::Decode("bad bytes".into());
        assert_eq!(QuoteFetchError::classify(&other).kind(), FailureKind::Unknown);
    }

    #[test]
    fn test_elapsed_timer_is_timeout() {
        let err = ProviderError::Timeout(Duration::from_millis(50));
        assert_eq!(QuoteFetchError::classify(&err).kind(), FailureKind::Timeout);
    }

    #[test]
    fn test_exhausted_message_lists_reasons() {
        let err = QuoteError::Exhausted {
            failed: 2,
            attempts: 3,
            reasons: vec![FailureKind::OutOfGas, FailureKind::Timeout],
        };
        let text = err.to_string();
        assert!(text.contains("3 attempts"));
        assert!(text.contains("OutOfGas"));
    }
}
