//! Node seam - pinned-block batched calls
//!
//! Quote calls are batched through the Uniswap interface multicall, which
//! forwards a per-sub-call gas limit and reports the block it executed at.
//! The orchestrator only ever talks to [`MulticallProvider`], so tests can
//! script node behavior without a network.

use alloy_eips::BlockId;
use alloy_primitives::{Address, Bytes, U256};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::{sol, SolCall};
use async_trait::async_trait;
use tracing::debug;

use super::errors::ProviderError;

// ============================================
// SOLIDITY INTERFACES
// ============================================

sol! {
    #[derive(Debug)]
    interface IUniswapInterfaceMulticall {
        struct Call {
            address target;
            uint256 gasLimit;
            bytes callData;
        }

        struct CallResult {
            bool success;
            uint256 gasUsed;
            bytes returnData;
        }

        function multicall(Call[] memory calls)
            public
            returns (uint256 blockNumber, CallResult[] memory returnData);
    }
}

/// One quoter call inside a batch
#[derive(Debug, Clone)]
pub struct SubCall {
    pub target: Address,
    pub gas_limit: u64,
    pub calldata: Bytes,
}

#[derive(Debug, Clone)]
pub struct SubCallResult {
    pub success: bool,
    pub gas_used: u64,
    pub return_data: Bytes,
}

#[derive(Debug, Clone)]
pub struct MulticallResponse {
    /// Block the batch actually executed at
    pub block_number: u64,
    pub results: Vec<SubCallResult>,
}

#[async_trait]
pub trait MulticallProvider: Send + Sync {
    async fn block_number(&self) -> Result<u64, ProviderError>;

    async fn multicall(
        &self,
        multicall: Address,
        calls: Vec<SubCall>,
        block: u64,
    ) -> Result<MulticallResponse, ProviderError>;
}

// ============================================
// ALLOY HTTP PROVIDER
// ============================================

/// `eth_call` over HTTP
pub struct AlloyMulticallProvider {
    rpc_url: String,
}

impl AlloyMulticallProvider {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self { rpc_url: rpc_url.into() }
    }
}

#[async_trait]
impl MulticallProvider for AlloyMulticallProvider {
    async fn block_number(&self) -> Result<u64, ProviderError> {
        let url = self
            .rpc_url
            .parse()
            .map_err(|e| ProviderError::Transport(format!("invalid RPC url: {e}")))?;
        let provider = ProviderBuilder::new().connect_http(url);

        provider
            .get_block_number()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))
    }

    async fn multicall(
        &self,
        multicall: Address,
        calls: Vec<SubCall>,
        block: u64,
    ) -> Result<MulticallResponse, ProviderError> {
        let url = self
            .rpc_url
            .parse()
            .map_err(|e| ProviderError::Transport(format!("invalid RPC url: {e}")))?;
        let provider = ProviderBuilder::new().connect_http(url);

        let count = calls.len();
        let calls = calls
            .into_iter()
            .map(|c| IUniswapInterfaceMulticall::Call {
                target: c.target,
                gasLimit: U256::from(c.gas_limit),
                callData: c.calldata,
            })
            .collect();

        let calldata = IUniswapInterfaceMulticall::multicallCall { calls }.abi_encode();

        let tx = TransactionRequest::default()
            .to(multicall)
            .input(calldata.into());

        let raw = provider
            .call(tx)
            .block(BlockId::number(block))
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let decoded = IUniswapInterfaceMulticall::multicallCall::abi_decode_returns(&raw)
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        debug!("Multicall of {} sub-calls executed at block {}", count, decoded.blockNumber);

        Ok(MulticallResponse {
            block_number: decoded.blockNumber.saturating_to(),
            results: decoded
                .returnData
                .into_iter()
                .map(|r| SubCallResult {
                    success: r.success,
                    gas_used: r.gasUsed.saturating_to(),
                    return_data: r.returnData,
                })
                .collect(),
        })
    }
}
