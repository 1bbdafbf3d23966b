//! Currency identity
//!
//! A currency is a (chain, address) pair. Addresses are 20-byte values, so the
//! textual case of a checksummed or lowercased address never affects identity.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A token (or the chain's native currency, at the zero address)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Currency {
    pub chain_id: u64,
    pub address: Address,
    pub decimals: u8,
    #[serde(default)]
    pub symbol: Option<String>,
}

impl Currency {
    pub fn new(chain_id: u64, address: Address, decimals: u8) -> Self {
        Self {
            chain_id,
            address,
            decimals,
            symbol: None,
        }
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    /// The native currency of `chain_id` (ETH on most chains we quote on)
    pub fn native(chain_id: u64) -> Self {
        Self::new(chain_id, Address::ZERO, 18).with_symbol("ETH")
    }

    pub fn is_native(&self) -> bool {
        self.address == Address::ZERO
    }

    /// Symbol when known, otherwise a shortened address
    pub fn label(&self) -> String {
        match &self.symbol {
            Some(symbol) => symbol.clone(),
            None => format!("0x{}...", &format!("{:?}", self.address)[2..8]),
        }
    }
}

impl PartialEq for Currency {
    fn eq(&self, other: &Self) -> bool {
        self.chain_id == other.chain_id && self.address == other.address
    }
}

impl Eq for Currency {}

impl Hash for Currency {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.chain_id.hash(state);
        self.address.hash(state);
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
