//! Token definitions per chain
//!
//! Well-known currencies the CLI can resolve by symbol, plus the wrapped-native
//! token each chain uses to build the synthetic native/wrapped bridge pool.

use alloy_primitives::{address, Address};
use std::str::FromStr;

use crate::cartographer::{BridgePool, Currency, Pool};

// ============================================
// CHAIN IDS
// ============================================

pub const MAINNET: u64 = 1;
pub const OPTIMISM: u64 = 10;
pub const BASE: u64 = 8453;
pub const ARBITRUM: u64 = 42161;

/// Represents a token we know about on a given chain
#[derive(Debug, Clone, Copy)]
pub struct Token {
    pub symbol: &'static str,
    pub address: Address,
    pub decimals: u8,
    /// Wrapped form of the chain's native currency
    pub is_wrapped_native: bool,
}

impl Token {
    const fn new(symbol: &'static str, address: Address, decimals: u8) -> Self {
        Self { symbol, address, decimals, is_wrapped_native: false }
    }

    const fn wrapped(symbol: &'static str, address: Address) -> Self {
        Self { symbol, address, decimals: 18, is_wrapped_native: true }
    }

    pub fn currency(&self, chain_id: u64) -> Currency {
        Currency::new(chain_id, self.address, self.decimals).with_symbol(self.symbol)
    }
}

// ============================================
// TOKEN TABLES
// ============================================

const MAINNET_TOKENS: &[Token] = &[
    Token::wrapped("WETH", address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2")),
    Token::new("USDC", address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"), 6),
    Token::new("USDT", address!("dAC17F958D2ee523a2206206994597C13D831ec7"), 6),
    Token::new("DAI", address!("6B175474E89094C44Da98b954EedcdeCB5BE3830"), 18),
    Token::new("WBTC", address!("2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599"), 8),
    Token::new("wstETH", address!("7f39C581F595B53c5cb19bD0b3f8dA6c935E2Ca0"), 18),
    Token::new("LINK", address!("514910771AF9Ca656af840dff83E8264EcF986CA"), 18),
    Token::new("UNI", address!("1f9840a85d5aF5bf1D1762F925BDADdC4201F984"), 18),
];

const OPTIMISM_TOKENS: &[Token] = &[
    Token::wrapped("WETH", address!("4200000000000000000000000000000000000006")),
    Token::new("USDC", address!("0b2C639c533813f4Aa9D7837CAf62653d097Ff85"), 6),
    Token::new("OP", address!("4200000000000000000000000000000000000042"), 18),
];

const BASE_TOKENS: &[Token] = &[
    Token::wrapped("WETH", address!("4200000000000000000000000000000000000006")),
    Token::new("USDC", address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"), 6),
    Token::new("cbBTC", address!("cbB7C0000aB88B473b1f5aFd9ef808440eed33Bf"), 8),
];

const ARBITRUM_TOKENS: &[Token] = &[
    Token::wrapped("WETH", address!("82aF49447D8a07e3bd95BD0d56f35241523fBab1")),
    Token::new("USDC", address!("af88d065e77c8cC2239327C5EDb3A432268e5831"), 6),
    Token::new("USDT", address!("Fd086bC7CD5C481DCC9C85ebE478A1C0b69FCbb9"), 6),
    Token::new("ARB", address!("912CE59144191C1204E64559FE8253a0e49E6548"), 18),
];

pub fn chain_tokens(chain_id: u64) -> &'static [Token] {
    match chain_id {
        MAINNET => MAINNET_TOKENS,
        OPTIMISM => OPTIMISM_TOKENS,
        BASE => BASE_TOKENS,
        ARBITRUM => ARBITRUM_TOKENS,
        _ => &[],
    }
}

pub fn wrapped_native(chain_id: u64) -> Option<Currency> {
    chain_tokens(chain_id)
        .iter()
        .find(|t| t.is_wrapped_native)
        .map(|t| t.currency(chain_id))
}

/// Synthetic native <-> wrapped-native pool, for chains where we know the wrapper
pub fn bridge_pool(chain_id: u64) -> Option<Pool> {
    wrapped_native(chain_id).map(|wrapped| {
        Pool::Bridge(BridgePool {
            native: Currency::native(chain_id),
            wrapped,
        })
    })
}

/// Resolve "ETH", a known symbol (case-insensitive) or a raw address
pub fn resolve_currency(chain_id: u64, query: &str) -> Option<Currency> {
    if query.eq_ignore_ascii_case("eth") || query.eq_ignore_ascii_case("native") {
        return Some(Currency::native(chain_id));
    }

    if let Some(token) = chain_tokens(chain_id)
        .iter()
        .find(|t| t.symbol.eq_ignore_ascii_case(query))
    {
        return Some(token.currency(chain_id));
    }

    let address = Address::from_str(query).ok()?;
    match chain_tokens(chain_id).iter().find(|t| t.address == address) {
        Some(token) => Some(token.currency(chain_id)),
        None => Some(Currency::new(chain_id, address, 18)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_supported_chain_has_a_wrapper() {
        for chain in [MAINNET, OPTIMISM, BASE, ARBITRUM] {
            assert!(wrapped_native(chain).is_some(), "chain {chain} has no wrapped native");
        }
        assert!(wrapped_native(999_999).is_none());
    }

    #[test]
    fn test_bridge_pool_connects_native_and_wrapped() {
        let pool = bridge_pool(MAINNET).unwrap();
        let weth = wrapped_native(MAINNET).unwrap();

        assert!(pool.is_bridge());
        assert_eq!(pool.other_token(&Currency::native(MAINNET)), Some(&weth));
    }

    #[test]
    fn test_resolve_by_symbol_and_address() {
        let usdc = resolve_currency(MAINNET, "usdc").unwrap();
        assert_eq!(usdc.decimals, 6);

        // Lowercase address resolves to the same known token
        let by_addr = resolve_currency(MAINNET, "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48").unwrap();
        assert_eq!(by_addr, usdc);
        assert_eq!(by_addr.symbol.as_deref(), Some("USDC"));

        assert!(resolve_currency(MAINNET, "ETH").unwrap().is_native());
        assert!(resolve_currency(MAINNET, "not-a-token").is_none());
    }
}
