//! Pool Model - V2 / V3 / V4 / Bridge
//!
//! Pools carry only what route search and path encoding need: token ordering,
//! fee tier, tick spacing and hooks. Live reserves and prices are owned by the
//! pool-data collaborator and never flow through here.

use alloy_primitives::aliases::{I24, U24};
use alloy_primitives::{keccak256, Address, B256};
use alloy_sol_types::{sol, SolValue};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Currency;

sol! {
    /// Uniswap V4 pool key, hashed to obtain the pool id
    struct PoolKey {
        address currency0;
        address currency1;
        uint24 fee;
        int24 tickSpacing;
        address hooks;
    }
}

/// Underlying AMM protocol of a single pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    V2,
    V3,
    V4,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::V2 => write!(f, "V2"),
            Protocol::V3 => write!(f, "V3"),
            Protocol::V4 => write!(f, "V4"),
        }
    }
}

/// Constant-product pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct V2Pool {
    pub address: Address,
    pub token0: Currency,
    pub token1: Currency,
}

/// Concentrated-liquidity pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct V3Pool {
    pub address: Address,
    pub token0: Currency,
    pub token1: Currency,
    /// Fee in hundredths of a bip (3000 = 0.3%)
    pub fee: u32,
    pub tick_spacing: i32,
}

/// Singleton-managed pool identified by its pool key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct V4Pool {
    pub token0: Currency,
    pub token1: Currency,
    pub fee: u32,
    pub tick_spacing: i32,
    #[serde(default)]
    pub hooks: Address,
}

impl V4Pool {
    pub fn pool_id(&self) -> B256 {
        let key = PoolKey {
            currency0: self.token0.address,
            currency1: self.token1.address,
            fee: U24::from(self.fee),
            tickSpacing: I24::try_from(self.tick_spacing).unwrap_or_default(),
            hooks: self.hooks,
        };
        keccak256(key.abi_encode())
    }
}

/// Synthetic native <-> wrapped-native hop (wrap/unwrap, priced 1:1)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgePool {
    pub native: Currency,
    pub wrapped: Currency,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "protocol", rename_all = "lowercase")]
pub enum Pool {
    V2(V2Pool),
    V3(V3Pool),
    V4(V4Pool),
    Bridge(BridgePool),
}

impl Pool {
    pub fn token0(&self) -> &Currency {
        match self {
            Pool::V2(p) => &p.token0,
            Pool::V3(p) => &p.token0,
            Pool::V4(p) => &p.token0,
            Pool::Bridge(p) => &p.native,
        }
    }

    pub fn token1(&self) -> &Currency {
        match self {
            Pool::V2(p) => &p.token1,
            Pool::V3(p) => &p.token1,
            Pool::V4(p) => &p.token1,
            Pool::Bridge(p) => &p.wrapped,
        }
    }

    /// The bridge behaves as a zero-fee, zero-tick-spacing V4 pool
    pub fn protocol(&self) -> Protocol {
        match self {
            Pool::V2(_) => Protocol::V2,
            Pool::V3(_) => Protocol::V3,
            Pool::V4(_) | Pool::Bridge(_) => Protocol::V4,
        }
    }

    pub fn is_bridge(&self) -> bool {
        matches!(self, Pool::Bridge(_))
    }

    pub fn involves_token(&self, currency: &Currency) -> bool {
        self.token0() == currency || self.token1() == currency
    }

    /// Token reached by entering the pool with `from`; None if `from` is not in the pool
    pub fn other_token(&self, from: &Currency) -> Option<&Currency> {
        if self.token0() == from {
            Some(self.token1())
        } else if self.token1() == from {
            Some(self.token0())
        } else {
            None
        }
    }

    /// Fee in hundredths of a bip, zero for the bridge
    pub fn fee(&self) -> u32 {
        match self {
            Pool::V2(_) => 3000,
            Pool::V3(p) => p.fee,
            Pool::V4(p) => p.fee,
            Pool::Bridge(_) => 0,
        }
    }

    pub fn tick_spacing(&self) -> i32 {
        match self {
            Pool::V2(_) | Pool::Bridge(_) => 0,
            Pool::V3(p) => p.tick_spacing,
            Pool::V4(p) => p.tick_spacing,
        }
    }

    pub fn hooks(&self) -> Address {
        match self {
            Pool::V4(p) => p.hooks,
            _ => Address::ZERO,
        }
    }

    /// Pair/pool address for V2/V3, pool id for V4, zero for the bridge
    pub fn id(&self) -> B256 {
        match self {
            Pool::V2(p) => p.address.into_word(),
            Pool::V3(p) => p.address.into_word(),
            Pool::V4(p) => p.pool_id(),
            Pool::Bridge(_) => B256::ZERO,
        }
    }

    /// Fee formatted as a percentage, e.g. "0.05%"
    pub fn fee_label(&self) -> String {
        format!("{}%", self.fee() as f64 / 10_000.0)
    }
}

impl fmt::Display for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = format!("{:?}", self.id());
        match self {
            Pool::Bridge(_) => write!(f, "[{}/{} bridge]", self.token0(), self.token1()),
            _ => write!(
                f,
                "[{} {}/{} {} {}]",
                self.protocol(),
                self.token0(),
                self.token1(),
                self.fee_label(),
                &id[..10]
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(byte: u8, symbol: &str) -> Currency {
        Currency::new(1, Address::repeat_byte(byte), 18).with_symbol(symbol)
    }

    #[test]
    fn test_other_token() {
        let a = token(1, "A");
        let b = token(2, "B");
        let c = token(3, "C");
        let pool = Pool::V2(V2Pool {
            address: Address::repeat_byte(0x10),
            token0: a.clone(),
            token1: b.clone(),
        });

        assert!(pool.involves_token(&a));
        assert!(!pool.involves_token(&c));
        assert_eq!(pool.other_token(&a), Some(&b));
        assert_eq!(pool.other_token(&b), Some(&a));
        assert_eq!(pool.other_token(&c), None);
    }

    #[test]
    fn test_bridge_reports_v4() {
        let pool = Pool::Bridge(BridgePool {
            native: Currency::native(1),
            wrapped: token(0xc0, "WETH"),
        });
        assert_eq!(pool.protocol(), Protocol::V4);
        assert!(pool.is_bridge());
        assert_eq!(pool.fee(), 0);
        assert_eq!(pool.tick_spacing(), 0);
    }

    #[test]
    fn test_v4_pool_id_depends_on_key() {
        let base = V4Pool {
            token0: token(1, "A"),
            token1: token(2, "B"),
            fee: 500,
            tick_spacing: 10,
            hooks: Address::ZERO,
        };
        let mut hooked = base.clone();
        hooked.hooks = Address::repeat_byte(0x44);

        assert_ne!(base.pool_id(), hooked.pool_id());
        assert_eq!(base.pool_id(), base.clone().pool_id());
    }

    #[test]
    fn test_pool_deserializes_from_tagged_toml() {
        let raw = r#"
            protocol = "v3"
            address = "0x88e6A0c2dDD26FEEb64F039a2c41296FcB3f5640"
            fee = 500
            tick_spacing = 10
            token0 = { chain_id = 1, address = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", decimals = 6, symbol = "USDC" }
            token1 = { chain_id = 1, address = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2", decimals = 18, symbol = "WETH" }
        "#;
        let pool: Pool = toml::from_str(raw).unwrap();
        assert_eq!(pool.protocol(), Protocol::V3);
        assert_eq!(pool.fee(), 500);
        assert_eq!(pool.fee_label(), "0.05%");
    }
}
