//! Route - an ordered, cycle-free pool path from currency in to currency out

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

use crate::cartographer::{Currency, Pool, Protocol};

/// Protocol tag of a whole route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteProtocol {
    V2,
    V3,
    V4,
    Mixed,
}

impl From<Protocol> for RouteProtocol {
    fn from(protocol: Protocol) -> Self {
        match protocol {
            Protocol::V2 => RouteProtocol::V2,
            Protocol::V3 => RouteProtocol::V3,
            Protocol::V4 => RouteProtocol::V4,
        }
    }
}

impl fmt::Display for RouteProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteProtocol::V2 => write!(f, "V2"),
            RouteProtocol::V3 => write!(f, "V3"),
            RouteProtocol::V4 => write!(f, "V4"),
            RouteProtocol::Mixed => write!(f, "MIXED"),
        }
    }
}

impl std::str::FromStr for RouteProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "v2" => Ok(RouteProtocol::V2),
            "v3" => Ok(RouteProtocol::V3),
            "v4" => Ok(RouteProtocol::V4),
            "mixed" => Ok(RouteProtocol::Mixed),
            other => Err(format!("unknown route protocol '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Route {
    pub protocol: RouteProtocol,
    pub pools: Vec<Pool>,
    pub input: Currency,
    pub output: Currency,
}

impl Route {
    pub fn new(protocol: RouteProtocol, pools: Vec<Pool>, input: Currency, output: Currency) -> Self {
        Self { protocol, pools, input, output }
    }

    pub fn hop_count(&self) -> usize {
        self.pools.len()
    }

    pub fn contains_bridge(&self) -> bool {
        self.pools.iter().any(Pool::is_bridge)
    }

    /// Distinct pool protocols, in first-seen order
    pub fn protocols(&self) -> Vec<Protocol> {
        let mut seen = Vec::new();
        for protocol in self.pools.iter().map(Pool::protocol) {
            if !seen.contains(&protocol) {
                seen.push(protocol);
            }
        }
        seen
    }

    pub fn is_single_protocol(&self) -> bool {
        self.protocols().len() <= 1
    }

    /// Currencies visited walking the pools from `input`.
    /// Stops early if a pool does not connect to the running token.
    pub fn token_path(&self) -> Vec<Currency> {
        let mut path = Vec::with_capacity(self.pools.len() + 1);
        let mut current = self.input.clone();
        path.push(current.clone());

        for pool in &self.pools {
            match pool.other_token(&current) {
                Some(next) => {
                    current = next.clone();
                    path.push(current.clone());
                }
                None => break,
            }
        }

        path
    }

    /// Structural validation
    /// - Every pool must connect to the previous hop's output
    /// - First pool involves `input`, last pool involves `output`
    /// - No token visited twice
    /// - Mixed routes must span more than one protocol
    pub fn is_valid(&self) -> bool {
        let (Some(first), Some(last)) = (self.pools.first(), self.pools.last()) else {
            return false;
        };

        if !first.involves_token(&self.input) || !last.involves_token(&self.output) {
            return false;
        }

        let path = self.token_path();
        if path.len() != self.pools.len() + 1 {
            debug!("Route has a disconnected hop - invalid");
            return false;
        }

        let unique: HashSet<_> = path.iter().collect();
        if unique.len() != path.len() {
            debug!("Route visits a token twice - invalid");
            return false;
        }

        if self.protocol == RouteProtocol::Mixed && self.is_single_protocol() {
            debug!("Mixed route uses a single protocol - invalid");
            return false;
        }

        true
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self.token_path();
        write!(f, "[{}] {}", self.protocol, self.input)?;
        for (pool, token) in self.pools.iter().zip(path.iter().skip(1)) {
            match pool {
                Pool::Bridge(_) => write!(f, " -- wrap --> {}", token)?,
                _ => write!(f, " -- {} {} --> {}", pool.protocol(), pool.fee_label(), token)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartographer::{V2Pool, V3Pool};
    use alloy_primitives::Address;

    fn token(byte: u8, symbol: &str) -> Currency {
        Currency::new(1, Address::repeat_byte(byte), 18).with_symbol(symbol)
    }

    fn v3(byte: u8, a: &Currency, b: &Currency) -> Pool {
        Pool::V3(V3Pool {
            address: Address::repeat_byte(byte),
            token0: a.clone(),
            token1: b.clone(),
            fee: 500,
            tick_spacing: 10,
        })
    }

    fn v2(byte: u8, a: &Currency, b: &Currency) -> Pool {
        Pool::V2(V2Pool {
            address: Address::repeat_byte(byte),
            token0: a.clone(),
            token1: b.clone(),
        })
    }

    #[test]
    fn test_route_validation() {
        let (a, b, c) = (token(1, "A"), token(2, "B"), token(3, "C"));

        // Valid: A -> B -> C, pool orientation does not matter
        let valid = Route::new(
            RouteProtocol::V3,
            vec![v3(10, &b, &a), v3(11, &b, &c)],
            a.clone(),
            c.clone(),
        );
        assert!(valid.is_valid());
        assert_eq!(valid.token_path(), vec![a.clone(), b.clone(), c.clone()]);

        // Invalid: A -> B -> A -> C revisits A
        let cyclic = Route::new(
            RouteProtocol::V3,
            vec![v3(10, &a, &b), v3(12, &b, &a), v3(13, &a, &c)],
            a.clone(),
            c.clone(),
        );
        assert!(!cyclic.is_valid());

        // Invalid: second pool does not touch B
        let broken = Route::new(
            RouteProtocol::V3,
            vec![v3(10, &a, &b), v3(14, &a, &c)],
            a.clone(),
            c.clone(),
        );
        assert!(!broken.is_valid());
    }

    #[test]
    fn test_mixed_route_requires_two_protocols() {
        let (a, b, c) = (token(1, "A"), token(2, "B"), token(3, "C"));

        let single = Route::new(
            RouteProtocol::Mixed,
            vec![v2(10, &a, &b), v2(11, &b, &c)],
            a.clone(),
            c.clone(),
        );
        assert!(!single.is_valid());

        let mixed = Route::new(
            RouteProtocol::Mixed,
            vec![v2(10, &a, &b), v3(11, &b, &c)],
            a.clone(),
            c.clone(),
        );
        assert!(mixed.is_valid());
        assert_eq!(mixed.protocols(), vec![Protocol::V2, Protocol::V3]);
    }

    #[test]
    fn test_display() {
        let (a, b) = (token(1, "A"), token(2, "B"));
        let route = Route::new(RouteProtocol::V3, vec![v3(10, &a, &b)], a, b);
        assert_eq!(route.to_string(), "[V3] A -- V3 0.05% --> B");
    }

    #[test]
    fn test_parse_route_protocol() {
        assert_eq!("Mixed".parse::<RouteProtocol>().unwrap(), RouteProtocol::Mixed);
        assert!("v5".parse::<RouteProtocol>().is_err());
    }
}
