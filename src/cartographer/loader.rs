//! Pool list loading
//!
//! Pool discovery lives outside this crate; the CLI reads the discovered set
//! from a TOML file of `[[pools]]` tables.

use eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use super::{Pool, Protocol};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolList {
    #[serde(default)]
    pub pools: Vec<Pool>,
}

impl PoolList {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| eyre!("Failed to read pool list {:?}: {}", path.as_ref(), e))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let list: Self = toml::from_str(content)?;

        let v2 = list.count(Protocol::V2);
        let v3 = list.count(Protocol::V3);
        let v4 = list.count(Protocol::V4);
        info!("Loaded {} pools (V2: {}, V3: {}, V4: {})", list.pools.len(), v2, v3, v4);

        for pool in list.pools.iter().filter(|p| p.token0().chain_id != p.token1().chain_id) {
            debug!("Pool {} mixes chains", pool);
        }

        Ok(list)
    }

    fn count(&self, protocol: Protocol) -> usize {
        self.pools
            .iter()
            .filter(|p| p.protocol() == protocol && !p.is_bridge())
            .count()
    }
}
