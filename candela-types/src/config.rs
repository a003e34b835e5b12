//! Configuration types shared across the orchestrator and its collaborators.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ids::{AssetTypeId, MarketId};
use crate::timeframe::Timeframe;

/// Static description of one asset type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetTypeSpec {
    /// Identifier used as the first registry key.
    pub id: AssetTypeId,
    /// Human-readable name (e.g. "Crypto").
    pub name: String,
    /// Markets eligible to own assets of this type, most authoritative first.
    pub referent_markets: Vec<MarketId>,
    /// Timeframes tracked for this asset type.
    #[serde(default = "default_timeframes")]
    pub timeframes: Vec<Timeframe>,
}

fn default_timeframes() -> Vec<Timeframe> {
    Timeframe::ALL.to_vec()
}

impl AssetTypeSpec {
    /// Build a spec tracking every supported timeframe.
    pub fn new(
        id: impl Into<AssetTypeId>,
        name: impl Into<String>,
        referent_markets: &[&str],
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            referent_markets: referent_markets.iter().map(|m| MarketId::from(*m)).collect(),
            timeframes: default_timeframes(),
        }
    }

    /// Builder-style timeframe restriction.
    #[must_use]
    pub fn with_timeframes(mut self, timeframes: &[Timeframe]) -> Self {
        self.timeframes = timeframes.to_vec();
        self
    }

    /// Position of `market` in the referent priority list (lower is preferred).
    #[must_use]
    pub fn referent_rank(&self, market: &MarketId) -> Option<usize> {
        self.referent_markets.iter().position(|m| m == market)
    }

    /// True when `timeframe` is tracked for this asset type.
    #[must_use]
    pub fn supports(&self, timeframe: Timeframe) -> bool {
        self.timeframes.contains(&timeframe)
    }
}

/// The base configuration: asset types and their referent markets.
///
/// Its `(asset type, referent market)` pairs define the keys every registry
/// built for a round may use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseConfig {
    /// Configured asset types, in declaration order.
    pub asset_types: Vec<AssetTypeSpec>,
}

impl BaseConfig {
    /// Build from a list of asset type specs.
    #[must_use]
    pub const fn new(asset_types: Vec<AssetTypeSpec>) -> Self {
        Self { asset_types }
    }

    /// Look up an asset type by id.
    #[must_use]
    pub fn asset_type(&self, id: &AssetTypeId) -> Option<&AssetTypeSpec> {
        self.asset_types.iter().find(|t| &t.id == id)
    }

    /// Every market referenced by at least one asset type, first occurrence order.
    #[must_use]
    pub fn markets(&self) -> Vec<MarketId> {
        let mut out: Vec<MarketId> = Vec::new();
        for t in &self.asset_types {
            for m in &t.referent_markets {
                if !out.contains(m) {
                    out.push(m.clone());
                }
            }
        }
        out
    }

    /// Restrict every asset type to the given markets, dropping types left
    /// without a referent market. Returns the ids of dropped types.
    pub fn retain_markets(&mut self, markets: &[MarketId]) -> Vec<AssetTypeId> {
        let mut dropped = Vec::new();
        for t in &mut self.asset_types {
            let mut kept: Vec<MarketId> = Vec::new();
            for m in &t.referent_markets {
                if markets.contains(m) && !kept.contains(m) {
                    kept.push(m.clone());
                }
            }
            t.referent_markets = kept;
            if t.referent_markets.is_empty() {
                dropped.push(t.id.clone());
            }
        }
        self.asset_types.retain(|t| !t.referent_markets.is_empty());
        dropped
    }
}

/// Global configuration for the `Candela` orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandelaConfig {
    /// Asset types and referent markets.
    pub base: BaseConfig,
    /// Default maximum number of actively tracked assets per market and asset type.
    pub capacity: usize,
    /// Per-market overrides of `capacity`.
    #[serde(default)]
    pub market_capacity: BTreeMap<MarketId, usize>,
    /// Number of periods a catch-up round keeps per timeframe.
    pub kline_count: usize,
    /// Timeout for each individual market call.
    pub market_timeout: Duration,
    /// Optional overall deadline for one fan-out across markets.
    pub request_timeout: Option<Duration>,
    /// Name of the kline table the rounds read and write.
    pub table: String,
}

impl CandelaConfig {
    /// Capacity `N` for `market`.
    #[must_use]
    pub fn capacity_for(&self, market: &MarketId) -> usize {
        self.market_capacity
            .get(market)
            .copied()
            .unwrap_or(self.capacity)
    }
}

impl Default for CandelaConfig {
    fn default() -> Self {
        Self {
            base: BaseConfig::default(),
            capacity: 10,
            market_capacity: BTreeMap::new(),
            kline_count: 200,
            market_timeout: Duration::from_secs(5),
            request_timeout: None,
            table: "LiveData".to_string(),
        }
    }
}
