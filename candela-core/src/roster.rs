//! The persisted set of tracked assets and the decisions that change it.

use std::collections::BTreeMap;

use candela_types::{Asset, AssetId, BaseConfig, MarketId, Status};
use serde::{Deserialize, Serialize};

use crate::registry::Registry;

/// One indivisible roster transition produced by admission planning.
///
/// A [`RosterStore`](crate::connector::RosterStore) applies each decision
/// atomically: either every table it touches is updated, or none is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Decision {
    /// Record a new asset owned by `market`.
    Insert {
        /// Candidate as listed by the market.
        asset: Asset,
        /// Owning market.
        market: MarketId,
    },
    /// Refresh name, symbol, website and status of a known asset and make
    /// `market` its main market.
    Reassign {
        /// Candidate as listed by the market.
        asset: Asset,
        /// New (or confirmed) owning market.
        market: MarketId,
    },
    /// Record that `market` lists the asset, leaving ownership untouched.
    Link {
        /// Asset seen on `market`.
        asset_id: AssetId,
        /// Market listing the asset.
        market: MarketId,
    },
    /// Keep the asset but set its status to `0`.
    Demote {
        /// Asset that overflowed a market's capacity.
        asset_id: AssetId,
    },
    /// Remove the asset, its market links and its type-specific attributes.
    Purge {
        /// Delisted asset.
        asset_id: AssetId,
    },
}

impl Decision {
    /// The asset this decision targets.
    #[must_use]
    pub fn asset_id(&self) -> &AssetId {
        match self {
            Self::Insert { asset, .. } | Self::Reassign { asset, .. } => &asset.asset_id,
            Self::Link { asset_id, .. } | Self::Demote { asset_id } | Self::Purge { asset_id } => {
                asset_id
            }
        }
    }

    /// Short label for logs and reports.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Insert { .. } => "insert",
            Self::Reassign { .. } => "reassign",
            Self::Link { .. } => "link",
            Self::Demote { .. } => "demote",
            Self::Purge { .. } => "purge",
        }
    }
}

/// Tracked assets keyed by canonical id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Roster(BTreeMap<AssetId, Asset>);

impl Roster {
    /// Empty roster.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Look up an asset.
    #[must_use]
    pub fn get(&self, id: &AssetId) -> Option<&Asset> {
        self.0.get(id)
    }

    /// True when `id` is tracked.
    #[must_use]
    pub fn contains(&self, id: &AssetId) -> bool {
        self.0.contains_key(id)
    }

    /// Insert or replace a record.
    pub fn insert(&mut self, asset: Asset) -> Option<Asset> {
        self.0.insert(asset.asset_id.clone(), asset)
    }

    /// Remove a record.
    pub fn remove(&mut self, id: &AssetId) -> Option<Asset> {
        self.0.remove(id)
    }

    /// Records in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Asset> {
        self.0.values()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no asset is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Group the roster by asset type and main market.
    ///
    /// Assets without a main market, or whose pair is not part of `base`, are
    /// left out (the latter with a warning).
    #[must_use]
    pub fn to_registry(&self, base: &BaseConfig) -> Registry<Asset> {
        let mut reg = Registry::from_base(base);
        for asset in self.0.values() {
            if let Some(market) = &asset.main_market {
                reg.add_item(&asset.type_id, market, asset.clone());
            }
        }
        reg
    }

    /// Apply one decision in memory. Decisions about unknown assets (other
    /// than inserts) are ignored.
    pub fn apply(&mut self, decision: &Decision) {
        match decision {
            Decision::Insert { asset, market } => {
                let mut record = asset.clone();
                record.main_market = Some(market.clone());
                record.market_ids.insert(market.clone());
                self.0.insert(record.asset_id.clone(), record);
            }
            Decision::Reassign { asset, market } => {
                let Some(record) = self.0.get_mut(&asset.asset_id) else {
                    return;
                };
                record.symbol.clone_from(&asset.symbol);
                record.name.clone_from(&asset.name);
                record.website.clone_from(&asset.website);
                record.status = asset.status;
                record.main_market = Some(market.clone());
                record.market_ids.insert(market.clone());
                record
                    .attributes
                    .extend(asset.attributes.iter().map(|(k, v)| (k.clone(), v.clone())));
                if asset.updated_at.is_some() {
                    record.updated_at = asset.updated_at;
                }
            }
            Decision::Link { asset_id, market } => {
                if let Some(record) = self.0.get_mut(asset_id) {
                    record.market_ids.insert(market.clone());
                }
            }
            Decision::Demote { asset_id } => {
                if let Some(record) = self.0.get_mut(asset_id) {
                    record.status = Status::INACTIVE;
                }
            }
            Decision::Purge { asset_id } => {
                self.0.remove(asset_id);
            }
        }
    }
}

impl FromIterator<Asset> for Roster {
    fn from_iter<I: IntoIterator<Item = Asset>>(iter: I) -> Self {
        Self(iter.into_iter().map(|a| (a.asset_id.clone(), a)).collect())
    }
}
