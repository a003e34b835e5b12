//! Tracked assets and their ranking status.

use core::fmt;
use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AssetId, AssetTypeId, MarketId};

/// Composite ranking signal carried by an asset.
///
/// - `-1`: confirmed delisted by the market;
/// - `0`: tracked but currently deprioritized;
/// - `> 0`: ranking score, higher is more interesting.
///
/// Values below `-1` carry no meaning and are ignored by admission.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Status(i32);

impl Status {
    /// Confirmed delisted by the market.
    pub const DELISTED: Self = Self(-1);
    /// Retained but not actively ranked.
    pub const INACTIVE: Self = Self(0);

    /// Wrap a raw status value.
    #[must_use]
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    /// Raw value.
    #[must_use]
    pub const fn value(self) -> i32 {
        self.0
    }

    /// `status == -1`.
    #[must_use]
    pub const fn is_delisted(self) -> bool {
        self.0 == -1
    }

    /// `status >= 0`: eligible for ranking.
    #[must_use]
    pub const fn is_ranked(self) -> bool {
        self.0 >= 0
    }

    /// `status < -1`: no defined meaning.
    #[must_use]
    pub const fn is_invalid(self) -> bool {
        self.0 < -1
    }
}

impl From<i32> for Status {
    fn from(v: i32) -> Self {
        Self(v)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A tradable instrument as seen by one market or as recorded in the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Canonical identifier, stable across markets.
    pub asset_id: AssetId,
    /// Market-specific ticker (casing/format may differ per market).
    pub symbol: String,
    /// Asset type this asset belongs to.
    pub type_id: AssetTypeId,
    /// Human-readable name.
    pub name: Option<String>,
    /// Issuer or project website.
    pub website: Option<String>,
    /// Canonical owning market, when recorded.
    pub main_market: Option<MarketId>,
    /// Markets the asset has been seen trading on.
    #[serde(default)]
    pub market_ids: BTreeSet<MarketId>,
    /// Ranking status.
    #[serde(default)]
    pub status: Status,
    /// Type-specific attributes (e.g. `base_asset`/`quote_asset` for a crypto pair).
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Last time the roster record changed.
    pub updated_at: Option<DateTime<Utc>>,
}

impl Asset {
    /// Minimal asset with the given identity, no owner and status `0`.
    pub fn new(
        asset_id: impl Into<AssetId>,
        symbol: impl Into<String>,
        type_id: impl Into<AssetTypeId>,
    ) -> Self {
        Self {
            asset_id: asset_id.into(),
            symbol: symbol.into(),
            type_id: type_id.into(),
            name: None,
            website: None,
            main_market: None,
            market_ids: BTreeSet::new(),
            status: Status::INACTIVE,
            attributes: BTreeMap::new(),
            updated_at: None,
        }
    }

    /// Builder-style status setter.
    #[must_use]
    pub const fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    /// Builder-style main market setter.
    #[must_use]
    pub fn with_main_market(mut self, market: impl Into<MarketId>) -> Self {
        let market = market.into();
        self.market_ids.insert(market.clone());
        self.main_market = Some(market);
        self
    }

    /// Builder-style name setter.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builder-style attribute setter.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}
