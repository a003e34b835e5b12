use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use candela_types::{
    Asset, AssetId, AssetTypeId, CandelaError, KlineRow, KlineTask, MarketId, Timeframe,
};

use crate::roster::{Decision, Roster};
use crate::window::state::WindowState;

/// Assets listed by one market, per asset type.
pub type Listing = BTreeMap<AssetTypeId, Vec<Asset>>;

/// Kline tasks addressed to one market, per asset type.
pub type KlineBatch = BTreeMap<AssetTypeId, Vec<KlineTask>>;

/// A market data source: lists tradable assets and serves klines.
///
/// Implementations talk to the network; the orchestrator bounds every call
/// with its configured timeout and never retries.
#[async_trait]
pub trait MarketConnector: Send + Sync {
    /// A stable identifier, matching the market ids used in the base configuration.
    fn name(&self) -> &'static str;

    /// Canonical market key constructed from the static name.
    fn key(&self) -> MarketId {
        MarketId::new(self.name())
    }

    /// Whether the market API currently answers.
    ///
    /// Default: always available.
    async fn is_available(&self) -> bool {
        true
    }

    /// List the active assets of the requested asset types, with their ranking
    /// status already computed.
    ///
    /// Asset types the market does not serve may be omitted from the result;
    /// an omitted type is treated like an unanswered call and delists nothing.
    /// Returning the type with an empty list means the market lists none.
    async fn list_active_assets(
        &self,
        asset_types: &[AssetTypeId],
    ) -> Result<Listing, CandelaError>;

    /// Fill the kline slots of every task.
    ///
    /// Returns the same tasks with `klines` populated; tasks or slots the market
    /// could not serve may be returned empty or omitted.
    async fn fetch_klines(&self, batch: KlineBatch) -> Result<KlineBatch, CandelaError>;
}

/// Storage of kline rows, keyed by `(asset_id, timeframe, open_time)`.
#[async_trait]
pub trait KlineStore: Send + Sync {
    /// Observed extent of every stored `(asset, timeframe)` pair in `table`.
    async fn read_window_state(&self, table: &str) -> Result<WindowState, CandelaError>;

    /// Insert `rows`, ignoring keys that already exist. Returns the number of
    /// rows actually inserted.
    async fn write_rows(&self, table: &str, rows: &[KlineRow]) -> Result<usize, CandelaError>;

    /// Delete every row of the given assets. Returns the number of rows removed.
    async fn delete_assets(&self, table: &str, assets: &[AssetId]) -> Result<usize, CandelaError>;

    /// Delete rows whose `open_time` is before the cutoff of their timeframe.
    /// Timeframes without a cutoff are untouched.
    async fn prune_before(
        &self,
        table: &str,
        cutoffs: &BTreeMap<Timeframe, DateTime<Utc>>,
    ) -> Result<usize, CandelaError>;
}

/// Storage of the asset roster.
#[async_trait]
pub trait RosterStore: Send + Sync {
    /// Every tracked asset.
    async fn read_roster(&self) -> Result<Roster, CandelaError>;

    /// Apply one decision as a single atomic unit.
    async fn upsert_roster(&self, decision: &Decision) -> Result<(), CandelaError>;
}
