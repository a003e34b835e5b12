//! Report envelopes produced by orchestrator rounds.

use serde::{Deserialize, Serialize};

use crate::error::CandelaError;
use crate::ids::{AssetId, AssetTypeId, MarketId};

/// Admission outcome for one `(asset type, market)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketAdmission {
    /// Asset type the candidates belong to.
    pub asset_type: AssetTypeId,
    /// Market that listed the candidates.
    pub market: MarketId,
    /// Assets kept in the top-N, best first.
    pub admitted: Vec<AssetId>,
    /// Ranked assets that overflowed the capacity.
    pub demoted: Vec<AssetId>,
    /// Assets reported as delisted.
    pub purged: Vec<AssetId>,
}

/// Summary of an asset update round.
///
/// `warnings` collects market failures and per-asset admission failures; they
/// never abort the round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionReport {
    /// Per-market ranking outcomes.
    pub markets: Vec<MarketAdmission>,
    /// Number of decisions persisted successfully.
    pub applied: usize,
    /// Non-fatal issues encountered while building the report.
    pub warnings: Vec<CandelaError>,
}

impl AdmissionReport {
    /// Outcome for one `(asset type, market)` pair, if ranked this round.
    #[must_use]
    pub fn market(&self, asset_type: &AssetTypeId, market: &MarketId) -> Option<&MarketAdmission> {
        self.markets
            .iter()
            .find(|m| &m.asset_type == asset_type && &m.market == market)
    }
}

/// Summary of a kline synchronisation round (catch-up or refresh).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Number of `(asset, timeframe)` fetch windows planned.
    pub planned: usize,
    /// Number of klines returned by markets.
    pub fetched: usize,
    /// Number of rows newly inserted (duplicates excluded).
    pub written: usize,
    /// Assets whose stored rows were deleted because they left the roster.
    pub stale_assets: Vec<AssetId>,
    /// Rows removed because they fell behind the retention window.
    pub pruned: usize,
    /// Non-fatal issues encountered while building the report.
    pub warnings: Vec<CandelaError>,
}
