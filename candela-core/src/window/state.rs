use std::collections::BTreeMap;

use candela_types::{AssetId, KlineRow, TimeWindow, Timeframe};
use serde::{Deserialize, Serialize};

/// Observed `[oldest, latest]` extent per asset and timeframe.
///
/// An asset missing from the state has never been seen for any timeframe.
/// Entries only change after rows were durably written, either by
/// re-reading the store ([`WindowState::from_rows`]) or by recording the rows
/// that were just written ([`WindowState::record_rows`]).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowState(BTreeMap<AssetId, BTreeMap<Timeframe, TimeWindow>>);

impl WindowState {
    /// Empty state: every asset unobserved.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Build the state from stored rows: min/max `open_time` per asset and timeframe.
    pub fn from_rows<'a, R>(rows: R) -> Self
    where
        R: IntoIterator<Item = &'a KlineRow>,
    {
        let mut state = Self::new();
        state.record_rows(rows);
        state
    }

    /// Widen the observed extents to include `rows`.
    pub fn record_rows<'a, R>(&mut self, rows: R)
    where
        R: IntoIterator<Item = &'a KlineRow>,
    {
        for row in rows {
            let at = TimeWindow::instant(row.kline.open_time);
            let slot = self.0.entry(row.asset_id.clone()).or_default();
            slot.entry(row.timeframe)
                .and_modify(|w| *w = w.union(&at))
                .or_insert(at);
        }
    }

    /// Observed extent for `(asset, timeframe)`, if any.
    #[must_use]
    pub fn get(&self, asset: &AssetId, timeframe: Timeframe) -> Option<&TimeWindow> {
        self.0.get(asset).and_then(|m| m.get(&timeframe))
    }

    /// Overwrite the observed extent for `(asset, timeframe)`.
    pub fn observe(&mut self, asset: AssetId, timeframe: Timeframe, window: TimeWindow) {
        self.0.entry(asset).or_default().insert(timeframe, window);
    }

    /// Forget every timeframe of `asset`.
    pub fn remove_asset(&mut self, asset: &AssetId) -> bool {
        self.0.remove(asset).is_some()
    }

    /// Forget one `(asset, timeframe)` pair; drops the asset once it has none left.
    pub fn remove_timeframe(&mut self, asset: &AssetId, timeframe: Timeframe) -> bool {
        let Some(slot) = self.0.get_mut(asset) else {
            return false;
        };
        let removed = slot.remove(&timeframe).is_some();
        if slot.is_empty() {
            self.0.remove(asset);
        }
        removed
    }

    /// True when at least one timeframe of `asset` has been observed.
    #[must_use]
    pub fn contains_asset(&self, asset: &AssetId) -> bool {
        self.0.contains_key(asset)
    }

    /// Observed assets in id order.
    pub fn assets(&self) -> impl Iterator<Item = &AssetId> {
        self.0.keys()
    }

    /// Observed timeframes of one asset.
    #[must_use]
    pub fn timeframes(&self, asset: &AssetId) -> Option<&BTreeMap<Timeframe, TimeWindow>> {
        self.0.get(asset)
    }

    /// Number of observed assets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when nothing has been observed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
