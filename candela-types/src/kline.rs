//! OHLCV rows and per-asset fetch tasks.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::asset::Asset;
use crate::ids::AssetId;
use crate::timeframe::{TimeWindow, Timeframe};

/// One raw OHLCV candle as returned by a market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kline {
    /// Candle open instant (UTC, whole seconds).
    pub open_time: DateTime<Utc>,
    /// Open price.
    pub open: Decimal,
    /// High price.
    pub high: Decimal,
    /// Low price.
    pub low: Decimal,
    /// Close price.
    pub close: Decimal,
    /// Traded base volume.
    pub volume: Decimal,
}

/// A kline ready for storage, keyed by `(asset_id, timeframe, open_time)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KlineRow {
    /// Canonical asset identifier.
    pub asset_id: AssetId,
    /// Candle period.
    pub timeframe: Timeframe,
    /// The candle itself.
    pub kline: Kline,
}

impl KlineRow {
    /// Storage primary key of this row.
    #[must_use]
    pub fn key(&self) -> (AssetId, Timeframe, DateTime<Utc>) {
        (self.asset_id.clone(), self.timeframe, self.kline.open_time)
    }
}

/// Fetch window for one timeframe and, once fetched, the klines inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KlineSlot {
    /// Range the market is asked for.
    pub window: TimeWindow,
    /// Rows returned by the market (empty until fetched).
    #[serde(default)]
    pub klines: Vec<Kline>,
}

impl KlineSlot {
    /// An unfetched slot for `window`.
    #[must_use]
    pub const fn new(window: TimeWindow) -> Self {
        Self {
            window,
            klines: Vec::new(),
        }
    }
}

/// Unit of kline work for one asset: which windows to fetch per timeframe.
///
/// A market collaborator receives tasks with empty slots and returns the same
/// tasks with `klines` populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KlineTask {
    /// The asset to fetch.
    pub asset: Asset,
    /// Per-timeframe fetch slots.
    pub slots: BTreeMap<Timeframe, KlineSlot>,
}

impl KlineTask {
    /// A task with no slot yet.
    #[must_use]
    pub const fn new(asset: Asset) -> Self {
        Self {
            asset,
            slots: BTreeMap::new(),
        }
    }

    /// True when no timeframe needs fetching.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Drop fetched klines that do not belong in their slot: outside the
    /// slot's window, not opening on a period boundary, or with `low > high`.
    ///
    /// Returns the number of klines dropped per timeframe, omitting
    /// timeframes where nothing was dropped.
    pub fn discard_invalid(&mut self) -> BTreeMap<Timeframe, usize> {
        let mut dropped = BTreeMap::new();
        for (tf, slot) in &mut self.slots {
            let window = slot.window;
            let before = slot.klines.len();
            slot.klines.retain(|k| {
                window.contains(k.open_time) && tf.is_boundary(k.open_time) && k.low <= k.high
            });
            let n = before - slot.klines.len();
            if n > 0 {
                dropped.insert(*tf, n);
            }
        }
        dropped
    }

    /// Flatten the fetched klines into storage rows.
    #[must_use]
    pub fn rows(&self) -> Vec<KlineRow> {
        self.slots
            .iter()
            .flat_map(|(tf, slot)| {
                slot.klines.iter().map(|k| KlineRow {
                    asset_id: self.asset.asset_id.clone(),
                    timeframe: *tf,
                    kline: k.clone(),
                })
            })
            .collect()
    }
}
