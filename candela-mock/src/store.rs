use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use candela_core::{
    Asset, AssetId, CandelaError, Decision, KlineRow, KlineStore, Roster, RosterStore, Timeframe,
    WindowState,
};

type RowKey = (AssetId, Timeframe, DateTime<Utc>);

#[derive(Default)]
struct StoreState {
    tables: BTreeMap<String, BTreeMap<RowKey, KlineRow>>,
    roster: Roster,
    failing: BTreeSet<AssetId>,
}

/// In-memory kline and roster storage.
///
/// Rows are keyed by `(asset_id, timeframe, open_time)`; writing an existing
/// key is a no-op. Clones share the same underlying state.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add assets to the roster, replacing existing records with the same id.
    pub async fn seed_roster<I>(&self, assets: I)
    where
        I: IntoIterator<Item = Asset>,
    {
        let mut guard = self.state.lock().await;
        for a in assets {
            guard.roster.insert(a);
        }
    }

    /// Insert rows into `table` as-is.
    pub async fn seed_rows(&self, table: &str, rows: Vec<KlineRow>) {
        let mut guard = self.state.lock().await;
        let t = guard.tables.entry(table.to_string()).or_default();
        for row in rows {
            t.insert(row.key(), row);
        }
    }

    /// Make every roster update touching `asset_id` fail.
    pub async fn fail_upserts_for(&self, asset_id: impl Into<AssetId>) {
        self.state.lock().await.failing.insert(asset_id.into());
    }

    /// Snapshot of the roster.
    pub async fn roster(&self) -> Roster {
        self.state.lock().await.roster.clone()
    }

    /// Every row of `table`, in key order.
    pub async fn rows(&self, table: &str) -> Vec<KlineRow> {
        let guard = self.state.lock().await;
        guard
            .tables
            .get(table)
            .map(|t| t.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl KlineStore for InMemoryStore {
    async fn read_window_state(&self, table: &str) -> Result<WindowState, CandelaError> {
        let guard = self.state.lock().await;
        Ok(guard
            .tables
            .get(table)
            .map(|t| WindowState::from_rows(t.values()))
            .unwrap_or_default())
    }

    async fn write_rows(&self, table: &str, rows: &[KlineRow]) -> Result<usize, CandelaError> {
        let mut guard = self.state.lock().await;
        let t = guard.tables.entry(table.to_string()).or_default();
        let mut written = 0;
        for row in rows {
            if let std::collections::btree_map::Entry::Vacant(e) = t.entry(row.key()) {
                e.insert(row.clone());
                written += 1;
            }
        }
        Ok(written)
    }

    async fn delete_assets(&self, table: &str, assets: &[AssetId]) -> Result<usize, CandelaError> {
        let mut guard = self.state.lock().await;
        let Some(t) = guard.tables.get_mut(table) else {
            return Ok(0);
        };
        let before = t.len();
        t.retain(|(id, _, _), _| !assets.contains(id));
        Ok(before - t.len())
    }

    async fn prune_before(
        &self,
        table: &str,
        cutoffs: &BTreeMap<Timeframe, DateTime<Utc>>,
    ) -> Result<usize, CandelaError> {
        let mut guard = self.state.lock().await;
        let Some(t) = guard.tables.get_mut(table) else {
            return Ok(0);
        };
        let before = t.len();
        t.retain(|(_, tf, at), _| cutoffs.get(tf).is_none_or(|cutoff| at >= cutoff));
        Ok(before - t.len())
    }
}

#[async_trait]
impl RosterStore for InMemoryStore {
    async fn read_roster(&self) -> Result<Roster, CandelaError> {
        Ok(self.state.lock().await.roster.clone())
    }

    async fn upsert_roster(&self, decision: &Decision) -> Result<(), CandelaError> {
        let mut guard = self.state.lock().await;
        if guard.failing.contains(decision.asset_id()) {
            return Err(CandelaError::storage(format!(
                "forced failure: {} {}",
                decision.kind(),
                decision.asset_id()
            )));
        }
        guard.roster.apply(decision);
        Ok(())
    }
}
