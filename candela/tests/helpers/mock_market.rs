#![allow(dead_code)]
#![allow(clippy::type_complexity)]

use std::sync::Arc;

use async_trait::async_trait;
use candela::{AssetTypeId, CandelaError, KlineBatch, Listing, MarketConnector};
use tokio::sync::Mutex;
use tokio::time::{Duration, sleep};

/// Simple in-memory market used by integration tests.
/// You can tailor behavior (availability, listing, failures, latency) via the fields below.
pub struct MockMarket {
    pub name: &'static str,
    pub available: bool,
    pub listing: Option<Listing>,
    pub delay_ms: u64,
    /// Fail every listing and kline call with this message.
    pub fail: Option<&'static str>,
    /// Fail kline calls only.
    pub klines_fail: Option<&'static str>,

    // Optional closures to customize behavior per test
    pub listing_fn:
        Option<Arc<dyn Fn(&[AssetTypeId]) -> Result<Listing, CandelaError> + Send + Sync>>,
    pub klines_fn: Option<Arc<dyn Fn(KlineBatch) -> Result<KlineBatch, CandelaError> + Send + Sync>>,

    /// Batches received by `fetch_klines`, in call order.
    pub kline_calls: Arc<Mutex<Vec<KlineBatch>>>,
}

impl Default for MockMarket {
    fn default() -> Self {
        Self {
            name: "default_mock",
            available: true,
            listing: None,
            delay_ms: 0,
            fail: None,
            klines_fail: None,
            listing_fn: None,
            klines_fn: None,
            kline_calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl MockMarket {
    async fn delay(&self) {
        if self.delay_ms > 0 {
            sleep(Duration::from_millis(self.delay_ms)).await;
        }
    }

    fn forced(&self, msg: Option<&'static str>) -> Result<(), CandelaError> {
        match msg {
            Some(msg) => Err(CandelaError::market(self.name, msg)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MarketConnector for MockMarket {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    async fn list_active_assets(
        &self,
        asset_types: &[AssetTypeId],
    ) -> Result<Listing, CandelaError> {
        self.delay().await;
        self.forced(self.fail)?;
        if let Some(f) = &self.listing_fn {
            return f(asset_types);
        }
        let mut listing = self.listing.clone().unwrap_or_default();
        listing.retain(|t, _| asset_types.contains(t));
        Ok(listing)
    }

    async fn fetch_klines(&self, mut batch: KlineBatch) -> Result<KlineBatch, CandelaError> {
        self.kline_calls.lock().await.push(batch.clone());
        self.delay().await;
        self.forced(self.fail)?;
        self.forced(self.klines_fail)?;
        if let Some(f) = &self.klines_fn {
            return f(batch);
        }
        for task in batch.values_mut().flatten() {
            candela_mock::fixtures::klines::fill(task);
        }
        Ok(batch)
    }
}
