use async_trait::async_trait;
use candela_core::{
    AssetTypeId, CandelaError, KlineBatch, Listing, MarketConnector,
};

mod dynamic;
pub mod fixtures;
mod store;

pub use dynamic::{DynamicMockMarket, MockBehavior, MockMarketController};
pub use store::InMemoryStore;

/// Mock market for CI-safe examples. Provides deterministic data from static fixtures.
///
/// Two names trigger special behavior:
/// - `"fail"`: every call fails;
/// - `"slow"`: every call sleeps 200 ms first, so a tight market timeout fires.
pub struct MockMarket {
    name: &'static str,
}

impl Default for MockMarket {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMarket {
    /// A market named `candela-mock`.
    #[must_use]
    pub const fn new() -> Self {
        Self::named("candela-mock")
    }

    /// A market with the given name; see the type docs for special names.
    #[must_use]
    pub const fn named(name: &'static str) -> Self {
        Self { name }
    }

    async fn maybe_fail_or_delay(&self, capability: &'static str) -> Result<(), CandelaError> {
        match self.name {
            "fail" => Err(CandelaError::market(
                self.name,
                format!("forced failure: {capability}"),
            )),
            "slow" => {
                tokio::time::sleep(std::time::Duration::from_millis(200)).await;
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl MarketConnector for MockMarket {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn list_active_assets(
        &self,
        asset_types: &[AssetTypeId],
    ) -> Result<Listing, CandelaError> {
        self.maybe_fail_or_delay("active-assets").await?;
        Ok(asset_types
            .iter()
            .map(|t| (t.clone(), fixtures::listings::by_market(self.name, t)))
            .collect())
    }

    async fn fetch_klines(&self, mut batch: KlineBatch) -> Result<KlineBatch, CandelaError> {
        self.maybe_fail_or_delay("klines").await?;
        for task in batch.values_mut().flatten() {
            fixtures::klines::fill(task);
        }
        Ok(batch)
    }
}
