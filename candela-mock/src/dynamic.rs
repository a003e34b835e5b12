use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use candela_core::{AssetTypeId, CandelaError, Kline, KlineBatch, Listing, MarketConnector};

use crate::fixtures;

/// Instruction for how a method should behave.
#[derive(Clone)]
pub enum MockBehavior<T> {
    /// Return the provided value immediately.
    Return(T),
    /// Fail immediately with the provided error.
    Fail(CandelaError),
    /// Hang indefinitely (simulate a timeout).
    Hang,
}

#[derive(Default)]
struct InternalState {
    availability: Option<MockBehavior<bool>>,
    listing: Option<MockBehavior<Listing>>,
    klines: Option<MockBehavior<Vec<Kline>>>,
    listing_requests: Vec<Vec<AssetTypeId>>,
    kline_requests: Vec<KlineBatch>,
}

/// Controller handle used by tests to drive the dynamic mock from the outside.
pub struct MockMarketController {
    state: Arc<Mutex<InternalState>>,
}

impl MockMarketController {
    /// Set the behavior of `is_available`. `Fail` reports the market as down.
    pub async fn set_availability(&self, behavior: MockBehavior<bool>) {
        self.state.lock().await.availability = Some(behavior);
    }

    /// Set the behavior of `list_active_assets`.
    ///
    /// `Return` answers with the given listing restricted to the requested
    /// asset types.
    pub async fn set_listing_behavior(&self, behavior: MockBehavior<Listing>) {
        self.state.lock().await.listing = Some(behavior);
    }

    /// Set the behavior of `fetch_klines`.
    ///
    /// `Return` fills each slot with the given klines that fall inside its
    /// window. Without a rule, slots are filled with synthetic candles.
    pub async fn set_klines_behavior(&self, behavior: MockBehavior<Vec<Kline>>) {
        self.state.lock().await.klines = Some(behavior);
    }

    /// Asset types requested by each `list_active_assets` call, in call order.
    pub async fn listing_requests(&self) -> Vec<Vec<AssetTypeId>> {
        self.state.lock().await.listing_requests.clone()
    }

    /// Batches received by each `fetch_klines` call, in call order.
    pub async fn kline_requests(&self) -> Vec<KlineBatch> {
        self.state.lock().await.kline_requests.clone()
    }

    /// Clear all configured behaviors and request logs.
    pub async fn clear_all_behaviors(&self) {
        let mut guard = self.state.lock().await;
        *guard = InternalState::default();
    }
}

/// A market that defers all behavior to an external controller.
pub struct DynamicMockMarket {
    name: &'static str,
    state: Arc<Mutex<InternalState>>,
}

impl DynamicMockMarket {
    /// Create a new dynamic mock market and its controller.
    #[must_use]
    pub fn new_with_controller(
        name: &'static str,
    ) -> (Arc<dyn MarketConnector>, MockMarketController) {
        let state = Arc::new(Mutex::new(InternalState::default()));
        let controller = MockMarketController {
            state: Arc::clone(&state),
        };
        let me = Arc::new(Self { name, state });
        (me as Arc<dyn MarketConnector>, controller)
    }
}

#[async_trait]
impl MarketConnector for DynamicMockMarket {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn is_available(&self) -> bool {
        let behavior = self.state.lock().await.availability.clone();
        match behavior {
            None => true,
            Some(MockBehavior::Return(up)) => up,
            Some(MockBehavior::Fail(_)) => false,
            Some(MockBehavior::Hang) => std::future::pending::<bool>().await,
        }
    }

    async fn list_active_assets(
        &self,
        asset_types: &[AssetTypeId],
    ) -> Result<Listing, CandelaError> {
        // Log the request and snapshot the behavior without holding the lock across await points
        let behavior = {
            let mut guard = self.state.lock().await;
            guard.listing_requests.push(asset_types.to_vec());
            guard.listing.clone()
        };

        match behavior {
            Some(MockBehavior::Return(mut listing)) => {
                listing.retain(|t, _| asset_types.contains(t));
                Ok(listing)
            }
            Some(MockBehavior::Fail(e)) => Err(e),
            Some(MockBehavior::Hang) => std::future::pending().await,
            None => Err(CandelaError::not_found(format!(
                "listing rule for market {}",
                self.name
            ))),
        }
    }

    async fn fetch_klines(&self, mut batch: KlineBatch) -> Result<KlineBatch, CandelaError> {
        let behavior = {
            let mut guard = self.state.lock().await;
            guard.kline_requests.push(batch.clone());
            guard.klines.clone()
        };

        match behavior {
            Some(MockBehavior::Return(klines)) => {
                for task in batch.values_mut().flatten() {
                    for slot in task.slots.values_mut() {
                        slot.klines = klines
                            .iter()
                            .filter(|k| slot.window.contains(k.open_time))
                            .cloned()
                            .collect();
                    }
                }
                Ok(batch)
            }
            Some(MockBehavior::Fail(e)) => Err(e),
            Some(MockBehavior::Hang) => std::future::pending().await,
            None => {
                for task in batch.values_mut().flatten() {
                    fixtures::klines::fill(task);
                }
                Ok(batch)
            }
        }
    }
}

