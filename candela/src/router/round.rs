use std::collections::BTreeMap;
use std::sync::Arc;

use candela_core::{
    AssetTypeId, BaseConfig, CandelaError, Capability, MarketConnector, MarketId, Registry,
};

use crate::Candela;
use crate::core::tag_err;
use crate::router::util::{collapse_errors, join_with_deadline};

/// One pass over the markets found available when it was opened.
///
/// A round borrows its [`Candela`] and carries the base configuration
/// restricted to its active markets; every registry it builds is keyed by
/// that restricted configuration.
pub struct Round<'a> {
    pub(crate) candela: &'a Candela,
    pub(crate) active: Vec<Arc<dyn MarketConnector>>,
    pub(crate) base: BaseConfig,
}

/// Merged outcome of one per-market fan-out.
pub(crate) struct FanOut<U> {
    /// Successful results, keyed only by the asset types each market answered for.
    pub(crate) merged: Registry<U>,
    /// Markets whose call succeeded.
    pub(crate) answered: Vec<MarketId>,
    /// Per-market failures.
    pub(crate) errors: Vec<CandelaError>,
}

impl Candela {
    /// Probe every registered market concurrently.
    ///
    /// Returns the keys of the markets that reported themselves available
    /// within the market timeout, in registration order.
    ///
    /// # Errors
    /// Returns `RequestTimeout` if the request deadline elapses.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "candela::round::check_markets", skip(self), fields(markets = self.markets.len()))
    )]
    pub async fn check_markets(&self) -> Result<Vec<MarketId>, CandelaError> {
        let timeout = self.cfg.market_timeout;
        let probes = self.markets.iter().map(|m| {
            let m = Arc::clone(m);
            async move {
                let up = Self::market_call_with_timeout(
                    m.name(),
                    Capability::Availability.as_str(),
                    timeout,
                    async { Ok(m.is_available().await) },
                )
                .await;
                match up {
                    Ok(true) => Some(m.key()),
                    Ok(false) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(market = m.name(), "market unavailable");
                        None
                    }
                    Err(_e) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(market = m.name(), error = %_e, "availability probe failed");
                        None
                    }
                }
            }
        });
        let results = join_with_deadline(probes, self.cfg.request_timeout)
            .await
            .map_err(|_| CandelaError::request_timeout(Capability::Availability.as_str()))?;
        Ok(results.into_iter().flatten().collect())
    }

    /// Check market availability and open a round over the available ones.
    ///
    /// Asset types whose referent markets are all unavailable are left out of
    /// the round.
    ///
    /// # Errors
    /// Returns `NoMarketsAvailable` when no market answered, or
    /// `RequestTimeout` if the request deadline elapses.
    pub async fn open_round(&self) -> Result<Round<'_>, CandelaError> {
        let available = self.check_markets().await?;
        if available.is_empty() {
            #[cfg(feature = "tracing")]
            tracing::error!("no market available");
            return Err(CandelaError::NoMarketsAvailable);
        }
        let active: Vec<Arc<dyn MarketConnector>> = available
            .iter()
            .filter_map(|k| self.market(k).cloned())
            .collect();
        let mut base = self.cfg.base.clone();
        let _dropped = base.retain_markets(&available);
        #[cfg(feature = "tracing")]
        for asset_type in &_dropped {
            tracing::warn!(asset_type = %asset_type, "no referent market available; asset type skipped this round");
        }
        #[cfg(feature = "tracing")]
        tracing::info!(markets = active.len(), asset_types = base.asset_types.len(), "round opened");
        Ok(Round {
            candela: self,
            active,
            base,
        })
    }
}

impl Round<'_> {
    /// Keys of the markets active in this round.
    #[must_use]
    pub fn markets(&self) -> Vec<MarketId> {
        self.active.iter().map(|m| m.key()).collect()
    }

    /// The base configuration restricted to the active markets.
    #[must_use]
    pub const fn base(&self) -> &BaseConfig {
        &self.base
    }

    /// Transpose `work` by market, call every active market holding a slice of
    /// it concurrently, and merge the successful answers back by asset type.
    ///
    /// A failing market is recorded in `errors` and never blocks the others.
    /// When every dispatched market fails, the failures are collapsed into
    /// `AllMarketsFailed` or `AllMarketsTimedOut`.
    pub(crate) async fn fan_out<T, U, F, Fut>(
        &self,
        capability: Capability,
        work: Registry<T>,
        call: F,
    ) -> Result<FanOut<U>, CandelaError>
    where
        U: Clone + PartialEq,
        F: Fn(Arc<dyn MarketConnector>, BTreeMap<AssetTypeId, Vec<T>>) -> Fut,
        Fut: core::future::Future<Output = Result<BTreeMap<AssetTypeId, Vec<U>>, CandelaError>>,
    {
        let mut by_market = work.into_inverted();
        let timeout = self.candela.cfg.market_timeout;

        let mut tasks = Vec::new();
        for m in &self.active {
            let key = m.key();
            let Some(slice) = by_market.take_inner(&key) else {
                continue;
            };
            let types: Vec<AssetTypeId> = slice.keys().cloned().collect();
            let fut = call(Arc::clone(m), slice);
            let name = m.name();
            tasks.push(async move {
                let res = Candela::market_call_with_timeout(name, capability.as_str(), timeout, fut)
                    .await
                    .map_err(|e| tag_err(name, e));
                (key, types, res)
            });
        }
        let dispatched = tasks.len();

        let results = join_with_deadline(tasks, self.candela.cfg.request_timeout)
            .await
            .map_err(|_| CandelaError::request_timeout(capability.as_str()))?;

        let mut out = FanOut {
            merged: Registry::default(),
            answered: Vec::new(),
            errors: Vec::new(),
        };
        for (market, types, res) in results {
            match res {
                Ok(by_type) => {
                    // an asset type left out of the answer counts as unanswered
                    let mut part: Registry<U> = Registry::with_keys(
                        types
                            .into_iter()
                            .filter(|t| by_type.contains_key(t))
                            .map(|t| (t, market.clone())),
                    );
                    for (asset_type, items) in by_type {
                        for item in items {
                            part.add_item(&asset_type, &market, item);
                        }
                    }
                    out.merged.merge(&part);
                    out.answered.push(market);
                }
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(market = %market, capability = %capability, error = %e, "market call failed");
                    out.errors.push(e);
                }
            }
        }

        if dispatched > 0 && out.answered.is_empty() {
            return Err(collapse_errors(capability, out.errors));
        }
        Ok(out)
    }
}
