use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use candela_core::{
    AssetTypeSpec, BaseConfig, CandelaConfig, CandelaError, MarketConnector, MarketId,
};

/// Orchestrator over a set of markets sharing one base configuration.
///
/// `Candela` owns the market connectors and the configuration; every round
/// works on request-scoped registries built from it, so one instance can be
/// shared across tasks.
pub struct Candela {
    pub(crate) markets: Vec<Arc<dyn MarketConnector>>,
    pub(crate) cfg: CandelaConfig,
}

/// Builder for [`Candela`].
pub struct CandelaBuilder {
    markets: Vec<Arc<dyn MarketConnector>>,
    cfg: CandelaConfig,
}

impl Default for CandelaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CandelaBuilder {
    /// Start with no market and the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            markets: vec![],
            cfg: CandelaConfig::default(),
        }
    }

    /// Register a market connector.
    #[must_use]
    pub fn with_market(mut self, m: Arc<dyn MarketConnector>) -> Self {
        self.markets.push(m);
        self
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, cfg: CandelaConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Replace the base configuration (asset types and referent markets).
    #[must_use]
    pub fn base_config(mut self, base: BaseConfig) -> Self {
        self.cfg.base = base;
        self
    }

    /// Append one asset type to the base configuration.
    #[must_use]
    pub fn asset_type(mut self, spec: AssetTypeSpec) -> Self {
        self.cfg.base.asset_types.push(spec);
        self
    }

    /// Default number of actively tracked assets per market and asset type.
    #[must_use]
    pub const fn capacity(mut self, n: usize) -> Self {
        self.cfg.capacity = n;
        self
    }

    /// Capacity override for one market.
    #[must_use]
    pub fn market_capacity(mut self, market: impl Into<MarketId>, n: usize) -> Self {
        self.cfg.market_capacity.insert(market.into(), n);
        self
    }

    /// Number of periods a catch-up round keeps per timeframe.
    #[must_use]
    pub const fn kline_count(mut self, n: usize) -> Self {
        self.cfg.kline_count = n;
        self
    }

    /// Timeout applied to each individual market call.
    #[must_use]
    pub const fn market_timeout(mut self, timeout: Duration) -> Self {
        self.cfg.market_timeout = timeout;
        self
    }

    /// Overall deadline for one fan-out across markets.
    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.cfg.request_timeout = Some(timeout);
        self
    }

    /// Name of the kline table rounds read and write.
    #[must_use]
    pub fn table(mut self, name: impl Into<String>) -> Self {
        self.cfg.table = name.into();
        self
    }

    /// Validate the configuration and build the orchestrator.
    ///
    /// Referent markets that are not registered are dropped (as are duplicate
    /// entries); asset types left without any referent market are dropped with
    /// a warning.
    ///
    /// # Errors
    /// Returns `InvalidArg` when no market is registered, two markets share a
    /// name, a capacity or the kline count is zero, the table name is empty,
    /// or no asset type keeps a registered referent market.
    pub fn build(mut self) -> Result<Candela, CandelaError> {
        if self.markets.is_empty() {
            return Err(CandelaError::InvalidArg(
                "no markets registered; add at least one via with_market(...)".to_string(),
            ));
        }
        let mut seen: BTreeSet<&'static str> = BTreeSet::new();
        for m in &self.markets {
            if !seen.insert(m.name()) {
                return Err(CandelaError::invalid_arg(format!(
                    "market '{}' registered twice",
                    m.name()
                )));
            }
        }
        if self.cfg.capacity == 0 {
            return Err(CandelaError::invalid_arg("capacity must be at least 1"));
        }
        if let Some((m, _)) = self.cfg.market_capacity.iter().find(|(_, n)| **n == 0) {
            return Err(CandelaError::invalid_arg(format!(
                "capacity for market '{m}' must be at least 1"
            )));
        }
        if self.cfg.kline_count == 0 {
            return Err(CandelaError::invalid_arg("kline_count must be at least 1"));
        }
        if self.cfg.table.trim().is_empty() {
            return Err(CandelaError::invalid_arg("table name must not be empty"));
        }

        let known: Vec<MarketId> = self.markets.iter().map(|m| m.key()).collect();
        let dropped = self.cfg.base.retain_markets(&known);
        #[cfg(feature = "tracing")]
        for asset_type in &dropped {
            tracing::warn!(asset_type = %asset_type, "no registered referent market; asset type dropped");
        }
        if self.cfg.base.asset_types.is_empty() {
            return Err(CandelaError::invalid_arg(format!(
                "no asset type has a registered referent market (dropped: {})",
                dropped
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        Ok(Candela {
            markets: self.markets,
            cfg: self.cfg,
        })
    }
}

/// Map a failure to a market-tagged error, keeping already tagged variants.
pub fn tag_err(market: &str, e: CandelaError) -> CandelaError {
    match e {
        e @ (CandelaError::Market { .. }
        | CandelaError::MarketTimeout { .. }
        | CandelaError::RequestTimeout { .. }
        | CandelaError::AllMarketsTimedOut { .. }
        | CandelaError::AllMarketsFailed(_)) => e,
        other => CandelaError::Market {
            market: market.to_string(),
            msg: other.to_string(),
        },
    }
}

/// Run `fut` under an optional deadline.
///
/// # Errors
/// Returns `RequestTimeout("request")` when the deadline elapses; call sites
/// remap the label to their capability.
pub(crate) async fn with_request_deadline<F, T>(
    deadline: Option<Duration>,
    fut: F,
) -> Result<T, CandelaError>
where
    F: core::future::Future<Output = T>,
{
    match deadline {
        Some(d) => tokio::time::timeout(d, fut)
            .await
            .map_err(|_| CandelaError::request_timeout("request")),
        None => Ok(fut.await),
    }
}

impl Candela {
    /// Bound one market call by `timeout`; an elapsed timeout becomes
    /// `MarketTimeout`.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "candela::core::market_call_with_timeout",
            skip(fut),
            fields(
                market = market_name,
                capability = capability,
                timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            ),
        )
    )]
    pub(crate) async fn market_call_with_timeout<T, Fut>(
        market_name: &'static str,
        capability: &'static str,
        timeout: Duration,
        fut: Fut,
    ) -> Result<T, CandelaError>
    where
        Fut: core::future::Future<Output = Result<T, CandelaError>>,
    {
        (tokio::time::timeout(timeout, fut).await)
            .unwrap_or_else(|_| Err(CandelaError::market_timeout(market_name, capability)))
    }

    /// Start building a new orchestrator.
    #[must_use]
    pub fn builder() -> CandelaBuilder {
        CandelaBuilder::new()
    }

    /// The validated configuration.
    #[must_use]
    pub const fn config(&self) -> &CandelaConfig {
        &self.cfg
    }

    /// Registered market keys, in registration order.
    #[must_use]
    pub fn market_keys(&self) -> Vec<MarketId> {
        self.markets.iter().map(|m| m.key()).collect()
    }

    pub(crate) fn market(&self, key: &MarketId) -> Option<&Arc<dyn MarketConnector>> {
        self.markets.iter().find(|m| m.name() == key.as_str())
    }
}
