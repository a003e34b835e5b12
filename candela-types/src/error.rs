use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for the candela workspace.
///
/// Covers contract violations on pure computations, market-tagged collaborator
/// failures, storage failures, per-asset admission failures and the aggregates
/// produced when a whole round cannot make progress.
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CandelaError {
    /// Invalid input argument (non-positive count, inverted window, naive instant...).
    #[error("invalid argument: {0}")]
    InvalidArg(String),

    /// A timeframe label or value outside the supported set.
    #[error("unsupported timeframe: {timeframe}")]
    UnsupportedTimeframe {
        /// The offending timeframe label.
        timeframe: String,
    },

    /// Issues with the returned or expected data (missing fields, etc.).
    #[error("data issue: {0}")]
    Data(String),

    /// An individual market collaborator returned an error.
    #[error("{market} failed: {msg}")]
    Market {
        /// Market identifier that failed.
        market: String,
        /// Human-readable error message.
        msg: String,
    },

    /// An individual market call exceeded the configured timeout.
    #[error("market timed out: {capability} via {market}")]
    MarketTimeout {
        /// Market identifier that timed out.
        market: String,
        /// Capability label (e.g. "klines", "assets").
        capability: String,
    },

    /// The overall request exceeded the configured deadline.
    #[error("request timed out: {capability}")]
    RequestTimeout {
        /// Capability label for which the request timed out.
        capability: String,
    },

    /// Every dispatched market failed; contains the individual failures.
    #[error("all markets failed: {0:?}")]
    AllMarketsFailed(Vec<CandelaError>),

    /// Every dispatched market timed out for the requested capability.
    #[error("all markets timed out: {capability}")]
    AllMarketsTimedOut {
        /// Capability label that timed out across all markets.
        capability: String,
    },

    /// No registered market answered the availability check.
    #[error("no market available")]
    NoMarketsAvailable,

    /// The storage collaborator failed.
    #[error("storage failed: {0}")]
    Storage(String),

    /// Applying one asset's admission decision failed.
    #[error("admission of {asset_id} failed: {msg}")]
    Admission {
        /// Canonical identifier of the asset whose decision failed.
        asset_id: String,
        /// Human-readable error message.
        msg: String,
    },

    /// A resource could not be found.
    #[error("not found: {what}")]
    NotFound {
        /// Description of missing resource, e.g. "asset crypto-BTCUSDC".
        what: String,
    },

    /// Unknown/opaque error.
    #[error("unknown error: {0}")]
    Other(String),
}

impl CandelaError {
    /// Helper: build an `InvalidArg` error.
    pub fn invalid_arg(msg: impl Into<String>) -> Self {
        Self::InvalidArg(msg.into())
    }

    /// Helper: build an `UnsupportedTimeframe` error for a label.
    pub fn unsupported_timeframe(timeframe: impl Into<String>) -> Self {
        Self::UnsupportedTimeframe {
            timeframe: timeframe.into(),
        }
    }

    /// Helper: build a `Market` error with the market name and message.
    pub fn market(market: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Market {
            market: market.into(),
            msg: msg.into(),
        }
    }

    /// Helper: build a `MarketTimeout` error.
    pub fn market_timeout(market: impl Into<String>, capability: impl Into<String>) -> Self {
        Self::MarketTimeout {
            market: market.into(),
            capability: capability.into(),
        }
    }

    /// Helper: build a `RequestTimeout` error.
    #[must_use]
    pub fn request_timeout(capability: impl Into<String>) -> Self {
        Self::RequestTimeout {
            capability: capability.into(),
        }
    }

    /// Helper: build a `Data` error.
    pub fn data(msg: impl Into<String>) -> Self {
        Self::Data(msg.into())
    }

    /// Helper: build a `Storage` error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Helper: build an `Admission` error for one asset.
    pub fn admission(asset_id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Admission {
            asset_id: asset_id.into(),
            msg: msg.into(),
        }
    }

    /// Helper: build a `NotFound` error for a description of the missing resource.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Returns true if this error should be surfaced to operators as actionable.
    ///
    /// A benign not-found condition is not actionable. Aggregates are
    /// classified based on their contents.
    #[must_use]
    pub fn is_actionable(&self) -> bool {
        match self {
            Self::NotFound { .. } => false,
            Self::AllMarketsFailed(inner) => inner.iter().any(Self::is_actionable),
            _ => true,
        }
    }

    /// Flatten nested `AllMarketsFailed` structures into a plain vector.
    #[must_use]
    pub fn flatten(self) -> Vec<Self> {
        match self {
            Self::AllMarketsFailed(list) => list.into_iter().flat_map(Self::flatten).collect(),
            other => vec![other],
        }
    }
}
