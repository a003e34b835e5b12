//! Candela keeps a bounded roster of tradable assets and a local kline
//! inventory in step with several markets.
//!
//! Overview
//! - Markets implement [`MarketConnector`]; storage implements [`KlineStore`]
//!   and [`RosterStore`]. The orchestrator only talks to these traits.
//! - Each asset type names its referent markets, most authoritative first. An
//!   asset belongs to exactly one main market and is fetched from it.
//! - Every operation runs inside a [`Round`]: the markets are probed first and
//!   unavailable ones are left out until the next round.
//!
//! Key behaviors
//! - Asset updates: each market ranks its candidates; the top `capacity` are
//!   admitted, the overflow is demoted (status `0`) and delisted assets
//!   (status `-1`) are purged together with their rows. Ownership only moves
//!   to a strictly more authoritative market.
//! - Catch-up: for each `(asset, timeframe)`, only the range missing from the
//!   last `kline_count` periods is fetched. Stale assets are deleted and rows
//!   older than the window are pruned.
//! - Refresh: the latest period of the timeframes due at an instant, for the
//!   assets that already have data.
//! - Failures are isolated per market and surface in the report `warnings`;
//!   a round only fails when every market it needed failed.
//!
//! Example
//! ```rust,ignore
//! use std::sync::Arc;
//! use candela::{AssetTypeSpec, Candela, Timeframe};
//!
//! let candela = Candela::builder()
//!     .with_market(Arc::new(BinanceConnector::new()))
//!     .with_market(Arc::new(KrakenConnector::new()))
//!     .asset_type(
//!         AssetTypeSpec::new("crypto", "Crypto", &["binance", "kraken"])
//!             .with_timeframes(&[Timeframe::H1, Timeframe::D1]),
//!     )
//!     .capacity(50)
//!     .build()?;
//!
//! let round = candela.open_round().await?;
//! let admission = round.update_assets(&store).await?;
//! let sync = round.catchup(&store, &store, false, chrono::Utc::now()).await?;
//! ```
//!
//! See `candela/examples/` for runnable end-to-end demonstrations.
#![warn(missing_docs)]

pub(crate) mod core;
mod router;

pub use crate::core::{Candela, CandelaBuilder, tag_err};
pub use router::round::Round;
pub use router::util::{collapse_errors, join_with_deadline};

// Re-export core types for convenience
pub use candela_core::{
    AdmissionPlan, AdmissionReport, Asset, AssetId, AssetTypeId, AssetTypeSpec, BaseConfig,
    CandelaConfig, CandelaError, Capability, Decision, Kline, KlineBatch, KlineRow, KlineSlot,
    KlineStore, KlineTask, Listing, MarketAdmission, MarketConnector, MarketId, MarketRegistry,
    Registry, Roster, RosterStore, Status, SyncReport, TimeWindow, Timeframe, WindowState,
    parse_reference_instant,
};
