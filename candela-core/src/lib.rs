//! candela-core
//!
//! Registry, window reconciliation, admission planning and collaborator traits
//! shared across the candela workspace.
//!
//! - `registry`: the two-level `(asset type, market)` work registry.
//! - `window`: observed extents, desired windows and fetch planning.
//! - `admission`: per-market ranking and roster decisions.
//! - `roster`: the tracked asset set and the decisions that change it.
//! - `connector`: the `MarketConnector`, `KlineStore` and `RosterStore` traits.
//!
//! Everything except `connector` is synchronous and free of I/O; the traits
//! are `async_trait` objects meant to be shared as `Arc<dyn ...>`.
#![warn(missing_docs)]

/// Ranking and admission control.
pub mod admission;
/// Market and storage collaborator traits.
pub mod connector;
pub mod registry;
pub mod roster;
/// Observed and desired time windows.
pub mod window;

pub use admission::{
    AdmissionPlan, MarketPlan, Ranking, mark_delisted, plan_admission, plan_market, prefers,
    rank_market,
};
pub use connector::{KlineBatch, KlineStore, Listing, MarketConnector, RosterStore};
pub use registry::{MarketRegistry, Registry};
pub use roster::{Decision, Roster};
pub use window::reconcile::{
    DesiredWindows, desired_for_base, desired_window, desired_windows, due_timeframes,
    fetch_window, plan_catchup, plan_refresh, retention_cutoffs, stale_assets,
};
pub use window::state::WindowState;

pub use candela_types::*;
