//! Observed and desired time windows.
//!
//! Modules include:
//! - `state`: per-asset, per-timeframe observed extents
//! - `reconcile`: desired-window math and fetch planning
/// Observed extents derived from stored rows.
pub mod state;
/// Desired windows, gap detection and fetch planning.
pub mod reconcile;
