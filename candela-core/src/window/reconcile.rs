use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};

use candela_types::{
    Asset, AssetId, AssetTypeId, BaseConfig, CandelaError, KlineSlot, KlineTask, TimeWindow,
    Timeframe,
};

use crate::registry::Registry;
use crate::roster::Roster;
use crate::window::state::WindowState;

/// Desired windows per asset type and timeframe.
pub type DesiredWindows = BTreeMap<AssetTypeId, BTreeMap<Timeframe, TimeWindow>>;

/// The `count` most recent periods of `timeframe` ending at `reference`.
///
/// The upper bound is `reference` floored to a multiple of the period since the
/// Unix epoch; the lower bound lies `count - 1` periods before it.
///
/// # Errors
/// Returns `InvalidArg` when `count` is zero or the window would leave the
/// representable time range.
pub fn desired_window(
    timeframe: Timeframe,
    count: usize,
    reference: DateTime<Utc>,
) -> Result<TimeWindow, CandelaError> {
    if count == 0 {
        return Err(CandelaError::invalid_arg("kline count must be at least 1"));
    }
    let latest = timeframe.floor(reference);
    let span = i64::try_from(count - 1)
        .ok()
        .and_then(|n| n.checked_mul(timeframe.period_secs()))
        .and_then(TimeDelta::try_seconds)
        .ok_or_else(|| CandelaError::invalid_arg(format!("kline count {count} is too large")))?;
    let oldest = latest.checked_sub_signed(span).ok_or_else(|| {
        CandelaError::invalid_arg(format!(
            "{count} periods of {timeframe} before {latest} are out of range"
        ))
    })?;
    TimeWindow::new(oldest, latest)
}

/// Desired windows for several timeframes sharing one count and reference.
///
/// # Errors
/// Propagates [`desired_window`] errors.
pub fn desired_windows(
    timeframes: &[Timeframe],
    count: usize,
    reference: DateTime<Utc>,
) -> Result<BTreeMap<Timeframe, TimeWindow>, CandelaError> {
    timeframes
        .iter()
        .map(|tf| desired_window(*tf, count, reference).map(|w| (*tf, w)))
        .collect()
}

/// Desired windows for every asset type of `base`, over its own timeframes.
///
/// # Errors
/// Propagates [`desired_window`] errors.
pub fn desired_for_base(
    base: &BaseConfig,
    count: usize,
    reference: DateTime<Utc>,
) -> Result<DesiredWindows, CandelaError> {
    base.asset_types
        .iter()
        .map(|t| desired_windows(&t.timeframes, count, reference).map(|w| (t.id.clone(), w)))
        .collect()
}

/// Range to fetch so that `observed` covers `desired`, or `None` when it already does.
///
/// - unobserved: the whole desired window;
/// - gap before the observed range: `[desired.oldest, observed.oldest]`, widened
///   to the whole desired window when there is also a gap after it;
/// - gap after only: `[observed.latest, desired.latest]`.
///
/// The bounds shared with the observed range are fetched again; stored writes
/// are idempotent on `(asset, timeframe, open_time)`.
///
/// ```
/// use candela_core::{desired_window, fetch_window};
/// use candela_types::{TimeWindow, Timeframe};
/// use chrono::{TimeZone, Utc};
///
/// let at = |h| Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).unwrap();
/// let observed = TimeWindow::new(at(10), at(12)).unwrap();
///
/// // [10:00, 13:00]: only the newest hour is missing.
/// let desired = desired_window(Timeframe::H1, 4, at(13)).unwrap();
/// let fetch = fetch_window(&desired, Some(&observed)).unwrap();
/// assert_eq!(fetch, TimeWindow::new(at(12), at(13)).unwrap());
///
/// // Already covered.
/// let desired = desired_window(Timeframe::H1, 2, at(12)).unwrap();
/// assert_eq!(fetch_window(&desired, Some(&observed)), None);
/// ```
#[must_use]
pub fn fetch_window(desired: &TimeWindow, observed: Option<&TimeWindow>) -> Option<TimeWindow> {
    let Some(observed) = observed else {
        return Some(*desired);
    };
    let old_gap = observed.oldest() > desired.oldest();
    let new_gap = desired.latest() > observed.latest();
    match (old_gap, new_gap) {
        (true, true) => Some(*desired),
        (true, false) => TimeWindow::new(desired.oldest(), observed.oldest()).ok(),
        (false, true) => TimeWindow::new(observed.latest(), desired.latest()).ok(),
        (false, false) => None,
    }
}

/// Fetch plan closing every gap between `state` and `desired`.
///
/// Each asset of `assets` gets a [`KlineTask`] with one slot per timeframe
/// still missing data, under the same `(asset type, market)` pair. Assets with
/// nothing to fetch are omitted. Asset types without desired windows are
/// skipped.
#[must_use]
pub fn plan_catchup(
    assets: &Registry<Asset>,
    state: &WindowState,
    desired: &DesiredWindows,
) -> Registry<KlineTask> {
    let mut plan = assets.clone_as::<KlineTask>();
    for (asset_type, market, items) in assets.iter() {
        let Some(windows) = desired.get(asset_type) else {
            #[cfg(feature = "tracing")]
            tracing::warn!(asset_type = %asset_type, "no desired windows for asset type; skipped");
            continue;
        };
        for asset in items {
            let mut task = KlineTask::new(asset.clone());
            for (tf, want) in windows {
                if let Some(window) = fetch_window(want, state.get(&asset.asset_id, *tf)) {
                    task.slots.insert(*tf, KlineSlot::new(window));
                }
            }
            if !task.is_empty() {
                plan.add_item(asset_type, market, task);
            }
        }
    }
    plan
}

/// Single most-recent period for each requested timeframe.
///
/// Only assets already present in `state` are planned, and only for the
/// timeframes they have stored data for and their asset type tracks. The
/// observed extents are otherwise ignored.
///
/// # Errors
/// Returns `UnsupportedTimeframe` when a requested timeframe is tracked by no
/// asset type of `base`.
pub fn plan_refresh(
    assets: &Registry<Asset>,
    state: &WindowState,
    base: &BaseConfig,
    timeframes: &[Timeframe],
    reference: DateTime<Utc>,
) -> Result<Registry<KlineTask>, CandelaError> {
    if let Some(tf) = timeframes
        .iter()
        .find(|tf| !base.asset_types.iter().any(|t| t.supports(**tf)))
    {
        return Err(CandelaError::unsupported_timeframe(tf.as_str()));
    }
    let windows = desired_windows(timeframes, 1, reference)?;

    let mut plan = assets.clone_as::<KlineTask>();
    for (asset_type, market, items) in assets.iter() {
        let Some(spec) = base.asset_type(asset_type) else {
            continue;
        };
        for asset in items {
            let Some(observed) = state.timeframes(&asset.asset_id) else {
                continue;
            };
            let mut task = KlineTask::new(asset.clone());
            for (tf, window) in &windows {
                if observed.contains_key(tf) && spec.supports(*tf) {
                    task.slots.insert(*tf, KlineSlot::new(*window));
                }
            }
            if !task.is_empty() {
                plan.add_item(asset_type, market, task);
            }
        }
    }
    Ok(plan)
}

/// Timeframes whose period boundary falls exactly on `instant`.
#[must_use]
pub fn due_timeframes(instant: DateTime<Utc>) -> Vec<Timeframe> {
    Timeframe::ALL
        .into_iter()
        .filter(|tf| tf.is_boundary(instant))
        .collect()
}

/// Oldest instant to retain per timeframe.
///
/// When asset types disagree, the earliest bound wins so no type loses rows
/// it still wants.
#[must_use]
pub fn retention_cutoffs(desired: &DesiredWindows) -> BTreeMap<Timeframe, DateTime<Utc>> {
    let mut out: BTreeMap<Timeframe, DateTime<Utc>> = BTreeMap::new();
    for windows in desired.values() {
        for (tf, w) in windows {
            out.entry(*tf)
                .and_modify(|c| *c = (*c).min(w.oldest()))
                .or_insert(w.oldest());
        }
    }
    out
}

/// Assets with stored rows that are no longer in the roster.
#[must_use]
pub fn stale_assets(state: &WindowState, roster: &Roster) -> Vec<AssetId> {
    state
        .assets()
        .filter(|id| !roster.contains(id))
        .cloned()
        .collect()
}
