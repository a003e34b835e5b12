//! Candle periods and observed/desired time windows.

use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CandelaError;

/// A fixed candle period.
///
/// Periods are epoch-aligned: a candle of timeframe `tf` opens at an instant
/// whose Unix timestamp is a multiple of `tf.period_secs()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[non_exhaustive]
pub enum Timeframe {
    /// One minute.
    M1,
    /// Five minutes.
    M5,
    /// Fifteen minutes.
    M15,
    /// One hour.
    H1,
    /// Four hours.
    H4,
    /// One day.
    D1,
}

impl Timeframe {
    /// Every supported timeframe, finest first.
    pub const ALL: [Self; 6] = [Self::M1, Self::M5, Self::M15, Self::H1, Self::H4, Self::D1];

    /// Period length in seconds.
    #[must_use]
    pub const fn period_secs(self) -> i64 {
        match self {
            Self::M1 => 60,
            Self::M5 => 5 * 60,
            Self::M15 => 15 * 60,
            Self::H1 => 60 * 60,
            Self::H4 => 4 * 60 * 60,
            Self::D1 => 24 * 60 * 60,
        }
    }

    /// Period length as a `TimeDelta`.
    #[must_use]
    pub fn period(self) -> TimeDelta {
        TimeDelta::seconds(self.period_secs())
    }

    /// Short label, as used in storage keys and configuration (`"5m"`, `"1h"`, ...).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::M1 => "1m",
            Self::M5 => "5m",
            Self::M15 => "15m",
            Self::H1 => "1h",
            Self::H4 => "4h",
            Self::D1 => "1d",
        }
    }

    /// Floor `instant` to the start of the period containing it.
    #[must_use]
    pub fn floor(self, instant: DateTime<Utc>) -> DateTime<Utc> {
        let secs = instant.timestamp();
        let floored = secs - secs.rem_euclid(self.period_secs());
        DateTime::from_timestamp(floored, 0).unwrap_or(instant)
    }

    /// True when `instant` falls exactly on a period boundary of this timeframe.
    #[must_use]
    pub fn is_boundary(self, instant: DateTime<Utc>) -> bool {
        instant.timestamp_subsec_nanos() == 0
            && instant.timestamp().rem_euclid(self.period_secs()) == 0
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = CandelaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tf| tf.as_str() == s)
            .ok_or_else(|| CandelaError::unsupported_timeframe(s))
    }
}

impl Serialize for Timeframe {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Timeframe {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Closed time range `[oldest, latest]` covered (or to be covered) by klines.
///
/// Both bounds are UTC and carry no sub-second part; `oldest <= latest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawWindow")]
pub struct TimeWindow {
    oldest: DateTime<Utc>,
    latest: DateTime<Utc>,
}

/// Unchecked wire form of [`TimeWindow`].
#[derive(Deserialize)]
struct RawWindow {
    oldest: DateTime<Utc>,
    latest: DateTime<Utc>,
}

impl TryFrom<RawWindow> for TimeWindow {
    type Error = CandelaError;

    fn try_from(raw: RawWindow) -> Result<Self, Self::Error> {
        Self::new(raw.oldest, raw.latest)
    }
}

impl TimeWindow {
    /// Build a window, flooring both bounds to whole seconds.
    ///
    /// # Errors
    /// Returns `InvalidArg` if `oldest` is after `latest`.
    pub fn new(oldest: DateTime<Utc>, latest: DateTime<Utc>) -> Result<Self, CandelaError> {
        let oldest = oldest.trunc_subsecs(0);
        let latest = latest.trunc_subsecs(0);
        if oldest > latest {
            return Err(CandelaError::invalid_arg(format!(
                "window oldest {oldest} is after latest {latest}"
            )));
        }
        Ok(Self { oldest, latest })
    }

    /// A window covering a single instant.
    #[must_use]
    pub fn instant(at: DateTime<Utc>) -> Self {
        let at = at.trunc_subsecs(0);
        Self {
            oldest: at,
            latest: at,
        }
    }

    /// Lower bound (inclusive).
    #[must_use]
    pub const fn oldest(&self) -> DateTime<Utc> {
        self.oldest
    }

    /// Upper bound (inclusive).
    #[must_use]
    pub const fn latest(&self) -> DateTime<Utc> {
        self.latest
    }

    /// True when `at` lies within the window.
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.oldest <= at && at <= self.latest
    }

    /// True when `other` lies entirely within this window.
    #[must_use]
    pub fn covers(&self, other: &Self) -> bool {
        self.oldest <= other.oldest && other.latest <= self.latest
    }

    /// Smallest window covering both `self` and `other`.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            oldest: self.oldest.min(other.oldest),
            latest: self.latest.max(other.latest),
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.oldest.to_rfc3339(), self.latest.to_rfc3339())
    }
}

/// Parse a textual reference instant, requiring an explicit UTC offset.
///
/// Naive timestamps (no `Z` or `+hh:mm` suffix) are rejected rather than
/// assumed to be UTC. The result is floored to whole seconds.
///
/// # Errors
/// Returns `InvalidArg` when the string is not RFC 3339 with an offset.
pub fn parse_reference_instant(s: &str) -> Result<DateTime<Utc>, CandelaError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc).trunc_subsecs(0))
        .map_err(|e| {
            CandelaError::invalid_arg(format!(
                "reference instant '{s}' must be RFC 3339 with an explicit offset: {e}"
            ))
        })
}
