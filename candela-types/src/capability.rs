use core::fmt;
use serde::{Deserialize, Serialize};

/// High-level capability labels for routing, errors, and telemetry.
///
/// These map one-to-one with the collaborator calls a round performs and keep
/// timeout and aggregate error labels consistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Capability {
    /// Market health probe.
    Availability,
    /// Listing of active assets per asset type.
    ActiveAssets,
    /// Kline retrieval for planned fetch windows.
    Klines,
    /// Roster reads and admission writes.
    Roster,
    /// Kline storage reads and writes.
    Storage,
}

impl Capability {
    /// Stable string label for this capability.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Availability => "availability",
            Self::ActiveAssets => "active-assets",
            Self::Klines => "klines",
            Self::Roster => "roster",
            Self::Storage => "storage",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Capability> for String {
    fn from(c: Capability) -> Self {
        c.as_str().to_string()
    }
}
