//! Candela-specific data transfer objects and configuration primitives.
#![warn(missing_docs)]

mod asset;
mod capability;
mod config;
mod error;
mod ids;
mod kline;
mod reports;
mod timeframe;

pub use asset::{Asset, Status};
pub use capability::Capability;
pub use config::{AssetTypeSpec, BaseConfig, CandelaConfig};
pub use error::CandelaError;
pub use ids::{AssetId, AssetTypeId, MarketId};
pub use kline::{Kline, KlineRow, KlineSlot, KlineTask};
pub use reports::{AdmissionReport, MarketAdmission, SyncReport};
pub use timeframe::{TimeWindow, Timeframe, parse_reference_instant};
