pub mod klines;
pub mod listings;
