pub mod assets;
pub mod klines;
pub mod round;
pub mod util;
