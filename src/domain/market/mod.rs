pub mod ohlcv;
pub mod ticker;
