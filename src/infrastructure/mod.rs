pub mod core;
pub mod mock;
pub mod persistence;
pub mod polygon;

pub use mock::MockMarketData;
pub use polygon::PolygonMarketData;
