// Domain-specific error types
pub mod errors;

// Market data domain
pub mod market;

// Model feature layout
pub mod ml;

// Port interfaces
pub mod ports;
