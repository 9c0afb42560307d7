// Technical indicator computation
pub mod indicators;

// Feature layout, scaling, windowing and models
pub mod ml;

// Forecast pipeline orchestration
pub mod pipeline;

// Offline training job
pub mod training;
