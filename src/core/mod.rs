pub mod curve;
pub mod denoise;
pub mod overrides;
pub mod smooth;
pub mod stats;
pub mod trend;
pub mod zigzag;
