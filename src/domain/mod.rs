// Domain layer - Readings, filters and aggregated chart data
pub mod chart;
pub mod filter;
pub mod reading;
