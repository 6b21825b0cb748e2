// Application layer - Use cases and the reading source seam
pub mod aggregation;
pub mod chart_service;
pub mod filter_cache;
pub mod filter_resolver;
pub mod reading_source;
pub mod reading_store;
