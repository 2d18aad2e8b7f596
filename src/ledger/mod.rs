pub mod aggregator;
pub mod recorder;
pub mod repository;
