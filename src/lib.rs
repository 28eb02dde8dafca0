pub mod analysis;
pub mod chart;
pub mod config;
pub mod data;
pub mod types;
