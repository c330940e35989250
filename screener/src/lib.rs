pub mod advisory;
pub mod api;
pub mod cache;
pub mod chart;
pub mod config;
pub mod job;
pub mod market_data;

pub mod error;
pub mod logger;
pub mod time;
