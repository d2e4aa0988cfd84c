pub mod chart;
pub mod cli;
pub mod client;
pub mod config;
pub mod config_validation;
pub mod errors;
pub mod executor;
pub mod export;
pub mod history;
pub mod metrics;
pub mod percentiles;
pub mod recorder;
pub mod report;
pub mod statistics;
pub mod utils;
pub mod worker;
