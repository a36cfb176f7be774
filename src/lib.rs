pub mod analytics;
pub mod api;
pub mod classifier;
pub mod config;
pub mod limiter;
pub mod models;
pub mod recorder;
pub mod redirect;
pub mod storage;
