pub mod cache;
pub mod client;
pub mod config;
pub mod logging;
