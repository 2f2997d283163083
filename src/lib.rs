pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod logs;
pub mod shutdown;
pub mod supervise;
pub mod units;
pub mod upload;
