pub mod config;
pub mod database;
pub mod monitoring;
pub mod pool;
pub mod rate_limit;
pub mod validation;
