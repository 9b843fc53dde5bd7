pub mod config;
pub mod error;
pub mod explain;
pub mod metrics;
pub mod model;
pub mod report;
pub mod server;
