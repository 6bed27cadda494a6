pub mod config;
pub mod error;
pub mod host;
pub mod usage;

pub use config::UsageConfig;
pub use usage::aggregator::UsageAggregator;
