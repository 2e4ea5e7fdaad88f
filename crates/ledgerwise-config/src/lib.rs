//! ledgerwise-config
//!
//! Persistent preferences: locale, data location, extractor endpoint and
//! dashboard settings, plus disk persistence helpers.

pub mod error;
pub mod manager;
pub mod model;

pub use error::ConfigError;
pub use manager::{ConfigBackup, ConfigManager};
pub use model::{Config, ExtractorSettings, MetricSettings};
