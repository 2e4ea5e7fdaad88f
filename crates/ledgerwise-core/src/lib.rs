//! ledgerwise-core
//!
//! Metric calculators, insight rules, the aggregate writer and transaction
//! recording. Depends on ledgerwise-domain. No CLI, no terminal I/O, no
//! concrete storage backend beyond the in-memory store.

pub mod aggregate_service;
pub mod dashboard_service;
pub mod debt_service;
pub mod error;
pub mod extraction_service;
pub mod forecast_service;
pub mod goal_service;
pub mod health_service;
pub mod history_service;
pub mod insight_service;
pub mod math;
pub mod ratio_service;
pub mod recorder_service;
pub mod storage;
pub mod time;
pub mod wage_service;

#[cfg(test)]
mod tests;

pub use aggregate_service::*;
pub use dashboard_service::*;
pub use debt_service::*;
pub use error::CoreError;
pub use extraction_service::*;
pub use forecast_service::*;
pub use goal_service::*;
pub use health_service::*;
pub use history_service::*;
pub use insight_service::*;
pub use ratio_service::*;
pub use recorder_service::*;
pub use storage::{AggregateBackup, InMemoryLedgerStore, LedgerStore};
pub use time::{Clock, FixedClock, SystemClock};
pub use wage_service::*;
