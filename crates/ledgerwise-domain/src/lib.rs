//! ledgerwise-domain
//!
//! Pure domain models (ledger entries, vocabularies, the per-user aggregate
//! cache and derived metric shapes). No I/O, no CLI, no storage.

pub mod aggregate;
pub mod category;
pub mod common;
pub mod entry;
pub mod metrics;
pub mod money;

pub use aggregate::*;
pub use category::*;
pub use common::*;
pub use entry::*;
pub use metrics::*;
pub use money::MoneyFormat;
