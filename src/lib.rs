#![doc(test(attr(deny(warnings))))]

//! Ledgerwise turns free-text transactions into per-user ledger entries and
//! derives financial-health metrics, forecasts and insights from them.

pub mod app;
pub mod cli;
pub mod errors;
pub mod utils;

pub use app::{LedgerApp, RecordOutcome};
pub use errors::AppError;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Ledgerwise tracing initialized.");
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_does_not_panic() {
        super::init();
        super::init();
    }
}
