use chrono::{DateTime, Utc};
use ledgerwise_domain::{LedgerEntry, Session, UserAggregate};
use tracing::{info, warn};

use crate::{
    aggregate_service::AggregateWriter, extraction_service::ExtractionService,
    extraction_service::TableData, storage::LedgerStore, CoreError,
};

/// Table name reported when the aggregate row update fails.
pub const AGGREGATE_TABLE: &str = "Users";

/// Entries written by one save, plus the aggregate after the last refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedTransaction {
    pub entries: Vec<LedgerEntry>,
    pub aggregate: Option<UserAggregate>,
}

/// Persists extracted table writes and keeps the aggregate in step.
pub struct TransactionRecorder<'a, S: LedgerStore + ?Sized> {
    writer: &'a AggregateWriter<S>,
}

impl<'a, S: LedgerStore + ?Sized> TransactionRecorder<'a, S> {
    pub fn new(writer: &'a AggregateWriter<S>) -> Self {
        Self { writer }
    }

    /// Normalizes, inserts and refreshes each table in order. The first
    /// failure aborts the remaining tables; earlier writes stay committed.
    pub fn save(
        &self,
        session: &Session,
        tables: &[TableData],
        now: DateTime<Utc>,
    ) -> Result<RecordedTransaction, CoreError> {
        let mut recorded = RecordedTransaction {
            entries: Vec::with_capacity(tables.len()),
            aggregate: None,
        };

        for table in tables {
            let entry = ExtractionService::normalize(table, session, now)
                .map_err(|err| Self::persistence(&table.name, err))?;
            let table_name = entry.table().name();

            self.writer
                .store()
                .insert_entry(&entry)
                .map_err(|err| {
                    warn!(user = %session.user, table = table_name, error = %err, "insert failed");
                    Self::persistence(table_name, err)
                })?;

            let outcome = self
                .writer
                .refresh_table(session, entry.table())
                .map_err(|err| {
                    warn!(user = %session.user, error = %err, "aggregate refresh failed");
                    Self::persistence(AGGREGATE_TABLE, err)
                })?;

            info!(
                user = %session.user,
                table = table_name,
                amount = entry.amount,
                "recorded entry"
            );
            recorded.aggregate = Some(outcome.aggregate);
            recorded.entries.push(entry);
        }
        Ok(recorded)
    }

    fn persistence(table: &str, err: CoreError) -> CoreError {
        match err {
            CoreError::Persistence { .. } => err,
            CoreError::InvalidRecord { message, .. } => CoreError::Persistence {
                table: table.trim().to_string(),
                message,
            },
            other => CoreError::Persistence {
                table: table.trim().to_string(),
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone;
    use ledgerwise_domain::{LedgerTable, UserId};
    use serde_json::json;

    use super::*;
    use crate::storage::InMemoryLedgerStore;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 9, 0, 0).unwrap()
    }

    fn tables() -> Vec<TableData> {
        vec![
            TableData {
                name: "income".into(),
                data: json!({"amount": 3240, "source": "Salary"}),
            },
            TableData {
                name: "savings".into(),
                data: json!({"goal": "Vacation", "current_amount": 150, "target_amount": 2000}),
            },
        ]
    }

    #[test]
    fn save_writes_every_table_and_refreshes_sections() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let writer = AggregateWriter::new(store.clone());
        let session = Session::new("u1", now());

        let recorded = TransactionRecorder::new(&writer)
            .save(&session, &tables(), now())
            .unwrap();
        assert_eq!(recorded.entries.len(), 2);
        let aggregate = recorded.aggregate.unwrap();
        assert_eq!(aggregate.income.total, 3240.0);
        assert_eq!(aggregate.assets.savings.total, 150.0);
        assert_eq!(aggregate.version, 2);
    }

    #[test]
    fn first_failure_stops_remaining_tables() {
        let store = Arc::new(InMemoryLedgerStore::new());
        store.fail_inserts_into(LedgerTable::Income);
        let writer = AggregateWriter::new(store.clone());
        let session = Session::new("u1", now());

        let err = TransactionRecorder::new(&writer)
            .save(&session, &tables(), now())
            .unwrap_err();
        match err {
            CoreError::Persistence { table, .. } => assert_eq!(table, "income"),
            other => panic!("unexpected error {other:?}"),
        }
        assert!(store
            .entries(&UserId::new("u1"), &LedgerTable::ALL)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn unknown_table_is_reported_with_its_name() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let writer = AggregateWriter::new(store);
        let session = Session::new("u1", now());
        let err = TransactionRecorder::new(&writer)
            .save(
                &session,
                &[TableData {
                    name: "users".into(),
                    data: json!({}),
                }],
                now(),
            )
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error inserting into users: Validation failed: unsupported table `users`"
        );
    }
}
