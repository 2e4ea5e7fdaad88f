use std::{fs, sync::Arc};

use chrono::{TimeZone, Utc};
use ledgerwise_core::{
    storage::LedgerStore, AggregateWriter, CoreError, TableData, TransactionRecorder,
};
use ledgerwise_domain::{
    EntryKind, ExpenseCategory, LedgerEntry, LedgerTable, PaymentMethod, Session, UserAggregate,
    UserId,
};
use ledgerwise_storage_json::JsonLedgerStore;
use serde_json::json;
use tempfile::tempdir;

fn expense(user: &str, amount: f64) -> LedgerEntry {
    LedgerEntry::new(
        UserId::new(user),
        amount,
        Utc.with_ymd_and_hms(2024, 6, 3, 8, 0, 0).unwrap(),
        EntryKind::Expense {
            category: ExpenseCategory::Food,
            payment_method: PaymentMethod::Debit,
        },
    )
}

#[test]
fn entries_are_appended_per_table() {
    let dir = tempdir().expect("tempdir");
    let store = JsonLedgerStore::new(dir.path().to_path_buf()).expect("create store");
    let user = UserId::new("Alice@Example.com");

    store.insert_entry(&expense("Alice@Example.com", 12.5)).expect("insert");
    store.insert_entry(&expense("Alice@Example.com", 7.5)).expect("insert");

    let path = store.table_path(&user, LedgerTable::Expenses);
    assert!(path.exists());
    assert!(path.starts_with(store.user_dir(&user)));
    assert!(store
        .user_dir(&user)
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with("alice_example_com-")));
    let rows = store.entries(&user, &[LedgerTable::Expenses]).expect("entries");
    assert_eq!(rows.len(), 2);
    assert!(store.entries(&user, &[LedgerTable::Income]).unwrap().is_empty());
    assert_eq!(store.list_users().unwrap(), vec![user]);
}

#[test]
fn aggregate_writes_are_versioned() {
    let dir = tempdir().expect("tempdir");
    let store = JsonLedgerStore::new(dir.path().to_path_buf()).expect("create store");
    let user = UserId::new("bob");

    assert_eq!(store.load_aggregate(&user).unwrap(), UserAggregate::default());
    let version = store
        .store_aggregate(&user, &UserAggregate::default(), 0)
        .expect("first write");
    assert_eq!(version, 1);

    let err = store
        .store_aggregate(&user, &UserAggregate::default(), 0)
        .unwrap_err();
    assert!(matches!(err, CoreError::VersionConflict { found: 1, .. }));
    assert!(!store.aggregate_path(&user).with_extension("json.tmp").exists());
}

#[test]
fn overwritten_aggregates_are_backed_up_and_restorable() {
    let dir = tempdir().expect("tempdir");
    let store = JsonLedgerStore::with_retention(dir.path().to_path_buf(), 2).expect("create store");
    let user = UserId::new("carol");

    let mut aggregate = UserAggregate::default();
    aggregate.true_hourly_wage = Some(21.0);
    store.store_aggregate(&user, &aggregate, 0).unwrap();
    aggregate.true_hourly_wage = Some(30.0);
    store.store_aggregate(&user, &aggregate, 1).unwrap();

    let backups = store.aggregate_backups(&user).expect("backups");
    assert_eq!(backups.len(), 1);
    assert!(backups[0].created_at.is_some());

    let restored = store
        .restore_aggregate_backup(&user, &backups[0].id)
        .expect("restore");
    assert_eq!(restored.true_hourly_wage, Some(21.0));
    assert_eq!(restored.version, 3);
    assert_eq!(store.load_aggregate(&user).unwrap(), restored);
    assert!(store.aggregate_backups(&user).unwrap().len() <= 2);

    let err = store
        .restore_aggregate_backup(&user, "../aggregate.json")
        .unwrap_err();
    assert!(matches!(err, CoreError::BackupNotFound(_)));
    assert!(store.aggregate_backups(&UserId::new("Carol")).unwrap().is_empty());
}

#[test]
fn recorder_persists_through_json_store() {
    let dir = tempdir().expect("tempdir");
    let store = Arc::new(JsonLedgerStore::new(dir.path().to_path_buf()).expect("create store"));
    let writer = AggregateWriter::new(store.clone());
    let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
    let session = Session::new("dave", now);

    TransactionRecorder::new(&writer)
        .save(
            &session,
            &[TableData {
                name: "income".into(),
                data: json!({"amount": 2500, "source": "Salary", "timestamp": "2024-06-01"}),
            }],
            now,
        )
        .expect("save");

    let raw = fs::read_to_string(store.aggregate_path(&session.user)).expect("aggregate file");
    let aggregate: UserAggregate = serde_json::from_str(&raw).expect("aggregate json");
    assert_eq!(aggregate.income.total, 2500.0);
    assert_eq!(aggregate.version, 1);
    assert!(raw.contains("\"2024-06\""));
}

#[test]
fn users_differing_only_in_case_stay_separate() {
    let dir = tempdir().expect("tempdir");
    let store = Arc::new(JsonLedgerStore::new(dir.path().to_path_buf()).expect("create store"));
    let writer = AggregateWriter::new(store.clone());
    let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
    let upper = Session::new("Alice", now);
    let lower = Session::new("alice", now);

    TransactionRecorder::new(&writer)
        .save(
            &upper,
            &[TableData {
                name: "income".into(),
                data: json!({"amount": 5000, "source": "Salary", "timestamp": "2024-06-01"}),
            }],
            now,
        )
        .expect("save");

    assert_ne!(store.user_dir(&upper.user), store.user_dir(&lower.user));
    assert!(store
        .entries(&lower.user, &[LedgerTable::Income])
        .unwrap()
        .is_empty());
    assert_eq!(writer.load(&lower).unwrap(), UserAggregate::default());
    assert_eq!(writer.rebuild(&lower).unwrap().aggregate.income.total, 0.0);

    TransactionRecorder::new(&writer)
        .save(
            &lower,
            &[TableData {
                name: "income".into(),
                data: json!({"amount": 120, "source": "Gift", "timestamp": "2024-06-02"}),
            }],
            now,
        )
        .expect("save");

    assert_eq!(writer.load(&upper).unwrap().income.total, 5000.0);
    assert_eq!(writer.load(&lower).unwrap().income.total, 120.0);
    assert_eq!(
        store.list_users().unwrap(),
        vec![UserId::new("Alice"), UserId::new("alice")]
    );
}
