use std::{collections::HashSet, sync::Arc, thread};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use ledgerwise_domain::{
    AggregateSection, Debt, DebtStrategyKind, EntryKind, ExpenseCategory, LedgerEntry, LedgerTable,
    Month, PaymentMethod, RatioStatus, Session, UserAggregate, UserId,
};
use serde_json::json;

use crate::{
    aggregate_service::AggregateWriter,
    dashboard_service::{DashboardService, DashboardSettings},
    debt_service::DebtService,
    extraction_service::{ExtractionService, TableData, TransactionExtractor},
    forecast_service::ForecastService,
    recorder_service::TransactionRecorder,
    storage::{InMemoryLedgerStore, LedgerStore},
    time::FixedClock,
    CoreError,
};

fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 10, 0, 0).unwrap()
}

fn example_debts() -> Vec<Debt> {
    vec![
        Debt::new("Credit Card", 4800.0, 18.9, 250.0),
        Debt::new("Car Loan", 12000.0, 5.2, 350.0),
        Debt::new("Student Loan", 7800.0, 4.5, 200.0),
    ]
}

fn names(debts: &[Debt]) -> Vec<&str> {
    debts.iter().map(|debt| debt.name.as_str()).collect()
}

#[test]
fn debt_example_orders_and_totals() {
    let plan = DebtService::strategies(&example_debts()).expect("plan converges");

    assert_eq!(plan.avalanche.kind, DebtStrategyKind::Avalanche);
    assert_eq!(
        names(&plan.avalanche.order),
        vec!["Credit Card", "Car Loan", "Student Loan"]
    );
    assert_eq!(
        names(&plan.snowball.order),
        vec!["Credit Card", "Student Loan", "Car Loan"]
    );
    assert_eq!(plan.total_debt, 24600.0);
    assert_eq!(plan.total_monthly_payment, 800.0);

    for strategy in plan.strategies() {
        assert!(strategy.converges);
        assert!((31..=40).contains(&strategy.months_to_freedom));
        assert!(strategy.interest_saved >= 0.0);
    }
    assert!(plan.avalanche.total_interest <= plan.snowball.total_interest);
    assert!(plan.avalanche.interest_saved >= plan.snowball.interest_saved);
}

#[test]
fn debt_orderings_are_monotonic_permutations() {
    let debts = vec![
        Debt::new("A", 900.0, 7.0, 40.0),
        Debt::new("B", 300.0, 21.0, 25.0),
        Debt::new("C", 5000.0, 3.5, 90.0),
        Debt::new("D", 2200.0, 14.0, 60.0),
    ];
    let plan = DebtService::strategies(&debts).unwrap();

    let rates: Vec<f64> = plan.avalanche.order.iter().map(|d| d.interest_rate).collect();
    assert!(rates.windows(2).all(|pair| pair[0] >= pair[1]));
    let balances: Vec<f64> = plan.snowball.order.iter().map(|d| d.balance).collect();
    assert!(balances.windows(2).all(|pair| pair[0] <= pair[1]));

    let input: HashSet<&str> = names(&debts).into_iter().collect();
    for strategy in plan.strategies() {
        let ordered: HashSet<&str> = names(&strategy.order).into_iter().collect();
        assert_eq!(ordered, input);
        assert_eq!(strategy.order.len(), debts.len());
    }
}

#[test]
fn forecast_alert_matches_weekly_comparison() {
    for (income, expenses) in [(0.0, 0.0), (3000.0, 500.0), (1200.0, 4000.0), (2000.0, 2000.0)] {
        let forecast = ForecastService::split(income, expenses);
        for week in &forecast.weeks {
            assert_eq!(week.alert, week.expenses > week.income, "{income}/{expenses}");
        }
    }
}

fn seeded_store() -> Arc<InMemoryLedgerStore> {
    let store = Arc::new(InMemoryLedgerStore::new());
    let user = UserId::new("u1");
    let rows = vec![
        LedgerEntry::new(
            user.clone(),
            3240.0,
            at(2024, 6, 1),
            EntryKind::Income {
                source: "Salary".into(),
            },
        ),
        LedgerEntry::new(
            user.clone(),
            1400.0,
            at(2024, 6, 2),
            EntryKind::Expense {
                category: ExpenseCategory::Housing,
                payment_method: PaymentMethod::Debit,
            },
        )
        .recurring(true),
        LedgerEntry::new(
            user.clone(),
            1464.0,
            at(2024, 6, 9),
            EntryKind::Expense {
                category: ExpenseCategory::Food,
                payment_method: PaymentMethod::Credit,
            },
        ),
    ];
    for row in &rows {
        store.insert_entry(row).unwrap();
    }
    store
}

#[test]
fn refreshing_unchanged_entries_is_byte_identical() {
    let store = seeded_store();
    let writer = AggregateWriter::new(store.clone());
    let session = Session::new("u1", at(2024, 6, 30));

    writer.rebuild(&session).unwrap();
    let first = serde_json::to_string(&store.load_aggregate(&session.user).unwrap()).unwrap();
    for section in AggregateSection::ALL {
        let outcome = writer.refresh(&session, section).unwrap();
        assert!(!outcome.changed);
    }
    writer.rebuild(&session).unwrap();
    let second = serde_json::to_string(&store.load_aggregate(&session.user).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn dashboard_reflects_example_month() {
    let store = seeded_store();
    let writer = AggregateWriter::new(store.clone());
    let session = Session::new("u1", at(2024, 6, 30));
    let aggregate = writer.rebuild(&session).unwrap().aggregate;

    let dashboard = DashboardService::build(
        &aggregate,
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
        &DashboardSettings::default(),
    );
    assert_eq!(dashboard.month, Month::new(2024, 6).unwrap());
    assert_eq!(dashboard.ratios.savings_rate.value, 11.6);
    assert_eq!(dashboard.ratios.savings_rate.status, RatioStatus::Good);
    assert_eq!(dashboard.ratios.expense_ratio.value, 88.4);
    assert_eq!(dashboard.ratios.expense_ratio.status, RatioStatus::Warning);
    assert_eq!(dashboard.breakdown[0].category, ExpenseCategory::Food);
    assert!(dashboard
        .insights
        .iter()
        .any(|insight| insight.message.starts_with("Recurring subscriptions make up 48.9%")));
    let health = &dashboard.health;
    assert!(health.components.iter().all(|c| (0.0..=100.0).contains(&c.value)));
    let mean = health.components.iter().map(|c| c.value).sum::<f64>() / 4.0;
    assert!((health.score - mean).abs() <= 0.05);
}

#[test]
fn concurrent_saves_for_one_user_keep_every_update() {
    let store = Arc::new(InMemoryLedgerStore::new());
    let writer = Arc::new(AggregateWriter::new(store.clone()));
    let now = at(2024, 6, 15);

    let handles: Vec<_> = (0..8)
        .map(|idx| {
            let writer = Arc::clone(&writer);
            thread::spawn(move || {
                let session = Session::new("u1", now);
                let table = TableData {
                    name: "expenses".into(),
                    data: json!({"amount": 10 + idx, "category": "food"}),
                };
                TransactionRecorder::new(writer.as_ref())
                    .save(&session, &[table], now)
                    .map(|_| ())
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread").expect("save");
    }

    let aggregate = store.load_aggregate(&UserId::new("u1")).unwrap();
    assert_eq!(aggregate.expenses.total, (10..18).sum::<i32>() as f64);
    assert_eq!(
        store
            .entries(&UserId::new("u1"), &[LedgerTable::Expenses])
            .unwrap()
            .len(),
        8
    );
}

/// Store that reports a concurrent writer on its first CAS attempts.
struct ContendedStore {
    inner: InMemoryLedgerStore,
    conflicts: std::sync::Mutex<u32>,
}

impl LedgerStore for ContendedStore {
    fn insert_entry(&self, entry: &LedgerEntry) -> Result<(), CoreError> {
        self.inner.insert_entry(entry)
    }

    fn entries(
        &self,
        user: &UserId,
        tables: &[LedgerTable],
    ) -> Result<Vec<LedgerEntry>, CoreError> {
        self.inner.entries(user, tables)
    }

    fn load_aggregate(&self, user: &UserId) -> Result<UserAggregate, CoreError> {
        self.inner.load_aggregate(user)
    }

    fn store_aggregate(
        &self,
        user: &UserId,
        aggregate: &UserAggregate,
        expected_version: u64,
    ) -> Result<u64, CoreError> {
        let mut remaining = self.conflicts.lock().unwrap();
        if *remaining > 0 {
            *remaining -= 1;
            return Err(CoreError::VersionConflict {
                user: user.clone(),
                expected: expected_version,
                found: expected_version + 1,
            });
        }
        self.inner.store_aggregate(user, aggregate, expected_version)
    }

    fn list_users(&self) -> Result<Vec<UserId>, CoreError> {
        self.inner.list_users()
    }
}

#[test]
fn writer_retries_version_conflicts_then_gives_up() {
    let session = Session::new("u1", at(2024, 6, 30));
    let entry = LedgerEntry::new(
        session.user.clone(),
        500.0,
        at(2024, 6, 1),
        EntryKind::Income {
            source: "Freelance".into(),
        },
    );

    let flaky = Arc::new(ContendedStore {
        inner: InMemoryLedgerStore::new(),
        conflicts: std::sync::Mutex::new(2),
    });
    flaky.insert_entry(&entry).unwrap();
    let outcome = AggregateWriter::new(flaky)
        .refresh(&session, AggregateSection::Income)
        .unwrap();
    assert_eq!(outcome.aggregate.income.total, 500.0);

    let hostile = Arc::new(ContendedStore {
        inner: InMemoryLedgerStore::new(),
        conflicts: std::sync::Mutex::new(10),
    });
    hostile.insert_entry(&entry).unwrap();
    let err = AggregateWriter::new(hostile)
        .refresh(&session, AggregateSection::Income)
        .unwrap_err();
    assert!(matches!(err, CoreError::VersionConflict { .. }));
}

struct CannedExtractor(&'static str);

impl TransactionExtractor for CannedExtractor {
    fn extract(&self, _input: &str) -> Result<String, CoreError> {
        Ok(self.0.to_string())
    }
}

#[test]
fn extracted_transaction_flows_into_aggregate() {
    let store = Arc::new(InMemoryLedgerStore::new());
    let writer = AggregateWriter::new(store.clone());
    let now = at(2024, 6, 20);
    let session = Session::new("u1", now);
    let extractor = CannedExtractor(
        r#"```json
{"tables":[{"name":"expenses","data":{"user_id":"x","amount":45.99,"category":"groceries","payment_method":"credit card","timestamp":"2024-06-18T12:00:00Z","recurring":false}}],
 "assumptions":["Assumed this is not a recurring expense"]}
```"#,
    );

    let outcome =
        ExtractionService::process(&extractor, "Paid $45.99 for groceries", &FixedClock(now));
    assert!(outcome.fallback.is_none());
    let recorded = TransactionRecorder::new(&writer)
        .save(&session, &outcome.response.tables, now)
        .unwrap();

    let aggregate = recorded.aggregate.unwrap();
    assert_eq!(aggregate.expenses.by_category[&ExpenseCategory::Food], 45.99);
    assert_eq!(recorded.entries[0].user, UserId::new("u1"));
}
