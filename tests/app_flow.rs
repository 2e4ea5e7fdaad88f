use ledgerwise::{AppError, LedgerApp};
use ledgerwise_config::{Config, ConfigManager};
use ledgerwise_core::CoreError;
use ledgerwise_domain::{DefaultReason, Month, RatioStatus, UserId};
use serde_json::json;
use tempfile::TempDir;

fn open(dir: &TempDir) -> LedgerApp {
    LedgerApp::with_base_dir(dir.path().to_path_buf()).expect("open app")
}

#[test]
fn manual_rows_feed_the_dashboard() {
    let dir = TempDir::new().unwrap();
    let app = open(&dir);
    let june = Month::new(2024, 6).unwrap();

    app.add("income", json!({"amount": 3240, "source": "Salary", "timestamp": "2024-06-01"}))
        .unwrap();
    app.add(
        "expenses",
        json!({"amount": 1200, "category": "rent", "timestamp": "2024-06-02", "recurring": true}),
    )
    .unwrap();
    app.add("expenses", json!({"amount": 1664, "category": "groceries", "timestamp": "2024-06-05"}))
        .unwrap();

    let dashboard = app.dashboard(Some(june)).unwrap();
    assert_eq!(dashboard.month, june);
    assert_eq!(dashboard.ratios.savings_rate.value, 11.6);
    assert_eq!(dashboard.ratios.savings_rate.status, RatioStatus::Good);
    assert_eq!(dashboard.ratios.expense_ratio.value, 88.4);
    assert!(dashboard.debt_plan.is_none());
    assert!(!dashboard
        .defaults
        .iter()
        .any(|(_, reason)| *reason == DefaultReason::NoIncome));
}

#[test]
fn data_survives_reopening() {
    let dir = TempDir::new().unwrap();
    {
        let mut app = open(&dir);
        app.switch_user("casey").unwrap();
        app.add(
            "liabilities",
            json!({
                "amount": 5000,
                "name": "Credit Card",
                "interest_rate": 18.9,
                "minimum_payment": 150,
                "outstanding_balance": 5000,
                "timestamp": "2024-05-01"
            }),
        )
        .unwrap();
        app.set_wage(Some(24.0)).unwrap();
    }

    let app = open(&dir);
    assert_eq!(app.user(), &UserId::new("casey"));
    let aggregate = app.aggregate().unwrap();
    assert_eq!(aggregate.liabilities.total, 5000.0);
    assert_eq!(aggregate.true_hourly_wage, Some(24.0));

    let plan = app.dashboard(None).unwrap().debt_plan.expect("debt plan");
    assert_eq!(plan.avalanche.order[0].name, "Credit Card");
}

#[test]
fn rebuild_after_refreshes_changes_nothing() {
    let dir = TempDir::new().unwrap();
    let app = open(&dir);
    app.add(
        "savings",
        json!({"goal": "Emergency Fund", "target_amount": 10000, "current_amount": 2500}),
    )
    .unwrap();
    app.add(
        "savings_stock",
        json!({"stock_symbol": "vti", "amount_invested": 1000, "current_value": 1200}),
    )
    .unwrap();

    let before = app.aggregate().unwrap();
    let outcome = app.rebuild().unwrap();
    assert!(!outcome.changed);
    assert_eq!(outcome.aggregate, before);
    assert_eq!(app.dashboard(None).unwrap().goals[0].progress, 0.25);
}

#[test]
fn invalid_input_is_reported_with_detail() {
    let dir = TempDir::new().unwrap();
    let app = open(&dir);

    let err = app.add("users", json!({"amount": 1})).unwrap_err();
    assert!(matches!(err, AppError::Invalid(_)));
    assert!(err.user_message().contains("unknown table `users`"));

    let err = app.derive_wage(1000.0, 2000.0, 160.0).unwrap_err();
    assert!(matches!(err, AppError::Invalid(_)));

    let err = app.add("expenses", json!({"amount": -5})).unwrap_err();
    assert_eq!(err.user_message(), "Failed to process transaction. Please try again.");
}

#[test]
fn configured_currency_reaches_views_and_insights() {
    let dir = TempDir::new().unwrap();
    ConfigManager::with_base_dir(dir.path().to_path_buf())
        .unwrap()
        .save(&Config {
            currency: "EUR".into(),
            locale: "de-DE".into(),
            ..Config::default()
        })
        .unwrap();
    let app = open(&dir);
    let june = Month::new(2024, 6).unwrap();

    app.add(
        "expenses",
        json!({"amount": 3000, "category": "rent", "timestamp": "2024-06-02", "recurring": true}),
    )
    .unwrap();

    assert_eq!(app.money_format().format(1234.5), "€1.234,50");
    let dashboard = app.dashboard(Some(june)).unwrap();
    assert!(dashboard.insights.iter().any(|insight| insight.message
        == "You could save approximately €5.400/year by negotiating your recurring bills"));
    assert_eq!(dashboard.weekday_spending[6].amount, 3000.0);
    let latest = dashboard.cash_flow_trend.last().expect("trend");
    assert_eq!((latest.label.as_str(), latest.expenses), ("Jun", 3000.0));
}

#[test]
fn aggregate_snapshots_can_be_restored() {
    let dir = TempDir::new().unwrap();
    let app = open(&dir);
    app.set_wage(Some(20.0)).unwrap();
    app.set_wage(Some(35.0)).unwrap();

    let snapshots = app.aggregate_backups().unwrap();
    assert_eq!(snapshots.len(), 1);
    let restored = app.restore_aggregate(&snapshots[0].id).unwrap();
    assert_eq!(restored.true_hourly_wage, Some(20.0));
    assert_eq!(app.aggregate().unwrap(), restored);

    let err = app.restore_aggregate("aggregate_missing.json").unwrap_err();
    assert!(matches!(err, AppError::Core(CoreError::BackupNotFound(_))));
}

#[test]
fn config_backups_restore_the_active_user() {
    let dir = TempDir::new().unwrap();
    let mut app = open(&dir);
    app.switch_user("alice").unwrap();
    let backup = app.backup_config(Some("before move")).unwrap();
    app.switch_user("bob").unwrap();

    let listed = app.config_backups().unwrap();
    assert!(listed
        .iter()
        .any(|entry| entry.name == backup.name && !entry.is_automatic()));

    app.restore_config(&backup.name).unwrap();
    assert_eq!(app.user(), &UserId::new("alice"));
    assert_eq!(open(&dir).user(), &UserId::new("alice"));
    assert!(app.restore_config("../config.json").is_err());
}
