use chrono::{Duration, NaiveDate, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ledgerwise_core::{AggregateService, DashboardService, DashboardSettings, DebtService};
use ledgerwise_domain::{
    Debt, EntryKind, ExpenseCategory, LedgerEntry, PaymentMethod, UserAggregate, UserId,
};

const CATEGORIES: [ExpenseCategory; 5] = [
    ExpenseCategory::Housing,
    ExpenseCategory::Food,
    ExpenseCategory::Transportation,
    ExpenseCategory::Entertainment,
    ExpenseCategory::Healthcare,
];

fn sample_entries(count: usize) -> Vec<LedgerEntry> {
    let user = UserId::new("bench");
    let start = Utc.with_ymd_and_hms(2023, 1, 1, 9, 0, 0).unwrap();

    (0..count)
        .map(|idx| {
            let timestamp = start + Duration::hours((idx * 7) as i64);
            if idx % 10 == 0 {
                LedgerEntry::new(
                    user.clone(),
                    1500.0 + (idx % 7) as f64 * 10.0,
                    timestamp,
                    EntryKind::Income {
                        source: "Salary".into(),
                    },
                )
            } else {
                LedgerEntry::new(
                    user.clone(),
                    20.0 + (idx % 90) as f64,
                    timestamp,
                    EntryKind::Expense {
                        category: CATEGORIES[idx % CATEGORIES.len()],
                        payment_method: PaymentMethod::Debit,
                    },
                )
                .recurring(idx % 13 == 0)
            }
        })
        .collect()
}

fn bench_aggregate(c: &mut Criterion) {
    let entries = sample_entries(black_box(10_000));

    c.bench_function("aggregate_rebuild_10k", |b| {
        b.iter(|| {
            let aggregate = AggregateService::rebuild(&UserAggregate::default(), &entries);
            black_box(aggregate);
        })
    });
}

fn bench_metrics(c: &mut Criterion) {
    let aggregate = AggregateService::rebuild(&UserAggregate::default(), &sample_entries(10_000));
    let today = NaiveDate::from_ymd_opt(2024, 2, 15).unwrap();
    let settings = DashboardSettings::default();

    c.bench_function("dashboard_build", |b| {
        b.iter(|| {
            let dashboard = DashboardService::build(&aggregate, today, &settings);
            black_box(dashboard);
        })
    });

    let debts: Vec<Debt> = (0..20)
        .map(|idx| {
            Debt::new(
                format!("Debt {idx}"),
                1000.0 + idx as f64 * 750.0,
                4.0 + idx as f64,
                40.0 + idx as f64 * 5.0,
            )
        })
        .collect();

    c.bench_function("debt_strategies_20", |b| {
        b.iter(|| {
            let plan = DebtService::strategies_with_extra(&debts, black_box(200.0));
            let _ = black_box(plan);
        })
    });
}

criterion_group!(benches, bench_aggregate, bench_metrics);
criterion_main!(benches);
