//! Folding ledger entries into aggregate sections, and the serialized writer
//! that stores them.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex},
};

use chrono::{DateTime, Datelike, Utc};
use ledgerwise_domain::{
    AggregateSection, AssetBucket, AssetDetails, AssetItem, AssetSection, BreakdownItem, Debt,
    EntryKind, ExpenseSection, IncomeSection, LedgerEntry, LedgerTable, LiabilitySection, Month,
    SavingsBucket, SavingsGoal, SectionData, Session, UserAggregate, UserId,
    AGGREGATE_SCHEMA_VERSION,
};
use tracing::{debug, info, warn};

use crate::{
    math::{percent, round1, round2},
    storage::{AggregateBackup, LedgerStore},
    CoreError,
};

const DEFAULT_MAX_ATTEMPTS: u32 = 3;

pub struct AggregateService;

impl AggregateService {
    /// Recomputes one section from the entries of its tables. Entries of other
    /// kinds are ignored.
    pub fn recompute(section: AggregateSection, entries: &[LedgerEntry]) -> SectionData {
        let mut relevant: Vec<&LedgerEntry> = entries
            .iter()
            .filter(|entry| section.tables().contains(&entry.table()))
            .collect();
        relevant.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));

        match section {
            AggregateSection::Income => SectionData::Income(Self::fold_income(&relevant)),
            AggregateSection::Expenses => SectionData::Expenses(Self::fold_expenses(&relevant)),
            AggregateSection::Liabilities => {
                SectionData::Liabilities(Self::fold_liabilities(&relevant))
            }
            AggregateSection::Assets => SectionData::Assets(Self::fold_assets(&relevant)),
        }
    }

    /// Rebuilds every section, keeping the user-provided wage and row version.
    pub fn rebuild(previous: &UserAggregate, entries: &[LedgerEntry]) -> UserAggregate {
        let mut aggregate = UserAggregate {
            schema_version: AGGREGATE_SCHEMA_VERSION,
            version: previous.version,
            true_hourly_wage: previous.true_hourly_wage,
            ..UserAggregate::default()
        };
        for section in AggregateSection::ALL {
            aggregate.replace_section(Self::recompute(section, entries));
        }
        aggregate
    }

    pub fn fold_income(entries: &[&LedgerEntry]) -> IncomeSection {
        let mut section = IncomeSection {
            as_of: latest(entries),
            ..IncomeSection::default()
        };
        for entry in entries {
            let EntryKind::Income { source } = &entry.kind else {
                continue;
            };
            let source = match source.trim() {
                "" => "Other".to_string(),
                trimmed => trimmed.to_string(),
            };
            section.total += entry.amount;
            *section.by_month.entry(month_of(entry)).or_default() += entry.amount;
            *section.by_source.entry(source).or_default() += entry.amount;
        }
        section.total = round2(section.total);
        round_values(&mut section.by_month);
        round_values(&mut section.by_source);
        section
    }

    pub fn fold_expenses(entries: &[&LedgerEntry]) -> ExpenseSection {
        let mut section = ExpenseSection {
            as_of: latest(entries),
            ..ExpenseSection::default()
        };
        for entry in entries {
            let EntryKind::Expense { category, .. } = &entry.kind else {
                continue;
            };
            let month = month_of(entry);
            section.total += entry.amount;
            *section.by_month.entry(month).or_default() += entry.amount;
            *section.by_category.entry(*category).or_default() += entry.amount;
            *section
                .by_month_category
                .entry(month)
                .or_default()
                .entry(*category)
                .or_default() += entry.amount;
            if entry.recurring {
                *section.recurring_by_month.entry(month).or_default() += entry.amount;
            }
            let weekday = entry.timestamp.weekday().num_days_from_monday() as usize;
            section.weekday_by_month.entry(month).or_insert([0.0; 7])[weekday] += entry.amount;
        }
        section.total = round2(section.total);
        round_values(&mut section.by_month);
        round_values(&mut section.by_category);
        round_values(&mut section.recurring_by_month);
        section.by_month_category.values_mut().for_each(round_values);
        for days in section.weekday_by_month.values_mut() {
            days.iter_mut().for_each(|value| *value = round2(*value));
        }

        let mut breakdown: Vec<BreakdownItem> = section
            .by_category
            .iter()
            .map(|(category, amount)| BreakdownItem {
                category: *category,
                amount: *amount,
                percentage: percent(*amount, section.total).map(round1).unwrap_or(0.0),
            })
            .collect();
        breakdown.sort_by(|a, b| {
            b.amount
                .total_cmp(&a.amount)
                .then(a.category.cmp(&b.category))
        });
        section.breakdown = breakdown;
        section
    }

    pub fn fold_liabilities(entries: &[&LedgerEntry]) -> LiabilitySection {
        let mut section = LiabilitySection {
            as_of: latest(entries),
            ..LiabilitySection::default()
        };
        for entry in entries {
            let EntryKind::Liability(details) = &entry.kind else {
                continue;
            };
            section.total += details.outstanding_balance;
            section.total_principal += entry.amount;
            section.total_minimum_payment += details.minimum_payment;
            *section.by_month.entry(month_of(entry)).or_default() += details.outstanding_balance;
            section.debts.push(Debt::new(
                details.name.clone(),
                round2(details.outstanding_balance),
                details.interest_rate,
                round2(details.minimum_payment),
            ));
        }
        section.total = round2(section.total);
        section.total_principal = round2(section.total_principal);
        section.total_minimum_payment = round2(section.total_minimum_payment);
        round_values(&mut section.by_month);
        section
    }

    pub fn fold_assets(entries: &[&LedgerEntry]) -> AssetSection {
        let mut section = AssetSection {
            as_of: latest(entries),
            ..AssetSection::default()
        };
        for entry in entries {
            let EntryKind::Asset(details) = &entry.kind else {
                continue;
            };
            section.total += entry.amount;
            *section.by_month.entry(month_of(entry)).or_default() += entry.amount;
            match details {
                AssetDetails::Savings {
                    goal,
                    target_amount,
                    target_date,
                } => {
                    section.savings.total += entry.amount;
                    let goals = &mut section.savings.goals;
                    match goals.iter_mut().find(|existing| existing.goal == *goal) {
                        Some(existing) => {
                            existing.current_amount += entry.amount;
                            existing.target_amount = *target_amount;
                            existing.target_date = *target_date;
                        }
                        None => goals.push(SavingsGoal {
                            goal: goal.clone(),
                            current_amount: entry.amount,
                            target_amount: *target_amount,
                            target_date: *target_date,
                        }),
                    }
                }
                AssetDetails::Stock {
                    stock_symbol,
                    amount_invested,
                } => push_item(
                    &mut section.stocks,
                    stock_symbol.clone(),
                    entry.amount,
                    Some(*amount_invested),
                ),
                AssetDetails::LongTerm { description } => push_item(
                    &mut section.long_term,
                    description
                        .clone()
                        .unwrap_or_else(|| "Long-term asset".to_string()),
                    entry.amount,
                    None,
                ),
            }
        }
        section.total = round2(section.total);
        round_values(&mut section.by_month);
        round_savings(&mut section.savings);
        section.stocks.total = round2(section.stocks.total);
        section.long_term.total = round2(section.long_term.total);
        section
    }
}

fn latest(entries: &[&LedgerEntry]) -> Option<DateTime<Utc>> {
    entries.iter().map(|entry| entry.timestamp).max()
}

fn month_of(entry: &LedgerEntry) -> Month {
    Month::of_timestamp(entry.timestamp)
}

fn round_values<K: Ord>(values: &mut BTreeMap<K, f64>) {
    values.values_mut().for_each(|value| *value = round2(*value));
}

fn round_savings(bucket: &mut SavingsBucket) {
    bucket.total = round2(bucket.total);
    for goal in &mut bucket.goals {
        goal.current_amount = round2(goal.current_amount);
    }
}

fn push_item(bucket: &mut AssetBucket, label: String, amount: f64, invested: Option<f64>) {
    bucket.total += amount;
    bucket.items.push(AssetItem {
        label,
        amount,
        invested,
    });
}

/// Result of an aggregate write.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOutcome {
    /// `false` when the recomputed aggregate matched the stored one and nothing was written.
    pub changed: bool,
    pub aggregate: UserAggregate,
}

/// Serializes aggregate writes per user and guards each one with a
/// compare-and-swap on the aggregate row version.
pub struct AggregateWriter<S: LedgerStore + ?Sized> {
    store: Arc<S>,
    locks: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
    max_attempts: u32,
}

impl<S: LedgerStore + ?Sized> AggregateWriter<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Reads the user's aggregate, migrating it first when its schema is outdated.
    pub fn load(&self, session: &Session) -> Result<UserAggregate, CoreError> {
        let aggregate = self.store.load_aggregate(&session.user)?;
        if aggregate.is_current_schema() {
            return Ok(aggregate);
        }
        info!(
            user = %session.user,
            schema = aggregate.schema_version,
            "aggregate schema outdated; rebuilding"
        );
        Ok(self.rebuild(session)?.aggregate)
    }

    /// Re-folds `section` from the user's entries and replaces it in the stored aggregate.
    pub fn refresh(
        &self,
        session: &Session,
        section: AggregateSection,
    ) -> Result<WriteOutcome, CoreError> {
        let user = &session.user;
        let outcome = self.write(user, |aggregate| {
            if !aggregate.is_current_schema() {
                let entries = self.store.entries(user, &LedgerTable::ALL)?;
                *aggregate = AggregateService::rebuild(aggregate, &entries);
                return Ok(());
            }
            let entries = self.store.entries(user, section.tables())?;
            aggregate.replace_section(AggregateService::recompute(section, &entries));
            Ok(())
        })?;
        debug!(user = %user, %section, changed = outcome.changed, "refreshed aggregate section");
        Ok(outcome)
    }

    pub fn refresh_table(
        &self,
        session: &Session,
        table: LedgerTable,
    ) -> Result<WriteOutcome, CoreError> {
        self.refresh(session, table.section())
    }

    /// Recomputes every section from the source of truth.
    pub fn rebuild(&self, session: &Session) -> Result<WriteOutcome, CoreError> {
        let user = &session.user;
        let outcome = self.write(user, |aggregate| {
            let entries = self.store.entries(user, &LedgerTable::ALL)?;
            *aggregate = AggregateService::rebuild(aggregate, &entries);
            Ok(())
        })?;
        info!(user = %user, changed = outcome.changed, "rebuilt aggregate");
        Ok(outcome)
    }

    /// Stores the user-provided true hourly wage; `None` clears it.
    pub fn set_true_hourly_wage(
        &self,
        session: &Session,
        wage: Option<f64>,
    ) -> Result<WriteOutcome, CoreError> {
        if let Some(value) = wage {
            if !value.is_finite() || value <= 0.0 {
                return Err(CoreError::Validation(format!(
                    "true hourly wage must be a positive amount, got {value}"
                )));
            }
        }
        self.write(&session.user, |aggregate| {
            aggregate.true_hourly_wage = wage.map(round2);
            Ok(())
        })
    }

    pub fn backups(&self, session: &Session) -> Result<Vec<AggregateBackup>, CoreError> {
        self.store.aggregate_backups(&session.user)
    }

    /// Restores backup `id` while holding the user's write lock.
    pub fn restore_backup(&self, session: &Session, id: &str) -> Result<UserAggregate, CoreError> {
        let user = &session.user;
        let lock = self.user_lock(user)?;
        let _guard = lock
            .lock()
            .map_err(|_| CoreError::Storage(format!("writer lock for {user} poisoned")))?;
        let restored = self.store.restore_aggregate_backup(user, id)?;
        info!(user = %user, backup = id, version = restored.version, "restored aggregate");
        Ok(restored)
    }

    fn write<F>(&self, user: &UserId, mut apply: F) -> Result<WriteOutcome, CoreError>
    where
        F: FnMut(&mut UserAggregate) -> Result<(), CoreError>,
    {
        let lock = self.user_lock(user)?;
        let _guard = lock
            .lock()
            .map_err(|_| CoreError::Storage(format!("writer lock for {user} poisoned")))?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            let current = self.store.load_aggregate(user)?;
            let mut next = current.clone();
            apply(&mut next)?;
            next.validate().map_err(CoreError::Validation)?;
            if next == current {
                return Ok(WriteOutcome {
                    changed: false,
                    aggregate: current,
                });
            }

            match self.store.store_aggregate(user, &next, current.version) {
                Ok(version) => {
                    next.version = version;
                    return Ok(WriteOutcome {
                        changed: true,
                        aggregate: next,
                    });
                }
                Err(CoreError::VersionConflict { expected, found, .. })
                    if attempt < self.max_attempts =>
                {
                    warn!(
                        user = %user,
                        attempt,
                        expected,
                        found,
                        "aggregate changed concurrently; retrying"
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn user_lock(&self, user: &UserId) -> Result<Arc<Mutex<()>>, CoreError> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| CoreError::Storage("writer lock table poisoned".into()))?;
        Ok(locks.entry(user.clone()).or_default().clone())
    }
}
