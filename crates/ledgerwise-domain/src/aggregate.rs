//! The per-user aggregate cache: one strongly typed section per entry family.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    category::ExpenseCategory, common::Month, entry::AggregateSection, metrics::Debt,
};

/// Schema revision of [`UserAggregate`]. Older aggregates are rebuilt from entries.
pub const AGGREGATE_SCHEMA_VERSION: u32 = 2;

/// Denormalized read cache derived from a user's ledger entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAggregate {
    #[serde(default)]
    pub schema_version: u32,
    /// Row version used for compare-and-swap writes.
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub income: IncomeSection,
    #[serde(default)]
    pub expenses: ExpenseSection,
    #[serde(default)]
    pub liabilities: LiabilitySection,
    #[serde(default)]
    pub assets: AssetSection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub true_hourly_wage: Option<f64>,
}

impl Default for UserAggregate {
    fn default() -> Self {
        Self {
            schema_version: AGGREGATE_SCHEMA_VERSION,
            version: 0,
            income: IncomeSection::default(),
            expenses: ExpenseSection::default(),
            liabilities: LiabilitySection::default(),
            assets: AssetSection::default(),
            true_hourly_wage: None,
        }
    }
}

impl UserAggregate {
    pub fn is_current_schema(&self) -> bool {
        self.schema_version == AGGREGATE_SCHEMA_VERSION
    }

    pub fn income_for(&self, month: Month) -> f64 {
        self.income.by_month.get(&month).copied().unwrap_or(0.0)
    }

    pub fn expenses_for(&self, month: Month) -> f64 {
        self.expenses.by_month.get(&month).copied().unwrap_or(0.0)
    }

    pub fn category_spend(&self, month: Month, category: ExpenseCategory) -> f64 {
        self.expenses
            .by_month_category
            .get(&month)
            .and_then(|categories| categories.get(&category))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn recurring_spend(&self, month: Month) -> f64 {
        self.expenses
            .recurring_by_month
            .get(&month)
            .copied()
            .unwrap_or(0.0)
    }

    /// Monday-first weekday totals for `month`, if anything was spent.
    pub fn weekday_spend(&self, month: Month) -> Option<[f64; 7]> {
        self.expenses.weekday_by_month.get(&month).copied()
    }

    /// Months that carry income or expense activity, oldest first.
    pub fn cash_flow_months(&self) -> Vec<Month> {
        let months: BTreeSet<Month> = self
            .income
            .by_month
            .keys()
            .chain(self.expenses.by_month.keys())
            .copied()
            .collect();
        months.into_iter().collect()
    }

    pub fn latest_month(&self) -> Option<Month> {
        self.cash_flow_months().last().copied()
    }

    /// Returns a copy of the requested section.
    pub fn section(&self, section: AggregateSection) -> SectionData {
        match section {
            AggregateSection::Income => SectionData::Income(self.income.clone()),
            AggregateSection::Expenses => SectionData::Expenses(self.expenses.clone()),
            AggregateSection::Liabilities => SectionData::Liabilities(self.liabilities.clone()),
            AggregateSection::Assets => SectionData::Assets(self.assets.clone()),
        }
    }

    /// Replaces one section wholesale.
    pub fn replace_section(&mut self, data: SectionData) {
        match data {
            SectionData::Income(section) => self.income = section,
            SectionData::Expenses(section) => self.expenses = section,
            SectionData::Liabilities(section) => self.liabilities = section,
            SectionData::Assets(section) => self.assets = section,
        }
    }

    /// Checks that every cached amount is finite.
    pub fn validate(&self) -> Result<(), String> {
        let mut amounts: Vec<(&str, f64)> = vec![
            ("income.total", self.income.total),
            ("expenses.total", self.expenses.total),
            ("liabilities.total", self.liabilities.total),
            (
                "liabilities.total_minimum_payment",
                self.liabilities.total_minimum_payment,
            ),
            ("assets.total", self.assets.total),
        ];
        amounts.extend(self.income.by_month.values().map(|v| ("income.by_month", *v)));
        amounts.extend(
            self.expenses
                .by_month
                .values()
                .map(|v| ("expenses.by_month", *v)),
        );
        amounts.extend(
            self.liabilities
                .debts
                .iter()
                .flat_map(|debt| [debt.balance, debt.interest_rate, debt.minimum_payment])
                .map(|v| ("liabilities.debts", v)),
        );
        if let Some(wage) = self.true_hourly_wage {
            amounts.push(("true_hourly_wage", wage));
        }
        match amounts.into_iter().find(|(_, value)| !value.is_finite()) {
            Some((field, value)) => Err(format!("{field} holds non-finite value {value}")),
            None => Ok(()),
        }
    }
}

/// Owned payload of one aggregate section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SectionData {
    Income(IncomeSection),
    Expenses(ExpenseSection),
    Liabilities(LiabilitySection),
    Assets(AssetSection),
}

impl SectionData {
    pub fn kind(&self) -> AggregateSection {
        match self {
            SectionData::Income(_) => AggregateSection::Income,
            SectionData::Expenses(_) => AggregateSection::Expenses,
            SectionData::Liabilities(_) => AggregateSection::Liabilities,
            SectionData::Assets(_) => AggregateSection::Assets,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct IncomeSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_of: Option<DateTime<Utc>>,
    pub total: f64,
    #[serde(default)]
    pub by_month: BTreeMap<Month, f64>,
    #[serde(default)]
    pub by_source: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ExpenseSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_of: Option<DateTime<Utc>>,
    pub total: f64,
    #[serde(default)]
    pub by_month: BTreeMap<Month, f64>,
    #[serde(default)]
    pub by_category: BTreeMap<ExpenseCategory, f64>,
    #[serde(default)]
    pub by_month_category: BTreeMap<Month, BTreeMap<ExpenseCategory, f64>>,
    #[serde(default)]
    pub recurring_by_month: BTreeMap<Month, f64>,
    /// Spend per weekday, Monday first.
    #[serde(default)]
    pub weekday_by_month: BTreeMap<Month, [f64; 7]>,
    /// Share of lifetime spending per category.
    #[serde(default)]
    pub breakdown: Vec<BreakdownItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownItem {
    pub category: ExpenseCategory,
    pub amount: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LiabilitySection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_of: Option<DateTime<Utc>>,
    /// Sum of outstanding balances.
    pub total: f64,
    #[serde(default)]
    pub total_principal: f64,
    #[serde(default)]
    pub total_minimum_payment: f64,
    /// Outstanding balance recorded per month.
    #[serde(default)]
    pub by_month: BTreeMap<Month, f64>,
    #[serde(default)]
    pub debts: Vec<Debt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AssetSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_of: Option<DateTime<Utc>>,
    pub total: f64,
    /// Asset value recorded per month across all buckets.
    #[serde(default)]
    pub by_month: BTreeMap<Month, f64>,
    #[serde(default)]
    pub long_term: AssetBucket,
    #[serde(default)]
    pub savings: SavingsBucket,
    #[serde(default)]
    pub stocks: AssetBucket,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AssetBucket {
    pub total: f64,
    #[serde(default)]
    pub items: Vec<AssetItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetItem {
    pub label: String,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invested: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SavingsBucket {
    pub total: f64,
    #[serde(default)]
    pub goals: Vec<SavingsGoal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsGoal {
    pub goal: String,
    pub current_amount: f64,
    pub target_amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_date: Option<NaiveDate>,
}
