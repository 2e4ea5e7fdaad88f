//! Derived metric shapes. Computed on demand, never persisted.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::Month;

/// Why a calculator substituted its documented default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefaultReason {
    NoIncome,
    NoExpenses,
    NoData,
    NoDebts,
    NonConvergingDebts,
    MalformedAggregate(String),
}

impl fmt::Display for DefaultReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultReason::NoIncome => f.write_str("no income recorded"),
            DefaultReason::NoExpenses => f.write_str("no expenses recorded"),
            DefaultReason::NoData => f.write_str("not enough data"),
            DefaultReason::NoDebts => f.write_str("no debts recorded"),
            DefaultReason::NonConvergingDebts => {
                f.write_str("payments do not cover accruing interest")
            }
            DefaultReason::MalformedAggregate(detail) => {
                write!(f, "aggregate could not be read: {detail}")
            }
        }
    }
}

/// A default value paired with the reason it was used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fallback<T> {
    pub reason: DefaultReason,
    pub value: T,
}

impl<T> Fallback<T> {
    pub fn new(reason: DefaultReason, value: T) -> Self {
        Self { reason, value }
    }
}

/// Calculator output: either the computed metric or an embedded default.
pub type MetricResult<T> = Result<T, Fallback<T>>;

pub trait MetricResultExt<T> {
    /// Returns the computed value, or the default carried by the fallback.
    fn value(self) -> T;

    fn default_reason(&self) -> Option<&DefaultReason>;
}

impl<T> MetricResultExt<T> for MetricResult<T> {
    fn value(self) -> T {
        match self {
            Ok(value) => value,
            Err(fallback) => fallback.value,
        }
    }

    fn default_reason(&self) -> Option<&DefaultReason> {
        self.as_ref().err().map(|fallback| &fallback.reason)
    }
}

/// Traffic-light classification for a ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatioStatus {
    Good,
    Warning,
    Bad,
}

impl fmt::Display for RatioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RatioStatus::Good => "good",
            RatioStatus::Warning => "warning",
            RatioStatus::Bad => "bad",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RatioKind {
    SavingsRate,
    ExpenseRatio,
    HousingRatio,
    DebtRatio,
}

impl RatioKind {
    pub fn label(self) -> &'static str {
        match self {
            RatioKind::SavingsRate => "Savings Rate",
            RatioKind::ExpenseRatio => "Expense Ratio",
            RatioKind::HousingRatio => "Housing Cost",
            RatioKind::DebtRatio => "Debt Ratio",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            RatioKind::SavingsRate => "Percentage of income saved",
            RatioKind::ExpenseRatio => "Expenses as percentage of income",
            RatioKind::HousingRatio => "Housing as percentage of expenses",
            RatioKind::DebtRatio => "Debt payments as percentage of income",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialRatio {
    pub kind: RatioKind,
    /// Percentage rounded to one decimal.
    pub value: f64,
    pub status: RatioStatus,
    /// `false` when the denominator was zero and `value` is the 0% sentinel.
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialRatios {
    pub month: Month,
    pub savings_rate: FinancialRatio,
    pub expense_ratio: FinancialRatio,
    pub housing_ratio: FinancialRatio,
    pub debt_ratio: FinancialRatio,
}

impl FinancialRatios {
    pub fn all(&self) -> [&FinancialRatio; 4] {
        [
            &self.savings_rate,
            &self.expense_ratio,
            &self.housing_ratio,
            &self.debt_ratio,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthScoreComponent {
    pub name: String,
    pub value: f64,
    /// Weight in percent.
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthScore {
    pub score: f64,
    pub max_score: f64,
    pub components: Vec<HealthScoreComponent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowWeek {
    pub label: String,
    pub income: f64,
    pub expenses: f64,
    pub alert: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowForecast {
    pub average_monthly_income: f64,
    pub average_monthly_expenses: f64,
    pub weeks: Vec<CashFlowWeek>,
}

/// A debt as fed into the payoff planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Debt {
    pub name: String,
    pub balance: f64,
    /// Annual percentage rate.
    pub interest_rate: f64,
    pub minimum_payment: f64,
}

impl Debt {
    pub fn new(
        name: impl Into<String>,
        balance: f64,
        interest_rate: f64,
        minimum_payment: f64,
    ) -> Self {
        Self {
            name: name.into(),
            balance,
            interest_rate,
            minimum_payment,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DebtStrategyKind {
    Avalanche,
    Snowball,
}

impl fmt::Display for DebtStrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DebtStrategyKind::Avalanche => "Avalanche",
            DebtStrategyKind::Snowball => "Snowball",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtStrategy {
    pub kind: DebtStrategyKind,
    pub months_to_freedom: u32,
    pub total_interest: f64,
    pub interest_saved: f64,
    /// `false` when the simulation hit the month cap before clearing every balance.
    pub converges: bool,
    /// Debts in payoff priority order.
    pub order: Vec<Debt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtPlan {
    pub total_debt: f64,
    pub total_monthly_payment: f64,
    pub baseline_interest: f64,
    pub avalanche: DebtStrategy,
    pub snowball: DebtStrategy,
}

impl DebtPlan {
    pub fn strategies(&self) -> [&DebtStrategy; 2] {
        [&self.avalanche, &self.snowball]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub label: String,
    pub value: f64,
    /// Percent change from the previous point; `None` for the first point.
    pub growth_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TimeSeries {
    pub points: Vec<SeriesPoint>,
}

impl TimeSeries {
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|point| point.value).collect()
    }

    pub fn growth_rates(&self) -> Vec<Option<f64>> {
        self.points.iter().map(|point| point.growth_rate).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Monthly,
    #[default]
    Yearly,
}

/// Income against expenses for one month of the trend chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyCashFlow {
    pub month: Month,
    pub label: String,
    pub income: f64,
    pub expenses: f64,
}

pub const WEEKDAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekdaySpend {
    pub label: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalProgress {
    pub goal: String,
    pub current_amount: f64,
    pub target_amount: f64,
    /// Completed fraction in [0, 1].
    pub progress: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsightKind {
    SavingsTrend,
    CategoryAboveAverage,
    CategoryGrowth,
    RecurringShare,
    BillNegotiation,
    WorkHours,
    PortfolioPerformance,
    DebtPriority,
    CashFlowDeficit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub message: String,
}
