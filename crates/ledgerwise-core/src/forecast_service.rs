use ledgerwise_domain::{
    CashFlowForecast, CashFlowWeek, DefaultReason, Fallback, MetricResult, Month, UserAggregate,
};
use tracing::debug;

use crate::math::{round2, trailing_average};

pub const DEFAULT_LOOKBACK_MONTHS: usize = 3;

/// Share of a month's income landing in each week (paydays in weeks 1, 3 and 4).
const INCOME_WEIGHTS: [f64; 4] = [0.28, 0.0, 0.28, 0.44];
/// Share of a month's expenses per week; rent and bills cluster at month end.
const EXPENSE_WEIGHTS: [f64; 4] = [0.10, 0.20, 0.15, 0.55];

pub struct ForecastService;

impl ForecastService {
    /// Projects the next month as four weeks of income and spending.
    pub fn cash_flow(
        aggregate: &UserAggregate,
        reference: Month,
        lookback: usize,
    ) -> MetricResult<CashFlowForecast> {
        let has_data = |month: Month| {
            aggregate.income.by_month.contains_key(&month)
                || aggregate.expenses.by_month.contains_key(&month)
        };
        let income = trailing_average(&aggregate.income.by_month, reference, lookback, has_data);
        let expenses =
            trailing_average(&aggregate.expenses.by_month, reference, lookback, has_data);

        match (income, expenses) {
            (Some(income), Some(expenses)) if income.is_finite() && expenses.is_finite() => {
                let forecast = Self::split(income, expenses);
                debug!(%reference, income, expenses, "projected cash flow");
                Ok(forecast)
            }
            _ => Err(Fallback::new(DefaultReason::NoData, Self::split(0.0, 0.0))),
        }
    }

    /// Spreads monthly averages over the four weekly buckets.
    pub fn split(monthly_income: f64, monthly_expenses: f64) -> CashFlowForecast {
        let weeks = INCOME_WEIGHTS
            .iter()
            .zip(EXPENSE_WEIGHTS.iter())
            .enumerate()
            .map(|(idx, (income_share, expense_share))| {
                let income = round2(monthly_income * income_share);
                let expenses = round2(monthly_expenses * expense_share);
                CashFlowWeek {
                    label: format!("Week {}", idx + 1),
                    income,
                    expenses,
                    alert: expenses > income,
                }
            })
            .collect();
        CashFlowForecast {
            average_monthly_income: round2(monthly_income),
            average_monthly_expenses: round2(monthly_expenses),
            weeks,
        }
    }

    /// Labels of the weeks whose projected spending exceeds income.
    pub fn deficit_weeks(forecast: &CashFlowForecast) -> Vec<&str> {
        forecast
            .weeks
            .iter()
            .filter(|week| week.alert)
            .map(|week| week.label.as_str())
            .collect()
    }
}
