//! Monthly financial ratios with traffic-light classification.

use ledgerwise_domain::{
    DefaultReason, ExpenseCategory, Fallback, FinancialRatio, FinancialRatios, MetricResult, Month,
    RatioKind, RatioStatus, UserAggregate,
};
use tracing::debug;

use crate::math::{percent, round1};

pub struct RatioService;

impl RatioService {
    /// Computes savings, expense, housing and debt ratios for `month`.
    ///
    /// A zero denominator yields a 0% sentinel with `available = false`; a month
    /// without income is reported as a [`DefaultReason::NoIncome`] fallback.
    pub fn financial_ratios(
        aggregate: &UserAggregate,
        month: Month,
    ) -> MetricResult<FinancialRatios> {
        if let Err(detail) = aggregate.validate() {
            return Err(Fallback::new(
                DefaultReason::MalformedAggregate(detail),
                Self::empty(month),
            ));
        }

        let income = aggregate.income_for(month);
        let expenses = aggregate.expenses_for(month);
        let housing = aggregate.category_spend(month, ExpenseCategory::Housing);
        let debt_service = aggregate.liabilities.total_minimum_payment;

        let ratios = FinancialRatios {
            month,
            savings_rate: Self::ratio(RatioKind::SavingsRate, percent(income - expenses, income)),
            expense_ratio: Self::ratio(RatioKind::ExpenseRatio, percent(expenses, income)),
            housing_ratio: Self::ratio(RatioKind::HousingRatio, percent(housing, expenses)),
            debt_ratio: Self::ratio(RatioKind::DebtRatio, percent(debt_service, income)),
        };
        debug!(
            %month,
            income,
            expenses,
            savings_rate = ratios.savings_rate.value,
            "computed ratios"
        );

        if income == 0.0 {
            return Err(Fallback::new(DefaultReason::NoIncome, ratios));
        }
        Ok(ratios)
    }

    /// Classifies a rounded percentage against the per-ratio thresholds.
    pub fn classify(kind: RatioKind, value: f64) -> RatioStatus {
        match kind {
            RatioKind::SavingsRate => {
                if value >= 10.0 {
                    RatioStatus::Good
                } else if value >= 5.0 {
                    RatioStatus::Warning
                } else {
                    RatioStatus::Bad
                }
            }
            RatioKind::ExpenseRatio => Self::upper_bound(value, 80.0, 90.0),
            RatioKind::HousingRatio => Self::upper_bound(value, 30.0, 40.0),
            RatioKind::DebtRatio => Self::upper_bound(value, 20.0, 30.0),
        }
    }

    fn upper_bound(value: f64, good: f64, warning: f64) -> RatioStatus {
        if value <= good {
            RatioStatus::Good
        } else if value <= warning {
            RatioStatus::Warning
        } else {
            RatioStatus::Bad
        }
    }

    fn ratio(kind: RatioKind, raw: Option<f64>) -> FinancialRatio {
        let value = raw.map(round1).unwrap_or(0.0);
        FinancialRatio {
            kind,
            value,
            status: Self::classify(kind, value),
            available: raw.is_some(),
        }
    }

    fn empty(month: Month) -> FinancialRatios {
        FinancialRatios {
            month,
            savings_rate: Self::ratio(RatioKind::SavingsRate, None),
            expense_ratio: Self::ratio(RatioKind::ExpenseRatio, None),
            housing_ratio: Self::ratio(RatioKind::HousingRatio, None),
            debt_ratio: Self::ratio(RatioKind::DebtRatio, None),
        }
    }
}
