//! Rule-based observations layered over the calculator outputs.
//!
//! Rules run in a fixed order and each contributes at most one insight per
//! subject, so identical inputs always produce identical output.

use ledgerwise_domain::{
    CashFlowForecast, DebtPlan, ExpenseCategory, Insight, InsightKind, MoneyFormat, Month,
    UserAggregate,
};
use tracing::debug;

use crate::{
    forecast_service::ForecastService,
    math::{percent, round1},
    ratio_service::RatioService,
    wage_service::WageService,
};

const AVERAGE_LOOKBACK_MONTHS: i32 = 3;
const ABOVE_AVERAGE_THRESHOLD: f64 = 10.0;
const TWO_MONTH_GROWTH_THRESHOLD: f64 = 20.0;
/// Typical reduction achieved by renegotiating recurring bills.
const NEGOTIATION_SAVINGS_RATE: f64 = 0.15;

pub struct InsightService;

impl InsightService {
    pub fn generate(
        aggregate: &UserAggregate,
        month: Month,
        cash_flow: &CashFlowForecast,
        debt_plan: Option<&DebtPlan>,
        money: &MoneyFormat,
    ) -> Vec<Insight> {
        let mut insights = Vec::new();
        insights.extend(Self::savings_trend(aggregate, month));
        insights.extend(Self::categories_above_average(aggregate, month));
        insights.extend(Self::category_growth(aggregate, month));
        insights.extend(Self::recurring_share(aggregate, month));
        insights.extend(Self::bill_negotiation(aggregate, month, money));
        insights.extend(Self::work_hours(aggregate, month));
        insights.extend(Self::portfolio_performance(aggregate, money));
        insights.extend(debt_plan.and_then(|plan| Self::debt_priority(plan, money)));
        insights.extend(Self::cash_flow_deficit(cash_flow));
        debug!(%month, count = insights.len(), "generated insights");
        insights
    }

    fn savings_trend(aggregate: &UserAggregate, month: Month) -> Option<Insight> {
        let previous = month.previous();
        if aggregate.income_for(month) == 0.0 || aggregate.income_for(previous) == 0.0 {
            return None;
        }
        let rate = |m| {
            RatioService::financial_ratios(aggregate, m)
                .ok()
                .map(|ratios| ratios.savings_rate.value)
        };
        let delta = round1(rate(month)? - rate(previous)?);
        let message = if delta > 0.0 {
            format!("Your savings rate is improving - up {delta:.1}% from last month")
        } else if delta < 0.0 {
            format!(
                "Your savings rate has slipped - down {:.1}% from last month",
                delta.abs()
            )
        } else {
            return None;
        };
        Some(Insight {
            kind: InsightKind::SavingsTrend,
            message,
        })
    }

    fn categories_above_average(aggregate: &UserAggregate, month: Month) -> Vec<Insight> {
        let history: Vec<Month> = (1..=AVERAGE_LOOKBACK_MONTHS)
            .map(|offset| month.shift(-offset))
            .filter(|m| aggregate.expenses.by_month.contains_key(m))
            .collect();
        if history.is_empty() {
            return Vec::new();
        }

        ExpenseCategory::ALL
            .into_iter()
            .filter_map(|category| {
                let current = aggregate.category_spend(month, category);
                let average = history
                    .iter()
                    .map(|m| aggregate.category_spend(*m, category))
                    .sum::<f64>()
                    / history.len() as f64;
                let delta = percent(current - average, average)?;
                (current > 0.0 && delta >= ABOVE_AVERAGE_THRESHOLD).then(|| Insight {
                    kind: InsightKind::CategoryAboveAverage,
                    message: format!(
                        "You spent {delta:.0}% more on {} this month compared to your 3-month average",
                        Self::prose(category)
                    ),
                })
            })
            .collect()
    }

    fn category_growth(aggregate: &UserAggregate, month: Month) -> Vec<Insight> {
        let base_month = month.shift(-2);
        ExpenseCategory::ALL
            .into_iter()
            .filter_map(|category| {
                let base = aggregate.category_spend(base_month, category);
                let current = aggregate.category_spend(month, category);
                let growth = percent(current - base, base)?;
                (growth >= TWO_MONTH_GROWTH_THRESHOLD).then(|| Insight {
                    kind: InsightKind::CategoryGrowth,
                    message: format!(
                        "Consider setting a budget for {} as it has increased {growth:.0}% over the last two months",
                        Self::prose(category)
                    ),
                })
            })
            .collect()
    }

    fn recurring_share(aggregate: &UserAggregate, month: Month) -> Option<Insight> {
        let recurring = aggregate.recurring_spend(month);
        if recurring <= 0.0 {
            return None;
        }
        let share = percent(recurring, aggregate.expenses_for(month))?;
        Some(Insight {
            kind: InsightKind::RecurringShare,
            message: format!(
                "Recurring subscriptions make up {share:.1}% of your monthly expenses"
            ),
        })
    }

    fn bill_negotiation(
        aggregate: &UserAggregate,
        month: Month,
        money: &MoneyFormat,
    ) -> Option<Insight> {
        let recurring = aggregate.recurring_spend(month);
        if recurring <= 0.0 || !recurring.is_finite() {
            return None;
        }
        let yearly = (recurring * 12.0 * NEGOTIATION_SAVINGS_RATE).round();
        Some(Insight {
            kind: InsightKind::BillNegotiation,
            message: format!(
                "You could save approximately {}/year by negotiating your recurring bills",
                money.format_whole(yearly)
            ),
        })
    }

    fn work_hours(aggregate: &UserAggregate, month: Month) -> Option<Insight> {
        let wage = aggregate.true_hourly_wage?;
        let (category, amount) = ExpenseCategory::ALL
            .into_iter()
            .map(|category| (category, aggregate.category_spend(month, category)))
            .filter(|(_, amount)| *amount > 0.0)
            .fold(None, |best: Option<(ExpenseCategory, f64)>, candidate| match best {
                Some(best) if best.1 >= candidate.1 => Some(best),
                _ => Some(candidate),
            })?;
        let hours = WageService::hours_to_afford(amount, wage)?;
        Some(Insight {
            kind: InsightKind::WorkHours,
            message: format!(
                "Your {} spending this month took {hours:.1} hours of work at your true hourly wage",
                Self::prose(category)
            ),
        })
    }

    /// Return of stock holdings with a known cost basis.
    fn portfolio_performance(aggregate: &UserAggregate, money: &MoneyFormat) -> Option<Insight> {
        let (invested, value) = aggregate
            .assets
            .stocks
            .items
            .iter()
            .filter_map(|item| item.invested.map(|invested| (invested, item.amount)))
            .filter(|(invested, _)| *invested > 0.0)
            .fold((0.0, 0.0), |(invested, value), (cost, current)| {
                (invested + cost, value + current)
            });
        let change = round1(percent(value - invested, invested)?);
        let direction = if change > 0.0 {
            "up"
        } else if change < 0.0 {
            "down"
        } else {
            return None;
        };
        Some(Insight {
            kind: InsightKind::PortfolioPerformance,
            message: format!(
                "Your investment portfolio is {direction} {:.1}% on the {} you invested",
                change.abs(),
                money.format_whole(invested)
            ),
        })
    }

    fn debt_priority(plan: &DebtPlan, money: &MoneyFormat) -> Option<Insight> {
        let target = plan.avalanche.order.first()?;
        let message = if plan.avalanche.interest_saved > 0.0 {
            format!(
                "Focus extra payments on {} ({:.1}% APR) first - the avalanche plan saves about {} in interest",
                target.name,
                target.interest_rate,
                money.format_whole(plan.avalanche.interest_saved)
            )
        } else {
            format!(
                "Focus extra payments on {} ({:.1}% APR) first",
                target.name, target.interest_rate
            )
        };
        Some(Insight {
            kind: InsightKind::DebtPriority,
            message,
        })
    }

    fn cash_flow_deficit(forecast: &CashFlowForecast) -> Option<Insight> {
        let weeks = ForecastService::deficit_weeks(forecast);
        if weeks.is_empty() {
            return None;
        }
        Some(Insight {
            kind: InsightKind::CashFlowDeficit,
            message: format!(
                "Expenses are projected to exceed income in {}",
                weeks.join(", ")
            ),
        })
    }

    fn prose(category: ExpenseCategory) -> String {
        category.label().to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerwise_domain::{AssetItem, Debt};

    use crate::debt_service::DebtService;

    fn month(m: u32) -> Month {
        Month::new(2024, m).unwrap()
    }

    fn spend(aggregate: &mut UserAggregate, m: Month, category: ExpenseCategory, amount: f64) {
        *aggregate
            .expenses
            .by_month_category
            .entry(m)
            .or_default()
            .entry(category)
            .or_default() += amount;
        *aggregate.expenses.by_month.entry(m).or_default() += amount;
    }

    fn kinds(insights: &[Insight]) -> Vec<InsightKind> {
        insights.iter().map(|insight| insight.kind).collect()
    }

    #[test]
    fn savings_trend_reports_delta_against_previous_month() {
        let mut aggregate = UserAggregate::default();
        aggregate.income.by_month.insert(month(5), 1000.0);
        aggregate.income.by_month.insert(month(6), 1000.0);
        spend(&mut aggregate, month(5), ExpenseCategory::Housing, 900.0);
        spend(&mut aggregate, month(6), ExpenseCategory::Housing, 877.0);

        let insights = InsightService::generate(
            &aggregate,
            month(6),
            &ForecastService::split(0.0, 0.0),
            None,
            &MoneyFormat::default(),
        );
        assert_eq!(
            insights[0].message,
            "Your savings rate is improving - up 2.3% from last month"
        );
    }

    #[test]
    fn category_rules_fire_on_thresholds() {
        let mut aggregate = UserAggregate::default();
        spend(&mut aggregate, month(3), ExpenseCategory::Food, 100.0);
        spend(&mut aggregate, month(4), ExpenseCategory::Food, 100.0);
        spend(&mut aggregate, month(5), ExpenseCategory::Food, 100.0);
        spend(&mut aggregate, month(6), ExpenseCategory::Food, 125.0);

        let insights = InsightService::generate(
            &aggregate,
            month(6),
            &ForecastService::split(0.0, 0.0),
            None,
            &MoneyFormat::default(),
        );
        assert_eq!(
            kinds(&insights),
            vec![InsightKind::CategoryAboveAverage, InsightKind::CategoryGrowth]
        );
        assert_eq!(
            insights[0].message,
            "You spent 25% more on food this month compared to your 3-month average"
        );
        assert_eq!(
            insights[1].message,
            "Consider setting a budget for food as it has increased 25% over the last two months"
        );
    }

    #[test]
    fn recurring_bills_yield_share_and_negotiation_estimate() {
        let mut aggregate = UserAggregate::default();
        spend(&mut aggregate, month(6), ExpenseCategory::Entertainment, 1000.0);
        aggregate.expenses.recurring_by_month.insert(month(6), 250.0);

        let insights = InsightService::generate(
            &aggregate,
            month(6),
            &ForecastService::split(0.0, 0.0),
            None,
            &MoneyFormat::default(),
        );
        let messages: Vec<&str> = insights.iter().map(|i| i.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Recurring subscriptions make up 25.0% of your monthly expenses",
                "You could save approximately $450/year by negotiating your recurring bills",
            ]
        );
    }

    #[test]
    fn wage_debt_and_cash_flow_rules_follow_in_order() {
        let mut aggregate = UserAggregate::default();
        aggregate.true_hourly_wage = Some(20.0);
        spend(&mut aggregate, month(6), ExpenseCategory::Housing, 1200.0);
        spend(&mut aggregate, month(6), ExpenseCategory::Food, 300.0);
        let plan = DebtService::strategies(&[
            Debt::new("Credit Card", 4800.0, 18.9, 250.0),
            Debt::new("Car Loan", 12000.0, 5.2, 350.0),
        ])
        .unwrap();
        let forecast = ForecastService::split(1000.0, 2000.0);

        let insights = InsightService::generate(
            &aggregate,
            month(6),
            &forecast,
            Some(&plan),
            &MoneyFormat::default(),
        );
        assert_eq!(
            kinds(&insights),
            vec![
                InsightKind::WorkHours,
                InsightKind::DebtPriority,
                InsightKind::CashFlowDeficit
            ]
        );
        assert!(insights[0].message.contains("housing spending this month took 60.0 hours"));
        assert!(insights[1].message.starts_with("Focus extra payments on Credit Card"));
    }

    #[test]
    fn generation_is_deterministic() {
        let mut aggregate = UserAggregate::default();
        spend(&mut aggregate, month(5), ExpenseCategory::Food, 80.0);
        spend(&mut aggregate, month(6), ExpenseCategory::Food, 200.0);
        let forecast = ForecastService::split(500.0, 900.0);
        let usd = MoneyFormat::default();
        let first = InsightService::generate(&aggregate, month(6), &forecast, None, &usd);
        let second = InsightService::generate(&aggregate, month(6), &forecast, None, &usd);
        assert_eq!(first, second);
    }

    #[test]
    fn portfolio_return_uses_cost_basis_and_currency() {
        let mut aggregate = UserAggregate::default();
        let holding = |label: &str, amount: f64, invested: Option<f64>| AssetItem {
            label: label.into(),
            amount,
            invested,
        };
        aggregate.assets.stocks.items = vec![
            holding("VTI", 1200.0, Some(1000.0)),
            holding("AAPL", 900.0, Some(1000.0)),
            holding("GIFT", 500.0, None),
        ];

        let insights = InsightService::generate(
            &aggregate,
            month(6),
            &ForecastService::split(0.0, 0.0),
            None,
            &MoneyFormat::new("EUR", "de-DE"),
        );
        assert_eq!(kinds(&insights), vec![InsightKind::PortfolioPerformance]);
        assert_eq!(
            insights[0].message,
            "Your investment portfolio is up 5.0% on the €2.000 you invested"
        );

        aggregate.assets.stocks.items[0].amount = 1100.0;
        let flat = InsightService::generate(
            &aggregate,
            month(6),
            &ForecastService::split(0.0, 0.0),
            None,
            &MoneyFormat::default(),
        );
        assert!(flat.is_empty());
    }
}
