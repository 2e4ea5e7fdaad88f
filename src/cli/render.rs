//! Plain-text rendering of metric views. Callers add color.

use ledgerwise_domain::{
    BreakdownItem, CashFlowForecast, DebtPlan, DebtStrategy, DefaultReason, FinancialRatio,
    GoalProgress, HealthScore, Insight, MoneyFormat, MonthlyCashFlow, TimeSeries, WeekdaySpend,
};

pub fn ratio_line(ratio: &FinancialRatio) -> String {
    let value = if ratio.available {
        format!("{:.1}%", ratio.value)
    } else {
        "n/a".to_string()
    };
    format!(
        "  {:<14} {:>7}  {:<8} {}",
        ratio.kind.label(),
        value,
        ratio.status.to_string(),
        ratio.kind.description()
    )
}

pub fn health_lines(health: &HealthScore) -> Vec<String> {
    let mut lines = vec![format!(
        "  Score: {:.1} / {:.0}",
        health.score, health.max_score
    )];
    lines.extend(health.components.iter().map(|component| {
        format!(
            "  {:<16} {:>6.1}  (weight {:.0}%)",
            component.name, component.value, component.weight
        )
    }));
    lines
}

pub fn forecast_lines(forecast: &CashFlowForecast, money: &MoneyFormat) -> Vec<String> {
    let mut lines = vec![
        format!(
            "  Average monthly income  : {}",
            money.format(forecast.average_monthly_income)
        ),
        format!(
            "  Average monthly expenses: {}",
            money.format(forecast.average_monthly_expenses)
        ),
    ];
    lines.extend(forecast.weeks.iter().map(|week| {
        let flag = if week.alert { "  deficit" } else { "" };
        format!(
            "  {:<7} in {:>12}  out {:>12}{flag}",
            week.label,
            money.format(week.income),
            money.format(week.expenses)
        )
    }));
    lines
}

pub fn debt_plan_lines(plan: &DebtPlan, money: &MoneyFormat) -> Vec<String> {
    let mut lines = vec![
        format!("  Total debt      : {}", money.format(plan.total_debt)),
        format!("  Monthly payment : {}", money.format(plan.total_monthly_payment)),
        format!("  Minimums only   : {} interest", money.format(plan.baseline_interest)),
    ];
    for strategy in plan.strategies() {
        lines.extend(strategy_lines(strategy, money));
    }
    lines
}

fn strategy_lines(strategy: &DebtStrategy, money: &MoneyFormat) -> Vec<String> {
    let horizon = if strategy.converges {
        format!("{} months", strategy.months_to_freedom)
    } else {
        format!("not paid off within {} months", strategy.months_to_freedom)
    };
    let order: Vec<&str> = strategy.order.iter().map(|debt| debt.name.as_str()).collect();
    vec![
        format!(
            "  {:<9} {horizon}, interest {}, saves {}",
            strategy.kind.to_string(),
            money.format(strategy.total_interest),
            money.format(strategy.interest_saved)
        ),
        format!("            order: {}", order.join(" -> ")),
    ]
}

pub fn series_lines(series: &TimeSeries, format_value: impl Fn(f64) -> String) -> Vec<String> {
    series
        .points
        .iter()
        .map(|point| {
            let growth = point
                .growth_rate
                .map(|rate| format!("  ({rate:+.1}%)"))
                .unwrap_or_default();
            format!("  {:<8} {:>14}{growth}", point.label, format_value(point.value))
        })
        .collect()
}

pub fn goal_lines(goals: &[GoalProgress], money: &MoneyFormat) -> Vec<String> {
    goals
        .iter()
        .map(|goal| {
            format!(
                "  {:<20} {} of {}  {:>5.0}%",
                goal.goal,
                money.format(goal.current_amount),
                money.format(goal.target_amount),
                goal.progress * 100.0
            )
        })
        .collect()
}

pub fn breakdown_lines(items: &[BreakdownItem], money: &MoneyFormat) -> Vec<String> {
    items
        .iter()
        .map(|item| {
            format!(
                "  {:<15} {:>12}  {:>5.1}%",
                item.category.label(),
                money.format(item.amount),
                item.percentage
            )
        })
        .collect()
}

pub fn trend_lines(trend: &[MonthlyCashFlow], money: &MoneyFormat) -> Vec<String> {
    trend
        .iter()
        .map(|point| {
            let net = point.income - point.expenses;
            format!(
                "  {} {}  in {:>12}  out {:>12}  net {:>12}",
                point.label,
                point.month.year,
                money.format(point.income),
                money.format(point.expenses),
                money.format(net)
            )
        })
        .collect()
}

/// One row per weekday with a bar scaled to the busiest day.
pub fn weekday_lines(days: &[WeekdaySpend], money: &MoneyFormat) -> Vec<String> {
    const BAR_WIDTH: f64 = 20.0;
    let peak = days.iter().map(|day| day.amount).fold(0.0, f64::max);
    days.iter()
        .map(|day| {
            let width = if peak > 0.0 {
                (day.amount / peak * BAR_WIDTH).round() as usize
            } else {
                0
            };
            format!(
                "  {:<4} {:>12}  {}",
                day.label,
                money.format(day.amount),
                "#".repeat(width)
            )
            .trim_end()
            .to_string()
        })
        .collect()
}

pub fn insight_lines(insights: &[Insight]) -> Vec<String> {
    insights
        .iter()
        .map(|insight| format!("  - {}", insight.message))
        .collect()
}

pub fn default_note(metric: &str, reason: &DefaultReason) -> String {
    format!("{metric}: showing defaults ({reason})")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerwise_domain::{ExpenseCategory, RatioKind, RatioStatus, SeriesPoint};

    #[test]
    fn amounts_follow_the_configured_currency() {
        let items = [BreakdownItem {
            category: ExpenseCategory::Housing,
            amount: 1850.0,
            percentage: 64.6,
        }];
        let euro = breakdown_lines(&items, &MoneyFormat::new("EUR", "de-DE"));
        assert!(euro[0].contains("€1.850,00"), "{}", euro[0]);
        let usd = breakdown_lines(&items, &MoneyFormat::default());
        assert!(usd[0].contains("$1,850.00"));
    }

    #[test]
    fn weekday_bars_scale_to_the_busiest_day() {
        let days: Vec<WeekdaySpend> = [("Mon", 50.0), ("Tue", 0.0), ("Sat", 200.0)]
            .into_iter()
            .map(|(label, amount)| WeekdaySpend {
                label: label.into(),
                amount,
            })
            .collect();
        let lines = weekday_lines(&days, &MoneyFormat::default());
        assert!(lines[0].ends_with(&"#".repeat(5)));
        assert!(lines[1].ends_with("$0.00"));
        assert!(lines[2].ends_with(&"#".repeat(20)));
    }

    #[test]
    fn unavailable_ratios_show_placeholder() {
        let ratio = FinancialRatio {
            kind: RatioKind::DebtRatio,
            value: 0.0,
            status: RatioStatus::Good,
            available: false,
        };
        let line = ratio_line(&ratio);
        assert!(line.contains("Debt Ratio"));
        assert!(line.contains("n/a"));
    }

    #[test]
    fn series_shows_signed_growth() {
        let series = TimeSeries {
            points: vec![
                SeriesPoint {
                    label: "2023".into(),
                    value: 28000.0,
                    growth_rate: None,
                },
                SeriesPoint {
                    label: "2024".into(),
                    value: 35600.0,
                    growth_rate: Some(27.1),
                },
            ],
        };
        let usd = MoneyFormat::default();
        let lines = series_lines(&series, |value| usd.format(value));
        assert!(!lines[0].contains('%'));
        assert!(lines[1].ends_with("(+27.1%)"));
        assert!(lines[1].contains("$35,600.00"));
    }
}
