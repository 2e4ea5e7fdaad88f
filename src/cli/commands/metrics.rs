use ledgerwise_core::{Dashboard, DebtService, ForecastService, HistoryService};
use ledgerwise_domain::{
    DefaultReason, FinancialRatio, Granularity, MetricResultExt, MoneyFormat, Month, RatioStatus,
};

use crate::cli::core::{
    invalid, optional_month, parse_amount, parse_month, CommandError, CommandResult, ShellContext,
};
use crate::cli::output::{self, MessageKind};
use crate::cli::registry::CommandEntry;
use crate::cli::render;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "dashboard",
            "Show every metric for a month",
            "dashboard [YYYY-MM]",
            cmd_dashboard,
        ),
        CommandEntry::new(
            "ratios",
            "Savings, expense, housing and debt ratios",
            "ratios [YYYY-MM]",
            cmd_ratios,
        ),
        CommandEntry::new(
            "health",
            "Financial health score and its components",
            "health [YYYY-MM]",
            cmd_health,
        ),
        CommandEntry::new(
            "forecast",
            "Four-week cash-flow forecast",
            "forecast [YYYY-MM]",
            cmd_forecast,
        ),
        CommandEntry::new(
            "debts",
            "Avalanche and snowball payoff plans",
            "debts [extra-monthly-payment]",
            cmd_debts,
        ),
        CommandEntry::new(
            "history",
            "Monthly savings-rate history",
            "history [months]",
            cmd_history,
        ),
        CommandEntry::new(
            "trend",
            "Income against expenses over recent months",
            "trend [months] [YYYY-MM]",
            cmd_trend,
        ),
        CommandEntry::new(
            "weekdays",
            "Spending by day of the week for a month",
            "weekdays [YYYY-MM]",
            cmd_weekdays,
        ),
        CommandEntry::new(
            "networth",
            "Cumulative net worth with growth rates",
            "networth [monthly|yearly]",
            cmd_networth,
        ),
        CommandEntry::new("goals", "Savings goal progress", "goals", cmd_goals),
        CommandEntry::new(
            "insights",
            "Personalized observations for a month",
            "insights [YYYY-MM]",
            cmd_insights,
        ),
        CommandEntry::new(
            "breakdown",
            "Spending by category across all months",
            "breakdown",
            cmd_breakdown,
        ),
    ]
}

fn cmd_dashboard(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let dashboard = context.app.dashboard(optional_month(args)?)?;
    let money = context.app.money_format();

    output::section(format!("Dashboard for {} ({})", context.app.user(), dashboard.month));
    print_ratios(&dashboard);
    output::section("Health");
    output::lines(render::health_lines(&dashboard.health));
    print_forecast(&dashboard, &money);
    output::section("Debts");
    match &dashboard.debt_plan {
        Some(plan) => output::lines(render::debt_plan_lines(plan, &money)),
        None => output::info("No debts recorded."),
    }
    output::section("Savings rate history");
    output::lines(render::series_lines(&dashboard.savings_history, |rate| {
        format!("{rate:.1}%")
    }));
    output::section("Income vs expenses");
    output::lines(render::trend_lines(&dashboard.cash_flow_trend, &money));
    output::section("Spending by weekday");
    output::lines(render::weekday_lines(&dashboard.weekday_spending, &money));
    output::section("Net worth");
    output::lines(render::series_lines(&dashboard.net_worth, |value| {
        money.format(value)
    }));
    print_goals(&dashboard, &money);
    print_breakdown(&dashboard, &money);
    print_insights(&dashboard);

    for (metric, reason) in &dashboard.defaults {
        output::hint(render::default_note(metric, reason));
    }
    Ok(())
}

fn cmd_ratios(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let dashboard = context.app.dashboard(optional_month(args)?)?;
    output::section(format!("Financial ratios for {}", dashboard.month));
    print_ratios(&dashboard);
    print_defaults(&dashboard, &["ratios"]);
    Ok(())
}

fn cmd_health(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let dashboard = context.app.dashboard(optional_month(args)?)?;
    output::section(format!("Financial health for {}", dashboard.month));
    output::lines(render::health_lines(&dashboard.health));
    print_defaults(&dashboard, &["health"]);
    Ok(())
}

fn cmd_forecast(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let dashboard = context.app.dashboard(optional_month(args)?)?;
    print_forecast(&dashboard, &context.app.money_format());
    print_defaults(&dashboard, &["cash_flow"]);
    Ok(())
}

fn cmd_debts(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let extra = match args {
        [] => context.app.config().metrics.extra_debt_payment,
        [amount] => parse_amount(amount)?,
        _ => return Err(invalid("usage: debts [extra-monthly-payment]")),
    };
    if extra < 0.0 {
        return Err(invalid("extra payment must not be negative"));
    }

    let aggregate = context.app.aggregate()?;
    let result = DebtService::plan_for(&aggregate, extra);
    if result.default_reason() == Some(&DefaultReason::NoDebts) {
        output::info("No debts recorded.");
        return Ok(());
    }
    if let Some(reason) = result.default_reason() {
        output::warning(render::default_note("debts", reason));
    }
    let plan = result.value();
    let money = context.app.money_format();

    output::section(format!("Debt payoff plans (extra {}/month)", money.format(extra)));
    output::lines(render::debt_plan_lines(&plan, &money));
    Ok(())
}

fn cmd_history(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let months = match args {
        [] => context.app.config().metrics.savings_history_months,
        [count] => parse_month_count(count)?,
        _ => return Err(invalid("usage: history [months]")),
    };

    let aggregate = context.app.aggregate()?;
    let result = HistoryService::savings_rate_history(&aggregate, months);
    if let Some(reason) = result.default_reason() {
        output::hint(render::default_note("savings_history", reason));
    }
    output::section("Savings rate history");
    output::lines(render::series_lines(&result.value(), |rate| {
        format!("{rate:.1}%")
    }));
    Ok(())
}

fn cmd_trend(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (months, month) = match args {
        [] => (context.app.config().metrics.trend_months, None),
        [count] if !count.contains('-') => (parse_month_count(count)?, None),
        [month] => (
            context.app.config().metrics.trend_months,
            Some(parse_month(month)?),
        ),
        [count, month] => (parse_month_count(count)?, Some(parse_month(month)?)),
        _ => return Err(invalid("usage: trend [months] [YYYY-MM]")),
    };
    let aggregate = context.app.aggregate()?;
    let month = month
        .or_else(|| aggregate.latest_month())
        .unwrap_or_else(|| Month::of(context.app.today()));

    let result = HistoryService::income_expense_trend(&aggregate, month, months);
    if let Some(reason) = result.default_reason() {
        output::hint(render::default_note("cash_flow_trend", reason));
    }
    output::section(format!("Income vs expenses through {month}"));
    output::lines(render::trend_lines(&result.value(), &context.app.money_format()));
    Ok(())
}

fn cmd_weekdays(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let dashboard = context.app.dashboard(optional_month(args)?)?;
    output::section(format!("Spending by weekday for {}", dashboard.month));
    output::lines(render::weekday_lines(
        &dashboard.weekday_spending,
        &context.app.money_format(),
    ));
    print_defaults(&dashboard, &["weekday_spending"]);
    Ok(())
}

fn cmd_networth(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let granularity = match args {
        [] => context.app.config().metrics.net_worth_granularity,
        [raw] => match raw.to_lowercase().as_str() {
            "monthly" | "month" => Granularity::Monthly,
            "yearly" | "year" => Granularity::Yearly,
            _ => return Err(invalid(format!("unknown granularity `{raw}`"))),
        },
        _ => return Err(invalid("usage: networth [monthly|yearly]")),
    };

    let aggregate = context.app.aggregate()?;
    let result = HistoryService::net_worth_growth(&aggregate, context.app.today(), granularity);
    if let Some(reason) = result.default_reason() {
        output::hint(render::default_note("net_worth", reason));
    }
    output::section("Net worth");
    let money = context.app.money_format();
    output::lines(render::series_lines(&result.value(), |value| money.format(value)));
    Ok(())
}

fn cmd_goals(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    if !args.is_empty() {
        return Err(invalid("usage: goals"));
    }
    let dashboard = context.app.dashboard(None)?;
    print_goals(&dashboard, &context.app.money_format());
    Ok(())
}

fn cmd_insights(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let dashboard = context.app.dashboard(optional_month(args)?)?;
    print_insights(&dashboard);
    Ok(())
}

fn cmd_breakdown(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    if !args.is_empty() {
        return Err(invalid("usage: breakdown"));
    }
    let dashboard = context.app.dashboard(None)?;
    print_breakdown(&dashboard, &context.app.money_format());
    Ok(())
}

fn parse_month_count(raw: &str) -> Result<usize, CommandError> {
    raw.parse::<usize>()
        .ok()
        .filter(|count| *count > 0)
        .ok_or_else(|| invalid(format!("invalid month count `{raw}`")))
}

fn print_ratios(dashboard: &Dashboard) {
    for ratio in dashboard.ratios.all() {
        print_ratio(ratio);
    }
}

fn print_ratio(ratio: &FinancialRatio) {
    let line = render::ratio_line(ratio);
    match (ratio.available, ratio.status) {
        (false, _) => output::line(line),
        (true, RatioStatus::Good) => output::print(MessageKind::Success, line.trim_start()),
        (true, RatioStatus::Warning) => output::print(MessageKind::Warning, line.trim_start()),
        (true, RatioStatus::Bad) => output::print(MessageKind::Error, line.trim_start()),
    }
}

fn print_forecast(dashboard: &Dashboard, money: &MoneyFormat) {
    output::section("Cash-flow forecast");
    output::lines(render::forecast_lines(&dashboard.cash_flow, money));
    let deficits = ForecastService::deficit_weeks(&dashboard.cash_flow);
    if !deficits.is_empty() {
        output::warning(format!(
            "Expenses are projected to exceed income in {}",
            deficits.join(", ")
        ));
    }
}

fn print_goals(dashboard: &Dashboard, money: &MoneyFormat) {
    output::section("Savings goals");
    if dashboard.goals.is_empty() {
        output::info("No savings goals recorded.");
    } else {
        output::lines(render::goal_lines(&dashboard.goals, money));
    }
}

fn print_breakdown(dashboard: &Dashboard, money: &MoneyFormat) {
    output::section("Spending by category");
    if dashboard.breakdown.is_empty() {
        output::info("No expenses recorded.");
    } else {
        output::lines(render::breakdown_lines(&dashboard.breakdown, money));
    }
}

fn print_insights(dashboard: &Dashboard) {
    output::section(format!("Insights for {}", dashboard.month));
    if dashboard.insights.is_empty() {
        output::info("Nothing notable yet. Record a few more transactions.");
    } else {
        output::lines(render::insight_lines(&dashboard.insights));
    }
}

fn print_defaults(dashboard: &Dashboard, metrics: &[&str]) {
    for (metric, reason) in &dashboard.defaults {
        if metrics.contains(&metric.as_str()) {
            output::hint(render::default_note(metric, reason));
        }
    }
}
