use chrono::NaiveDate;
use ledgerwise_domain::{
    BreakdownItem, CashFlowForecast, DebtPlan, DefaultReason, FinancialRatios, GoalProgress,
    Granularity, HealthScore, Insight, MetricResult, MoneyFormat, Month, MonthlyCashFlow,
    TimeSeries, UserAggregate, WeekdaySpend,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    debt_service::DebtService,
    forecast_service::{ForecastService, DEFAULT_LOOKBACK_MONTHS},
    goal_service::GoalService,
    health_service::HealthService,
    history_service::{HistoryService, DEFAULT_SAVINGS_HISTORY_MONTHS, DEFAULT_TREND_MONTHS},
    insight_service::InsightService,
    ratio_service::RatioService,
};

/// Knobs for a dashboard build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSettings {
    pub forecast_lookback_months: usize,
    pub savings_history_months: usize,
    /// Months in the income-vs-expenses trend.
    pub trend_months: usize,
    pub net_worth_granularity: Granularity,
    pub extra_debt_payment: f64,
    /// Month to report on; defaults to the latest month with activity.
    pub month: Option<Month>,
    pub money: MoneyFormat,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            forecast_lookback_months: DEFAULT_LOOKBACK_MONTHS,
            savings_history_months: DEFAULT_SAVINGS_HISTORY_MONTHS,
            trend_months: DEFAULT_TREND_MONTHS,
            net_worth_granularity: Granularity::Yearly,
            extra_debt_payment: 0.0,
            month: None,
            money: MoneyFormat::default(),
        }
    }
}

/// Every derived view for one user and month.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub month: Month,
    pub ratios: FinancialRatios,
    pub health: HealthScore,
    pub cash_flow: CashFlowForecast,
    pub debt_plan: Option<DebtPlan>,
    pub savings_history: TimeSeries,
    pub cash_flow_trend: Vec<MonthlyCashFlow>,
    pub weekday_spending: Vec<WeekdaySpend>,
    pub net_worth: TimeSeries,
    pub goals: Vec<GoalProgress>,
    pub breakdown: Vec<BreakdownItem>,
    pub insights: Vec<Insight>,
    /// Metrics that fell back to their defaults, with the reason.
    pub defaults: Vec<(String, DefaultReason)>,
}

pub struct DashboardService;

impl DashboardService {
    /// Runs every calculator and the insight rules. Always returns a dashboard.
    pub fn build(
        aggregate: &UserAggregate,
        today: NaiveDate,
        settings: &DashboardSettings,
    ) -> Dashboard {
        let month = settings
            .month
            .or_else(|| aggregate.latest_month())
            .unwrap_or_else(|| Month::of(today));
        let mut defaults = Vec::new();

        let ratios = settle(
            "ratios",
            RatioService::financial_ratios(aggregate, month),
            &mut defaults,
        );
        let health = settle(
            "health",
            HealthService::health_score(aggregate, month),
            &mut defaults,
        );
        let cash_flow = settle(
            "cash_flow",
            ForecastService::cash_flow(aggregate, month, settings.forecast_lookback_months),
            &mut defaults,
        );
        let debt_plan = match DebtService::plan_for(aggregate, settings.extra_debt_payment) {
            Ok(plan) => Some(plan),
            Err(fallback) if fallback.reason == DefaultReason::NoDebts => None,
            Err(fallback) => {
                defaults.push(("debts".to_string(), fallback.reason));
                Some(fallback.value)
            }
        };
        let savings_history = settle(
            "savings_history",
            HistoryService::savings_rate_history(aggregate, settings.savings_history_months),
            &mut defaults,
        );
        let cash_flow_trend = settle(
            "cash_flow_trend",
            HistoryService::income_expense_trend(aggregate, month, settings.trend_months),
            &mut defaults,
        );
        let weekday_spending = settle(
            "weekday_spending",
            HistoryService::weekday_spending(aggregate, month),
            &mut defaults,
        );
        let net_worth = settle(
            "net_worth",
            HistoryService::net_worth_growth(aggregate, today, settings.net_worth_granularity),
            &mut defaults,
        );
        let insights = InsightService::generate(
            aggregate,
            month,
            &cash_flow,
            debt_plan.as_ref(),
            &settings.money,
        );

        debug!(%month, defaults = defaults.len(), insights = insights.len(), "built dashboard");
        Dashboard {
            month,
            ratios,
            health,
            cash_flow,
            debt_plan,
            savings_history,
            cash_flow_trend,
            weekday_spending,
            net_worth,
            goals: GoalService::progress(aggregate),
            breakdown: aggregate.expenses.breakdown.clone(),
            insights,
            defaults,
        }
    }
}

fn settle<T>(
    name: &str,
    result: MetricResult<T>,
    defaults: &mut Vec<(String, DefaultReason)>,
) -> T {
    match result {
        Ok(value) => value,
        Err(fallback) => {
            debug!(metric = name, reason = %fallback.reason, "metric fell back to default");
            defaults.push((name.to_string(), fallback.reason));
            fallback.value
        }
    }
}
