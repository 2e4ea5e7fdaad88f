use std::collections::BTreeMap;

use chrono::NaiveDate;
use ledgerwise_domain::{
    DefaultReason, Fallback, Granularity, MetricResult, Month, MonthlyCashFlow, SeriesPoint,
    TimeSeries, UserAggregate, WeekdaySpend, WEEKDAY_LABELS,
};
use tracing::debug;

use crate::math::{growth_rates, percent, round1, round2};

pub const DEFAULT_SAVINGS_HISTORY_MONTHS: usize = 6;
pub const DEFAULT_TREND_MONTHS: usize = 6;

/// Reporting bucket for net-worth points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Period {
    Month(Month),
    Year(i32),
}

impl Period {
    fn of(month: Month, granularity: Granularity) -> Self {
        match granularity {
            Granularity::Monthly => Period::Month(month),
            Granularity::Yearly => Period::Year(month.year),
        }
    }

    fn next(self) -> Self {
        match self {
            Period::Month(month) => Period::Month(month.next()),
            Period::Year(year) => Period::Year(year + 1),
        }
    }

    fn label(self) -> String {
        match self {
            Period::Month(month) => month.to_string(),
            Period::Year(year) => year.to_string(),
        }
    }
}

pub struct HistoryService;

impl HistoryService {
    /// Savings rate for the most recent `limit` months with cash-flow activity.
    pub fn savings_rate_history(
        aggregate: &UserAggregate,
        limit: usize,
    ) -> MetricResult<TimeSeries> {
        let months = aggregate.cash_flow_months();
        let start = months.len().saturating_sub(limit);
        let values: Vec<(String, f64)> = months[start..]
            .iter()
            .map(|month| {
                let income = aggregate.income_for(*month);
                let expenses = aggregate.expenses_for(*month);
                let rate = percent(income - expenses, income).map(round1).unwrap_or(0.0);
                (month.to_string(), rate)
            })
            .collect();
        if values.is_empty() {
            return Err(Fallback::new(DefaultReason::NoData, TimeSeries::default()));
        }
        Ok(Self::series(values))
    }

    /// Income and expenses for the `count` months ending at `month`, quiet
    /// months included as zeros.
    pub fn income_expense_trend(
        aggregate: &UserAggregate,
        month: Month,
        count: usize,
    ) -> MetricResult<Vec<MonthlyCashFlow>> {
        let trend: Vec<MonthlyCashFlow> = month
            .trailing(count)
            .into_iter()
            .map(|m| MonthlyCashFlow {
                month: m,
                label: m.short_label().to_string(),
                income: aggregate.income_for(m),
                expenses: aggregate.expenses_for(m),
            })
            .collect();
        if trend.iter().all(|point| point.income == 0.0 && point.expenses == 0.0) {
            return Err(Fallback::new(DefaultReason::NoData, trend));
        }
        Ok(trend)
    }

    /// Spending in `month` per weekday, Monday first.
    pub fn weekday_spending(
        aggregate: &UserAggregate,
        month: Month,
    ) -> MetricResult<Vec<WeekdaySpend>> {
        let days = aggregate.weekday_spend(month);
        let spend = WEEKDAY_LABELS
            .iter()
            .enumerate()
            .map(|(idx, label)| WeekdaySpend {
                label: label.to_string(),
                amount: days.map(|days| days[idx]).unwrap_or(0.0),
            })
            .collect();
        match days {
            Some(_) => Ok(spend),
            None => Err(Fallback::new(DefaultReason::NoExpenses, spend)),
        }
    }

    /// Net worth at the end of each period, from the first recorded period
    /// through the one containing `today`.
    pub fn net_worth_growth(
        aggregate: &UserAggregate,
        today: NaiveDate,
        granularity: Granularity,
    ) -> MetricResult<TimeSeries> {
        let mut deltas: BTreeMap<Period, f64> = BTreeMap::new();
        for (month, value) in &aggregate.assets.by_month {
            *deltas.entry(Period::of(*month, granularity)).or_default() += value;
        }
        for (month, value) in &aggregate.liabilities.by_month {
            *deltas.entry(Period::of(*month, granularity)).or_default() -= value;
        }

        let (first, last_recorded) = match (deltas.keys().next(), deltas.keys().next_back()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Err(Fallback::new(DefaultReason::NoData, TimeSeries::default())),
        };
        let last = Period::of(Month::of(today), granularity).max(last_recorded);

        let mut values = Vec::new();
        let mut running = 0.0;
        let mut period = first;
        while period <= last {
            running += deltas.get(&period).copied().unwrap_or(0.0);
            values.push((period.label(), round2(running)));
            period = period.next();
        }
        debug!(points = values.len(), ?granularity, "computed net worth series");
        Ok(Self::series(values))
    }

    fn series(values: Vec<(String, f64)>) -> TimeSeries {
        let raw: Vec<f64> = values.iter().map(|(_, value)| *value).collect();
        let points = values
            .into_iter()
            .zip(growth_rates(&raw))
            .map(|((label, value), growth_rate)| SeriesPoint {
                label,
                value,
                growth_rate,
            })
            .collect();
        TimeSeries { points }
    }
}
