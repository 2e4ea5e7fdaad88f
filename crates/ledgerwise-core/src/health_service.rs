use ledgerwise_domain::{
    Fallback, HealthScore, HealthScoreComponent, MetricResult, Month, UserAggregate,
};
use tracing::debug;

use crate::{
    math::{clamp_score, round1, trailing_average},
    ratio_service::RatioService,
};

const COMPONENT_WEIGHT: f64 = 25.0;
const EMERGENCY_LOOKBACK_MONTHS: usize = 3;
/// Six months of cover earns the full emergency-fund score.
const EMERGENCY_POINTS_PER_MONTH: f64 = 16.67;
const ASSET_BUCKETS: f64 = 3.0;

pub struct HealthService;

impl HealthService {
    /// Composite 0-100 score built from four equally weighted components.
    pub fn health_score(aggregate: &UserAggregate, month: Month) -> MetricResult<HealthScore> {
        let ratios = RatioService::financial_ratios(aggregate, month);
        let (ratios, reason) = match ratios {
            Ok(ratios) => (ratios, None),
            Err(fallback) => (fallback.value, Some(fallback.reason)),
        };

        let savings = clamp_score(ratios.savings_rate.value * 5.0);
        let debt = clamp_score(100.0 - ratios.debt_ratio.value * 2.5);
        let emergency =
            clamp_score(Self::emergency_months(aggregate, month) * EMERGENCY_POINTS_PER_MONTH);
        let diversification = clamp_score(Self::diversification(aggregate));

        let components = vec![
            Self::component("Savings Rate", savings),
            Self::component("Debt-to-Income", debt),
            Self::component("Emergency Fund", emergency),
            Self::component("Diversification", diversification),
        ];
        let mean = components.iter().map(|c| c.value).sum::<f64>() / components.len() as f64;
        let score = HealthScore {
            score: round1(mean),
            max_score: 100.0,
            components,
        };
        debug!(%month, score = score.score, "computed health score");

        match reason {
            Some(reason) => Err(Fallback::new(reason, score)),
            None => Ok(score),
        }
    }

    /// Months of expenses covered by the savings bucket; zero without expense history.
    pub fn emergency_months(aggregate: &UserAggregate, month: Month) -> f64 {
        let expenses = &aggregate.expenses.by_month;
        let average = trailing_average(expenses, month, EMERGENCY_LOOKBACK_MONTHS, |m| {
            expenses.contains_key(&m)
        });
        match average {
            Some(average) if average > 0.0 => aggregate.assets.savings.total.max(0.0) / average,
            _ => 0.0,
        }
    }

    /// Normalized Herfindahl index over long-term, savings and stock holdings.
    pub fn diversification(aggregate: &UserAggregate) -> f64 {
        let buckets = [
            aggregate.assets.long_term.total.max(0.0),
            aggregate.assets.savings.total.max(0.0),
            aggregate.assets.stocks.total.max(0.0),
        ];
        let total: f64 = buckets.iter().sum();
        if total <= 0.0 || !total.is_finite() {
            return 0.0;
        }
        let hhi: f64 = buckets.iter().map(|b| (b / total).powi(2)).sum();
        let floor = 1.0 / ASSET_BUCKETS;
        (1.0 - hhi) / (1.0 - floor) * 100.0
    }

    fn component(name: &str, value: f64) -> HealthScoreComponent {
        HealthScoreComponent {
            name: name.to_string(),
            value: round1(value),
            weight: COMPONENT_WEIGHT,
        }
    }
}
