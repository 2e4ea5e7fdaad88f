//! Debt payoff planning: avalanche and snowball orderings, each simulated
//! month by month with freed minimum payments rolled onto the next target.

use std::cmp::Ordering;

use ledgerwise_domain::{
    Debt, DebtPlan, DebtStrategy, DebtStrategyKind, DefaultReason, Fallback, MetricResult,
    UserAggregate,
};
use tracing::{debug, warn};

use crate::math::round2;

/// Simulation horizon; plans still open after fifty years are reported as non-converging.
pub const MAX_MONTHS: u32 = 600;
const EPSILON: f64 = 0.005;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Simulation {
    months: u32,
    interest: f64,
    converges: bool,
}

pub struct DebtService;

impl DebtService {
    pub fn strategies(debts: &[Debt]) -> MetricResult<DebtPlan> {
        Self::strategies_with_extra(debts, 0.0)
    }

    /// Builds both payoff plans. `extra` is paid on top of the combined
    /// minimum payments every month.
    pub fn strategies_with_extra(debts: &[Debt], extra: f64) -> MetricResult<DebtPlan> {
        let debts: Vec<Debt> = debts
            .iter()
            .filter(|debt| {
                debt.balance.is_finite()
                    && debt.balance > 0.0
                    && debt.interest_rate.is_finite()
                    && debt.minimum_payment.is_finite()
            })
            .cloned()
            .collect();
        if debts.is_empty() {
            return Err(Fallback::new(DefaultReason::NoDebts, Self::empty_plan()));
        }
        let extra = if extra.is_finite() { extra.max(0.0) } else { 0.0 };

        let baseline: f64 = debts
            .iter()
            .map(|debt| Self::simulate(std::slice::from_ref(debt), 0.0).interest)
            .sum();
        let baseline = round2(baseline);

        let avalanche = Self::plan(
            DebtStrategyKind::Avalanche,
            Self::avalanche_order(&debts),
            extra,
            baseline,
        );
        let snowball = Self::plan(
            DebtStrategyKind::Snowball,
            Self::snowball_order(&debts),
            extra,
            baseline,
        );

        let plan = DebtPlan {
            total_debt: round2(debts.iter().map(|d| d.balance).sum()),
            total_monthly_payment: round2(
                debts.iter().map(|d| d.minimum_payment.max(0.0)).sum::<f64>() + extra,
            ),
            baseline_interest: baseline,
            avalanche,
            snowball,
        };
        debug!(
            debts = debts.len(),
            total_debt = plan.total_debt,
            avalanche_months = plan.avalanche.months_to_freedom,
            snowball_months = plan.snowball.months_to_freedom,
            "planned debt payoff"
        );

        if plan.strategies().iter().any(|strategy| !strategy.converges) {
            warn!(total_debt = plan.total_debt, "debt payments never clear the balance");
            return Err(Fallback::new(DefaultReason::NonConvergingDebts, plan));
        }
        Ok(plan)
    }

    /// Debts from the aggregate's liability section.
    pub fn plan_for(aggregate: &UserAggregate, extra: f64) -> MetricResult<DebtPlan> {
        Self::strategies_with_extra(&aggregate.liabilities.debts, extra)
    }

    /// Highest interest rate first; ties keep input order.
    pub fn avalanche_order(debts: &[Debt]) -> Vec<Debt> {
        let mut ordered = debts.to_vec();
        ordered.sort_by(|a, b| b.interest_rate.total_cmp(&a.interest_rate));
        ordered
    }

    /// Smallest balance first; ties keep input order.
    pub fn snowball_order(debts: &[Debt]) -> Vec<Debt> {
        let mut ordered = debts.to_vec();
        ordered.sort_by(|a, b| a.balance.partial_cmp(&b.balance).unwrap_or(Ordering::Equal));
        ordered
    }

    fn plan(kind: DebtStrategyKind, order: Vec<Debt>, extra: f64, baseline: f64) -> DebtStrategy {
        let run = Self::simulate(&order, extra);
        let total_interest = round2(run.interest);
        DebtStrategy {
            kind,
            months_to_freedom: run.months.max(1),
            total_interest,
            interest_saved: round2((baseline - total_interest).max(0.0)),
            converges: run.converges,
            order,
        }
    }

    /// Pays every debt's minimum, then pours the rest of the monthly budget
    /// onto balances in `order`.
    fn simulate(order: &[Debt], extra: f64) -> Simulation {
        let mut balances: Vec<f64> = order.iter().map(|d| d.balance).collect();
        let budget: f64 = order.iter().map(|d| d.minimum_payment.max(0.0)).sum::<f64>() + extra;
        let mut interest = 0.0;
        let mut months = 0;

        while months < MAX_MONTHS && balances.iter().any(|b| *b > EPSILON) {
            months += 1;
            for (balance, debt) in balances.iter_mut().zip(order) {
                if *balance > EPSILON {
                    let accrued = *balance * debt.interest_rate.max(0.0) / 12.0 / 100.0;
                    interest += accrued;
                    *balance += accrued;
                }
            }

            let mut remaining = budget;
            for (balance, debt) in balances.iter_mut().zip(order) {
                if *balance > EPSILON {
                    let payment = debt.minimum_payment.max(0.0).min(*balance).min(remaining);
                    *balance -= payment;
                    remaining -= payment;
                }
            }
            for balance in balances.iter_mut() {
                if remaining <= EPSILON {
                    break;
                }
                if *balance > EPSILON {
                    let payment = remaining.min(*balance);
                    *balance -= payment;
                    remaining -= payment;
                }
            }
        }

        Simulation {
            months,
            interest,
            converges: balances.iter().all(|b| *b <= EPSILON),
        }
    }

    fn empty_plan() -> DebtPlan {
        let empty = |kind| DebtStrategy {
            kind,
            months_to_freedom: 0,
            total_interest: 0.0,
            interest_saved: 0.0,
            converges: true,
            order: Vec::new(),
        };
        DebtPlan {
            total_debt: 0.0,
            total_monthly_payment: 0.0,
            baseline_interest: 0.0,
            avalanche: empty(DebtStrategyKind::Avalanche),
            snowball: empty(DebtStrategyKind::Snowball),
        }
    }
}
