use crate::math::round2;

pub struct WageService;

impl WageService {
    /// Net pay minus the costs of holding the job, per hour actually spent on it
    /// (commute and preparation included in `hours`).
    pub fn true_hourly_wage(net_income: f64, work_costs: f64, hours: f64) -> Option<f64> {
        let finite = hours.is_finite() && net_income.is_finite() && work_costs.is_finite();
        if hours <= 0.0 || !finite {
            return None;
        }
        let wage = (net_income - work_costs) / hours;
        (wage > 0.0).then(|| round2(wage))
    }

    /// Hours of work needed to pay for `amount` at the given true hourly wage.
    pub fn hours_to_afford(amount: f64, wage: f64) -> Option<f64> {
        if wage <= 0.0 || !wage.is_finite() || !amount.is_finite() {
            return None;
        }
        Some(round2(amount.max(0.0) / wage))
    }
}
