use ledgerwise_domain::{GoalProgress, SavingsGoal, UserAggregate};

use crate::math::round2;

pub struct GoalService;

impl GoalService {
    /// Progress of every savings goal, in the order the goals were folded.
    pub fn progress(aggregate: &UserAggregate) -> Vec<GoalProgress> {
        aggregate
            .assets
            .savings
            .goals
            .iter()
            .map(Self::goal_progress)
            .collect()
    }

    pub fn goal_progress(goal: &SavingsGoal) -> GoalProgress {
        let fraction = if goal.target_amount > 0.0 && goal.current_amount.is_finite() {
            (goal.current_amount / goal.target_amount).clamp(0.0, 1.0)
        } else {
            0.0
        };
        GoalProgress {
            goal: goal.goal.clone(),
            current_amount: goal.current_amount,
            target_amount: goal.target_amount,
            progress: round2(fraction),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goal(current: f64, target: f64) -> SavingsGoal {
        SavingsGoal {
            goal: "Emergency fund".into(),
            current_amount: current,
            target_amount: target,
            target_date: None,
        }
    }

    #[test]
    fn progress_is_a_bounded_fraction() {
        assert_eq!(GoalService::goal_progress(&goal(250.0, 1000.0)).progress, 0.25);
        assert_eq!(GoalService::goal_progress(&goal(1500.0, 1000.0)).progress, 1.0);
        assert_eq!(GoalService::goal_progress(&goal(100.0, 0.0)).progress, 0.0);
    }
}
