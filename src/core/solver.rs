use serde::{Deserialize, Serialize};
use tracing::debug;

use super::engine::project;
use super::error::{ProjectionError, Result};
use super::types::{
    Account, AccountType, Assumptions, ContributionFrequency, Contributions, ProjectionOptions,
};
use super::validation::validate_inputs;

const GOAL_SAVINGS_ACCOUNT_ID: &str = "goal-savings";
pub const MAX_GOAL_ITERATIONS: u32 = 200;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GoalType {
    MaxSpending,
    RequiredSavings,
}

fn default_tolerance() -> f64 {
    1.0
}

fn default_max_iterations() -> u32 {
    48
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSolveConfig {
    pub goal_type: GoalType,
    pub target_retirement_age: u32,
    #[serde(default)]
    pub search_min: f64,
    pub search_max: f64,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Return on the extra savings account; defaults to the balance-weighted
    /// return of the existing growable accounts.
    #[serde(default)]
    pub savings_return_rate: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSolveIteration {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate_value: f64,
    pub retirement_age: u32,
    pub meets_target: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSolveResult {
    pub goal_type: GoalType,
    pub target_retirement_age: u32,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
    pub solved_value: Option<f64>,
    pub achieved_retirement_age: Option<u32>,
    pub iterations: Vec<GoalSolveIteration>,
    pub converged: bool,
    pub feasible: bool,
    pub message: String,
}

/// Which end of the search interval retires in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassingSide {
    /// More of the input helps, as with savings.
    Upper,
    /// Less of the input helps, as with spending.
    Lower,
}

impl GoalType {
    fn passing_side(self) -> PassingSide {
        match self {
            GoalType::RequiredSavings => PassingSide::Upper,
            GoalType::MaxSpending => PassingSide::Lower,
        }
    }

    fn solved_message(self) -> &'static str {
        match self {
            GoalType::RequiredSavings => "Solved required annual savings.",
            GoalType::MaxSpending => "Solved maximum sustainable spending.",
        }
    }
}

#[derive(Debug)]
struct Bisection {
    value: f64,
    converged: bool,
}

/// Bisects a single input until the projection retires at or before the
/// target age.
pub fn solve_goal(
    assumptions: Option<&Assumptions>,
    accounts: &[Account],
    options: &ProjectionOptions,
    config: GoalSolveConfig,
) -> Result<GoalSolveResult> {
    let assumptions = validate_inputs(assumptions, accounts, options)?;
    validate_config(assumptions, options, &config)?;

    let savings_return = config
        .savings_return_rate
        .unwrap_or_else(|| weighted_return_rate(accounts));
    let evaluate = |candidate: f64| {
        evaluate_candidate(assumptions, accounts, options, &config, savings_return, candidate)
    };

    let low_eval = evaluate(config.search_min);
    let high_eval = evaluate(config.search_max);
    let (inside, outside, bound) = match config.goal_type.passing_side() {
        PassingSide::Upper => (high_eval, low_eval, config.search_min),
        PassingSide::Lower => (low_eval, high_eval, config.search_max),
    };

    let mut iterations = Vec::new();
    let (solved_value, converged, message) = if !inside.meets_target {
        let message = match config.goal_type {
            GoalType::RequiredSavings => {
                "No savings level within the search bounds reaches the target age."
            }
            GoalType::MaxSpending => {
                "No spending level within the search bounds retires by the target age."
            }
        };
        (None, false, message.to_string())
    } else if outside.meets_target {
        let message = match config.goal_type {
            GoalType::RequiredSavings => {
                "Already retires by the target age at the lower savings bound."
            }
            GoalType::MaxSpending => {
                "Upper spending bound still retires in time; increase search max for more."
            }
        };
        (Some(bound), true, message.to_string())
    } else {
        let found = bisect(&config, &evaluate, &mut iterations);
        let message = if found.converged {
            config.goal_type.solved_message().to_string()
        } else {
            format!(
                "Bracket wider than {} after {} iterations; returning the last passing value.",
                config.tolerance, config.max_iterations
            )
        };
        (Some(found.value), found.converged, message)
    };

    let achieved_retirement_age = solved_value.map(|value| evaluate(value).retirement_age);
    debug!(
        goal = ?config.goal_type,
        solved_value,
        iterations = iterations.len(),
        "goal solve finished"
    );

    Ok(GoalSolveResult {
        goal_type: config.goal_type,
        target_retirement_age: config.target_retirement_age,
        search_min: config.search_min,
        search_max: config.search_max,
        tolerance: config.tolerance,
        max_iterations: config.max_iterations,
        solved_value,
        achieved_retirement_age,
        iterations,
        converged,
        feasible: inside.meets_target,
        message,
    })
}

/// Narrows `[search_min, search_max]` keeping the passing end on its side.
/// The returned value always meets the target.
fn bisect(
    config: &GoalSolveConfig,
    evaluate: impl Fn(f64) -> CandidateEval,
    log: &mut Vec<GoalSolveIteration>,
) -> Bisection {
    let side = config.goal_type.passing_side();
    let (mut lo, mut hi) = (config.search_min, config.search_max);
    let passing = |lo: f64, hi: f64| match side {
        PassingSide::Upper => hi,
        PassingSide::Lower => lo,
    };

    for it in 1..=config.max_iterations {
        let mid = (lo + hi) * 0.5;
        let eval = evaluate(mid);
        log.push(eval.iteration(it, lo, hi, mid));

        match (side, eval.meets_target) {
            (PassingSide::Upper, true) | (PassingSide::Lower, false) => hi = mid,
            (PassingSide::Upper, false) | (PassingSide::Lower, true) => lo = mid,
        }
        if hi - lo <= config.tolerance {
            return Bisection {
                value: passing(lo, hi),
                converged: true,
            };
        }
    }
    Bisection {
        value: passing(lo, hi),
        converged: false,
    }
}

#[derive(Debug, Clone, Copy)]
struct CandidateEval {
    retirement_age: u32,
    meets_target: bool,
}

impl CandidateEval {
    fn iteration(self, iteration: u32, lo: f64, hi: f64, candidate: f64) -> GoalSolveIteration {
        GoalSolveIteration {
            iteration,
            lower_bound: lo,
            upper_bound: hi,
            candidate_value: candidate,
            retirement_age: self.retirement_age,
            meets_target: self.meets_target,
        }
    }
}

fn evaluate_candidate(
    base_assumptions: &Assumptions,
    base_accounts: &[Account],
    options: &ProjectionOptions,
    config: &GoalSolveConfig,
    savings_return: f64,
    candidate_value: f64,
) -> CandidateEval {
    let result = match config.goal_type {
        GoalType::MaxSpending => {
            let mut assumptions = base_assumptions.clone();
            assumptions.annual_spending_target = candidate_value.max(0.0);
            project(&assumptions, base_accounts, options)
        }
        GoalType::RequiredSavings => {
            let mut accounts = base_accounts.to_vec();
            accounts.push(goal_savings_account(
                base_accounts,
                base_assumptions.current_age,
                config.target_retirement_age,
                savings_return,
                candidate_value.max(0.0),
            ));
            project(base_assumptions, &accounts, options)
        }
    };

    CandidateEval {
        retirement_age: result.retirement_age,
        meets_target: result.feasible && result.retirement_age <= config.target_retirement_age,
    }
}

/// Extra brokerage account funded with a flat yearly amount until the year
/// before the target age.
fn goal_savings_account(
    existing: &[Account],
    current_age: u32,
    target_age: u32,
    annual_return_rate: f64,
    annual_amount: f64,
) -> Account {
    let mut id = GOAL_SAVINGS_ACCOUNT_ID.to_string();
    while existing.iter().any(|a| a.id == id) {
        id.push('_');
    }

    let contributions = (target_age - current_age).checked_sub(1).map(|end_year| Contributions {
        amount: annual_amount,
        frequency: ContributionFrequency::Yearly,
        growth_type: None,
        growth_value: None,
        start_year: Some(0),
        end_year: Some(end_year),
    });

    Account {
        id,
        name: "Additional savings".to_string(),
        account_type: AccountType::TaxableBrokerage,
        current_balance: 0.0,
        annual_return_rate,
        contributions,
        events: Vec::new(),
        annual_benefit: None,
        benefit_start_age: None,
    }
}

fn weighted_return_rate(accounts: &[Account]) -> f64 {
    let growable = accounts
        .iter()
        .filter(|a| !a.account_type.is_benefit_stream())
        .collect::<Vec<_>>();
    if growable.is_empty() {
        return 0.0;
    }

    let total_balance = growable.iter().map(|a| a.current_balance).sum::<f64>();
    if total_balance <= 1e-12 {
        return growable.iter().map(|a| a.annual_return_rate).sum::<f64>() / growable.len() as f64;
    }
    growable
        .iter()
        .map(|a| a.annual_return_rate * a.current_balance)
        .sum::<f64>()
        / total_balance
}

fn validate_config(
    assumptions: &Assumptions,
    options: &ProjectionOptions,
    config: &GoalSolveConfig,
) -> Result<()> {
    let invalid = |msg: &str| Err(ProjectionError::InvalidGoal(msg.to_string()));

    if config.target_retirement_age < assumptions.current_age {
        return invalid("targetRetirementAge must be >= currentAge");
    }
    if config.target_retirement_age > options.life_expectancy {
        return invalid("targetRetirementAge must be <= lifeExpectancy");
    }
    if !config.search_min.is_finite() || !config.search_max.is_finite() {
        return invalid("search bounds must be finite");
    }
    if config.search_min < 0.0 {
        return invalid("searchMin must be >= 0");
    }
    if config.search_max <= config.search_min {
        return invalid("searchMax must be greater than searchMin");
    }
    if !config.tolerance.is_finite() || config.tolerance <= 0.0 {
        return invalid("tolerance must be > 0");
    }
    if config.max_iterations == 0 || config.max_iterations > MAX_GOAL_ITERATIONS {
        return Err(ProjectionError::InvalidGoal(format!(
            "maxIterations must be between 1 and {MAX_GOAL_ITERATIONS}"
        )));
    }
    if config
        .savings_return_rate
        .is_some_and(|rate| !rate.is_finite() || rate <= -1.0 || rate > 1.0)
    {
        return invalid("savingsReturnRate must be > -1 and <= 1");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn flat_assumptions() -> Assumptions {
        Assumptions {
            annual_spending_target: 10_000.0,
            inflation_rate: 0.0,
            retirement_tax_rate: 0.0,
            withdrawal_rate: 0.1,
            retirement_growth_rate: 0.0,
            investment_fee_rate: 0.0,
            current_age: 60,
            desired_retirement_age: None,
        }
    }

    fn options() -> ProjectionOptions {
        ProjectionOptions {
            start_year: 2025,
            life_expectancy: 70,
        }
    }

    fn cash(balance: f64) -> Account {
        Account {
            id: "cash".to_string(),
            name: "Cash".to_string(),
            account_type: AccountType::TaxableBrokerage,
            current_balance: balance,
            annual_return_rate: 0.0,
            contributions: None,
            events: Vec::new(),
            annual_benefit: None,
            benefit_start_age: None,
        }
    }

    fn config(goal_type: GoalType, target_age: u32, search_max: f64) -> GoalSolveConfig {
        GoalSolveConfig {
            goal_type,
            target_retirement_age: target_age,
            search_min: 0.0,
            search_max,
            tolerance: 0.5,
            max_iterations: 40,
            savings_return_rate: None,
        }
    }

    #[test]
    fn max_spending_matches_withdrawal_capacity() {
        // 200k at a 10% withdrawal rate supports 20k with no growth, tax or inflation.
        let accounts = vec![cash(200_000.0)];
        let result = solve_goal(
            Some(&flat_assumptions()),
            &accounts,
            &options(),
            config(GoalType::MaxSpending, 60, 50_000.0),
        )
        .expect("must solve");

        assert!(result.feasible);
        assert!(result.converged);
        assert_close(result.solved_value.expect("value"), 20_000.0, 0.5);
        assert_eq!(result.achieved_retirement_age, Some(60));
        assert!(!result.iterations.is_empty());
    }

    #[test]
    fn required_savings_matches_hand_calculation() {
        // 100k covers 10k at a 10% rate. Deposits land in years 0 and 1 only, so
        // two deposits of 50k reach it in year 1.
        let accounts = vec![cash(0.0)];
        let result = solve_goal(
            Some(&flat_assumptions()),
            &accounts,
            &options(),
            config(GoalType::RequiredSavings, 62, 200_000.0),
        )
        .expect("must solve");

        assert!(result.feasible);
        assert_close(result.solved_value.expect("value"), 50_000.0, 0.5);
        assert_eq!(result.achieved_retirement_age, Some(61));
    }

    #[test]
    fn required_savings_reports_infeasible_when_bounds_too_low() {
        let accounts = vec![cash(0.0)];
        let result = solve_goal(
            Some(&flat_assumptions()),
            &accounts,
            &options(),
            config(GoalType::RequiredSavings, 62, 1_000.0),
        )
        .expect("must return result");

        assert!(!result.feasible);
        assert!(result.solved_value.is_none());
        assert!(result.achieved_retirement_age.is_none());
    }

    #[test]
    fn already_on_track_returns_lower_bound() {
        let accounts = vec![cash(1_000_000.0)];
        let result = solve_goal(
            Some(&flat_assumptions()),
            &accounts,
            &options(),
            config(GoalType::RequiredSavings, 65, 10_000.0),
        )
        .expect("must solve");

        assert!(result.feasible);
        assert_eq!(result.solved_value, Some(0.0));
        assert!(result.iterations.is_empty());
    }

    #[test]
    fn rejects_target_outside_horizon() {
        let accounts = vec![cash(1.0)];
        let err = solve_goal(
            Some(&flat_assumptions()),
            &accounts,
            &options(),
            config(GoalType::MaxSpending, 71, 10.0),
        )
        .expect_err("must reject");
        assert!(err.to_string().contains("targetRetirementAge"));
    }

    #[test]
    fn rejects_inverted_search_range() {
        let accounts = vec![cash(1.0)];
        let mut cfg = config(GoalType::MaxSpending, 65, 10.0);
        cfg.search_min = 20.0;
        let err = solve_goal(Some(&flat_assumptions()), &accounts, &options(), cfg)
            .expect_err("must reject");
        assert!(err.to_string().contains("searchMax"));
    }

    #[test]
    fn iteration_budget_is_capped() {
        let accounts = vec![cash(200_000.0)];
        for max_iterations in [u32::MAX, MAX_GOAL_ITERATIONS + 1, 0] {
            let mut cfg = config(GoalType::MaxSpending, 60, 50_000.0);
            cfg.max_iterations = max_iterations;
            let err = solve_goal(Some(&flat_assumptions()), &accounts, &options(), cfg)
                .expect_err("must reject");
            assert!(matches!(err, ProjectionError::InvalidGoal(_)));
            assert!(err.to_string().contains("maxIterations"));
        }

        let mut cfg = config(GoalType::MaxSpending, 60, 50_000.0);
        cfg.max_iterations = MAX_GOAL_ITERATIONS;
        cfg.tolerance = f64::MIN_POSITIVE;
        let result = solve_goal(Some(&flat_assumptions()), &accounts, &options(), cfg)
            .expect("must solve");
        assert!(result.iterations.len() <= MAX_GOAL_ITERATIONS as usize);
        assert_close(result.solved_value.expect("value"), 20_000.0, 1e-6);
    }

    #[test]
    fn exhausted_budget_returns_last_passing_value() {
        // 25k fails, 12.5k and 18.75k pass.
        let accounts = vec![cash(200_000.0)];
        let mut cfg = config(GoalType::MaxSpending, 60, 50_000.0);
        cfg.max_iterations = 3;
        cfg.tolerance = 1e-9;
        let result = solve_goal(Some(&flat_assumptions()), &accounts, &options(), cfg)
            .expect("must return result");

        assert!(result.feasible);
        assert!(!result.converged);
        assert_eq!(result.iterations.len(), 3);
        assert_eq!(result.solved_value, Some(18_750.0));
        assert_eq!(result.achieved_retirement_age, Some(60));
    }

    #[test]
    fn savings_account_id_avoids_collisions() {
        let mut existing = cash(0.0);
        existing.id = GOAL_SAVINGS_ACCOUNT_ID.to_string();
        let account = goal_savings_account(&[existing], 60, 60, 0.05, 100.0);
        assert_eq!(account.id, "goal-savings_");
        assert!(account.contributions.is_none());
    }

    #[test]
    fn weighted_return_ignores_benefit_streams() {
        let mut stocks = cash(300_000.0);
        stocks.annual_return_rate = 0.08;
        let mut bonds = cash(100_000.0);
        bonds.id = "bonds".to_string();
        bonds.annual_return_rate = 0.04;
        let mut pension = cash(1_000_000.0);
        pension.id = "pension".to_string();
        pension.account_type = AccountType::Pension;
        pension.annual_return_rate = 0.5;

        assert_close(weighted_return_rate(&[stocks, bonds, pension]), 0.07, 1e-12);
    }
}
