use std::collections::BTreeMap;

use tracing::{debug, info};

use super::account::AccountBehavior;
use super::contributions::scheduled_contribution;
use super::error::Result;
use super::retirement::{can_retire, compare_desired_age, select_retirement};
use super::types::{Account, Assumptions, ProjectionOptions, RetirementResult, YearProjection};
use super::validation::validate_inputs;

#[derive(Debug)]
struct AccountState<'a> {
    account: &'a Account,
    behavior: AccountBehavior,
    balance: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct YearFlows {
    contributions: f64,
    events: f64,
    growth: f64,
    benefit_income: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GrowthRegime {
    Accumulation,
    Retirement,
}

/// Validates the request and projects it through life expectancy.
pub fn run_projection(
    assumptions: Option<&Assumptions>,
    accounts: &[Account],
    options: &ProjectionOptions,
) -> Result<RetirementResult> {
    let assumptions = validate_inputs(assumptions, accounts, options)?;
    Ok(project(assumptions, accounts, options))
}

/// Projection over already-validated inputs.
pub(crate) fn project(
    assumptions: &Assumptions,
    accounts: &[Account],
    options: &ProjectionOptions,
) -> RetirementResult {
    let horizon = options.life_expectancy.saturating_sub(assumptions.current_age);
    debug!(
        accounts = accounts.len(),
        horizon_years = horizon + 1,
        "running retirement projection"
    );

    let years = simulate_years(assumptions, accounts, options, horizon);
    build_retirement_result(assumptions, years)
}

fn simulate_years(
    assumptions: &Assumptions,
    accounts: &[Account],
    options: &ProjectionOptions,
    horizon: u32,
) -> Vec<YearProjection> {
    let mut states = accounts
        .iter()
        .map(|account| {
            let behavior = AccountBehavior::classify(account);
            AccountState {
                account,
                behavior,
                balance: if behavior.applies_growth() {
                    account.current_balance
                } else {
                    0.0
                },
            }
        })
        .collect::<Vec<_>>();

    let mut years = Vec::with_capacity(horizon as usize + 1);
    let mut regime = GrowthRegime::Accumulation;

    for t in 0..=horizon {
        let age = assumptions.current_age + t;
        let inflation_factor = (1.0 + assumptions.inflation_rate).powi(t as i32);
        let mut flows = YearFlows::default();

        for state in states.iter_mut() {
            if state.behavior.applies_growth() {
                let contribution = scheduled_contribution(state.account, state.behavior, t);
                state.balance += contribution;
                flows.contributions += contribution;
                flows.events += apply_events(state, t, inflation_factor);
            } else {
                flows.benefit_income += state.behavior.benefit_income(age);
            }
        }

        let account_breakdown = states
            .iter()
            .filter(|s| s.behavior.applies_growth())
            .map(|s| (s.account.id.clone(), s.balance))
            .collect::<BTreeMap<_, _>>();
        let portfolio_value = account_breakdown.values().sum::<f64>();
        let inflation_adjusted_spending = assumptions.annual_spending_target * inflation_factor;
        let supported_retirement_income =
            portfolio_value * assumptions.withdrawal_rate + flows.benefit_income;
        let after_tax_income =
            supported_retirement_income * (1.0 - assumptions.retirement_tax_rate);
        let sufficient = can_retire(after_tax_income, inflation_adjusted_spending);

        // The verdict reads the pre-growth snapshot, so the switch can take
        // effect for this year's growth without a second pass.
        if sufficient && regime == GrowthRegime::Accumulation {
            regime = GrowthRegime::Retirement;
        }
        for state in states.iter_mut().filter(|s| s.behavior.applies_growth()) {
            flows.growth += apply_growth(state, assumptions, regime);
        }

        years.push(YearProjection {
            year: options.start_year + t as i32,
            year_index: t,
            age,
            portfolio_value,
            total_contributions: flows.contributions,
            portfolio_growth: flows.growth,
            event_impact: flows.events,
            inflation_adjusted_spending,
            supported_retirement_income,
            after_tax_income,
            can_retire: sufficient,
            account_breakdown,
        });
    }

    years
}

/// Applies year-`t` events in order and returns the net change actually
/// booked. A withdrawal larger than the balance empties the account and the
/// remainder is dropped.
fn apply_events(state: &mut AccountState<'_>, t: u32, inflation_factor: f64) -> f64 {
    let opening = state.balance;
    for event in state.account.events.iter().filter(|e| e.year == t) {
        let amount = if event.is_inflation_adjusted {
            event.amount * inflation_factor
        } else {
            event.amount
        };
        state.balance = (state.balance + amount).max(0.0);
    }
    state.balance - opening
}

fn apply_growth(
    state: &mut AccountState<'_>,
    assumptions: &Assumptions,
    regime: GrowthRegime,
) -> f64 {
    let gross_rate = match regime {
        GrowthRegime::Accumulation => state.account.annual_return_rate,
        GrowthRegime::Retirement => assumptions.retirement_growth_rate,
    };
    let effective_rate = gross_rate - assumptions.investment_fee_rate;
    let opening = state.balance;
    state.balance = (opening * (1.0 + effective_rate)).max(0.0);
    state.balance - opening
}

fn build_retirement_result(
    assumptions: &Assumptions,
    years: Vec<YearProjection>,
) -> RetirementResult {
    let desired_retirement = assumptions
        .desired_retirement_age
        .and_then(|age| compare_desired_age(&years, age));

    let Some(selection) = select_retirement(&years) else {
        return RetirementResult {
            retirement_year: 0,
            retirement_age: assumptions.current_age,
            feasible: false,
            portfolio_at_retirement: 0.0,
            annual_income_at_retirement: 0.0,
            target_spending_at_retirement: 0.0,
            desired_retirement,
            year_by_year_projections: years,
        };
    };

    let chosen = &years[selection.index];
    if selection.feasible {
        info!(
            retirement_year = chosen.year,
            retirement_age = chosen.age,
            "retirement year selected"
        );
    } else {
        info!(
            final_year = chosen.year,
            "no simulated year covers spending; reporting final year"
        );
    }
    let (retirement_year, retirement_age) = (chosen.year, chosen.age);
    let portfolio_at_retirement = chosen.portfolio_value;
    let annual_income_at_retirement = chosen.after_tax_income;
    let target_spending_at_retirement = chosen.inflation_adjusted_spending;

    RetirementResult {
        retirement_year,
        retirement_age,
        feasible: selection.feasible,
        portfolio_at_retirement,
        annual_income_at_retirement,
        target_spending_at_retirement,
        desired_retirement,
        year_by_year_projections: years,
    }
}
