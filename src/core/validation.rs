use std::collections::HashSet;

use super::error::{ProjectionError, Result};
use super::types::{Account, Assumptions, ContributionGrowth, ProjectionOptions};

pub const MAX_LIFE_EXPECTANCY: u32 = 120;
pub const MIN_CURRENT_AGE: u32 = 18;
pub const MIN_START_YEAR: i32 = 1900;
pub const MAX_START_YEAR: i32 = 9999;

/// Boundary check for a projection request. The simulator assumes everything
/// here has already passed and never re-validates.
pub fn validate_inputs<'a>(
    assumptions: Option<&'a Assumptions>,
    accounts: &[Account],
    options: &ProjectionOptions,
) -> Result<&'a Assumptions> {
    let assumptions = assumptions.ok_or(ProjectionError::MissingAssumptions)?;
    if accounts.is_empty() {
        return Err(ProjectionError::NoAccounts);
    }
    validate_assumptions(assumptions, options)?;

    let mut seen = HashSet::with_capacity(accounts.len());
    for account in accounts {
        validate_account(account)?;
        if !seen.insert(account.id.as_str()) {
            return Err(ProjectionError::DuplicateAccountId(account.id.clone()));
        }
    }
    Ok(assumptions)
}

fn validate_assumptions(assumptions: &Assumptions, options: &ProjectionOptions) -> Result<()> {
    if !assumptions.annual_spending_target.is_finite() || assumptions.annual_spending_target <= 0.0
    {
        return Err(ProjectionError::invalid(
            "annualSpendingTarget",
            "must be > 0",
        ));
    }

    check_range("inflationRate", assumptions.inflation_rate, -0.5, 1.0)?;
    check_range("retirementTaxRate", assumptions.retirement_tax_rate, 0.0, 1.0)?;
    check_range("withdrawalRate", assumptions.withdrawal_rate, 0.0, 1.0)?;
    check_range("investmentFeeRate", assumptions.investment_fee_rate, 0.0, 1.0)?;
    check_return_rate("retirementGrowthRate", assumptions.retirement_growth_rate)?;

    if !(MIN_START_YEAR..=MAX_START_YEAR).contains(&options.start_year) {
        return Err(ProjectionError::invalid(
            "startYear",
            format!("must be between {MIN_START_YEAR} and {MAX_START_YEAR}"),
        ));
    }
    if options.life_expectancy > MAX_LIFE_EXPECTANCY {
        return Err(ProjectionError::invalid(
            "lifeExpectancy",
            format!("must be <= {MAX_LIFE_EXPECTANCY}"),
        ));
    }
    if assumptions.current_age < MIN_CURRENT_AGE {
        return Err(ProjectionError::invalid(
            "currentAge",
            format!("must be >= {MIN_CURRENT_AGE}"),
        ));
    }
    if assumptions.current_age > options.life_expectancy {
        return Err(ProjectionError::invalid(
            "currentAge",
            "must be <= lifeExpectancy",
        ));
    }
    if let Some(desired) = assumptions.desired_retirement_age {
        if desired < assumptions.current_age || desired > options.life_expectancy {
            return Err(ProjectionError::invalid(
                "desiredRetirementAge",
                "must be between currentAge and lifeExpectancy",
            ));
        }
    }
    Ok(())
}

fn validate_account(account: &Account) -> Result<()> {
    if account.id.trim().is_empty() {
        return Err(ProjectionError::invalid("account.id", "must not be empty"));
    }
    let field = |name: &str| format!("accounts[{}].{name}", account.id);

    if !account.current_balance.is_finite() || account.current_balance < 0.0 {
        return Err(ProjectionError::invalid(field("currentBalance"), "must be >= 0"));
    }
    check_return_rate(&field("annualReturnRate"), account.annual_return_rate)?;

    if let Some(schedule) = account.contributions.as_ref() {
        if !schedule.amount.is_finite() || schedule.amount < 0.0 {
            return Err(ProjectionError::invalid(
                field("contributions.amount"),
                "must be >= 0",
            ));
        }
        if let Some(value) = schedule.growth_value {
            if !value.is_finite() {
                return Err(ProjectionError::invalid(
                    field("contributions.growthValue"),
                    "must be finite",
                ));
            }
            if schedule.growth_type == Some(ContributionGrowth::Percentage) && value <= -1.0 {
                return Err(ProjectionError::invalid(
                    field("contributions.growthValue"),
                    "must be > -1 for percentage growth",
                ));
            }
        }
        if let (Some(start), Some(end)) = (schedule.start_year, schedule.end_year) {
            if start > end {
                return Err(ProjectionError::invalid(
                    field("contributions.endYear"),
                    "must be >= startYear",
                ));
            }
        }
    }

    for event in &account.events {
        if !event.amount.is_finite() {
            return Err(ProjectionError::invalid(
                field("events.amount"),
                "must be finite",
            ));
        }
    }

    if let Some(benefit) = account.annual_benefit {
        if !benefit.is_finite() || benefit < 0.0 {
            return Err(ProjectionError::invalid(field("annualBenefit"), "must be >= 0"));
        }
    }
    if account
        .benefit_start_age
        .is_some_and(|age| age > MAX_LIFE_EXPECTANCY)
    {
        return Err(ProjectionError::invalid(
            field("benefitStartAge"),
            format!("must be <= {MAX_LIFE_EXPECTANCY}"),
        ));
    }
    Ok(())
}

fn check_range(name: &str, value: f64, min: f64, max: f64) -> Result<()> {
    if !value.is_finite() || !(min..=max).contains(&value) {
        return Err(ProjectionError::invalid(
            name,
            format!("must be between {min} and {max}"),
        ));
    }
    Ok(())
}

fn check_return_rate(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= -1.0 || value > 1.0 {
        return Err(ProjectionError::invalid(name, "must be > -1 and <= 1"));
    }
    Ok(())
}
