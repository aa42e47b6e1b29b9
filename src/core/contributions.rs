use super::account::AccountBehavior;
use super::types::{Account, ContributionFrequency, ContributionGrowth};

/// Scheduled inflow for `account` in simulation year `t`.
///
/// Growth compounds from the schedule's own start year, so a schedule that
/// begins in year 5 contributes its base amount in year 5, not a grown one.
pub fn contribution_for_year(account: &Account, t: u32) -> f64 {
    let behavior = AccountBehavior::classify(account);
    scheduled_contribution(account, behavior, t)
}

pub(crate) fn scheduled_contribution(account: &Account, behavior: AccountBehavior, t: u32) -> f64 {
    if !behavior.is_contribution_eligible(account, t) {
        return 0.0;
    }
    let Some(schedule) = account.contributions.as_ref() else {
        return 0.0;
    };

    let base = match schedule.frequency {
        ContributionFrequency::Monthly => schedule.amount * 12.0,
        ContributionFrequency::Yearly => schedule.amount,
    };
    let elapsed = t - schedule.start_year.unwrap_or(0);
    let growth_value = schedule.growth_value.unwrap_or(0.0);

    let annual = match schedule.growth_type {
        Some(ContributionGrowth::FixedDollar) => base + growth_value * elapsed as f64,
        Some(ContributionGrowth::Percentage) => base * (1.0 + growth_value).powi(elapsed as i32),
        None => base,
    };
    annual.max(0.0)
}
