use super::types::{Account, AccountType};

/// How an account behaves inside the yearly loop, resolved once per run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AccountBehavior {
    /// Balance compounds and accepts contributions and events.
    Growable,
    /// Age-gated income stream; the balance is never grown.
    Benefit {
        annual_benefit: f64,
        start_age: u32,
    },
}

impl AccountType {
    pub fn is_benefit_stream(self) -> bool {
        matches!(self, AccountType::Pension | AccountType::SocialSecurity)
    }
}

impl AccountBehavior {
    pub fn classify(account: &Account) -> Self {
        if account.account_type.is_benefit_stream() {
            AccountBehavior::Benefit {
                annual_benefit: account.annual_benefit.unwrap_or(0.0),
                start_age: account.benefit_start_age.unwrap_or(0),
            }
        } else {
            AccountBehavior::Growable
        }
    }

    pub fn applies_growth(self) -> bool {
        matches!(self, AccountBehavior::Growable)
    }

    /// Whether scheduled contributions can land in year `t`. The schedule's
    /// own bounds are checked by the contribution scheduler.
    pub fn is_contribution_eligible(self, account: &Account, t: u32) -> bool {
        match self {
            AccountBehavior::Growable => account.contributions.as_ref().is_some_and(|c| {
                c.start_year.is_none_or(|start| t >= start) && c.end_year.is_none_or(|end| t <= end)
            }),
            AccountBehavior::Benefit { .. } => false,
        }
    }

    pub fn benefit_eligible(self, age: u32) -> bool {
        match self {
            AccountBehavior::Growable => false,
            AccountBehavior::Benefit { start_age, .. } => age >= start_age,
        }
    }

    pub fn benefit_income(self, age: u32) -> f64 {
        match self {
            AccountBehavior::Benefit { annual_benefit, .. } if self.benefit_eligible(age) => {
                annual_benefit
            }
            _ => 0.0,
        }
    }
}
