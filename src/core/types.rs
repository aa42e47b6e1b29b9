use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const DEFAULT_LIFE_EXPECTANCY: u32 = 95;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    TaxableBrokerage,
    #[serde(rename = "TRADITIONAL_401K")]
    Traditional401k,
    TraditionalIra,
    #[serde(rename = "ROTH_401K")]
    Roth401k,
    RothIra,
    Hsa,
    Pension,
    SocialSecurity,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContributionFrequency {
    Monthly,
    Yearly,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContributionGrowth {
    Percentage,
    FixedDollar,
}

/// Policy inputs shared by every account in a run. Rates are decimal fractions.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assumptions {
    pub annual_spending_target: f64,
    pub inflation_rate: f64,
    pub retirement_tax_rate: f64,
    pub withdrawal_rate: f64,
    pub retirement_growth_rate: f64,
    pub investment_fee_rate: f64,
    pub current_age: u32,
    #[serde(default)]
    pub desired_retirement_age: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Contributions {
    pub amount: f64,
    pub frequency: ContributionFrequency,
    #[serde(default)]
    pub growth_type: Option<ContributionGrowth>,
    #[serde(default)]
    pub growth_value: Option<f64>,
    /// First simulation year index that receives the contribution.
    #[serde(default)]
    pub start_year: Option<u32>,
    /// Last simulation year index that receives the contribution (inclusive).
    #[serde(default)]
    pub end_year: Option<u32>,
}

/// Signed one-off adjustment applied in simulation year `year`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountEvent {
    pub year: u32,
    pub amount: f64,
    #[serde(default)]
    pub is_inflation_adjusted: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub name: String,
    pub account_type: AccountType,
    #[serde(default)]
    pub current_balance: f64,
    #[serde(default)]
    pub annual_return_rate: f64,
    #[serde(default)]
    pub contributions: Option<Contributions>,
    #[serde(default)]
    pub events: Vec<AccountEvent>,
    #[serde(default)]
    pub annual_benefit: Option<f64>,
    #[serde(default)]
    pub benefit_start_age: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionOptions {
    /// Calendar year of simulation index 0.
    pub start_year: i32,
    pub life_expectancy: u32,
}

impl ProjectionOptions {
    pub fn starting(start_year: i32) -> Self {
        Self {
            start_year,
            life_expectancy: DEFAULT_LIFE_EXPECTANCY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearProjection {
    pub year: i32,
    pub year_index: u32,
    pub age: u32,
    pub portfolio_value: f64,
    pub total_contributions: f64,
    pub portfolio_growth: f64,
    pub event_impact: f64,
    pub inflation_adjusted_spending: f64,
    pub supported_retirement_income: f64,
    pub after_tax_income: f64,
    pub can_retire: bool,
    pub account_breakdown: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DesiredRetirement {
    pub age: u32,
    pub year: i32,
    pub can_retire: bool,
    pub portfolio_value: f64,
    pub after_tax_income: f64,
    pub inflation_adjusted_spending: f64,
    pub income_gap: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetirementResult {
    pub retirement_year: i32,
    pub retirement_age: u32,
    pub feasible: bool,
    pub portfolio_at_retirement: f64,
    pub annual_income_at_retirement: f64,
    pub target_spending_at_retirement: f64,
    pub desired_retirement: Option<DesiredRetirement>,
    pub year_by_year_projections: Vec<YearProjection>,
}
