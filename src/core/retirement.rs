use super::types::{DesiredRetirement, YearProjection};

/// Sufficiency test for a single simulated year.
pub fn can_retire(after_tax_income: f64, inflation_adjusted_spending: f64) -> bool {
    after_tax_income >= inflation_adjusted_spending
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetirementSelection {
    pub index: usize,
    pub feasible: bool,
}

/// First year that passes the sufficiency test wins. When none does, the
/// final simulated year is reported as infeasible.
pub fn select_retirement(years: &[YearProjection]) -> Option<RetirementSelection> {
    match years.iter().position(|y| y.can_retire) {
        Some(index) => Some(RetirementSelection {
            index,
            feasible: true,
        }),
        None if years.is_empty() => None,
        None => Some(RetirementSelection {
            index: years.len() - 1,
            feasible: false,
        }),
    }
}

pub fn compare_desired_age(
    years: &[YearProjection],
    desired_age: u32,
) -> Option<DesiredRetirement> {
    let row = years.iter().find(|y| y.age == desired_age)?;
    Some(DesiredRetirement {
        age: row.age,
        year: row.year,
        can_retire: row.can_retire,
        portfolio_value: row.portfolio_value,
        after_tax_income: row.after_tax_income,
        inflation_adjusted_spending: row.inflation_adjusted_spending,
        income_gap: row.after_tax_income - row.inflation_adjusted_spending,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn row(year_index: u32, after_tax_income: f64, spending: f64) -> YearProjection {
        YearProjection {
            year: 2030 + year_index as i32,
            year_index,
            age: 50 + year_index,
            portfolio_value: after_tax_income * 25.0,
            total_contributions: 0.0,
            portfolio_growth: 0.0,
            event_impact: 0.0,
            inflation_adjusted_spending: spending,
            supported_retirement_income: after_tax_income,
            after_tax_income,
            can_retire: can_retire(after_tax_income, spending),
            account_breakdown: BTreeMap::new(),
        }
    }

    #[test]
    fn equal_income_and_spending_is_sufficient() {
        assert!(can_retire(40_000.0, 40_000.0));
        assert!(!can_retire(39_999.99, 40_000.0));
    }

    #[test]
    fn first_passing_year_wins() {
        let years = vec![
            row(0, 10.0, 20.0),
            row(1, 25.0, 20.0),
            row(2, 15.0, 20.0),
            row(3, 30.0, 20.0),
        ];
        assert_eq!(
            select_retirement(&years),
            Some(RetirementSelection {
                index: 1,
                feasible: true
            })
        );
    }

    #[test]
    fn infeasible_run_reports_last_year() {
        let years = vec![row(0, 1.0, 20.0), row(1, 2.0, 20.0), row(2, 3.0, 20.0)];
        assert_eq!(
            select_retirement(&years),
            Some(RetirementSelection {
                index: 2,
                feasible: false
            })
        );
        assert_eq!(select_retirement(&[]), None);
    }

    #[test]
    fn desired_age_comparison_reads_matching_row() {
        let years = vec![row(0, 10.0, 20.0), row(1, 25.0, 20.0)];
        let desired = compare_desired_age(&years, 50).expect("row for age 50");
        assert_eq!(desired.year, 2030);
        assert!(!desired.can_retire);
        assert_eq!(desired.income_gap, -10.0);
        assert!(compare_desired_age(&years, 70).is_none());
    }
}
