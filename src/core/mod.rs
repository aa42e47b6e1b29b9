mod account;
mod contributions;
mod engine;
mod error;
mod retirement;
mod solver;
mod types;
mod validation;

pub use account::AccountBehavior;
pub use contributions::contribution_for_year;
pub use engine::run_projection;
pub use error::{ProjectionError, Result};
pub use retirement::{RetirementSelection, can_retire, compare_desired_age, select_retirement};
pub use solver::{GoalSolveConfig, GoalSolveIteration, GoalSolveResult, GoalType, solve_goal};
pub use types::{
    Account, AccountEvent, AccountType, Assumptions, ContributionFrequency, ContributionGrowth,
    Contributions, DEFAULT_LIFE_EXPECTANCY, DesiredRetirement, ProjectionOptions,
    RetirementResult, YearProjection,
};
pub use validation::validate_inputs;
