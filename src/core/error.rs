use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProjectionError>;

/// Rejections raised at the boundary, before any year is simulated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjectionError {
    #[error("retirement assumptions are not configured")]
    MissingAssumptions,

    #[error("at least one account is required to run a projection")]
    NoAccounts,

    #[error("{field} {reason}")]
    InvalidField { field: String, reason: String },

    #[error("account id '{0}' appears more than once")]
    DuplicateAccountId(String),

    #[error("invalid goal: {0}")]
    InvalidGoal(String),
}

impl ProjectionError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
