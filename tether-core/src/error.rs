use thiserror::Error;

/// Conditions the library needs to recognise after they went through
/// [`crate::Error`]. Use `error.downcast_ref::<DbError>()` to match them.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbError {
    #[error("you must provide Environment.user")]
    MissingUser,
    #[error("you must provide Environment.pass, connections without password are not allowed")]
    MissingPass,
    #[error("driver: bad connection")]
    BadConnection,
    #[error("no rows in result set")]
    NoRows,
    #[error("transaction has already been committed or rolled back")]
    TransactionResolved,
}

impl DbError {
    /// True when `error` is (or wraps) this condition.
    pub fn is(self, error: &crate::Error) -> bool {
        error.downcast_ref::<DbError>() == Some(&self)
    }
}
