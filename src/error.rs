//! Error taxonomy shared by all query operations.

/// Failure of a query against the dataset.
///
/// Each variant maps onto one HTTP status in [`crate::api`]; the message is
/// returned to the caller verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// The dataset failed to load and the operation needs data.
    #[error("{0}")]
    ServiceUnavailable(String),

    /// An enumerated or formatted parameter was not understood.
    #[error("{0}")]
    BadRequest(String),

    /// A named filter value does not occur in the data.
    #[error("{0}")]
    NotFound(String),

    /// Calendar arithmetic produced a date chrono cannot represent.
    #[error("internal error: {0}")]
    Internal(String),
}

impl QueryError {
    pub fn unavailable(what: &str) -> Self {
        QueryError::ServiceUnavailable(format!(
            "Dataset could not be loaded. No {what} available."
        ))
    }
}

/// Result type for query operations
pub type QueryResult<T> = std::result::Result<T, QueryError>;
