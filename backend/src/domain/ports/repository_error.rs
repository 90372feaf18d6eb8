//! Error shared by persistence ports.

use tracing::warn;

use crate::domain::Error;

use super::define_port_error;

define_port_error! {
    /// Errors raised by repository adapters.
    pub enum RepositoryError {
        /// Storage could not be reached.
        Connection { message: String } => "repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "repository query failed: {message}",
        /// A unique constraint rejected the write.
        Duplicate { message: String } => "duplicate record: {message}",
    }
}

impl From<RepositoryError> for Error {
    fn from(value: RepositoryError) -> Self {
        warn!(error = %value, "repository call failed");
        match value {
            RepositoryError::Connection { .. } => {
                Error::service_unavailable("storage is temporarily unavailable")
            }
            RepositoryError::Duplicate { message } => Error::conflict(message),
            RepositoryError::Query { message } => Error::internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::rstest;

    #[rstest]
    #[case::connection(RepositoryError::connection("refused"), ErrorCode::ServiceUnavailable)]
    #[case::query(RepositoryError::query("syntax"), ErrorCode::InternalError)]
    #[case::duplicate(RepositoryError::duplicate("invite code"), ErrorCode::Conflict)]
    fn maps_to_domain_codes(#[case] error: RepositoryError, #[case] expected: ErrorCode) {
        assert_eq!(Error::from(error).code(), expected);
    }
}
