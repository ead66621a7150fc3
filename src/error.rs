//! Error type shared by the sketches.

/// Result alias used by every fallible operation in this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised when a sketch is configured with values outside its domain.
///
/// Only constructors and parameter-checked combinators (`union`, `merge`)
/// return errors. Updates and queries are total.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

impl Error {
    pub(crate) fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
