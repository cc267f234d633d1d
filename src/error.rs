use thiserror::Error;

/// Errors reported by the strict parts of the API.
///
/// The iterable operations themselves never fail: they fall back to empty or
/// default results. Only registration, `try_*` constructors and explicit
/// conversions surface these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Failed to acquire a lock on one of the process-wide registries
    #[error("Failed to acquire lock")]
    LockError,
    /// A typed accessor was used with a type that doesn't match the stored value
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    /// No conversion exists between the two types, or it would lose information
    #[error("Cannot convert {from} to {to}")]
    Unconvertible {
        from: &'static str,
        to: &'static str,
    },
    /// The value does not hold a registered associative container
    #[error("Type {0} is not a registered associative container")]
    NotAssociative(String),
}
