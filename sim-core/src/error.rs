use thiserror::Error;

/// Closed error taxonomy for the simulation core. Every fallible public
/// function returns `Result<T, DomainError>`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("domain invariant violated: {0}")]
    DomainInvariant(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("insufficient inventory: {0}")]
    InsufficientInventory(String),

    #[error("optimistic lock conflict: {0}")]
    OptimisticLockConflict(String),
}

impl DomainError {
    /// Whether a caller may reasonably retry this operation after re-reading
    /// state, as opposed to treating it as a fixed failure.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            DomainError::InsufficientFunds(_)
                | DomainError::InsufficientInventory(_)
                | DomainError::OptimisticLockConflict(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;
