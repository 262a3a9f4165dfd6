use thiserror::Error;

#[derive(Debug, Error)]
pub enum AllocateError {
    #[error("Duplicate member address: {0}")]
    DuplicateAddress(String),

    #[error("Negative balance for member {0}")]
    NegativeBalance(String),

    #[error("Total shares must be positive, got {0}")]
    NonPositiveTotal(String),

    #[error("Numerical overflow while computing shares")]
    NumericalOverflow,
}
