use thiserror::Error;

#[derive(Debug, Error)]
pub enum DistributeError {
    #[error("Fanout wallet {0} not found")]
    WalletNotFound(String),

    #[error("No membership vouchers found for wallet {0}")]
    NoMembers(String),

    #[error("Failed to acquire a freshness anchor: {0}")]
    AnchorAcquisition(String),

    #[error("Signing request failed: {0}")]
    Signing(String),

    #[error("Submission failed: {0}")]
    Submission(String),

    #[error("Transaction {0} was not confirmed within the anchor window")]
    Unconfirmed(String),

    #[error("Freshness anchor expired before batch {batch} confirmed")]
    AnchorExpired { batch: usize },

    #[error("Numerical overflow while computing a distribution amount")]
    AmountOverflow,
}
