use thiserror::Error;

#[derive(Debug, Error)]
pub enum CreateError {
    #[error("Wallet name cannot be empty")]
    NameRequired,

    #[error("Wallet name cannot contain spaces")]
    NameContainsSpaces,

    #[error("At least one member with a positive share is required")]
    NoMembers,

    #[error("Total shares must be greater than zero")]
    ZeroTotalShares,

    #[error("Member shares must sum to {expected}, got {actual}")]
    SharesMustSumToTotal { expected: String, actual: String },

    #[error("Member {0} appears more than once")]
    DuplicateMember(String),

    #[error("Member {0} has a negative share")]
    NegativeShare(String),

    #[error("Fanout wallet {0} already exists")]
    WalletAlreadyExists(String),
}
