/// Default maximum number of member operations in a single transaction batch
/// (the fee-priority operation is appended on top of this limit).
pub const DEFAULT_OPERATIONS_PER_BATCH: usize = 5;

/// Default number of batches authorized by a single signing pass. Sized so the
/// last batch of a session is expected to confirm before the freshness anchor
/// expires.
pub const DEFAULT_BATCHES_PER_SESSION: usize = 20;

/// Default number of attempts for a failing submission or confirmation.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Default delay between retry attempts, in milliseconds.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

/// Total share units of a wallet unless configured otherwise.
pub const DEFAULT_TOTAL_SHARES: u64 = 100;

/// Fractional digits used by the fixed-point share scheme.
pub const SHARE_FRACTIONAL_DIGITS: u32 = 9;

/// Length of a raw account address.
pub const ADDRESS_BYTES: usize = 32;
