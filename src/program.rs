use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::address::Address;

/// What a unit of ledger work does. Every operation is bound to at most one
/// member; the fee-priority operation rides along with each batch and is
/// excluded from record keeping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperationKind {
    /// Create the pooled wallet. Must be the first operation of a plan and
    /// is always sealed into its own batch.
    Initialize,
    /// Register one member with its share units.
    Registration { member: Address },
    /// Pay out one member's accrued share.
    Payout { member: Address },
    /// Priority-fee operation appended to every batch.
    FeePriority,
}

/// One indivisible unit of ledger work, produced by a [`FanoutProgram`]
/// adapter. The payload is opaque to the planner and orchestrator; only the
/// kind and the size cost matter for batching.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AtomicOperation {
    pub kind: OperationKind,
    /// Encoded instruction payload, submitted as-is.
    pub payload: Vec<u8>,
    /// Cost of the operation toward the per-batch operation-count limit.
    pub size_cost: usize,
}

impl AtomicOperation {
    /// The member this operation is bound to, if any.
    pub fn member(&self) -> Option<&Address> {
        match &self.kind {
            OperationKind::Registration { member } | OperationKind::Payout { member } => {
                Some(member)
            }
            OperationKind::Initialize | OperationKind::FeePriority => None,
        }
    }

    pub fn is_payout(&self) -> bool {
        matches!(self.kind, OperationKind::Payout { .. })
    }
}

/// Short-lived token the network requires for a transaction to be accepted
/// before it expires. One anchor is shared by every batch of a signing
/// session and never reused afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FreshnessAnchor {
    pub anchor: String,
    pub expiry: u64,
}

/// Identifier of a submitted transaction.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub String);

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An unsigned transaction: the operations of one batch bound to the
/// session's freshness anchor.
#[derive(Clone, Debug)]
pub struct TransactionPayload {
    pub operations: Vec<AtomicOperation>,
    pub anchor: FreshnessAnchor,
}

/// A transaction that went through the signing capability and can be
/// submitted.
#[derive(Clone, Debug)]
pub struct SignedTransaction {
    pub payload: TransactionPayload,
    pub signature: Vec<u8>,
}

/// Outcome of a signing request over a whole session. A decline covers the
/// entire session: none of its batches can be submitted.
#[derive(Debug)]
pub enum SignOutcome {
    Signed(Vec<SignedTransaction>),
    Declined,
}

/// Confirmation status of a submitted transaction relative to its anchor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmStatus {
    Confirmed,
    /// The anchor expired before the transaction landed. Retrying the same
    /// signed transaction cannot succeed.
    Expired,
    /// Not confirmed yet; worth retrying within the same anchor window.
    Unconfirmed,
}

/// On-chain state of a pooled wallet.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WalletState {
    pub total_shares: u64,
    pub total_members: u32,
    /// Distributable balance, in base units.
    pub balance: u64,
    pub name: String,
}

/// Per-member voucher as recorded by the program.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MemberVoucher {
    pub member_address: Address,
    pub share_units: Decimal,
    /// Total amount the member has claimed so far, in base units.
    pub cumulative_claimed: u64,
}

/// Instruction-builder adapter over the external on-chain program.
///
/// Implementations wrap the program SDK: they encode instructions and fetch
/// account state, nothing more. The planner and orchestrator never look
/// inside an operation payload.
#[async_trait]
pub trait FanoutProgram: Send + Sync {
    /// Encode the wallet-initialization operation.
    fn build_initialize_operation(
        &self,
        wallet: &Address,
        name: &str,
        total_shares: u64,
    ) -> AtomicOperation;

    /// Encode the registration of `member` with `share_units`.
    fn build_registration_operation(
        &self,
        wallet: &Address,
        member: &Address,
        share_units: Decimal,
    ) -> AtomicOperation;

    /// Encode the payout of `member`'s accrued share, optionally for a
    /// specific token mint instead of the native asset.
    fn build_payout_operation(
        &self,
        wallet: &Address,
        member: &Address,
        for_token_mint: Option<&Address>,
    ) -> AtomicOperation;

    /// Encode the fee-priority operation appended to each batch.
    fn build_fee_priority_operation(&self) -> AtomicOperation;

    /// Fetch the wallet state, or `None` when the wallet does not exist.
    async fn fetch_wallet_state(&self, wallet: &Address) -> Result<Option<WalletState>>;

    /// Fetch all member vouchers of the wallet.
    async fn fetch_member_vouchers(&self, wallet: &Address) -> Result<Vec<MemberVoucher>>;
}

/// Network primitives consumed by the submission orchestrator.
///
/// The signing capability is part of this trait rather than an ambient
/// wallet object: callers pass an explicit implementation per run.
#[async_trait]
pub trait Network: Send + Sync {
    /// Request a freshness anchor and its expiry marker.
    async fn acquire_freshness_anchor(&self) -> Result<FreshnessAnchor>;

    /// Request one signature pass over all transactions of a session.
    async fn sign_batches(&self, transactions: Vec<TransactionPayload>) -> Result<SignOutcome>;

    /// Submit a signed transaction.
    async fn submit(&self, transaction: &SignedTransaction) -> Result<TransactionId>;

    /// Await confirmation of `transaction_id`, tied to the anchor it was
    /// built against.
    async fn confirm(
        &self,
        transaction_id: &TransactionId,
        anchor: &FreshnessAnchor,
    ) -> Result<ConfirmStatus>;
}
