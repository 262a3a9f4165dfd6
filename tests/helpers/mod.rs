#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;

use fanout_distributor::{
    address::Address,
    config::data::SubmitConfig,
    program::{
        AtomicOperation, ConfirmStatus, FanoutProgram, FreshnessAnchor, MemberVoucher, Network,
        OperationKind, SignOutcome, SignedTransaction, TransactionId, TransactionPayload,
        WalletState,
    },
};

pub fn addr(seed: u8) -> Address {
    Address::new([seed; 32])
}

pub fn test_config(per_batch: usize, per_session: usize) -> SubmitConfig {
    SubmitConfig {
        max_operations_per_batch: per_batch,
        max_batches_per_session: per_session,
        retry_attempts: 3,
        retry_delay_ms: 1000,
        retry_jitter_ms: None,
    }
}

pub fn voucher(seed: u8, share_units: Decimal, cumulative_claimed: u64) -> MemberVoucher {
    MemberVoucher {
        member_address: addr(seed),
        share_units,
        cumulative_claimed,
    }
}

#[derive(Default)]
struct ProgramInner {
    wallet_state: Option<WalletState>,
    voucher_snapshots: Vec<Vec<MemberVoucher>>,
    fetch_cursor: AtomicUsize,
    state_fetches: AtomicUsize,
}

/// Scripted stand-in for the on-chain program adapter. Instruction payloads
/// are tagged with the member seed so tests can follow operations through
/// the plan.
#[derive(Clone, Default)]
pub struct FakeProgram {
    inner: Arc<ProgramInner>,
}

impl FakeProgram {
    pub fn with_wallet(state: WalletState) -> Self {
        Self {
            inner: Arc::new(ProgramInner {
                wallet_state: Some(state),
                ..Default::default()
            }),
        }
    }

    /// Wallet absent from the ledger; voucher fetches return the given
    /// snapshots in order (the last one repeats).
    pub fn with_snapshots(state: WalletState, snapshots: Vec<Vec<MemberVoucher>>) -> Self {
        Self {
            inner: Arc::new(ProgramInner {
                wallet_state: Some(state),
                voucher_snapshots: snapshots,
                ..Default::default()
            }),
        }
    }

    pub fn absent() -> Self {
        Self::default()
    }

    pub fn state_fetches(&self) -> usize {
        self.inner.state_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FanoutProgram for FakeProgram {
    fn build_initialize_operation(
        &self,
        _wallet: &Address,
        name: &str,
        _total_shares: u64,
    ) -> AtomicOperation {
        AtomicOperation {
            kind: OperationKind::Initialize,
            payload: name.as_bytes().to_vec(),
            size_cost: 1,
        }
    }

    fn build_registration_operation(
        &self,
        _wallet: &Address,
        member: &Address,
        _share_units: Decimal,
    ) -> AtomicOperation {
        AtomicOperation {
            kind: OperationKind::Registration { member: *member },
            payload: member.as_bytes().to_vec(),
            size_cost: 1,
        }
    }

    fn build_payout_operation(
        &self,
        _wallet: &Address,
        member: &Address,
        _for_token_mint: Option<&Address>,
    ) -> AtomicOperation {
        AtomicOperation {
            kind: OperationKind::Payout { member: *member },
            payload: member.as_bytes().to_vec(),
            size_cost: 1,
        }
    }

    fn build_fee_priority_operation(&self) -> AtomicOperation {
        AtomicOperation {
            kind: OperationKind::FeePriority,
            payload: vec![0xfe],
            size_cost: 0,
        }
    }

    async fn fetch_wallet_state(&self, _wallet: &Address) -> Result<Option<WalletState>> {
        self.inner.state_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.inner.wallet_state.clone())
    }

    async fn fetch_member_vouchers(&self, _wallet: &Address) -> Result<Vec<MemberVoucher>> {
        let snapshots = &self.inner.voucher_snapshots;
        if snapshots.is_empty() {
            return Ok(Vec::new());
        }
        let cursor = self.inner.fetch_cursor.fetch_add(1, Ordering::SeqCst);
        Ok(snapshots[cursor.min(snapshots.len() - 1)].clone())
    }
}

#[derive(Default)]
struct NetworkInner {
    confirm_script: Mutex<VecDeque<ConfirmStatus>>,
    decline_sign_at: Option<usize>,
    fail_submit_always: bool,
    anchor_calls: AtomicUsize,
    sign_calls: AtomicUsize,
    submit_calls: AtomicUsize,
    confirm_calls: AtomicUsize,
    signed_sessions: Mutex<Vec<Vec<TransactionPayload>>>,
}

/// Scripted network. Confirmation outcomes are popped from a queue; once the
/// queue is empty everything confirms.
#[derive(Clone, Default)]
pub struct FakeNetwork {
    inner: Arc<NetworkInner>,
}

impl FakeNetwork {
    pub fn confirming() -> Self {
        Self::default()
    }

    pub fn with_confirm_script(script: Vec<ConfirmStatus>) -> Self {
        Self {
            inner: Arc::new(NetworkInner {
                confirm_script: Mutex::new(script.into()),
                ..Default::default()
            }),
        }
    }

    pub fn declining_session(session: usize) -> Self {
        Self {
            inner: Arc::new(NetworkInner {
                decline_sign_at: Some(session),
                ..Default::default()
            }),
        }
    }

    pub fn failing_submission() -> Self {
        Self {
            inner: Arc::new(NetworkInner {
                fail_submit_always: true,
                ..Default::default()
            }),
        }
    }

    pub fn anchor_calls(&self) -> usize {
        self.inner.anchor_calls.load(Ordering::SeqCst)
    }

    pub fn sign_calls(&self) -> usize {
        self.inner.sign_calls.load(Ordering::SeqCst)
    }

    pub fn submit_calls(&self) -> usize {
        self.inner.submit_calls.load(Ordering::SeqCst)
    }

    pub fn confirm_calls(&self) -> usize {
        self.inner.confirm_calls.load(Ordering::SeqCst)
    }

    /// Payloads of every signed session, in signing order.
    pub fn signed_sessions(&self) -> Vec<Vec<TransactionPayload>> {
        self.inner.signed_sessions.lock().unwrap().clone()
    }
}

#[async_trait]
impl Network for FakeNetwork {
    async fn acquire_freshness_anchor(&self) -> Result<FreshnessAnchor> {
        let n = self.inner.anchor_calls.fetch_add(1, Ordering::SeqCst);
        Ok(FreshnessAnchor {
            anchor: format!("anchor-{n}"),
            expiry: 100 + n as u64,
        })
    }

    async fn sign_batches(&self, transactions: Vec<TransactionPayload>) -> Result<SignOutcome> {
        let n = self.inner.sign_calls.fetch_add(1, Ordering::SeqCst);
        if self.inner.decline_sign_at == Some(n) {
            return Ok(SignOutcome::Declined);
        }
        self.inner
            .signed_sessions
            .lock()
            .unwrap()
            .push(transactions.clone());
        Ok(SignOutcome::Signed(
            transactions
                .into_iter()
                .map(|payload| SignedTransaction {
                    payload,
                    signature: vec![0x5a],
                })
                .collect(),
        ))
    }

    async fn submit(&self, _transaction: &SignedTransaction) -> Result<TransactionId> {
        let n = self.inner.submit_calls.fetch_add(1, Ordering::SeqCst);
        if self.inner.fail_submit_always {
            return Err(anyhow!("node rejected the transaction"));
        }
        Ok(TransactionId(format!("sig-{n}")))
    }

    async fn confirm(
        &self,
        _transaction_id: &TransactionId,
        _anchor: &FreshnessAnchor,
    ) -> Result<ConfirmStatus> {
        self.inner.confirm_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.inner.confirm_script.lock().unwrap().pop_front();
        Ok(next.unwrap_or(ConfirmStatus::Confirmed))
    }
}
