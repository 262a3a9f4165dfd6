use std::{
    collections::HashSet,
    sync::atomic::{AtomicBool, Ordering},
};

use rust_decimal::prelude::ToPrimitive;
use tokio::sync::watch;

use crate::{
    common::*,
    config::{data::SubmitConfig, errors::ConfigError},
    distribute::errors::DistributeError,
    plan::{plan_sessions, SigningSession},
    records::{DistributionLedger, DistributionRecord},
    retry::AttemptError,
};

/// UI-pollable progress of a run: how far the orchestrator got and how many
/// members are confirmed versus still pending.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Progress {
    pub session_index: usize,
    pub batch_index: usize,
    pub confirmed_members: usize,
    pub pending_members: usize,
}

/// Terminal status of one orchestration run.
#[derive(Debug, PartialEq, Eq)]
pub enum RunStatus {
    /// The plan was empty; no network call was made.
    NothingToDo,
    Complete,
    /// The signer refused the session's signature pass. Records of earlier
    /// sessions stand.
    Declined { session_index: usize },
    /// Cancellation was requested; the run stopped at a session boundary.
    Aborted { session_index: usize },
    /// A batch exhausted its retry budget (or its anchor expired). Remaining
    /// sessions were not attempted.
    Failed {
        session_index: usize,
        batch_index: usize,
        error: String,
    },
}

/// Outcome of a run, including everything the operator needs to decide on a
/// re-run: who was paid, how many members are still pending, and how far the
/// sessions got.
#[derive(Debug)]
pub struct DistributionReport {
    pub status: RunStatus,
    pub records: Vec<DistributionRecord>,
    pub confirmed_members: usize,
    pub pending_members: usize,
    pub sessions_completed: usize,
}

/// Share units and computed payout for one member, used to derive records
/// from confirmed batches.
#[derive(Clone, Debug)]
pub struct MemberStake {
    pub share_units: Decimal,
    pub expected_amount: u64,
}

#[derive(Clone, Copy, Debug)]
enum SessionState {
    Planned,
    AnchorAcquired,
    Signed,
    Submitting,
    Confirming,
    Done,
    Failed,
}

enum SessionFailure {
    Declined,
    Batch {
        batch_index: usize,
        error: DistributeError,
    },
}

/// Drives signing sessions one after another: acquire an anchor, request one
/// signature pass, then submit and confirm each batch sequentially with
/// bounded retry. Sequential by design, so retry accounting stays
/// deterministic and a single anchor is never raced.
pub struct Orchestrator<P, N> {
    program: P,
    network: N,
    config: SubmitConfig,
    progress: watch::Sender<Progress>,
    cancelled: Arc<AtomicBool>,
}

impl<P: FanoutProgram, N: Network> Orchestrator<P, N> {
    pub fn new(program: P, network: N, config: SubmitConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let (progress, _) = watch::channel(Progress::default());
        Ok(Orchestrator {
            program,
            network,
            config,
            progress,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Subscribe to progress updates; one value per confirmed batch.
    pub fn progress(&self) -> watch::Receiver<Progress> {
        self.progress.subscribe()
    }

    /// Cooperative cancellation: set the flag and the run stops before the
    /// next session. An in-flight submission is allowed to finish.
    pub fn cancellation_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    pub fn program(&self) -> &P {
        &self.program
    }

    /// Pay out every member of `wallet` in batched, session-signed
    /// transactions. Amounts are reconciled against the voucher claim deltas
    /// after the run (computed proportions are kept where a voucher is
    /// missing).
    pub async fn distribute_all(
        &self,
        wallet: &Address,
        for_token_mint: Option<&Address>,
    ) -> Result<DistributionReport> {
        let state = self
            .program
            .fetch_wallet_state(wallet)
            .await?
            .ok_or_else(|| DistributeError::WalletNotFound(wallet.to_string()))?;
        let vouchers = self.program.fetch_member_vouchers(wallet).await?;
        if vouchers.is_empty() {
            return Err(DistributeError::NoMembers(wallet.to_string()).into());
        }

        info!(
            wallet = %wallet,
            members = vouchers.len(),
            balance = state.balance,
            "starting distribution"
        );

        let claimed_before: HashMap<Address, u64> = vouchers
            .iter()
            .map(|v| (v.member_address, v.cumulative_claimed))
            .collect();

        let total_shares = Decimal::from(state.total_shares);
        let mut stakes: IndexMap<Address, MemberStake> = IndexMap::with_capacity(vouchers.len());
        let mut operations = Vec::with_capacity(vouchers.len());

        for voucher in &vouchers {
            let expected_amount =
                compute_expected_amount(state.balance, voucher.share_units, total_shares)?;
            stakes.insert(
                voucher.member_address,
                MemberStake {
                    share_units: voucher.share_units,
                    expected_amount,
                },
            );
            operations.push(self.program.build_payout_operation(
                wallet,
                &voucher.member_address,
                for_token_mint,
            ));
        }

        let mut report = self.plan_and_submit(operations, &stakes).await?;

        if !report.records.is_empty() {
            self.reconcile_amounts(wallet, &claimed_before, &mut report.records)
                .await;
        }

        Ok(report)
    }

    /// Plan `operations` into signing sessions and submit them. Records are
    /// derived for every confirmed payout operation from `stakes`.
    pub async fn plan_and_submit(
        &self,
        operations: Vec<AtomicOperation>,
        stakes: &IndexMap<Address, MemberStake>,
    ) -> Result<DistributionReport> {
        let sessions = plan_sessions(&operations, &self.config.plan_limits(), || {
            self.program.build_fee_priority_operation()
        })?;

        if sessions.is_empty() {
            info!("empty plan, nothing to submit");
            return Ok(DistributionReport {
                status: RunStatus::NothingToDo,
                records: Vec::new(),
                confirmed_members: 0,
                pending_members: 0,
                sessions_completed: 0,
            });
        }

        let total_members: usize = sessions
            .iter()
            .flat_map(|s| &s.batches)
            .map(|b| b.member_count())
            .sum();
        info!(
            sessions = sessions.len(),
            members = total_members,
            "submitting planned sessions"
        );

        let mut ledger = DistributionLedger::new();
        let mut confirmed_members = 0;
        let mut sessions_completed = 0;
        let mut status = RunStatus::Complete;

        self.progress.send_replace(Progress {
            session_index: 0,
            batch_index: 0,
            confirmed_members: 0,
            pending_members: total_members,
        });

        for (session_index, session) in sessions.iter().enumerate() {
            if self.cancelled.load(Ordering::SeqCst) {
                warn!(session_index, "cancellation requested, stopping run");
                status = RunStatus::Aborted { session_index };
                self.progress.send_replace(Progress {
                    session_index,
                    batch_index: 0,
                    confirmed_members,
                    pending_members: total_members - confirmed_members,
                });
                break;
            }

            match self
                .run_session(
                    session_index,
                    session,
                    stakes,
                    &mut ledger,
                    &mut confirmed_members,
                    total_members,
                )
                .await
            {
                Ok(()) => sessions_completed += 1,
                Err(SessionFailure::Declined) => {
                    warn!(session_index, "signing declined, aborting session");
                    status = RunStatus::Declined { session_index };
                    self.progress.send_replace(Progress {
                        session_index,
                        batch_index: 0,
                        confirmed_members,
                        pending_members: total_members - confirmed_members,
                    });
                    break;
                }
                Err(SessionFailure::Batch { batch_index, error }) => {
                    error!(
                        session_index,
                        batch_index,
                        "session failed after exhausting retries: {}",
                        error
                    );
                    status = RunStatus::Failed {
                        session_index,
                        batch_index,
                        error: error.to_string(),
                    };
                    self.progress.send_replace(Progress {
                        session_index,
                        batch_index,
                        confirmed_members,
                        pending_members: total_members - confirmed_members,
                    });
                    break;
                }
            }
        }

        info!(
            confirmed = confirmed_members,
            pending = total_members - confirmed_members,
            sessions_completed,
            "run finished: {:?}",
            status
        );

        Ok(DistributionReport {
            status,
            records: ledger.into_records(),
            confirmed_members,
            pending_members: total_members - confirmed_members,
            sessions_completed,
        })
    }

    async fn run_session(
        &self,
        session_index: usize,
        session: &SigningSession,
        stakes: &IndexMap<Address, MemberStake>,
        ledger: &mut DistributionLedger,
        confirmed_members: &mut usize,
        total_members: usize,
    ) -> Result<(), SessionFailure> {
        let policy = self.config.retry_policy();
        let mut state = SessionState::Planned;
        debug!(session_index, state = ?state, "starting session");

        // one anchor for every batch in the session, never reused afterwards
        let anchor = policy
            .run(|attempt| {
                let network = &self.network;
                async move {
                    debug!(session_index, attempt, "acquiring freshness anchor");
                    network.acquire_freshness_anchor().await.map_err(|e| {
                        AttemptError::Transient(DistributeError::AnchorAcquisition(e.to_string()))
                    })
                }
            })
            .await
            .map_err(|error| SessionFailure::Batch {
                batch_index: 0,
                error,
            })?;
        state = SessionState::AnchorAcquired;
        debug!(session_index, state = ?state, expiry = anchor.expiry, "anchor acquired");

        let payloads: Vec<TransactionPayload> = session
            .batches
            .iter()
            .map(|batch| TransactionPayload {
                operations: batch.operations.clone(),
                anchor: anchor.clone(),
            })
            .collect();

        // one signature pass authorizes the whole session
        let signed = match self.network.sign_batches(payloads).await {
            Ok(SignOutcome::Signed(transactions)) => transactions,
            Ok(SignOutcome::Declined) => return Err(SessionFailure::Declined),
            Err(e) => {
                return Err(SessionFailure::Batch {
                    batch_index: 0,
                    error: DistributeError::Signing(e.to_string()),
                })
            }
        };
        state = SessionState::Signed;
        debug!(session_index, state = ?state, batches = signed.len(), "session signed");

        for (batch_index, (batch, signed_tx)) in
            session.batches.iter().zip(signed.iter()).enumerate()
        {
            state = SessionState::Submitting;
            debug!(session_index, batch_index, state = ?state, "submitting batch");

            let submitted = policy
                .run(|attempt| {
                    let network = &self.network;
                    let anchor = &anchor;
                    async move {
                        let id = network.submit(signed_tx).await.map_err(|e| {
                            AttemptError::Transient(DistributeError::Submission(e.to_string()))
                        })?;
                        debug!(session_index, batch_index, attempt, signature = %id, "awaiting confirmation");
                        let status = network.confirm(&id, anchor).await.map_err(|e| {
                            AttemptError::Transient(DistributeError::Unconfirmed(e.to_string()))
                        })?;
                        match status {
                            ConfirmStatus::Confirmed => Ok(id),
                            ConfirmStatus::Expired => Err(AttemptError::Fatal(
                                DistributeError::AnchorExpired { batch: batch_index },
                            )),
                            ConfirmStatus::Unconfirmed => Err(AttemptError::Transient(
                                DistributeError::Unconfirmed(id.to_string()),
                            )),
                        }
                    }
                })
                .await;

            let transaction_id = match submitted {
                Ok(id) => id,
                Err(error) => {
                    // already-confirmed batches of this session keep their records
                    state = SessionState::Failed;
                    debug!(session_index, batch_index, state = ?state, "batch gave up");
                    return Err(SessionFailure::Batch { batch_index, error });
                }
            };
            state = SessionState::Confirming;
            debug!(session_index, batch_index, state = ?state, signature = %transaction_id, "batch confirmed");

            for operation in batch.member_operations() {
                if !operation.is_payout() {
                    continue;
                }
                let Some(member) = operation.member().copied() else {
                    continue;
                };
                let Some(stake) = stakes.get(&member) else {
                    warn!(member = %member, "no stake information, skipping record");
                    continue;
                };
                let record = DistributionRecord {
                    member_address: member,
                    transaction_id: transaction_id.clone(),
                    share_units: stake.share_units,
                    amount_paid: stake.expected_amount,
                };
                if let Err(err) = ledger.append(session_index, record) {
                    warn!("skipping duplicate record: {}", err);
                }
            }

            *confirmed_members += batch.member_count();
            self.progress.send_replace(Progress {
                session_index,
                batch_index,
                confirmed_members: *confirmed_members,
                pending_members: total_members - *confirmed_members,
            });
        }

        state = SessionState::Done;
        debug!(session_index, state = ?state, "session complete");
        Ok(())
    }

    /// Replace computed amounts with the ledger-confirmed claim deltas where
    /// the post-run voucher fetch provides them.
    async fn reconcile_amounts(
        &self,
        wallet: &Address,
        claimed_before: &HashMap<Address, u64>,
        records: &mut [DistributionRecord],
    ) {
        let vouchers = match self.program.fetch_member_vouchers(wallet).await {
            Ok(vouchers) => vouchers,
            Err(err) => {
                warn!(
                    "voucher re-fetch failed, keeping computed amounts: {}",
                    err
                );
                return;
            }
        };
        let claimed_after: HashMap<Address, u64> = vouchers
            .iter()
            .map(|v| (v.member_address, v.cumulative_claimed))
            .collect();

        for record in records.iter_mut() {
            if let (Some(before), Some(after)) = (
                claimed_before.get(&record.member_address),
                claimed_after.get(&record.member_address),
            ) {
                if let Some(delta) = after.checked_sub(*before) {
                    record.amount_paid = delta;
                }
            }
        }
    }
}

/// Filter out payout operations for members that already hold a record, so a
/// partially failed run can be resumed without paying anyone twice.
pub fn exclude_recorded(
    operations: Vec<AtomicOperation>,
    records: &[DistributionRecord],
) -> Vec<AtomicOperation> {
    let paid: HashSet<Address> = records.iter().map(|r| r.member_address).collect();
    operations
        .into_iter()
        .filter(|op| match op.member() {
            Some(member) if op.is_payout() => !paid.contains(member),
            _ => true,
        })
        .collect()
}

fn compute_expected_amount(
    balance: u64,
    share_units: Decimal,
    total_shares: Decimal,
) -> Result<u64, DistributeError> {
    Decimal::from(balance)
        .checked_mul(share_units)
        .and_then(|d| d.checked_div(total_shares))
        .map(|d| d.trunc())
        .and_then(|d| d.to_u64())
        .ok_or(DistributeError::AmountOverflow)
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::program::{OperationKind, TransactionId};

    fn addr(seed: u8) -> Address {
        Address::new([seed; 32])
    }

    fn payout(seed: u8) -> AtomicOperation {
        AtomicOperation {
            kind: OperationKind::Payout {
                member: addr(seed),
            },
            payload: vec![seed],
            size_cost: 1,
        }
    }

    #[test]
    fn expected_amount_is_proportional() {
        // 1000 base units, 25 of 100 shares
        assert_eq!(
            compute_expected_amount(1000, dec!(25), dec!(100)).unwrap(),
            250
        );
        // fractional result truncates toward zero
        assert_eq!(compute_expected_amount(1000, dec!(1), dec!(3)).unwrap(), 333);
    }

    #[test]
    fn expected_amount_rejects_zero_total() {
        assert!(matches!(
            compute_expected_amount(1000, dec!(10), Decimal::ZERO),
            Err(DistributeError::AmountOverflow)
        ));
    }

    #[test]
    fn exclude_recorded_drops_paid_members() {
        let records = vec![DistributionRecord {
            member_address: addr(1),
            transaction_id: TransactionId("sig".into()),
            share_units: dec!(10),
            amount_paid: 5,
        }];

        let remaining = exclude_recorded(vec![payout(1), payout(2)], &records);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].member(), Some(&addr(2)));
    }
}
