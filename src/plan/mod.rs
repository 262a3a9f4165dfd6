pub mod errors;

pub use errors::*;

use crate::program::{AtomicOperation, OperationKind};

/// Ledger-imposed batching limits for one run.
#[derive(Clone, Copy, Debug)]
pub struct PlanLimits {
    /// Member operations per transaction, excluding the fee-priority
    /// operation appended when a batch is sealed.
    pub max_operations_per_batch: usize,
    /// Transactions covered by a single signing pass.
    pub max_batches_per_session: usize,
}

/// An ordered group of operations submitted as one transaction. The last
/// operation is always the fee-priority operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionBatch {
    pub operations: Vec<AtomicOperation>,
}

impl TransactionBatch {
    /// Operations bound to a member, in input order (the trailing
    /// fee-priority and any initialization operation are skipped).
    pub fn member_operations(&self) -> impl Iterator<Item = &AtomicOperation> {
        self.operations.iter().filter(|op| op.member().is_some())
    }

    pub fn member_count(&self) -> usize {
        self.member_operations().count()
    }
}

/// An ordered group of batches sharing one freshness anchor and one signing
/// request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SigningSession {
    pub batches: Vec<TransactionBatch>,
}

/// Partition `operations` into signing sessions of bounded batches,
/// preserving input order.
///
/// Batches are consecutive chunks whose summed size cost stays within
/// `max_operations_per_batch`; each sealed chunk gets one fee-priority
/// operation (built by `fee_op`) appended. An initialization operation is
/// sealed alone into the leading batch so a failure there cannot take member
/// operations down with it. The batch sequence is then chunked into sessions
/// of at most `max_batches_per_session`.
///
/// Planning is pure and deterministic: the same input yields the same plan.
pub fn plan_sessions<F>(
    operations: &[AtomicOperation],
    limits: &PlanLimits,
    fee_op: F,
) -> Result<Vec<SigningSession>, PlanError>
where
    F: Fn() -> AtomicOperation,
{
    if operations.is_empty() {
        return Ok(Vec::new());
    }

    let limit = limits.max_operations_per_batch;
    let mut batches: Vec<TransactionBatch> = Vec::new();
    let mut current: Vec<AtomicOperation> = Vec::new();
    let mut current_cost = 0;

    for (index, op) in operations.iter().enumerate() {
        if op.size_cost > limit {
            return Err(PlanError::OversizedOperation {
                cost: op.size_cost,
                limit,
            });
        }

        if matches!(op.kind, OperationKind::Initialize) {
            if index != 0 {
                return Err(PlanError::InitializeNotFirst(index));
            }
            // never combined with member operations
            let mut ops = vec![op.clone()];
            ops.push(fee_op());
            batches.push(TransactionBatch { operations: ops });
            continue;
        }

        if current_cost + op.size_cost > limit {
            current.push(fee_op());
            batches.push(TransactionBatch {
                operations: std::mem::take(&mut current),
            });
            current_cost = 0;
        }

        current_cost += op.size_cost;
        current.push(op.clone());
    }

    if !current.is_empty() {
        current.push(fee_op());
        batches.push(TransactionBatch { operations: current });
    }

    let sessions = batches
        .chunks(limits.max_batches_per_session)
        .map(|chunk| SigningSession {
            batches: chunk.to_vec(),
        })
        .collect();

    Ok(sessions)
}
