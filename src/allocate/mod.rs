pub mod errors;

pub use errors::*;

use indexmap::IndexSet;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::address::Address;
use crate::constants::SHARE_FRACTIONAL_DIGITS;

/// Rounding precision of the computed share units.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Precision {
    /// Whole share units, for small fixed totals such as 100.
    Integer,
    /// Fixed-point share units with the given number of fractional digits.
    Fractional(u32),
}

impl Precision {
    fn digits(self) -> u32 {
        match self {
            Precision::Integer => 0,
            Precision::Fractional(digits) => digits,
        }
    }
}

impl Default for Precision {
    fn default() -> Self {
        Precision::Fractional(SHARE_FRACTIONAL_DIGITS)
    }
}

/// A member's balance as observed on the ledger.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Holding {
    pub address: Address,
    pub balance: Decimal,
}

/// A member's computed share of the configured total.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShareAssignment {
    pub address: Address,
    pub balance: Decimal,
    pub share_units: Decimal,
}

/// Convert raw balances into share units summing exactly to `total`.
///
/// Members below `threshold_min` receive zero. Eligible members receive
/// shares proportional to their balance, rounded half-away-from-zero at the
/// declared precision; any rounding residual is assigned to the eligible
/// member with the largest balance (first occurrence on ties, matching the
/// on-chain registration order). When nobody is eligible every share is zero
/// and the caller must treat the allocation as unusable for submission.
pub fn allocate_shares(
    holdings: &[Holding],
    threshold_min: Decimal,
    total: Decimal,
    precision: Precision,
) -> Result<Vec<ShareAssignment>, AllocateError> {
    if total <= Decimal::ZERO {
        return Err(AllocateError::NonPositiveTotal(total.to_string()));
    }

    let mut seen: IndexSet<Address> = IndexSet::with_capacity(holdings.len());
    for holding in holdings {
        if holding.balance < Decimal::ZERO {
            return Err(AllocateError::NegativeBalance(holding.address.to_string()));
        }
        if !seen.insert(holding.address) {
            return Err(AllocateError::DuplicateAddress(holding.address.to_string()));
        }
    }

    let eligible_sum: Decimal = holdings
        .iter()
        .filter(|h| h.balance >= threshold_min)
        .map(|h| h.balance)
        .sum();

    if eligible_sum.is_zero() {
        debug!("no member reaches the eligibility threshold");
        return Ok(holdings
            .iter()
            .map(|h| ShareAssignment {
                address: h.address,
                balance: h.balance,
                share_units: Decimal::ZERO,
            })
            .collect());
    }

    let digits = precision.digits();
    let mut assignments: Vec<ShareAssignment> = Vec::with_capacity(holdings.len());
    let mut assigned_sum = Decimal::ZERO;

    for holding in holdings {
        let share_units = if holding.balance >= threshold_min {
            let raw = holding
                .balance
                .checked_mul(total)
                .ok_or(AllocateError::NumericalOverflow)?
                .checked_div(eligible_sum)
                .ok_or(AllocateError::NumericalOverflow)?;
            raw.round_dp_with_strategy(digits, RoundingStrategy::MidpointAwayFromZero)
        } else {
            Decimal::ZERO
        };

        assigned_sum += share_units;
        assignments.push(ShareAssignment {
            address: holding.address,
            balance: holding.balance,
            share_units,
        });
    }

    // Rounding can leave the sum off the total; the largest eligible balance
    // absorbs the residual (first occurrence wins a tie).
    let residual = total - assigned_sum;
    if !residual.is_zero() {
        // strict comparison keeps the first occurrence on equal balances
        let mut largest: Option<usize> = None;
        for (i, assignment) in assignments.iter().enumerate() {
            if assignment.balance >= threshold_min
                && largest.map_or(true, |j| assignment.balance > assignments[j].balance)
            {
                largest = Some(i);
            }
        }
        if let Some(i) = largest {
            if assignments[i].share_units + residual >= Decimal::ZERO {
                debug!(
                    member = %assignments[i].address,
                    residual = %residual,
                    "assigning rounding residual"
                );
                assignments[i].share_units += residual;
            } else {
                // the precision is too coarse for one member to absorb the
                // residual without going negative; re-apportion instead
                debug!(residual = %residual, "re-apportioning by largest remainder");
                apportion_by_largest_remainder(
                    &mut assignments,
                    threshold_min,
                    total,
                    eligible_sum,
                    digits,
                )?;
            }
        }
    }

    Ok(assignments)
}

/// Largest-remainder apportionment at the declared precision: floor every
/// eligible share, then hand out the leftover one step at a time in
/// descending remainder order. The stable sort keeps the first occurrence
/// ahead on equal remainders, and no share can go below zero.
fn apportion_by_largest_remainder(
    assignments: &mut [ShareAssignment],
    threshold_min: Decimal,
    total: Decimal,
    eligible_sum: Decimal,
    digits: u32,
) -> Result<(), AllocateError> {
    let step = Decimal::new(1, digits);
    let mut remainders: Vec<(usize, Decimal)> = Vec::new();
    let mut floored_sum = Decimal::ZERO;

    for (i, assignment) in assignments.iter_mut().enumerate() {
        if assignment.balance < threshold_min {
            assignment.share_units = Decimal::ZERO;
            continue;
        }
        let raw = assignment
            .balance
            .checked_mul(total)
            .ok_or(AllocateError::NumericalOverflow)?
            .checked_div(eligible_sum)
            .ok_or(AllocateError::NumericalOverflow)?;
        let base = raw.round_dp_with_strategy(digits, RoundingStrategy::ToZero);
        assignment.share_units = base;
        floored_sum += base;
        remainders.push((i, raw - base));
    }

    remainders.sort_by(|a, b| b.1.cmp(&a.1));

    let mut leftover = total - floored_sum;
    let mut next = 0;
    while leftover >= step && next < remainders.len() {
        assignments[remainders[next].0].share_units += step;
        leftover -= step;
        next += 1;
    }

    Ok(())
}
