use std::{collections::HashSet, path::Path, str::FromStr};

use anyhow::Result;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{address::Address, program::TransactionId};

/// Column order of the exported table. Fixed: exports must be byte-stable
/// for a given record list.
const CSV_HEADER: &str = "address,transaction_id,share_units,amount_paid";

#[derive(Debug, Error)]
pub enum RecordsError {
    #[error("A record for member {member} already exists in session {session}")]
    DuplicateRecord { member: String, session: usize },

    #[error("Malformed record line {line}: {reason}")]
    MalformedLine { line: usize, reason: String },

    #[error("Missing or invalid header line, expected '{CSV_HEADER}'")]
    InvalidHeader,
}

/// Audit entry for one confirmed per-member payout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DistributionRecord {
    pub member_address: Address,
    pub transaction_id: TransactionId,
    pub share_units: Decimal,
    /// Amount paid to the member, in base units.
    pub amount_paid: u64,
}

/// Append-only accumulator of distribution records for one run. Guarantees
/// at most one record per (member, session) pair; order of appends is the
/// order of export.
#[derive(Debug, Default)]
pub struct DistributionLedger {
    records: Vec<DistributionRecord>,
    seen: HashSet<(Address, usize)>,
}

impl DistributionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(
        &mut self,
        session_index: usize,
        record: DistributionRecord,
    ) -> Result<(), RecordsError> {
        if !self.seen.insert((record.member_address, session_index)) {
            return Err(RecordsError::DuplicateRecord {
                member: record.member_address.to_string(),
                session: session_index,
            });
        }
        self.records.push(record);
        Ok(())
    }

    pub fn records(&self) -> &[DistributionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<DistributionRecord> {
        self.records
    }
}

/// Serialize records into the exportable table: a header line followed by
/// one CSV line per record, columns in fixed order.
pub fn serialize_records(records: &[DistributionRecord]) -> String {
    let mut out = String::from(CSV_HEADER);
    for record in records {
        out.push('\n');
        out.push_str(&format!(
            "{},{},{},{}",
            record.member_address, record.transaction_id, record.share_units, record.amount_paid
        ));
    }
    out.push('\n');
    out
}

/// Parse a table produced by [`serialize_records`].
pub fn parse_records(input: &str) -> Result<Vec<DistributionRecord>, RecordsError> {
    let mut lines = input.lines();
    match lines.next() {
        Some(header) if header.trim_end() == CSV_HEADER => {}
        _ => return Err(RecordsError::InvalidHeader),
    }

    let mut records = Vec::new();
    for (index, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let malformed = |reason: &str| RecordsError::MalformedLine {
            line: index + 2,
            reason: reason.to_string(),
        };

        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != 4 {
            return Err(malformed("expected 4 columns"));
        }
        records.push(DistributionRecord {
            member_address: Address::from_str(fields[0]).map_err(|e| malformed(&e))?,
            transaction_id: TransactionId(fields[1].to_string()),
            share_units: Decimal::from_str(fields[2])
                .map_err(|e| malformed(&e.to_string()))?,
            amount_paid: fields[3]
                .parse()
                .map_err(|_| malformed("invalid amount"))?,
        });
    }
    Ok(records)
}

/// Write the record table to `path`.
pub fn write_records(path: &Path, records: &[DistributionRecord]) -> Result<()> {
    std::fs::write(path, serialize_records(records))?;
    Ok(())
}

/// Timestamped export filename, matching the operator-facing download name.
pub fn suggested_export_filename() -> String {
    format!(
        "distribution_details_{}.csv",
        Utc::now().format("%Y-%m-%dT%H-%M-%S")
    )
}
