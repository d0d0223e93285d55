use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mizan_core::{DomainError, DomainResult, Entity, RecordId};

use crate::account::AccountId;

/// One debit or credit line of a journal entry.
///
/// Amounts are in the smallest currency unit and always positive; direction is
/// carried by `is_debit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalLine {
    pub account_id: AccountId,
    pub amount: i64,
    pub is_debit: bool,
}

/// A balanced ledger posting.
///
/// `reference` points back at the document the entry was posted for (here:
/// an invoice). Construction validates the double-entry invariant, so a
/// `JournalEntry` value is balanced by definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: RecordId,
    pub reference: RecordId,
    pub lines: Vec<JournalLine>,
    pub description: Option<String>,
    pub posted_at: DateTime<Utc>,
}

impl JournalEntry {
    /// Build a journal entry, enforcing the double-entry invariants.
    pub fn new(
        reference: RecordId,
        lines: Vec<JournalLine>,
        description: Option<String>,
        posted_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if lines.is_empty() {
            return Err(DomainError::validation(
                "journal entry must have at least one line",
            ));
        }

        let mut debit_total: i128 = 0;
        let mut credit_total: i128 = 0;
        for line in &lines {
            if line.amount <= 0 {
                return Err(DomainError::validation(
                    "journal line amount must be positive",
                ));
            }
            if line.is_debit {
                debit_total += line.amount as i128;
            } else {
                credit_total += line.amount as i128;
            }
        }

        if debit_total != credit_total {
            return Err(DomainError::invariant("debits must equal credits"));
        }

        Ok(Self {
            id: RecordId::new(),
            reference,
            lines,
            description,
            posted_at,
        })
    }

    /// Sum of the debit side (equal to the credit side by construction).
    pub fn total(&self) -> i64 {
        self.lines
            .iter()
            .filter(|l| l.is_debit)
            .map(|l| l.amount)
            .sum()
    }
}

impl Entity for JournalEntry {
    type Id = RecordId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
