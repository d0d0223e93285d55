//! Accounting module (double-entry journal postings).
//!
//! Pure domain logic only: no IO, no HTTP, no persistence concerns.

pub mod account;
pub mod journal;

pub use account::{AccountId, SafeId};
pub use journal::{JournalEntry, JournalLine};
