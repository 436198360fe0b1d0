use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{EntryId, NotifiedMatch, UnitRecord, WaitlistEntry};

/// Read side of the externally owned waitlist roster.
///
/// Entries are created and edited by intake forms outside the engine; the
/// engine only lists active entries and stamps match outcomes.
pub trait EntryStore: Send + Sync {
    fn list_active(&self) -> Result<Vec<WaitlistEntry>, StoreError>;

    /// Record the first successful notification covering this entry.
    /// Implementations must leave an already stamped entry untouched so
    /// repeated stamping is a no-op.
    fn mark_matched(&self, id: &EntryId, at: DateTime<Utc>) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("entry not found")]
    NotFound,
    #[error("entry store unavailable: {0}")]
    Unavailable(String),
}

/// Append-only ledger of delivered (unit, agent) alerts.
pub trait NotificationLedger: Send + Sync {
    /// Full snapshot of every recorded match key, taken once per sweep.
    fn known_keys(&self) -> Result<HashSet<String>, LedgerError>;

    /// Atomic insert-if-absent on `match_key`. Concurrent sweeps racing on
    /// the same key must see exactly one `Inserted`.
    fn record(&self, row: NotifiedMatch) -> Result<LedgerInsert, LedgerError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerInsert {
    Inserted,
    Duplicate,
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("notification ledger unavailable: {0}")]
    Unavailable(String),
}

/// Transactional email capability.
pub trait Mailer: Send + Sync {
    fn send(&self, message: &EmailMessage) -> Result<EmailId, MailError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Provider-assigned identifier for a delivered message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailId(pub String);

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("message rejected by the mail provider: {0}")]
    Rejected(String),
    #[error("mail transport unavailable: {0}")]
    Transport(String),
}

/// Normalized unit availability supplied by the feed adapter.
pub trait UnitFeed: Send + Sync {
    fn units(&self) -> Result<Vec<UnitRecord>, FeedError>;
}

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("availability feed unavailable: {0}")]
    Unavailable(String),
}
