//! Waitlist match engine and agent alert pipeline.
//!
//! The pipeline runs per sweep: feed units and active entries go through
//! the match predicate, qualifying entries are grouped by assigned agent
//! and ranked, the notification ledger filters groups already alerted, and
//! each remaining group becomes exactly one email plus one ledger row.

pub mod directory;
pub mod domain;
pub(crate) mod email;
pub mod feed;
pub mod predicate;
pub mod ranker;
pub mod repository;
pub mod router;
pub mod service;

pub use directory::AgentDirectory;
pub use domain::{
    AvailabilityError, EntryId, EntryStatus, EntryType, NotifiedMatch, UnitRecord, WaitlistEntry,
};
pub use feed::{derive_unit_id, AvailabilityImporter, UnitFeedImportError};
pub use predicate::{FlexWindow, MatchOutcome, MatchedEntry, FLEX_WINDOW_DAYS};
pub use ranker::rank;
pub use repository::{
    EmailId, EmailMessage, EntryStore, FeedError, LedgerError, LedgerInsert, MailError, Mailer,
    NotificationLedger, StoreError, UnitFeed,
};
pub use router::waitlist_router;
pub use service::{
    ManualAlertError, ManualAlertReceipt, ManualAlertRequest, ManualContact, ManualUnit,
    NotificationOutcome, SweepError, SweepReport, WaitlistAlertService,
};
