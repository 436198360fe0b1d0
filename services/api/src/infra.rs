use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;

use leasewatch::config::AlertConfig;
use leasewatch::workflows::waitlist::{
    AgentDirectory, EmailId, EmailMessage, EntryId, EntryStatus, EntryStore, FeedError,
    LedgerError, LedgerInsert, MailError, Mailer, NotificationLedger, NotifiedMatch, StoreError,
    UnitFeed, UnitRecord, WaitlistEntry,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryEntryStore {
    entries: Arc<Mutex<HashMap<EntryId, WaitlistEntry>>>,
}

impl InMemoryEntryStore {
    pub(crate) fn seed(&self, entries: impl IntoIterator<Item = WaitlistEntry>) {
        let mut guard = self.entries.lock().expect("entry mutex poisoned");
        for entry in entries {
            guard.insert(entry.id.clone(), entry);
        }
    }
}

impl EntryStore for InMemoryEntryStore {
    fn list_active(&self) -> Result<Vec<WaitlistEntry>, StoreError> {
        let guard = self.entries.lock().expect("entry mutex poisoned");
        Ok(guard
            .values()
            .filter(|entry| entry.status == EntryStatus::Active)
            .cloned()
            .collect())
    }

    fn mark_matched(&self, id: &EntryId, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut guard = self.entries.lock().expect("entry mutex poisoned");
        let entry = guard.get_mut(id).ok_or(StoreError::NotFound)?;
        if entry.matched_at.is_none() {
            entry.matched_at = Some(at);
        }
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryNotificationLedger {
    rows: Arc<Mutex<HashMap<String, NotifiedMatch>>>,
}

impl InMemoryNotificationLedger {
    pub(crate) fn rows(&self) -> Vec<NotifiedMatch> {
        self.rows
            .lock()
            .expect("ledger mutex poisoned")
            .values()
            .cloned()
            .collect()
    }
}

impl NotificationLedger for InMemoryNotificationLedger {
    fn known_keys(&self) -> Result<HashSet<String>, LedgerError> {
        let guard = self.rows.lock().expect("ledger mutex poisoned");
        Ok(guard.keys().cloned().collect())
    }

    fn record(&self, row: NotifiedMatch) -> Result<LedgerInsert, LedgerError> {
        let mut guard = self.rows.lock().expect("ledger mutex poisoned");
        if guard.contains_key(&row.match_key) {
            return Ok(LedgerInsert::Duplicate);
        }
        guard.insert(row.match_key.clone(), row);
        Ok(LedgerInsert::Inserted)
    }
}

/// Mailer that records deliveries in an in-process outbox and logs them.
/// Stands in for the transactional provider in demos and local runs.
#[derive(Default)]
pub(crate) struct RecordingMailer {
    outbox: Arc<Mutex<Vec<EmailMessage>>>,
    sequence: AtomicU64,
}

impl RecordingMailer {
    pub(crate) fn sent(&self) -> Vec<EmailMessage> {
        self.outbox.lock().expect("outbox mutex poisoned").clone()
    }
}

impl Mailer for RecordingMailer {
    fn send(&self, message: &EmailMessage) -> Result<EmailId, MailError> {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed);
        info!(to = %message.to, subject = %message.subject, "recording outbound alert");
        self.outbox
            .lock()
            .expect("outbox mutex poisoned")
            .push(message.clone());
        Ok(EmailId(format!("local-{id:06}")))
    }
}

#[derive(Default, Clone)]
pub(crate) struct StaticUnitFeed {
    units: Arc<Mutex<Vec<UnitRecord>>>,
}

impl StaticUnitFeed {
    pub(crate) fn replace(&self, units: Vec<UnitRecord>) {
        *self.units.lock().expect("feed mutex poisoned") = units;
    }
}

impl UnitFeed for StaticUnitFeed {
    fn units(&self) -> Result<Vec<UnitRecord>, FeedError> {
        Ok(self.units.lock().expect("feed mutex poisoned").clone())
    }
}

pub(crate) fn agent_directory(config: &AlertConfig) -> AgentDirectory {
    AgentDirectory::from_pairs(
        config.from_address.clone(),
        config.fallback_address.clone(),
        config.agents.iter().cloned(),
    )
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
