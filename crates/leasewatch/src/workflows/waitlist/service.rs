use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::directory::AgentDirectory;
use super::domain::{EntryId, EntryType, NotifiedMatch, UnitRecord};
use super::email::{self, AlertRow};
use super::feed::derive_unit_id;
use super::predicate::{self, MatchedEntry};
use super::ranker;
use super::repository::{
    EntryStore, FeedError, LedgerError, LedgerInsert, MailError, Mailer, NotificationLedger,
    StoreError, UnitFeed,
};

/// Service composing the feed, roster, ledger, and mailer collaborators.
///
/// Each sweep recomputes every match from scratch; the only state carried
/// between sweeps is the notification ledger, which is what makes the
/// recomputation safe to repeat.
pub struct WaitlistAlertService<F, S, L, M> {
    feed: Arc<F>,
    entries: Arc<S>,
    ledger: Arc<L>,
    mailer: Arc<M>,
    directory: AgentDirectory,
}

impl<F, S, L, M> WaitlistAlertService<F, S, L, M>
where
    F: UnitFeed + 'static,
    S: EntryStore + 'static,
    L: NotificationLedger + 'static,
    M: Mailer + 'static,
{
    pub fn new(
        feed: Arc<F>,
        entries: Arc<S>,
        ledger: Arc<L>,
        mailer: Arc<M>,
        directory: AgentDirectory,
    ) -> Self {
        Self {
            feed,
            entries,
            ledger,
            mailer,
            directory,
        }
    }

    /// Run one full match sweep: every active entry against every unit in
    /// the feed, one alert per previously unseen (unit, agent) group.
    ///
    /// Group-level problems (a failed send, an unknown agent address) are
    /// reported per group and never abort the sweep; only an unreachable
    /// collaborator does.
    pub fn run_sweep(&self, now: DateTime<Utc>) -> Result<SweepReport, SweepError> {
        let today = now.date_naive();
        let units = self.feed.units()?;
        let entries = self.entries.list_active()?;
        let known_keys = self.ledger.known_keys()?;

        let mut notifications = Vec::new();
        let mut sent = 0usize;
        let mut unassigned_matches = 0usize;

        for unit in &units {
            let available_on = match unit.availability_on(today) {
                Ok(date) => date,
                Err(err) => {
                    warn!(unit = %unit.label(), error = %err, "skipping unit with unreadable availability");
                    continue;
                }
            };

            let mut groups: BTreeMap<String, Vec<MatchedEntry>> = BTreeMap::new();
            for entry in &entries {
                let outcome = predicate::evaluate(entry, unit, available_on);
                if !outcome.is_match() {
                    continue;
                }
                match entry.agent() {
                    Some(agent) => groups.entry(agent.to_string()).or_default().push(MatchedEntry {
                        entry: entry.clone(),
                        outcome,
                    }),
                    // Still a match for statistics, but nobody to alert.
                    None => unassigned_matches += 1,
                }
            }

            for (agent, group) in groups {
                let match_key = NotifiedMatch::key_for(&unit.unique_id, &agent);
                if known_keys.contains(&match_key) {
                    continue;
                }

                let outcome = self.dispatch_group(unit, &agent, group, now);
                if outcome.success {
                    sent += 1;
                }
                notifications.push(outcome);
            }
        }

        if unassigned_matches > 0 {
            info!(
                unassigned_matches,
                "matches without an assigned agent counted but not alerted"
            );
        }

        info!(
            units = units.len(),
            entries = entries.len(),
            sent,
            "waitlist sweep complete"
        );

        Ok(SweepReport {
            success: true,
            checked: now,
            units_checked: units.len(),
            entries_checked: entries.len(),
            notifications_sent: sent,
            notifications,
        })
    }

    /// Deliver one (unit, agent) group: rank, render, send, then record.
    /// The ledger row is written only after the provider confirms the send,
    /// so a failed delivery stays eligible for the next sweep.
    fn dispatch_group(
        &self,
        unit: &UnitRecord,
        agent: &str,
        group: Vec<MatchedEntry>,
        now: DateTime<Utc>,
    ) -> NotificationOutcome {
        let ranked = ranker::rank(group);
        let contacts = ranked.len();

        let Some(to) = self.directory.address_for(agent) else {
            warn!(agent, unit = %unit.label(), "no address on file for agent; group left for next sweep");
            return NotificationOutcome {
                agent: agent.to_string(),
                unit: unit.label(),
                contacts,
                success: false,
            };
        };

        let rows: Vec<AlertRow> = ranked.iter().map(alert_row).collect();
        let message = email::match_alert(unit, agent, &rows, self.directory.from_address(), to);

        let email_id = match self.mailer.send(&message) {
            Ok(id) => id,
            Err(err) => {
                warn!(agent, unit = %unit.label(), error = %err, "alert dispatch failed; will retry next sweep");
                return NotificationOutcome {
                    agent: agent.to_string(),
                    unit: unit.label(),
                    contacts,
                    success: false,
                };
            }
        };

        let entry_ids: Vec<EntryId> = ranked.iter().map(|m| m.entry.id.clone()).collect();
        let row = NotifiedMatch {
            match_key: NotifiedMatch::key_for(&unit.unique_id, agent),
            agent: agent.to_string(),
            unit_id: unit.unique_id.clone(),
            entry_ids: entry_ids.clone(),
            notified_at: now,
        };

        match self.ledger.record(row) {
            Ok(LedgerInsert::Inserted) => {}
            Ok(LedgerInsert::Duplicate) => {
                info!(agent, unit = %unit.label(), "concurrent sweep recorded this alert first");
            }
            Err(err) => {
                // The send already happened; losing it would be worse than
                // the duplicate the next sweep might produce.
                error!(agent, unit = %unit.label(), error = %err, "alert delivered but ledger write failed");
            }
        }

        self.stamp_outcomes(&entry_ids, now);

        info!(
            agent,
            unit = %unit.label(),
            contacts,
            email = %email_id.0,
            "waitlist alert delivered"
        );

        NotificationOutcome {
            agent: agent.to_string(),
            unit: unit.label(),
            contacts,
            success: true,
        }
    }

    /// Stamp `matched_at` for every entry covered by a confirmed send. The
    /// store's set-only-if-null contract makes repeats harmless.
    fn stamp_outcomes(&self, entry_ids: &[EntryId], now: DateTime<Utc>) {
        for id in entry_ids {
            if let Err(err) = self.entries.mark_matched(id, now) {
                warn!(entry = %id.0, error = %err, "failed to stamp match outcome");
            }
        }
    }

    /// Operator-driven alert for a single unit with hand-picked contacts.
    ///
    /// This path may route to the shared leasing inbox when no agent is
    /// named or known, and it deliberately bypasses the dedup ledger: the
    /// contacts are caller-supplied, not engine-computed matches.
    pub fn notify_unit(
        &self,
        request: ManualAlertRequest,
        now: DateTime<Utc>,
    ) -> Result<ManualAlertReceipt, ManualAlertError> {
        let ManualAlertRequest {
            unit,
            agent,
            contacts,
        } = request;

        if contacts.is_empty() {
            return Err(ManualAlertError::InvalidRequest(
                "at least one contact is required".to_string(),
            ));
        }

        let unit = unit.into_record()?;
        unit.availability_on(now.date_naive())
            .map_err(|err| ManualAlertError::InvalidRequest(err.to_string()))?;

        let to = self.directory.address_or_fallback(agent.as_deref());
        let greeting = agent.as_deref().unwrap_or("Leasing Team");

        let rows: Vec<AlertRow> = contacts
            .iter()
            .map(|contact| AlertRow {
                name: contact.name.clone(),
                email: contact.email.clone(),
                phone: contact.phone.clone(),
                entry_type: contact.entry_type,
                budget: contact.budget,
                move_in: contact.move_in_date,
                note: None,
            })
            .collect();

        let message = email::match_alert(&unit, greeting, &rows, self.directory.from_address(), to);
        let email_id = self.mailer.send(&message)?;

        info!(
            unit = %unit.label(),
            to,
            contacts = rows.len(),
            email = %email_id.0,
            "manual unit alert delivered"
        );

        Ok(ManualAlertReceipt {
            success: true,
            message: format!("alert for {} sent to {}", unit.label(), to),
            email_id: email_id.0,
            agent_email: to.to_string(),
            contact_count: rows.len(),
        })
    }
}

fn alert_row(matched: &MatchedEntry) -> AlertRow {
    AlertRow {
        name: matched.entry.name.clone(),
        email: matched.entry.email.clone(),
        phone: matched.entry.phone.clone(),
        entry_type: matched.entry.entry_type,
        budget: matched.entry.max_budget,
        move_in: matched.entry.move_in_date,
        note: matched.outcome.note().map(str::to_string),
    }
}

/// Fatal sweep failures: a collaborator is unreachable outright. Everything
/// softer is reported per group inside the [`SweepReport`].
#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error("availability feed unreachable: {0}")]
    Feed(#[from] FeedError),
    #[error("entry store unreachable: {0}")]
    Store(#[from] StoreError),
    #[error("notification ledger unreachable: {0}")]
    Ledger(#[from] LedgerError),
}

/// Structured result of one sweep, returned to the triggering caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub success: bool,
    pub checked: DateTime<Utc>,
    pub units_checked: usize,
    pub entries_checked: usize,
    pub notifications_sent: usize,
    pub notifications: Vec<NotificationOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationOutcome {
    pub agent: String,
    pub unit: String,
    pub contacts: usize,
    pub success: bool,
}

/// Body of the manual single-unit alert endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ManualAlertRequest {
    pub unit: ManualUnit,
    #[serde(default)]
    pub agent: Option<String>,
    pub contacts: Vec<ManualContact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManualUnit {
    pub property: String,
    pub unit_number: String,
    pub unit_type: String,
    pub rent_price: u32,
    #[serde(default)]
    pub available_date: Option<String>,
}

impl ManualUnit {
    fn into_record(self) -> Result<UnitRecord, ManualAlertError> {
        let property = self.property.trim().to_string();
        let unit_number = self.unit_number.trim().to_string();
        let unit_type = self.unit_type.trim().to_string();

        if property.is_empty() || unit_number.is_empty() || unit_type.is_empty() {
            return Err(ManualAlertError::InvalidRequest(
                "unit property, number, and type are all required".to_string(),
            ));
        }

        let unique_id = derive_unit_id(&property, &unit_number);
        Ok(UnitRecord {
            property,
            unit_number,
            unit_type,
            rent_price: self.rent_price,
            available_date: self.available_date,
            unique_id,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManualContact {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub entry_type: EntryType,
    #[serde(default)]
    pub budget: u32,
    pub move_in_date: NaiveDate,
}

/// Receipt returned by the manual alert endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualAlertReceipt {
    pub success: bool,
    pub message: String,
    pub email_id: String,
    pub agent_email: String,
    pub contact_count: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ManualAlertError {
    #[error("invalid alert request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Mail(#[from] MailError),
}
