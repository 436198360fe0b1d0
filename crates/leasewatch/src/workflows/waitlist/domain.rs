use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for waitlist entries.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntryId(pub String);

/// Origin of a waitlist registration. Internal transfers outrank prospects
/// in every ranking, regardless of registration date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    InternalTransfer,
    Prospect,
}

impl EntryType {
    pub const fn label(self) -> &'static str {
        match self {
            EntryType::InternalTransfer => "internal_transfer",
            EntryType::Prospect => "prospect",
        }
    }

    pub(crate) const fn precedence(self) -> u8 {
        match self {
            EntryType::InternalTransfer => 0,
            EntryType::Prospect => 1,
        }
    }
}

/// Lifecycle status maintained by leasing staff. Only `Active` entries are
/// ever considered by the match engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Active,
    Contacted,
    Leased,
    Closed,
}

impl EntryStatus {
    pub const fn label(self) -> &'static str {
        match self {
            EntryStatus::Active => "active",
            EntryStatus::Contacted => "contacted",
            EntryStatus::Leased => "leased",
            EntryStatus::Closed => "closed",
        }
    }
}

/// A prospective tenant or internal transfer waiting for a unit.
///
/// Entries are created and maintained by external intake forms; the engine
/// reads them and stamps `matched_at` once, the first time the entry is
/// covered by a delivered alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitlistEntry {
    pub id: EntryId,
    pub entry_type: EntryType,
    pub status: EntryStatus,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub property: String,
    /// Comma-separated acceptable unit-type labels, stored as entered.
    pub unit_type_pref: String,
    /// When non-empty, restricts matches to exactly these unit numbers.
    #[serde(default)]
    pub preferred_units: Vec<String>,
    /// Monthly ceiling; `0` means no ceiling at all.
    pub max_budget: u32,
    pub move_in_date: NaiveDate,
    #[serde(default)]
    pub move_in_date_end: Option<NaiveDate>,
    #[serde(default)]
    pub assigned_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub matched_at: Option<DateTime<Utc>>,
}

impl WaitlistEntry {
    /// End of the requested occupancy window; a missing end collapses the
    /// window to the single move-in day.
    pub fn move_in_end(&self) -> NaiveDate {
        self.move_in_date_end.unwrap_or(self.move_in_date)
    }

    pub fn accepts_unit_type(&self, unit_type: &str) -> bool {
        self.unit_type_pref
            .split(',')
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .any(|label| label == unit_type.trim())
    }

    /// An empty preference list accepts every unit number.
    pub fn accepts_unit_number(&self, unit_number: &str) -> bool {
        if self.preferred_units.is_empty() {
            return true;
        }
        self.preferred_units
            .iter()
            .any(|preferred| preferred.trim().eq_ignore_ascii_case(unit_number.trim()))
    }

    pub fn within_budget(&self, rent_price: u32) -> bool {
        self.max_budget == 0 || rent_price <= self.max_budget
    }

    /// Agent responsible for this entry. Blank and "Unassigned" both mean
    /// nobody is, which excludes the entry from alert routing.
    pub fn agent(&self) -> Option<&str> {
        let agent = self.assigned_agent.as_deref()?.trim();
        if agent.is_empty() || agent.eq_ignore_ascii_case("unassigned") {
            None
        } else {
            Some(agent)
        }
    }
}

/// One leasable unit surfaced by the availability feed.
///
/// Records are recomputed from the feed on every sweep and never persisted
/// by the engine. `unique_id` must stay stable across sweeps for the same
/// physical listing row; the alert ledger is keyed on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRecord {
    pub property: String,
    pub unit_number: String,
    pub unit_type: String,
    pub rent_price: u32,
    /// Raw feed value; blank, "now", and "available" all mean immediately.
    #[serde(default)]
    pub available_date: Option<String>,
    pub unique_id: String,
}

impl UnitRecord {
    pub fn label(&self) -> String {
        format!("{} {}", self.property, self.unit_number)
    }

    /// Resolve the feed's availability text to a calendar date. A unit with
    /// no listed date is treated as available today.
    pub fn availability_on(&self, today: NaiveDate) -> Result<NaiveDate, AvailabilityError> {
        let raw = match self.available_date.as_deref() {
            None => return Ok(today),
            Some(raw) => raw.trim(),
        };

        if raw.is_empty()
            || raw.eq_ignore_ascii_case("now")
            || raw.eq_ignore_ascii_case("available")
        {
            return Ok(today);
        }

        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
            .map_err(|_| AvailabilityError {
                unit: self.label(),
                value: raw.to_string(),
            })
    }
}

/// Raised when a feed row carries an availability date nothing can parse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unreadable availability date '{value}' for unit {unit}")]
pub struct AvailabilityError {
    pub unit: String,
    pub value: String,
}

/// Permanent ledger row recording one delivered (unit, agent) alert.
///
/// `match_key` is unique; the store must refuse or ignore a second insert of
/// the same key. Rows are never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotifiedMatch {
    pub match_key: String,
    pub agent: String,
    pub unit_id: String,
    pub entry_ids: Vec<EntryId>,
    pub notified_at: DateTime<Utc>,
}

impl NotifiedMatch {
    pub fn key_for(unit_id: &str, agent: &str) -> String {
        format!("{unit_id}:{agent}")
    }
}
