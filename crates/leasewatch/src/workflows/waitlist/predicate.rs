use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::domain::{AvailabilityError, EntryStatus, UnitRecord, WaitlistEntry};

/// Grace period applied to both sides of an entry's requested window.
pub const FLEX_WINDOW_DAYS: i64 = 30;

/// Tagged verdict for one entry/unit pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    /// The unit frees up inside the requested window itself.
    Exact,
    /// The unit frees up outside the requested window but within the grace
    /// period; the note says on which side and by how far.
    Flexible { note: String },
    NoMatch,
}

impl MatchOutcome {
    pub fn is_match(&self) -> bool {
        !matches!(self, MatchOutcome::NoMatch)
    }

    pub fn note(&self) -> Option<&str> {
        match self {
            MatchOutcome::Flexible { note } => Some(note),
            _ => None,
        }
    }
}

/// Requested occupancy window widened by [`FLEX_WINDOW_DAYS`] on each side.
///
/// The boundary arithmetic lives here so it can be exercised without the
/// surrounding property/type/budget filters. `end` is used as given; a
/// reversed range narrows or empties the window rather than erroring,
/// since entry intake is validated outside the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlexWindow {
    start: NaiveDate,
    end: NaiveDate,
    earliest: NaiveDate,
    latest: NaiveDate,
}

impl FlexWindow {
    pub fn around(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end,
            earliest: start - Duration::days(FLEX_WINDOW_DAYS),
            latest: end + Duration::days(FLEX_WINDOW_DAYS),
        }
    }

    pub fn classify(&self, available: NaiveDate) -> MatchOutcome {
        if available < self.earliest || available > self.latest {
            return MatchOutcome::NoMatch;
        }

        if available >= self.start && available <= self.end {
            return MatchOutcome::Exact;
        }

        let note = if available < self.start {
            let days = (self.start - available).num_days();
            format!("available {days} day(s) before the requested move-in window")
        } else {
            let days = (available - self.end).num_days();
            format!("available {days} day(s) after the requested move-in window")
        };

        MatchOutcome::Flexible { note }
    }
}

/// Decide whether `entry` qualifies for `unit`, given the unit's resolved
/// availability date.
///
/// Mandatory conditions: active status, exact property equality, unit type
/// in the entry's preference set, availability inside the flex window.
/// Preferred unit numbers and budget only filter when the entry specifies
/// them; absence never excludes a unit.
pub fn evaluate(entry: &WaitlistEntry, unit: &UnitRecord, available_on: NaiveDate) -> MatchOutcome {
    if entry.status != EntryStatus::Active {
        return MatchOutcome::NoMatch;
    }
    if entry.property != unit.property {
        return MatchOutcome::NoMatch;
    }
    if !entry.accepts_unit_type(&unit.unit_type) {
        return MatchOutcome::NoMatch;
    }
    if !entry.accepts_unit_number(&unit.unit_number) {
        return MatchOutcome::NoMatch;
    }
    if !entry.within_budget(unit.rent_price) {
        return MatchOutcome::NoMatch;
    }

    FlexWindow::around(entry.move_in_date, entry.move_in_end()).classify(available_on)
}

/// Full predicate contract: resolve the unit's availability date, then apply
/// every filter. Callers sweeping many entries against one unit should
/// resolve availability once and use [`evaluate`] directly.
pub fn matches(
    entry: &WaitlistEntry,
    unit: &UnitRecord,
    today: NaiveDate,
) -> Result<MatchOutcome, AvailabilityError> {
    Ok(evaluate(entry, unit, unit.availability_on(today)?))
}

/// A qualifying entry paired with how it qualified.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedEntry {
    pub entry: WaitlistEntry,
    pub outcome: MatchOutcome,
}
