use super::predicate::MatchedEntry;

/// Total order over the qualifying entries for one unit.
///
/// Internal transfers come before prospects unconditionally; within each
/// class the earliest registrant is served first. Entry id breaks exact
/// `created_at` ties so identical inputs always rank identically.
pub fn rank(mut matches: Vec<MatchedEntry>) -> Vec<MatchedEntry> {
    matches.sort_by(|a, b| {
        a.entry
            .entry_type
            .precedence()
            .cmp(&b.entry.entry_type.precedence())
            .then_with(|| a.entry.created_at.cmp(&b.entry.created_at))
            .then_with(|| a.entry.id.cmp(&b.entry.id))
    });
    matches
}
