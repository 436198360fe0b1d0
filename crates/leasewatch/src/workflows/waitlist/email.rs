use std::fmt::Write as _;

use chrono::NaiveDate;

use super::domain::{EntryType, UnitRecord};
use super::repository::EmailMessage;

/// One contact line in an alert, already ranked.
#[derive(Debug, Clone)]
pub(crate) struct AlertRow {
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) phone: Option<String>,
    pub(crate) entry_type: EntryType,
    pub(crate) budget: u32,
    pub(crate) move_in: NaiveDate,
    pub(crate) note: Option<String>,
}

pub(crate) fn match_alert(
    unit: &UnitRecord,
    agent: &str,
    rows: &[AlertRow],
    from: &str,
    to: &str,
) -> EmailMessage {
    let subject = format!(
        "Unit match: {} — {} waitlist contact{}",
        unit.label(),
        rows.len(),
        if rows.len() == 1 { "" } else { "s" }
    );

    EmailMessage {
        from: from.to_string(),
        to: to.to_string(),
        subject,
        html: render_alert_html(unit, agent, rows),
    }
}

fn render_alert_html(unit: &UnitRecord, agent: &str, rows: &[AlertRow]) -> String {
    let mut html = String::new();

    writeln!(html, "<h1>Unit match: {}</h1>", escape_html(&unit.label())).expect("write heading");
    writeln!(html, "<p>Hi {},</p>", escape_html(agent)).expect("write greeting");
    writeln!(
        html,
        "<p>{} ({}) at ${}/mo is {} and matches {} waitlist contact{}.</p>",
        escape_html(&unit.label()),
        escape_html(&unit.unit_type),
        unit.rent_price,
        availability_phrase(unit),
        rows.len(),
        if rows.len() == 1 { "" } else { "s" }
    )
    .expect("write summary");

    html.push_str(
        "<table border=\"1\" cellpadding=\"6\" cellspacing=\"0\">\
         <tr><th>#</th><th>Name</th><th>Email</th><th>Phone</th>\
         <th>Type</th><th>Budget</th><th>Move-in</th><th>Fit</th></tr>",
    );

    for (position, row) in rows.iter().enumerate() {
        let budget = if row.budget == 0 {
            "no ceiling".to_string()
        } else {
            format!("${}", row.budget)
        };
        let fit = row.note.as_deref().unwrap_or("within requested window");

        writeln!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
             <td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            position + 1,
            escape_html(&row.name),
            escape_html(&row.email),
            escape_html(row.phone.as_deref().unwrap_or("—")),
            type_phrase(row.entry_type),
            escape_html(&budget),
            row.move_in,
            escape_html(fit)
        )
        .expect("write contact row");
    }

    html.push_str("</table>");
    writeln!(
        html,
        "<p>Contacts are listed in outreach order: internal transfers first, then earliest registration.</p>"
    )
    .expect("write footer");

    html
}

fn availability_phrase(unit: &UnitRecord) -> String {
    match unit.available_date.as_deref().map(str::trim) {
        None | Some("") => "available now".to_string(),
        Some(raw)
            if raw.eq_ignore_ascii_case("now") || raw.eq_ignore_ascii_case("available") =>
        {
            "available now".to_string()
        }
        Some(raw) => format!("available {}", escape_html(raw)),
    }
}

fn type_phrase(entry_type: EntryType) -> &'static str {
    match entry_type {
        EntryType::InternalTransfer => "Internal transfer",
        EntryType::Prospect => "Prospect",
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
