use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Duration, Local, NaiveDate, NaiveTime};
use clap::Args;

use crate::infra::{
    parse_date, InMemoryEntryStore, InMemoryNotificationLedger, RecordingMailer, StaticUnitFeed,
};
use leasewatch::error::AppError;
use leasewatch::workflows::waitlist::{
    AgentDirectory, AvailabilityImporter, EntryId, EntryStatus, EntryType, SweepReport,
    UnitRecord, WaitlistAlertService, WaitlistEntry,
};

#[derive(Args, Debug, Default)]
pub(crate) struct SweepArgs {
    /// Availability export CSV to sweep (defaults to the seeded demo units)
    #[arg(long)]
    pub(crate) feed_csv: Option<PathBuf>,
    /// Evaluation date (YYYY-MM-DD, defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Evaluation date (YYYY-MM-DD, defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

pub(crate) fn demo_directory() -> AgentDirectory {
    AgentDirectory::new("alerts@leasewatch.example", "leasing@leasewatch.example")
        .with_agent("Alice Johnson", "alice@leasewatch.example")
        .with_agent("Bob Ortiz", "bob@leasewatch.example")
}

pub(crate) fn demo_units(today: NaiveDate) -> Vec<UnitRecord> {
    let soon = (today + Duration::days(10)).format("%Y-%m-%d").to_string();
    let far = (today + Duration::days(120)).format("%Y-%m-%d").to_string();

    vec![
        UnitRecord {
            property: "Warren".to_string(),
            unit_number: "12B".to_string(),
            unit_type: "1BR".to_string(),
            rent_price: 1750,
            available_date: Some(soon),
            unique_id: "warren-12b".to_string(),
        },
        UnitRecord {
            property: "Maple".to_string(),
            unit_number: "3A".to_string(),
            unit_type: "Studio".to_string(),
            rent_price: 995,
            available_date: Some("now".to_string()),
            unique_id: "maple-3a".to_string(),
        },
        UnitRecord {
            property: "Warren".to_string(),
            unit_number: "7C".to_string(),
            unit_type: "2BR".to_string(),
            rent_price: 2400,
            available_date: Some(far),
            unique_id: "warren-7c".to_string(),
        },
    ]
}

pub(crate) fn demo_entries(today: NaiveDate) -> Vec<WaitlistEntry> {
    let registered = |days_ago: i64| {
        (today - Duration::days(days_ago))
            .and_time(NaiveTime::MIN)
            .and_utc()
    };

    vec![
        WaitlistEntry {
            id: EntryId("wl-0001".to_string()),
            entry_type: EntryType::InternalTransfer,
            status: EntryStatus::Active,
            name: "Miguel Santos".to_string(),
            email: "miguel@example.com".to_string(),
            phone: Some("515-555-0112".to_string()),
            property: "Warren".to_string(),
            unit_type_pref: "1BR".to_string(),
            preferred_units: Vec::new(),
            max_budget: 0,
            move_in_date: today + Duration::days(14),
            move_in_date_end: None,
            assigned_agent: Some("Alice Johnson".to_string()),
            created_at: registered(20),
            matched_at: None,
        },
        WaitlistEntry {
            id: EntryId("wl-0002".to_string()),
            entry_type: EntryType::Prospect,
            status: EntryStatus::Active,
            name: "Dana Reyes".to_string(),
            email: "dana@example.com".to_string(),
            phone: Some("515-555-0134".to_string()),
            property: "Warren".to_string(),
            unit_type_pref: "1BR, 2BR".to_string(),
            preferred_units: Vec::new(),
            max_budget: 1800,
            move_in_date: today + Duration::days(7),
            move_in_date_end: Some(today + Duration::days(21)),
            assigned_agent: Some("Alice Johnson".to_string()),
            created_at: registered(45),
            matched_at: None,
        },
        WaitlistEntry {
            id: EntryId("wl-0003".to_string()),
            entry_type: EntryType::Prospect,
            status: EntryStatus::Active,
            name: "Priya Shah".to_string(),
            email: "priya@example.com".to_string(),
            phone: None,
            property: "Maple".to_string(),
            unit_type_pref: "Studio".to_string(),
            preferred_units: Vec::new(),
            max_budget: 1100,
            move_in_date: today,
            move_in_date_end: None,
            assigned_agent: Some("Bob Ortiz".to_string()),
            created_at: registered(10),
            matched_at: None,
        },
        WaitlistEntry {
            id: EntryId("wl-0004".to_string()),
            entry_type: EntryType::Prospect,
            status: EntryStatus::Active,
            name: "Jo Pratt".to_string(),
            email: "jo@example.com".to_string(),
            phone: None,
            property: "Warren".to_string(),
            unit_type_pref: "1BR".to_string(),
            preferred_units: Vec::new(),
            max_budget: 1700,
            move_in_date: today + Duration::days(10),
            move_in_date_end: None,
            assigned_agent: Some("Unassigned".to_string()),
            created_at: registered(5),
            matched_at: None,
        },
        WaitlistEntry {
            id: EntryId("wl-0005".to_string()),
            entry_type: EntryType::Prospect,
            status: EntryStatus::Active,
            name: "Sam Becker".to_string(),
            email: "sam@example.com".to_string(),
            phone: None,
            property: "Warren".to_string(),
            unit_type_pref: "1BR".to_string(),
            preferred_units: Vec::new(),
            max_budget: 900,
            move_in_date: today + Duration::days(14),
            move_in_date_end: None,
            assigned_agent: Some("Alice Johnson".to_string()),
            created_at: registered(3),
            matched_at: None,
        },
    ]
}

pub(crate) fn run_sweep_command(args: SweepArgs) -> Result<(), AppError> {
    let SweepArgs { feed_csv, today } = args;
    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let now = today.and_time(NaiveTime::MIN).and_utc();

    let feed = StaticUnitFeed::default();
    let (units, imported) = match feed_csv {
        Some(path) => (AvailabilityImporter::from_path(path)?, true),
        None => (demo_units(today), false),
    };
    feed.replace(units);

    let store = InMemoryEntryStore::default();
    store.seed(demo_entries(today));

    let mailer = Arc::new(RecordingMailer::default());
    let service = WaitlistAlertService::new(
        Arc::new(feed),
        Arc::new(store),
        Arc::new(InMemoryNotificationLedger::default()),
        mailer.clone(),
        demo_directory(),
    );

    let report = service.run_sweep(now)?;

    println!("Waitlist match sweep (evaluated {today})");
    if imported {
        println!("Unit feed: availability CSV import");
    } else {
        println!("Unit feed: seeded demo units");
    }
    render_sweep_report(&report);
    render_outbox(&mailer);

    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { today } = args;
    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let now = today.and_time(NaiveTime::MIN).and_utc();

    let feed = StaticUnitFeed::default();
    feed.replace(demo_units(today));

    let store = InMemoryEntryStore::default();
    store.seed(demo_entries(today));

    let ledger = InMemoryNotificationLedger::default();
    let mailer = Arc::new(RecordingMailer::default());
    let service = WaitlistAlertService::new(
        Arc::new(feed),
        Arc::new(store),
        Arc::new(ledger.clone()),
        mailer.clone(),
        demo_directory(),
    );

    println!("Waitlist coordinator demo (evaluated {today})");

    println!("\nFirst sweep");
    let first = service.run_sweep(now)?;
    render_sweep_report(&first);

    println!("\nSecond sweep, one hour later");
    let second = service.run_sweep(now + Duration::hours(1))?;
    render_sweep_report(&second);
    if second.notifications_sent == 0 {
        println!("No repeat alerts: the notification ledger held all recorded matches.");
    }

    println!("\nLedger rows: {}", ledger.rows().len());
    render_outbox(&mailer);

    Ok(())
}

fn render_sweep_report(report: &SweepReport) {
    println!(
        "Units checked: {} | Active entries: {} | Alerts sent: {}",
        report.units_checked, report.entries_checked, report.notifications_sent
    );

    if report.notifications.is_empty() {
        println!("Notifications: none");
        return;
    }

    println!("Notifications");
    for outcome in &report.notifications {
        let status = if outcome.success { "sent" } else { "failed" };
        println!(
            "- {} | {} | {} contact(s) | {}",
            outcome.agent, outcome.unit, outcome.contacts, status
        );
    }
}

fn render_outbox(mailer: &RecordingMailer) {
    let sent = mailer.sent();
    if sent.is_empty() {
        println!("\nOutbox: empty");
        return;
    }

    println!("\nOutbox");
    for message in sent {
        println!("- {} -> {}", message.subject, message.to);
    }
}
