//! End-to-end specifications for the waitlist match and alert pipeline.
//!
//! Scenarios drive the public service facade and HTTP router with in-memory
//! collaborators so ranking, dedup, delivery, and outcome stamping can be
//! asserted without reaching into private modules.

mod common {
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};

    use chrono::{DateTime, NaiveDate, TimeZone, Utc};

    use leasewatch::workflows::waitlist::{
        AgentDirectory, EmailId, EmailMessage, EntryId, EntryStatus, EntryStore, EntryType,
        FeedError, LedgerError, LedgerInsert, MailError, Mailer, NotificationLedger, NotifiedMatch,
        StoreError, UnitFeed, UnitRecord, WaitlistAlertService, WaitlistEntry,
    };

    pub(super) type TestService =
        WaitlistAlertService<StaticFeed, MemoryEntryStore, MemoryLedger, MemoryMailer>;

    #[derive(Default, Clone)]
    pub(super) struct MemoryEntryStore {
        entries: Arc<Mutex<HashMap<EntryId, WaitlistEntry>>>,
    }

    impl MemoryEntryStore {
        pub(super) fn seed(&self, entries: impl IntoIterator<Item = WaitlistEntry>) {
            let mut guard = self.entries.lock().expect("entry mutex poisoned");
            for entry in entries {
                guard.insert(entry.id.clone(), entry);
            }
        }

        pub(super) fn get(&self, id: &EntryId) -> Option<WaitlistEntry> {
            self.entries
                .lock()
                .expect("entry mutex poisoned")
                .get(id)
                .cloned()
        }
    }

    impl EntryStore for MemoryEntryStore {
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
    pub(super) struct MemoryLedger {
        rows: Arc<Mutex<HashMap<String, NotifiedMatch>>>,
    }

    impl MemoryLedger {
        pub(super) fn rows(&self) -> Vec<NotifiedMatch> {
            self.rows
                .lock()
                .expect("ledger mutex poisoned")
                .values()
                .cloned()
                .collect()
        }
    }

    impl NotificationLedger for MemoryLedger {
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

    #[derive(Default)]
    pub(super) struct MemoryMailer {
        outbox: Arc<Mutex<Vec<EmailMessage>>>,
        failing_addresses: Arc<Mutex<HashSet<String>>>,
        sequence: AtomicU64,
    }

    impl MemoryMailer {
        pub(super) fn sent(&self) -> Vec<EmailMessage> {
            self.outbox.lock().expect("outbox mutex poisoned").clone()
        }

        pub(super) fn fail_sends_to(&self, address: &str) {
            self.failing_addresses
                .lock()
                .expect("failure mutex poisoned")
                .insert(address.to_string());
        }

        pub(super) fn restore(&self, address: &str) {
            self.failing_addresses
                .lock()
                .expect("failure mutex poisoned")
                .remove(address);
        }
    }

    impl Mailer for MemoryMailer {
        fn send(&self, message: &EmailMessage) -> Result<EmailId, MailError> {
            if self
                .failing_addresses
                .lock()
                .expect("failure mutex poisoned")
                .contains(&message.to)
            {
                return Err(MailError::Transport("simulated outage".to_string()));
            }

            self.outbox
                .lock()
                .expect("outbox mutex poisoned")
                .push(message.clone());
            let id = self.sequence.fetch_add(1, Ordering::Relaxed);
            Ok(EmailId(format!("msg-{id:04}")))
        }
    }

    #[derive(Default, Clone)]
    pub(super) struct StaticFeed {
        units: Arc<Mutex<Vec<UnitRecord>>>,
    }

    impl StaticFeed {
        pub(super) fn set_units(&self, units: Vec<UnitRecord>) {
            *self.units.lock().expect("feed mutex poisoned") = units;
        }
    }

    impl UnitFeed for StaticFeed {
        fn units(&self) -> Result<Vec<UnitRecord>, FeedError> {
            Ok(self.units.lock().expect("feed mutex poisoned").clone())
        }
    }

    pub(super) fn directory() -> AgentDirectory {
        AgentDirectory::new("alerts@leasewatch.example", "leasing@leasewatch.example")
            .with_agent("Alice Johnson", "alice@leasewatch.example")
            .with_agent("Bob Ortiz", "bob@leasewatch.example")
    }

    pub(super) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    pub(super) fn sweep_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 10, 8, 30, 0).unwrap()
    }

    pub(super) fn prospect_a() -> WaitlistEntry {
        WaitlistEntry {
            id: EntryId("wl-a".to_string()),
            entry_type: EntryType::Prospect,
            status: EntryStatus::Active,
            name: "Dana Reyes".to_string(),
            email: "dana@example.com".to_string(),
            phone: Some("515-555-0134".to_string()),
            property: "Warren".to_string(),
            unit_type_pref: "1BR".to_string(),
            preferred_units: Vec::new(),
            max_budget: 1800,
            move_in_date: date(2025, 3, 1),
            move_in_date_end: None,
            assigned_agent: Some("Alice Johnson".to_string()),
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap(),
            matched_at: None,
        }
    }

    pub(super) fn transfer_b() -> WaitlistEntry {
        WaitlistEntry {
            id: EntryId("wl-b".to_string()),
            entry_type: EntryType::InternalTransfer,
            status: EntryStatus::Active,
            name: "Miguel Santos".to_string(),
            email: "miguel@example.com".to_string(),
            phone: None,
            property: "Warren".to_string(),
            unit_type_pref: "1BR".to_string(),
            preferred_units: Vec::new(),
            max_budget: 0,
            move_in_date: date(2025, 3, 15),
            move_in_date_end: None,
            assigned_agent: Some("Alice Johnson".to_string()),
            created_at: Utc.with_ymd_and_hms(2025, 1, 10, 9, 0, 0).unwrap(),
            matched_at: None,
        }
    }

    pub(super) fn unit_u() -> UnitRecord {
        UnitRecord {
            property: "Warren".to_string(),
            unit_number: "12B".to_string(),
            unit_type: "1BR".to_string(),
            rent_price: 1750,
            available_date: Some("2025-03-05".to_string()),
            unique_id: "warren-12b".to_string(),
        }
    }

    pub(super) fn build_service() -> (
        std::sync::Arc<TestService>,
        StaticFeed,
        MemoryEntryStore,
        MemoryLedger,
        std::sync::Arc<MemoryMailer>,
    ) {
        let feed = StaticFeed::default();
        let store = MemoryEntryStore::default();
        let ledger = MemoryLedger::default();
        let mailer = Arc::new(MemoryMailer::default());

        let service = Arc::new(WaitlistAlertService::new(
            Arc::new(feed.clone()),
            Arc::new(store.clone()),
            Arc::new(ledger.clone()),
            mailer.clone(),
            directory(),
        ));

        (service, feed, store, ledger, mailer)
    }
}

mod ranking {
    use super::common::*;

    #[test]
    fn transfer_precedes_earlier_prospect_in_the_alert() {
        let (service, feed, store, _ledger, mailer) = build_service();
        feed.set_units(vec![unit_u()]);
        store.seed([prospect_a(), transfer_b()]);

        let report = service.run_sweep(sweep_time()).expect("sweep runs");

        assert_eq!(report.notifications_sent, 1);
        assert_eq!(report.notifications[0].contacts, 2);

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        let html = &sent[0].html;
        let transfer_at = html.find("Miguel Santos").expect("transfer listed");
        let prospect_at = html.find("Dana Reyes").expect("prospect listed");
        assert!(
            transfer_at < prospect_at,
            "internal transfer must be listed before the prospect"
        );
    }

    #[test]
    fn both_window_misses_inside_grace_period_are_flagged_flexible() {
        let (service, feed, store, _ledger, mailer) = build_service();
        feed.set_units(vec![unit_u()]);
        store.seed([prospect_a(), transfer_b()]);

        service.run_sweep(sweep_time()).expect("sweep runs");

        let html = &mailer.sent()[0].html;
        assert!(html.contains("4 day(s) after the requested move-in window"));
        assert!(html.contains("10 day(s) before the requested move-in window"));
    }

    #[test]
    fn groups_are_split_per_agent() {
        let (service, feed, store, ledger, mailer) = build_service();
        feed.set_units(vec![unit_u()]);

        let mut for_bob = prospect_a();
        for_bob.id = leasewatch::workflows::waitlist::EntryId("wl-c".to_string());
        for_bob.name = "Priya Shah".to_string();
        for_bob.assigned_agent = Some("Bob Ortiz".to_string());

        store.seed([prospect_a(), transfer_b(), for_bob]);

        let report = service.run_sweep(sweep_time()).expect("sweep runs");

        assert_eq!(report.notifications_sent, 2);
        assert_eq!(mailer.sent().len(), 2);
        assert_eq!(ledger.rows().len(), 2);

        let mut recipients: Vec<String> =
            mailer.sent().iter().map(|m| m.to.clone()).collect();
        recipients.sort();
        assert_eq!(
            recipients,
            vec![
                "alice@leasewatch.example".to_string(),
                "bob@leasewatch.example".to_string()
            ]
        );
    }
}

mod dedup {
    use super::common::*;
    use leasewatch::workflows::waitlist::{LedgerInsert, NotificationLedger, NotifiedMatch};

    #[test]
    fn second_sweep_sends_nothing_new() {
        let (service, feed, store, ledger, mailer) = build_service();
        feed.set_units(vec![unit_u()]);
        store.seed([prospect_a(), transfer_b()]);

        let first = service.run_sweep(sweep_time()).expect("first sweep");
        assert_eq!(first.notifications_sent, 1);

        let second = service.run_sweep(sweep_time()).expect("second sweep");
        assert_eq!(second.notifications_sent, 0);
        assert!(second.notifications.is_empty());

        assert_eq!(mailer.sent().len(), 1);
        assert_eq!(ledger.rows().len(), 1);

        let row = &ledger.rows()[0];
        assert_eq!(row.match_key, "warren-12b:Alice Johnson");
        assert_eq!(row.entry_ids.len(), 2);
    }

    #[test]
    fn failed_delivery_stays_eligible_for_the_next_sweep() {
        let (service, feed, store, ledger, mailer) = build_service();
        feed.set_units(vec![unit_u()]);
        store.seed([prospect_a(), transfer_b()]);
        mailer.fail_sends_to("alice@leasewatch.example");

        let first = service.run_sweep(sweep_time()).expect("first sweep");
        assert_eq!(first.notifications_sent, 0);
        assert_eq!(first.notifications.len(), 1);
        assert!(!first.notifications[0].success);
        assert!(ledger.rows().is_empty());

        mailer.restore("alice@leasewatch.example");

        let second = service.run_sweep(sweep_time()).expect("second sweep");
        assert_eq!(second.notifications_sent, 1);
        assert_eq!(ledger.rows().len(), 1);
    }

    #[test]
    fn one_failing_group_does_not_block_the_others() {
        let (service, feed, store, ledger, mailer) = build_service();
        feed.set_units(vec![unit_u()]);

        let mut for_bob = prospect_a();
        for_bob.id = leasewatch::workflows::waitlist::EntryId("wl-c".to_string());
        for_bob.assigned_agent = Some("Bob Ortiz".to_string());

        store.seed([prospect_a(), for_bob]);
        mailer.fail_sends_to("alice@leasewatch.example");

        let report = service.run_sweep(sweep_time()).expect("sweep runs");

        assert_eq!(report.notifications.len(), 2);
        assert_eq!(report.notifications_sent, 1);
        let by_agent: Vec<(&str, bool)> = report
            .notifications
            .iter()
            .map(|n| (n.agent.as_str(), n.success))
            .collect();
        assert!(by_agent.contains(&("Alice Johnson", false)));
        assert!(by_agent.contains(&("Bob Ortiz", true)));
        assert_eq!(ledger.rows().len(), 1);
    }

    #[test]
    fn ledger_insert_is_first_writer_wins() {
        let ledger = MemoryLedger::default();
        let row = NotifiedMatch {
            match_key: "warren-12b:Alice Johnson".to_string(),
            agent: "Alice Johnson".to_string(),
            unit_id: "warren-12b".to_string(),
            entry_ids: Vec::new(),
            notified_at: sweep_time(),
        };

        assert_eq!(
            ledger.record(row.clone()).expect("first insert"),
            LedgerInsert::Inserted
        );
        assert_eq!(
            ledger.record(row).expect("second insert"),
            LedgerInsert::Duplicate
        );
        assert_eq!(ledger.rows().len(), 1);
    }

    #[test]
    fn key_recorded_by_an_overlapping_sweep_is_skipped() {
        let (service, feed, store, ledger, mailer) = build_service();
        feed.set_units(vec![unit_u()]);
        store.seed([prospect_a()]);

        // Another invocation already delivered for this (unit, agent) pair.
        ledger
            .record(NotifiedMatch {
                match_key: "warren-12b:Alice Johnson".to_string(),
                agent: "Alice Johnson".to_string(),
                unit_id: "warren-12b".to_string(),
                entry_ids: Vec::new(),
                notified_at: sweep_time(),
            })
            .expect("pre-insert");

        let report = service.run_sweep(sweep_time()).expect("sweep runs");
        assert_eq!(report.notifications_sent, 0);
        assert!(mailer.sent().is_empty());
    }
}

mod outcomes {
    use super::common::*;
    use chrono::Duration;
    use leasewatch::workflows::waitlist::{EntryId, UnitRecord};

    #[test]
    fn matched_at_is_stamped_once_and_never_overwritten() {
        let (service, feed, store, _ledger, _mailer) = build_service();
        feed.set_units(vec![unit_u()]);
        store.seed([prospect_a()]);

        let first_time = sweep_time();
        service.run_sweep(first_time).expect("first sweep");

        let stamped = store
            .get(&EntryId("wl-a".to_string()))
            .expect("entry present");
        assert_eq!(stamped.matched_at, Some(first_time));

        // A second unit at the same property matches the same entry later;
        // the new alert goes out but the original stamp stands.
        feed.set_units(vec![
            unit_u(),
            UnitRecord {
                property: "Warren".to_string(),
                unit_number: "3A".to_string(),
                unit_type: "1BR".to_string(),
                rent_price: 1650,
                available_date: Some("2025-03-10".to_string()),
                unique_id: "warren-3a".to_string(),
            },
        ]);

        let later = first_time + Duration::days(1);
        let report = service.run_sweep(later).expect("second sweep");
        assert_eq!(report.notifications_sent, 1);

        let restamped = store
            .get(&EntryId("wl-a".to_string()))
            .expect("entry present");
        assert_eq!(restamped.matched_at, Some(first_time));
    }

    #[test]
    fn unassigned_matches_are_counted_but_never_alerted() {
        let (service, feed, store, ledger, mailer) = build_service();
        feed.set_units(vec![unit_u()]);

        let mut unassigned = prospect_a();
        unassigned.assigned_agent = Some("Unassigned".to_string());
        store.seed([unassigned]);

        let report = service.run_sweep(sweep_time()).expect("sweep runs");

        assert_eq!(report.entries_checked, 1);
        assert_eq!(report.units_checked, 1);
        assert_eq!(report.notifications_sent, 0);
        assert!(report.notifications.is_empty());
        assert!(mailer.sent().is_empty());
        assert!(ledger.rows().is_empty());

        let entry = store
            .get(&EntryId("wl-a".to_string()))
            .expect("entry present");
        assert_eq!(entry.matched_at, None);
    }

    #[test]
    fn non_active_entries_are_invisible_to_the_sweep() {
        let (service, feed, store, _ledger, mailer) = build_service();
        feed.set_units(vec![unit_u()]);

        let mut leased = prospect_a();
        leased.status = leasewatch::workflows::waitlist::EntryStatus::Leased;
        store.seed([leased]);

        let report = service.run_sweep(sweep_time()).expect("sweep runs");
        assert_eq!(report.entries_checked, 0);
        assert!(mailer.sent().is_empty());
    }

    #[test]
    fn units_with_unreadable_dates_are_skipped_not_fatal() {
        let (service, feed, store, _ledger, mailer) = build_service();

        let mut broken = unit_u();
        broken.available_date = Some("sometime soon".to_string());
        broken.unique_id = "warren-broken".to_string();
        feed.set_units(vec![broken, unit_u()]);
        store.seed([prospect_a()]);

        let report = service.run_sweep(sweep_time()).expect("sweep runs");
        assert_eq!(report.units_checked, 2);
        assert_eq!(report.notifications_sent, 1);
        assert_eq!(mailer.sent().len(), 1);
    }
}

mod routing {
    use super::common::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use leasewatch::workflows::waitlist::waitlist_router;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    #[tokio::test]
    async fn sweep_endpoint_returns_the_structured_report() {
        let (service, feed, store, _ledger, _mailer) = build_service();
        feed.set_units(vec![unit_u()]);
        store.seed([prospect_a(), transfer_b()]);

        let router = waitlist_router(service);
        let response = router
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/api/v1/waitlist/matches/run?today=2025-02-10")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router dispatch");

        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body");
        let payload: Value = serde_json::from_slice(&body).expect("json");

        assert_eq!(payload.get("success"), Some(&json!(true)));
        assert_eq!(payload.get("unitsChecked"), Some(&json!(1)));
        assert_eq!(payload.get("entriesChecked"), Some(&json!(2)));
        assert_eq!(payload.get("notificationsSent"), Some(&json!(1)));

        let notifications = payload
            .get("notifications")
            .and_then(Value::as_array)
            .expect("notifications array");
        assert_eq!(notifications.len(), 1);
        assert_eq!(
            notifications[0].get("agent"),
            Some(&json!("Alice Johnson"))
        );
        assert_eq!(notifications[0].get("unit"), Some(&json!("Warren 12B")));
        assert_eq!(notifications[0].get("contacts"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn manual_notify_falls_back_to_the_leasing_inbox() {
        let (service, _feed, _store, _ledger, mailer) = build_service();

        let body = json!({
            "unit": {
                "property": "Warren",
                "unit_number": "7C",
                "unit_type": "2BR",
                "rent_price": 2100,
                "available_date": "2025-04-01"
            },
            "agent": "Carol Webb",
            "contacts": [{
                "name": "Jo Pratt",
                "email": "jo@example.com",
                "entry_type": "prospect",
                "budget": 2200,
                "move_in_date": "2025-04-05"
            }]
        });

        let router = waitlist_router(service);
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/waitlist/notify")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("request"),
            )
            .await
            .expect("router dispatch");

        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body");
        let payload: Value = serde_json::from_slice(&body).expect("json");

        assert_eq!(payload.get("success"), Some(&json!(true)));
        assert_eq!(
            payload.get("agentEmail"),
            Some(&json!("leasing@leasewatch.example"))
        );
        assert_eq!(payload.get("contactCount"), Some(&json!(1)));
        assert!(payload.get("emailId").and_then(Value::as_str).is_some());

        assert_eq!(mailer.sent().len(), 1);
        assert_eq!(mailer.sent()[0].to, "leasing@leasewatch.example");
    }

    #[tokio::test]
    async fn manual_notify_rejects_an_empty_contact_list() {
        let (service, _feed, _store, _ledger, mailer) = build_service();

        let body = json!({
            "unit": {
                "property": "Warren",
                "unit_number": "7C",
                "unit_type": "2BR",
                "rent_price": 2100
            },
            "agent": "Alice Johnson",
            "contacts": []
        });

        let router = waitlist_router(service);
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/waitlist/notify")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("request"),
            )
            .await
            .expect("router dispatch");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn sweep_endpoint_reports_infrastructure_failure_as_500() {
        use leasewatch::workflows::waitlist::{
            FeedError, UnitFeed, UnitRecord, WaitlistAlertService,
        };
        use std::sync::Arc;

        struct DownFeed;
        impl UnitFeed for DownFeed {
            fn units(&self) -> Result<Vec<UnitRecord>, FeedError> {
                Err(FeedError::Unavailable("connection refused".to_string()))
            }
        }

        let (_, _, store, ledger, mailer) = build_service();
        let service = Arc::new(WaitlistAlertService::new(
            Arc::new(DownFeed),
            Arc::new(store),
            Arc::new(ledger),
            mailer,
            directory(),
        ));

        let router = waitlist_router(service);
        let response = router
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/api/v1/waitlist/matches/run")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router dispatch");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body(), 1024).await.expect("body");
        let payload: Value = serde_json::from_slice(&body).expect("json");
        assert!(payload
            .get("details")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .contains("connection refused"));
    }
}
