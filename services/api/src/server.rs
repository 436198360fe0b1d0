use crate::cli::ServeArgs;
use crate::demo::{demo_entries, demo_units};
use crate::infra::{
    agent_directory, AppState, InMemoryEntryStore, InMemoryNotificationLedger, RecordingMailer,
    StaticUnitFeed,
};
use crate::routes::with_waitlist_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Local;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

use leasewatch::config::AppConfig;
use leasewatch::error::AppError;
use leasewatch::telemetry;
use leasewatch::workflows::waitlist::{AvailabilityImporter, WaitlistAlertService};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let feed = StaticUnitFeed::default();
    let store = InMemoryEntryStore::default();
    let mut directory = agent_directory(&config.alerts);

    let mut feed_loaded = false;
    if let Some(path) = args.feed_csv.take() {
        feed.replace(AvailabilityImporter::from_path(path)?);
        feed_loaded = true;
    }

    if args.demo {
        let today = Local::now().date_naive();
        if !feed_loaded {
            feed.replace(demo_units(today));
        }
        store.seed(demo_entries(today));
        directory = directory
            .with_agent("Alice Johnson", "alice@leasewatch.example")
            .with_agent("Bob Ortiz", "bob@leasewatch.example");
        info!("seeded demo waitlist entries, units, and agents");
    }

    let service = Arc::new(WaitlistAlertService::new(
        Arc::new(feed),
        Arc::new(store),
        Arc::new(InMemoryNotificationLedger::default()),
        Arc::new(RecordingMailer::default()),
        directory,
    ));

    let app = with_waitlist_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "waitlist coordinator ready");

    axum::serve(listener, app).await?;
    Ok(())
}
