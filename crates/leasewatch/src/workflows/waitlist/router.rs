use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;

use super::repository::{EntryStore, Mailer, NotificationLedger, UnitFeed};
use super::service::{ManualAlertError, ManualAlertRequest, WaitlistAlertService};

/// Router builder exposing the sweep trigger and the manual alert path.
pub fn waitlist_router<F, S, L, M>(service: Arc<WaitlistAlertService<F, S, L, M>>) -> Router
where
    F: UnitFeed + 'static,
    S: EntryStore + 'static,
    L: NotificationLedger + 'static,
    M: Mailer + 'static,
{
    Router::new()
        .route(
            "/api/v1/waitlist/matches/run",
            get(run_sweep_handler::<F, S, L, M>),
        )
        .route(
            "/api/v1/waitlist/notify",
            post(manual_notify_handler::<F, S, L, M>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SweepQuery {
    /// Optional evaluation date for deterministic reruns; defaults to the
    /// wall clock at invocation.
    #[serde(default)]
    today: Option<NaiveDate>,
}

pub(crate) async fn run_sweep_handler<F, S, L, M>(
    State(service): State<Arc<WaitlistAlertService<F, S, L, M>>>,
    Query(query): Query<SweepQuery>,
) -> Response
where
    F: UnitFeed + 'static,
    S: EntryStore + 'static,
    L: NotificationLedger + 'static,
    M: Mailer + 'static,
{
    let now: DateTime<Utc> = match query.today {
        Some(day) => day.and_time(chrono::NaiveTime::MIN).and_utc(),
        None => Utc::now(),
    };

    match service.run_sweep(now) {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(err) => {
            let payload = json!({
                "error": "match sweep aborted",
                "details": err.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn manual_notify_handler<F, S, L, M>(
    State(service): State<Arc<WaitlistAlertService<F, S, L, M>>>,
    axum::Json(request): axum::Json<ManualAlertRequest>,
) -> Response
where
    F: UnitFeed + 'static,
    S: EntryStore + 'static,
    L: NotificationLedger + 'static,
    M: Mailer + 'static,
{
    match service.notify_unit(request, Utc::now()) {
        Ok(receipt) => (StatusCode::OK, axum::Json(receipt)).into_response(),
        Err(ManualAlertError::InvalidRequest(reason)) => {
            let payload = json!({
                "success": false,
                "error": reason,
            });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({
                "success": false,
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
