use crate::infra::{deserialize_optional_date, AppState};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::io::Cursor;
use std::sync::Arc;
use tenant_maintenance::config::MaintenanceConfig;
use tenant_maintenance::error::AppError;
use tenant_maintenance::workflows::maintenance::{
    determine_required_specialization, load_roster, maintenance_router,
    EventPublisher, MaintenanceService, SelectionCriteria, TenantRequestRepository,
    WorkerAvailabilitySummary, WorkerRepository, WorkerSelection, WorkerSpecialization,
};

/// Ranks an uploaded roster without touching the live worker store.
#[derive(Debug, Deserialize)]
pub(crate) struct RosterRankRequest {
    pub(crate) roster_csv: String,
    #[serde(default)]
    pub(crate) specialization: Option<WorkerSpecialization>,
    #[serde(default)]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub(crate) target_date: Option<NaiveDate>,
    #[serde(default)]
    pub(crate) emergency: bool,
    #[serde(default)]
    pub(crate) max_workers: Option<usize>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RosterRankResponse {
    pub(crate) required_specialization: WorkerSpecialization,
    pub(crate) target_date: NaiveDate,
    pub(crate) roster_size: usize,
    pub(crate) candidates: Vec<WorkerAvailabilitySummary>,
}

pub(crate) fn with_maintenance_routes<Q, W, P>(
    service: Arc<MaintenanceService<Q, W, P>>,
) -> axum::Router
where
    Q: TenantRequestRepository + 'static,
    W: WorkerRepository + 'static,
    P: EventPublisher + 'static,
{
    maintenance_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/roster/rank",
            axum::routing::post(roster_rank_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn roster_rank_endpoint(
    Json(payload): Json<RosterRankRequest>,
) -> Result<Json<RosterRankResponse>, AppError> {
    let RosterRankRequest {
        roster_csv,
        specialization,
        title,
        description,
        target_date,
        emergency,
        max_workers,
    } = payload;

    let defaults = MaintenanceConfig::default();
    let workers = load_roster(Cursor::new(roster_csv.into_bytes()))?;
    let required_specialization = specialization.unwrap_or_else(|| {
        determine_required_specialization(
            title.as_deref().unwrap_or_default(),
            description.as_deref().unwrap_or_default(),
        )
    });
    let target_date = target_date.unwrap_or_else(|| Utc::now().date_naive());

    let criteria = SelectionCriteria {
        required_specialization,
        target_date,
        look_ahead_days: defaults.look_ahead_days,
        is_emergency: emergency,
        max_workers: max_workers.unwrap_or(defaults.max_candidates),
    };
    let candidates = WorkerSelection::default().find_available_workers(&criteria, &workers);

    Ok(Json(RosterRankResponse {
        required_specialization,
        target_date,
        roster_size: workers.len(),
        candidates,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{
        InMemoryEventPublisher, InMemoryTenantRequestRepository, InMemoryWorkerRepository,
    };
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::atomic::AtomicBool;
    use tenant_maintenance::workflows::maintenance::ServiceSettings;
    use tower::ServiceExt;

    const ROSTER: &str = "Email,First Name,Last Name,Phone,Specialization,Active,Work Order,Scheduled Date,Completed\n\
pat@riverside.example.com,Pat,Nguyen,,Plumbing,true,WO-1,2025-11-03,\n\
pat@riverside.example.com,Pat,Nguyen,,Plumbing,true,WO-2,2025-11-03,\n\
eli@riverside.example.com,Eli,Brooks,,Electrical,true,,,\n\
dev@riverside.example.com,Dev,Shah,,Plumbing,true,,,\n";

    fn rank_request(roster_csv: &str) -> RosterRankRequest {
        RosterRankRequest {
            roster_csv: roster_csv.to_string(),
            specialization: None,
            title: Some("Toilet keeps running".to_string()),
            description: None,
            target_date: NaiveDate::from_ymd_opt(2025, 11, 3),
            emergency: false,
            max_workers: None,
        }
    }

    #[tokio::test]
    async fn roster_rank_endpoint_classifies_and_ranks() {
        let Json(body) = roster_rank_endpoint(Json(rank_request(ROSTER)))
            .await
            .expect("ranking builds");

        assert_eq!(body.required_specialization, WorkerSpecialization::Plumbing);
        assert_eq!(body.roster_size, 3);
        let emails: Vec<&str> = body
            .candidates
            .iter()
            .map(|candidate| candidate.worker_email.as_str())
            .collect();
        assert_eq!(emails, vec!["dev@riverside.example.com", "pat@riverside.example.com"]);
    }

    #[tokio::test]
    async fn roster_rank_endpoint_rejects_bad_roster() {
        let roster = "Email,First Name,Last Name,Phone,Specialization,Active,Work Order,Scheduled Date,Completed\n\
sky@example.com,Sky,Lee,,Roofing,true,,,\n";

        let err = roster_rank_endpoint(Json(rank_request(roster)))
            .await
            .expect_err("unknown trade");

        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn readiness_reports_initializing_until_flagged() {
        let service = Arc::new(MaintenanceService::new(
            Arc::new(InMemoryTenantRequestRepository::default()),
            Arc::new(InMemoryWorkerRepository::default()),
            Arc::new(InMemoryEventPublisher::default()),
            ServiceSettings::default(),
        ));
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(false)),
            metrics: Arc::new(recorder.handle()),
        };
        let app = with_maintenance_routes(service).layer(Extension(state));

        let response = app
            .clone()
            .oneshot(Request::get("/ready").body(Body::empty()).expect("request"))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
    }
}
