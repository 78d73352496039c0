use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::error::MaintenanceError;
use super::repository::{EventPublisher, RepositoryError, TenantRequestRepository, WorkerRepository};
use super::requests::{
    NewTenantRequest, StatusChangeRecord, TenantRequest, TenantRequestId, TenantRequestStatus,
    UrgencyLevel,
};
use super::service::{MaintenanceService, MaintenanceServiceError};
use super::workers::{
    determine_required_specialization, Worker, WorkerContact, WorkerSpecialization,
};

type SharedService<Q, W, P> = Arc<MaintenanceService<Q, W, P>>;

/// Router builder exposing the request lifecycle and worker endpoints.
pub fn maintenance_router<Q, W, P>(service: SharedService<Q, W, P>) -> Router
where
    Q: TenantRequestRepository + 'static,
    W: WorkerRepository + 'static,
    P: EventPublisher + 'static,
{
    Router::new()
        .route("/api/v1/requests", post(create_request_handler::<Q, W, P>))
        .route("/api/v1/requests/:request_id", get(request_handler::<Q, W, P>))
        .route(
            "/api/v1/requests/:request_id/submit",
            post(submit_handler::<Q, W, P>),
        )
        .route(
            "/api/v1/requests/:request_id/schedule",
            post(schedule_handler::<Q, W, P>),
        )
        .route(
            "/api/v1/requests/:request_id/decline",
            post(decline_handler::<Q, W, P>),
        )
        .route(
            "/api/v1/requests/:request_id/complete",
            post(complete_handler::<Q, W, P>),
        )
        .route(
            "/api/v1/requests/:request_id/close",
            post(close_handler::<Q, W, P>),
        )
        .route(
            "/api/v1/requests/:request_id/candidates",
            post(candidates_handler::<Q, W, P>),
        )
        .route("/api/v1/workers", post(register_worker_handler::<Q, W, P>))
        .route("/api/v1/workers/:email", get(worker_handler::<Q, W, P>))
        .route(
            "/api/v1/workers/:email/specialization",
            post(specialization_handler::<Q, W, P>),
        )
        .route(
            "/api/v1/workers/:email/activate",
            post(activate_handler::<Q, W, P>),
        )
        .route(
            "/api/v1/workers/:email/deactivate",
            post(deactivate_handler::<Q, W, P>),
        )
        .route("/api/v1/classify", post(classify_handler))
        .with_state(service)
}

/// Public projection of a tenant request.
#[derive(Debug, Clone, Serialize)]
pub struct TenantRequestView {
    pub id: String,
    pub code: String,
    pub title: String,
    pub status: TenantRequestStatus,
    pub urgency: UrgencyLevel,
    pub required_specialization: WorkerSpecialization,
    pub tenant_name: String,
    pub unit_number: String,
    pub property_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_worker_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_order_number: Option<String>,
    pub history: Vec<StatusChangeRecord>,
}

impl From<&TenantRequest> for TenantRequestView {
    fn from(request: &TenantRequest) -> Self {
        Self {
            id: request.id().0.clone(),
            code: request.code().to_string(),
            title: request.title().to_string(),
            status: request.status(),
            urgency: request.urgency(),
            required_specialization: request.required_specialization(),
            tenant_name: request.tenant().name.clone(),
            unit_number: request.tenant().unit_number.clone(),
            property_name: request.property().name.clone(),
            scheduled_date: request.scheduled_date(),
            assigned_worker_email: request.assigned_worker_email().map(str::to_string),
            work_order_number: request.work_order_number().map(str::to_string),
            history: request.history().to_vec(),
        }
    }
}

/// Public projection of a worker.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerView {
    pub id: String,
    pub name: String,
    pub email: String,
    pub specialization: WorkerSpecialization,
    pub is_active: bool,
    pub current_workload: usize,
}

impl From<&Worker> for WorkerView {
    fn from(worker: &Worker) -> Self {
        Self {
            id: worker.id().0.clone(),
            name: worker.display_name(),
            email: worker.email().to_string(),
            specialization: worker.specialization(),
            is_active: worker.is_active(),
            current_workload: worker.current_workload(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SchedulePayload {
    pub(crate) scheduled_date: DateTime<Utc>,
    pub(crate) worker_email: String,
    #[serde(default)]
    pub(crate) work_order_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReasonPayload {
    pub(crate) reason: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompletionPayload {
    pub(crate) successful: bool,
    #[serde(default)]
    pub(crate) notes: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ClosePayload {
    #[serde(default)]
    pub(crate) closure_notes: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CandidatesPayload {
    #[serde(default)]
    pub(crate) target_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegisterWorkerPayload {
    #[serde(flatten)]
    pub(crate) contact: WorkerContact,
    #[serde(default)]
    pub(crate) specialization: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SpecializationPayload {
    pub(crate) specialization: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ClassifyPayload {
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: String,
}

pub(crate) async fn create_request_handler<Q, W, P>(
    State(service): State<SharedService<Q, W, P>>,
    Json(payload): Json<NewTenantRequest>,
) -> Response
where
    Q: TenantRequestRepository + 'static,
    W: WorkerRepository + 'static,
    P: EventPublisher + 'static,
{
    match service.create_request(payload) {
        Ok(request) => (StatusCode::CREATED, Json(TenantRequestView::from(&request))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn request_handler<Q, W, P>(
    State(service): State<SharedService<Q, W, P>>,
    Path(request_id): Path<String>,
) -> Response
where
    Q: TenantRequestRepository + 'static,
    W: WorkerRepository + 'static,
    P: EventPublisher + 'static,
{
    request_response(service.get_request(&TenantRequestId(request_id)))
}

pub(crate) async fn submit_handler<Q, W, P>(
    State(service): State<SharedService<Q, W, P>>,
    Path(request_id): Path<String>,
) -> Response
where
    Q: TenantRequestRepository + 'static,
    W: WorkerRepository + 'static,
    P: EventPublisher + 'static,
{
    request_response(service.submit_request(&TenantRequestId(request_id)))
}

pub(crate) async fn schedule_handler<Q, W, P>(
    State(service): State<SharedService<Q, W, P>>,
    Path(request_id): Path<String>,
    Json(payload): Json<SchedulePayload>,
) -> Response
where
    Q: TenantRequestRepository + 'static,
    W: WorkerRepository + 'static,
    P: EventPublisher + 'static,
{
    request_response(service.schedule_request(
        &TenantRequestId(request_id),
        payload.scheduled_date,
        &payload.worker_email,
        payload.work_order_number.as_deref(),
    ))
}

pub(crate) async fn decline_handler<Q, W, P>(
    State(service): State<SharedService<Q, W, P>>,
    Path(request_id): Path<String>,
    Json(payload): Json<ReasonPayload>,
) -> Response
where
    Q: TenantRequestRepository + 'static,
    W: WorkerRepository + 'static,
    P: EventPublisher + 'static,
{
    request_response(service.decline_request(&TenantRequestId(request_id), &payload.reason))
}

pub(crate) async fn complete_handler<Q, W, P>(
    State(service): State<SharedService<Q, W, P>>,
    Path(request_id): Path<String>,
    Json(payload): Json<CompletionPayload>,
) -> Response
where
    Q: TenantRequestRepository + 'static,
    W: WorkerRepository + 'static,
    P: EventPublisher + 'static,
{
    request_response(service.report_work_completed(
        &TenantRequestId(request_id),
        payload.successful,
        &payload.notes,
    ))
}

pub(crate) async fn close_handler<Q, W, P>(
    State(service): State<SharedService<Q, W, P>>,
    Path(request_id): Path<String>,
    Json(payload): Json<ClosePayload>,
) -> Response
where
    Q: TenantRequestRepository + 'static,
    W: WorkerRepository + 'static,
    P: EventPublisher + 'static,
{
    request_response(service.close_request(&TenantRequestId(request_id), &payload.closure_notes))
}

pub(crate) async fn candidates_handler<Q, W, P>(
    State(service): State<SharedService<Q, W, P>>,
    Path(request_id): Path<String>,
    Json(payload): Json<CandidatesPayload>,
) -> Response
where
    Q: TenantRequestRepository + 'static,
    W: WorkerRepository + 'static,
    P: EventPublisher + 'static,
{
    match service.find_workers_for_request(&TenantRequestId(request_id), payload.target_date) {
        Ok(candidates) => (StatusCode::OK, Json(json!({ "candidates": candidates }))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn register_worker_handler<Q, W, P>(
    State(service): State<SharedService<Q, W, P>>,
    Json(payload): Json<RegisterWorkerPayload>,
) -> Response
where
    Q: TenantRequestRepository + 'static,
    W: WorkerRepository + 'static,
    P: EventPublisher + 'static,
{
    let specialization = match payload
        .specialization
        .as_deref()
        .map(str::parse::<WorkerSpecialization>)
        .transpose()
    {
        Ok(specialization) => specialization,
        Err(err) => return error_response(MaintenanceServiceError::Domain(err)),
    };

    match service.register_worker(payload.contact, specialization) {
        Ok(worker) => (StatusCode::CREATED, Json(WorkerView::from(&worker))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn worker_handler<Q, W, P>(
    State(service): State<SharedService<Q, W, P>>,
    Path(email): Path<String>,
) -> Response
where
    Q: TenantRequestRepository + 'static,
    W: WorkerRepository + 'static,
    P: EventPublisher + 'static,
{
    worker_response(service.get_worker(&email))
}

pub(crate) async fn specialization_handler<Q, W, P>(
    State(service): State<SharedService<Q, W, P>>,
    Path(email): Path<String>,
    Json(payload): Json<SpecializationPayload>,
) -> Response
where
    Q: TenantRequestRepository + 'static,
    W: WorkerRepository + 'static,
    P: EventPublisher + 'static,
{
    match payload.specialization.parse::<WorkerSpecialization>() {
        Ok(specialization) => {
            worker_response(service.set_worker_specialization(&email, specialization))
        }
        Err(err) => error_response(MaintenanceServiceError::Domain(err)),
    }
}

pub(crate) async fn activate_handler<Q, W, P>(
    State(service): State<SharedService<Q, W, P>>,
    Path(email): Path<String>,
) -> Response
where
    Q: TenantRequestRepository + 'static,
    W: WorkerRepository + 'static,
    P: EventPublisher + 'static,
{
    worker_response(service.activate_worker(&email))
}

pub(crate) async fn deactivate_handler<Q, W, P>(
    State(service): State<SharedService<Q, W, P>>,
    Path(email): Path<String>,
    Json(payload): Json<ReasonPayload>,
) -> Response
where
    Q: TenantRequestRepository + 'static,
    W: WorkerRepository + 'static,
    P: EventPublisher + 'static,
{
    worker_response(service.deactivate_worker(&email, &payload.reason))
}

pub(crate) async fn classify_handler(Json(payload): Json<ClassifyPayload>) -> Response {
    let specialization = determine_required_specialization(&payload.title, &payload.description);
    let body = json!({
        "specialization": specialization,
        "label": specialization.label(),
    });
    (StatusCode::OK, Json(body)).into_response()
}

fn request_response(result: Result<TenantRequest, MaintenanceServiceError>) -> Response {
    match result {
        Ok(request) => (StatusCode::OK, Json(TenantRequestView::from(&request))).into_response(),
        Err(err) => error_response(err),
    }
}

fn worker_response(result: Result<Worker, MaintenanceServiceError>) -> Response {
    match result {
        Ok(worker) => (StatusCode::OK, Json(WorkerView::from(&worker))).into_response(),
        Err(err) => error_response(err),
    }
}

/// HTTP status for a service failure.
pub fn service_error_status(err: &MaintenanceServiceError) -> StatusCode {
    match err {
        MaintenanceServiceError::Domain(MaintenanceError::InvalidParameters(_)) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        MaintenanceServiceError::Domain(
            MaintenanceError::InvalidTransition { .. }
            | MaintenanceError::WorkerUnavailable { .. }
            | MaintenanceError::AlreadyAssigned { .. }
            | MaintenanceError::AssignmentAlreadyCompleted { .. }
            | MaintenanceError::AssignmentInUse { .. },
        ) => StatusCode::CONFLICT,
        MaintenanceServiceError::Domain(MaintenanceError::AssignmentNotFound { .. })
        | MaintenanceServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        MaintenanceServiceError::Repository(
            RepositoryError::Conflict | RepositoryError::Duplicate,
        ) => StatusCode::CONFLICT,
        MaintenanceServiceError::Repository(RepositoryError::Unavailable(_))
        | MaintenanceServiceError::Publish(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: MaintenanceServiceError) -> Response {
    let status = service_error_status(&err);
    let payload = json!({ "error": err.to_string() });
    (status, Json(payload)).into_response()
}
