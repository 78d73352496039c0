use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::maintenance::repository::{
    EventPublishError, EventPublisher, MaintenanceEvent, RepositoryError, TenantRequestRepository,
    Versioned, WorkerRepository,
};
use crate::workflows::maintenance::requests::{
    NewTenantRequest, PropertyContact, TenantContact, TenantRequest, TenantRequestId,
    TenantRequestStatus, UrgencyLevel,
};
use crate::workflows::maintenance::service::{MaintenanceService, ServiceSettings};
use crate::workflows::maintenance::workers::{Worker, WorkerContact, WorkerSpecialization};

pub(super) type TestService = MaintenanceService<MemoryRequests, MemoryWorkers, MemoryEvents>;

pub(super) fn tenant() -> TenantContact {
    TenantContact {
        tenant_id: "tenant-204".to_string(),
        name: "Dana Whitfield".to_string(),
        email: "dana.whitfield@example.com".to_string(),
        unit_number: "204".to_string(),
    }
}

pub(super) fn property() -> PropertyContact {
    PropertyContact {
        property_id: "prop-riverside".to_string(),
        name: "Riverside Commons".to_string(),
        phone: "515-555-0142".to_string(),
        superintendent_name: "Luis Ortega".to_string(),
        superintendent_email: "super@riverside.example.com".to_string(),
    }
}

pub(super) fn new_request(code: &str, title: &str, urgency: UrgencyLevel) -> NewTenantRequest {
    NewTenantRequest {
        code: code.to_string(),
        title: title.to_string(),
        description: String::new(),
        urgency,
        tenant: tenant(),
        property: property(),
    }
}

pub(super) fn leak_request() -> NewTenantRequest {
    NewTenantRequest {
        description: "Hi, there's a slow leak under the kitchen sink".to_string(),
        ..new_request("MR-100", "Kitchen sink", UrgencyLevel::Normal)
    }
}

pub(super) fn contact(first: &str, last: &str, email: &str) -> WorkerContact {
    WorkerContact {
        first_name: first.to_string(),
        last_name: last.to_string(),
        email: email.to_string(),
        phone: None,
    }
}

pub(super) fn worker(
    first: &str,
    email: &str,
    specialization: WorkerSpecialization,
) -> Worker {
    let mut worker = Worker::new(contact(first, "Tester", email)).expect("valid worker");
    worker.set_specialization(specialization);
    worker.take_events();
    worker
}

pub(super) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub(super) fn day(offset: i64) -> NaiveDate {
    today() + Duration::days(offset)
}

/// Noon UTC on the given day; offsets of one or more are always in the future.
pub(super) fn noon(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(12, 0, 0).expect("valid time"))
}

pub(super) fn tomorrow() -> DateTime<Utc> {
    noon(day(1))
}

/// Drive a fresh request to `status` through the public transitions.
pub(super) fn request_in(status: TenantRequestStatus) -> TenantRequest {
    let mut request = TenantRequest::create_new(leak_request()).expect("valid request");
    let schedule = |request: &mut TenantRequest| {
        request.submit().expect("submit");
        request
            .schedule(tomorrow(), "w@test.com", "WO-1")
            .expect("schedule");
    };

    match status {
        TenantRequestStatus::Draft => {}
        TenantRequestStatus::Submitted => request.submit().expect("submit"),
        TenantRequestStatus::Scheduled => schedule(&mut request),
        TenantRequestStatus::Done => {
            schedule(&mut request);
            request.report_work_completed(true, "done").expect("done");
        }
        TenantRequestStatus::Failed => {
            schedule(&mut request);
            request
                .report_work_completed(false, "part on backorder")
                .expect("failed");
        }
        TenantRequestStatus::Declined => {
            request.submit().expect("submit");
            request.decline("tenant responsibility").expect("decline");
        }
        TenantRequestStatus::Closed => {
            schedule(&mut request);
            request.report_work_completed(true, "done").expect("done");
            request.close("resolved").expect("close");
        }
    }
    assert_eq!(request.status(), status);
    request
}

pub(super) fn settings() -> ServiceSettings {
    ServiceSettings {
        max_candidates: 3,
        ..ServiceSettings::default()
    }
}

pub(super) fn build_service() -> (
    TestService,
    Arc<MemoryRequests>,
    Arc<MemoryWorkers>,
    Arc<MemoryEvents>,
) {
    let requests = Arc::new(MemoryRequests::default());
    let workers = Arc::new(MemoryWorkers::default());
    let events = Arc::new(MemoryEvents::default());
    let service = MaintenanceService::new(
        requests.clone(),
        workers.clone(),
        events.clone(),
        settings(),
    );
    (service, requests, workers, events)
}

#[derive(Default, Clone)]
pub(super) struct MemoryRequests {
    records: Arc<Mutex<HashMap<TenantRequestId, Versioned<TenantRequest>>>>,
}

impl MemoryRequests {
    pub(super) fn status_of(&self, id: &TenantRequestId) -> Option<TenantRequestStatus> {
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .get(id)
            .map(|stored| stored.aggregate.status())
    }
}

impl TenantRequestRepository for MemoryRequests {
    fn insert(&self, request: TenantRequest) -> Result<Versioned<TenantRequest>, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(request.id()) {
            return Err(RepositoryError::Duplicate);
        }
        let stored = Versioned::initial(request);
        guard.insert(stored.aggregate.id().clone(), stored.clone());
        Ok(stored)
    }

    fn fetch(
        &self,
        id: &TenantRequestId,
    ) -> Result<Option<Versioned<TenantRequest>>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update(
        &self,
        request: TenantRequest,
        expected_version: u64,
    ) -> Result<Versioned<TenantRequest>, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let current = guard.get(request.id()).ok_or(RepositoryError::NotFound)?;
        if current.version != expected_version {
            return Err(RepositoryError::Conflict);
        }
        let stored = current.next(request);
        guard.insert(stored.aggregate.id().clone(), stored.clone());
        Ok(stored)
    }

    fn find_by_work_order(
        &self,
        work_order: &str,
    ) -> Result<Option<Versioned<TenantRequest>>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|stored| stored.aggregate.work_order_number() == Some(work_order))
            .max_by_key(|stored| stored.updated_at)
            .cloned())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryWorkers {
    records: Arc<Mutex<HashMap<String, Versioned<Worker>>>>,
}

impl WorkerRepository for MemoryWorkers {
    fn insert(&self, worker: Worker) -> Result<Versioned<Worker>, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(worker.email()) {
            return Err(RepositoryError::Duplicate);
        }
        let stored = Versioned::initial(worker);
        guard.insert(stored.aggregate.email().to_string(), stored.clone());
        Ok(stored)
    }

    fn fetch(&self, email: &str) -> Result<Option<Versioned<Worker>>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(email).cloned())
    }

    fn update(
        &self,
        worker: Worker,
        expected_version: u64,
    ) -> Result<Versioned<Worker>, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let current = guard.get(worker.email()).ok_or(RepositoryError::NotFound)?;
        if current.version != expected_version {
            return Err(RepositoryError::Conflict);
        }
        let stored = current.next(worker);
        guard.insert(stored.aggregate.email().to_string(), stored.clone());
        Ok(stored)
    }

    fn active_workers(&self) -> Result<Vec<Worker>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut workers: Vec<Worker> = guard
            .values()
            .filter(|stored| stored.aggregate.is_active())
            .map(|stored| stored.aggregate.clone())
            .collect();
        workers.sort_by(|a, b| a.email().cmp(b.email()));
        Ok(workers)
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryEvents {
    events: Arc<Mutex<Vec<MaintenanceEvent>>>,
}

impl MemoryEvents {
    pub(super) fn events(&self) -> Vec<MaintenanceEvent> {
        self.events.lock().expect("event mutex poisoned").clone()
    }

    pub(super) fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(MaintenanceEvent::name).collect()
    }

    pub(super) fn request_event_names(&self) -> Vec<&'static str> {
        self.events()
            .iter()
            .filter(|event| matches!(event, MaintenanceEvent::Request(_)))
            .map(MaintenanceEvent::name)
            .collect()
    }
}

impl EventPublisher for MemoryEvents {
    fn publish(&self, event: MaintenanceEvent) -> Result<(), EventPublishError> {
        self.events
            .lock()
            .expect("event mutex poisoned")
            .push(event);
        Ok(())
    }
}

/// Request store that can simulate concurrent writers and rejected updates.
#[derive(Default)]
pub(super) struct ScriptedRequests {
    inner: MemoryRequests,
    conflicts: AtomicU32,
    reject_updates: AtomicBool,
    update_attempts: AtomicU32,
}

impl ScriptedRequests {
    pub(super) fn conflict_next(&self, times: u32) {
        self.conflicts.store(times, Ordering::SeqCst);
    }

    pub(super) fn reject_updates(&self) {
        self.reject_updates.store(true, Ordering::SeqCst);
    }

    pub(super) fn attempts(&self) -> u32 {
        self.update_attempts.load(Ordering::SeqCst)
    }
}

impl TenantRequestRepository for ScriptedRequests {
    fn insert(&self, request: TenantRequest) -> Result<Versioned<TenantRequest>, RepositoryError> {
        self.inner.insert(request)
    }

    fn fetch(
        &self,
        id: &TenantRequestId,
    ) -> Result<Option<Versioned<TenantRequest>>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn update(
        &self,
        request: TenantRequest,
        expected_version: u64,
    ) -> Result<Versioned<TenantRequest>, RepositoryError> {
        self.update_attempts.fetch_add(1, Ordering::SeqCst);
        if self.reject_updates.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("database offline".to_string()));
        }
        let pending = self.conflicts.load(Ordering::SeqCst);
        if pending > 0 {
            self.conflicts.store(pending - 1, Ordering::SeqCst);
            return Err(RepositoryError::Conflict);
        }
        self.inner.update(request, expected_version)
    }

    fn find_by_work_order(
        &self,
        work_order: &str,
    ) -> Result<Option<Versioned<TenantRequest>>, RepositoryError> {
        self.inner.find_by_work_order(work_order)
    }
}

/// Worker store that accepts a fixed number of updates and then goes offline.
#[derive(Default)]
pub(super) struct LimitedWorkers {
    inner: MemoryWorkers,
    updates_left: AtomicU32,
}

impl LimitedWorkers {
    pub(super) fn allow_updates(&self, count: u32) {
        self.updates_left.store(count, Ordering::SeqCst);
    }
}

impl WorkerRepository for LimitedWorkers {
    fn insert(&self, worker: Worker) -> Result<Versioned<Worker>, RepositoryError> {
        self.inner.insert(worker)
    }

    fn fetch(&self, email: &str) -> Result<Option<Versioned<Worker>>, RepositoryError> {
        self.inner.fetch(email)
    }

    fn update(
        &self,
        worker: Worker,
        expected_version: u64,
    ) -> Result<Versioned<Worker>, RepositoryError> {
        let left = self.updates_left.load(Ordering::SeqCst);
        if left == 0 {
            return Err(RepositoryError::Unavailable("worker store offline".to_string()));
        }
        self.updates_left.store(left - 1, Ordering::SeqCst);
        self.inner.update(worker, expected_version)
    }

    fn active_workers(&self) -> Result<Vec<Worker>, RepositoryError> {
        self.inner.active_workers()
    }
}

/// Publisher that records what the request store held when each event arrived.
pub(super) struct SnapshotPublisher {
    requests: Arc<MemoryRequests>,
    pub(super) seen: Mutex<Vec<(&'static str, Option<TenantRequestStatus>)>>,
}

impl SnapshotPublisher {
    pub(super) fn new(requests: Arc<MemoryRequests>) -> Self {
        Self {
            requests,
            seen: Mutex::new(Vec::new()),
        }
    }
}

impl EventPublisher for SnapshotPublisher {
    fn publish(&self, event: MaintenanceEvent) -> Result<(), EventPublishError> {
        if let MaintenanceEvent::Request(request_event) = &event {
            let stored = self.requests.status_of(&request_event.request_id);
            self.seen
                .lock()
                .expect("snapshot mutex poisoned")
                .push((event.name(), stored));
        }
        Ok(())
    }
}

pub(super) struct UnavailableRequests;

impl TenantRequestRepository for UnavailableRequests {
    fn insert(&self, _request: TenantRequest) -> Result<Versioned<TenantRequest>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(
        &self,
        _id: &TenantRequestId,
    ) -> Result<Option<Versioned<TenantRequest>>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(
        &self,
        _request: TenantRequest,
        _expected_version: u64,
    ) -> Result<Versioned<TenantRequest>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find_by_work_order(
        &self,
        _work_order: &str,
    ) -> Result<Option<Versioned<TenantRequest>>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 16 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
