use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, error, info, warn};

use super::error::MaintenanceError;
use super::repository::{
    EventPublishError, EventPublisher, MaintenanceEvent, RepositoryError, TenantRequestRepository,
    Versioned, WorkerRepository,
};
use super::requests::{
    NewTenantRequest, TenantRequest, TenantRequestEvent, TenantRequestId, TenantRequestStatus,
};
use super::workers::{
    normalize_email, SelectionCriteria, Worker, WorkerAvailabilitySummary,
    WorkerContact, WorkerEvent, WorkerSelection, WorkerSpecialization,
};

/// Tunables for the service, usually derived from [`crate::config::MaintenanceConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceSettings {
    pub look_ahead_days: u32,
    pub max_candidates: usize,
    pub conflict_retries: u32,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            look_ahead_days: 14,
            max_candidates: 5,
            conflict_retries: 3,
        }
    }
}

static WORK_ORDER_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_work_order_number(request: &TenantRequest) -> String {
    let id = WORK_ORDER_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("WO-{}-{id:04}", request.code())
}

/// Application service composing the aggregates, repositories and event publisher.
///
/// Events are drained from an aggregate before it is written and published only after
/// the write succeeds, so observers never see a state that was not committed.
pub struct MaintenanceService<Q, W, P> {
    requests: Arc<Q>,
    workers: Arc<W>,
    publisher: Arc<P>,
    selection: WorkerSelection,
    settings: ServiceSettings,
}

impl<Q, W, P> MaintenanceService<Q, W, P>
where
    Q: TenantRequestRepository + 'static,
    W: WorkerRepository + 'static,
    P: EventPublisher + 'static,
{
    pub fn new(requests: Arc<Q>, workers: Arc<W>, publisher: Arc<P>, settings: ServiceSettings) -> Self {
        Self {
            requests,
            workers,
            publisher,
            selection: WorkerSelection::default(),
            settings,
        }
    }

    pub fn settings(&self) -> ServiceSettings {
        self.settings
    }

    pub fn create_request(
        &self,
        new: NewTenantRequest,
    ) -> Result<TenantRequest, MaintenanceServiceError> {
        let mut request = TenantRequest::create_new(new)?;
        let events = request.take_events();
        let stored = self.requests.insert(request)?;
        self.publish_request_events(events)?;

        info!(request = %stored.aggregate.id(), code = stored.aggregate.code(), "tenant request created");
        Ok(stored.aggregate)
    }

    pub fn get_request(&self, id: &TenantRequestId) -> Result<TenantRequest, MaintenanceServiceError> {
        Ok(self.load_request(id)?.aggregate)
    }

    pub fn submit_request(
        &self,
        id: &TenantRequestId,
    ) -> Result<TenantRequest, MaintenanceServiceError> {
        self.mutate_request(id, |request| request.submit())
    }

    pub fn decline_request(
        &self,
        id: &TenantRequestId,
        reason: &str,
    ) -> Result<TenantRequest, MaintenanceServiceError> {
        self.mutate_request(id, |request| request.decline(reason))
    }

    pub fn close_request(
        &self,
        id: &TenantRequestId,
        closure_notes: &str,
    ) -> Result<TenantRequest, MaintenanceServiceError> {
        self.mutate_request(id, |request| request.close(closure_notes))
    }

    /// Record the outcome on the request, then on the bound worker's assignment.
    ///
    /// Both transitions are checked against the stored aggregates before anything is
    /// written. Once the request has committed its outcome is returned; a later failure
    /// to settle the worker's assignment is logged rather than reported.
    pub fn report_work_completed(
        &self,
        id: &TenantRequestId,
        successful: bool,
        notes: &str,
    ) -> Result<TenantRequest, MaintenanceServiceError> {
        let current = self.load_request(id)?.aggregate;
        current.clone().report_work_completed(successful, notes)?;
        if let (Some(email), Some(work_order)) =
            (current.assigned_worker_email(), current.work_order_number())
        {
            let mut worker = self.load_worker(email)?.aggregate;
            worker.complete_work(work_order, successful, notes)?;
        }

        let request =
            self.mutate_request(id, |request| request.report_work_completed(successful, notes))?;

        if let (Some(email), Some(work_order)) =
            (request.assigned_worker_email(), request.work_order_number())
        {
            if let Err(err) = self.mutate_worker(email, |worker| {
                worker.complete_work(work_order, successful, notes)
            }) {
                error!(
                    request = %id,
                    worker = email,
                    work_order,
                    error = %err,
                    "request outcome committed but worker assignment was not settled"
                );
            }
        }
        Ok(request)
    }

    /// Bind a worker to a submitted or failed request.
    ///
    /// The worker is re-validated against its current stored state, not against any
    /// earlier selection result. A conflicting write on either aggregate releases
    /// whatever was already written and replays the whole step from fresh loads.
    pub fn schedule_request(
        &self,
        id: &TenantRequestId,
        scheduled_date: DateTime<Utc>,
        worker_email: &str,
        work_order_number: Option<&str>,
    ) -> Result<TenantRequest, MaintenanceServiceError> {
        let worker_email = normalize_email(worker_email);
        let mut resolved_work_order = work_order_number.map(|number| number.trim().to_string());
        let mut attempt = 0;
        loop {
            let Versioned {
                aggregate: mut request,
                version,
                ..
            } = self.load_request(id)?;
            let work_order = resolved_work_order
                .get_or_insert_with(|| next_work_order_number(&request))
                .clone();

            request.schedule(scheduled_date, &worker_email, &work_order)?;

            let Versioned {
                aggregate: mut worker,
                version: worker_version,
                ..
            } = self.load_worker(&worker_email)?;
            worker.validate_can_be_assigned_to_request(
                scheduled_date,
                &work_order,
                request.required_specialization(),
            )?;
            worker.assign_to_work(&work_order, scheduled_date)?;
            let worker_events = worker.take_events();
            match self.workers.update(worker, worker_version) {
                Ok(_) => {}
                Err(RepositoryError::Conflict) if attempt < self.settings.conflict_retries => {
                    attempt += 1;
                    warn!(worker = %worker_email, attempt, "concurrent worker update while scheduling; replaying");
                    continue;
                }
                Err(err) => return Err(err.into()),
            }

            let request_events = request.take_events();
            match self.requests.update(request, version) {
                Ok(stored) => {
                    self.publish_worker_events(worker_events)?;
                    self.publish_request_events(request_events)?;

                    info!(request = %id, worker = %worker_email, work_order = %work_order, "tenant request scheduled");
                    return Ok(stored.aggregate);
                }
                Err(err) => {
                    warn!(request = %id, work_order = %work_order, "request write failed; releasing worker assignment");
                    if let Err(release_err) = self.release_assignment(&worker_email, &work_order) {
                        error!(
                            worker = %worker_email,
                            work_order = %work_order,
                            error = %release_err,
                            "worker assignment could not be released"
                        );
                    }
                    match err {
                        RepositoryError::Conflict if attempt < self.settings.conflict_retries => {
                            attempt += 1;
                            warn!(request = %id, attempt, "concurrent request update while scheduling; replaying");
                        }
                        err => return Err(err.into()),
                    }
                }
            }
        }
    }

    /// Rank workers for a stored request. Defaults the target date to today.
    pub fn find_workers_for_request(
        &self,
        id: &TenantRequestId,
        target_date: Option<NaiveDate>,
    ) -> Result<Vec<WorkerAvailabilitySummary>, MaintenanceServiceError> {
        let request = self.load_request(id)?.aggregate;
        let criteria = SelectionCriteria {
            required_specialization: request.required_specialization(),
            target_date: target_date.unwrap_or_else(|| Utc::now().date_naive()),
            look_ahead_days: self.settings.look_ahead_days,
            is_emergency: request.is_emergency(),
            max_workers: self.settings.max_candidates,
        };
        self.find_available_workers(&criteria)
    }

    pub fn find_available_workers(
        &self,
        criteria: &SelectionCriteria,
    ) -> Result<Vec<WorkerAvailabilitySummary>, MaintenanceServiceError> {
        let pool = self.workers.active_workers()?;
        let ranked = self.selection.find_available_workers(criteria, &pool);

        debug!(
            specialization = criteria.required_specialization.label(),
            target = %criteria.target_date,
            emergency = criteria.is_emergency,
            pool = pool.len(),
            matched = ranked.len(),
            "worker selection ranked candidates"
        );
        Ok(ranked)
    }

    pub fn register_worker(
        &self,
        contact: WorkerContact,
        specialization: Option<WorkerSpecialization>,
    ) -> Result<Worker, MaintenanceServiceError> {
        let mut worker = Worker::new(contact)?;
        if let Some(specialization) = specialization {
            worker.set_specialization(specialization);
        }
        let events = worker.take_events();
        let stored = self.workers.insert(worker)?;
        self.publish_worker_events(events)?;

        info!(worker = stored.aggregate.email(), "worker registered");
        Ok(stored.aggregate)
    }

    pub fn get_worker(&self, email: &str) -> Result<Worker, MaintenanceServiceError> {
        Ok(self.load_worker(email)?.aggregate)
    }

    pub fn set_worker_specialization(
        &self,
        email: &str,
        specialization: WorkerSpecialization,
    ) -> Result<Worker, MaintenanceServiceError> {
        self.mutate_worker(email, |worker| {
            worker.set_specialization(specialization);
            Ok(())
        })
    }

    pub fn activate_worker(&self, email: &str) -> Result<Worker, MaintenanceServiceError> {
        self.mutate_worker(email, |worker| {
            worker.activate();
            Ok(())
        })
    }

    pub fn deactivate_worker(
        &self,
        email: &str,
        reason: &str,
    ) -> Result<Worker, MaintenanceServiceError> {
        self.mutate_worker(email, |worker| worker.deactivate(reason))
    }

    /// Cancel a pending assignment. A work order still bound to a scheduled request has to
    /// be settled through the request instead.
    pub fn cancel_assignment(
        &self,
        email: &str,
        work_order_number: &str,
        reason: &str,
    ) -> Result<Worker, MaintenanceServiceError> {
        let email = normalize_email(email);
        let work_order_number = work_order_number.trim();
        if let Some(stored) = self.requests.find_by_work_order(work_order_number)? {
            let request = &stored.aggregate;
            if request.status() == TenantRequestStatus::Scheduled
                && request.assigned_worker_email() == Some(email.as_str())
            {
                return Err(MaintenanceError::AssignmentInUse {
                    worker: email,
                    work_order: work_order_number.to_string(),
                    request: request.code().to_string(),
                }
                .into());
            }
        }

        self.mutate_worker(&email, |worker| {
            worker.cancel_assignment(work_order_number, reason)
        })
    }

    fn load_request(
        &self,
        id: &TenantRequestId,
    ) -> Result<Versioned<TenantRequest>, MaintenanceServiceError> {
        Ok(self.requests.fetch(id)?.ok_or(RepositoryError::NotFound)?)
    }

    fn load_worker(&self, email: &str) -> Result<Versioned<Worker>, MaintenanceServiceError> {
        Ok(self
            .workers
            .fetch(&normalize_email(email))?
            .ok_or(RepositoryError::NotFound)?)
    }

    /// Load, apply, commit. A concurrent write reloads the request and replays `apply`.
    fn mutate_request<F>(
        &self,
        id: &TenantRequestId,
        apply: F,
    ) -> Result<TenantRequest, MaintenanceServiceError>
    where
        F: Fn(&mut TenantRequest) -> Result<(), MaintenanceError>,
    {
        let mut attempt = 0;
        loop {
            let Versioned {
                aggregate: mut request,
                version,
                ..
            } = self.load_request(id)?;
            apply(&mut request)?;
            let events = request.take_events();

            match self.requests.update(request, version) {
                Ok(stored) => {
                    self.publish_request_events(events)?;
                    info!(request = %id, status = %stored.aggregate.status(), "tenant request updated");
                    return Ok(stored.aggregate);
                }
                Err(RepositoryError::Conflict) if attempt < self.settings.conflict_retries => {
                    attempt += 1;
                    warn!(request = %id, attempt, "concurrent request update; replaying");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn mutate_worker<F>(&self, email: &str, apply: F) -> Result<Worker, MaintenanceServiceError>
    where
        F: Fn(&mut Worker) -> Result<(), MaintenanceError>,
    {
        let mut attempt = 0;
        loop {
            let Versioned {
                aggregate: mut worker,
                version,
                ..
            } = self.load_worker(email)?;
            apply(&mut worker)?;
            let events = worker.take_events();

            match self.workers.update(worker, version) {
                Ok(stored) => {
                    self.publish_worker_events(events)?;
                    return Ok(stored.aggregate);
                }
                Err(RepositoryError::Conflict) if attempt < self.settings.conflict_retries => {
                    attempt += 1;
                    warn!(worker = email, attempt, "concurrent worker update; replaying");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Undo an assignment whose request never committed. Nothing was announced, so the
    /// cancellation is not published either.
    fn release_assignment(
        &self,
        email: &str,
        work_order_number: &str,
    ) -> Result<(), MaintenanceServiceError> {
        let Versioned {
            aggregate: mut worker,
            version,
            ..
        } = self.load_worker(email)?;
        worker.cancel_assignment(work_order_number, "request update rejected")?;
        worker.take_events();
        self.workers.update(worker, version)?;
        Ok(())
    }

    fn publish_request_events(
        &self,
        events: Vec<TenantRequestEvent>,
    ) -> Result<(), MaintenanceServiceError> {
        for event in events {
            self.publisher.publish(MaintenanceEvent::Request(event))?;
        }
        Ok(())
    }

    fn publish_worker_events(&self, events: Vec<WorkerEvent>) -> Result<(), MaintenanceServiceError> {
        for event in events {
            self.publisher.publish(MaintenanceEvent::Worker(event))?;
        }
        Ok(())
    }
}

/// Error raised by the maintenance service.
#[derive(Debug, thiserror::Error)]
pub enum MaintenanceServiceError {
    #[error(transparent)]
    Domain(#[from] MaintenanceError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Publish(#[from] EventPublishError),
}
