use chrono::{DateTime, Utc};
use serde::Serialize;

use super::requests::{TenantRequest, TenantRequestEvent, TenantRequestId};
use super::workers::{Worker, WorkerEvent};

/// Storage envelope. The version is an optimistic concurrency token owned by the
/// repository; aggregates never read or write it.
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    pub aggregate: T,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl<T> Versioned<T> {
    pub fn initial(aggregate: T) -> Self {
        Self {
            aggregate,
            version: 1,
            updated_at: Utc::now(),
        }
    }

    /// Envelope for the next committed revision.
    pub fn next(&self, aggregate: T) -> Self {
        Self {
            aggregate,
            version: self.version + 1,
            updated_at: Utc::now(),
        }
    }
}

/// Request storage. `update` fails with [`RepositoryError::Conflict`] when
/// `expected_version` no longer matches the stored revision.
pub trait TenantRequestRepository: Send + Sync {
    fn insert(&self, request: TenantRequest) -> Result<Versioned<TenantRequest>, RepositoryError>;
    fn fetch(
        &self,
        id: &TenantRequestId,
    ) -> Result<Option<Versioned<TenantRequest>>, RepositoryError>;
    fn update(
        &self,
        request: TenantRequest,
        expected_version: u64,
    ) -> Result<Versioned<TenantRequest>, RepositoryError>;
    /// The request currently carrying `work_order`, if any.
    fn find_by_work_order(
        &self,
        work_order: &str,
    ) -> Result<Option<Versioned<TenantRequest>>, RepositoryError>;
}

/// Worker storage keyed by normalized email.
pub trait WorkerRepository: Send + Sync {
    fn insert(&self, worker: Worker) -> Result<Versioned<Worker>, RepositoryError>;
    fn fetch(&self, email: &str) -> Result<Option<Versioned<Worker>>, RepositoryError>;
    fn update(
        &self,
        worker: Worker,
        expected_version: u64,
    ) -> Result<Versioned<Worker>, RepositoryError>;
    /// Read-only snapshot handed to worker selection.
    fn active_workers(&self) -> Result<Vec<Worker>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record was modified concurrently")]
    Conflict,
    #[error("record already exists")]
    Duplicate,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Domain events handed to observers after the owning aggregate is committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "aggregate", content = "payload", rename_all = "snake_case")]
pub enum MaintenanceEvent {
    Request(TenantRequestEvent),
    Worker(WorkerEvent),
}

impl MaintenanceEvent {
    pub fn name(&self) -> &'static str {
        match self {
            MaintenanceEvent::Request(event) => event.kind.name(),
            MaintenanceEvent::Worker(event) => event.kind.name(),
        }
    }
}

/// Outbound notification hook (e-mail, chat, audit log adapters).
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: MaintenanceEvent) -> Result<(), EventPublishError>;
}

#[derive(Debug, thiserror::Error)]
pub enum EventPublishError {
    #[error("event transport unavailable: {0}")]
    Transport(String),
}
