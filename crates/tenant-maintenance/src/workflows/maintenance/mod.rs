//! Tenant maintenance requests: intake, worker matching, scheduling and closure.
//!
//! Aggregates enforce the request status machine and worker booking rules; the service
//! composes them with repository and publisher adapters, and the router exposes the
//! lifecycle over HTTP.

pub mod error;
pub mod repository;
pub mod requests;
pub mod roster;
pub mod router;
pub mod service;
pub mod workers;

#[cfg(test)]
mod tests;

pub use error::{MaintenanceError, UnavailableReason};
pub use repository::{
    EventPublishError, EventPublisher, MaintenanceEvent, RepositoryError, TenantRequestRepository,
    Versioned, WorkerRepository,
};
pub use requests::{
    NewTenantRequest, PropertyContact, StatusChangeRecord, TenantContact, TenantRequest,
    TenantRequestEvent, TenantRequestEventKind, TenantRequestId, TenantRequestStatus,
    UrgencyLevel,
};
pub use roster::{load_roster, RosterError};
pub use router::{maintenance_router, service_error_status, TenantRequestView, WorkerView};
pub use service::{MaintenanceService, MaintenanceServiceError, ServiceSettings};
pub use workers::{
    determine_required_specialization, AvailabilityCalculator, AvailabilityWindow,
    SelectionCriteria, WorkAssignment, Worker, WorkerAvailabilitySummary, WorkerContact,
    WorkerEvent, WorkerEventKind, WorkerId, WorkerSelection, WorkerSpecialization,
};
