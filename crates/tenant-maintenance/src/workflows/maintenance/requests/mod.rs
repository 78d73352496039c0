//! Tenant request aggregate and its status state machine.

mod aggregate;
pub mod domain;

pub use aggregate::TenantRequest;
pub use domain::{
    NewTenantRequest, PropertyContact, StatusChangeRecord, TenantContact, TenantRequestEvent,
    TenantRequestEventKind, TenantRequestId, TenantRequestStatus, UrgencyLevel,
};
