use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{
    NewTenantRequest, PropertyContact, StatusChangeRecord, TenantContact, TenantRequestEvent,
    TenantRequestEventKind, TenantRequestId, TenantRequestStatus, UrgencyLevel,
};
use crate::workflows::maintenance::error::MaintenanceError;
use crate::workflows::maintenance::workers::{
    determine_required_specialization, WorkerSpecialization,
};

static REQUEST_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_request_id() -> TenantRequestId {
    let id = REQUEST_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    TenantRequestId(format!("req-{id:06}"))
}

/// Maintenance ticket whose status only moves through the methods below.
///
/// Every transition appends one [`StatusChangeRecord`] and buffers one
/// [`TenantRequestEvent`]. Callers drain the buffer with [`TenantRequest::take_events`]
/// once the new state has been committed.
#[derive(Debug, Clone, Serialize)]
pub struct TenantRequest {
    id: TenantRequestId,
    code: String,
    title: String,
    description: String,
    urgency: UrgencyLevel,
    status: TenantRequestStatus,
    tenant: TenantContact,
    property: PropertyContact,
    created_at: DateTime<Utc>,
    scheduled_at: Option<DateTime<Utc>>,
    scheduled_date: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    closed_at: Option<DateTime<Utc>>,
    assigned_worker_email: Option<String>,
    work_order_number: Option<String>,
    work_completed_successfully: Option<bool>,
    completion_notes: Option<String>,
    decline_reason: Option<String>,
    closure_notes: Option<String>,
    history: Vec<StatusChangeRecord>,
    #[serde(skip)]
    pending_events: Vec<TenantRequestEvent>,
}

impl TenantRequest {
    /// Open a new request in `Draft`.
    pub fn create_new(new: NewTenantRequest) -> Result<Self, MaintenanceError> {
        require("request code", &new.code)?;
        require("title", &new.title)?;
        require("tenant email", &new.tenant.email)?;
        require("property id", &new.property.property_id)?;

        let now = Utc::now();
        let mut request = Self {
            id: next_request_id(),
            code: new.code.trim().to_string(),
            title: new.title.trim().to_string(),
            description: new.description.trim().to_string(),
            urgency: new.urgency,
            status: TenantRequestStatus::Draft,
            tenant: new.tenant,
            property: new.property,
            created_at: now,
            scheduled_at: None,
            scheduled_date: None,
            completed_at: None,
            closed_at: None,
            assigned_worker_email: None,
            work_order_number: None,
            work_completed_successfully: None,
            completion_notes: None,
            decline_reason: None,
            closure_notes: None,
            history: Vec::new(),
            pending_events: Vec::new(),
        };

        request.history.push(StatusChangeRecord {
            from: None,
            to: TenantRequestStatus::Draft,
            changed_at: now,
            reason: None,
        });
        request.raise(
            now,
            TenantRequestEventKind::Created {
                urgency: request.urgency,
            },
        );
        Ok(request)
    }

    pub fn submit(&mut self) -> Result<(), MaintenanceError> {
        self.ensure_transition(TenantRequestStatus::Submitted, "submit")?;

        let now = Utc::now();
        self.transition(TenantRequestStatus::Submitted, now, None);
        self.raise(now, TenantRequestEventKind::Submitted);
        Ok(())
    }

    /// Bind a worker and service date. Also used to reschedule a failed request.
    pub fn schedule(
        &mut self,
        scheduled_date: DateTime<Utc>,
        worker_email: &str,
        work_order_number: &str,
    ) -> Result<(), MaintenanceError> {
        self.ensure_transition(TenantRequestStatus::Scheduled, "schedule")?;

        let now = Utc::now();
        if scheduled_date <= now {
            return Err(MaintenanceError::invalid(format!(
                "scheduled date {scheduled_date} must be in the future"
            )));
        }
        require("worker email", worker_email)?;
        require("work order number", work_order_number)?;

        let reason = match (self.status, &self.work_order_number) {
            (TenantRequestStatus::Failed, Some(previous)) => {
                Some(format!("rescheduled after failed work order {previous}"))
            }
            _ => None,
        };

        let worker_email = worker_email.trim().to_string();
        let work_order_number = work_order_number.trim().to_string();
        self.scheduled_at = Some(now);
        self.scheduled_date = Some(scheduled_date);
        self.assigned_worker_email = Some(worker_email.clone());
        self.work_order_number = Some(work_order_number.clone());
        self.work_completed_successfully = None;
        self.completion_notes = None;
        self.completed_at = None;

        self.transition(TenantRequestStatus::Scheduled, now, reason);
        self.raise(
            now,
            TenantRequestEventKind::Scheduled {
                scheduled_date,
                worker_email,
                work_order_number,
            },
        );
        Ok(())
    }

    pub fn decline(&mut self, reason: &str) -> Result<(), MaintenanceError> {
        self.ensure_transition(TenantRequestStatus::Declined, "decline")?;
        require("decline reason", reason)?;

        let now = Utc::now();
        let reason = reason.trim().to_string();
        self.decline_reason = Some(reason.clone());
        self.transition(TenantRequestStatus::Declined, now, Some(reason.clone()));
        self.raise(now, TenantRequestEventKind::Declined { reason });
        Ok(())
    }

    pub fn report_work_completed(
        &mut self,
        successful: bool,
        notes: &str,
    ) -> Result<(), MaintenanceError> {
        let next = if successful {
            TenantRequestStatus::Done
        } else {
            TenantRequestStatus::Failed
        };
        self.ensure_transition(next, "report completion for")?;

        let now = Utc::now();
        let notes = notes.trim().to_string();
        self.completed_at = Some(now);
        self.work_completed_successfully = Some(successful);
        self.completion_notes = Some(notes.clone());
        self.transition(next, now, (!notes.is_empty()).then(|| notes.clone()));
        self.raise(now, TenantRequestEventKind::Completed { successful, notes });
        Ok(())
    }

    pub fn close(&mut self, closure_notes: &str) -> Result<(), MaintenanceError> {
        self.ensure_transition(TenantRequestStatus::Closed, "close")?;

        let now = Utc::now();
        let closure_notes = closure_notes.trim().to_string();
        self.closed_at = Some(now);
        self.closure_notes = Some(closure_notes.clone());
        self.transition(TenantRequestStatus::Closed, now, None);
        self.raise(now, TenantRequestEventKind::Closed { closure_notes });
        Ok(())
    }

    pub fn update_tenant_info(&mut self, tenant: TenantContact) -> Result<(), MaintenanceError> {
        self.ensure_modifiable("update tenant info for")?;
        require("tenant email", &tenant.email)?;

        let now = Utc::now();
        self.tenant = tenant.clone();
        self.record_info_update(now, "tenant info updated");
        self.raise(now, TenantRequestEventKind::TenantInfoUpdated { tenant });
        Ok(())
    }

    pub fn update_property_info(
        &mut self,
        property: PropertyContact,
    ) -> Result<(), MaintenanceError> {
        self.ensure_modifiable("update property info for")?;
        require("property id", &property.property_id)?;

        let now = Utc::now();
        self.property = property.clone();
        self.record_info_update(now, "property info updated");
        self.raise(now, TenantRequestEventKind::PropertyInfoUpdated { property });
        Ok(())
    }

    /// Skill category this request needs, derived from its title and description.
    pub fn required_specialization(&self) -> WorkerSpecialization {
        determine_required_specialization(&self.title, &self.description)
    }

    pub fn is_emergency(&self) -> bool {
        self.urgency.is_emergency()
    }

    /// Buffered events not yet handed to a publisher.
    pub fn events(&self) -> &[TenantRequestEvent] {
        &self.pending_events
    }

    pub fn take_events(&mut self) -> Vec<TenantRequestEvent> {
        std::mem::take(&mut self.pending_events)
    }

    pub fn id(&self) -> &TenantRequestId {
        &self.id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn urgency(&self) -> UrgencyLevel {
        self.urgency
    }

    pub fn status(&self) -> TenantRequestStatus {
        self.status
    }

    pub fn tenant(&self) -> &TenantContact {
        &self.tenant
    }

    pub fn property(&self) -> &PropertyContact {
        &self.property
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn scheduled_at(&self) -> Option<DateTime<Utc>> {
        self.scheduled_at
    }

    pub fn scheduled_date(&self) -> Option<DateTime<Utc>> {
        self.scheduled_date
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }

    pub fn assigned_worker_email(&self) -> Option<&str> {
        self.assigned_worker_email.as_deref()
    }

    pub fn work_order_number(&self) -> Option<&str> {
        self.work_order_number.as_deref()
    }

    pub fn work_completed_successfully(&self) -> Option<bool> {
        self.work_completed_successfully
    }

    pub fn completion_notes(&self) -> Option<&str> {
        self.completion_notes.as_deref()
    }

    pub fn decline_reason(&self) -> Option<&str> {
        self.decline_reason.as_deref()
    }

    pub fn closure_notes(&self) -> Option<&str> {
        self.closure_notes.as_deref()
    }

    pub fn history(&self) -> &[StatusChangeRecord] {
        &self.history
    }

    fn ensure_transition(
        &self,
        next: TenantRequestStatus,
        action: &'static str,
    ) -> Result<(), MaintenanceError> {
        if self.status.can_transition_to(next) {
            Ok(())
        } else {
            Err(self.invalid_transition(action))
        }
    }

    fn ensure_modifiable(&self, action: &'static str) -> Result<(), MaintenanceError> {
        if self.status.can_be_modified() {
            Ok(())
        } else {
            Err(self.invalid_transition(action))
        }
    }

    fn invalid_transition(&self, action: &'static str) -> MaintenanceError {
        MaintenanceError::InvalidTransition {
            request: self.code.clone(),
            status: self.status,
            action,
        }
    }

    fn transition(
        &mut self,
        next: TenantRequestStatus,
        at: DateTime<Utc>,
        reason: Option<String>,
    ) {
        self.history.push(StatusChangeRecord {
            from: Some(self.status),
            to: next,
            changed_at: at,
            reason,
        });
        self.status = next;
    }

    fn record_info_update(&mut self, at: DateTime<Utc>, reason: &str) {
        self.history.push(StatusChangeRecord {
            from: Some(self.status),
            to: self.status,
            changed_at: at,
            reason: Some(reason.to_string()),
        });
    }

    fn raise(&mut self, at: DateTime<Utc>, kind: TenantRequestEventKind) {
        self.pending_events.push(TenantRequestEvent {
            request_id: self.id.clone(),
            code: self.code.clone(),
            occurred_at: at,
            kind,
        });
    }
}

fn require(field: &str, value: &str) -> Result<(), MaintenanceError> {
    if value.trim().is_empty() {
        Err(MaintenanceError::invalid(format!("{field} must not be empty")))
    } else {
        Ok(())
    }
}
