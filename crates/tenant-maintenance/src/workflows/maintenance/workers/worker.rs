use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::specialization::WorkerSpecialization;
use crate::workflows::maintenance::error::{MaintenanceError, UnavailableReason};

static WORKER_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_worker_id() -> WorkerId {
    let id = WORKER_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    WorkerId(format!("wkr-{id:06}"))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkerId(pub String);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerContact {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl WorkerContact {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }

    fn validate(&self) -> Result<(), MaintenanceError> {
        if self.first_name.trim().is_empty() && self.last_name.trim().is_empty() {
            return Err(MaintenanceError::invalid("worker name must not be empty"));
        }
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(MaintenanceError::invalid(format!(
                "worker email '{email}' is not a valid address"
            )));
        }
        Ok(())
    }
}

/// A scheduled job held by exactly one worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkAssignment {
    pub work_order_number: String,
    pub scheduled_date: DateTime<Utc>,
    pub assigned_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub successful: Option<bool>,
    pub notes: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl WorkAssignment {
    pub fn service_date(&self) -> NaiveDate {
        self.scheduled_date.date_naive()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled_at.is_some()
    }

    pub fn is_completed(&self) -> bool {
        self.successful.is_some()
    }

    /// Still waiting for an outcome; overdue assignments remain pending.
    pub fn is_pending(&self) -> bool {
        !self.is_completed() && !self.is_cancelled()
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.is_pending() && self.service_date() < today
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerEvent {
    pub worker_id: WorkerId,
    pub email: String,
    pub occurred_at: DateTime<Utc>,
    pub kind: WorkerEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorkerEventKind {
    Registered {
        specialization: WorkerSpecialization,
    },
    Activated,
    Deactivated {
        reason: String,
    },
    SpecializationChanged {
        from: WorkerSpecialization,
        to: WorkerSpecialization,
    },
    WorkAssigned {
        work_order_number: String,
        scheduled_date: DateTime<Utc>,
    },
    WorkCompleted {
        work_order_number: String,
        successful: bool,
    },
    AssignmentCancelled {
        work_order_number: String,
        reason: String,
    },
}

impl WorkerEventKind {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Registered { .. } => "registered",
            Self::Activated => "activated",
            Self::Deactivated { .. } => "deactivated",
            Self::SpecializationChanged { .. } => "specialization_changed",
            Self::WorkAssigned { .. } => "work_assigned",
            Self::WorkCompleted { .. } => "work_completed",
            Self::AssignmentCancelled { .. } => "assignment_cancelled",
        }
    }
}

/// Maintenance worker aggregate. Workers are deactivated, never deleted.
#[derive(Debug, Clone, Serialize)]
pub struct Worker {
    id: WorkerId,
    contact: WorkerContact,
    specialization: WorkerSpecialization,
    is_active: bool,
    notes: Vec<String>,
    assignments: Vec<WorkAssignment>,
    registered_at: DateTime<Utc>,
    #[serde(skip)]
    pending_events: Vec<WorkerEvent>,
}

impl Worker {
    /// Register an active general-maintenance worker.
    pub fn new(contact: WorkerContact) -> Result<Self, MaintenanceError> {
        contact.validate()?;

        let now = Utc::now();
        let contact = WorkerContact {
            email: normalize_email(&contact.email),
            ..contact
        };
        let mut worker = Self {
            id: next_worker_id(),
            contact,
            specialization: WorkerSpecialization::default(),
            is_active: true,
            notes: Vec::new(),
            assignments: Vec::new(),
            registered_at: now,
            pending_events: Vec::new(),
        };
        worker.raise(
            now,
            WorkerEventKind::Registered {
                specialization: worker.specialization,
            },
        );
        Ok(worker)
    }

    /// Changing to the current specialization is a no-op.
    pub fn set_specialization(&mut self, specialization: WorkerSpecialization) {
        if self.specialization == specialization {
            return;
        }
        let from = self.specialization;
        self.specialization = specialization;
        self.raise(
            Utc::now(),
            WorkerEventKind::SpecializationChanged {
                from,
                to: specialization,
            },
        );
    }

    pub fn activate(&mut self) {
        if self.is_active {
            return;
        }
        self.is_active = true;
        self.raise(Utc::now(), WorkerEventKind::Activated);
    }

    pub fn deactivate(&mut self, reason: &str) -> Result<(), MaintenanceError> {
        if reason.trim().is_empty() {
            return Err(MaintenanceError::invalid(
                "deactivation reason must not be empty",
            ));
        }
        if !self.is_active {
            return Ok(());
        }
        self.is_active = false;
        self.raise(
            Utc::now(),
            WorkerEventKind::Deactivated {
                reason: reason.trim().to_string(),
            },
        );
        Ok(())
    }

    pub fn update_contact_info(&mut self, contact: WorkerContact) -> Result<(), MaintenanceError> {
        contact.validate()?;
        if normalize_email(&contact.email) != self.contact.email {
            return Err(MaintenanceError::invalid(
                "worker email identifies the worker and cannot change",
            ));
        }
        self.contact = WorkerContact {
            email: self.contact.email.clone(),
            ..contact
        };
        Ok(())
    }

    pub fn add_note(&mut self, note: &str) {
        let note = note.trim();
        if !note.is_empty() {
            self.notes.push(note.to_string());
        }
    }

    pub fn has_specialized_skills(&self, required: WorkerSpecialization) -> bool {
        self.specialization.covers(required)
    }

    /// Pure check that this worker may take the job; the assignment is added separately.
    pub fn validate_can_be_assigned_to_request(
        &self,
        service_date: DateTime<Utc>,
        work_order_number: &str,
        required: WorkerSpecialization,
    ) -> Result<(), MaintenanceError> {
        if !self.has_specialized_skills(required) {
            return Err(self.unavailable(UnavailableReason::SpecializationMismatch {
                required,
                actual: self.specialization,
            }));
        }
        if !self.is_active {
            return Err(self.unavailable(UnavailableReason::Inactive));
        }
        if self.pending_assignment(work_order_number).is_some() {
            return Err(self.already_assigned(work_order_number));
        }

        let date = service_date.date_naive();
        if let Some(booked) = self.booking_on(date) {
            return Err(self.unavailable(UnavailableReason::AlreadyBooked {
                date,
                work_order: booked.work_order_number.clone(),
            }));
        }

        Ok(())
    }

    pub fn assign_to_work(
        &mut self,
        work_order_number: &str,
        scheduled_date: DateTime<Utc>,
    ) -> Result<(), MaintenanceError> {
        let work_order_number = work_order_number.trim();
        if work_order_number.is_empty() {
            return Err(MaintenanceError::invalid(
                "work order number must not be empty",
            ));
        }
        if self.pending_assignment(work_order_number).is_some() {
            return Err(self.already_assigned(work_order_number));
        }

        let now = Utc::now();
        self.assignments.push(WorkAssignment {
            work_order_number: work_order_number.to_string(),
            scheduled_date,
            assigned_at: now,
            completed_at: None,
            successful: None,
            notes: None,
            cancelled_at: None,
        });
        self.raise(
            now,
            WorkerEventKind::WorkAssigned {
                work_order_number: work_order_number.to_string(),
                scheduled_date,
            },
        );
        Ok(())
    }

    pub fn complete_work(
        &mut self,
        work_order_number: &str,
        successful: bool,
        notes: &str,
    ) -> Result<(), MaintenanceError> {
        let index = self.assignment_index(work_order_number)?;
        let now = Utc::now();
        let assignment = &mut self.assignments[index];
        assignment.completed_at = Some(now);
        assignment.successful = Some(successful);
        let notes = notes.trim();
        if !notes.is_empty() {
            assignment.notes = Some(notes.to_string());
        }
        let work_order_number = assignment.work_order_number.clone();

        self.raise(
            now,
            WorkerEventKind::WorkCompleted {
                work_order_number,
                successful,
            },
        );
        Ok(())
    }

    /// Release a pending assignment so it no longer counts toward bookings or workload.
    pub fn cancel_assignment(
        &mut self,
        work_order_number: &str,
        reason: &str,
    ) -> Result<(), MaintenanceError> {
        let index = self.assignment_index(work_order_number)?;
        let now = Utc::now();
        let reason = reason.trim().to_string();
        let assignment = &mut self.assignments[index];
        assignment.cancelled_at = Some(now);
        if !reason.is_empty() {
            assignment.notes = Some(reason.clone());
        }
        let work_order_number = assignment.work_order_number.clone();

        self.raise(
            now,
            WorkerEventKind::AssignmentCancelled {
                work_order_number,
                reason,
            },
        );
        Ok(())
    }

    /// The pending assignment occupying `date`. Settled and cancelled work leaves the day open.
    pub fn booking_on(&self, date: NaiveDate) -> Option<&WorkAssignment> {
        self.assignments
            .iter()
            .find(|assignment| assignment.is_pending() && assignment.service_date() == date)
    }

    pub fn is_booked_on(&self, date: NaiveDate) -> bool {
        self.booking_on(date).is_some()
    }

    /// Assignments still awaiting an outcome, overdue ones included.
    pub fn current_workload(&self) -> usize {
        self.assignments
            .iter()
            .filter(|assignment| assignment.is_pending())
            .count()
    }

    pub fn events(&self) -> &[WorkerEvent] {
        &self.pending_events
    }

    pub fn take_events(&mut self) -> Vec<WorkerEvent> {
        std::mem::take(&mut self.pending_events)
    }

    pub fn id(&self) -> &WorkerId {
        &self.id
    }

    pub fn contact(&self) -> &WorkerContact {
        &self.contact
    }

    pub fn email(&self) -> &str {
        &self.contact.email
    }

    pub fn display_name(&self) -> String {
        self.contact.display_name()
    }

    pub fn specialization(&self) -> WorkerSpecialization {
        self.specialization
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    pub fn assignments(&self) -> &[WorkAssignment] {
        &self.assignments
    }

    pub fn registered_at(&self) -> DateTime<Utc> {
        self.registered_at
    }

    fn pending_assignment(&self, work_order_number: &str) -> Option<&WorkAssignment> {
        let work_order_number = work_order_number.trim();
        self.assignments.iter().find(|assignment| {
            assignment.is_pending() && assignment.work_order_number == work_order_number
        })
    }

    /// Latest assignment for the work order; it must still be pending.
    fn assignment_index(&self, work_order_number: &str) -> Result<usize, MaintenanceError> {
        let work_order_number = work_order_number.trim();
        let index = self
            .assignments
            .iter()
            .rposition(|assignment| assignment.work_order_number == work_order_number)
            .ok_or_else(|| MaintenanceError::AssignmentNotFound {
                worker: self.contact.email.clone(),
                work_order: work_order_number.to_string(),
            })?;

        if self.assignments[index].is_pending() {
            Ok(index)
        } else {
            Err(MaintenanceError::AssignmentAlreadyCompleted {
                worker: self.contact.email.clone(),
                work_order: work_order_number.to_string(),
            })
        }
    }

    fn unavailable(&self, reason: UnavailableReason) -> MaintenanceError {
        MaintenanceError::WorkerUnavailable {
            worker: self.contact.email.clone(),
            reason,
        }
    }

    fn already_assigned(&self, work_order_number: &str) -> MaintenanceError {
        MaintenanceError::AlreadyAssigned {
            worker: self.contact.email.clone(),
            work_order: work_order_number.trim().to_string(),
        }
    }

    fn raise(&mut self, at: DateTime<Utc>, kind: WorkerEventKind) {
        self.pending_events.push(WorkerEvent {
            worker_id: self.id.clone(),
            email: self.contact.email.clone(),
            occurred_at: at,
            kind,
        });
    }
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}
