use std::fmt;

use chrono::NaiveDate;

use super::requests::TenantRequestStatus;
use super::workers::WorkerSpecialization;

/// Business-rule violations raised by the request and worker aggregates.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MaintenanceError {
    #[error("cannot {action} request {request} while it is {status}")]
    InvalidTransition {
        request: String,
        status: TenantRequestStatus,
        action: &'static str,
    },
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
    #[error("worker {worker} is not available: {reason}")]
    WorkerUnavailable {
        worker: String,
        reason: UnavailableReason,
    },
    #[error("worker {worker} is already assigned to work order {work_order}")]
    AlreadyAssigned { worker: String, work_order: String },
    #[error("worker {worker} holds no assignment for work order {work_order}")]
    AssignmentNotFound { worker: String, work_order: String },
    #[error("work order {work_order} for worker {worker} already has an outcome")]
    AssignmentAlreadyCompleted { worker: String, work_order: String },
    #[error("work order {work_order} for worker {worker} is still scheduled on request {request}")]
    AssignmentInUse {
        worker: String,
        work_order: String,
        request: String,
    },
}

impl MaintenanceError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidParameters(message.into())
    }
}

/// Why a worker cannot take a particular job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnavailableReason {
    SpecializationMismatch {
        required: WorkerSpecialization,
        actual: WorkerSpecialization,
    },
    Inactive,
    AlreadyBooked { date: NaiveDate, work_order: String },
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnavailableReason::SpecializationMismatch { required, actual } => write!(
                f,
                "missing required specialization {} (worker specializes in {})",
                required.label(),
                actual.label()
            ),
            UnavailableReason::Inactive => write!(f, "worker is inactive"),
            UnavailableReason::AlreadyBooked { date, work_order } => {
                write!(f, "already booked on {date} for work order {work_order}")
            }
        }
    }
}
