//! Worker aggregate, specialization classifier, availability scoring and selection.

mod availability;
mod selection;
mod specialization;
mod worker;

pub use availability::{AvailabilityCalculator, AvailabilityWindow, WorkerAvailabilitySummary};
pub use selection::{SelectionCriteria, WorkerSelection};
pub use specialization::{determine_required_specialization, WorkerSpecialization};
pub use worker::{
    WorkAssignment, Worker, WorkerContact, WorkerEvent, WorkerEventKind, WorkerId,
};

pub(crate) use worker::normalize_email;
