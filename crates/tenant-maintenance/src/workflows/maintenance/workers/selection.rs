use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::availability::{AvailabilityCalculator, AvailabilityWindow, WorkerAvailabilitySummary};
use super::specialization::WorkerSpecialization;
use super::worker::Worker;

/// Parameters for one worker selection query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionCriteria {
    pub required_specialization: WorkerSpecialization,
    pub target_date: NaiveDate,
    pub look_ahead_days: u32,
    pub is_emergency: bool,
    pub max_workers: usize,
}

/// Stateless ranking over a snapshot of workers supplied by the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkerSelection {
    calculator: AvailabilityCalculator,
}

impl WorkerSelection {
    /// Rank active, skill-eligible workers for the target date.
    ///
    /// Ordering is availability score, then current workload, then display name, then
    /// email, so identical inputs always produce identical output. An empty pool yields
    /// an empty list.
    pub fn find_available_workers<'a, I>(
        &self,
        criteria: &SelectionCriteria,
        candidate_pool: I,
    ) -> Vec<WorkerAvailabilitySummary>
    where
        I: IntoIterator<Item = &'a Worker>,
    {
        let window = AvailabilityWindow::starting_at(
            criteria.target_date,
            criteria.look_ahead_days,
            criteria.is_emergency,
        );

        let mut ranked: Vec<WorkerAvailabilitySummary> = candidate_pool
            .into_iter()
            .filter(|worker| {
                worker.is_active() && worker.has_specialized_skills(criteria.required_specialization)
            })
            .map(|worker| self.calculator.summarize(worker, &window))
            .collect();

        ranked.sort_by(|a, b| {
            a.availability_score
                .cmp(&b.availability_score)
                .then_with(|| a.current_workload.cmp(&b.current_workload))
                .then_with(|| a.worker_name.cmp(&b.worker_name))
                .then_with(|| a.worker_email.cmp(&b.worker_email))
        });
        ranked.truncate(criteria.max_workers);
        ranked
    }
}
