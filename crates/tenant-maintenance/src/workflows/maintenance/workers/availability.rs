use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;

use super::specialization::WorkerSpecialization;
use super::worker::{Worker, WorkerId};

/// Inclusive lookahead window for a single availability query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailabilityWindow {
    pub target_date: NaiveDate,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_emergency: bool,
}

impl AvailabilityWindow {
    pub fn starting_at(target_date: NaiveDate, look_ahead_days: u32, is_emergency: bool) -> Self {
        let end_date = target_date
            .checked_add_days(chrono::Days::new(u64::from(look_ahead_days)))
            .unwrap_or(NaiveDate::MAX);
        Self {
            target_date,
            start_date: target_date,
            end_date,
            is_emergency,
        }
    }

    fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }
}

/// Per-query view of one worker's schedule. Never persisted; scores only compare
/// within the query that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerAvailabilitySummary {
    pub worker_id: WorkerId,
    pub worker_name: String,
    pub worker_email: String,
    pub specialization: WorkerSpecialization,
    pub is_active: bool,
    pub current_workload: usize,
    pub booked_dates: BTreeSet<NaiveDate>,
    pub partially_booked_dates: BTreeSet<NaiveDate>,
    pub next_fully_available_date: NaiveDate,
    pub availability_score: u64,
}

impl WorkerAvailabilitySummary {
    pub fn is_available_on(&self, date: NaiveDate) -> bool {
        !self.booked_dates.contains(&date)
    }
}

// Emergency scoring is lexicographic on (wait, workload) as long as workload stays below
// the wait weight.
const EMERGENCY_WAIT_WEIGHT: u64 = 10_000;
const STANDARD_WAIT_WEIGHT: u64 = 10;
const STANDARD_WORKLOAD_WEIGHT: u64 = 4;
const PARTIAL_DAY_PENALTY: u64 = 2;

/// Splits a worker's days into booked (a pending job holds the day) and partially booked
/// (only settled work that day). Booked days follow [`Worker::is_booked_on`], the same rule
/// assignment validation enforces.
#[derive(Debug, Clone, Copy, Default)]
pub struct AvailabilityCalculator;

impl AvailabilityCalculator {
    pub fn summarize(&self, worker: &Worker, window: &AvailabilityWindow) -> WorkerAvailabilitySummary {
        let worked_days: BTreeSet<NaiveDate> = worker
            .assignments()
            .iter()
            .filter(|assignment| !assignment.is_cancelled())
            .map(|assignment| assignment.service_date())
            .filter(|date| window.contains(*date))
            .collect();
        let (booked_dates, partially_booked_dates): (BTreeSet<_>, BTreeSet<_>) = worked_days
            .into_iter()
            .partition(|date| worker.is_booked_on(*date));

        let current_workload = worker.current_workload();
        let next_fully_available_date =
            first_free_date(window.target_date, |date| worker.is_booked_on(date));
        let wait_days = next_fully_available_date
            .signed_duration_since(window.target_date)
            .num_days()
            .max(0) as u64;
        let availability_score = availability_score(
            wait_days,
            current_workload as u64,
            partially_booked_dates.contains(&next_fully_available_date),
            window.is_emergency,
        );

        WorkerAvailabilitySummary {
            worker_id: worker.id().clone(),
            worker_name: worker.display_name(),
            worker_email: worker.email().to_string(),
            specialization: worker.specialization(),
            is_active: worker.is_active(),
            current_workload,
            booked_dates,
            partially_booked_dates,
            next_fully_available_date,
            availability_score,
        }
    }
}

fn first_free_date(target: NaiveDate, is_booked: impl Fn(NaiveDate) -> bool) -> NaiveDate {
    let mut date = target;
    while is_booked(date) {
        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }
    date
}

/// Lower is better. Zero only for a worker free on the target date with nothing pending.
pub(crate) fn availability_score(
    wait_days: u64,
    workload: u64,
    partially_booked: bool,
    is_emergency: bool,
) -> u64 {
    if is_emergency {
        wait_days
            .saturating_mul(EMERGENCY_WAIT_WEIGHT)
            .saturating_add(workload.min(EMERGENCY_WAIT_WEIGHT - 1))
    } else {
        let partial = if partially_booked {
            PARTIAL_DAY_PENALTY
        } else {
            0
        };
        wait_days
            .saturating_mul(STANDARD_WAIT_WEIGHT)
            .saturating_add(workload.saturating_mul(STANDARD_WORKLOAD_WEIGHT))
            .saturating_add(partial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_unloaded_worker_scores_zero() {
        assert_eq!(availability_score(0, 0, false, false), 0);
        assert_eq!(availability_score(0, 0, false, true), 0);
    }

    #[test]
    fn score_is_monotonic_in_wait_and_workload() {
        for emergency in [false, true] {
            for wait in 0..5 {
                for load in 0..5 {
                    let base = availability_score(wait, load, false, emergency);
                    assert!(availability_score(wait + 1, load, false, emergency) > base);
                    assert!(availability_score(wait, load + 1, false, emergency) > base);
                }
            }
        }
    }

    #[test]
    fn emergency_prefers_free_today_over_lighter_load() {
        let busy_but_free_today = availability_score(0, 40, false, true);
        let idle_tomorrow = availability_score(1, 0, false, true);
        assert!(busy_but_free_today < idle_tomorrow);
    }

    #[test]
    fn standard_weighting_trades_wait_against_workload() {
        let loaded_today = availability_score(0, 5, false, false);
        let idle_tomorrow = availability_score(1, 0, false, false);
        assert!(idle_tomorrow < loaded_today);
    }

    #[test]
    fn first_free_date_skips_consecutive_booked_days() {
        let day = |d| NaiveDate::from_ymd_opt(2025, 10, d).expect("valid date");
        let booked: BTreeSet<_> = [day(1), day(2), day(4)].into_iter().collect();
        let is_booked = |date: NaiveDate| booked.contains(&date);
        assert_eq!(first_free_date(day(1), is_booked), day(3));
        assert_eq!(first_free_date(day(3), is_booked), day(3));
    }
}
