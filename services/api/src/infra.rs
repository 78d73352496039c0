use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tenant_maintenance::workflows::maintenance::{
    EventPublishError, EventPublisher, MaintenanceEvent, RepositoryError, TenantRequest,
    TenantRequestId, TenantRequestRepository, Versioned, Worker, WorkerRepository,
    WorkerSpecialization,
};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryTenantRequestRepository {
    records: Arc<Mutex<HashMap<TenantRequestId, Versioned<TenantRequest>>>>,
}

impl TenantRequestRepository for InMemoryTenantRequestRepository {
    fn insert(&self, request: TenantRequest) -> Result<Versioned<TenantRequest>, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(request.id()) {
            return Err(RepositoryError::Duplicate);
        }
        let stored = Versioned::initial(request);
        guard.insert(stored.aggregate.id().clone(), stored.clone());
        Ok(stored)
    }

    fn fetch(
        &self,
        id: &TenantRequestId,
    ) -> Result<Option<Versioned<TenantRequest>>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update(
        &self,
        request: TenantRequest,
        expected_version: u64,
    ) -> Result<Versioned<TenantRequest>, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let current = guard.get(request.id()).ok_or(RepositoryError::NotFound)?;
        if current.version != expected_version {
            return Err(RepositoryError::Conflict);
        }
        let stored = current.next(request);
        guard.insert(stored.aggregate.id().clone(), stored.clone());
        Ok(stored)
    }

    fn find_by_work_order(
        &self,
        work_order: &str,
    ) -> Result<Option<Versioned<TenantRequest>>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|stored| stored.aggregate.work_order_number() == Some(work_order))
            .max_by_key(|stored| stored.updated_at)
            .cloned())
    }
}

/// Worker store keyed by normalized email.
#[derive(Default, Clone)]
pub(crate) struct InMemoryWorkerRepository {
    records: Arc<Mutex<HashMap<String, Versioned<Worker>>>>,
}

impl InMemoryWorkerRepository {
    /// Preload roster snapshots; later rows with a known email are skipped.
    pub(crate) fn seed(&self, workers: Vec<Worker>) -> usize {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let mut seeded = 0;
        for worker in workers {
            if guard.contains_key(worker.email()) {
                continue;
            }
            guard.insert(worker.email().to_string(), Versioned::initial(worker));
            seeded += 1;
        }
        seeded
    }
}

impl WorkerRepository for InMemoryWorkerRepository {
    fn insert(&self, worker: Worker) -> Result<Versioned<Worker>, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(worker.email()) {
            return Err(RepositoryError::Duplicate);
        }
        let stored = Versioned::initial(worker);
        guard.insert(stored.aggregate.email().to_string(), stored.clone());
        Ok(stored)
    }

    fn fetch(&self, email: &str) -> Result<Option<Versioned<Worker>>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(email).cloned())
    }

    fn update(
        &self,
        worker: Worker,
        expected_version: u64,
    ) -> Result<Versioned<Worker>, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let current = guard.get(worker.email()).ok_or(RepositoryError::NotFound)?;
        if current.version != expected_version {
            return Err(RepositoryError::Conflict);
        }
        let stored = current.next(worker);
        guard.insert(stored.aggregate.email().to_string(), stored.clone());
        Ok(stored)
    }

    fn active_workers(&self) -> Result<Vec<Worker>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|stored| stored.aggregate.is_active())
            .map(|stored| stored.aggregate.clone())
            .collect())
    }
}

/// Publisher that logs each committed event and keeps it for inspection.
#[derive(Default, Clone)]
pub(crate) struct InMemoryEventPublisher {
    events: Arc<Mutex<Vec<MaintenanceEvent>>>,
}

impl EventPublisher for InMemoryEventPublisher {
    fn publish(&self, event: MaintenanceEvent) -> Result<(), EventPublishError> {
        match &event {
            MaintenanceEvent::Request(inner) => {
                info!(event = event.name(), request = %inner.request_id, code = %inner.code, "maintenance event")
            }
            MaintenanceEvent::Worker(inner) => {
                info!(event = event.name(), worker = %inner.email, "maintenance event")
            }
        }
        let mut guard = self.events.lock().expect("event mutex poisoned");
        guard.push(event);
        Ok(())
    }
}

impl InMemoryEventPublisher {
    pub(crate) fn events(&self) -> Vec<MaintenanceEvent> {
        self.events.lock().expect("event mutex poisoned").clone()
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_specialization(raw: &str) -> Result<WorkerSpecialization, String> {
    raw.parse::<WorkerSpecialization>()
        .map_err(|err| err.to_string())
}

pub(crate) fn deserialize_optional_date<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.map(|value| parse_date(&value).map_err(serde::de::Error::custom))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenant_maintenance::workflows::maintenance::WorkerContact;

    fn worker(email: &str) -> Worker {
        Worker::new(WorkerContact {
            first_name: "Sam".to_string(),
            last_name: "Tester".to_string(),
            email: email.to_string(),
            phone: None,
        })
        .expect("valid worker")
    }

    #[test]
    fn seed_skips_known_emails() {
        let repository = InMemoryWorkerRepository::default();
        repository.insert(worker("sam@test.com")).expect("insert");

        let seeded = repository.seed(vec![worker("sam@test.com"), worker("kim@test.com")]);

        assert_eq!(seeded, 1);
        assert_eq!(repository.active_workers().expect("snapshot").len(), 2);
    }

    #[test]
    fn stale_worker_version_is_a_conflict() {
        let repository = InMemoryWorkerRepository::default();
        let stored = repository.insert(worker("sam@test.com")).expect("insert");
        repository
            .update(stored.aggregate.clone(), stored.version)
            .expect("first update");

        assert!(matches!(
            repository.update(stored.aggregate, stored.version),
            Err(RepositoryError::Conflict)
        ));
    }

    #[test]
    fn parse_date_reports_bad_input() {
        assert!(parse_date("2025-11-03").is_ok());
        assert!(parse_date("11/03/2025")
            .expect_err("not iso")
            .contains("YYYY-MM-DD"));
    }

    #[test]
    fn parse_specialization_accepts_trade_aliases() {
        assert_eq!(
            parse_specialization("plumber"),
            Ok(WorkerSpecialization::Plumbing)
        );
        assert!(parse_specialization("Roofing").is_err());
    }
}
